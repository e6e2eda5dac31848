pub mod package;
pub mod pricing;
pub mod query;

pub use package::{
    parse_date, IncludedServices, Package, PackageDraft, PackagePatch, PackageView, SchedulePhase,
    Services, MAX_PACKAGE_IMAGES, MAX_PRICE,
};
pub use pricing::{quote, Quote, ServiceSelection};
pub use query::{Page, PackageQuery, PackageQueryParams, SortField, SortOrder};

/// Catalog validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("End date must be after start date")]
    InvalidDateRange,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("{0} must not be negative")]
    NegativePrice(&'static str),

    #[error("{0} is too large")]
    PriceTooLarge(&'static str),

    #[error("A package can have at most 5 images")]
    TooManyImages,

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}
