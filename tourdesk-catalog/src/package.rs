use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CatalogError;

pub const MAX_PACKAGE_IMAGES: usize = 5;

/// Upper bound for any single price, in minor units
pub const MAX_PRICE: i64 = 1_000_000_000_000;

/// Food / accommodation flags. Used both for what a package includes and for
/// what a booking ends up with.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Services {
    #[serde(default)]
    pub food: bool,
    #[serde(default)]
    pub accommodation: bool,
}

pub type IncludedServices = Services;

/// Where a package sits relative to "now"
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePhase {
    Upcoming,
    Active,
    Completed,
}

impl SchedulePhase {
    /// `completed` once the end has passed, `active` inside the window
    /// (inclusive on both ends), `upcoming` otherwise.
    pub fn classify(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if end < now {
            SchedulePhase::Completed
        } else if start <= now && now <= end {
            SchedulePhase::Active
        } else {
            SchedulePhase::Upcoming
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulePhase::Upcoming => "upcoming",
            SchedulePhase::Active => "active",
            SchedulePhase::Completed => "completed",
        }
    }

    pub fn all() -> [SchedulePhase; 3] {
        [SchedulePhase::Completed, SchedulePhase::Active, SchedulePhase::Upcoming]
    }
}

impl std::fmt::Display for SchedulePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchedulePhase {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upcoming" => Ok(SchedulePhase::Upcoming),
            "active" => Ok(SchedulePhase::Active),
            "completed" => Ok(SchedulePhase::Completed),
            other => Err(CatalogError::InvalidFilter(format!("unknown status '{}'", other))),
        }
    }
}

/// An admin-defined travel offering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: Uuid,
    pub from_location: String,
    pub to_location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Minor currency units, as are the service prices.
    pub base_price: i64,
    pub included_services: IncludedServices,
    pub food_price: i64,
    pub accommodation_price: i64,
    pub description: String,
    pub images: Vec<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Package {
    pub fn phase_at(&self, now: DateTime<Utc>) -> SchedulePhase {
        SchedulePhase::classify(self.start_date, self.end_date, now)
    }

    /// Route label shown on dashboards, e.g. "Lisbon → Porto".
    pub fn display_name(&self) -> String {
        format!("{} → {}", self.from_location, self.to_location)
    }

    pub fn view_at(&self, now: DateTime<Utc>) -> PackageView {
        PackageView {
            status: self.phase_at(now),
            package: self.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.from_location.trim().is_empty() {
            return Err(CatalogError::MissingField("fromLocation"));
        }
        if self.to_location.trim().is_empty() {
            return Err(CatalogError::MissingField("toLocation"));
        }
        if self.start_date >= self.end_date {
            return Err(CatalogError::InvalidDateRange);
        }
        for (name, price) in [
            ("basePrice", self.base_price),
            ("foodPrice", self.food_price),
            ("accommodationPrice", self.accommodation_price),
        ] {
            if price < 0 {
                return Err(CatalogError::NegativePrice(name));
            }
            if price > MAX_PRICE {
                return Err(CatalogError::PriceTooLarge(name));
            }
        }
        if self.images.len() > MAX_PACKAGE_IMAGES {
            return Err(CatalogError::TooManyImages);
        }
        Ok(())
    }

    /// Returns the updated package; `self` is left untouched if the result
    /// does not validate.
    pub fn apply_patch(&self, patch: PackagePatch, now: DateTime<Utc>) -> Result<Package, CatalogError> {
        let mut next = self.clone();
        if let Some(v) = patch.from_location {
            next.from_location = v.trim().to_string();
        }
        if let Some(v) = patch.to_location {
            next.to_location = v.trim().to_string();
        }
        if let Some(v) = patch.start_date {
            next.start_date = v;
        }
        if let Some(v) = patch.end_date {
            next.end_date = v;
        }
        if let Some(v) = patch.base_price {
            next.base_price = v;
        }
        if let Some(v) = patch.included_services {
            next.included_services = v;
        }
        if let Some(v) = patch.food_price {
            next.food_price = v;
        }
        if let Some(v) = patch.accommodation_price {
            next.accommodation_price = v;
        }
        if let Some(v) = patch.description {
            next.description = v;
        }
        if let Some(v) = patch.images {
            next.images = v;
        }
        next.validate()?;
        next.updated_at = now;
        Ok(next)
    }
}

/// A package as it goes over the wire: the stored fields plus the phase
/// derived at response time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageView {
    #[serde(flatten)]
    pub package: Package,
    pub status: SchedulePhase,
}

/// Input for creating a package
#[derive(Debug, Clone, Default)]
pub struct PackageDraft {
    pub from_location: String,
    pub to_location: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub base_price: Option<i64>,
    pub included_services: IncludedServices,
    pub food_price: i64,
    pub accommodation_price: i64,
    pub description: String,
}

impl PackageDraft {
    pub fn into_package(
        self,
        created_by: Uuid,
        images: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Package, CatalogError> {
        let start_date = self.start_date.ok_or(CatalogError::MissingField("startDate"))?;
        let end_date = self.end_date.ok_or(CatalogError::MissingField("endDate"))?;
        let base_price = self.base_price.ok_or(CatalogError::MissingField("basePrice"))?;

        let package = Package {
            id: Uuid::new_v4(),
            from_location: self.from_location.trim().to_string(),
            to_location: self.to_location.trim().to_string(),
            start_date,
            end_date,
            base_price,
            included_services: self.included_services,
            food_price: self.food_price,
            accommodation_price: self.accommodation_price,
            description: self.description,
            images,
            created_by,
            created_at: now,
            updated_at: now,
        };
        package.validate()?;
        Ok(package)
    }
}

/// Partial update; `None` leaves the field as is
#[derive(Debug, Clone, Default)]
pub struct PackagePatch {
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub base_price: Option<i64>,
    pub included_services: Option<IncludedServices>,
    pub food_price: Option<i64>,
    pub accommodation_price: Option<i64>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC),
/// which is what HTML date inputs submit.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, CatalogError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| CatalogError::InvalidDate(raw.to_string()))
}
