use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::package::{parse_date, Package, SchedulePhase};
use crate::CatalogError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw filters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageQueryParams {
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    StartDate,
    EndDate,
    BasePrice,
    #[default]
    CreatedAt,
    FromLocation,
    ToLocation,
}

impl SortField {
    fn parse(raw: &str) -> Result<Self, CatalogError> {
        match raw {
            "startDate" => Ok(SortField::StartDate),
            "endDate" => Ok(SortField::EndDate),
            "basePrice" | "price" => Ok(SortField::BasePrice),
            "createdAt" => Ok(SortField::CreatedAt),
            "fromLocation" => Ok(SortField::FromLocation),
            "toLocation" => Ok(SortField::ToLocation),
            other => Err(CatalogError::InvalidFilter(format!("cannot sort by '{}'", other))),
        }
    }

    /// Column name in the `packages` table
    pub fn column(&self) -> &'static str {
        match self {
            SortField::StartDate => "start_date",
            SortField::EndDate => "end_date",
            SortField::BasePrice => "base_price",
            SortField::CreatedAt => "created_at",
            SortField::FromLocation => "from_location",
            SortField::ToLocation => "to_location",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Validated package filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageQuery {
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    /// Package starts on or after this instant
    pub starts_after: Option<DateTime<Utc>>,
    /// Package ends on or before this instant
    pub ends_before: Option<DateTime<Utc>>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub status: Option<SchedulePhase>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for PackageQuery {
    fn default() -> Self {
        Self {
            from_location: None,
            to_location: None,
            starts_after: None,
            ends_before: None,
            min_price: None,
            max_price: None,
            status: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<PackageQueryParams> for PackageQuery {
    type Error = CatalogError;

    fn try_from(params: PackageQueryParams) -> Result<Self, Self::Error> {
        let starts_after = non_empty(params.start_date).map(|s| parse_date(&s)).transpose()?;
        let ends_before = non_empty(params.end_date).map(|s| parse_date(&s)).transpose()?;
        let status = non_empty(params.status).map(|s| s.parse()).transpose()?;
        let sort_by = match non_empty(params.sort_by) {
            Some(raw) => SortField::parse(&raw)?,
            None => SortField::default(),
        };
        let sort_order = match non_empty(params.sort_order).as_deref() {
            None => SortOrder::default(),
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(CatalogError::InvalidFilter(format!("unknown sort order '{}'", other)))
            }
        };

        if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
            if min > max {
                return Err(CatalogError::InvalidFilter("minPrice is greater than maxPrice".into()));
            }
        }

        Ok(Self {
            from_location: non_empty(params.from_location),
            to_location: non_empty(params.to_location),
            starts_after,
            ends_before,
            min_price: params.min_price,
            max_price: params.max_price,
            status,
            sort_by,
            sort_order,
            page: params.page.unwrap_or(1).max(1),
            limit: params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        })
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl PackageQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn matches(&self, package: &Package, now: DateTime<Utc>) -> bool {
        if let Some(from) = &self.from_location {
            if !contains_ci(&package.from_location, from) {
                return false;
            }
        }
        if let Some(to) = &self.to_location {
            if !contains_ci(&package.to_location, to) {
                return false;
            }
        }
        if self.starts_after.is_some_and(|t| package.start_date < t) {
            return false;
        }
        if self.ends_before.is_some_and(|t| package.end_date > t) {
            return false;
        }
        if self.min_price.is_some_and(|p| package.base_price < p) {
            return false;
        }
        if self.max_price.is_some_and(|p| package.base_price > p) {
            return false;
        }
        if self.status.is_some_and(|s| package.phase_at(now) != s) {
            return false;
        }
        true
    }

    pub fn compare(&self, a: &Package, b: &Package) -> Ordering {
        let ord = match self.sort_by {
            SortField::StartDate => a.start_date.cmp(&b.start_date),
            SortField::EndDate => a.end_date.cmp(&b.end_date),
            SortField::BasePrice => a.base_price.cmp(&b.base_price),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::FromLocation => a.from_location.cmp(&b.from_location),
            SortField::ToLocation => a.to_location.cmp(&b.to_location),
        };
        let ord = match self.sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        ord.then_with(|| a.id.cmp(&b.id))
    }

    /// Filters, sorts and paginates an in-memory set of packages.
    pub fn apply(&self, packages: impl IntoIterator<Item = Package>, now: DateTime<Utc>) -> Page<Package> {
        let mut matching: Vec<Package> = packages.into_iter().filter(|p| self.matches(p, now)).collect();
        matching.sort_by(|a, b| self.compare(a, b));
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.limit as usize)
            .collect();
        Page { items, total }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Services;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn pkg(from: &str, to: &str, start_offset_days: i64, price: i64) -> Package {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        Package {
            id: Uuid::new_v4(),
            from_location: from.into(),
            to_location: to.into(),
            start_date: base + Duration::days(start_offset_days),
            end_date: base + Duration::days(start_offset_days + 5),
            base_price: price,
            included_services: Services::default(),
            food_price: 0,
            accommodation_price: 0,
            description: String::new(),
            images: vec![],
            created_by: Uuid::nil(),
            created_at: base + Duration::minutes(start_offset_days),
            updated_at: base,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap()
    }

    #[test]
    fn defaults_are_applied() {
        let q = PackageQuery::try_from(PackageQueryParams::default()).unwrap();
        assert_eq!(q, PackageQuery::default());
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn limit_and_page_are_clamped() {
        let q = PackageQuery::try_from(PackageQueryParams {
            page: Some(0),
            limit: Some(10_000),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn rejects_unknown_sort_and_status() {
        let err = PackageQuery::try_from(PackageQueryParams {
            sort_by: Some("popularity".into()),
            ..Default::default()
        });
        assert!(matches!(err, Err(CatalogError::InvalidFilter(_))));

        let err = PackageQuery::try_from(PackageQueryParams {
            status: Some("archived".into()),
            ..Default::default()
        });
        assert!(matches!(err, Err(CatalogError::InvalidFilter(_))));
    }

    #[test]
    fn filters_by_location_price_and_status() {
        let packages = vec![
            pkg("Paris", "Rome", 0, 500),   // completed by now (ends day 5)
            pkg("paris", "Nice", 7, 900),   // active (day 7..12)
            pkg("Berlin", "Rome", 20, 300), // upcoming
        ];

        let q = PackageQuery { from_location: Some("PAR".into()), ..Default::default() };
        assert_eq!(q.apply(packages.clone(), now()).total, 2);

        let q = PackageQuery { min_price: Some(400), max_price: Some(600), ..Default::default() };
        let page = q.apply(packages.clone(), now());
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].to_location, "Rome");

        let q = PackageQuery { status: Some(SchedulePhase::Active), ..Default::default() };
        let page = q.apply(packages.clone(), now());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].to_location, "Nice");
    }

    #[test]
    fn filters_by_date_window() {
        let packages = vec![pkg("A", "B", 0, 1), pkg("A", "C", 10, 1)];
        let q = PackageQuery::try_from(PackageQueryParams {
            start_date: Some("2026-03-05".into()),
            ..Default::default()
        })
        .unwrap();
        let page = q.apply(packages.clone(), now());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].to_location, "C");

        let q = PackageQuery::try_from(PackageQueryParams {
            end_date: Some("2026-03-06".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(q.apply(packages, now()).items[0].to_location, "B");
    }

    #[test]
    fn sorts_and_paginates() {
        let packages: Vec<Package> = (0..25).map(|i| pkg("A", "B", i, 100 + i)).collect();
        let q = PackageQuery {
            sort_by: SortField::BasePrice,
            sort_order: SortOrder::Asc,
            page: 3,
            limit: 10,
            ..Default::default()
        };
        let page = q.apply(packages, now());
        assert_eq!(page.total, 25);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].base_price, 120);
    }

    #[test]
    fn default_sort_is_newest_first() {
        let packages: Vec<Package> = (0..3).map(|i| pkg("A", "B", i, 1)).collect();
        let page = PackageQuery::default().apply(packages, now());
        assert!(page.items[0].created_at > page.items[1].created_at);
    }
}
