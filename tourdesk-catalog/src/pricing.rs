use serde::{Deserialize, Serialize};

use crate::package::{Package, Services};

/// Services the customer asked for. A missing flag falls back to what the
/// package already includes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceSelection {
    pub food: Option<bool>,
    pub accommodation: Option<bool>,
}

impl ServiceSelection {
    pub fn resolve(&self, included: Services) -> Services {
        Services {
            food: self.food.unwrap_or(included.food),
            accommodation: self.accommodation.unwrap_or(included.accommodation),
        }
    }
}

/// Price breakdown for one booking request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub selected: Services,
    pub base_price: i64,
    pub food_adjustment: i64,
    pub accommodation_adjustment: i64,
    pub total_price: i64,
}

/// Signed delta for one service: dropping an included service refunds its
/// price, adding a non-included one charges it, anything else is free.
fn adjustment(included: bool, selected: bool, price: i64) -> i64 {
    match (included, selected) {
        (true, false) => price.saturating_neg(),
        (false, true) => price,
        _ => 0,
    }
}

pub fn quote(package: &Package, requested: ServiceSelection) -> Quote {
    let included = package.included_services;
    let selected = requested.resolve(included);

    let food_adjustment = adjustment(included.food, selected.food, package.food_price);
    let accommodation_adjustment = adjustment(
        included.accommodation,
        selected.accommodation,
        package.accommodation_price,
    );

    let total_price = package
        .base_price
        .saturating_add(food_adjustment)
        .saturating_add(accommodation_adjustment)
        .max(0);

    Quote {
        selected,
        base_price: package.base_price,
        food_adjustment,
        accommodation_adjustment,
        total_price,
    }
}
