use std::fmt;

use serde::{Deserialize, Serialize};

use super::action::ActionSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingId(pub i64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A marketplace listing as the recommendation core sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketListing {
    pub id: ListingId,
    pub product_name: String,
    pub farmer_name: String,
    pub price: f64,
    pub weight: f64,
    pub stock: i64,
    pub discount: f64,
}

impl MarketListing {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Context recorded on customer actions taken against this listing.
    pub fn snapshot(&self) -> ActionSnapshot {
        ActionSnapshot::new(Some(self.price), Some(self.discount), Some(self.stock as f64))
    }
}
