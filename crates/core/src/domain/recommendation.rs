use serde::{Deserialize, Serialize};

/// Purchase probability for one crop. The stored set for a customer holds at most one
/// row per crop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub crop: String,
    pub purchase_prob: f64,
}

impl Recommendation {
    pub fn new(crop: impl Into<String>, purchase_prob: f64) -> Self {
        Self { crop: crop.into(), purchase_prob }
    }
}

/// An in-stock listing ranked by the purchase probability of its crop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferredItem {
    pub id: i64,
    pub crop_name: String,
    pub price: f64,
    pub weight: f64,
    pub stock: i64,
    pub discount: f64,
    pub farmer_name: String,
    pub purchase_probability: f64,
}
