use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::CustomerId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Add,
    Remove,
    Purchase,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Purchase => "PURCHASE",
        }
    }

    /// Engagement weight of a single action before recency decay.
    pub fn engagement_score(&self) -> f64 {
        match self {
            Self::Add => 1.0,
            Self::Remove => -1.0,
            Self::Purchase => 3.0,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ADD" => Ok(Self::Add),
            "REMOVE" => Ok(Self::Remove),
            "PURCHASE" => Ok(Self::Purchase),
            other => Err(DomainError::UnknownActionKind(other.to_string())),
        }
    }
}

/// Listing context captured when the action was written.
///
/// Values that are absent or not finite are stored as `None` so aggregates can skip them
/// instead of counting them as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub stock: Option<f64>,
}

impl ActionSnapshot {
    pub fn new(price: Option<f64>, discount: Option<f64>, stock: Option<f64>) -> Self {
        Self { price: finite(price), discount: finite(discount), stock: finite(stock) }
    }

    pub fn is_complete(&self) -> bool {
        self.price.is_some() && self.discount.is_some() && self.stock.is_some()
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerAction {
    pub id: ActionId,
    pub customer_id: CustomerId,
    pub crop: String,
    pub kind: ActionKind,
    pub quantity: u32,
    pub snapshot: ActionSnapshot,
    pub recorded_at: DateTime<Utc>,
}

/// An action that has not been appended to the log yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCustomerAction {
    pub customer_id: CustomerId,
    pub crop: String,
    pub kind: ActionKind,
    pub quantity: u32,
    pub snapshot: ActionSnapshot,
    pub recorded_at: DateTime<Utc>,
}

impl NewCustomerAction {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity == 0 {
            return Err(DomainError::InvalidQuantity(self.quantity));
        }
        if self.crop.is_empty() {
            return Err(DomainError::InvariantViolation("crop name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn into_action(self, id: ActionId) -> CustomerAction {
        CustomerAction {
            id,
            customer_id: self.customer_id,
            crop: self.crop,
            kind: self.kind,
            quantity: self.quantity,
            snapshot: self.snapshot,
            recorded_at: self.recorded_at,
        }
    }
}
