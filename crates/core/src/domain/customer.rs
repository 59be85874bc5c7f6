use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Behavioral scalars derived from a customer's purchase history. Each value is in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub discount_sensitivity: f64,
    pub price_elasticity: f64,
    pub stock_urgency: f64,
}

impl CustomerProfile {
    /// Prior used when a customer has no usable purchases.
    pub const NEUTRAL: Self =
        Self { discount_sensitivity: 0.5, price_elasticity: 0.5, stock_urgency: 0.5 };

    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.discount_sensitivity, self.price_elasticity, self.stock_urgency)
    }
}

impl Default for CustomerProfile {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub user_name: Option<String>,
    pub profile: CustomerProfile,
    pub last_profiled: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn new(id: CustomerId) -> Self {
        Self { id, user_name: None, profile: CustomerProfile::NEUTRAL, last_profiled: None }
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    /// Name shown in operator output; falls back to `Customer <id>` when no user is linked.
    pub fn display_name(&self) -> String {
        match self.user_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Customer {}", self.id),
        }
    }
}
