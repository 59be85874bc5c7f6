//! Behavioral profile estimation from purchase history.

use serde::{Deserialize, Serialize};

use crate::domain::action::{ActionKind, CustomerAction};
use crate::domain::customer::CustomerProfile;
use crate::features::RunningMean;

pub const DISCOUNT_CEILING: f64 = 30.0;
pub const PRICE_CEILING: f64 = 100.0;
pub const STOCK_CEILING: f64 = 20.0;

/// Means over the purchases that carried a complete price/discount/stock snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseStats {
    pub purchases: u32,
    pub avg_price: f64,
    pub avg_discount: f64,
    pub avg_stock: f64,
}

impl PurchaseStats {
    /// Returns `None` when no purchase has a complete snapshot.
    pub fn from_actions(actions: &[CustomerAction]) -> Option<Self> {
        let mut price = RunningMean::default();
        let mut discount = RunningMean::default();
        let mut stock = RunningMean::default();
        let mut purchases = 0_u32;

        for action in actions {
            if action.kind != ActionKind::Purchase || !action.snapshot.is_complete() {
                continue;
            }
            purchases += 1;
            price.push(action.snapshot.price);
            discount.push(action.snapshot.discount);
            stock.push(action.snapshot.stock);
        }

        if purchases == 0 {
            return None;
        }

        Some(Self {
            purchases,
            avg_price: price.value()?,
            avg_discount: discount.value()?,
            avg_stock: stock.value()?,
        })
    }

    pub fn to_profile(&self) -> CustomerProfile {
        CustomerProfile {
            discount_sensitivity: ratio(self.avg_discount, DISCOUNT_CEILING),
            price_elasticity: 1.0 - ratio(self.avg_price, PRICE_CEILING),
            stock_urgency: 1.0 - ratio(self.avg_stock, STOCK_CEILING),
        }
    }
}

/// Profile for a customer's full action history. Non-purchase actions are ignored.
pub fn estimate_profile(actions: &[CustomerAction]) -> CustomerProfile {
    PurchaseStats::from_actions(actions)
        .map(|stats| stats.to_profile())
        .unwrap_or(CustomerProfile::NEUTRAL)
}

fn ratio(mean: f64, ceiling: f64) -> f64 {
    let value = mean / ceiling;
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{estimate_profile, PurchaseStats};
    use crate::domain::action::{ActionId, ActionKind, ActionSnapshot, CustomerAction};
    use crate::domain::customer::{CustomerId, CustomerProfile};

    fn action(kind: ActionKind, price: f64, discount: f64, stock: f64) -> CustomerAction {
        snapshot_action(kind, ActionSnapshot::new(Some(price), Some(discount), Some(stock)))
    }

    fn snapshot_action(kind: ActionKind, snapshot: ActionSnapshot) -> CustomerAction {
        CustomerAction {
            id: ActionId(1),
            customer_id: CustomerId(7),
            crop: "Wheat".to_string(),
            kind,
            quantity: 1,
            snapshot,
            recorded_at: Utc::now(),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
    }

    #[test]
    fn no_purchases_yields_neutral_profile() {
        let actions = vec![
            action(ActionKind::Add, 10.0, 5.0, 4.0),
            action(ActionKind::Remove, 10.0, 5.0, 4.0),
        ];

        assert_eq!(estimate_profile(&actions), CustomerProfile::NEUTRAL);
        assert_eq!(estimate_profile(&[]).as_tuple(), (0.5, 0.5, 0.5));
    }

    #[test]
    fn means_map_linearly_against_ceilings() {
        let actions = vec![
            action(ActionKind::Purchase, 40.0, 10.0, 5.0),
            action(ActionKind::Purchase, 60.0, 20.0, 15.0),
            action(ActionKind::Add, 1000.0, 0.0, 0.0),
        ];

        let profile = estimate_profile(&actions);

        assert_close(profile.discount_sensitivity, 0.5);
        assert_close(profile.price_elasticity, 0.5);
        assert_close(profile.stock_urgency, 0.5);
    }

    #[test]
    fn purchases_with_incomplete_snapshot_are_skipped() {
        let actions = vec![
            action(ActionKind::Purchase, 20.0, 6.0, 10.0),
            snapshot_action(ActionKind::Purchase, ActionSnapshot::new(Some(90.0), None, Some(1.0))),
        ];

        let stats = PurchaseStats::from_actions(&actions);

        assert_eq!(stats.map(|stats| stats.purchases), Some(1));
        let profile = estimate_profile(&actions);
        assert_close(profile.discount_sensitivity, 0.2);
        assert_close(profile.price_elasticity, 0.8);
        assert_close(profile.stock_urgency, 0.5);
    }

    #[test]
    fn only_incomplete_purchases_fall_back_to_neutral() {
        let actions =
            vec![snapshot_action(ActionKind::Purchase, ActionSnapshot::new(None, None, None))];

        assert_eq!(PurchaseStats::from_actions(&actions), None);
        assert_eq!(estimate_profile(&actions), CustomerProfile::NEUTRAL);
    }

    #[test]
    fn scalars_stay_in_unit_interval_for_extreme_means() {
        let cases = [
            (0.0, 0.0, 0.0),
            (1e12, 1e12, 1e12),
            (-50.0, -10.0, -3.0),
            (f64::MAX, f64::MAX, f64::MAX),
        ];

        for (price, discount, stock) in cases {
            let profile = estimate_profile(&[action(ActionKind::Purchase, price, discount, stock)]);
            for value in [profile.discount_sensitivity, profile.price_elasticity, profile.stock_urgency]
            {
                assert!((0.0..=1.0).contains(&value), "{value} escaped [0, 1]");
            }
        }
    }

    #[test]
    fn cheap_low_stock_buyer_scores_high_elasticity_and_urgency() {
        let profile = estimate_profile(&[action(ActionKind::Purchase, 0.0, 45.0, 0.0)]);

        assert_eq!(profile.as_tuple(), (1.0, 1.0, 1.0));
    }
}
