//! Per-crop feature engineering over a customer's action log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::action::{ActionKind, CustomerAction};
use crate::domain::customer::CustomerProfile;

pub const DEFAULT_RECENCY_DECAY_PER_DAY: f64 = 0.1;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// The ten model inputs, in the column order shared by the builder and the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    TotalWeightedScore,
    AddCount,
    RemoveCount,
    PurchaseCount,
    AvgPrice,
    AvgDiscount,
    AvgStock,
    DiscountSensitivity,
    PriceElasticity,
    StockUrgency,
}

impl FeatureColumn {
    pub const COUNT: usize = 10;

    pub const ALL: [FeatureColumn; Self::COUNT] = [
        Self::TotalWeightedScore,
        Self::AddCount,
        Self::RemoveCount,
        Self::PurchaseCount,
        Self::AvgPrice,
        Self::AvgDiscount,
        Self::AvgStock,
        Self::DiscountSensitivity,
        Self::PriceElasticity,
        Self::StockUrgency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TotalWeightedScore => "total_weighted_score",
            Self::AddCount => "add_count",
            Self::RemoveCount => "remove_count",
            Self::PurchaseCount => "purchase_count",
            Self::AvgPrice => "avg_price",
            Self::AvgDiscount => "avg_discount",
            Self::AvgStock => "avg_stock",
            Self::DiscountSensitivity => "discount_sensitivity",
            Self::PriceElasticity => "price_elasticity",
            Self::StockUrgency => "stock_urgency",
        }
    }
}

/// Aggregated engagement for one (customer, crop) pair. Recomputed on every run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropFeatureRow {
    pub crop: String,
    pub total_weighted_score: f64,
    pub add_count: u32,
    pub remove_count: u32,
    pub purchase_count: u32,
    /// `None` when no action on this crop carried a usable price.
    pub avg_price: Option<f64>,
    pub avg_discount: Option<f64>,
    pub avg_stock: Option<f64>,
    pub profile: CustomerProfile,
}

impl CropFeatureRow {
    pub fn value(&self, column: FeatureColumn) -> Option<f64> {
        match column {
            FeatureColumn::TotalWeightedScore => Some(self.total_weighted_score),
            FeatureColumn::AddCount => Some(f64::from(self.add_count)),
            FeatureColumn::RemoveCount => Some(f64::from(self.remove_count)),
            FeatureColumn::PurchaseCount => Some(f64::from(self.purchase_count)),
            FeatureColumn::AvgPrice => self.avg_price,
            FeatureColumn::AvgDiscount => self.avg_discount,
            FeatureColumn::AvgStock => self.avg_stock,
            FeatureColumn::DiscountSensitivity => Some(self.profile.discount_sensitivity),
            FeatureColumn::PriceElasticity => Some(self.profile.price_elasticity),
            FeatureColumn::StockUrgency => Some(self.profile.stock_urgency),
        }
    }

    pub fn vector(&self) -> [Option<f64>; FeatureColumn::COUNT] {
        FeatureColumn::ALL.map(|column| self.value(column))
    }

    /// Training label: the crop was bought at least once.
    pub fn label(&self) -> bool {
        self.purchase_count > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureBuilder {
    decay_per_day: f64,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_RECENCY_DECAY_PER_DAY)
    }
}

impl FeatureBuilder {
    pub fn new(decay_per_day: f64) -> Self {
        Self { decay_per_day }
    }

    /// Recency weight for an action recorded at `at`, measured in fractional days before `now`.
    pub fn recency_weight(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_days = (now - at).num_milliseconds() as f64 / MILLIS_PER_DAY;
        (-self.decay_per_day * age_days).exp()
    }

    /// Groups `actions` by exact crop name and returns one row per crop, ordered by crop name.
    pub fn build(
        &self,
        actions: &[CustomerAction],
        profile: CustomerProfile,
        now: DateTime<Utc>,
    ) -> Vec<CropFeatureRow> {
        let mut groups: BTreeMap<&str, CropAccumulator> = BTreeMap::new();

        for action in actions {
            let weighted =
                action.kind.engagement_score() * self.recency_weight(action.recorded_at, now);
            groups.entry(action.crop.as_str()).or_default().push(action, weighted);
        }

        groups
            .into_iter()
            .map(|(crop, accumulator)| accumulator.finish(crop, profile))
            .collect()
    }
}

#[derive(Default)]
struct CropAccumulator {
    weighted_score: f64,
    add_count: u32,
    remove_count: u32,
    purchase_count: u32,
    price: RunningMean,
    discount: RunningMean,
    stock: RunningMean,
}

impl CropAccumulator {
    fn push(&mut self, action: &CustomerAction, weighted: f64) {
        self.weighted_score += weighted;
        match action.kind {
            ActionKind::Add => self.add_count += 1,
            ActionKind::Remove => self.remove_count += 1,
            ActionKind::Purchase => self.purchase_count += 1,
        }
        self.price.push(action.snapshot.price);
        self.discount.push(action.snapshot.discount);
        self.stock.push(action.snapshot.stock);
    }

    fn finish(self, crop: &str, profile: CustomerProfile) -> CropFeatureRow {
        CropFeatureRow {
            crop: crop.to_string(),
            total_weighted_score: self.weighted_score,
            add_count: self.add_count,
            remove_count: self.remove_count,
            purchase_count: self.purchase_count,
            avg_price: self.price.value(),
            avg_discount: self.discount.value(),
            avg_stock: self.stock.value(),
            profile,
        }
    }
}

/// Incremental mean that ignores missing samples.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RunningMean {
    mean: f64,
    count: u32,
}

impl RunningMean {
    pub(crate) fn push(&mut self, sample: Option<f64>) {
        let Some(sample) = sample.filter(|sample| sample.is_finite()) else {
            return;
        };
        self.count += 1;
        self.mean += (sample - self.mean) / f64::from(self.count);
    }

    pub(crate) fn value(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }
}
