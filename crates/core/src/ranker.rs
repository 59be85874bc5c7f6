//! Joins stored recommendations with live listings.

use std::collections::HashMap;

use crate::domain::listing::MarketListing;
use crate::domain::recommendation::{PreferredItem, Recommendation};

/// Distinct crop names in recommendation order, used to query matching listings.
pub fn recommended_crops(recommendations: &[Recommendation]) -> Vec<String> {
    let mut crops: Vec<String> = Vec::with_capacity(recommendations.len());
    for recommendation in recommendations {
        if !crops.iter().any(|crop| crop == &recommendation.crop) {
            crops.push(recommendation.crop.clone());
        }
    }
    crops
}

pub fn round_probability(probability: f64) -> f64 {
    (probability * 10_000.0).round() / 10_000.0
}

/// In-stock listings whose product name exactly matches a recommended crop, ordered by
/// that crop's probability and truncated to `limit`. Listings for unrecommended crops are
/// dropped, not scored as zero.
pub fn rank_listings(
    recommendations: &[Recommendation],
    listings: &[MarketListing],
    limit: usize,
) -> Vec<PreferredItem> {
    let mut probabilities: HashMap<&str, f64> = HashMap::with_capacity(recommendations.len());
    for recommendation in recommendations {
        probabilities.entry(recommendation.crop.as_str()).or_insert(recommendation.purchase_prob);
    }

    let mut ranked: Vec<(f64, &MarketListing)> = listings
        .iter()
        .filter(|listing| listing.in_stock())
        .filter_map(|listing| {
            probabilities
                .get(listing.product_name.as_str())
                .map(|probability| (*probability, listing))
        })
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    ranked
        .into_iter()
        .take(limit)
        .map(|(probability, listing)| PreferredItem {
            id: listing.id.0,
            crop_name: listing.product_name.clone(),
            price: listing.price,
            weight: listing.weight,
            stock: listing.stock,
            discount: listing.discount,
            farmer_name: listing.farmer_name.clone(),
            purchase_probability: round_probability(probability),
        })
        .collect()
}
