use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use agrimarket_core::config::RecommendationConfig;
use agrimarket_core::domain::action::{ActionKind, CustomerAction, NewCustomerAction};
use agrimarket_core::domain::customer::{Customer, CustomerId, CustomerProfile};
use agrimarket_core::domain::listing::ListingId;
use agrimarket_core::domain::recommendation::{PreferredItem, Recommendation};
use agrimarket_core::features::FeatureBuilder;
use agrimarket_core::model::{ForestParams, PropensityModel, PropensityOutput};
use agrimarket_core::profile::estimate_profile;
use agrimarket_core::ranker::{rank_listings, recommended_crops};
use agrimarket_db::repositories::{
    ActionRepository, CustomerRepository, InMemoryActionRepository, InMemoryCustomerRepository,
    InMemoryListingRepository, InMemoryRecommendationRepository, ListingRepository,
    RecommendationRepository, SqlActionRepository, SqlCustomerRepository, SqlListingRepository,
    SqlRecommendationRepository,
};
use agrimarket_db::DbPool;

use crate::error::EngineError;

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub forest: ForestParams,
    pub recency_decay_per_day: f64,
    pub preferred_items_limit: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&RecommendationConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self {
            forest: ForestParams {
                n_trees: config.forest_trees,
                seed: config.forest_seed,
                ..ForestParams::default()
            },
            recency_decay_per_day: config.recency_decay_per_day,
            preferred_items_limit: config.preferred_items_limit,
        }
    }
}

#[derive(Clone)]
pub struct EngineRepositories {
    pub customers: Arc<dyn CustomerRepository>,
    pub actions: Arc<dyn ActionRepository>,
    pub recommendations: Arc<dyn RecommendationRepository>,
    pub listings: Arc<dyn ListingRepository>,
}

impl EngineRepositories {
    pub fn sqlite(pool: DbPool) -> Self {
        Self {
            customers: Arc::new(SqlCustomerRepository::new(pool.clone())),
            actions: Arc::new(SqlActionRepository::new(pool.clone())),
            recommendations: Arc::new(SqlRecommendationRepository::new(pool.clone())),
            listings: Arc::new(SqlListingRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            customers: Arc::new(InMemoryCustomerRepository::default()),
            actions: Arc::new(InMemoryActionRepository::default()),
            recommendations: Arc::new(InMemoryRecommendationRepository::default()),
            listings: Arc::new(InMemoryListingRepository::default()),
        }
    }
}

/// A customer action against a specific listing. The crop and snapshot come from the listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordActionRequest {
    pub customer_id: CustomerId,
    pub listing_id: ListingId,
    pub kind: ActionKind,
    pub quantity: u32,
}

pub struct RecommendationEngine {
    repositories: EngineRepositories,
    model: PropensityModel,
    features: FeatureBuilder,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(repositories: EngineRepositories, settings: EngineSettings) -> Self {
        Self {
            model: PropensityModel::new(settings.forest.clone()),
            features: FeatureBuilder::new(settings.recency_decay_per_day),
            repositories,
            settings,
        }
    }

    pub fn sqlite(pool: DbPool, settings: EngineSettings) -> Self {
        Self::new(EngineRepositories::sqlite(pool), settings)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn repositories(&self) -> &EngineRepositories {
        &self.repositories
    }

    pub(crate) async fn require_customer(&self, id: CustomerId) -> Result<Customer, EngineError> {
        self.repositories.customers.find_by_id(id).await?.ok_or(EngineError::CustomerNotFound(id))
    }

    /// Recomputes and stores the customer's profile from their purchase history.
    pub async fn update_customer_profile(
        &self,
        customer_id: CustomerId,
    ) -> Result<CustomerProfile, EngineError> {
        self.require_customer(customer_id).await?;

        let purchases = self
            .repositories
            .actions
            .list_for_customer(customer_id, Some(ActionKind::Purchase))
            .await?;
        let profile = estimate_profile(&purchases);

        let saved =
            self.repositories.customers.save_profile(customer_id, profile, Utc::now()).await?;
        if !saved {
            return Err(EngineError::CustomerNotFound(customer_id));
        }

        info!(
            event_name = "engine.profile.updated",
            customer_id = customer_id.0,
            purchases = purchases.len(),
            discount_sensitivity = profile.discount_sensitivity,
            price_elasticity = profile.price_elasticity,
            stock_urgency = profile.stock_urgency,
            "customer profile updated"
        );
        Ok(profile)
    }

    /// Refreshes the profile, scores every crop the customer touched, and replaces the
    /// stored recommendation set.
    pub async fn get_customer_recommendations(
        &self,
        customer_id: CustomerId,
    ) -> Result<PropensityOutput, EngineError> {
        let profile = self.update_customer_profile(customer_id).await?;
        self.recommend_with_profile(customer_id, profile).await
    }

    pub(crate) async fn recommend_with_profile(
        &self,
        customer_id: CustomerId,
        profile: CustomerProfile,
    ) -> Result<PropensityOutput, EngineError> {
        let actions = self.repositories.actions.list_for_customer(customer_id, None).await?;
        let output = self.score_actions(&actions, profile)?;

        self.repositories
            .recommendations
            .replace_for_customer(customer_id, &output.recommendations)
            .await?;

        info!(
            event_name = "engine.recommendations.replaced",
            customer_id = customer_id.0,
            method = output.method.as_str(),
            actions = actions.len(),
            saved = output.recommendations.len(),
            "customer recommendations replaced"
        );
        Ok(output)
    }

    fn score_actions(
        &self,
        actions: &[CustomerAction],
        profile: CustomerProfile,
    ) -> Result<PropensityOutput, EngineError> {
        if actions.is_empty() {
            return Ok(PropensityModel::cold_start());
        }

        let rows = self.features.build(actions, profile, Utc::now());
        debug!(event_name = "engine.features.built", crops = rows.len(), "feature rows built");
        Ok(self.model.score(&rows)?)
    }

    /// Stored recommendations by descending probability without recomputing them.
    pub async fn stored_recommendations(
        &self,
        customer_id: CustomerId,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, EngineError> {
        self.require_customer(customer_id).await?;
        Ok(self.repositories.recommendations.list_for_customer(customer_id, limit).await?)
    }

    /// In-stock listings for the customer's stored recommendations. Read-only: an empty
    /// recommendation set yields an empty list rather than a recomputation.
    pub async fn get_preferred_market_items(
        &self,
        customer_id: CustomerId,
        limit: Option<usize>,
    ) -> Result<Vec<PreferredItem>, EngineError> {
        let recommendations = self.stored_recommendations(customer_id, None).await?;
        if recommendations.is_empty() {
            return Ok(Vec::new());
        }

        let crops = recommended_crops(&recommendations);
        let listings = self.repositories.listings.in_stock_for_products(&crops).await?;
        let items = rank_listings(
            &recommendations,
            &listings,
            limit.unwrap_or(self.settings.preferred_items_limit),
        );

        debug!(
            event_name = "engine.preferred_items.ranked",
            customer_id = customer_id.0,
            candidates = listings.len(),
            returned = items.len(),
            "preferred market items ranked"
        );
        Ok(items)
    }

    /// Appends an action with the listing's current price, discount, and stock.
    pub async fn record_action(
        &self,
        request: RecordActionRequest,
    ) -> Result<CustomerAction, EngineError> {
        self.require_customer(request.customer_id).await?;
        let listing = self
            .repositories
            .listings
            .find_by_id(request.listing_id)
            .await?
            .ok_or(EngineError::ListingNotFound(request.listing_id))?;

        let action = NewCustomerAction {
            customer_id: request.customer_id,
            crop: listing.product_name.clone(),
            kind: request.kind,
            quantity: request.quantity,
            snapshot: listing.snapshot(),
            recorded_at: Utc::now(),
        };
        action.validate()?;

        let stored = self.repositories.actions.append(action).await?;
        info!(
            event_name = "engine.action.recorded",
            customer_id = request.customer_id.0,
            listing_id = request.listing_id.0,
            action = stored.kind.as_str(),
            crop = %stored.crop,
            "customer action recorded"
        );
        Ok(stored)
    }
}


#[cfg(test)]
mod tests {
    use agrimarket_core::domain::action::ActionKind;
    use agrimarket_core::domain::customer::{CustomerId, CustomerProfile};
    use agrimarket_core::domain::listing::ListingId;
    use agrimarket_core::errors::DomainError;
    use agrimarket_core::model::ScoringMethod;
    use agrimarket_db::repositories::{
        ActionRepository, CustomerRepository, RecommendationRepository,
    };

    use super::test_support::Harness;
    use super::RecordActionRequest;
    use crate::error::EngineError;

    #[tokio::test]
    async fn profile_update_without_purchases_is_neutral_and_stamped() {
        let harness = Harness::new();
        harness.customer(1, Some("Meera Rao")).await;
        harness.action(1, "Wheat", ActionKind::Add, (30.0, 5.0, 40.0), 1).await;

        let profile = harness.engine.update_customer_profile(CustomerId(1)).await.unwrap();

        assert_eq!(profile, CustomerProfile::NEUTRAL);
        let stored = harness.customers.find_by_id(CustomerId(1)).await.unwrap().unwrap();
        assert_eq!(stored.profile, CustomerProfile::NEUTRAL);
        assert!(stored.last_profiled.is_some());
    }

    #[tokio::test]
    async fn profile_update_reflects_purchase_averages() {
        let harness = Harness::new();
        harness.customer(1, None).await;
        harness.action(1, "Wheat", ActionKind::Purchase, (50.0, 15.0, 10.0), 1).await;

        let profile = harness.engine.update_customer_profile(CustomerId(1)).await.unwrap();

        assert_eq!(profile.as_tuple(), (0.5, 0.5, 0.5));
        harness.action(1, "Rice", ActionKind::Purchase, (150.0, 45.0, 30.0), 1).await;
        let profile = harness.engine.update_customer_profile(CustomerId(1)).await.unwrap();
        assert_eq!(profile.as_tuple(), (1.0, 0.0, 0.0));
    }

    #[tokio::test]
    async fn unknown_customer_is_not_found_everywhere() {
        let harness = Harness::new();

        let profile = harness.engine.update_customer_profile(CustomerId(404)).await;
        let recommendations = harness.engine.get_customer_recommendations(CustomerId(404)).await;
        let preferred = harness.engine.get_preferred_market_items(CustomerId(404), None).await;

        assert!(matches!(profile, Err(EngineError::CustomerNotFound(CustomerId(404)))));
        assert!(matches!(recommendations, Err(EngineError::CustomerNotFound(_))));
        assert!(matches!(preferred, Err(EngineError::CustomerNotFound(_))));
    }

    #[tokio::test]
    async fn cold_start_customer_gets_fixed_priors() {
        let harness = Harness::new();
        harness.customer(3, Some("Priya Nair")).await;

        let output = harness.engine.get_customer_recommendations(CustomerId(3)).await.unwrap();

        assert_eq!(output.method, ScoringMethod::ColdStart);
        let stored = harness.recommendations.list_for_customer(CustomerId(3), None).await.unwrap();
        let pairs: Vec<(&str, f64)> =
            stored.iter().map(|r| (r.crop.as_str(), r.purchase_prob)).collect();
        assert_eq!(pairs, vec![("Wheat", 0.1), ("Rice", 0.05)]);
    }

    #[tokio::test]
    async fn lone_purchase_among_five_crops_uses_heuristic() {
        let harness = Harness::new();
        harness.customer(2, None).await;
        harness.action(2, "Wheat", ActionKind::Purchase, (30.0, 5.0, 40.0), 1).await;
        harness.action(2, "Rice", ActionKind::Add, (50.0, 10.0, 20.0), 1).await;
        harness.action(2, "Rice", ActionKind::Add, (50.0, 10.0, 20.0), 2).await;
        harness.action(2, "Maize", ActionKind::Add, (22.0, 0.0, 4.0), 1).await;
        harness.action(2, "Millet", ActionKind::Add, (55.0, 0.0, 12.0), 15).await;
        harness.action(2, "Onion", ActionKind::Remove, (26.0, 5.0, 3.0), 1).await;

        let output = harness.engine.get_customer_recommendations(CustomerId(2)).await.unwrap();

        assert_eq!(output.method, ScoringMethod::Heuristic);
        let crops: Vec<&str> = output.recommendations.iter().map(|r| r.crop.as_str()).collect();
        assert_eq!(crops, vec!["Wheat", "Rice", "Maize", "Millet", "Onion"]);
        assert!(output
            .recommendations
            .iter()
            .all(|r| (0.01..=0.99).contains(&r.purchase_prob)));
        assert_eq!(output.recommendations[0].purchase_prob, 0.99);
    }

    #[tokio::test]
    async fn forest_run_is_idempotent_and_one_row_per_crop() {
        let harness = Harness::new();
        harness.customer(1, Some("Meera Rao")).await;
        harness.forest_history(1).await;

        let first = harness.engine.get_customer_recommendations(CustomerId(1)).await.unwrap();
        let stored_first =
            harness.recommendations.list_for_customer(CustomerId(1), None).await.unwrap();
        harness.engine.get_customer_recommendations(CustomerId(1)).await.unwrap();
        let stored_second =
            harness.recommendations.list_for_customer(CustomerId(1), None).await.unwrap();

        assert_eq!(first.method, ScoringMethod::Forest);
        assert_eq!(stored_first.len(), 5);
        let crops: Vec<&str> = stored_second.iter().map(|r| r.crop.as_str()).collect();
        let expected: Vec<&str> = stored_first.iter().map(|r| r.crop.as_str()).collect();
        assert_eq!(crops, expected);
        for pair in stored_second.windows(2) {
            assert!(pair[0].purchase_prob >= pair[1].purchase_prob);
        }
        for (a, b) in stored_first.iter().zip(&stored_second) {
            assert!((a.purchase_prob - b.purchase_prob).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn preferred_items_are_read_only_and_in_stock() {
        let harness = Harness::new();
        harness.customer(1, None).await;
        harness.listing(10, "Wheat", 12).await;
        harness.listing(11, "Rice", 0).await;
        harness.listing(12, "Barley", 4).await;

        let before = harness.engine.get_preferred_market_items(CustomerId(1), None).await.unwrap();
        let stored = harness.recommendations.list_for_customer(CustomerId(1), None).await.unwrap();
        assert!(before.is_empty());
        assert!(stored.is_empty());

        harness.engine.get_customer_recommendations(CustomerId(1)).await.unwrap();
        let items =
            harness.engine.get_preferred_market_items(CustomerId(1), Some(5)).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 10);
        assert_eq!(items[0].crop_name, "Wheat");
        assert_eq!(items[0].purchase_probability, 0.1);
    }

    #[tokio::test]
    async fn record_action_snapshots_listing() {
        let harness = Harness::new();
        harness.customer(1, None).await;
        harness.listing(10, "Millet", 7).await;

        let stored = harness
            .engine
            .record_action(RecordActionRequest {
                customer_id: CustomerId(1),
                listing_id: ListingId(10),
                kind: ActionKind::Purchase,
                quantity: 2,
            })
            .await
            .unwrap();

        assert_eq!(stored.crop, "Millet");
        assert_eq!(stored.snapshot.price, Some(40.0));
        assert_eq!(stored.snapshot.discount, Some(10.0));
        assert_eq!(stored.snapshot.stock, Some(7.0));
        let history = harness.actions.list_for_customer(CustomerId(1), None).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn record_action_rejects_bad_input() {
        let harness = Harness::new();
        harness.customer(1, None).await;
        harness.listing(10, "Millet", 7).await;
        let request = RecordActionRequest {
            customer_id: CustomerId(1),
            listing_id: ListingId(10),
            kind: ActionKind::Add,
            quantity: 0,
        };

        let zero = harness.engine.record_action(request.clone()).await;
        let missing = harness
            .engine
            .record_action(RecordActionRequest {
                listing_id: ListingId(99),
                quantity: 1,
                ..request
            })
            .await;

        assert!(matches!(zero, Err(EngineError::Domain(DomainError::InvalidQuantity(0)))));
        assert!(matches!(missing, Err(EngineError::ListingNotFound(ListingId(99)))));
        assert!(harness.actions.list_for_customer(CustomerId(1), None).await.unwrap().is_empty());
    }
}
