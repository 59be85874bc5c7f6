use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use agrimarket_core::domain::action::{ActionId, ActionKind, CustomerAction, NewCustomerAction};
use agrimarket_core::domain::customer::{Customer, CustomerId, CustomerProfile};
use agrimarket_core::domain::listing::{ListingId, MarketListing};
use agrimarket_core::domain::recommendation::Recommendation;

use super::{
    ActionRepository, CustomerRepository, ListingRepository, RecommendationRepository,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<BTreeMap<CustomerId, Customer>>,
}

impl InMemoryCustomerRepository {
    pub async fn insert(&self, customer: Customer) {
        self.customers.write().await.insert(customer.id, customer);
    }
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.customers.read().await.get(&id).cloned())
    }

    async fn list_ids(&self) -> Result<Vec<CustomerId>, RepositoryError> {
        Ok(self.customers.read().await.keys().copied().collect())
    }

    async fn save_profile(
        &self,
        id: CustomerId,
        profile: CustomerProfile,
        profiled_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut customers = self.customers.write().await;
        let Some(customer) = customers.get_mut(&id) else {
            return Ok(false);
        };
        customer.profile = profile;
        customer.last_profiled = Some(profiled_at);
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryActionRepository {
    actions: RwLock<Vec<CustomerAction>>,
}

#[async_trait::async_trait]
impl ActionRepository for InMemoryActionRepository {
    async fn append(&self, action: NewCustomerAction) -> Result<CustomerAction, RepositoryError> {
        let mut actions = self.actions.write().await;
        let id = ActionId(actions.len() as i64 + 1);
        let stored = action.into_action(id);
        actions.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
        kind: Option<ActionKind>,
    ) -> Result<Vec<CustomerAction>, RepositoryError> {
        let actions = self.actions.read().await;
        let mut matching: Vec<CustomerAction> = actions
            .iter()
            .filter(|action| action.customer_id == customer_id)
            .filter(|action| kind.map_or(true, |kind| action.kind == kind))
            .cloned()
            .collect();
        matching.sort_by_key(|action| (action.recorded_at, action.id));
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryRecommendationRepository {
    rows: RwLock<HashMap<CustomerId, Vec<Recommendation>>>,
}

#[async_trait::async_trait]
impl RecommendationRepository for InMemoryRecommendationRepository {
    async fn replace_for_customer(
        &self,
        customer_id: CustomerId,
        recommendations: &[Recommendation],
    ) -> Result<(), RepositoryError> {
        let mut seen = HashSet::with_capacity(recommendations.len());
        if let Some(duplicate) =
            recommendations.iter().find(|recommendation| !seen.insert(recommendation.crop.as_str()))
        {
            return Err(RepositoryError::Conflict(format!(
                "duplicate recommendation for crop `{}`",
                duplicate.crop
            )));
        }

        self.rows.write().await.insert(customer_id, recommendations.to_vec());
        Ok(())
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        let rows = self.rows.read().await;
        let mut stored = rows.get(&customer_id).cloned().unwrap_or_default();
        stored.sort_by(|a, b| b.purchase_prob.total_cmp(&a.purchase_prob));
        if let Some(limit) = limit {
            stored.truncate(limit);
        }
        Ok(stored)
    }
}

#[derive(Default)]
pub struct InMemoryListingRepository {
    listings: RwLock<BTreeMap<ListingId, MarketListing>>,
}

impl InMemoryListingRepository {
    pub async fn insert(&self, listing: MarketListing) {
        self.listings.write().await.insert(listing.id, listing);
    }
}

#[async_trait::async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn find_by_id(&self, id: ListingId) -> Result<Option<MarketListing>, RepositoryError> {
        Ok(self.listings.read().await.get(&id).cloned())
    }

    async fn in_stock_for_products(
        &self,
        product_names: &[String],
    ) -> Result<Vec<MarketListing>, RepositoryError> {
        let listings = self.listings.read().await;
        Ok(listings
            .values()
            .filter(|listing| listing.in_stock())
            .filter(|listing| product_names.iter().any(|name| name == &listing.product_name))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use agrimarket_core::domain::action::{ActionKind, ActionSnapshot, NewCustomerAction};
    use agrimarket_core::domain::customer::{Customer, CustomerId, CustomerProfile};
    use agrimarket_core::domain::listing::{ListingId, MarketListing};
    use agrimarket_core::domain::recommendation::Recommendation;

    use crate::repositories::{
        ActionRepository, CustomerRepository, InMemoryActionRepository,
        InMemoryCustomerRepository, InMemoryListingRepository, InMemoryRecommendationRepository,
        ListingRepository, RecommendationRepository, RepositoryError,
    };

    #[tokio::test]
    async fn in_memory_customer_profile_round_trip() {
        let repo = InMemoryCustomerRepository::default();
        repo.insert(Customer::new(CustomerId(3)).with_user_name("Priya")).await;
        let profile =
            CustomerProfile { discount_sensitivity: 0.1, price_elasticity: 0.2, stock_urgency: 0.3 };
        let now = Utc::now();

        assert!(repo.save_profile(CustomerId(3), profile, now).await.expect("save"));
        assert!(!repo.save_profile(CustomerId(4), profile, now).await.expect("save missing"));

        let customer = repo.find_by_id(CustomerId(3)).await.expect("find").expect("customer");
        assert_eq!(customer.profile, profile);
        assert_eq!(customer.last_profiled, Some(now));
    }

    #[tokio::test]
    async fn in_memory_actions_filter_by_kind_in_time_order() {
        let repo = InMemoryActionRepository::default();
        let now = Utc::now();
        for (kind, minutes_ago) in
            [(ActionKind::Purchase, 1), (ActionKind::Add, 10), (ActionKind::Purchase, 5)]
        {
            repo.append(NewCustomerAction {
                customer_id: CustomerId(1),
                crop: "Wheat".to_string(),
                kind,
                quantity: 1,
                snapshot: ActionSnapshot::default(),
                recorded_at: now - Duration::minutes(minutes_ago),
            })
            .await
            .expect("append");
        }

        let purchases = repo
            .list_for_customer(CustomerId(1), Some(ActionKind::Purchase))
            .await
            .expect("list purchases");
        let all = repo.list_for_customer(CustomerId(1), None).await.expect("list all");

        assert_eq!(purchases.len(), 2);
        assert!(purchases[0].recorded_at < purchases[1].recorded_at);
        assert_eq!(all[0].kind, ActionKind::Add);
        assert!(repo.list_for_customer(CustomerId(2), None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn in_memory_recommendations_replace_and_reject_duplicates() {
        let repo = InMemoryRecommendationRepository::default();
        repo.replace_for_customer(
            CustomerId(1),
            &[Recommendation::new("Rice", 0.2), Recommendation::new("Wheat", 0.9)],
        )
        .await
        .expect("replace");

        let duplicate = repo
            .replace_for_customer(
                CustomerId(1),
                &[Recommendation::new("Rice", 0.3), Recommendation::new("Rice", 0.4)],
            )
            .await;
        let stored = repo.list_for_customer(CustomerId(1), Some(1)).await.expect("list");

        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));
        assert_eq!(stored, vec![Recommendation::new("Wheat", 0.9)]);
    }

    #[tokio::test]
    async fn in_memory_listings_filter_stock_and_names() {
        let repo = InMemoryListingRepository::default();
        for (id, name, stock) in [(1, "Wheat", 0), (2, "Wheat", 4), (3, "Rice", 2)] {
            repo.insert(MarketListing {
                id: ListingId(id),
                product_name: name.to_string(),
                farmer_name: "Ravi".to_string(),
                price: 10.0,
                weight: 1.0,
                stock,
                discount: 0.0,
            })
            .await;
        }

        let listings =
            repo.in_stock_for_products(&["Wheat".to_string()]).await.expect("in stock listings");

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, ListingId(2));
        assert!(repo.find_by_id(ListingId(1)).await.expect("find").is_some());
    }
}
