//! Agrimarket recommendation core.
//!
//! Pure domain logic for the customer profiling and purchase-propensity pipeline:
//! - `profile` turns a purchase history into three behavioral scalars
//! - `features` aggregates the action log into one engineered row per crop
//! - `model` scales those rows and scores them (random forest or heuristic fallback)
//! - `ranker` joins stored recommendations with live listings
//!
//! Nothing in this crate touches storage; the `agrimarket-engine` crate wires these
//! stages to repositories in the order profile, features, model, persist.

pub mod config;
pub mod domain;
pub mod errors;
pub mod features;
pub mod model;
pub mod profile;
pub mod ranker;

pub use domain::action::{ActionId, ActionKind, ActionSnapshot, CustomerAction, NewCustomerAction};
pub use domain::customer::{Customer, CustomerId, CustomerProfile};
pub use domain::listing::{ListingId, MarketListing};
pub use domain::recommendation::{PreferredItem, Recommendation};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use features::{CropFeatureRow, FeatureBuilder, FeatureColumn};
pub use model::{
    Classifier, ForestParams, ModelError, PropensityModel, PropensityOutput, ScoringMethod,
};
pub use profile::{estimate_profile, PurchaseStats};
pub use ranker::{rank_listings, recommended_crops, round_probability};
