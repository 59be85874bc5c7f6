//! Batch recommendation runs over one or all customers.
//!
//! Each customer is processed as its own unit: profile update, then recommendation
//! replacement. A failure is captured on that customer's outcome and logged, and the run
//! moves on to the next customer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, Instrument};

use agrimarket_core::domain::customer::{CustomerId, CustomerProfile};
use agrimarket_core::domain::recommendation::Recommendation;
use agrimarket_core::model::ScoringMethod;

use crate::error::EngineError;
use crate::runtime::RecommendationEngine;

/// Recommendations echoed per customer in the summary.
pub const SUMMARY_TOP_CROPS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStage {
    Lookup,
    Profile,
    Recommendations,
}

impl BatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Profile => "profile",
            Self::Recommendations => "recommendations",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CustomerRunStatus {
    Succeeded {
        profile: CustomerProfile,
        method: ScoringMethod,
        saved: usize,
        top_crops: Vec<Recommendation>,
    },
    Failed {
        stage: BatchStage,
        error: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerOutcome {
    pub customer_id: CustomerId,
    pub display_name: String,
    #[serde(flatten)]
    pub status: CustomerRunStatus,
}

impl CustomerOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, CustomerRunStatus::Succeeded { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CustomerOutcome>,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.processed() - self.succeeded()
    }
}

impl RecommendationEngine {
    /// Runs the profile and recommendation pipeline for `customer`, or for every customer
    /// when `None`. A requested customer that does not exist fails the whole run before
    /// anything is written.
    pub async fn run_batch(
        &self,
        customer: Option<CustomerId>,
    ) -> Result<BatchSummary, EngineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("batch_run", correlation_id = %run_id);
        self.run_batch_with_id(run_id, customer).instrument(span).await
    }

    async fn run_batch_with_id(
        &self,
        run_id: String,
        customer: Option<CustomerId>,
    ) -> Result<BatchSummary, EngineError> {
        let started_at = Utc::now();
        let customer_ids = match customer {
            Some(id) => {
                self.require_customer(id).await?;
                vec![id]
            }
            None => self.repositories().customers.list_ids().await?,
        };

        info!(
            event_name = "engine.batch.started",
            correlation_id = %run_id,
            customers = customer_ids.len(),
            "batch recommendation run started"
        );

        let mut outcomes = Vec::with_capacity(customer_ids.len());
        for customer_id in customer_ids {
            let outcome = self.process_customer(customer_id).await;
            if let CustomerRunStatus::Failed { stage, error } = &outcome.status {
                error!(
                    event_name = "engine.batch.customer_failed",
                    correlation_id = %run_id,
                    customer_id = customer_id.0,
                    stage = stage.as_str(),
                    error = %error,
                    "customer failed during batch run"
                );
            }
            outcomes.push(outcome);
        }

        let summary = BatchSummary { run_id, started_at, finished_at: Utc::now(), outcomes };
        info!(
            event_name = "engine.batch.completed",
            correlation_id = %summary.run_id,
            processed = summary.processed(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "batch recommendation run completed"
        );
        Ok(summary)
    }

    async fn process_customer(&self, customer_id: CustomerId) -> CustomerOutcome {
        let fallback_name = format!("Customer {customer_id}");
        let failed = |display_name: String, stage: BatchStage, error: EngineError| {
            CustomerOutcome {
                customer_id,
                display_name,
                status: CustomerRunStatus::Failed { stage, error: error.to_string() },
            }
        };

        let display_name = match self.require_customer(customer_id).await {
            Ok(customer) => customer.display_name(),
            Err(error) => return failed(fallback_name, BatchStage::Lookup, error),
        };

        let profile = match self.update_customer_profile(customer_id).await {
            Ok(profile) => profile,
            Err(error) => return failed(display_name, BatchStage::Profile, error),
        };

        match self.recommend_with_profile(customer_id, profile).await {
            Ok(output) => CustomerOutcome {
                customer_id,
                display_name,
                status: CustomerRunStatus::Succeeded {
                    profile,
                    method: output.method,
                    saved: output.recommendations.len(),
                    top_crops: output
                        .recommendations
                        .into_iter()
                        .take(SUMMARY_TOP_CROPS)
                        .collect(),
                },
            },
            Err(error) => failed(display_name, BatchStage::Recommendations, error),
        }
    }
}
