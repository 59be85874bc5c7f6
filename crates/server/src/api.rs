use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use agrimarket_core::domain::action::{ActionKind, CustomerAction};
use agrimarket_core::domain::customer::{CustomerId, CustomerProfile};
use agrimarket_core::domain::listing::ListingId;
use agrimarket_core::domain::recommendation::{PreferredItem, Recommendation};
use agrimarket_core::errors::{ApplicationError, InterfaceError};
use agrimarket_core::model::ScoringMethod;
use agrimarket_engine::{EngineError, RecommendationEngine, RecordActionRequest};

#[derive(Clone)]
pub struct ApiState {
    engine: Arc<RecommendationEngine>,
    recommendation_limit: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub customer_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub correlation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationsView {
    pub method: ScoringMethod,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
pub struct PreferredItemsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecordActionBody {
    pub listing_id: i64,
    pub action: ActionKind,
    pub quantity: u32,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiError>)>;

pub fn router(engine: Arc<RecommendationEngine>, recommendation_limit: usize) -> Router {
    Router::new()
        .route("/api/v1/customers/{customer_id}/profile", post(update_profile))
        .route("/api/v1/customers/{customer_id}/recommendations", post(regenerate_recommendations))
        .route("/api/v1/customers/{customer_id}/preferred-items", get(preferred_items))
        .route("/api/v1/customers/{customer_id}/actions", post(record_action))
        .with_state(ApiState { engine, recommendation_limit })
}

async fn update_profile(
    Path(customer_id): Path<i64>,
    State(state): State<ApiState>,
) -> ApiResult<CustomerProfile> {
    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!("api.profile", correlation_id = %correlation_id, customer_id);

    let profile = state
        .engine
        .update_customer_profile(CustomerId(customer_id))
        .instrument(span)
        .await
        .map_err(|error| api_error(error, &correlation_id))?;

    Ok(Json(ApiResponse { success: true, data: profile, customer_id }))
}

async fn regenerate_recommendations(
    Path(customer_id): Path<i64>,
    State(state): State<ApiState>,
) -> ApiResult<RecommendationsView> {
    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!("api.recommendations", correlation_id = %correlation_id, customer_id);

    let output = state
        .engine
        .get_customer_recommendations(CustomerId(customer_id))
        .instrument(span)
        .await
        .map_err(|error| api_error(error, &correlation_id))?;

    let recommendations =
        output.recommendations.into_iter().take(state.recommendation_limit).collect();
    Ok(Json(ApiResponse {
        success: true,
        data: RecommendationsView { method: output.method, recommendations },
        customer_id,
    }))
}

async fn preferred_items(
    Path(customer_id): Path<i64>,
    Query(query): Query<PreferredItemsQuery>,
    State(state): State<ApiState>,
) -> ApiResult<Vec<PreferredItem>> {
    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!("api.preferred_items", correlation_id = %correlation_id, customer_id);

    let items = state
        .engine
        .get_preferred_market_items(CustomerId(customer_id), query.limit)
        .instrument(span)
        .await
        .map_err(|error| api_error(error, &correlation_id))?;

    Ok(Json(ApiResponse { success: true, data: items, customer_id }))
}

async fn record_action(
    Path(customer_id): Path<i64>,
    State(state): State<ApiState>,
    Json(body): Json<RecordActionBody>,
) -> ApiResult<CustomerAction> {
    let correlation_id = Uuid::new_v4().to_string();
    let span = info_span!("api.actions", correlation_id = %correlation_id, customer_id);

    let action = state
        .engine
        .record_action(RecordActionRequest {
            customer_id: CustomerId(customer_id),
            listing_id: ListingId(body.listing_id),
            kind: body.action,
            quantity: body.quantity,
        })
        .instrument(span)
        .await
        .map_err(|error| api_error(error, &correlation_id))?;

    Ok(Json(ApiResponse { success: true, data: action, customer_id }))
}

fn api_error(error: EngineError, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    let interface = ApplicationError::from(error).into_interface(correlation_id);
    let (status, message) = match &interface {
        InterfaceError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message.clone()),
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
        InterfaceError::ServiceUnavailable { .. } | InterfaceError::Internal { .. } => {
            error!(
                event_name = "api.request.failed",
                correlation_id = %correlation_id,
                error = %interface,
                "request failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, interface.user_message().to_string())
        }
    };

    (
        status,
        Json(ApiError {
            success: false,
            error: message,
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}
