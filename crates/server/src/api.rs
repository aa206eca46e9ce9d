use std::sync::Arc;

use autorec_core::errors::{AttributeError, InterfaceError};
use autorec_core::{Recommender, VehicleAttributes};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{require_api_key, ApiKeyGate};
use crate::health;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub gate: ApiKeyGate,
}

pub fn router(state: AppState) -> Router {
    let recommendations = Router::new()
        .route("/recommend", get(recommend))
        .route("/recommend/unseen", post(recommend_unseen))
        .route_layer(middleware::from_fn_with_state(state.gate.clone(), require_api_key));

    Router::new()
        .route("/", get(health::health))
        .merge(recommendations)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendParams {
    pub item_id: Option<String>,
    pub k: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<String>,
}

/// Transport wrapper so core interface errors render as JSON responses.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = json!({ "error": self.0.message() });
        if let InterfaceError::BadRequest { missing_fields, invalid_fields, .. } = &self.0 {
            if !missing_fields.is_empty() {
                body["missing_fields"] = json!(missing_fields);
            }
            if !invalid_fields.is_empty() {
                body["invalid_fields"] = json!(invalid_fields);
            }
        }

        let mut response = (status, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(self.0.correlation_id()) {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }
        response
    }
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// `k` from the query string or body; absent means the configured default.
fn parse_k(raw: Option<&str>) -> Result<Option<usize>, InterfaceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => match raw.parse::<usize>() {
            Ok(k) if k > 0 => Ok(Some(k)),
            _ => Err(InterfaceError::bad_request("k must be a positive integer")),
        },
    }
}

fn body_k(body: &Value) -> Result<Option<usize>, InterfaceError> {
    match body.get("k") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => match number.as_u64() {
            Some(k) if k > 0 => Ok(Some(usize::try_from(k).unwrap_or(usize::MAX))),
            _ => Err(InterfaceError::bad_request("k must be a positive integer")),
        },
        Some(Value::String(raw)) => parse_k(Some(raw)),
        Some(_) => Err(InterfaceError::bad_request("k must be a positive integer")),
    }
}

pub async fn recommend(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let correlation_id = correlation_id();
    let fail = |error: InterfaceError| ApiError(error.with_correlation_id(correlation_id.clone()));

    let item_id = params
        .item_id
        .as_deref()
        .filter(|item_id| !item_id.trim().is_empty())
        .ok_or_else(|| fail(InterfaceError::bad_request("item_id parameter is required")))?;
    let k = state
        .recommender
        .resolve_k(parse_k(params.k.as_deref()).map_err(fail)?)
        .map_err(|error| fail(error.into()))?;

    let Some(recommendations) = state
        .recommender
        .recommend_collaborative(item_id, k)
        .map_err(|error| fail(error.into()))?
    else {
        info!(
            event_name = "http.recommend.not_found",
            correlation_id = %correlation_id,
            item_id = %item_id,
            "item is not part of the trained model"
        );
        return Err(fail(InterfaceError::item_not_found(item_id)));
    };

    info!(
        event_name = "http.recommend.completed",
        correlation_id = %correlation_id,
        item_id = %item_id,
        k = k,
        returned = recommendations.len(),
        "collaborative recommendations served"
    );

    Ok(Json(RecommendationsResponse { recommendations }))
}

pub async fn recommend_unseen(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let correlation_id = correlation_id();
    let fail = |error: InterfaceError| {
        warn!(
            event_name = "http.recommend_unseen.rejected",
            correlation_id = %correlation_id,
            error = %error,
            "content-based request rejected"
        );
        ApiError(error.with_correlation_id(correlation_id.clone()))
    };

    let body: Value = serde_json::from_slice(&body)
        .map_err(|_| fail(AttributeError::NotAnObject.into()))?;
    let attributes = VehicleAttributes::from_json(&body).map_err(|error| fail(error.into()))?;
    let k = state
        .recommender
        .resolve_k(body_k(&body).map_err(&fail)?)
        .map_err(|error| fail(error.into()))?;

    let recommendations = state
        .recommender
        .recommend_content_based(&attributes, k)
        .map_err(|error| fail(error.into()))?;

    info!(
        event_name = "http.recommend_unseen.completed",
        correlation_id = %correlation_id,
        query_item_id = %attributes.item_id(),
        k = k,
        returned = recommendations.len(),
        "content-based recommendations served"
    );

    Ok(Json(RecommendationsResponse { recommendations }))
}
