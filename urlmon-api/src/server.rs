use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use urlmon_core::{
    Error,
    config::Config,
    models::{CreateMonitorRequest, HealthCheck, Monitor},
    store::MonitorStore,
};

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: MonitorStore,
    pub config: Config,
}

#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.0 {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

pub async fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/monitors", get(list_monitors).post(create_monitor))
        .route("/monitors/", get(list_monitors).post(create_monitor))
        .route("/monitors/{id}", get(get_monitor).delete(deactivate_monitor))
        .route("/monitors/{id}/checks", get(list_health_checks))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "URL Monitor Service"
    }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now()
    }))
}

async fn create_monitor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMonitorRequest>,
) -> Result<Json<Monitor>, ApiError> {
    request.validate()?;

    let monitor = state
        .store
        .create_monitor(&request.url, request.check_interval)
        .await?;

    Ok(Json(monitor))
}

#[derive(Debug, Deserialize)]
struct ListMonitorsQuery {
    skip: Option<i64>,
    limit: Option<i64>,
}

async fn list_monitors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListMonitorsQuery>,
) -> Result<Json<Vec<Monitor>>, ApiError> {
    let monitors = state
        .store
        .list_monitors(query.skip.unwrap_or(0), query.limit.unwrap_or(100))
        .await?;

    Ok(Json(monitors))
}

async fn get_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Monitor>, ApiError> {
    let monitor = state.store.get_monitor(id).await?;
    Ok(Json(monitor))
}

async fn deactivate_monitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Monitor>, ApiError> {
    let monitor = state.store.deactivate_monitor(id).await?;
    Ok(Json(monitor))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

async fn list_health_checks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HealthCheck>>, ApiError> {
    // 404 for unknown monitors rather than an empty history.
    state.store.get_monitor(id).await?;

    let checks = state.store.list_health_checks(id, query.limit).await?;
    Ok(Json(checks))
}
