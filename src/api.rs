//! HTTP API handlers for bizpulse.
//!
//! Each monitor is a batch job triggered by an external scheduler with a
//! bodyless `POST`. The response is either the run's counts (200) or the
//! run-level error (500). Dispatch failures never turn into a 500.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{
        HeaderName, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::data_sources::{EntityReader, NotificationSink};
use crate::error::MonitorError;
use crate::model::{ErrorResponse, StockCheckResponse, VisitCheckResponse};
use crate::monitor::{Run, StalenessPolicy, check_stock, check_visits};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub reader: Arc<dyn EntityReader>,
    pub sink: Arc<dyn NotificationSink>,
    pub policy: StalenessPolicy,
}

impl AppState {
    /// State backed by a single value that both reads entities and creates notifications.
    pub fn from_backend<B>(backend: B, policy: StalenessPolicy) -> Self
    where
        B: EntityReader + NotificationSink + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            reader: backend.clone(),
            sink: backend,
            policy,
        }
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Build the router with CORS and request tracing applied.
pub fn router(state: AppState) -> Router {
    // Browser-side callers send the platform's auth headers on the preflight
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route("/check-stock", post(post_check_stock))
        .route("/check-visits", post(post_check_visits))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(middleware::from_fn(preflight_no_content))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answer accepted CORS preflights with an empty `204 No Content`.
async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if is_preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// POST /check-stock - Run the stock monitor once.
///
/// # Response
///
/// ```json
/// {
///     "success": true,
///     "productsChecked": 12,
///     "outOfStock": 1,
///     "lowStock": 2,
///     "notificationsCreated": 6
/// }
/// ```
#[instrument(skip(state))]
pub async fn post_check_stock(
    State(state): State<AppState>,
) -> Result<Json<StockCheckResponse>, MonitorError> {
    let mut run = Run::start("check-stock", Utc::now());

    let report = check_stock(state.reader.as_ref(), state.sink.as_ref(), &mut run).await?;

    info!(
        notifications_created = report.notifications_created,
        "Stock check answered"
    );
    Ok(Json(report.into()))
}

/// POST /check-visits - Run the visit recency monitor once.
///
/// # Response
///
/// ```json
/// {
///     "success": true,
///     "clientsChecked": 40,
///     "notificationsCreated": 3
/// }
/// ```
#[instrument(skip(state))]
pub async fn post_check_visits(
    State(state): State<AppState>,
) -> Result<Json<VisitCheckResponse>, MonitorError> {
    let mut run = Run::start("check-visits", Utc::now());

    let report = check_visits(
        state.reader.as_ref(),
        state.sink.as_ref(),
        &state.policy,
        &mut run,
    )
    .await?;

    info!(
        notifications_created = report.notifications_created,
        "Visit check answered"
    );
    Ok(Json(report.into()))
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::monitor::testing::{FakeBackend, admins, product};

    fn state(backend: FakeBackend) -> AppState {
        AppState::from_backend(backend, StalenessPolicy::default())
    }

    #[tokio::test]
    async fn test_preflight_is_permissive() {
        let app = router(state(FakeBackend::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/check-stock")
                    .header("origin", "https://dashboard.example.com")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "authorization, apikey")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let allowed = response.headers()["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .to_string();
        assert!(allowed.contains("authorization"));
        assert!(allowed.contains("apikey"));
        assert!(allowed.contains("content-type"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_health_is_not_rewritten() {
        let app = router(state(FakeBackend::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_read_failure_is_500_with_error() {
        let app = router(state(FakeBackend::default().failing_products()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/check-stock")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("products"));
        assert!(body.get("success").is_none());
    }

    #[tokio::test]
    async fn test_stock_success_body() {
        let backend = FakeBackend::default()
            .with_products(vec![product("p1", "Bolt", 0, 5)])
            .with_admins(admins(&["a1", "a2"]));
        let app = router(state(backend));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/check-stock")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: StockCheckResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.success);
        assert_eq!(body.out_of_stock, 1);
        assert_eq!(body.notifications_created, 2);
    }
}
