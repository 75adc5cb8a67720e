//! Shop-floor operations backend
//!
//! Machines, maintenance work orders, engineering change orders, shipping and
//! a rule-driven alert engine, served over a capability-gated JSON API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod alerts;
pub mod auth;
pub mod config;
pub mod datasource;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod notifications;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

use crate::auth::consts as perm;
use crate::auth::{AuthRouterExt, AuthService};
use crate::datasource::DataSource;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub data_source: Arc<dyn DataSource>,
    pub services: handlers::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wires services and the auth layer over one data source
    pub fn new(
        config: config::AppConfig,
        data_source: Arc<dyn DataSource>,
        notifier: Arc<dyn notifications::Notifier>,
    ) -> Self {
        let services =
            handlers::AppServices::new(data_source.clone(), config.alerts.clone(), notifier);
        let auth = Arc::new(AuthService::new(
            data_source.clone(),
            config.default_user_id.clone(),
        ));
        Self {
            config: Arc::new(config),
            data_source,
            services,
            auth,
        }
    }
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    // Session: any resolved user may read it; switching needs no user at all
    let session_read = Router::new()
        .route("/session", get(handlers::session::get_session))
        .with_auth();
    let session_switch =
        Router::new().route("/session", put(handlers::session::switch_session));

    let users_read = Router::new()
        .route("/users", get(handlers::users::list_users))
        .with_permission(perm::USERS_READ);

    // Machines
    let machines_read = Router::new()
        .route("/machines", get(handlers::machines::list_machines))
        .route("/machines/:id", get(handlers::machines::get_machine))
        .route(
            "/dashboard/summary",
            get(handlers::dashboard::dashboard_summary),
        )
        .with_permission(perm::MACHINES_READ);

    let machines_update = Router::new()
        .route(
            "/machines/:id/status",
            put(handlers::machines::update_machine_status),
        )
        .with_permission(perm::MACHINES_UPDATE);

    // Work orders
    let work_orders_read = Router::new()
        .route(
            "/work-orders",
            get(handlers::work_orders::list_work_orders),
        )
        .route(
            "/work-orders/:id",
            get(handlers::work_orders::get_work_order),
        )
        .with_permission(perm::WORKORDERS_READ);

    let work_orders_create = Router::new()
        .route(
            "/work-orders",
            post(handlers::work_orders::create_work_order),
        )
        .with_permission(perm::WORKORDERS_CREATE);

    let work_orders_update = Router::new()
        .route(
            "/work-orders/:id/status",
            put(handlers::work_orders::update_work_order_status),
        )
        .route(
            "/work-orders/:id/assign",
            put(handlers::work_orders::assign_work_order),
        )
        .with_permission(perm::WORKORDERS_UPDATE);

    // Engineering change orders
    let ecos_read = Router::new()
        .route("/ecos", get(handlers::ecos::list_ecos))
        .route("/ecos/:id", get(handlers::ecos::get_eco))
        .with_permission(perm::ECOS_READ);

    let ecos_create = Router::new()
        .route("/ecos", post(handlers::ecos::create_eco))
        .route("/ecos/:id/submit", post(handlers::ecos::submit_eco))
        .route("/ecos/:id/reopen", post(handlers::ecos::reopen_eco))
        .with_permission(perm::ECOS_CREATE);

    let ecos_review = Router::new()
        .route("/ecos/:id/approve", post(handlers::ecos::approve_eco))
        .route("/ecos/:id/reject", post(handlers::ecos::reject_eco))
        .route("/ecos/:id/implement", post(handlers::ecos::implement_eco))
        .with_permission(perm::ECOS_REVIEW);

    // Catalog
    let documents_read = Router::new()
        .route("/documents", get(handlers::catalog::list_documents))
        .with_permission(perm::DOCUMENTS_READ);

    let components_read = Router::new()
        .route("/components", get(handlers::catalog::list_components))
        .with_permission(perm::COMPONENTS_READ);

    // Shipping
    let shipping_read = Router::new()
        .route(
            "/shipping-orders",
            get(handlers::shipping::list_shipping_orders),
        )
        .route("/deliveries", get(handlers::shipping::list_deliveries))
        .route(
            "/part-readiness",
            get(handlers::shipping::list_part_readiness),
        )
        .with_permission(perm::SHIPPING_READ);

    let shipping_update = Router::new()
        .route(
            "/shipping-orders/:id/status",
            put(handlers::shipping::update_shipping_status),
        )
        .with_permission(perm::SHIPPING_UPDATE);

    // Alerts
    let alerts_read = Router::new()
        .route("/alerts", get(handlers::alerts::list_alerts))
        .with_permission(perm::ALERTS_READ);

    let alerts_refresh = Router::new()
        .route("/alerts/refresh", post(handlers::alerts::refresh_alerts))
        .with_permission(perm::ALERTS_REFRESH);

    let alerts_dismiss = Router::new()
        .route(
            "/alerts/:id/dismiss",
            post(handlers::alerts::dismiss_alert),
        )
        .with_permission(perm::ALERTS_DISMISS);

    Router::new()
        .merge(session_read)
        .merge(session_switch)
        .merge(users_read)
        .merge(machines_read)
        .merge(machines_update)
        .merge(work_orders_read)
        .merge(work_orders_create)
        .merge(work_orders_update)
        .merge(ecos_read)
        .merge(ecos_create)
        .merge(ecos_review)
        .merge(documents_read)
        .merge(components_read)
        .merge(shipping_read)
        .merge(shipping_update)
        .merge(alerts_read)
        .merge(alerts_refresh)
        .merge(alerts_dismiss)
}

/// Full application router: status/health at the root, the v1 API under
/// `/api/v1`, plus request-id, tracing and compression layers.
///
/// CORS is left to the caller since it depends on deployment config.
pub fn build_router(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        // Inject AuthService into request extensions for auth middleware
        .layer(Extension(state.auth.clone()))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "shopfloor-ops",
        "environment": state.config.environment,
        "dataSource": state.data_source.name(),
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    // The data source is healthy when its machine board can be read
    let data_source_status = match state.data_source.machines().await {
        Ok(_) => "healthy",
        Err(err) => {
            ::tracing::warn!(error = %err, "health check: data source unavailable");
            "unhealthy"
        }
    };

    let alerts_last_refreshed = state.services.alerts.last_refreshed().await;
    let health_data = json!({
        "status": data_source_status,
        "checks": {
            "dataSource": data_source_status,
        },
        "alertsLastRefreshed": alerts_last_refreshed,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
