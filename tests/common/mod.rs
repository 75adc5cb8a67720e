use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use shopfloor_ops::{
    config::AppConfig,
    datasource::{DataSource, MockDataSource},
    notifications::RecordingNotifier,
    AppState,
};
use tower::ServiceExt;

/// Helper harness for driving the full router over seeded mock fixtures.
pub struct TestApp {
    router: Router,
    #[allow(dead_code)]
    pub state: AppState,
    #[allow(dead_code)]
    pub notifier: RecordingNotifier,
}

impl TestApp {
    /// No session user; requests must send `X-User-Id`.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Starts with `user_id` as the session user.
    #[allow(dead_code)]
    pub fn with_session_user(user_id: &str) -> Self {
        Self::with_config(AppConfig {
            default_user_id: Some(user_id.to_string()),
            ..AppConfig::default()
        })
    }

    pub fn with_config(config: AppConfig) -> Self {
        let source: Arc<dyn DataSource> = Arc::new(MockDataSource::seeded());
        let notifier = RecordingNotifier::new();
        let state = AppState::new(config, source, Arc::new(notifier.clone()));
        let router = shopfloor_ops::build_router(state.clone());

        Self {
            router,
            state,
            notifier,
        }
    }

    /// Send a request against the router, optionally as `user`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        user: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for requests made as a given user.
    #[allow(dead_code)]
    pub async fn request_as(
        &self,
        user: &str,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(user)).await
    }
}

#[allow(dead_code)]
pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

// Seeded users, one per role
#[allow(dead_code)]
pub const ADMIN: &str = "U-1";
#[allow(dead_code)]
pub const MANAGER: &str = "U-2";
#[allow(dead_code)]
pub const ENGINEER: &str = "U-3";
#[allow(dead_code)]
pub const TECHNICIAN: &str = "U-4";
#[allow(dead_code)]
pub const SHIPPING: &str = "U-5";
#[allow(dead_code)]
pub const VIEWER: &str = "U-6";
