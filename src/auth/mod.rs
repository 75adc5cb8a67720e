/*!
 * # Authorization Module
 *
 * Role/capability model for the dashboard API.
 *
 * - The current user is chosen explicitly (`PUT /api/v1/session`) and may be
 *   overridden per request with the `X-User-Id` header; there are no
 *   credentials.
 * - Each user carries one role; a role grants capability strings with
 *   `resource:*` and `*` wildcards (see [`rbac`]).
 * - Routes are gated with [`AuthRouterExt::with_permission`].
 */

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::datasource::DataSource;
use crate::errors::ServiceError;
use crate::models::UserProfile;

pub mod permissions;
mod rbac;
mod session;

pub use permissions::*;
pub use rbac::*;
pub use session::SessionStore;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request runs as, with their role's capabilities expanded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub capabilities: Vec<String>,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn role(&self) -> &str {
        &self.profile.role
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Authorization error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No current user selected")]
    MissingAuth,

    #[error("Unknown user {0}")]
    UnknownUser(String),

    #[error("Missing capability {0}")]
    InsufficientPermissions(String),

    #[error(transparent)]
    Lookup(#[from] ServiceError),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuth | AuthError::UnknownUser(_) => {
                ServiceError::Unauthorized(err.to_string())
            }
            AuthError::InsufficientPermissions(_) => ServiceError::Forbidden(err.to_string()),
            AuthError::Lookup(inner) => inner,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Resolves the current user and answers capability questions
pub struct AuthService {
    rbac: RbacService,
    sessions: SessionStore,
    users: Arc<dyn DataSource>,
}

impl AuthService {
    pub fn new(users: Arc<dyn DataSource>, default_user_id: Option<String>) -> Self {
        Self {
            rbac: RbacService::new(),
            sessions: SessionStore::new(default_user_id),
            users,
        }
    }

    pub fn rbac(&self) -> &RbacService {
        &self.rbac
    }

    fn current_user(&self, profile: UserProfile) -> CurrentUser {
        let capabilities = self.rbac.effective_capabilities(&profile.role);
        CurrentUser {
            profile,
            capabilities,
        }
    }

    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, ServiceError> {
        Ok(self
            .users
            .users()
            .await?
            .into_iter()
            .find(|u| u.id == user_id))
    }

    /// The request's user: the header override when given, else the session's.
    pub async fn resolve(&self, override_id: Option<&str>) -> Result<CurrentUser, AuthError> {
        let user_id = match override_id {
            Some(id) => id.to_string(),
            None => self
                .sessions
                .current_user_id()
                .await
                .ok_or(AuthError::MissingAuth)?,
        };

        let profile = self
            .find_user(&user_id)
            .await?
            .ok_or(AuthError::UnknownUser(user_id))?;
        Ok(self.current_user(profile))
    }

    /// Makes `user_id` the session's current user.
    pub async fn switch_user(&self, user_id: &str) -> Result<CurrentUser, ServiceError> {
        let profile = self
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        let previous = self.sessions.switch_to(profile.id.clone()).await;
        debug!(from = ?previous, to = %profile.id, "current user switched");
        Ok(self.current_user(profile))
    }
}

/// Capability middleware; expects [`auth_middleware`] to have run first
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_capability(&required_permission) {
        debug!(user_id = %user.id(), role = %user.role(), capability = %required_permission, "capability denied");
        return Err(AuthError::InsufficientPermissions(required_permission));
    }

    Ok(next.run(request).await)
}

/// Resolves the current user into request extensions
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return ServiceError::InternalError("Authorization service not available".into())
                .into_response();
        }
    };

    let override_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    match auth_service.resolve(override_id.as_deref()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}
