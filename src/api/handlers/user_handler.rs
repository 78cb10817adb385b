//! User endpoints: registration and self-deletion.

use std::sync::Arc;

use axum::{
    extract::Extension, http::StatusCode, middleware, response::Json, routing::post, Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::{scope_middleware, CurrentUser};
use crate::api::AppState;
use crate::domain::UserResponse;
use crate::errors::AppResult;
use crate::infra::TxIsolation;
use crate::services::{RequestScope, UserService};

/// Display names allow ASCII letters and digits only.
static NAME_ALPHABET: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[a-zA-Z0-9]+$").expect("valid name pattern"));

/// User registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(email(message = "invalid email: malformed address"))]
    pub email: String,
    #[validate(
        length(min = 1, max = 85, message = "invalid name: length out of range"),
        regex(path = *NAME_ALPHABET, message = "invalid name: unexpected characters")
    )]
    pub name: String,
    #[validate(length(min = 4, max = 32, message = "invalid password: length out of range"))]
    pub password: String,
}

/// Create user routes with their per-request scope wiring.
///
/// Layer order (outermost first): isolation-level stamp, scope
/// middleware, handler. Both routes run at read-committed.
pub fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", post(register_user).delete(delete_self_user))
        .route_layer(middleware::from_fn_with_state(state, scope_middleware))
        .route_layer(Extension(TxIsolation::ReadCommitted))
}

/// Register a new user.
async fn register_user(
    Extension(scope): Extension<Arc<RequestScope>>,
    ValidatedJson(payload): ValidatedJson<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = scope
        .user_service()
        .register_user(payload.name, payload.email, payload.password)
        .await?;

    tracing::info!(email = %user.email, "user created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Delete the authenticated user's own account.
async fn delete_self_user(
    CurrentUser(user): CurrentUser,
    Extension(scope): Extension<Arc<RequestScope>>,
) -> AppResult<StatusCode> {
    scope.user_service().delete_user(user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}
