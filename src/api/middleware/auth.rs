//! Basic authentication boundary.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Basic, Authorization, HeaderMapExt};

use crate::domain::User;
use crate::errors::AppError;
use crate::services::{RequestScope, UserService};

/// User resolved from the request's `Authorization: Basic` credentials.
///
/// Extraction verifies the credentials through the request scope's user
/// service. A missing or malformed header and failed verification all
/// reject with a bare 401.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Authorization(credentials) = parts
            .headers
            .typed_get::<Authorization<Basic>>()
            .ok_or(AppError::Unauthorized)?;

        let scope = parts
            .extensions
            .get::<Arc<RequestScope>>()
            .cloned()
            .ok_or_else(|| AppError::internal("request scope missing"))?;

        let user = scope
            .user_service()
            .verify_credentials(credentials.username(), credentials.password())
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "basic auth verification failed");
                err
            })?;

        Ok(CurrentUser(user))
    }
}
