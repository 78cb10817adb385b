//! Request-scope middleware.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::infra::TxIsolation;

/// Creates the request scope and guarantees it is closed once the
/// response has been produced.
///
/// The isolation level is taken from the route's extension (routes stamp
/// it with a `TxIsolation` layer) and falls back to the default. The
/// scope itself travels in the request extensions for handlers and
/// extractors downstream.
pub async fn scope_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let isolation = request
        .extensions()
        .get::<TxIsolation>()
        .copied()
        .unwrap_or_default();

    let scope = Arc::new(
        state
            .scope_factory
            .create_scope_with_isolation_level(isolation),
    );
    request.extensions_mut().insert(scope.clone());

    let response = next.run(request).await;

    if let Err(err) = scope.close().await {
        tracing::warn!(error = %err, "failed to close request scope");
    }

    response
}
