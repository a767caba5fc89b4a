//! Bearer-token gate for mutating endpoints.
//!
//! No configured token means mutation is disabled, not open: every request
//! is rejected until an operator sets `CONTROL_AUTH_TOKEN`. Read endpoints
//! never pass through this layer.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.auth_token() else {
        return ApiError::unauthorized(
            "no control auth token is configured; mutating endpoints are disabled",
        )
        .into_response();
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => ApiError::unauthorized("invalid bearer token").into_response(),
        None => ApiError::unauthorized("missing bearer token").into_response(),
    }
}
