//! Direct transport: `POST /mcp`, plain JSON request/response with no
//! session binding at all.

use super::AppState;
use crate::mcp::DispatchContext;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

pub async fn handler(State(state): State<AppState>, body: String) -> Response {
    let response = state.core.handle_message(&DispatchContext::unbound(), &body).await;
    match response {
        Some(value) => Json(value).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
