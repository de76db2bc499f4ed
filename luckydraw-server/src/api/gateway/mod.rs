//! Gateway API handlers.
//!
//! Called by the chat gateway on behalf of chat users. Every request body is
//! signed with the shared gateway secret and verified via the
//! `LuckyDraw-Signature` header.
//!
//! # Endpoints
//!
//! - `POST /join`    – a `/join [keyword]` command
//! - `POST /history` – events a user joined and prizes they won

use axum::{Router, http::StatusCode, response::IntoResponse, routing::post};
use luckydraw_core::store::StoreError;

use crate::state::AppState;

mod history;
mod join;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/join", post(join::join))
        .route("/history", post(history::history))
}

#[derive(Debug)]
pub(crate) enum GatewayApiError {
    Storage(StoreError),
}

impl From<StoreError> for GatewayApiError {
    fn from(e: StoreError) -> Self {
        GatewayApiError::Storage(e)
    }
}

impl IntoResponse for GatewayApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            GatewayApiError::Storage(e) => {
                tracing::error!(error = %e, "Gateway API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
