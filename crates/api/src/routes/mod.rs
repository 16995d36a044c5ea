//! HTTP route handlers.

pub mod directory;
pub mod drafts;
pub mod health;
pub mod meetings;
pub mod qna;

use axum::Json;
use serde::Serialize;

/// Success envelope: `{"status": 0, ...body}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: i32,
    #[serde(flatten)]
    pub body: T,
}

/// Wraps a successful result in the status-0 envelope.
pub fn ok<T: Serialize>(body: T) -> Json<Envelope<T>> {
    Json(Envelope { status: 0, body })
}
