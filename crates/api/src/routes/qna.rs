//! QnA answer handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use domain::models::{QnaAnswer, QnaAnswerInput};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::EventContext;
use crate::routes::{ok, Envelope};

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswersBody {
    #[validate(length(min = 1, message = "At least one answer is required"), nested)]
    pub answers: Vec<QnaAnswerInput>,

    /// Replace an answer set first submitted by another representative.
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
pub struct AnswersResponse {
    pub answers: Vec<QnaAnswer>,
}

/// GET /api/v1/events/:instance_id/:client_id/:event_id/qna
pub async fn get_answers(
    State(state): State<AppState>,
    ctx: EventContext,
) -> Result<Json<Envelope<AnswersResponse>>, ApiError> {
    let answers = state
        .services
        .qna
        .answers_for(&ctx.scope, ctx.actor_id())
        .await?;

    Ok(ok(AnswersResponse { answers }))
}

/// Submit the caller's answer set (shared by all reps of a sponsor).
///
/// POST /api/v1/events/:instance_id/:client_id/:event_id/qna
pub async fn submit_answers(
    State(state): State<AppState>,
    ctx: EventContext,
    body: Result<Json<SubmitAnswersBody>, JsonRejection>,
) -> Result<Json<Envelope<AnswersResponse>>, ApiError> {
    let Json(body) = body?;
    body.validate()?;

    let answers = state
        .services
        .qna
        .submit_answers(&ctx.scope, ctx.actor_id(), body.answers, body.overwrite)
        .await?;

    Ok(ok(AnswersResponse { answers }))
}
