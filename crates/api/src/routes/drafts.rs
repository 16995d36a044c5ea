//! Sponsor draft handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use domain::models::MeetingRecord;
use domain::services::DraftItemResult;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::EventContext;
use crate::middleware::metrics::record_draft_items;
use crate::routes::{ok, Envelope};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DraftBody {
    #[validate(custom(function = "shared::validation::validate_identifier_list"))]
    pub invitee_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SponsorPath {
    pub instance_id: String,
    pub client_id: String,
    pub event_id: String,
    pub sponsor_id: String,
}

#[derive(Debug, Serialize)]
pub struct DraftBatchResponse {
    pub results: Vec<DraftItemResult>,
}

#[derive(Debug, Serialize)]
pub struct DraftListResponse {
    pub drafts: Vec<MeetingRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub deleted: u64,
}

fn batch(action: &'static str, results: Vec<DraftItemResult>) -> Json<Envelope<DraftBatchResponse>> {
    let succeeded = results.iter().filter(|r| r.success).count();
    record_draft_items(action, succeeded, results.len() - succeeded);
    ok(DraftBatchResponse { results })
}

/// Add attendees to the caller's sponsor draft.
///
/// POST /api/v1/events/:instance_id/:client_id/:event_id/drafts
pub async fn save_drafts(
    State(state): State<AppState>,
    ctx: EventContext,
    body: Result<Json<DraftBody>, JsonRejection>,
) -> Result<Json<Envelope<DraftBatchResponse>>, ApiError> {
    let Json(body) = body?;
    body.validate()?;

    let results = state
        .services
        .drafts
        .save_as_draft(&ctx.scope, ctx.actor_id(), body.invitee_ids)
        .await?;

    Ok(batch("save", results))
}

/// Remove attendees from the caller's sponsor draft.
///
/// DELETE /api/v1/events/:instance_id/:client_id/:event_id/drafts
pub async fn remove_drafts(
    State(state): State<AppState>,
    ctx: EventContext,
    body: Result<Json<DraftBody>, JsonRejection>,
) -> Result<Json<Envelope<DraftBatchResponse>>, ApiError> {
    let Json(body) = body?;
    body.validate()?;

    let results = state
        .services
        .drafts
        .remove_from_draft(&ctx.scope, ctx.actor_id(), body.invitee_ids)
        .await?;

    Ok(batch("remove", results))
}

/// GET /api/v1/events/:instance_id/:client_id/:event_id/drafts
pub async fn list_drafts(
    State(state): State<AppState>,
    ctx: EventContext,
) -> Result<Json<Envelope<DraftListResponse>>, ApiError> {
    let drafts = state
        .services
        .drafts
        .list_drafts(&ctx.scope, ctx.actor_id())
        .await?;

    Ok(ok(DraftListResponse { drafts }))
}

/// Drop every draft of a sponsor (admin only).
///
/// DELETE /api/v1/events/:instance_id/:client_id/:event_id/sponsors/:sponsor_id/drafts
pub async fn purge_sponsor_drafts(
    State(state): State<AppState>,
    ctx: EventContext,
    Path(path): Path<SponsorPath>,
) -> Result<Json<Envelope<PurgeResponse>>, ApiError> {
    let deleted = state
        .services
        .lifecycle
        .purge_sponsor_drafts(&ctx.scope, &path.sponsor_id)
        .await?;

    tracing::info!(
        user_id = %ctx.caller.user_id,
        sponsor_id = %path.sponsor_id,
        deleted,
        "Sponsor drafts purged"
    );
    Ok(ok(PurgeResponse { deleted }))
}
