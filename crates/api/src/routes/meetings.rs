//! Meeting lifecycle handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use domain::models::{MeetingRecord, MeetingStatus};
use domain::services::RequestMeeting;
use serde::{Deserialize, Serialize};
use shared::validation::parse_meeting_slot;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::EventContext;
use crate::middleware::metrics::record_meeting_transition;
use crate::routes::{ok, Envelope};

/// Path parameters of single-meeting routes.
#[derive(Debug, Deserialize)]
pub struct MeetingPath {
    pub instance_id: String,
    pub client_id: String,
    pub event_id: String,
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeetingBody {
    #[validate(custom(function = "shared::validation::validate_identifier"))]
    pub invitee_id: String,

    #[validate(length(max = 1000, message = "Remarks must be at most 1000 characters"))]
    pub remarks: Option<String>,

    #[serde(default, rename = "isCreatedByAI")]
    pub is_created_by_ai: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBody {
    pub meeting_slot: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RemarksBody {
    #[validate(length(max = 1000, message = "Remarks must be at most 1000 characters"))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttendedBody {
    pub attended: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MeetingResponse {
    pub meeting: MeetingRecord,
}

#[derive(Debug, Serialize)]
pub struct MeetingListResponse {
    pub meetings: Vec<MeetingRecord>,
}

type MeetingResult = Result<Json<Envelope<MeetingResponse>>, ApiError>;

fn meeting(record: MeetingRecord) -> Json<Envelope<MeetingResponse>> {
    ok(MeetingResponse { meeting: record })
}

/// Parses the optional `status` filter of the meeting list.
fn status_filter(params: ListParams) -> Result<Option<MeetingStatus>, ApiError> {
    params
        .status
        .map(|raw| raw.trim().to_lowercase())
        .filter(|raw| !raw.is_empty())
        .map(|raw| raw.parse::<MeetingStatus>().map_err(ApiError::payload))
        .transpose()
}

/// List the caller's meetings, optionally filtered by status.
///
/// GET /api/v1/events/:instance_id/:client_id/:event_id/meetings
pub async fn list_meetings(
    State(state): State<AppState>,
    ctx: EventContext,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Envelope<MeetingListResponse>>, ApiError> {
    let Query(params) = params?;
    let status = status_filter(params)?;

    let meetings = state
        .services
        .lifecycle
        .meetings_for(&ctx.scope, ctx.actor_id(), status)
        .await?;

    Ok(ok(MeetingListResponse { meetings }))
}

/// Request a meeting with another attendee.
///
/// POST /api/v1/events/:instance_id/:client_id/:event_id/meetings
pub async fn request_meeting(
    State(state): State<AppState>,
    ctx: EventContext,
    body: Result<Json<RequestMeetingBody>, JsonRejection>,
) -> MeetingResult {
    let Json(body) = body?;
    body.validate()?;

    let record = state
        .services
        .lifecycle
        .request(
            &ctx.scope,
            ctx.actor_id(),
            RequestMeeting {
                invitee_id: body.invitee_id,
                remarks: body.remarks,
                is_created_by_ai: body.is_created_by_ai,
            },
        )
        .await?;

    record_meeting_transition(MeetingStatus::Requested);
    Ok(meeting(record))
}

/// GET /api/v1/events/:instance_id/:client_id/:event_id/meetings/:code
pub async fn get_meeting(
    State(state): State<AppState>,
    ctx: EventContext,
    Path(path): Path<MeetingPath>,
) -> MeetingResult {
    let record = state
        .services
        .lifecycle
        .get_meeting(&ctx.scope, ctx.actor_id(), &path.code)
        .await?;

    Ok(meeting(record))
}

/// Confirm a requested meeting at a slot.
///
/// POST /api/v1/events/:instance_id/:client_id/:event_id/meetings/:code/confirm
pub async fn confirm_meeting(
    State(state): State<AppState>,
    ctx: EventContext,
    Path(path): Path<MeetingPath>,
    body: Result<Json<ConfirmBody>, JsonRejection>,
) -> MeetingResult {
    let Json(body) = body?;
    let slot = parse_meeting_slot(&body.meeting_slot)
        .map_err(|_| ApiError::payload("meetingSlot must be an RFC 3339 timestamp"))?;

    let record = state
        .services
        .lifecycle
        .confirm(&ctx.scope, ctx.actor_id(), &path.code, slot)
        .await?;

    record_meeting_transition(MeetingStatus::Confirmed);
    Ok(meeting(record))
}

/// POST /api/v1/events/:instance_id/:client_id/:event_id/meetings/:code/cancel
pub async fn cancel_meeting(
    State(state): State<AppState>,
    ctx: EventContext,
    Path(path): Path<MeetingPath>,
    body: Option<Json<RemarksBody>>,
) -> MeetingResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;

    let record = state
        .services
        .lifecycle
        .cancel(&ctx.scope, ctx.actor_id(), &path.code, body.remarks)
        .await?;

    record_meeting_transition(MeetingStatus::Cancelled);
    Ok(meeting(record))
}

/// POST /api/v1/events/:instance_id/:client_id/:event_id/meetings/:code/reject
pub async fn reject_meeting(
    State(state): State<AppState>,
    ctx: EventContext,
    Path(path): Path<MeetingPath>,
    body: Option<Json<RemarksBody>>,
) -> MeetingResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;

    let record = state
        .services
        .lifecycle
        .reject(&ctx.scope, ctx.actor_id(), &path.code, body.remarks)
        .await?;

    record_meeting_transition(MeetingStatus::Rejected);
    Ok(meeting(record))
}

/// POST /api/v1/events/:instance_id/:client_id/:event_id/meetings/:code/attended
pub async fn mark_attended(
    State(state): State<AppState>,
    ctx: EventContext,
    Path(path): Path<MeetingPath>,
    body: Result<Json<AttendedBody>, JsonRejection>,
) -> MeetingResult {
    let Json(body) = body?;

    let record = state
        .services
        .lifecycle
        .mark_attended(&ctx.scope, ctx.actor_id(), &path.code, body.attended)
        .await?;

    Ok(meeting(record))
}

/// Hard-delete a meeting in any state (admin only).
///
/// DELETE /api/v1/events/:instance_id/:client_id/:event_id/meetings/:code
pub async fn delete_meeting(
    State(state): State<AppState>,
    ctx: EventContext,
    Path(path): Path<MeetingPath>,
) -> MeetingResult {
    let record = state
        .services
        .lifecycle
        .delete(&ctx.scope, &path.code)
        .await?;

    tracing::info!(
        user_id = %ctx.caller.user_id,
        meeting_code = %record.meeting_code,
        "Meeting deleted by admin"
    );
    Ok(meeting(record))
}
