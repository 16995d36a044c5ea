//! Meeting lifecycle manager.
//!
//! Drives ledger rows through `draft → requested → confirmed/cancelled/rejected`
//! and keeps the denormalized profile counters and the attendee listing in
//! step with confirmed meetings. Follow-up writes after a successful transition
//! are best effort: failures are logged and left for the next refresh.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::codes::generate_meeting_code;
use shared::validation::validate_remarks;
use tracing::{info, instrument, warn};

use super::notification::{dispatch, MeetingNotification, MeetingNotifier, NotificationType};
use super::store_call::bounded;
use super::{SchedulingSettings, Stores};
use crate::error::SchedulingError;
use crate::models::{
    AttendeeRecord, ConfirmOutcome, ConfirmRequest, DirectoryKey, EventScope, Listing,
    MeetingPredicate, MeetingRecord, MeetingStatus, NewMeeting, Participant, Profile,
    StatusUpdate,
};

/// Input of a meeting request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeeting {
    pub invitee_id: String,
    pub remarks: Option<String>,
    pub is_created_by_ai: bool,
}

impl RequestMeeting {
    pub fn to(invitee_id: impl Into<String>) -> Self {
        Self {
            invitee_id: invitee_id.into(),
            ..Self::default()
        }
    }
}

/// Whether `actor` acts for `side`, directly or through its sponsor.
fn owns_side(actor: &AttendeeRecord, side: &Participant) -> bool {
    side.id == actor.attendee_id
        || actor
            .sponsor_id()
            .is_some_and(|sponsor| side.type_entity_id.as_deref() == Some(sponsor))
}

fn check_remarks(remarks: &Option<String>) -> Result<(), SchedulingError> {
    match remarks {
        Some(text) => validate_remarks(text)
            .map_err(|_| SchedulingError::Payload("Remarks are too long".to_string())),
        None => Ok(()),
    }
}

/// Rejects a move of `meeting` to `next` that the status machine does not allow.
///
/// Drafts are a payload error, a record already in `next` or in a terminal
/// state is a duplicate, anything else is a payload error.
fn check_transition(meeting: &MeetingRecord, next: MeetingStatus) -> Result<(), SchedulingError> {
    let current = meeting.request_status;
    if current.can_transition_to(next) {
        return Ok(());
    }
    let code = &meeting.meeting_code;
    if current == MeetingStatus::Draft {
        return Err(SchedulingError::Payload(format!(
            "Meeting {code} is still a draft"
        )));
    }
    if current == next || current.is_terminal() {
        return Err(SchedulingError::Duplicate(format!(
            "Meeting {code} is already {current}"
        )));
    }
    Err(SchedulingError::Payload(format!(
        "Meeting {code} is {current} and cannot become {next}"
    )))
}

pub struct MeetingLifecycle {
    stores: Stores,
    settings: SchedulingSettings,
    notifier: Arc<dyn MeetingNotifier>,
}

impl MeetingLifecycle {
    pub fn new(
        stores: Stores,
        settings: SchedulingSettings,
        notifier: Arc<dyn MeetingNotifier>,
    ) -> Self {
        Self {
            stores,
            settings,
            notifier,
        }
    }

    /// Opens a meeting request from `actor_id` to the invitee.
    ///
    /// A sponsor draft for the same invitee is promoted instead of inserting a
    /// second row.
    #[instrument(skip(self, request), fields(ice_id = %scope.ice_id(), invitee_id = %request.invitee_id))]
    pub async fn request(
        &self,
        scope: &EventScope,
        actor_id: &str,
        request: RequestMeeting,
    ) -> Result<MeetingRecord, SchedulingError> {
        let invitee_id = request.invitee_id.trim();
        if invitee_id.is_empty() {
            return Err(SchedulingError::Payload("inviteeId is required".to_string()));
        }
        if invitee_id == actor_id {
            return Err(SchedulingError::Payload(
                "Cannot request a meeting with yourself".to_string(),
            ));
        }
        check_remarks(&request.remarks)?;

        let (actor, invitee) = tokio::try_join!(
            self.stores.require_attendee(&self.settings, scope, actor_id),
            self.stores.require_attendee(&self.settings, scope, invitee_id),
        )?;
        if let (Some(a), Some(b)) = (actor.sponsor_id(), invitee.sponsor_id()) {
            if a == b {
                return Err(SchedulingError::Payload(
                    "Representatives of the same sponsor cannot meet each other".to_string(),
                ));
            }
        }

        let timeout = self.settings.store_timeout;
        let (counts, invitee_meetings) = tokio::try_join!(
            bounded(
                timeout,
                "count_confirmed_by_participant",
                self.stores.ledger.count_confirmed_by_participant(scope),
            ),
            bounded(
                timeout,
                "find_by_participant",
                self.stores.ledger.find_by_participant(scope, invitee_id),
            ),
        )?;

        for party in [&actor, &invitee] {
            let confirmed = counts.get(&party.attendee_id).copied().unwrap_or(0);
            if !party.is_sponsor_rep() && confirmed >= self.settings.meeting_quota {
                return Err(self.quota_error(&party.attendee_id));
            }
        }

        let owner = actor.owner_id();
        let mut draft = None;
        for meeting in &invitee_meetings {
            if meeting.counterpart_of(owner) != Some(invitee_id) {
                continue;
            }
            match meeting.request_status {
                MeetingStatus::Confirmed => {
                    return Err(SchedulingError::Duplicate(format!(
                        "A confirmed meeting with {invitee_id} already exists"
                    )))
                }
                MeetingStatus::Requested => {
                    return Err(SchedulingError::Duplicate(format!(
                        "A meeting request with {invitee_id} is already open"
                    )))
                }
                MeetingStatus::Draft => draft = Some(meeting),
                MeetingStatus::Cancelled | MeetingStatus::Rejected => {}
            }
        }

        let requestor = Participant::from_attendee(&actor);
        let meeting = match draft {
            Some(draft) => {
                let update = StatusUpdate::to(MeetingStatus::Requested)
                    .with_requestor(requestor)
                    .with_remarks(request.remarks);
                bounded(
                    timeout,
                    "update_status",
                    self.stores.ledger.update_status(
                        scope,
                        draft.id,
                        &MeetingStatus::predecessors(MeetingStatus::Requested),
                        update,
                    ),
                )
                .await?
                .ok_or_else(|| {
                    SchedulingError::Duplicate(format!(
                        "Draft for {invitee_id} was changed by another request"
                    ))
                })?
            }
            None => {
                let new_meeting = NewMeeting {
                    meeting_code: generate_meeting_code(),
                    ice_id: scope.ice_id(),
                    requestor,
                    invitee: Participant::from_attendee(&invitee),
                    status: MeetingStatus::Requested,
                    remarks: request.remarks,
                    is_created_by_ai: request.is_created_by_ai,
                };
                bounded(timeout, "insert", self.stores.ledger.insert(new_meeting)).await?
            }
        };

        info!(
            meeting_code = %meeting.meeting_code,
            requestor_id = %meeting.requestor_id,
            invitee_id = %meeting.invitee_id,
            "Meeting requested"
        );
        self.notify(NotificationType::MeetingRequested, &meeting, &meeting.invitee_id, actor_id);

        Ok(meeting)
    }

    /// Confirms a requested meeting at `slot`. Only the invitee side may confirm.
    #[instrument(skip(self), fields(ice_id = %scope.ice_id()))]
    pub async fn confirm(
        &self,
        scope: &EventScope,
        actor_id: &str,
        meeting_code: &str,
        slot: DateTime<Utc>,
    ) -> Result<MeetingRecord, SchedulingError> {
        let meeting = self.find_meeting(scope, meeting_code).await?;
        let (actor, requestor, invitee) = tokio::try_join!(
            self.stores.require_attendee(&self.settings, scope, actor_id),
            self.stores
                .require_attendee(&self.settings, scope, &meeting.requestor_id),
            self.stores
                .require_attendee(&self.settings, scope, &meeting.invitee_id),
        )?;

        if !owns_side(&actor, &meeting.invitee()) {
            return Err(SchedulingError::AccessDenied(
                "Only the invitee can confirm this meeting".to_string(),
            ));
        }
        check_transition(&meeting, MeetingStatus::Confirmed)?;
        if !requestor.accepts_slot(&slot) || !invitee.accepts_slot(&slot) {
            return Err(SchedulingError::Payload(format!(
                "Slot {} is not offered by both participants",
                slot.to_rfc3339()
            )));
        }

        let request = ConfirmRequest {
            meeting_id: meeting.id,
            slot,
            quota_participants: meeting
                .non_sponsor_participants()
                .into_iter()
                .map(str::to_string)
                .collect(),
            quota: self.settings.meeting_quota,
            slot_participants: vec![meeting.requestor_id.clone(), meeting.invitee_id.clone()],
        };

        let outcome = bounded(
            self.settings.store_timeout,
            "confirm_within_quota",
            self.stores.ledger.confirm_within_quota(scope, request),
        )
        .await?;

        let confirmed = match outcome {
            ConfirmOutcome::Confirmed(record) => record,
            ConfirmOutcome::QuotaExceeded { participant_id } => {
                return Err(self.quota_error(&participant_id))
            }
            ConfirmOutcome::SlotTaken { participant_id } => {
                return Err(SchedulingError::Occupied(format!(
                    "{participant_id} already has a meeting at {}",
                    slot.to_rfc3339()
                )))
            }
            ConfirmOutcome::StatusMismatch(Some(status)) => {
                return Err(SchedulingError::Duplicate(format!(
                    "Meeting {meeting_code} is already {status}"
                )))
            }
            ConfirmOutcome::StatusMismatch(None) => {
                return Err(SchedulingError::NotFound(format!(
                    "Meeting {meeting_code} not found"
                )))
            }
        };

        info!(
            meeting_code = %confirmed.meeting_code,
            slot = %slot.to_rfc3339(),
            "Meeting confirmed"
        );
        self.refresh_confirmed_counters(scope, &confirmed).await;
        self.notify(
            NotificationType::MeetingConfirmed,
            &confirmed,
            &confirmed.requestor_id,
            actor_id,
        );

        Ok(confirmed)
    }

    /// Cancels a requested or confirmed meeting; either side may cancel.
    #[instrument(skip(self, remarks), fields(ice_id = %scope.ice_id()))]
    pub async fn cancel(
        &self,
        scope: &EventScope,
        actor_id: &str,
        meeting_code: &str,
        remarks: Option<String>,
    ) -> Result<MeetingRecord, SchedulingError> {
        check_remarks(&remarks)?;
        let meeting = self.find_meeting(scope, meeting_code).await?;
        let actor = self
            .stores
            .require_attendee(&self.settings, scope, actor_id)
            .await?;

        let on_requestor_side = owns_side(&actor, &meeting.requestor());
        if !on_requestor_side && !owns_side(&actor, &meeting.invitee()) {
            return Err(SchedulingError::AccessDenied(
                "Only a participant can cancel this meeting".to_string(),
            ));
        }
        check_transition(&meeting, MeetingStatus::Cancelled)?;

        let cancelled = self
            .transition(
                scope,
                &meeting,
                &MeetingStatus::predecessors(MeetingStatus::Cancelled),
                StatusUpdate::to(MeetingStatus::Cancelled).with_remarks(remarks),
            )
            .await?;

        info!(
            meeting_code = %meeting_code,
            previous_status = %meeting.request_status,
            "Meeting cancelled"
        );
        if meeting.request_status == MeetingStatus::Confirmed {
            self.refresh_confirmed_counters(scope, &cancelled).await;
        }
        let recipient = if on_requestor_side {
            &cancelled.invitee_id
        } else {
            &cancelled.requestor_id
        };
        self.notify(NotificationType::MeetingCancelled, &cancelled, recipient, actor_id);

        Ok(cancelled)
    }

    /// Invitee-side refusal of a pending request.
    #[instrument(skip(self, remarks), fields(ice_id = %scope.ice_id()))]
    pub async fn reject(
        &self,
        scope: &EventScope,
        actor_id: &str,
        meeting_code: &str,
        remarks: Option<String>,
    ) -> Result<MeetingRecord, SchedulingError> {
        check_remarks(&remarks)?;
        let meeting = self.find_meeting(scope, meeting_code).await?;
        let actor = self
            .stores
            .require_attendee(&self.settings, scope, actor_id)
            .await?;

        if !owns_side(&actor, &meeting.invitee()) {
            return Err(SchedulingError::AccessDenied(
                "Only the invitee can reject this meeting".to_string(),
            ));
        }
        check_transition(&meeting, MeetingStatus::Rejected)?;

        let rejected = self
            .transition(
                scope,
                &meeting,
                &MeetingStatus::predecessors(MeetingStatus::Rejected),
                StatusUpdate::to(MeetingStatus::Rejected).with_remarks(remarks),
            )
            .await?;

        info!(meeting_code = %meeting_code, "Meeting rejected");
        self.notify(
            NotificationType::MeetingRejected,
            &rejected,
            &rejected.requestor_id,
            actor_id,
        );

        Ok(rejected)
    }

    /// Hard removal of one ledger row, whatever its state.
    #[instrument(skip(self), fields(ice_id = %scope.ice_id()))]
    pub async fn delete(
        &self,
        scope: &EventScope,
        meeting_code: &str,
    ) -> Result<MeetingRecord, SchedulingError> {
        let meeting = self.find_meeting(scope, meeting_code).await?;
        let removed = bounded(
            self.settings.store_timeout,
            "delete",
            self.stores.ledger.delete(scope, meeting.id),
        )
        .await?;
        if !removed {
            return Err(SchedulingError::NotFound(format!(
                "Meeting {meeting_code} not found"
            )));
        }

        warn!(
            meeting_code = %meeting_code,
            status = %meeting.request_status,
            "Meeting deleted"
        );
        if meeting.request_status == MeetingStatus::Confirmed {
            self.refresh_confirmed_counters(scope, &meeting).await;
        }

        Ok(meeting)
    }

    /// Removes every draft of a sponsor; returns how many rows were deleted.
    #[instrument(skip(self), fields(ice_id = %scope.ice_id()))]
    pub async fn purge_sponsor_drafts(
        &self,
        scope: &EventScope,
        sponsor_id: &str,
    ) -> Result<u64, SchedulingError> {
        if sponsor_id.trim().is_empty() {
            return Err(SchedulingError::Payload("sponsorId is required".to_string()));
        }
        let removed = bounded(
            self.settings.store_timeout,
            "delete_many",
            self.stores
                .ledger
                .delete_many(scope, &MeetingPredicate::drafts_of(sponsor_id)),
        )
        .await?;

        info!(sponsor_id = %sponsor_id, removed = removed, "Sponsor drafts purged");
        Ok(removed)
    }

    /// The actor's meetings, newest first. Reps also see their sponsor's rows.
    pub async fn meetings_for(
        &self,
        scope: &EventScope,
        actor_id: &str,
        status: Option<MeetingStatus>,
    ) -> Result<Vec<MeetingRecord>, SchedulingError> {
        let actor = self
            .stores
            .require_attendee(&self.settings, scope, actor_id)
            .await?;
        let timeout = self.settings.store_timeout;

        let mut meetings = bounded(
            timeout,
            "find_by_participant",
            self.stores.ledger.find_by_participant(scope, actor_id),
        )
        .await?;
        if let Some(sponsor_id) = actor.sponsor_id() {
            let sponsor_rows = bounded(
                timeout,
                "find_by_sponsor",
                self.stores.ledger.find_by_sponsor(scope, sponsor_id),
            )
            .await?;
            for row in sponsor_rows {
                if !meetings.iter().any(|m| m.id == row.id) {
                    meetings.push(row);
                }
            }
        }

        meetings.retain(|m| {
            status.is_none_or(|s| m.request_status == s)
                && (m.request_status != MeetingStatus::Draft
                    || owns_side(&actor, &m.requestor()))
        });
        meetings.sort_by(|a, b| b.request_date_time.cmp(&a.request_date_time));

        Ok(meetings)
    }

    /// One meeting, visible only to its participants.
    pub async fn get_meeting(
        &self,
        scope: &EventScope,
        actor_id: &str,
        meeting_code: &str,
    ) -> Result<MeetingRecord, SchedulingError> {
        let (meeting, actor) = tokio::try_join!(
            self.find_meeting(scope, meeting_code),
            self.stores.require_attendee(&self.settings, scope, actor_id),
        )?;
        if !owns_side(&actor, &meeting.requestor()) && !owns_side(&actor, &meeting.invitee()) {
            return Err(SchedulingError::AccessDenied(format!(
                "Meeting {meeting_code} does not involve {actor_id}"
            )));
        }
        Ok(meeting)
    }

    /// Sets the post-hoc attendance flag of a confirmed meeting.
    #[instrument(skip(self), fields(ice_id = %scope.ice_id()))]
    pub async fn mark_attended(
        &self,
        scope: &EventScope,
        actor_id: &str,
        meeting_code: &str,
        attended: bool,
    ) -> Result<MeetingRecord, SchedulingError> {
        let meeting = self.get_meeting(scope, actor_id, meeting_code).await?;
        if meeting.request_status != MeetingStatus::Confirmed {
            return Err(SchedulingError::Payload(format!(
                "Meeting {meeting_code} is {}; only confirmed meetings can be attended",
                meeting.request_status
            )));
        }

        bounded(
            self.settings.store_timeout,
            "set_attended",
            self.stores.ledger.set_attended(scope, meeting.id, attended),
        )
        .await?
        .ok_or_else(|| SchedulingError::NotFound(format!("Meeting {meeting_code} not found")))
    }

    async fn find_meeting(
        &self,
        scope: &EventScope,
        meeting_code: &str,
    ) -> Result<MeetingRecord, SchedulingError> {
        if meeting_code.trim().is_empty() {
            return Err(SchedulingError::Payload("meetingCode is required".to_string()));
        }
        bounded(
            self.settings.store_timeout,
            "find_by_code",
            self.stores.ledger.find_by_code(scope, meeting_code),
        )
        .await?
        .ok_or_else(|| SchedulingError::NotFound(format!("Meeting {meeting_code} not found")))
    }

    /// Conditional status write; a lost race reads as a duplicate operation.
    async fn transition(
        &self,
        scope: &EventScope,
        meeting: &MeetingRecord,
        expected: &[MeetingStatus],
        update: StatusUpdate,
    ) -> Result<MeetingRecord, SchedulingError> {
        bounded(
            self.settings.store_timeout,
            "update_status",
            self.stores
                .ledger
                .update_status(scope, meeting.id, expected, update),
        )
        .await?
        .ok_or_else(|| {
            SchedulingError::Duplicate(format!(
                "Meeting {} was changed by another request",
                meeting.meeting_code
            ))
        })
    }

    /// Rewrites `confirmed_meetings` of the meeting's non-sponsor participants
    /// and drops the event's cached attendee listing.
    async fn refresh_confirmed_counters(&self, scope: &EventScope, meeting: &MeetingRecord) {
        let timeout = self.settings.store_timeout;
        let refresh = async {
            let counts = bounded(
                timeout,
                "count_confirmed_by_participant",
                self.stores.ledger.count_confirmed_by_participant(scope),
            )
            .await?;
            for attendee_id in meeting.non_sponsor_participants() {
                let Some(mut attendee) = bounded(
                    timeout,
                    "get_attendee",
                    self.stores.profiles.get_attendee(scope, attendee_id),
                )
                .await?
                else {
                    continue;
                };
                attendee.confirmed_meetings = counts.get(attendee_id).copied().unwrap_or(0);
                bounded(
                    timeout,
                    "update_entity",
                    self.stores
                        .profiles
                        .update_entity(scope, &Profile::Attendee(attendee)),
                )
                .await?;
            }
            Ok::<_, SchedulingError>(())
        };

        if let Err(err) = refresh.await {
            warn!(
                meeting_code = %meeting.meeting_code,
                error = %err,
                "Failed to refresh confirmed meeting counters"
            );
        }

        let key = DirectoryKey::new(scope, Listing::Attendees).to_string();
        self.stores.cache.invalidate(&key).await;
    }

    fn notify(
        &self,
        notification_type: NotificationType,
        meeting: &MeetingRecord,
        recipient_id: &str,
        triggered_by: &str,
    ) {
        dispatch(
            &self.notifier,
            MeetingNotification::for_meeting(notification_type, meeting, recipient_id, triggered_by),
        );
    }

    fn quota_error(&self, attendee_id: &str) -> SchedulingError {
        SchedulingError::Occupied(format!(
            "Attendee {attendee_id} already has {} confirmed meetings",
            self.settings.meeting_quota
        ))
    }
}
