//! Sponsor draft shortlists.
//!
//! Drafts are ledger rows with status `draft`, keyed by sponsor and invitee,
//! so every representative of a sponsor sees and edits the same list.

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument};

use super::store_call::bounded;
use super::{SchedulingSettings, Stores};
use crate::error::SchedulingError;
use crate::models::{
    AttendeeRecord, EventScope, MeetingPredicate, MeetingRecord, MeetingStatus, NewMeeting,
    Participant,
};

/// Outcome of one invitee in a draft batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftItemResult {
    pub invitee_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl DraftItemResult {
    fn from_result(invitee_id: String, result: Result<Option<String>, SchedulingError>) -> Self {
        match result {
            Ok(meeting_code) => Self {
                invitee_id,
                success: true,
                meeting_code,
                status: None,
                msg: None,
            },
            Err(err) => Self {
                invitee_id,
                success: false,
                meeting_code: None,
                status: Some(err.status()),
                msg: Some(err.message().to_string()),
            },
        }
    }
}

/// Deduplicated, trimmed invitee ids; an empty batch is a payload error.
fn normalize_invitees(invitee_ids: Vec<String>) -> Result<Vec<String>, SchedulingError> {
    let mut unique: Vec<String> = Vec::with_capacity(invitee_ids.len());
    for id in invitee_ids {
        let id = id.trim().to_string();
        if !id.is_empty() && !unique.contains(&id) {
            unique.push(id);
        }
    }
    if unique.is_empty() {
        return Err(SchedulingError::Payload(
            "At least one inviteeId is required".to_string(),
        ));
    }
    Ok(unique)
}

pub struct DraftManager {
    stores: Stores,
    settings: SchedulingSettings,
}

impl DraftManager {
    pub fn new(stores: Stores, settings: SchedulingSettings) -> Self {
        Self { stores, settings }
    }

    /// Adds each invitee to the sponsor's drafts, reporting per invitee.
    #[instrument(skip(self, invitee_ids), fields(ice_id = %scope.ice_id()))]
    pub async fn save_as_draft(
        &self,
        scope: &EventScope,
        actor_id: &str,
        invitee_ids: Vec<String>,
    ) -> Result<Vec<DraftItemResult>, SchedulingError> {
        let invitee_ids = normalize_invitees(invitee_ids)?;
        let rep = self.require_rep(scope, actor_id).await?;

        let results = join_all(invitee_ids.into_iter().map(|invitee_id| {
            let rep = &rep;
            async move {
                let result = self.save_one(scope, rep, &invitee_id).await;
                DraftItemResult::from_result(invitee_id, result)
            }
        }))
        .await;

        info!(
            actor_id = %actor_id,
            saved = results.iter().filter(|r| r.success).count(),
            failed = results.iter().filter(|r| !r.success).count(),
            "Drafts saved"
        );
        Ok(results)
    }

    /// Removes each invitee from the sponsor's drafts, reporting per invitee.
    #[instrument(skip(self, invitee_ids), fields(ice_id = %scope.ice_id()))]
    pub async fn remove_from_draft(
        &self,
        scope: &EventScope,
        actor_id: &str,
        invitee_ids: Vec<String>,
    ) -> Result<Vec<DraftItemResult>, SchedulingError> {
        let invitee_ids = normalize_invitees(invitee_ids)?;
        let rep = self.require_rep(scope, actor_id).await?;
        let sponsor_id = rep.owner_id();

        let results = join_all(invitee_ids.into_iter().map(|invitee_id| async move {
            let predicate = MeetingPredicate {
                counterpart_ids: Some(vec![invitee_id.clone()]),
                ..MeetingPredicate::drafts_of(sponsor_id)
            };
            let result = bounded(
                self.settings.store_timeout,
                "delete_many",
                self.stores.ledger.delete_many(scope, &predicate),
            )
            .await
            .and_then(|removed| match removed {
                0 => Err(SchedulingError::NotFound(format!(
                    "No draft for {invitee_id}"
                ))),
                _ => Ok(None),
            });
            DraftItemResult::from_result(invitee_id, result)
        }))
        .await;

        info!(
            actor_id = %actor_id,
            removed = results.iter().filter(|r| r.success).count(),
            "Drafts removed"
        );
        Ok(results)
    }

    /// The sponsor's current drafts, oldest first.
    pub async fn list_drafts(
        &self,
        scope: &EventScope,
        actor_id: &str,
    ) -> Result<Vec<MeetingRecord>, SchedulingError> {
        let rep = self.require_rep(scope, actor_id).await?;
        let mut drafts: Vec<MeetingRecord> = bounded(
            self.settings.store_timeout,
            "find_by_sponsor",
            self.stores.ledger.find_by_sponsor(scope, rep.owner_id()),
        )
        .await?
        .into_iter()
        .filter(|m| m.request_status == MeetingStatus::Draft)
        .collect();
        drafts.sort_by_key(|m| m.request_date_time);
        Ok(drafts)
    }

    async fn save_one(
        &self,
        scope: &EventScope,
        rep: &AttendeeRecord,
        invitee_id: &str,
    ) -> Result<Option<String>, SchedulingError> {
        let invitee = self
            .stores
            .require_attendee(&self.settings, scope, invitee_id)
            .await?;
        if invitee.sponsor_id() == rep.sponsor_id() {
            return Err(SchedulingError::Payload(
                "Representatives of the same sponsor cannot meet each other".to_string(),
            ));
        }

        let sponsor_id = rep.owner_id();
        let open = bounded(
            self.settings.store_timeout,
            "find_by_participant",
            self.stores.ledger.find_by_participant(scope, invitee_id),
        )
        .await?
        .into_iter()
        .find(|m| {
            m.counterpart_of(sponsor_id) == Some(invitee_id)
                && matches!(
                    m.request_status,
                    MeetingStatus::Requested | MeetingStatus::Confirmed
                )
        });
        if let Some(meeting) = open {
            return Err(SchedulingError::Duplicate(format!(
                "Meeting {} with {invitee_id} is already {}",
                meeting.meeting_code, meeting.request_status
            )));
        }

        let draft = NewMeeting {
            meeting_code: shared::codes::generate_meeting_code(),
            ice_id: scope.ice_id(),
            requestor: Participant::from_attendee(rep),
            invitee: Participant::from_attendee(&invitee),
            status: MeetingStatus::Draft,
            remarks: None,
            is_created_by_ai: false,
        };
        let saved = bounded(
            self.settings.store_timeout,
            "upsert_draft",
            self.stores.ledger.upsert_draft(draft),
        )
        .await?;
        Ok(Some(saved.meeting_code))
    }

    async fn require_rep(
        &self,
        scope: &EventScope,
        actor_id: &str,
    ) -> Result<AttendeeRecord, SchedulingError> {
        let actor = self
            .stores
            .require_attendee(&self.settings, scope, actor_id)
            .await?;
        if !actor.is_sponsor_rep() {
            return Err(SchedulingError::Payload(format!(
                "Attendee {actor_id} is not linked to a sponsor"
            )));
        }
        Ok(actor)
    }
}
