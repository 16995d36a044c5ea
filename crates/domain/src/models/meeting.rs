//! Meeting ledger models and the meeting status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::AttendeeRecord;

/// Status of a meeting record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Draft,
    Requested,
    Confirmed,
    Cancelled,
    Rejected,
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetingStatus::Draft => write!(f, "draft"),
            MeetingStatus::Requested => write!(f, "requested"),
            MeetingStatus::Confirmed => write!(f, "confirmed"),
            MeetingStatus::Cancelled => write!(f, "cancelled"),
            MeetingStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for MeetingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(MeetingStatus::Draft),
            "requested" => Ok(MeetingStatus::Requested),
            "confirmed" => Ok(MeetingStatus::Confirmed),
            "cancelled" => Ok(MeetingStatus::Cancelled),
            "rejected" => Ok(MeetingStatus::Rejected),
            other => Err(format!("Unknown meeting status: {other}")),
        }
    }
}

impl MeetingStatus {
    /// Legal ledger transitions. Hard deletion is handled separately and is
    /// allowed from any state.
    pub fn can_transition_to(self, next: MeetingStatus) -> bool {
        matches!(
            (self, next),
            (MeetingStatus::Draft, MeetingStatus::Requested)
                | (MeetingStatus::Requested, MeetingStatus::Confirmed)
                | (MeetingStatus::Requested, MeetingStatus::Cancelled)
                | (MeetingStatus::Requested, MeetingStatus::Rejected)
                | (MeetingStatus::Confirmed, MeetingStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MeetingStatus::Cancelled | MeetingStatus::Rejected)
    }

    /// States a record must be in before moving to `next`.
    pub fn predecessors(next: MeetingStatus) -> Vec<MeetingStatus> {
        [
            MeetingStatus::Draft,
            MeetingStatus::Requested,
            MeetingStatus::Confirmed,
            MeetingStatus::Cancelled,
            MeetingStatus::Rejected,
        ]
        .into_iter()
        .filter(|s| s.can_transition_to(next))
        .collect()
    }
}

/// Role a participant plays on one side of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticipantType {
    Attendee,
    SponsorRep,
}

impl std::fmt::Display for ParticipantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantType::Attendee => write!(f, "attendee"),
            ParticipantType::SponsorRep => write!(f, "sponsorRep"),
        }
    }
}

impl std::str::FromStr for ParticipantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attendee" => Ok(ParticipantType::Attendee),
            "sponsorRep" => Ok(ParticipantType::SponsorRep),
            other => Err(format!("Unknown participant type: {other}")),
        }
    }
}

/// One side of a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub kind: ParticipantType,
    /// Sponsor id when `kind` is `SponsorRep`, otherwise `None`.
    pub type_entity_id: Option<String>,
}

impl Participant {
    pub fn from_attendee(record: &AttendeeRecord) -> Self {
        Self {
            id: record.attendee_id.clone(),
            kind: record.participant_type(),
            type_entity_id: record.sponsor_id().map(str::to_string),
        }
    }

    /// Whether this side belongs to `owner_id` (the person or their sponsor).
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.id == owner_id || self.type_entity_id.as_deref() == Some(owner_id)
    }

    pub fn is_sponsor_side(&self) -> bool {
        self.kind == ParticipantType::SponsorRep
    }
}

/// A meeting ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRecord {
    pub id: Uuid,
    pub meeting_code: String,
    pub ice_id: String,
    pub requestor_id: String,
    pub requestor_type: ParticipantType,
    pub requestor_type_entity_id: Option<String>,
    pub invitee_id: String,
    pub invitee_type: ParticipantType,
    pub invitee_type_entity_id: Option<String>,
    pub request_status: MeetingStatus,
    pub request_meeting_slot: Option<DateTime<Utc>>,
    pub request_date_time: DateTime<Utc>,
    pub request_update_date_time: DateTime<Utc>,
    pub remarks: Option<String>,
    #[serde(rename = "isCreatedByAI")]
    pub is_created_by_ai: bool,
    pub attended: bool,
}

impl MeetingRecord {
    pub fn requestor(&self) -> Participant {
        Participant {
            id: self.requestor_id.clone(),
            kind: self.requestor_type,
            type_entity_id: self.requestor_type_entity_id.clone(),
        }
    }

    pub fn invitee(&self) -> Participant {
        Participant {
            id: self.invitee_id.clone(),
            kind: self.invitee_type,
            type_entity_id: self.invitee_type_entity_id.clone(),
        }
    }

    pub fn involves(&self, entity_id: &str) -> bool {
        self.requestor_id == entity_id || self.invitee_id == entity_id
    }

    /// Whether either side is a representative of `sponsor_id`.
    pub fn involves_sponsor(&self, sponsor_id: &str) -> bool {
        self.requestor_type_entity_id.as_deref() == Some(sponsor_id)
            || self.invitee_type_entity_id.as_deref() == Some(sponsor_id)
    }

    /// The id on the opposite side from `owner_id`, if `owner_id` owns a side.
    pub fn counterpart_of(&self, owner_id: &str) -> Option<&str> {
        if self.requestor().is_owned_by(owner_id) {
            Some(&self.invitee_id)
        } else if self.invitee().is_owned_by(owner_id) {
            Some(&self.requestor_id)
        } else {
            None
        }
    }

    /// Participants subject to the confirmed-meeting quota.
    pub fn non_sponsor_participants(&self) -> Vec<&str> {
        let mut ids = Vec::with_capacity(2);
        if self.requestor_type == ParticipantType::Attendee {
            ids.push(self.requestor_id.as_str());
        }
        if self.invitee_type == ParticipantType::Attendee {
            ids.push(self.invitee_id.as_str());
        }
        ids
    }

    /// Order-independent key of the participant pair.
    pub fn pair_key(&self) -> (&str, &str) {
        pair_key(&self.requestor_id, &self.invitee_id)
    }
}

/// Order-independent key of two participant ids.
pub fn pair_key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Data for a new ledger row; the store assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeeting {
    pub meeting_code: String,
    pub ice_id: String,
    pub requestor: Participant,
    pub invitee: Participant,
    pub status: MeetingStatus,
    pub remarks: Option<String>,
    pub is_created_by_ai: bool,
}

impl NewMeeting {
    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> MeetingRecord {
        MeetingRecord {
            id,
            meeting_code: self.meeting_code,
            ice_id: self.ice_id,
            requestor_id: self.requestor.id,
            requestor_type: self.requestor.kind,
            requestor_type_entity_id: self.requestor.type_entity_id,
            invitee_id: self.invitee.id,
            invitee_type: self.invitee.kind,
            invitee_type_entity_id: self.invitee.type_entity_id,
            request_status: self.status,
            request_meeting_slot: None,
            request_date_time: now,
            request_update_date_time: now,
            remarks: self.remarks,
            is_created_by_ai: self.is_created_by_ai,
            attended: false,
        }
    }
}

/// Fields written by a status transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: MeetingStatus,
    /// New slot value; `None` clears it.
    pub meeting_slot: Option<DateTime<Utc>>,
    /// Replacement remarks; `None` keeps the stored value.
    pub remarks: Option<String>,
    /// Replacement requestor side, used when a draft is promoted by another rep.
    pub requestor: Option<Participant>,
}

impl StatusUpdate {
    pub fn to(status: MeetingStatus) -> Self {
        Self {
            status,
            meeting_slot: None,
            remarks: None,
            requestor: None,
        }
    }

    pub fn with_remarks(mut self, remarks: Option<String>) -> Self {
        self.remarks = remarks;
        self
    }

    pub fn with_requestor(mut self, requestor: Participant) -> Self {
        self.requestor = Some(requestor);
        self
    }

    /// Writes this update onto `record`, stamping `now` as the update time.
    pub fn apply_to(&self, record: &mut MeetingRecord, now: DateTime<Utc>) {
        record.request_status = self.status;
        record.request_meeting_slot = self.meeting_slot;
        if let Some(remarks) = &self.remarks {
            record.remarks = Some(remarks.clone());
        }
        if let Some(requestor) = &self.requestor {
            record.requestor_id = requestor.id.clone();
            record.requestor_type = requestor.kind;
            record.requestor_type_entity_id = requestor.type_entity_id.clone();
        }
        record.request_update_date_time = now;
    }
}

/// Everything the ledger needs to confirm a meeting atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmRequest {
    pub meeting_id: Uuid,
    pub slot: DateTime<Utc>,
    /// Non-sponsor participants whose confirmed count must stay below `quota`.
    pub quota_participants: Vec<String>,
    pub quota: u32,
    /// Participants who must not already hold another confirmed meeting at `slot`.
    pub slot_participants: Vec<String>,
}

/// Result of an atomic confirmation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Confirmed(MeetingRecord),
    QuotaExceeded { participant_id: String },
    SlotTaken { participant_id: String },
    /// The record was missing (`None`) or no longer in `requested` state.
    StatusMismatch(Option<MeetingStatus>),
}

/// Filter for bulk ledger deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingPredicate {
    pub sponsor_id: Option<String>,
    pub status: Option<MeetingStatus>,
    pub counterpart_ids: Option<Vec<String>>,
}

impl MeetingPredicate {
    pub fn drafts_of(sponsor_id: impl Into<String>) -> Self {
        Self {
            sponsor_id: Some(sponsor_id.into()),
            status: Some(MeetingStatus::Draft),
            counterpart_ids: None,
        }
    }

    pub fn matches(&self, record: &MeetingRecord) -> bool {
        if let Some(status) = self.status {
            if record.request_status != status {
                return false;
            }
        }
        if let Some(sponsor_id) = &self.sponsor_id {
            if !record.involves_sponsor(sponsor_id) {
                return false;
            }
        }
        if let Some(ids) = &self.counterpart_ids {
            let counterpart = match &self.sponsor_id {
                Some(sponsor_id) => record.counterpart_of(sponsor_id),
                None => Some(record.invitee_id.as_str()),
            };
            if !counterpart.is_some_and(|c| ids.iter().any(|id| id == c)) {
                return false;
            }
        }
        true
    }
}
