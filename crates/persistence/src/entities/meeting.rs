//! Meeting entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{MeetingRecord, MeetingStatus, ParticipantType};
use sqlx::postgres::{PgHasArrayType, PgTypeInfo};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for meeting_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "meeting_status", rename_all = "lowercase")]
pub enum MeetingStatusDb {
    Draft,
    Requested,
    Confirmed,
    Cancelled,
    Rejected,
}

impl PgHasArrayType for MeetingStatusDb {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_meeting_status")
    }
}

impl From<MeetingStatus> for MeetingStatusDb {
    fn from(status: MeetingStatus) -> Self {
        match status {
            MeetingStatus::Draft => MeetingStatusDb::Draft,
            MeetingStatus::Requested => MeetingStatusDb::Requested,
            MeetingStatus::Confirmed => MeetingStatusDb::Confirmed,
            MeetingStatus::Cancelled => MeetingStatusDb::Cancelled,
            MeetingStatus::Rejected => MeetingStatusDb::Rejected,
        }
    }
}

impl From<MeetingStatusDb> for MeetingStatus {
    fn from(status: MeetingStatusDb) -> Self {
        match status {
            MeetingStatusDb::Draft => MeetingStatus::Draft,
            MeetingStatusDb::Requested => MeetingStatus::Requested,
            MeetingStatusDb::Confirmed => MeetingStatus::Confirmed,
            MeetingStatusDb::Cancelled => MeetingStatus::Cancelled,
            MeetingStatusDb::Rejected => MeetingStatus::Rejected,
        }
    }
}

/// Database enum for participant_type that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "participant_type", rename_all = "snake_case")]
pub enum ParticipantTypeDb {
    Attendee,
    SponsorRep,
}

impl From<ParticipantType> for ParticipantTypeDb {
    fn from(kind: ParticipantType) -> Self {
        match kind {
            ParticipantType::Attendee => ParticipantTypeDb::Attendee,
            ParticipantType::SponsorRep => ParticipantTypeDb::SponsorRep,
        }
    }
}

impl From<ParticipantTypeDb> for ParticipantType {
    fn from(kind: ParticipantTypeDb) -> Self {
        match kind {
            ParticipantTypeDb::Attendee => ParticipantType::Attendee,
            ParticipantTypeDb::SponsorRep => ParticipantType::SponsorRep,
        }
    }
}

/// Database row mapping for the meetings table.
#[derive(Debug, Clone, FromRow)]
pub struct MeetingEntity {
    pub id: Uuid,
    pub meeting_code: String,
    pub ice_id: String,
    pub requestor_id: String,
    pub requestor_type: ParticipantTypeDb,
    pub requestor_type_entity_id: Option<String>,
    pub invitee_id: String,
    pub invitee_type: ParticipantTypeDb,
    pub invitee_type_entity_id: Option<String>,
    pub request_status: MeetingStatusDb,
    pub request_meeting_slot: Option<DateTime<Utc>>,
    pub request_date_time: DateTime<Utc>,
    pub request_update_date_time: DateTime<Utc>,
    pub remarks: Option<String>,
    pub is_created_by_ai: bool,
    pub attended: bool,
}

impl From<MeetingEntity> for MeetingRecord {
    fn from(entity: MeetingEntity) -> Self {
        MeetingRecord {
            id: entity.id,
            meeting_code: entity.meeting_code,
            ice_id: entity.ice_id,
            requestor_id: entity.requestor_id,
            requestor_type: entity.requestor_type.into(),
            requestor_type_entity_id: entity.requestor_type_entity_id,
            invitee_id: entity.invitee_id,
            invitee_type: entity.invitee_type.into(),
            invitee_type_entity_id: entity.invitee_type_entity_id,
            request_status: entity.request_status.into(),
            request_meeting_slot: entity.request_meeting_slot,
            request_date_time: entity.request_date_time,
            request_update_date_time: entity.request_update_date_time,
            remarks: entity.remarks,
            is_created_by_ai: entity.is_created_by_ai,
            attended: entity.attended,
        }
    }
}

/// Confirmed-meeting count of one participant.
#[derive(Debug, Clone, FromRow)]
pub struct ConfirmedCountEntity {
    pub participant_id: String,
    pub confirmed: i64,
}
