//! Attendee, sponsor and speaker profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::meeting::ParticipantType;

/// Collections held by the profile store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Attendee,
    Sponsor,
    Speaker,
    Session,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Attendee => write!(f, "Attendee"),
            EntityType::Sponsor => write!(f, "Sponsor"),
            EntityType::Speaker => write!(f, "Speaker"),
            EntityType::Session => write!(f, "Session"),
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Attendee" => Ok(EntityType::Attendee),
            "Sponsor" => Ok(EntityType::Sponsor),
            "Speaker" => Ok(EntityType::Speaker),
            "Session" => Ok(EntityType::Session),
            other => Err(format!("Unknown entity type: {other}")),
        }
    }
}

/// How an attendee record is registered for the event.
///
/// Sponsor registrations link the individual representative to the sponsor
/// aggregate through `registrationTypeEntityId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RegistrationType {
    Attendee,
    Sponsor {
        #[serde(rename = "registrationTypeEntityId")]
        sponsor_id: String,
    },
    Speaker,
}

/// Registration discriminant without the payload, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationKind {
    Attendee,
    Sponsor,
    Speaker,
}

impl std::fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationKind::Attendee => write!(f, "Attendee"),
            RegistrationKind::Sponsor => write!(f, "Sponsor"),
            RegistrationKind::Speaker => write!(f, "Speaker"),
        }
    }
}

impl RegistrationType {
    pub fn kind(&self) -> RegistrationKind {
        match self {
            RegistrationType::Attendee => RegistrationKind::Attendee,
            RegistrationType::Sponsor { .. } => RegistrationKind::Sponsor,
            RegistrationType::Speaker => RegistrationKind::Speaker,
        }
    }

    /// Sponsor this registration is affiliated with, if any.
    pub fn sponsor_id(&self) -> Option<&str> {
        match self {
            RegistrationType::Sponsor { sponsor_id } => Some(sponsor_id),
            _ => None,
        }
    }
}

/// An individual registered for the event (plain attendee, sponsor rep or speaker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeRecord {
    pub attendee_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub registration_type: RegistrationType,
    /// Slots this person offered for meetings; empty means no restriction.
    #[serde(default)]
    pub meeting_slots: Vec<DateTime<Utc>>,
    /// Denormalized confirmed-meeting count, refreshed by the lifecycle manager.
    #[serde(default)]
    pub confirmed_meetings: u32,
}

impl AttendeeRecord {
    pub fn sponsor_id(&self) -> Option<&str> {
        self.registration_type.sponsor_id()
    }

    pub fn is_sponsor_rep(&self) -> bool {
        self.sponsor_id().is_some()
    }

    pub fn participant_type(&self) -> ParticipantType {
        if self.is_sponsor_rep() {
            ParticipantType::SponsorRep
        } else {
            ParticipantType::Attendee
        }
    }

    /// Id that owns drafts and QnA answers for this person: the sponsor for
    /// representatives, the attendee itself otherwise.
    pub fn owner_id(&self) -> &str {
        self.sponsor_id().unwrap_or(&self.attendee_id)
    }

    pub fn accepts_slot(&self, slot: &DateTime<Utc>) -> bool {
        self.meeting_slots.is_empty() || self.meeting_slots.contains(slot)
    }
}

/// Sponsor aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorRecord {
    pub sponsor_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub booth: Option<String>,
    #[serde(default)]
    pub is_meeting_enabled: bool,
}

/// Speaker profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerRecord {
    pub speaker_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A profile document of any supported entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType")]
pub enum Profile {
    Attendee(AttendeeRecord),
    Sponsor(SponsorRecord),
    Speaker(SpeakerRecord),
}

impl Profile {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Profile::Attendee(_) => EntityType::Attendee,
            Profile::Sponsor(_) => EntityType::Sponsor,
            Profile::Speaker(_) => EntityType::Speaker,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            Profile::Attendee(a) => &a.attendee_id,
            Profile::Sponsor(s) => &s.sponsor_id,
            Profile::Speaker(s) => &s.speaker_id,
        }
    }

    /// Display name used for sorting; missing names sort as empty strings.
    pub fn name(&self) -> &str {
        let name = match self {
            Profile::Attendee(a) => &a.name,
            Profile::Sponsor(s) => &s.name,
            Profile::Speaker(s) => &s.name,
        };
        name.as_deref().unwrap_or("")
    }

    pub fn into_attendee(self) -> Option<AttendeeRecord> {
        match self {
            Profile::Attendee(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_sponsor(self) -> Option<SponsorRecord> {
        match self {
            Profile::Sponsor(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_speaker(self) -> Option<SpeakerRecord> {
        match self {
            Profile::Speaker(s) => Some(s),
            _ => None,
        }
    }

    /// Evaluates an equality/membership filter against this document.
    pub fn matches(&self, filter: &ProfileFilter) -> bool {
        match (filter, self) {
            (ProfileFilter::All, _) => true,
            (ProfileFilter::Ids(ids), profile) => ids.iter().any(|id| id == profile.entity_id()),
            (ProfileFilter::Registration(kind), Profile::Attendee(a)) => {
                a.registration_type.kind() == *kind
            }
            (ProfileFilter::SponsorLinkage(sponsor_id), Profile::Attendee(a)) => {
                a.sponsor_id() == Some(sponsor_id.as_str())
            }
            (ProfileFilter::MeetingEnabled(enabled), Profile::Sponsor(s)) => {
                s.is_meeting_enabled == *enabled
            }
            _ => false,
        }
    }
}

/// Single-field equality or membership filter for collection scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileFilter {
    All,
    Registration(RegistrationKind),
    SponsorLinkage(String),
    MeetingEnabled(bool),
    Ids(Vec<String>),
}
