//! Domain models for the meeting scheduler.

pub mod directory;
pub mod meeting;
pub mod profile;
pub mod qna;
pub mod scope;

pub use directory::{
    sort_entries, AvailableAttendee, DirectoryEntry, DirectoryKey, DirectoryQuery, Listing,
    SortField, SortOrder,
};
pub use meeting::{
    pair_key, ConfirmOutcome, ConfirmRequest, MeetingPredicate, MeetingRecord, MeetingStatus,
    NewMeeting, Participant, ParticipantType, StatusUpdate,
};
pub use profile::{
    AttendeeRecord, EntityType, Profile, ProfileFilter, RegistrationKind, RegistrationType,
    SpeakerRecord, SponsorRecord,
};
pub use qna::{QnaAnswer, QnaAnswerInput, QnaOwner, QnaSubmitOutcome};
pub use scope::EventScope;
