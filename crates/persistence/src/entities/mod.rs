//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod meeting;
pub mod profile;
pub mod qna;

pub use meeting::{ConfirmedCountEntity, MeetingEntity, MeetingStatusDb, ParticipantTypeDb};
pub use profile::{EntityTypeDb, ProfileDocumentEntity};
pub use qna::QnaAnswerEntity;
