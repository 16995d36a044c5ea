//! Postgres implementations of the domain store ports.

pub mod meeting;
pub mod profile;
pub mod qna;

pub use meeting::PgMeetingLedger;
pub use profile::PgProfileStore;
pub use qna::PgQnaStore;
