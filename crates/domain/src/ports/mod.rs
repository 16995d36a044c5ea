//! Store ports consumed by the scheduling services.
//!
//! The services only see these traits; `persistence` provides the Postgres
//! implementations and [`memory`] provides in-process ones.

pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AttendeeRecord, ConfirmOutcome, ConfirmRequest, EntityType, EventScope, MeetingPredicate,
    MeetingRecord, MeetingStatus, NewMeeting, Profile, ProfileFilter, QnaAnswer, QnaAnswerInput,
    QnaOwner, QnaSubmitOutcome, StatusUpdate,
};

pub use memory::{InMemoryMeetingLedger, InMemoryProfileStore, InMemoryQnaStore};

/// Hierarchical profile documents keyed by event and entity id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_entity(
        &self,
        scope: &EventScope,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<Profile>, StoreError>;

    async fn list_entities(
        &self,
        scope: &EventScope,
        entity_type: EntityType,
        filter: &ProfileFilter,
    ) -> Result<Vec<Profile>, StoreError>;

    /// Creates or replaces a profile document.
    async fn update_entity(&self, scope: &EventScope, profile: &Profile) -> Result<(), StoreError>;

    async fn get_attendee(
        &self,
        scope: &EventScope,
        attendee_id: &str,
    ) -> Result<Option<AttendeeRecord>, StoreError> {
        Ok(self
            .get_entity(scope, EntityType::Attendee, attendee_id)
            .await?
            .and_then(Profile::into_attendee))
    }
}

/// System of record for meeting requests.
#[async_trait]
pub trait MeetingLedger: Send + Sync {
    /// Inserts a new row; fails with [`StoreError::DuplicateKey`] when an open
    /// request, a confirmed meeting or a draft already exists for the pair.
    async fn insert(&self, meeting: NewMeeting) -> Result<MeetingRecord, StoreError>;

    async fn find_by_code(
        &self,
        scope: &EventScope,
        meeting_code: &str,
    ) -> Result<Option<MeetingRecord>, StoreError>;

    /// All rows where `entity_id` is requestor or invitee.
    async fn find_by_participant(
        &self,
        scope: &EventScope,
        entity_id: &str,
    ) -> Result<Vec<MeetingRecord>, StoreError>;

    /// All rows where either side's type entity id is `sponsor_id`.
    async fn find_by_sponsor(
        &self,
        scope: &EventScope,
        sponsor_id: &str,
    ) -> Result<Vec<MeetingRecord>, StoreError>;

    /// Confirmed meetings per non-sponsor participant, whichever side they occupy.
    async fn count_confirmed_by_participant(
        &self,
        scope: &EventScope,
    ) -> Result<HashMap<String, u32>, StoreError>;

    /// Applies `update` only if the row is currently in one of `expected`.
    /// Returns `None` when the row is missing or the precondition failed.
    async fn update_status(
        &self,
        scope: &EventScope,
        id: Uuid,
        expected: &[MeetingStatus],
        update: StatusUpdate,
    ) -> Result<Option<MeetingRecord>, StoreError>;

    /// Re-checks quota and slot availability and confirms in one atomic step.
    async fn confirm_within_quota(
        &self,
        scope: &EventScope,
        request: ConfirmRequest,
    ) -> Result<ConfirmOutcome, StoreError>;

    /// Creates the draft for `(sponsor, invitee)` or refreshes the existing one.
    async fn upsert_draft(&self, meeting: NewMeeting) -> Result<MeetingRecord, StoreError>;

    async fn set_attended(
        &self,
        scope: &EventScope,
        id: Uuid,
        attended: bool,
    ) -> Result<Option<MeetingRecord>, StoreError>;

    async fn delete(&self, scope: &EventScope, id: Uuid) -> Result<bool, StoreError>;

    async fn delete_many(
        &self,
        scope: &EventScope,
        predicate: &MeetingPredicate,
    ) -> Result<u64, StoreError>;
}

/// How a QnA submission treats answers written by somebody else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Reject if another submitter already wrote answers for the owner.
    Guarded,
    /// Replace whatever is stored.
    Overwrite,
}

/// Question/answer persistence.
#[async_trait]
pub trait QnaStore: Send + Sync {
    async fn answers_for(
        &self,
        scope: &EventScope,
        owner: &QnaOwner,
    ) -> Result<Vec<QnaAnswer>, StoreError>;

    /// Upserts `answers` for `owner`; the existence check and the write are atomic.
    async fn submit(
        &self,
        scope: &EventScope,
        owner: &QnaOwner,
        submitted_by: &str,
        answers: Vec<QnaAnswerInput>,
        mode: SubmitMode,
    ) -> Result<QnaSubmitOutcome, StoreError>;
}

/// Snapshot of a directory listing held in the cache.
pub type CachedListing = Arc<Vec<Profile>>;

/// Keyed TTL cache for directory listings. A miss means "read the store".
#[async_trait]
pub trait DirectoryCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedListing>;

    async fn put(&self, key: &str, value: CachedListing, ttl: Duration);

    async fn invalidate(&self, key: &str);

    /// Drops every key starting with `prefix`; returns how many were removed.
    async fn invalidate_prefix(&self, prefix: &str) -> usize;
}
