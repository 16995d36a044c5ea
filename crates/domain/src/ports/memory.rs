//! In-process implementations of the store ports.
//!
//! Used by the `memory` storage backend for local development and by the
//! service tests. Every multi-step check runs under a single write lock, which
//! gives the same atomicity the Postgres implementations get from transactions.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MeetingLedger, ProfileStore, QnaStore, SubmitMode};
use crate::error::StoreError;
use crate::models::{
    pair_key, ConfirmOutcome, ConfirmRequest, EntityType, EventScope, MeetingPredicate,
    MeetingRecord, MeetingStatus, NewMeeting, Profile, ProfileFilter, QnaAnswer, QnaAnswerInput,
    QnaOwner, QnaSubmitOutcome, StatusUpdate,
};

type ProfileKey = (String, EntityType, String);

/// Profile documents held in a map keyed by `(iceId, entityType, entityId)`.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    docs: RwLock<HashMap<ProfileKey, Profile>>,
    latency: Option<Duration>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that sleeps for `latency` before answering every call.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            docs: RwLock::default(),
            latency: Some(latency),
        }
    }

    /// Loads profiles for one event.
    pub async fn seed(&self, scope: &EventScope, profiles: impl IntoIterator<Item = Profile>) {
        let ice_id = scope.ice_id();
        let mut docs = self.docs.write().await;
        for profile in profiles {
            let key = (
                ice_id.clone(),
                profile.entity_type(),
                profile.entity_id().to_string(),
            );
            docs.insert(key, profile);
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_entity(
        &self,
        scope: &EventScope,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<Profile>, StoreError> {
        self.simulate_latency().await;
        let key = (scope.ice_id(), entity_type, entity_id.to_string());
        Ok(self.docs.read().await.get(&key).cloned())
    }

    async fn list_entities(
        &self,
        scope: &EventScope,
        entity_type: EntityType,
        filter: &ProfileFilter,
    ) -> Result<Vec<Profile>, StoreError> {
        self.simulate_latency().await;
        let ice_id = scope.ice_id();
        let docs = self.docs.read().await;
        let mut found: Vec<Profile> = docs
            .iter()
            .filter(|((ice, kind, _), profile)| {
                *ice == ice_id && *kind == entity_type && profile.matches(filter)
            })
            .map(|(_, profile)| profile.clone())
            .collect();
        found.sort_by(|a, b| a.entity_id().cmp(b.entity_id()));
        Ok(found)
    }

    async fn update_entity(&self, scope: &EventScope, profile: &Profile) -> Result<(), StoreError> {
        self.simulate_latency().await;
        let key = (
            scope.ice_id(),
            profile.entity_type(),
            profile.entity_id().to_string(),
        );
        self.docs.write().await.insert(key, profile.clone());
        Ok(())
    }
}

/// Meeting rows held in a vector behind one lock.
#[derive(Debug, Default)]
pub struct InMemoryMeetingLedger {
    rows: RwLock<Vec<MeetingRecord>>,
}

impl InMemoryMeetingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows across all events.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

/// Returns a description of the uniqueness rule `candidate` would break.
fn uniqueness_conflict(
    rows: &[MeetingRecord],
    candidate: &MeetingRecord,
    skip: Option<Uuid>,
) -> Option<&'static str> {
    rows.iter()
        .filter(|r| r.ice_id == candidate.ice_id && Some(r.id) != skip)
        .find_map(|r| match (candidate.request_status, r.request_status) {
            (MeetingStatus::Requested, MeetingStatus::Requested)
                if r.requestor_id == candidate.requestor_id
                    && r.invitee_id == candidate.invitee_id =>
            {
                Some("an open request already exists for this pair")
            }
            (MeetingStatus::Confirmed, MeetingStatus::Confirmed)
                if r.pair_key() == candidate.pair_key() =>
            {
                Some("a confirmed meeting already exists for this pair")
            }
            (MeetingStatus::Draft, MeetingStatus::Draft)
                if r.requestor_type_entity_id == candidate.requestor_type_entity_id
                    && r.invitee_id == candidate.invitee_id =>
            {
                Some("a draft already exists for this pair")
            }
            _ => None,
        })
}

fn confirmed_count(rows: &[MeetingRecord], ice_id: &str, participant: &str) -> u32 {
    rows.iter()
        .filter(|r| {
            r.ice_id == ice_id
                && r.request_status == MeetingStatus::Confirmed
                && r.non_sponsor_participants().contains(&participant)
        })
        .count() as u32
}

#[async_trait]
impl MeetingLedger for InMemoryMeetingLedger {
    async fn insert(&self, meeting: NewMeeting) -> Result<MeetingRecord, StoreError> {
        let record = meeting.into_record(Uuid::new_v4(), Utc::now());
        let mut rows = self.rows.write().await;
        if let Some(conflict) = uniqueness_conflict(&rows, &record, None) {
            return Err(StoreError::DuplicateKey(conflict.to_string()));
        }
        if rows
            .iter()
            .any(|r| r.ice_id == record.ice_id && r.meeting_code == record.meeting_code)
        {
            return Err(StoreError::DuplicateKey("meeting code already used".to_string()));
        }
        rows.push(record.clone());
        Ok(record)
    }

    async fn find_by_code(
        &self,
        scope: &EventScope,
        meeting_code: &str,
    ) -> Result<Option<MeetingRecord>, StoreError> {
        let ice_id = scope.ice_id();
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|r| r.ice_id == ice_id && r.meeting_code == meeting_code)
            .cloned())
    }

    async fn find_by_participant(
        &self,
        scope: &EventScope,
        entity_id: &str,
    ) -> Result<Vec<MeetingRecord>, StoreError> {
        let ice_id = scope.ice_id();
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.ice_id == ice_id && r.involves(entity_id))
            .cloned()
            .collect())
    }

    async fn find_by_sponsor(
        &self,
        scope: &EventScope,
        sponsor_id: &str,
    ) -> Result<Vec<MeetingRecord>, StoreError> {
        let ice_id = scope.ice_id();
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.ice_id == ice_id && r.involves_sponsor(sponsor_id))
            .cloned()
            .collect())
    }

    async fn count_confirmed_by_participant(
        &self,
        scope: &EventScope,
    ) -> Result<HashMap<String, u32>, StoreError> {
        let ice_id = scope.ice_id();
        let rows = self.rows.read().await;
        let mut counts: HashMap<String, u32> = HashMap::new();
        for row in rows
            .iter()
            .filter(|r| r.ice_id == ice_id && r.request_status == MeetingStatus::Confirmed)
        {
            for participant in row.non_sponsor_participants() {
                *counts.entry(participant.to_string()).or_default() += 1;
            }
        }
        Ok(counts)
    }

    async fn update_status(
        &self,
        scope: &EventScope,
        id: Uuid,
        expected: &[MeetingStatus],
        update: StatusUpdate,
    ) -> Result<Option<MeetingRecord>, StoreError> {
        let ice_id = scope.ice_id();
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|r| r.ice_id == ice_id && r.id == id) else {
            return Ok(None);
        };
        if !expected.contains(&rows[index].request_status) {
            return Ok(None);
        }

        let mut updated = rows[index].clone();
        update.apply_to(&mut updated, Utc::now());
        if let Some(conflict) = uniqueness_conflict(&rows, &updated, Some(id)) {
            return Err(StoreError::DuplicateKey(conflict.to_string()));
        }

        rows[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn confirm_within_quota(
        &self,
        scope: &EventScope,
        request: ConfirmRequest,
    ) -> Result<ConfirmOutcome, StoreError> {
        let ice_id = scope.ice_id();
        let mut rows = self.rows.write().await;
        let Some(index) = rows
            .iter()
            .position(|r| r.ice_id == ice_id && r.id == request.meeting_id)
        else {
            return Ok(ConfirmOutcome::StatusMismatch(None));
        };
        let current = rows[index].request_status;
        if current != MeetingStatus::Requested {
            return Ok(ConfirmOutcome::StatusMismatch(Some(current)));
        }

        for participant in &request.quota_participants {
            if confirmed_count(&rows, &ice_id, participant) >= request.quota {
                return Ok(ConfirmOutcome::QuotaExceeded {
                    participant_id: participant.clone(),
                });
            }
        }

        for participant in &request.slot_participants {
            let booked = rows.iter().any(|r| {
                r.ice_id == ice_id
                    && r.request_status == MeetingStatus::Confirmed
                    && r.involves(participant)
                    && r.request_meeting_slot == Some(request.slot)
            });
            if booked {
                return Ok(ConfirmOutcome::SlotTaken {
                    participant_id: participant.clone(),
                });
            }
        }

        let (a, b) = rows[index].pair_key();
        let (a, b) = (a.to_string(), b.to_string());
        let already_confirmed = rows.iter().any(|r| {
            r.ice_id == ice_id
                && r.request_status == MeetingStatus::Confirmed
                && pair_key(&r.requestor_id, &r.invitee_id) == (a.as_str(), b.as_str())
        });
        if already_confirmed {
            return Err(StoreError::DuplicateKey(
                "a confirmed meeting already exists for this pair".to_string(),
            ));
        }

        let update = StatusUpdate {
            meeting_slot: Some(request.slot),
            ..StatusUpdate::to(MeetingStatus::Confirmed)
        };
        update.apply_to(&mut rows[index], Utc::now());
        Ok(ConfirmOutcome::Confirmed(rows[index].clone()))
    }

    async fn upsert_draft(&self, meeting: NewMeeting) -> Result<MeetingRecord, StoreError> {
        let mut rows = self.rows.write().await;
        let existing = rows.iter_mut().find(|r| {
            r.ice_id == meeting.ice_id
                && r.request_status == MeetingStatus::Draft
                && r.requestor_type_entity_id == meeting.requestor.type_entity_id
                && r.invitee_id == meeting.invitee.id
        });

        if let Some(row) = existing {
            let update = StatusUpdate::to(MeetingStatus::Draft)
                .with_requestor(meeting.requestor)
                .with_remarks(meeting.remarks);
            update.apply_to(row, Utc::now());
            return Ok(row.clone());
        }

        let record = NewMeeting {
            status: MeetingStatus::Draft,
            ..meeting
        }
        .into_record(Uuid::new_v4(), Utc::now());
        rows.push(record.clone());
        Ok(record)
    }

    async fn set_attended(
        &self,
        scope: &EventScope,
        id: Uuid,
        attended: bool,
    ) -> Result<Option<MeetingRecord>, StoreError> {
        let ice_id = scope.ice_id();
        let mut rows = self.rows.write().await;
        Ok(rows
            .iter_mut()
            .find(|r| r.ice_id == ice_id && r.id == id)
            .map(|row| {
                row.attended = attended;
                row.request_update_date_time = Utc::now();
                row.clone()
            }))
    }

    async fn delete(&self, scope: &EventScope, id: Uuid) -> Result<bool, StoreError> {
        let ice_id = scope.ice_id();
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| !(r.ice_id == ice_id && r.id == id));
        Ok(rows.len() < before)
    }

    async fn delete_many(
        &self,
        scope: &EventScope,
        predicate: &MeetingPredicate,
    ) -> Result<u64, StoreError> {
        let ice_id = scope.ice_id();
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| !(r.ice_id == ice_id && predicate.matches(r)));
        Ok((before - rows.len()) as u64)
    }
}

type AnswerKey = (String, String, EntityType, String);

/// QnA answers keyed by `(iceId, entityId, entityType, questionId)`.
#[derive(Debug, Default)]
pub struct InMemoryQnaStore {
    answers: RwLock<HashMap<AnswerKey, QnaAnswer>>,
}

impl InMemoryQnaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owned_answers(
    answers: &HashMap<AnswerKey, QnaAnswer>,
    ice_id: &str,
    owner: &QnaOwner,
) -> Vec<QnaAnswer> {
    let mut found: Vec<QnaAnswer> = answers
        .values()
        .filter(|a| {
            a.ice_id == ice_id && a.entity_id == owner.entity_id && a.entity_type == owner.entity_type
        })
        .cloned()
        .collect();
    found.sort_by(|a, b| a.question_id.cmp(&b.question_id));
    found
}

#[async_trait]
impl QnaStore for InMemoryQnaStore {
    async fn answers_for(
        &self,
        scope: &EventScope,
        owner: &QnaOwner,
    ) -> Result<Vec<QnaAnswer>, StoreError> {
        let answers = self.answers.read().await;
        Ok(owned_answers(&answers, &scope.ice_id(), owner))
    }

    async fn submit(
        &self,
        scope: &EventScope,
        owner: &QnaOwner,
        submitted_by: &str,
        inputs: Vec<QnaAnswerInput>,
        mode: SubmitMode,
    ) -> Result<QnaSubmitOutcome, StoreError> {
        let ice_id = scope.ice_id();
        let mut answers = self.answers.write().await;

        if mode == SubmitMode::Guarded {
            let foreign = owned_answers(&answers, &ice_id, owner)
                .into_iter()
                .find(|a| a.update_by != submitted_by);
            if let Some(answer) = foreign {
                return Ok(QnaSubmitOutcome::LockedBy {
                    update_by: answer.update_by,
                });
            }
        }

        let now = Utc::now();
        for input in inputs {
            let key = (
                ice_id.clone(),
                owner.entity_id.clone(),
                owner.entity_type,
                input.question_id.clone(),
            );
            let created_at = answers.get(&key).map(|a| a.created_at).unwrap_or(now);
            answers.insert(
                key,
                QnaAnswer {
                    ice_id: ice_id.clone(),
                    entity_id: owner.entity_id.clone(),
                    entity_type: owner.entity_type,
                    question_id: input.question_id,
                    question_label: input.question_label,
                    selected_value: input.selected_value,
                    update_by: submitted_by.to_string(),
                    created_at,
                    updated_at: now,
                },
            );
        }

        Ok(QnaSubmitOutcome::Saved(owned_answers(&answers, &ice_id, owner)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendeeRecord, Participant, ParticipantType, RegistrationType};
    use chrono::TimeZone;

    fn scope() -> EventScope {
        EventScope::new("i", "c", "e").unwrap()
    }

    fn attendee(id: &str) -> Participant {
        Participant {
            id: id.into(),
            kind: ParticipantType::Attendee,
            type_entity_id: None,
        }
    }

    fn rep(id: &str, sponsor: &str) -> Participant {
        Participant {
            id: id.into(),
            kind: ParticipantType::SponsorRep,
            type_entity_id: Some(sponsor.into()),
        }
    }

    fn new_meeting(requestor: Participant, invitee: Participant, status: MeetingStatus) -> NewMeeting {
        NewMeeting {
            meeting_code: shared::codes::generate_meeting_code(),
            ice_id: scope().ice_id(),
            requestor,
            invitee,
            status,
            remarks: None,
            is_created_by_ai: false,
        }
    }

    #[tokio::test]
    async fn test_profile_store_scopes_by_event() {
        let store = InMemoryProfileStore::new();
        let other = EventScope::new("i", "c", "other").unwrap();
        let profile = Profile::Attendee(AttendeeRecord {
            attendee_id: "a1".into(),
            name: None,
            company: None,
            designation: None,
            phone: None,
            email: None,
            registration_type: RegistrationType::Attendee,
            meeting_slots: vec![],
            confirmed_meetings: 0,
        });
        store.seed(&scope(), [profile]).await;

        assert!(store.get_attendee(&scope(), "a1").await.unwrap().is_some());
        assert!(store.get_attendee(&other, "a1").await.unwrap().is_none());
        assert!(store
            .get_entity(&scope(), EntityType::Sponsor, "a1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_open_request_rejected() {
        let ledger = InMemoryMeetingLedger::new();
        ledger
            .insert(new_meeting(attendee("a1"), attendee("a2"), MeetingStatus::Requested))
            .await
            .unwrap();
        let err = ledger
            .insert(new_meeting(attendee("a1"), attendee("a2"), MeetingStatus::Requested))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn test_hyphenated_scopes_do_not_share_rows() {
        let ledger = InMemoryMeetingLedger::new();
        let one = EventScope::new("a-b", "c", "d").unwrap();
        let two = EventScope::new("a", "b-c", "d").unwrap();
        let m = ledger
            .insert(NewMeeting {
                ice_id: one.ice_id(),
                ..new_meeting(attendee("a1"), attendee("a2"), MeetingStatus::Requested)
            })
            .await
            .unwrap();

        assert!(ledger.find_by_code(&one, &m.meeting_code).await.unwrap().is_some());
        assert!(ledger.find_by_code(&two, &m.meeting_code).await.unwrap().is_none());
        assert!(ledger.find_by_participant(&two, "a1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conditional_update_respects_expected_status() {
        let ledger = InMemoryMeetingLedger::new();
        let m = ledger
            .insert(new_meeting(attendee("a1"), attendee("a2"), MeetingStatus::Requested))
            .await
            .unwrap();

        let rejected = ledger
            .update_status(
                &scope(),
                m.id,
                &[MeetingStatus::Requested],
                StatusUpdate::to(MeetingStatus::Rejected),
            )
            .await
            .unwrap();
        assert_eq!(rejected.unwrap().request_status, MeetingStatus::Rejected);

        let again = ledger
            .update_status(
                &scope(),
                m.id,
                &[MeetingStatus::Requested],
                StatusUpdate::to(MeetingStatus::Cancelled),
            )
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_confirm_within_quota_counts_both_sides() {
        let ledger = InMemoryMeetingLedger::new();
        let slot = |h| Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap();
        let confirm = |id, hour, quota_participants: Vec<&str>| ConfirmRequest {
            meeting_id: id,
            slot: slot(hour),
            quota_participants: quota_participants.into_iter().map(String::from).collect(),
            quota: 2,
            slot_participants: vec![],
        };

        let m1 = ledger
            .insert(new_meeting(attendee("b"), attendee("x"), MeetingStatus::Requested))
            .await
            .unwrap();
        let m2 = ledger
            .insert(new_meeting(attendee("y"), attendee("b"), MeetingStatus::Requested))
            .await
            .unwrap();
        let m3 = ledger
            .insert(new_meeting(attendee("c"), attendee("b"), MeetingStatus::Requested))
            .await
            .unwrap();

        for (m, hour) in [(&m1, 9), (&m2, 10)] {
            let outcome = ledger
                .confirm_within_quota(&scope(), confirm(m.id, hour, vec!["b"]))
                .await
                .unwrap();
            assert!(matches!(outcome, ConfirmOutcome::Confirmed(_)));
        }

        let counts = ledger.count_confirmed_by_participant(&scope()).await.unwrap();
        assert_eq!(counts.get("b"), Some(&2));
        assert_eq!(counts.get("x"), Some(&1));

        let outcome = ledger
            .confirm_within_quota(&scope(), confirm(m3.id, 11, vec!["c", "b"]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ConfirmOutcome::QuotaExceeded {
                participant_id: "b".into()
            }
        );
    }

    #[tokio::test]
    async fn test_confirm_detects_slot_clash() {
        let ledger = InMemoryMeetingLedger::new();
        let slot = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let m1 = ledger
            .insert(new_meeting(rep("r1", "s1"), attendee("a1"), MeetingStatus::Requested))
            .await
            .unwrap();
        let m2 = ledger
            .insert(new_meeting(rep("r1", "s1"), attendee("a2"), MeetingStatus::Requested))
            .await
            .unwrap();

        let request = |id| ConfirmRequest {
            meeting_id: id,
            slot,
            quota_participants: vec![],
            quota: 2,
            slot_participants: vec!["r1".into()],
        };
        ledger.confirm_within_quota(&scope(), request(m1.id)).await.unwrap();
        let outcome = ledger.confirm_within_quota(&scope(), request(m2.id)).await.unwrap();
        assert_eq!(
            outcome,
            ConfirmOutcome::SlotTaken {
                participant_id: "r1".into()
            }
        );
    }

    #[tokio::test]
    async fn test_upsert_draft_is_shared_per_sponsor() {
        let ledger = InMemoryMeetingLedger::new();
        let first = ledger
            .upsert_draft(new_meeting(rep("r1", "s1"), attendee("a1"), MeetingStatus::Draft))
            .await
            .unwrap();
        let second = ledger
            .upsert_draft(new_meeting(rep("r2", "s1"), attendee("a1"), MeetingStatus::Draft))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.requestor_id, "r2");
        assert_eq!(ledger.len().await, 1);

        let removed = ledger
            .delete_many(&scope(), &MeetingPredicate::drafts_of("s1"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_qna_guarded_submission() {
        let store = InMemoryQnaStore::new();
        let owner = QnaOwner {
            entity_id: "s1".into(),
            entity_type: EntityType::Sponsor,
        };
        let answer = |value: &str| QnaAnswerInput {
            question_id: "q1".into(),
            question_label: Some("Industry".into()),
            selected_value: serde_json::json!(value),
        };

        let saved = store
            .submit(&scope(), &owner, "r1", vec![answer("Retail")], SubmitMode::Guarded)
            .await
            .unwrap();
        assert!(matches!(saved, QnaSubmitOutcome::Saved(ref a) if a.len() == 1));

        let locked = store
            .submit(&scope(), &owner, "r2", vec![answer("Energy")], SubmitMode::Guarded)
            .await
            .unwrap();
        assert_eq!(
            locked,
            QnaSubmitOutcome::LockedBy {
                update_by: "r1".into()
            }
        );

        store
            .submit(&scope(), &owner, "r2", vec![answer("Energy")], SubmitMode::Overwrite)
            .await
            .unwrap();
        let stored = store.answers_for(&scope(), &owner).await.unwrap();
        assert_eq!(stored[0].selected_value, serde_json::json!("Energy"));
        assert_eq!(stored[0].update_by, "r2");
    }
}
