//! Meeting ledger backed by the `meetings` table.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use domain::models::{
    ConfirmOutcome, ConfirmRequest, EventScope, MeetingPredicate, MeetingRecord, MeetingStatus,
    NewMeeting, StatusUpdate,
};
use domain::ports::MeetingLedger;
use domain::StoreError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::{ConfirmedCountEntity, MeetingEntity, MeetingStatusDb, ParticipantTypeDb};
use crate::metrics::QueryTimer;

const MEETING_COLUMNS: &str = r#"
    id, meeting_code, ice_id,
    requestor_id, requestor_type, requestor_type_entity_id,
    invitee_id, invitee_type, invitee_type_entity_id,
    request_status, request_meeting_slot, request_date_time, request_update_date_time,
    remarks, is_created_by_ai, attended
"#;

/// Postgres implementation of [`MeetingLedger`].
///
/// Uniqueness of open requests, confirmed pairs and drafts is enforced by
/// partial unique indexes; violations surface as [`StoreError::DuplicateKey`].
#[derive(Clone)]
pub struct PgMeetingLedger {
    pool: PgPool,
}

impl PgMeetingLedger {
    /// Creates a new PgMeetingLedger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Serializes confirmations touching `participant` within one event.
async fn lock_participant(
    tx: &mut Transaction<'_, Postgres>,
    ice_id: &str,
    participant: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1 || '/' || $2))")
        .bind(ice_id)
        .bind(participant)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Body of [`MeetingLedger::confirm_within_quota`], run inside `tx`.
async fn confirm_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    ice_id: &str,
    request: &ConfirmRequest,
) -> Result<ConfirmOutcome, sqlx::Error> {
    // Sorted so concurrent confirmations acquire locks in the same order.
    let participants: BTreeSet<&str> = request
        .quota_participants
        .iter()
        .chain(&request.slot_participants)
        .map(String::as_str)
        .collect();
    for participant in &participants {
        lock_participant(tx, ice_id, participant).await?;
    }

    let current: Option<(MeetingStatusDb,)> = sqlx::query_as(
        r#"
        SELECT request_status FROM meetings
        WHERE ice_id = $1 AND id = $2
        FOR UPDATE
        "#,
    )
    .bind(ice_id)
    .bind(request.meeting_id)
    .fetch_optional(&mut **tx)
    .await?;

    match current {
        None => return Ok(ConfirmOutcome::StatusMismatch(None)),
        Some((MeetingStatusDb::Requested,)) => {}
        Some((status,)) => return Ok(ConfirmOutcome::StatusMismatch(Some(status.into()))),
    }

    for participant in &request.quota_participants {
        let (confirmed,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM meetings
            WHERE ice_id = $1
              AND request_status = 'confirmed'
              AND ((requestor_id = $2 AND requestor_type = 'attendee')
                OR (invitee_id = $2 AND invitee_type = 'attendee'))
            "#,
        )
        .bind(ice_id)
        .bind(participant)
        .fetch_one(&mut **tx)
        .await?;
        if confirmed >= i64::from(request.quota) {
            return Ok(ConfirmOutcome::QuotaExceeded {
                participant_id: participant.clone(),
            });
        }
    }

    for participant in &request.slot_participants {
        let (booked,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM meetings
                WHERE ice_id = $1
                  AND request_status = 'confirmed'
                  AND request_meeting_slot = $3
                  AND (requestor_id = $2 OR invitee_id = $2)
            )
            "#,
        )
        .bind(ice_id)
        .bind(participant)
        .bind(request.slot)
        .fetch_one(&mut **tx)
        .await?;
        if booked {
            return Ok(ConfirmOutcome::SlotTaken {
                participant_id: participant.clone(),
            });
        }
    }

    let confirmed = sqlx::query_as::<_, MeetingEntity>(&format!(
        r#"
        UPDATE meetings
        SET request_status = 'confirmed',
            request_meeting_slot = $3,
            request_update_date_time = NOW()
        WHERE ice_id = $1 AND id = $2
        RETURNING {MEETING_COLUMNS}
        "#
    ))
    .bind(ice_id)
    .bind(request.meeting_id)
    .bind(request.slot)
    .fetch_one(&mut **tx)
    .await?;

    Ok(ConfirmOutcome::Confirmed(confirmed.into()))
}

#[async_trait]
impl MeetingLedger for PgMeetingLedger {
    async fn insert(&self, meeting: NewMeeting) -> Result<MeetingRecord, StoreError> {
        let timer = QueryTimer::new("insert_meeting");
        let result = sqlx::query_as::<_, MeetingEntity>(&format!(
            r#"
            INSERT INTO meetings (
                id, meeting_code, ice_id,
                requestor_id, requestor_type, requestor_type_entity_id,
                invitee_id, invitee_type, invitee_type_entity_id,
                request_status, remarks, is_created_by_ai
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {MEETING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&meeting.meeting_code)
        .bind(&meeting.ice_id)
        .bind(&meeting.requestor.id)
        .bind(ParticipantTypeDb::from(meeting.requestor.kind))
        .bind(&meeting.requestor.type_entity_id)
        .bind(&meeting.invitee.id)
        .bind(ParticipantTypeDb::from(meeting.invitee.kind))
        .bind(&meeting.invitee.type_entity_id)
        .bind(MeetingStatusDb::from(meeting.status))
        .bind(&meeting.remarks)
        .bind(meeting.is_created_by_ai)
        .fetch_one(&self.pool)
        .await;
        Ok(timer.finish(result)?.into())
    }

    async fn find_by_code(
        &self,
        scope: &EventScope,
        meeting_code: &str,
    ) -> Result<Option<MeetingRecord>, StoreError> {
        let timer = QueryTimer::new("find_meeting_by_code");
        let result = sqlx::query_as::<_, MeetingEntity>(&format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE ice_id = $1 AND meeting_code = $2"
        ))
        .bind(scope.ice_id())
        .bind(meeting_code)
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(MeetingRecord::from))
    }

    async fn find_by_participant(
        &self,
        scope: &EventScope,
        entity_id: &str,
    ) -> Result<Vec<MeetingRecord>, StoreError> {
        let timer = QueryTimer::new("find_meetings_by_participant");
        let result = sqlx::query_as::<_, MeetingEntity>(&format!(
            r#"
            SELECT {MEETING_COLUMNS} FROM meetings
            WHERE ice_id = $1 AND (requestor_id = $2 OR invitee_id = $2)
            ORDER BY request_date_time, id
            "#
        ))
        .bind(scope.ice_id())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await;
        Ok(timer.finish(result)?.into_iter().map(MeetingRecord::from).collect())
    }

    async fn find_by_sponsor(
        &self,
        scope: &EventScope,
        sponsor_id: &str,
    ) -> Result<Vec<MeetingRecord>, StoreError> {
        let timer = QueryTimer::new("find_meetings_by_sponsor");
        let result = sqlx::query_as::<_, MeetingEntity>(&format!(
            r#"
            SELECT {MEETING_COLUMNS} FROM meetings
            WHERE ice_id = $1
              AND (requestor_type_entity_id = $2 OR invitee_type_entity_id = $2)
            ORDER BY request_date_time, id
            "#
        ))
        .bind(scope.ice_id())
        .bind(sponsor_id)
        .fetch_all(&self.pool)
        .await;
        Ok(timer.finish(result)?.into_iter().map(MeetingRecord::from).collect())
    }

    async fn count_confirmed_by_participant(
        &self,
        scope: &EventScope,
    ) -> Result<HashMap<String, u32>, StoreError> {
        let timer = QueryTimer::new("count_confirmed_by_participant");
        let result = sqlx::query_as::<_, ConfirmedCountEntity>(
            r#"
            SELECT participant_id, COUNT(*) AS confirmed
            FROM (
                SELECT requestor_id AS participant_id FROM meetings
                WHERE ice_id = $1 AND request_status = 'confirmed' AND requestor_type = 'attendee'
                UNION ALL
                SELECT invitee_id AS participant_id FROM meetings
                WHERE ice_id = $1 AND request_status = 'confirmed' AND invitee_type = 'attendee'
            ) sides
            GROUP BY participant_id
            "#,
        )
        .bind(scope.ice_id())
        .fetch_all(&self.pool)
        .await;

        Ok(timer
            .finish(result)?
            .into_iter()
            .map(|row| {
                let confirmed = u32::try_from(row.confirmed).unwrap_or(u32::MAX);
                (row.participant_id, confirmed)
            })
            .collect())
    }

    async fn update_status(
        &self,
        scope: &EventScope,
        id: Uuid,
        expected: &[MeetingStatus],
        update: StatusUpdate,
    ) -> Result<Option<MeetingRecord>, StoreError> {
        let expected: Vec<MeetingStatusDb> = expected.iter().copied().map(Into::into).collect();
        let requestor = update.requestor.as_ref();

        let timer = QueryTimer::new("update_meeting_status");
        let result = sqlx::query_as::<_, MeetingEntity>(&format!(
            r#"
            UPDATE meetings
            SET request_status = $4,
                request_meeting_slot = $5,
                remarks = COALESCE($6, remarks),
                requestor_id = CASE WHEN $7 THEN $8 ELSE requestor_id END,
                requestor_type = CASE WHEN $7 THEN $9 ELSE requestor_type END,
                requestor_type_entity_id = CASE WHEN $7 THEN $10 ELSE requestor_type_entity_id END,
                request_update_date_time = NOW()
            WHERE ice_id = $1 AND id = $2 AND request_status = ANY($3)
            RETURNING {MEETING_COLUMNS}
            "#
        ))
        .bind(scope.ice_id())
        .bind(id)
        .bind(expected)
        .bind(MeetingStatusDb::from(update.status))
        .bind(update.meeting_slot)
        .bind(&update.remarks)
        .bind(requestor.is_some())
        .bind(requestor.map(|r| r.id.clone()))
        .bind(requestor.map(|r| ParticipantTypeDb::from(r.kind)))
        .bind(requestor.and_then(|r| r.type_entity_id.clone()))
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(MeetingRecord::from))
    }

    async fn confirm_within_quota(
        &self,
        scope: &EventScope,
        request: ConfirmRequest,
    ) -> Result<ConfirmOutcome, StoreError> {
        let ice_id = scope.ice_id();
        let timer = QueryTimer::new("confirm_within_quota");
        let result = async {
            let mut tx = self.pool.begin().await?;
            let outcome = confirm_in_tx(&mut tx, &ice_id, &request).await?;
            // Rejected outcomes roll back with the dropped transaction.
            if matches!(outcome, ConfirmOutcome::Confirmed(_)) {
                tx.commit().await?;
            }
            Ok::<_, sqlx::Error>(outcome)
        }
        .await;
        timer.finish(result)
    }

    async fn upsert_draft(&self, meeting: NewMeeting) -> Result<MeetingRecord, StoreError> {
        let timer = QueryTimer::new("upsert_draft");
        let result = sqlx::query_as::<_, MeetingEntity>(&format!(
            r#"
            INSERT INTO meetings (
                id, meeting_code, ice_id,
                requestor_id, requestor_type, requestor_type_entity_id,
                invitee_id, invitee_type, invitee_type_entity_id,
                request_status, remarks, is_created_by_ai
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'draft', $10, $11)
            ON CONFLICT (ice_id, requestor_type_entity_id, invitee_id)
                WHERE request_status = 'draft'
            DO UPDATE SET
                requestor_id = EXCLUDED.requestor_id,
                requestor_type = EXCLUDED.requestor_type,
                remarks = COALESCE(EXCLUDED.remarks, meetings.remarks),
                request_update_date_time = NOW()
            RETURNING {MEETING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&meeting.meeting_code)
        .bind(&meeting.ice_id)
        .bind(&meeting.requestor.id)
        .bind(ParticipantTypeDb::from(meeting.requestor.kind))
        .bind(&meeting.requestor.type_entity_id)
        .bind(&meeting.invitee.id)
        .bind(ParticipantTypeDb::from(meeting.invitee.kind))
        .bind(&meeting.invitee.type_entity_id)
        .bind(&meeting.remarks)
        .bind(meeting.is_created_by_ai)
        .fetch_one(&self.pool)
        .await;
        Ok(timer.finish(result)?.into())
    }

    async fn set_attended(
        &self,
        scope: &EventScope,
        id: Uuid,
        attended: bool,
    ) -> Result<Option<MeetingRecord>, StoreError> {
        let timer = QueryTimer::new("set_meeting_attended");
        let result = sqlx::query_as::<_, MeetingEntity>(&format!(
            r#"
            UPDATE meetings
            SET attended = $3, request_update_date_time = NOW()
            WHERE ice_id = $1 AND id = $2
            RETURNING {MEETING_COLUMNS}
            "#
        ))
        .bind(scope.ice_id())
        .bind(id)
        .bind(attended)
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(MeetingRecord::from))
    }

    async fn delete(&self, scope: &EventScope, id: Uuid) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("delete_meeting");
        let result = sqlx::query("DELETE FROM meetings WHERE ice_id = $1 AND id = $2")
            .bind(scope.ice_id())
            .bind(id)
            .execute(&self.pool)
            .await;
        Ok(timer.finish(result)?.rows_affected() > 0)
    }

    async fn delete_many(
        &self,
        scope: &EventScope,
        predicate: &MeetingPredicate,
    ) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("delete_meetings");
        // The counterpart is the side not owned by the sponsor, or the invitee
        // when no sponsor is given.
        let result = sqlx::query(
            r#"
            DELETE FROM meetings
            WHERE ice_id = $1
              AND ($2::TEXT IS NULL
                   OR requestor_type_entity_id = $2
                   OR invitee_type_entity_id = $2)
              AND ($3::meeting_status IS NULL OR request_status = $3)
              AND ($4::TEXT[] IS NULL OR (
                   CASE
                       WHEN $2::TEXT IS NULL THEN invitee_id
                       WHEN requestor_id = $2 OR requestor_type_entity_id = $2 THEN invitee_id
                       ELSE requestor_id
                   END) = ANY($4))
            "#,
        )
        .bind(scope.ice_id())
        .bind(&predicate.sponsor_id)
        .bind(predicate.status.map(MeetingStatusDb::from))
        .bind(&predicate.counterpart_ids)
        .execute(&self.pool)
        .await;
        Ok(timer.finish(result)?.rows_affected())
    }
}
