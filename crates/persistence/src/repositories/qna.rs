//! QnA answers backed by the `qna_answers` table.

use async_trait::async_trait;
use domain::models::{EventScope, QnaAnswer, QnaAnswerInput, QnaOwner, QnaSubmitOutcome};
use domain::ports::{QnaStore, SubmitMode};
use domain::StoreError;
use sqlx::{PgPool, Postgres, Transaction};

use crate::entities::{EntityTypeDb, QnaAnswerEntity};
use crate::metrics::QueryTimer;

const ANSWER_COLUMNS: &str = r#"
    ice_id, entity_id, entity_type, question_id, question_label,
    selected_value, update_by, created_at, updated_at
"#;

/// Postgres implementation of [`QnaStore`].
#[derive(Clone)]
pub struct PgQnaStore {
    pool: PgPool,
}

impl PgQnaStore {
    /// Creates a new PgQnaStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Guard check and upsert, run inside `tx` under the owner's advisory lock.
async fn submit_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    ice_id: &str,
    owner: &QnaOwner,
    submitted_by: &str,
    answers: Vec<QnaAnswerInput>,
    mode: SubmitMode,
) -> Result<QnaSubmitOutcome, sqlx::Error> {
    let owner_type = EntityTypeDb::from(owner.entity_type);

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1 || '/' || $2 || '/' || $3))")
        .bind(ice_id)
        .bind(&owner.entity_id)
        .bind(owner.entity_type.to_string())
        .execute(&mut **tx)
        .await?;

    if mode == SubmitMode::Guarded {
        let foreign: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT update_by FROM qna_answers
            WHERE ice_id = $1 AND entity_id = $2 AND entity_type = $3 AND update_by <> $4
            ORDER BY updated_at
            LIMIT 1
            "#,
        )
        .bind(ice_id)
        .bind(&owner.entity_id)
        .bind(owner_type)
        .bind(submitted_by)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some((update_by,)) = foreign {
            return Ok(QnaSubmitOutcome::LockedBy { update_by });
        }
    }

    for answer in answers {
        sqlx::query(
            r#"
            INSERT INTO qna_answers (
                ice_id, entity_id, entity_type, question_id,
                question_label, selected_value, update_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (ice_id, entity_id, entity_type, question_id)
            DO UPDATE SET
                question_label = EXCLUDED.question_label,
                selected_value = EXCLUDED.selected_value,
                update_by = EXCLUDED.update_by,
                updated_at = NOW()
            "#,
        )
        .bind(ice_id)
        .bind(&owner.entity_id)
        .bind(owner_type)
        .bind(&answer.question_id)
        .bind(&answer.question_label)
        .bind(&answer.selected_value)
        .bind(submitted_by)
        .execute(&mut **tx)
        .await?;
    }

    let saved = sqlx::query_as::<_, QnaAnswerEntity>(&format!(
        r#"
        SELECT {ANSWER_COLUMNS} FROM qna_answers
        WHERE ice_id = $1 AND entity_id = $2 AND entity_type = $3
        ORDER BY question_id
        "#
    ))
    .bind(ice_id)
    .bind(&owner.entity_id)
    .bind(owner_type)
    .fetch_all(&mut **tx)
    .await?;

    Ok(QnaSubmitOutcome::Saved(
        saved.into_iter().map(QnaAnswer::from).collect(),
    ))
}

#[async_trait]
impl QnaStore for PgQnaStore {
    async fn answers_for(
        &self,
        scope: &EventScope,
        owner: &QnaOwner,
    ) -> Result<Vec<QnaAnswer>, StoreError> {
        let timer = QueryTimer::new("find_qna_answers");
        let result = sqlx::query_as::<_, QnaAnswerEntity>(&format!(
            r#"
            SELECT {ANSWER_COLUMNS} FROM qna_answers
            WHERE ice_id = $1 AND entity_id = $2 AND entity_type = $3
            ORDER BY question_id
            "#
        ))
        .bind(scope.ice_id())
        .bind(&owner.entity_id)
        .bind(EntityTypeDb::from(owner.entity_type))
        .fetch_all(&self.pool)
        .await;
        Ok(timer.finish(result)?.into_iter().map(QnaAnswer::from).collect())
    }

    async fn submit(
        &self,
        scope: &EventScope,
        owner: &QnaOwner,
        submitted_by: &str,
        answers: Vec<QnaAnswerInput>,
        mode: SubmitMode,
    ) -> Result<QnaSubmitOutcome, StoreError> {
        let ice_id = scope.ice_id();
        let timer = QueryTimer::new("submit_qna_answers");
        let result = async {
            let mut tx = self.pool.begin().await?;
            let outcome = submit_in_tx(&mut tx, &ice_id, owner, submitted_by, answers, mode).await?;
            if matches!(outcome, QnaSubmitOutcome::Saved(_)) {
                tx.commit().await?;
            }
            Ok::<_, sqlx::Error>(outcome)
        }
        .await;
        timer.finish(result)
    }
}
