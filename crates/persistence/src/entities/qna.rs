//! QnA answer entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::QnaAnswer;
use sqlx::FromRow;

use super::profile::EntityTypeDb;

/// Database row mapping for the qna_answers table.
#[derive(Debug, Clone, FromRow)]
pub struct QnaAnswerEntity {
    pub ice_id: String,
    pub entity_id: String,
    pub entity_type: EntityTypeDb,
    pub question_id: String,
    pub question_label: Option<String>,
    pub selected_value: serde_json::Value,
    pub update_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QnaAnswerEntity> for QnaAnswer {
    fn from(entity: QnaAnswerEntity) -> Self {
        QnaAnswer {
            ice_id: entity.ice_id,
            entity_id: entity.entity_id,
            entity_type: entity.entity_type.into(),
            question_id: entity.question_id,
            question_label: entity.question_label,
            selected_value: entity.selected_value,
            update_by: entity.update_by,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
