//! Question/answer collection models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::profile::EntityType;

/// Owner of an answer set: a sponsor (shared by its reps) or an individual.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QnaOwner {
    pub entity_id: String,
    pub entity_type: EntityType,
}

impl QnaOwner {
    /// Whether the answer set is shared by several representatives.
    pub fn is_shared(&self) -> bool {
        self.entity_type == EntityType::Sponsor
    }
}

/// One submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QnaAnswerInput {
    #[validate(custom(function = "shared::validation::validate_identifier"))]
    pub question_id: String,

    #[validate(length(max = 500, message = "Question label must be at most 500 characters"))]
    pub question_label: Option<String>,

    pub selected_value: serde_json::Value,
}

/// A stored answer, unique per `(iceId, entityId, entityType, questionId)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QnaAnswer {
    pub ice_id: String,
    pub entity_id: String,
    pub entity_type: EntityType,
    pub question_id: String,
    pub question_label: Option<String>,
    pub selected_value: serde_json::Value,
    pub update_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a guarded answer-set submission.
#[derive(Debug, Clone, PartialEq)]
pub enum QnaSubmitOutcome {
    Saved(Vec<QnaAnswer>),
    /// The set was first submitted by someone else and overwrite was not requested.
    LockedBy { update_by: String },
}
