//! QnA answer collection with shared sponsor ownership.

use tracing::{info, instrument, warn};
use validator::Validate;

use super::store_call::bounded;
use super::{SchedulingSettings, Stores};
use crate::error::SchedulingError;
use crate::models::{
    AttendeeRecord, EntityType, EventScope, QnaAnswer, QnaAnswerInput, QnaOwner, QnaSubmitOutcome,
};
use crate::ports::SubmitMode;

/// Answer set an attendee writes to: the sponsor's for reps, their own otherwise.
fn owner_of(actor: &AttendeeRecord) -> QnaOwner {
    match actor.sponsor_id() {
        Some(sponsor_id) => QnaOwner {
            entity_id: sponsor_id.to_string(),
            entity_type: EntityType::Sponsor,
        },
        None => QnaOwner {
            entity_id: actor.attendee_id.clone(),
            entity_type: EntityType::Attendee,
        },
    }
}

pub struct QnaService {
    stores: Stores,
    settings: SchedulingSettings,
}

impl QnaService {
    pub fn new(stores: Stores, settings: SchedulingSettings) -> Self {
        Self { stores, settings }
    }

    /// Stores `answers` for the actor's owner.
    ///
    /// The first representative to answer for a sponsor locks the set; others
    /// are turned away unless `overwrite` is set.
    #[instrument(skip(self, answers), fields(ice_id = %scope.ice_id(), count = answers.len()))]
    pub async fn submit_answers(
        &self,
        scope: &EventScope,
        actor_id: &str,
        answers: Vec<QnaAnswerInput>,
        overwrite: bool,
    ) -> Result<Vec<QnaAnswer>, SchedulingError> {
        if answers.is_empty() {
            return Err(SchedulingError::Payload(
                "At least one answer is required".to_string(),
            ));
        }
        for answer in &answers {
            answer.validate()?;
        }

        let actor = self
            .stores
            .require_attendee(&self.settings, scope, actor_id)
            .await?;
        let owner = owner_of(&actor);
        let mode = if overwrite {
            SubmitMode::Overwrite
        } else {
            SubmitMode::Guarded
        };

        let outcome = bounded(
            self.settings.store_timeout,
            "qna_submit",
            self.stores.qna.submit(scope, &owner, actor_id, answers, mode),
        )
        .await?;

        match outcome {
            QnaSubmitOutcome::Saved(saved) => {
                info!(
                    owner_id = %owner.entity_id,
                    owner_type = %owner.entity_type,
                    overwrite = overwrite,
                    "QnA answers saved"
                );
                Ok(saved)
            }
            QnaSubmitOutcome::LockedBy { update_by } => {
                warn!(
                    owner_id = %owner.entity_id,
                    submitted_by = %actor_id,
                    locked_by = %update_by,
                    "QnA answers already submitted"
                );
                Err(SchedulingError::Duplicate(format!(
                    "QnA already submitted by another representative ({update_by})"
                )))
            }
        }
    }

    /// The answer set the actor reads and writes.
    pub async fn answers_for(
        &self,
        scope: &EventScope,
        actor_id: &str,
    ) -> Result<Vec<QnaAnswer>, SchedulingError> {
        let actor = self
            .stores
            .require_attendee(&self.settings, scope, actor_id)
            .await?;
        bounded(
            self.settings.store_timeout,
            "qna_answers_for",
            self.stores.qna.answers_for(scope, &owner_of(&actor)),
        )
        .await
    }
}
