//! Profile store backed by JSONB documents in `profile_documents`.

use async_trait::async_trait;
use domain::models::{EntityType, EventScope, Profile, ProfileFilter};
use domain::ports::ProfileStore;
use domain::StoreError;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::entities::{EntityTypeDb, ProfileDocumentEntity};
use crate::metrics::QueryTimer;

/// Bind values for the optional filter columns of a listing query.
#[derive(Debug, Default, PartialEq)]
struct FilterBinds {
    registration_kind: Option<String>,
    sponsor_id: Option<String>,
    meeting_enabled: Option<bool>,
    ids: Option<Vec<String>>,
}

impl From<&ProfileFilter> for FilterBinds {
    fn from(filter: &ProfileFilter) -> Self {
        match filter {
            ProfileFilter::All => Self::default(),
            ProfileFilter::Registration(kind) => Self {
                registration_kind: Some(kind.to_string()),
                ..Self::default()
            },
            ProfileFilter::SponsorLinkage(sponsor_id) => Self {
                sponsor_id: Some(sponsor_id.clone()),
                ..Self::default()
            },
            ProfileFilter::MeetingEnabled(enabled) => Self {
                meeting_enabled: Some(*enabled),
                ..Self::default()
            },
            ProfileFilter::Ids(ids) => Self {
                ids: Some(ids.clone()),
                ..Self::default()
            },
        }
    }
}

/// Postgres implementation of [`ProfileStore`].
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Creates a new PgProfileStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_entity(
        &self,
        scope: &EventScope,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<Profile>, StoreError> {
        let timer = QueryTimer::new("get_profile");
        let result = sqlx::query_as::<_, ProfileDocumentEntity>(
            r#"
            SELECT entity_id, document
            FROM profile_documents
            WHERE ice_id = $1 AND entity_type = $2 AND entity_id = $3
            "#,
        )
        .bind(scope.ice_id())
        .bind(EntityTypeDb::from(entity_type))
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await;
        Ok(timer.finish(result)?.map(Profile::from))
    }

    async fn list_entities(
        &self,
        scope: &EventScope,
        entity_type: EntityType,
        filter: &ProfileFilter,
    ) -> Result<Vec<Profile>, StoreError> {
        let binds = FilterBinds::from(filter);
        let timer = QueryTimer::new("list_profiles");
        let result = sqlx::query_as::<_, ProfileDocumentEntity>(
            r#"
            SELECT entity_id, document
            FROM profile_documents
            WHERE ice_id = $1
              AND entity_type = $2
              AND ($3::TEXT IS NULL OR document->'registrationType'->>'kind' = $3)
              AND ($4::TEXT IS NULL
                   OR document->'registrationType'->>'registrationTypeEntityId' = $4)
              AND ($5::BOOLEAN IS NULL
                   OR COALESCE((document->>'isMeetingEnabled')::BOOLEAN, FALSE) = $5)
              AND ($6::TEXT[] IS NULL OR entity_id = ANY($6))
            ORDER BY entity_id
            "#,
        )
        .bind(scope.ice_id())
        .bind(EntityTypeDb::from(entity_type))
        .bind(binds.registration_kind)
        .bind(binds.sponsor_id)
        .bind(binds.meeting_enabled)
        .bind(binds.ids)
        .fetch_all(&self.pool)
        .await;
        Ok(timer.finish(result)?.into_iter().map(Profile::from).collect())
    }

    async fn update_entity(&self, scope: &EventScope, profile: &Profile) -> Result<(), StoreError> {
        let timer = QueryTimer::new("upsert_profile");
        let result = sqlx::query(
            r#"
            INSERT INTO profile_documents (ice_id, entity_type, entity_id, document)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ice_id, entity_type, entity_id)
            DO UPDATE SET document = EXCLUDED.document, updated_at = NOW()
            "#,
        )
        .bind(scope.ice_id())
        .bind(EntityTypeDb::from(profile.entity_type()))
        .bind(profile.entity_id())
        .bind(Json(profile))
        .execute(&self.pool)
        .await;
        timer.finish(result)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::RegistrationKind;

    #[test]
    fn test_registration_filter_binds_kind_only() {
        let binds = FilterBinds::from(&ProfileFilter::Registration(RegistrationKind::Attendee));
        assert_eq!(binds.registration_kind.as_deref(), Some("Attendee"));
        assert_eq!(binds.sponsor_id, None);
        assert_eq!(binds.ids, None);
    }

    #[test]
    fn test_all_filter_binds_nothing() {
        assert_eq!(FilterBinds::from(&ProfileFilter::All), FilterBinds::default());
    }

    #[test]
    fn test_ids_and_flags_filters() {
        let binds = FilterBinds::from(&ProfileFilter::Ids(vec!["a1".into(), "a2".into()]));
        assert_eq!(binds.ids, Some(vec!["a1".to_string(), "a2".to_string()]));

        let binds = FilterBinds::from(&ProfileFilter::MeetingEnabled(true));
        assert_eq!(binds.meeting_enabled, Some(true));

        let binds = FilterBinds::from(&ProfileFilter::SponsorLinkage("s1".into()));
        assert_eq!(binds.sponsor_id.as_deref(), Some("s1"));
    }
}
