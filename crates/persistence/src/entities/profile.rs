//! Profile document entity (database row mapping).

use domain::models::{EntityType, Profile};
use sqlx::types::Json;
use sqlx::FromRow;

/// Database enum for entity_type that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "entity_type", rename_all = "lowercase")]
pub enum EntityTypeDb {
    Attendee,
    Sponsor,
    Speaker,
    Session,
}

impl From<EntityType> for EntityTypeDb {
    fn from(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Attendee => EntityTypeDb::Attendee,
            EntityType::Sponsor => EntityTypeDb::Sponsor,
            EntityType::Speaker => EntityTypeDb::Speaker,
            EntityType::Session => EntityTypeDb::Session,
        }
    }
}

impl From<EntityTypeDb> for EntityType {
    fn from(entity_type: EntityTypeDb) -> Self {
        match entity_type {
            EntityTypeDb::Attendee => EntityType::Attendee,
            EntityTypeDb::Sponsor => EntityType::Sponsor,
            EntityTypeDb::Speaker => EntityType::Speaker,
            EntityTypeDb::Session => EntityType::Session,
        }
    }
}

/// Database row mapping for the profile_documents table.
///
/// The document is the profile as JSON, tagged by `entityType`.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileDocumentEntity {
    pub entity_id: String,
    pub document: Json<Profile>,
}

impl From<ProfileDocumentEntity> for Profile {
    fn from(entity: ProfileDocumentEntity) -> Self {
        entity.document.0
    }
}
