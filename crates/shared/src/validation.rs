//! Common validation utilities.

use chrono::{DateTime, Utc};
use validator::ValidationError;

/// Maximum length of any identifier component (instance, client, event, entity ids).
pub const MAX_ID_LENGTH: usize = 128;

/// Joins the components of an ICE id, e.g. `inst:acme:expo25`.
pub const ICE_ID_SEPARATOR: char = ':';

/// Characters that delimit identifiers in ICE ids, cache keys and header lists.
const RESERVED_CHARS: [char; 3] = [ICE_ID_SEPARATOR, '/', ','];

/// Maximum length of free-text meeting remarks.
pub const MAX_REMARKS_LENGTH: usize = 1000;

/// Validates one component of an event scope key or an entity id.
///
/// Identifiers must be non-empty, at most 128 characters, and must not contain
/// whitespace or any of the `:`, `/` and `,` delimiters.
pub fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("identifier_empty");
        err.message = Some("Identifier cannot be empty".into());
        return Err(err);
    }

    if value.len() > MAX_ID_LENGTH {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some("Identifier cannot exceed 128 characters".into());
        return Err(err);
    }

    if value
        .chars()
        .any(|c| c.is_whitespace() || RESERVED_CHARS.contains(&c))
    {
        let mut err = ValidationError::new("identifier_format");
        err.message = Some("Identifier cannot contain whitespace, ':', '/' or ','".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a list of entity ids supplied for a fan-out operation.
pub fn validate_identifier_list(values: &[String]) -> Result<(), ValidationError> {
    if values.is_empty() {
        let mut err = ValidationError::new("identifier_list_empty");
        err.message = Some("At least one id is required".into());
        return Err(err);
    }

    for value in values {
        validate_identifier(value)?;
    }

    Ok(())
}

/// Validates optional meeting remarks.
pub fn validate_remarks(remarks: &str) -> Result<(), ValidationError> {
    if remarks.chars().count() > MAX_REMARKS_LENGTH {
        let mut err = ValidationError::new("remarks_length");
        err.message = Some("Remarks cannot exceed 1000 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Parses a meeting slot given as an RFC 3339 timestamp.
pub fn parse_meeting_slot(slot: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(slot)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            let mut err = ValidationError::new("slot_format");
            err.message = Some("Meeting slot must be an RFC 3339 timestamp".into());
            err
        })
}
