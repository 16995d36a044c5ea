//! Event scope (ICE key) model.

use serde::{Deserialize, Serialize};
use shared::validation::ICE_ID_SEPARATOR;
use validator::Validate;

use crate::error::SchedulingError;

/// Composite `(instanceId, clientId, eventId)` key scoping all event data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventScope {
    #[validate(custom(function = "shared::validation::validate_identifier"))]
    pub instance_id: String,

    #[validate(custom(function = "shared::validation::validate_identifier"))]
    pub client_id: String,

    #[validate(custom(function = "shared::validation::validate_identifier"))]
    pub event_id: String,
}

impl EventScope {
    /// Builds a validated scope; any missing component is a payload error.
    pub fn new(
        instance_id: impl Into<String>,
        client_id: impl Into<String>,
        event_id: impl Into<String>,
    ) -> Result<Self, SchedulingError> {
        let scope = Self {
            instance_id: instance_id.into(),
            client_id: client_id.into(),
            event_id: event_id.into(),
        };
        scope.validate()?;
        Ok(scope)
    }

    /// Parses the string form produced by [`EventScope::ice_id`].
    pub fn parse(ice_id: &str) -> Result<Self, SchedulingError> {
        let mut parts = ice_id.split(ICE_ID_SEPARATOR);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(instance), Some(client), Some(event), None) => {
                Self::new(instance, client, event)
            }
            _ => Err(SchedulingError::Payload(format!(
                "ICE id must have exactly three '{ICE_ID_SEPARATOR}'-separated parts"
            ))),
        }
    }

    /// Denormalized string form stored on every meeting row.
    ///
    /// Components cannot contain the separator, so distinct scopes never
    /// share a string form.
    pub fn ice_id(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.instance_id,
            self.client_id,
            self.event_id,
            sep = ICE_ID_SEPARATOR
        )
    }
}

impl std::fmt::Display for EventScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ice_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ice_id_format() {
        let scope = EventScope::new("inst", "acme", "expo25").unwrap();
        assert_eq!(scope.ice_id(), "inst:acme:expo25");
        assert_eq!(scope.to_string(), "inst:acme:expo25");
    }

    #[test]
    fn test_hyphenated_components_stay_distinct() {
        let one = EventScope::new("a-b", "c", "d").unwrap();
        let two = EventScope::new("a", "b-c", "d").unwrap();

        assert_ne!(one, two);
        assert_ne!(one.ice_id(), two.ice_id());
        assert_eq!(EventScope::parse(&one.ice_id()).unwrap(), one);
        assert_eq!(EventScope::parse(&two.ice_id()).unwrap(), two);
    }

    #[test]
    fn test_separator_in_component_rejected() {
        let err = EventScope::new("a:b", "c", "d").unwrap_err();
        assert_eq!(err.kind(), "PayloadError");
    }

    #[test]
    fn test_parse_requires_three_parts() {
        assert!(EventScope::parse("inst:acme").is_err());
        assert!(EventScope::parse("inst:acme:expo:extra").is_err());
        assert!(EventScope::parse("inst::expo").is_err());
        assert!(EventScope::parse("inst-acme-expo").is_err());
    }

    #[test]
    fn test_missing_component_is_payload_error() {
        let err = EventScope::new("inst", "", "expo25").unwrap_err();
        assert_eq!(err.kind(), "PayloadError");
        assert!(err.message().contains("client_id"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{"instanceId":"i","clientId":"c","eventId":"e"}"#;
        let scope: EventScope = serde_json::from_str(json).unwrap();
        assert_eq!(scope.ice_id(), "i:c:e");
    }
}
