//! Caller identity extractors.
//!
//! Identity is asserted by the upstream authenticator through request
//! headers; this layer only parses it and re-checks event membership.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::{request::Parts, HeaderMap},
};
use domain::models::EventScope;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::trace_id::get_request_id;

/// Header carrying the authenticated attendee id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Comma-separated roles of the caller.
pub const USER_ROLES_HEADER: &str = "X-User-Roles";

/// Comma-separated ICE ids (`instance:client:event`) the caller may act in.
pub const ICE_IDS_HEADER: &str = "X-Ice-Ids";

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub roles: Vec<String>,
    /// Events the caller may act in. Malformed header entries are dropped.
    pub events: Vec<EventScope>,
}

fn header_list(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Caller {
    /// Parses the identity headers; a missing user id is `UnauthorizedAccess`.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing caller identity"))?;

        let events = header_list(headers, ICE_IDS_HEADER)
            .iter()
            .filter_map(|raw| match EventScope::parse(raw) {
                Ok(scope) => Some(scope),
                Err(e) => {
                    tracing::debug!(ice_id = %raw, error = %e, "Ignoring malformed ICE id");
                    None
                }
            })
            .collect();

        Ok(Self {
            user_id: user_id.to_string(),
            roles: header_list(headers, USER_ROLES_HEADER),
            events,
        })
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn can_access(&self, scope: &EventScope) -> bool {
        self.events.contains(scope)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Admin middleware may already have parsed the headers
        if let Some(caller) = parts.extensions.get::<Caller>() {
            return Ok(caller.clone());
        }
        Caller::from_headers(&parts.headers)
    }
}

/// Event scope from the path together with the caller acting in it.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub scope: EventScope,
    pub caller: Caller,
}

impl EventContext {
    pub fn actor_id(&self) -> &str {
        &self.caller.user_id
    }
}

fn path_value<'a>(params: &'a HashMap<String, String>, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or_default()
}

#[async_trait]
impl FromRequestParts<AppState> for EventContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state).await?;
        let scope = EventScope::new(
            path_value(&params, "instance_id"),
            path_value(&params, "client_id"),
            path_value(&params, "event_id"),
        )?;

        let caller = Caller::from_request_parts(parts, state).await?;
        if !caller.can_access(&scope) {
            tracing::debug!(
                request_id = %get_request_id(&parts.extensions),
                user_id = %caller.user_id,
                ice_id = %scope.ice_id(),
                "Event access denied"
            );
            return Err(ApiError::access_denied("Caller has no access to this event"));
        }

        Ok(Self { scope, caller })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            let name = HeaderName::from_bytes(name.as_bytes()).unwrap();
            map.insert(name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_missing_user_id_is_unauthorized() {
        let err = Caller::from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.0.status(), -3);

        let err = Caller::from_headers(&headers(&[(USER_ID_HEADER, "  ")])).unwrap_err();
        assert_eq!(err.0.status(), -3);
    }

    #[test]
    fn test_parses_lists() {
        let caller = Caller::from_headers(&headers(&[
            (USER_ID_HEADER, "att-1"),
            (USER_ROLES_HEADER, "attendee, Admin"),
            (ICE_IDS_HEADER, "i:c:e1,,i:c:e2 , broken,x:y"),
        ]))
        .unwrap();

        assert_eq!(caller.user_id, "att-1");
        assert!(caller.has_role("admin"));
        assert!(!caller.has_role("organizer"));
        assert_eq!(
            caller.events,
            vec![
                EventScope::new("i", "c", "e1").unwrap(),
                EventScope::new("i", "c", "e2").unwrap(),
            ]
        );
    }

    #[test]
    fn test_can_access_matches_ice_id() {
        let caller = Caller::from_headers(&headers(&[
            (USER_ID_HEADER, "att-1"),
            (ICE_IDS_HEADER, "inst:acme:expo"),
        ]))
        .unwrap();

        assert!(caller.can_access(&EventScope::new("inst", "acme", "expo").unwrap()));
        assert!(!caller.can_access(&EventScope::new("inst", "acme", "other").unwrap()));
    }

    #[test]
    fn test_access_does_not_leak_across_hyphenated_scopes() {
        let caller = Caller::from_headers(&headers(&[
            (USER_ID_HEADER, "att-1"),
            (ICE_IDS_HEADER, "a-b:c:d"),
        ]))
        .unwrap();

        assert!(caller.can_access(&EventScope::new("a-b", "c", "d").unwrap()));
        assert!(!caller.can_access(&EventScope::new("a", "b-c", "d").unwrap()));
    }

    #[test]
    fn test_no_ice_ids_grants_nothing() {
        let caller = Caller::from_headers(&headers(&[(USER_ID_HEADER, "att-1")])).unwrap();
        assert!(!caller.can_access(&EventScope::new("inst", "acme", "expo").unwrap()));
    }
}
