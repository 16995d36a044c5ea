//! Directory listing handlers: attendees, speakers and sponsors.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use domain::models::{
    AttendeeRecord, AvailableAttendee, DirectoryQuery, SortField, SortOrder, SpeakerRecord,
    SponsorRecord,
};
use serde::{Deserialize, Serialize};
use shared::pagination::{Page, PageRequest};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::EventContext;
use crate::routes::{ok, Envelope};

/// Query string of every directory listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryParams {
    pub sort_by: Option<SortField>,
    pub order: Option<SortOrder>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub clear_cache: Option<bool>,
    pub search: Option<String>,
    /// Sponsors only: list every sponsor, not just meeting-enabled ones.
    pub include_all: Option<bool>,
}

impl TryFrom<DirectoryParams> for DirectoryQuery {
    type Error = ApiError;

    fn try_from(params: DirectoryParams) -> Result<Self, Self::Error> {
        let defaults = DirectoryQuery::default();
        Ok(DirectoryQuery {
            sort_by: params.sort_by.unwrap_or(defaults.sort_by),
            order: params.order.unwrap_or(defaults.order),
            page: PageRequest::new(params.page, params.limit)?,
            clear_cache: params.clear_cache.unwrap_or(defaults.clear_cache),
            search: params
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

/// Attendee listing page; items are serialized under `attendees`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeListing<T> {
    pub attendees: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl<T> From<Page<T>> for AttendeeListing<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            attendees: page.items,
            total: page.total,
            page: page.page,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerListing {
    pub speakers: Vec<SpeakerRecord>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl From<Page<SpeakerRecord>> for SpeakerListing {
    fn from(page: Page<SpeakerRecord>) -> Self {
        Self {
            speakers: page.items,
            total: page.total,
            page: page.page,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorListing {
    pub sponsors: Vec<SponsorRecord>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl From<Page<SponsorRecord>> for SponsorListing {
    fn from(page: Page<SponsorRecord>) -> Self {
        Self {
            sponsors: page.items,
            total: page.total,
            page: page.page,
            total_pages: page.total_pages,
        }
    }
}

type Listing<T> = Result<Json<Envelope<T>>, ApiError>;

/// List attendees the caller can still request a meeting with.
///
/// GET /api/v1/events/:instance_id/:client_id/:event_id/attendees/available
pub async fn available_attendees(
    State(state): State<AppState>,
    ctx: EventContext,
    params: Result<Query<DirectoryParams>, QueryRejection>,
) -> Listing<AttendeeListing<AvailableAttendee>> {
    let Query(params) = params?;
    let query = DirectoryQuery::try_from(params)?;

    let page = state
        .services
        .availability
        .available_attendees(&ctx.scope, ctx.actor_id(), &query)
        .await?;

    Ok(ok(page.into()))
}

/// List attendees in the caller's sponsor draft that are still under quota.
///
/// GET /api/v1/events/:instance_id/:client_id/:event_id/attendees/drafted
pub async fn drafted_attendees(
    State(state): State<AppState>,
    ctx: EventContext,
    params: Result<Query<DirectoryParams>, QueryRejection>,
) -> Listing<AttendeeListing<AttendeeRecord>> {
    let Query(params) = params?;
    let query = DirectoryQuery::try_from(params)?;

    let page = state
        .services
        .availability
        .draft_attendees(&ctx.scope, ctx.actor_id(), &query)
        .await?;

    Ok(ok(page.into()))
}

/// GET /api/v1/events/:instance_id/:client_id/:event_id/speakers
pub async fn speakers(
    State(state): State<AppState>,
    ctx: EventContext,
    params: Result<Query<DirectoryParams>, QueryRejection>,
) -> Listing<SpeakerListing> {
    let Query(params) = params?;
    let query = DirectoryQuery::try_from(params)?;

    let page = state
        .services
        .availability
        .available_speakers(&ctx.scope, &query)
        .await?;

    Ok(ok(page.into()))
}

/// GET /api/v1/events/:instance_id/:client_id/:event_id/sponsors
pub async fn sponsors(
    State(state): State<AppState>,
    ctx: EventContext,
    params: Result<Query<DirectoryParams>, QueryRejection>,
) -> Listing<SponsorListing> {
    let Query(params) = params?;
    let include_all = params.include_all.unwrap_or(false);
    let query = DirectoryQuery::try_from(params)?;

    let page = state
        .services
        .availability
        .available_sponsors(&ctx.scope, &query, include_all)
        .await?;

    Ok(ok(page.into()))
}

/// Cached listings dropped by a cache clear.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearResponse {
    pub cleared: usize,
}

/// Drop every cached directory listing of the event (admin only).
///
/// DELETE /api/v1/events/:instance_id/:client_id/:event_id/directory/cache
pub async fn clear_directory_cache(
    State(state): State<AppState>,
    ctx: EventContext,
) -> Json<Envelope<CacheClearResponse>> {
    let cleared = state.services.availability.clear_listings(&ctx.scope).await;

    tracing::info!(
        user_id = %ctx.caller.user_id,
        ice_id = %ctx.scope.ice_id(),
        cleared,
        "Directory cache cleared"
    );
    ok(CacheClearResponse { cleared })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_default_to_directory_defaults() {
        let query = DirectoryQuery::try_from(DirectoryParams::default()).unwrap();
        assert_eq!(query, DirectoryQuery::default());
        assert!(query.clear_cache);
    }

    #[test]
    fn test_params_override() {
        let params = DirectoryParams {
            sort_by: Some(SortField::Company),
            order: Some(SortOrder::Desc),
            page: Some(3),
            limit: Some(5),
            clear_cache: Some(false),
            search: Some("  acme ".to_string()),
            include_all: None,
        };
        let query = DirectoryQuery::try_from(params).unwrap();
        assert_eq!(query.sort_by, SortField::Company);
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.page.offset(), 10);
        assert!(!query.clear_cache);
        assert_eq!(query.search.as_deref(), Some("acme"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let params = DirectoryParams {
            search: Some("   ".to_string()),
            ..DirectoryParams::default()
        };
        assert!(DirectoryQuery::try_from(params).unwrap().search.is_none());
    }

    #[test]
    fn test_attendee_listing_shape() {
        let request = PageRequest::new(Some(2), Some(2)).unwrap();
        let page = shared::pagination::paginate(vec!["a", "b", "c"], request);
        let json = serde_json::to_value(AttendeeListing::from(page)).unwrap();
        assert_eq!(json["attendees"], serde_json::json!(["c"]));
        assert_eq!(json["total"], 3);
        assert_eq!(json["page"], 2);
        assert_eq!(json["totalPages"], 2);
        assert!(json.get("items").is_none());
    }

    #[test]
    fn test_invalid_limit_is_payload_error() {
        let params = DirectoryParams {
            limit: Some(0),
            ..DirectoryParams::default()
        };
        let err = DirectoryQuery::try_from(params).unwrap_err();
        assert_eq!(err.0.status(), -1);
    }
}
