//! Availability resolver: who may an actor still send a meeting request to.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use shared::pagination::{paginate, Page};
use tracing::{debug, instrument};

use super::store_call::bounded;
use super::{SchedulingSettings, Stores};
use crate::error::SchedulingError;
use crate::models::{
    sort_entries, AttendeeRecord, AvailableAttendee, DirectoryEntry, DirectoryKey,
    DirectoryQuery, EntityType, EventScope, Listing, MeetingRecord, MeetingStatus, Profile,
    ProfileFilter, RegistrationKind, SpeakerRecord, SponsorRecord,
};
use crate::ports::CachedListing;

/// Computes candidate lists from the directory, the ledger and the quota rule.
pub struct AvailabilityResolver {
    stores: Stores,
    settings: SchedulingSettings,
}

impl AvailabilityResolver {
    pub fn new(stores: Stores, settings: SchedulingSettings) -> Self {
        Self { stores, settings }
    }

    /// Eligible counterparts for `actor_id`, sorted and paginated.
    ///
    /// Attendees at quota, and attendees the actor (or the actor's sponsor)
    /// already requested, confirmed or cancelled with, are left out. Drafted
    /// attendees stay in the list with `is_drafted` set.
    #[instrument(skip(self, query), fields(ice_id = %scope.ice_id()))]
    pub async fn available_attendees(
        &self,
        scope: &EventScope,
        actor_id: &str,
        query: &DirectoryQuery,
    ) -> Result<Page<AvailableAttendee>, SchedulingError> {
        let actor = self
            .stores
            .require_attendee(&self.settings, scope, actor_id)
            .await?;
        let owner = actor.owner_id();

        let (counts, meetings, directory) = tokio::try_join!(
            self.confirmed_counts(scope),
            self.owner_meetings(scope, &actor),
            self.listing(scope, Listing::Attendees, query.clear_cache),
        )?;

        let mut excluded = HashSet::new();
        let mut drafted = HashSet::new();
        for meeting in &meetings {
            let Some(counterpart) = meeting.counterpart_of(owner) else {
                continue;
            };
            match meeting.request_status {
                MeetingStatus::Requested | MeetingStatus::Cancelled | MeetingStatus::Confirmed => {
                    excluded.insert(counterpart);
                }
                MeetingStatus::Draft => {
                    drafted.insert(counterpart);
                }
                MeetingStatus::Rejected => {}
            }
        }

        let mut candidates: Vec<AvailableAttendee> = directory
            .iter()
            .filter_map(|profile| match profile {
                Profile::Attendee(attendee) => Some(attendee),
                _ => None,
            })
            .filter(|a| a.attendee_id != actor.attendee_id)
            .filter(|a| !self.at_quota(&counts, &a.attendee_id))
            .filter(|a| !excluded.contains(a.attendee_id.as_str()))
            .filter(|a| matches_search(*a, query))
            .map(|a| AvailableAttendee {
                is_drafted: drafted.contains(a.attendee_id.as_str()),
                attendee: a.clone(),
            })
            .collect();

        sort_entries(&mut candidates, query.sort_by, query.order);
        debug!(
            actor_id = %actor_id,
            directory_size = directory.len(),
            excluded = excluded.len(),
            available = candidates.len(),
            "Resolved available attendees"
        );

        Ok(paginate(candidates, query.page))
    }

    /// Attendees drafted by the actor's sponsor, minus those already at quota.
    #[instrument(skip(self, query), fields(ice_id = %scope.ice_id()))]
    pub async fn draft_attendees(
        &self,
        scope: &EventScope,
        actor_id: &str,
        query: &DirectoryQuery,
    ) -> Result<Page<AttendeeRecord>, SchedulingError> {
        let actor = self
            .stores
            .require_attendee(&self.settings, scope, actor_id)
            .await?;
        let sponsor_id = actor.sponsor_id().ok_or_else(|| {
            SchedulingError::Payload(format!("Attendee {actor_id} is not linked to a sponsor"))
        })?;

        let (counts, meetings) = tokio::try_join!(
            self.confirmed_counts(scope),
            self.owner_meetings(scope, &actor),
        )?;

        let mut drafted_ids: Vec<String> = Vec::new();
        for meeting in meetings
            .iter()
            .filter(|m| m.request_status == MeetingStatus::Draft)
        {
            if let Some(counterpart) = meeting.counterpart_of(sponsor_id) {
                if !drafted_ids.iter().any(|id| id == counterpart) {
                    drafted_ids.push(counterpart.to_string());
                }
            }
        }
        if drafted_ids.is_empty() {
            return Ok(paginate(Vec::new(), query.page));
        }

        let profiles = bounded(
            self.settings.store_timeout,
            "list_entities",
            self.stores.profiles.list_entities(
                scope,
                EntityType::Attendee,
                &ProfileFilter::Ids(drafted_ids),
            ),
        )
        .await?;

        let mut attendees: Vec<AttendeeRecord> = profiles
            .into_iter()
            .filter_map(Profile::into_attendee)
            .filter(|a| !self.at_quota(&counts, &a.attendee_id))
            .filter(|a| matches_search(a, query))
            .collect();
        sort_entries(&mut attendees, query.sort_by, query.order);

        Ok(paginate(attendees, query.page))
    }

    pub async fn available_speakers(
        &self,
        scope: &EventScope,
        query: &DirectoryQuery,
    ) -> Result<Page<SpeakerRecord>, SchedulingError> {
        let listing = self
            .listing(scope, Listing::Speakers, query.clear_cache)
            .await?;
        let mut speakers: Vec<SpeakerRecord> = listing
            .iter()
            .cloned()
            .filter_map(Profile::into_speaker)
            .filter(|s| matches_search(s, query))
            .collect();
        sort_entries(&mut speakers, query.sort_by, query.order);
        Ok(paginate(speakers, query.page))
    }

    /// Meeting-enabled sponsors, or every sponsor when `include_all` is set.
    pub async fn available_sponsors(
        &self,
        scope: &EventScope,
        query: &DirectoryQuery,
        include_all: bool,
    ) -> Result<Page<SponsorRecord>, SchedulingError> {
        let kind = if include_all {
            Listing::Sponsors
        } else {
            Listing::MeetingEnabledSponsors
        };
        let listing = self.listing(scope, kind, query.clear_cache).await?;
        let mut sponsors: Vec<SponsorRecord> = listing
            .iter()
            .cloned()
            .filter_map(Profile::into_sponsor)
            .filter(|s| matches_search(s, query))
            .collect();
        sort_entries(&mut sponsors, query.sort_by, query.order);
        Ok(paginate(sponsors, query.page))
    }

    /// Drops every cached listing of the event; returns how many were removed.
    #[instrument(skip(self), fields(ice_id = %scope.ice_id()))]
    pub async fn clear_listings(&self, scope: &EventScope) -> usize {
        let removed = self
            .stores
            .cache
            .invalidate_prefix(&DirectoryKey::event_prefix(scope))
            .await;
        debug!(removed, "Directory listings cleared");
        removed
    }

    /// Reads a directory listing through the cache.
    ///
    /// `clear_cache` skips the lookup and repopulates the key from the store.
    async fn listing(
        &self,
        scope: &EventScope,
        listing: Listing,
        clear_cache: bool,
    ) -> Result<CachedListing, SchedulingError> {
        let key = DirectoryKey::new(scope, listing).to_string();
        if !clear_cache {
            if let Some(hit) = self.stores.cache.get(&key).await {
                debug!(key = %key, "Directory cache hit");
                return Ok(hit);
            }
        }

        let (entity_type, filter) = match listing {
            Listing::Attendees => (
                EntityType::Attendee,
                ProfileFilter::Registration(RegistrationKind::Attendee),
            ),
            Listing::Speakers => (EntityType::Speaker, ProfileFilter::All),
            Listing::Sponsors => (EntityType::Sponsor, ProfileFilter::All),
            Listing::MeetingEnabledSponsors => {
                (EntityType::Sponsor, ProfileFilter::MeetingEnabled(true))
            }
        };

        let fresh: CachedListing = Arc::new(
            bounded(
                self.settings.store_timeout,
                "list_entities",
                self.stores.profiles.list_entities(scope, entity_type, &filter),
            )
            .await?,
        );
        self.stores
            .cache
            .put(&key, Arc::clone(&fresh), self.settings.cache_ttl)
            .await;
        debug!(key = %key, entries = fresh.len(), "Directory listing refreshed");

        Ok(fresh)
    }

    async fn confirmed_counts(
        &self,
        scope: &EventScope,
    ) -> Result<HashMap<String, u32>, SchedulingError> {
        bounded(
            self.settings.store_timeout,
            "count_confirmed_by_participant",
            self.stores.ledger.count_confirmed_by_participant(scope),
        )
        .await
    }

    /// Ledger rows of the actor's owner: the whole sponsor for reps.
    async fn owner_meetings(
        &self,
        scope: &EventScope,
        actor: &AttendeeRecord,
    ) -> Result<Vec<MeetingRecord>, SchedulingError> {
        let timeout = self.settings.store_timeout;
        match actor.sponsor_id() {
            Some(sponsor_id) => {
                bounded(
                    timeout,
                    "find_by_sponsor",
                    self.stores.ledger.find_by_sponsor(scope, sponsor_id),
                )
                .await
            }
            None => {
                bounded(
                    timeout,
                    "find_by_participant",
                    self.stores
                        .ledger
                        .find_by_participant(scope, &actor.attendee_id),
                )
                .await
            }
        }
    }

    fn at_quota(&self, counts: &HashMap<String, u32>, attendee_id: &str) -> bool {
        counts.get(attendee_id).copied().unwrap_or(0) >= self.settings.meeting_quota
    }
}

fn matches_search<T: DirectoryEntry>(entry: &T, query: &DirectoryQuery) -> bool {
    query
        .search
        .as_deref()
        .is_none_or(|needle| entry.matches_search(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortOrder;
    use crate::ports::InMemoryProfileStore;
    use crate::services::testing::{attendee, rep, speaker, sponsor, Fixture};
    use crate::services::RequestMeeting;
    use std::time::Duration;

    fn ids(page: &Page<AvailableAttendee>) -> Vec<&str> {
        page.items
            .iter()
            .map(|a| a.attendee.attendee_id.as_str())
            .collect()
    }

    async fn expo() -> Fixture {
        Fixture::new(vec![
            attendee("a", "Alice"),
            attendee("b", "Bob"),
            attendee("c", "Carol"),
            attendee("d", "dave"),
            attendee("x", "Xena"),
            attendee("y", "Yuri"),
            rep("r1", "s1"),
            rep("r2", "s1"),
            sponsor("s1", "Acme", true),
            sponsor("s2", "Globex", false),
            speaker("sp1", "Sam"),
        ])
        .await
    }

    #[tokio::test]
    async fn test_lists_attendees_only_sorted_by_name() {
        let fx = expo().await;
        let page = fx
            .services
            .availability
            .available_attendees(&fx.scope, "r1", &DirectoryQuery::default())
            .await
            .unwrap();

        assert_eq!(ids(&page), vec!["a", "b", "c", "d", "x", "y"]);
        assert_eq!(page.total, 6);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.iter().all(|a| !a.is_drafted));
    }

    #[tokio::test]
    async fn test_quota_reached_attendee_is_excluded() {
        let fx = expo().await;
        fx.confirmed("b", "x", 9).await;
        fx.confirmed("y", "b", 10).await;

        let page = fx
            .services
            .availability
            .available_attendees(&fx.scope, "c", &DirectoryQuery::default())
            .await
            .unwrap();

        assert!(!ids(&page).contains(&"b"));
        assert!(ids(&page).contains(&"x"));
        assert!(!ids(&page).contains(&"c"));
    }

    #[tokio::test]
    async fn test_requested_and_cancelled_by_sponsor_are_excluded() {
        let fx = expo().await;
        let lifecycle = &fx.services.lifecycle;
        lifecycle
            .request(&fx.scope, "r1", RequestMeeting::to("a"))
            .await
            .unwrap();
        let cancelled = lifecycle
            .request(&fx.scope, "r1", RequestMeeting::to("b"))
            .await
            .unwrap();
        lifecycle
            .cancel(&fx.scope, "r1", &cancelled.meeting_code, None)
            .await
            .unwrap();
        let rejected = lifecycle
            .request(&fx.scope, "r1", RequestMeeting::to("c"))
            .await
            .unwrap();
        lifecycle
            .reject(&fx.scope, "c", &rejected.meeting_code, None)
            .await
            .unwrap();

        // r2 shares the sponsor-level exclusions of r1
        let page = fx
            .services
            .availability
            .available_attendees(&fx.scope, "r2", &DirectoryQuery::default())
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["c", "d", "x", "y"]);
    }

    #[tokio::test]
    async fn test_drafted_attendees_are_marked_not_removed() {
        let fx = expo().await;
        fx.services
            .drafts
            .save_as_draft(&fx.scope, "r1", vec!["a".into(), "d".into()])
            .await
            .unwrap();

        let page = fx
            .services
            .availability
            .available_attendees(&fx.scope, "r2", &DirectoryQuery::default())
            .await
            .unwrap();
        let drafted: Vec<_> = page
            .items
            .iter()
            .filter(|a| a.is_drafted)
            .map(|a| a.attendee.attendee_id.as_str())
            .collect();
        assert_eq!(drafted, vec!["a", "d"]);
        assert_eq!(page.total, 6);
    }

    #[tokio::test]
    async fn test_sort_desc_search_and_pagination() {
        let fx = expo().await;
        let query = DirectoryQuery {
            order: SortOrder::Desc,
            page: shared::pagination::PageRequest::new(Some(2), Some(2)).unwrap(),
            ..DirectoryQuery::default()
        };
        let page = fx
            .services
            .availability
            .available_attendees(&fx.scope, "r1", &query)
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["d", "c"]);
        assert_eq!(page.total_pages, 3);

        let search = DirectoryQuery {
            search: Some("AL".into()),
            ..DirectoryQuery::default()
        };
        let page = fx
            .services
            .availability
            .available_attendees(&fx.scope, "r1", &search)
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["a"]);
    }

    #[tokio::test]
    async fn test_unknown_actor_is_not_found() {
        let fx = expo().await;
        let err = fx
            .services
            .availability
            .available_attendees(&fx.scope, "ghost", &DirectoryQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cache_is_used_only_without_clear_cache() {
        let fx = expo().await;
        let cached = DirectoryQuery {
            clear_cache: false,
            ..DirectoryQuery::default()
        };
        let availability = &fx.services.availability;
        availability
            .available_attendees(&fx.scope, "r1", &cached)
            .await
            .unwrap();

        fx.profiles
            .seed(&fx.scope, [attendee("e", "Eve")])
            .await;

        let stale = availability
            .available_attendees(&fx.scope, "r1", &cached)
            .await
            .unwrap();
        assert_eq!(stale.total, 6);

        let fresh = availability
            .available_attendees(&fx.scope, "r1", &DirectoryQuery::default())
            .await
            .unwrap();
        assert_eq!(fresh.total, 7);
        assert_eq!(fx.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_listings_keeps_other_events() {
        let fx = expo().await;
        let availability = &fx.services.availability;
        let other = EventScope::new("i", "c", "other").unwrap();
        let cached = DirectoryQuery {
            clear_cache: false,
            ..DirectoryQuery::default()
        };
        availability
            .available_speakers(&fx.scope, &cached)
            .await
            .unwrap();
        availability
            .available_sponsors(&fx.scope, &cached, false)
            .await
            .unwrap();
        availability.available_speakers(&other, &cached).await.unwrap();
        assert_eq!(fx.cache.len(), 3);

        assert_eq!(availability.clear_listings(&fx.scope).await, 2);
        assert_eq!(fx.cache.len(), 1);
        assert_eq!(availability.clear_listings(&fx.scope).await, 0);
    }

    #[tokio::test]
    async fn test_sponsor_and_speaker_listings() {
        let fx = expo().await;
        let availability = &fx.services.availability;
        let enabled = availability
            .available_sponsors(&fx.scope, &DirectoryQuery::default(), false)
            .await
            .unwrap();
        assert_eq!(enabled.total, 1);
        assert_eq!(enabled.items[0].sponsor_id, "s1");

        let all = availability
            .available_sponsors(&fx.scope, &DirectoryQuery::default(), true)
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let speakers = availability
            .available_speakers(&fx.scope, &DirectoryQuery::default())
            .await
            .unwrap();
        assert_eq!(speakers.items[0].speaker_id, "sp1");
    }

    #[tokio::test]
    async fn test_draft_attendees_excludes_quota_reached() {
        let fx = expo().await;
        fx.services
            .drafts
            .save_as_draft(&fx.scope, "r1", vec!["a".into(), "b".into()])
            .await
            .unwrap();
        fx.confirmed("b", "x", 9).await;
        fx.confirmed("b", "y", 10).await;

        let page = fx
            .services
            .availability
            .draft_attendees(&fx.scope, "r2", &DirectoryQuery::default())
            .await
            .unwrap();
        let ids: Vec<_> = page.items.iter().map(|a| a.attendee_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);

        let err = fx
            .services
            .availability
            .draft_attendees(&fx.scope, "a", &DirectoryQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Payload(_)));
    }

    #[tokio::test]
    async fn test_slow_store_surfaces_service_unavailable() {
        let fx = Fixture::build(
            std::sync::Arc::new(InMemoryProfileStore::with_latency(Duration::from_millis(200))),
            vec![attendee("a", "Alice")],
            SchedulingSettings {
                store_timeout: Duration::from_millis(20),
                ..SchedulingSettings::default()
            },
        )
        .await;

        let err = fx
            .services
            .availability
            .available_attendees(&fx.scope, "a", &DirectoryQuery::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
