//! Directory listing keys, queries and sorting.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use shared::pagination::PageRequest;

use super::profile::{AttendeeRecord, SpeakerRecord, SponsorRecord};
use super::scope::EventScope;

/// Kinds of cached directory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listing {
    Attendees,
    Speakers,
    Sponsors,
    MeetingEnabledSponsors,
}

impl Listing {
    fn suffix(self) -> &'static str {
        match self {
            Listing::Attendees => "AttendeeList",
            Listing::Speakers => "SpeakerList",
            Listing::Sponsors => "SponsorList",
            Listing::MeetingEnabledSponsors => "SponsorList/prefered",
        }
    }
}

/// Cache key of one listing of one event, e.g. `inst:acme:expo/AttendeeList`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryKey {
    pub ice_id: String,
    pub listing: Listing,
}

impl DirectoryKey {
    pub fn new(scope: &EventScope, listing: Listing) -> Self {
        Self {
            ice_id: scope.ice_id(),
            listing,
        }
    }

    /// Prefix shared by every listing key of one event.
    pub fn event_prefix(scope: &EventScope) -> String {
        format!("{}/", scope.ice_id())
    }
}

impl std::fmt::Display for DirectoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.ice_id, self.listing.suffix())
    }
}

/// Field a directory listing is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Company,
    Designation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Caller options for a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryQuery {
    pub sort_by: SortField,
    pub order: SortOrder,
    pub page: PageRequest,
    /// Force a fresh read from the profile store.
    pub clear_cache: bool,
    /// Case-insensitive substring match on name, company and designation.
    pub search: Option<String>,
}

impl Default for DirectoryQuery {
    fn default() -> Self {
        Self {
            sort_by: SortField::default(),
            order: SortOrder::default(),
            page: PageRequest::default(),
            clear_cache: true,
            search: None,
        }
    }
}

/// An attendee offered as a meeting counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableAttendee {
    #[serde(flatten)]
    pub attendee: AttendeeRecord,
    pub is_drafted: bool,
}

/// Anything that can appear in a sorted, searchable directory listing.
pub trait DirectoryEntry {
    fn field(&self, field: SortField) -> Option<&str>;

    fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [SortField::Name, SortField::Company, SortField::Designation]
            .into_iter()
            .filter_map(|f| self.field(f))
            .any(|value| value.to_lowercase().contains(&needle))
    }
}

impl DirectoryEntry for AttendeeRecord {
    fn field(&self, field: SortField) -> Option<&str> {
        match field {
            SortField::Name => self.name.as_deref(),
            SortField::Company => self.company.as_deref(),
            SortField::Designation => self.designation.as_deref(),
        }
    }
}

impl DirectoryEntry for AvailableAttendee {
    fn field(&self, field: SortField) -> Option<&str> {
        self.attendee.field(field)
    }
}

impl DirectoryEntry for SpeakerRecord {
    fn field(&self, field: SortField) -> Option<&str> {
        match field {
            SortField::Name => self.name.as_deref(),
            SortField::Company => self.company.as_deref(),
            SortField::Designation => self.designation.as_deref(),
        }
    }
}

impl DirectoryEntry for SponsorRecord {
    fn field(&self, field: SortField) -> Option<&str> {
        match field {
            SortField::Name => self.name.as_deref(),
            SortField::Company => self.category.as_deref(),
            SortField::Designation => self.booth.as_deref(),
        }
    }
}

/// Sorts case-insensitively by `field`, treating missing values as empty strings.
///
/// Entries with equal keys keep their input order in both directions.
pub fn sort_entries<T: DirectoryEntry>(entries: &mut [T], field: SortField, order: SortOrder) {
    let key = |e: &T| e.field(field).unwrap_or("").to_lowercase();
    match order {
        SortOrder::Asc => entries.sort_by_cached_key(key),
        SortOrder::Desc => entries.sort_by_cached_key(|e| Reverse(key(e))),
    }
}
