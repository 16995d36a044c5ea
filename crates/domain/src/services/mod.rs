//! Scheduling services.
//!
//! Each service owns clones of the store handles it needs and applies the
//! shared [`SchedulingSettings`]; none of them keeps request state.

pub mod availability;
pub mod directory_cache;
pub mod drafts;
pub mod lifecycle;
pub mod notification;
pub mod qna;
pub mod store_call;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use crate::error::SchedulingError;
use crate::models::{AttendeeRecord, EventScope};
use crate::ports::{DirectoryCache, MeetingLedger, ProfileStore, QnaStore};

pub use availability::AvailabilityResolver;
pub use directory_cache::TtlDirectoryCache;
pub use drafts::{DraftItemResult, DraftManager};
pub use lifecycle::{MeetingLifecycle, RequestMeeting};
pub use notification::{
    dispatch, LogNotifier, MeetingNotification, MeetingNotifier, NotificationResult,
    NotificationType,
};
pub use qna::QnaService;

/// Tunables shared by every scheduling service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingSettings {
    /// Maximum confirmed meetings per non-sponsor attendee.
    pub meeting_quota: u32,
    /// Upper bound on a single store call.
    pub store_timeout: Duration,
    /// Lifetime of cached directory listings.
    pub cache_ttl: Duration,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            meeting_quota: 2,
            store_timeout: Duration::from_secs(5),
            cache_ttl: directory_cache::DEFAULT_TTL,
        }
    }
}

/// Long-lived store handles, built once at startup.
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub ledger: Arc<dyn MeetingLedger>,
    pub qna: Arc<dyn QnaStore>,
    pub cache: Arc<dyn DirectoryCache>,
}

/// All scheduling services over one set of stores.
#[derive(Clone)]
pub struct SchedulingServices {
    pub availability: Arc<AvailabilityResolver>,
    pub lifecycle: Arc<MeetingLifecycle>,
    pub drafts: Arc<DraftManager>,
    pub qna: Arc<QnaService>,
}

impl SchedulingServices {
    pub fn new(
        stores: Stores,
        settings: SchedulingSettings,
        notifier: Arc<dyn MeetingNotifier>,
    ) -> Self {
        Self {
            availability: Arc::new(AvailabilityResolver::new(stores.clone(), settings.clone())),
            lifecycle: Arc::new(MeetingLifecycle::new(
                stores.clone(),
                settings.clone(),
                notifier,
            )),
            drafts: Arc::new(DraftManager::new(stores.clone(), settings.clone())),
            qna: Arc::new(QnaService::new(stores, settings)),
        }
    }
}

impl Stores {
    /// Loads an attendee record, mapping absence to `DataNotFound`.
    pub(crate) async fn require_attendee(
        &self,
        settings: &SchedulingSettings,
        scope: &EventScope,
        attendee_id: &str,
    ) -> Result<AttendeeRecord, SchedulingError> {
        if attendee_id.trim().is_empty() {
            return Err(SchedulingError::Payload("attendeeId is required".to_string()));
        }
        store_call::bounded(
            settings.store_timeout,
            "get_attendee",
            self.profiles.get_attendee(scope, attendee_id),
        )
        .await?
        .ok_or_else(|| SchedulingError::NotFound(format!("Attendee {attendee_id} not found")))
    }
}
