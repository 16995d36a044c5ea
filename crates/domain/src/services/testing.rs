//! Shared fixture for service tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use super::notification::RecordingNotifier;
use super::{SchedulingServices, SchedulingSettings, Stores, TtlDirectoryCache};
use crate::models::{
    AttendeeRecord, EventScope, MeetingRecord, Profile, RegistrationType, SpeakerRecord,
    SponsorRecord,
};
use crate::ports::{InMemoryMeetingLedger, InMemoryProfileStore, InMemoryQnaStore};

pub(crate) fn slot(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
}

pub(crate) fn attendee(id: &str, name: &str) -> Profile {
    Profile::Attendee(AttendeeRecord {
        attendee_id: id.into(),
        name: Some(name.into()),
        company: None,
        designation: None,
        phone: None,
        email: None,
        registration_type: RegistrationType::Attendee,
        meeting_slots: vec![],
        confirmed_meetings: 0,
    })
}

pub(crate) fn rep(id: &str, sponsor_id: &str) -> Profile {
    Profile::Attendee(AttendeeRecord {
        attendee_id: id.into(),
        name: Some(format!("Rep {id}")),
        company: None,
        designation: None,
        phone: None,
        email: None,
        registration_type: RegistrationType::Sponsor {
            sponsor_id: sponsor_id.into(),
        },
        meeting_slots: vec![],
        confirmed_meetings: 0,
    })
}

pub(crate) fn sponsor(id: &str, name: &str, meeting_enabled: bool) -> Profile {
    Profile::Sponsor(SponsorRecord {
        sponsor_id: id.into(),
        name: Some(name.into()),
        category: None,
        booth: None,
        is_meeting_enabled: meeting_enabled,
    })
}

pub(crate) fn speaker(id: &str, name: &str) -> Profile {
    Profile::Speaker(SpeakerRecord {
        speaker_id: id.into(),
        name: Some(name.into()),
        company: None,
        designation: None,
        email: None,
    })
}

pub(crate) struct Fixture {
    pub scope: EventScope,
    pub profiles: Arc<InMemoryProfileStore>,
    pub ledger: Arc<InMemoryMeetingLedger>,
    pub cache: Arc<TtlDirectoryCache>,
    pub notifier: Arc<RecordingNotifier>,
    pub services: SchedulingServices,
}

impl Fixture {
    pub async fn new(profiles: Vec<Profile>) -> Self {
        Self::with_settings(profiles, SchedulingSettings::default()).await
    }

    pub async fn with_settings(profiles: Vec<Profile>, settings: SchedulingSettings) -> Self {
        Self::build(Arc::new(InMemoryProfileStore::new()), profiles, settings).await
    }

    pub async fn build(
        store: Arc<InMemoryProfileStore>,
        profiles: Vec<Profile>,
        settings: SchedulingSettings,
    ) -> Self {
        let scope = EventScope::new("inst", "acme", "expo").unwrap();
        store.seed(&scope, profiles).await;

        let ledger = Arc::new(InMemoryMeetingLedger::new());
        let cache = Arc::new(TtlDirectoryCache::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let stores = Stores {
            profiles: store.clone(),
            ledger: ledger.clone(),
            qna: Arc::new(InMemoryQnaStore::new()),
            cache: cache.clone(),
        };

        Self {
            scope,
            profiles: store,
            ledger,
            cache,
            notifier: notifier.clone(),
            services: SchedulingServices::new(stores, settings, notifier),
        }
    }

    /// Requests and confirms a meeting at `hour` on the fixture day.
    pub async fn confirmed(&self, requestor: &str, invitee: &str, hour: u32) -> MeetingRecord {
        let lifecycle = &self.services.lifecycle;
        let requested = lifecycle
            .request(&self.scope, requestor, super::RequestMeeting::to(invitee))
            .await
            .unwrap();
        lifecycle
            .confirm(&self.scope, invitee, &requested.meeting_code, slot(hour))
            .await
            .unwrap()
    }
}
