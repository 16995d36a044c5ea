//! Common test utilities for integration tests.
//!
//! Every test gets its own router over fresh in-memory stores, seeded with a
//! small cast of attendees, sponsor representatives, sponsors and speakers.

// Helpers are shared by several test binaries; not every binary uses all of them.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use domain::models::{
    AttendeeRecord, EventScope, Profile, RegistrationType, SpeakerRecord, SponsorRecord,
};
use domain::ports::{InMemoryMeetingLedger, InMemoryProfileStore, InMemoryQnaStore, ProfileStore};
use domain::services::{Stores, TtlDirectoryCache};
use meeting_scheduler_api::{
    app::{create_app, AppState},
    config::Config,
};
use persistence::{PgMeetingLedger, PgProfileStore, PgQnaStore};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const INSTANCE: &str = "inst";
pub const CLIENT: &str = "acme";
pub const EVENT: &str = "expo25";
pub const ICE_ID: &str = "inst:acme:expo25";

pub struct TestApp {
    pub router: Router,
    pub profiles: Arc<InMemoryProfileStore>,
    pub cache: Arc<TtlDirectoryCache>,
    pub scope: EventScope,
}

/// Test configuration on the memory backend.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    Config::load_for_test(overrides).expect("Failed to load test config")
}

pub fn attendee(id: &str, name: &str, company: &str) -> Profile {
    Profile::Attendee(AttendeeRecord {
        attendee_id: id.into(),
        name: Some(name.into()),
        company: Some(company.into()),
        designation: None,
        phone: None,
        email: None,
        registration_type: RegistrationType::Attendee,
        meeting_slots: vec![],
        confirmed_meetings: 0,
    })
}

pub fn rep(id: &str, name: &str, sponsor_id: &str) -> Profile {
    Profile::Attendee(AttendeeRecord {
        attendee_id: id.into(),
        name: Some(name.into()),
        company: None,
        designation: Some("Account Executive".into()),
        phone: None,
        email: None,
        registration_type: RegistrationType::Sponsor {
            sponsor_id: sponsor_id.into(),
        },
        meeting_slots: vec![],
        confirmed_meetings: 0,
    })
}

pub fn sponsor(id: &str, name: &str, meeting_enabled: bool) -> Profile {
    Profile::Sponsor(SponsorRecord {
        sponsor_id: id.into(),
        name: Some(name.into()),
        category: Some("Gold".into()),
        booth: None,
        is_meeting_enabled: meeting_enabled,
    })
}

pub fn speaker(id: &str, name: &str) -> Profile {
    Profile::Speaker(SpeakerRecord {
        speaker_id: id.into(),
        name: Some(name.into()),
        company: None,
        designation: None,
        email: None,
    })
}

/// Default cast of the test event.
pub fn default_profiles() -> Vec<Profile> {
    vec![
        attendee("att-alice", "Alice", "Acme"),
        attendee("att-bob", "Bob", "Globex"),
        attendee("att-carol", "Carol", "Hooli"),
        attendee("att-dave", "Dave", "Initrode"),
        rep("rep-erin", "Erin", "spn-initech"),
        rep("rep-frank", "Frank", "spn-initech"),
        rep("rep-grace", "Grace", "spn-umbrella"),
        sponsor("spn-initech", "Initech", true),
        sponsor("spn-umbrella", "Umbrella", false),
        speaker("spk-heidi", "Heidi"),
        speaker("spk-ivan", "Ivan"),
    ]
}

/// Builds a router over fresh in-memory stores seeded with `profiles`.
pub async fn create_test_app_with(overrides: &[(&str, &str)], profiles: Vec<Profile>) -> TestApp {
    let config = test_config(overrides);
    let scope = EventScope::new(INSTANCE, CLIENT, EVENT).expect("valid scope");

    let profile_store = Arc::new(InMemoryProfileStore::new());
    profile_store.seed(&scope, profiles).await;

    let cache = Arc::new(TtlDirectoryCache::new(config.cache.max_entries));
    let stores = Stores {
        profiles: profile_store.clone(),
        ledger: Arc::new(InMemoryMeetingLedger::new()),
        qna: Arc::new(InMemoryQnaStore::new()),
        cache: cache.clone(),
    };

    let state = AppState::with_stores(config, stores, cache.clone(), None);

    TestApp {
        router: create_app(state),
        profiles: profile_store,
        cache,
        scope,
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(&[], default_profiles()).await
}

/// Create a test database pool with migrations applied.
///
/// Uses the `TEST_DATABASE_URL` environment variable; returns `None` when it is
/// unset so Postgres suites are skipped on machines without a database.
pub async fn create_test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    persistence::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}

/// A scope no other test run shares, so rows never need cleaning up.
pub fn unique_scope() -> EventScope {
    EventScope::new("pg", CLIENT, Uuid::new_v4().simple().to_string()).expect("valid scope")
}

/// Router over the Postgres stores, with `profiles` written into `scope`.
pub async fn create_pg_app(pool: &PgPool, scope: &EventScope, profiles: Vec<Profile>) -> Router {
    let config = test_config(&[]);
    let profile_store = PgProfileStore::new(pool.clone());
    for profile in &profiles {
        profile_store
            .update_entity(scope, profile)
            .await
            .expect("Failed to seed profile");
    }

    let cache = Arc::new(TtlDirectoryCache::new(config.cache.max_entries));
    let stores = Stores {
        profiles: Arc::new(profile_store),
        ledger: Arc::new(PgMeetingLedger::new(pool.clone())),
        qna: Arc::new(PgQnaStore::new(pool.clone())),
        cache: cache.clone(),
    };
    create_app(AppState::with_stores(config, stores, cache, Some(pool.clone())))
}

/// URI of `suffix` under an arbitrary event scope.
pub fn scoped_uri(scope: &EventScope, suffix: &str) -> String {
    format!(
        "/api/v1/events/{}/{}/{}{suffix}",
        scope.instance_id, scope.client_id, scope.event_id
    )
}

/// Event-scoped URI for `suffix` (e.g. `/meetings`).
pub fn event_uri(suffix: &str) -> String {
    format!("/api/v1/events/{INSTANCE}/{CLIENT}/{EVENT}{suffix}")
}

/// A request carrying the caller identity headers of `user`.
pub struct Call {
    method: Method,
    uri: String,
    user: Option<String>,
    roles: Option<String>,
    ice_ids: String,
    body: Option<Value>,
}

impl Call {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            user: None,
            roles: None,
            ice_ids: ICE_ID.to_string(),
            body: None,
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn as_user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn roles(mut self, roles: &str) -> Self {
        self.roles = Some(roles.to_string());
        self
    }

    pub fn ice_ids(mut self, ice_ids: &str) -> Self {
        self.ice_ids = ice_ids.to_string();
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn into_request(self) -> Request<Body> {
        let mut builder = Request::builder()
            .method(self.method)
            .uri(self.uri)
            .header("X-Ice-Ids", self.ice_ids);
        if let Some(user) = self.user {
            builder = builder.header("X-User-Id", user);
        }
        if let Some(roles) = self.roles {
            builder = builder.header("X-User-Roles", roles);
        }

        match self.body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    /// Sends the request and returns the status with the parsed JSON body.
    pub async fn send(self, app: &TestApp) -> (StatusCode, Value) {
        self.send_to(&app.router).await
    }

    pub async fn send_to(self, router: &Router) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(self.into_request())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

/// Requests a meeting and returns its code.
pub async fn request_meeting(app: &TestApp, requestor: &str, invitee: &str) -> String {
    let (status, body) = Call::post(event_uri("/meetings"))
        .as_user(requestor)
        .json(serde_json::json!({ "inviteeId": invitee }))
        .send(app)
        .await;
    assert_eq!(status, StatusCode::OK, "request failed: {body}");
    body["meeting"]["meetingCode"]
        .as_str()
        .expect("meeting code")
        .to_string()
}

/// Requests and confirms a meeting at `hour`:00 UTC on the event day.
pub async fn confirmed_meeting(app: &TestApp, requestor: &str, invitee: &str, hour: u32) -> String {
    let code = request_meeting(app, requestor, invitee).await;
    let (status, body) = Call::post(event_uri(&format!("/meetings/{code}/confirm")))
        .as_user(invitee)
        .json(serde_json::json!({ "meetingSlot": slot(hour) }))
        .send(app)
        .await;
    assert_eq!(status, StatusCode::OK, "confirm failed: {body}");
    code
}

pub fn slot(hour: u32) -> String {
    format!("2025-06-01T{hour:02}:00:00Z")
}
