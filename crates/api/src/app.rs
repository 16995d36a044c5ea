use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use domain::ports::{InMemoryMeetingLedger, InMemoryProfileStore, InMemoryQnaStore};
use domain::services::{LogNotifier, MeetingNotifier, SchedulingServices, Stores, TtlDirectoryCache};
use persistence::{PgMeetingLedger, PgProfileStore, PgQnaStore};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, StorageBackend};
use crate::middleware::{metrics_handler, metrics_middleware, require_admin, trace_id};
use crate::routes::{directory, drafts, health, meetings, qna};

/// Prefix of every event-scoped route.
pub const EVENT_PREFIX: &str = "/api/v1/events/:instance_id/:client_id/:event_id";

/// Long-lived handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub services: SchedulingServices,
    pub cache: Arc<TtlDirectoryCache>,
    /// Present only for the postgres storage backend.
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Builds the stores selected by `storage.backend`.
    ///
    /// The postgres backend uses `pool`; the memory backend starts empty.
    pub fn new(config: Config, pool: Option<PgPool>) -> Self {
        let cache = Arc::new(TtlDirectoryCache::new(config.cache.max_entries));

        let stores = match (&config.storage.backend, &pool) {
            (StorageBackend::Postgres, Some(pool)) => Stores {
                profiles: Arc::new(PgProfileStore::new(pool.clone())),
                ledger: Arc::new(PgMeetingLedger::new(pool.clone())),
                qna: Arc::new(PgQnaStore::new(pool.clone())),
                cache: cache.clone(),
            },
            _ => {
                if config.storage.backend == StorageBackend::Postgres {
                    tracing::warn!("No database pool supplied, falling back to in-memory stores");
                }
                Stores {
                    profiles: Arc::new(InMemoryProfileStore::new()),
                    ledger: Arc::new(InMemoryMeetingLedger::new()),
                    qna: Arc::new(InMemoryQnaStore::new()),
                    cache: cache.clone(),
                }
            }
        };

        Self::with_stores(config, stores, cache, pool)
    }

    /// Builds the state over caller-supplied stores.
    pub fn with_stores(
        config: Config,
        stores: Stores,
        cache: Arc<TtlDirectoryCache>,
        pool: Option<PgPool>,
    ) -> Self {
        let notifier: Arc<dyn MeetingNotifier> = if config.notifications.enabled {
            Arc::new(LogNotifier::new())
        } else {
            Arc::new(LogNotifier::disabled())
        };

        let services = SchedulingServices::new(stores, config.scheduling_settings(), notifier);

        Self {
            config: Arc::new(config),
            services,
            cache,
            pool,
        }
    }
}

fn event_routes(state: &AppState) -> Router<AppState> {
    let admin = || middleware::from_fn_with_state(state.clone(), require_admin);

    Router::new()
        .route("/attendees/available", get(directory::available_attendees))
        .route("/attendees/drafted", get(directory::drafted_attendees))
        .route("/speakers", get(directory::speakers))
        .route("/sponsors", get(directory::sponsors))
        .route(
            "/directory/cache",
            delete(directory::clear_directory_cache).route_layer(admin()),
        )
        .route(
            "/meetings",
            get(meetings::list_meetings).post(meetings::request_meeting),
        )
        .route(
            "/meetings/:code",
            get(meetings::get_meeting).merge(delete(meetings::delete_meeting).route_layer(admin())),
        )
        .route("/meetings/:code/confirm", post(meetings::confirm_meeting))
        .route("/meetings/:code/cancel", post(meetings::cancel_meeting))
        .route("/meetings/:code/reject", post(meetings::reject_meeting))
        .route("/meetings/:code/attended", post(meetings::mark_attended))
        .route(
            "/drafts",
            get(drafts::list_drafts)
                .post(drafts::save_drafts)
                .delete(drafts::remove_drafts),
        )
        .route(
            "/sponsors/:sponsor_id/drafts",
            delete(drafts::purge_sponsor_drafts).route_layer(admin()),
        )
        .route("/qna", get(qna::get_answers).post(qna::submit_answers))
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no caller identity required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .nest(EVENT_PREFIX, event_routes(&state))
        .merge(public_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
