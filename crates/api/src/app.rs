use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use persistence::repositories::{
    AlertRepository, ConfigurationRepository, EmergencyRepository, SirenRepository,
    UserRepository,
};
use persistence::store::{
    DocumentStore, FirebaseRealtimeStore, IdentityProvider, MemoryDocumentStore,
    MemoryIdentityProvider, MemoryRealtimeStore, MemorySessionStore, PgDocumentStore,
    PgIdentityProvider, PgRealtimeStore, PgSessionStore, RealtimeStore, SessionStore,
};
use persistence::RealtimeError;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::{Config, RealtimeConfig};
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_admin, require_session,
    security_headers_middleware, trace_id, HstsEnabled, RateLimiterState,
};
use crate::routes::{
    alerts, auth, configuration, dashboard, emergencies, emergency_alerts, exports, health, html,
    notifications, profile, reports, sirens, two_factor, users,
};
use crate::services::CookieHelper;

/// Store adapters the application runs on.
#[derive(Clone)]
pub struct Backends {
    pub docs: Arc<dyn DocumentStore>,
    pub realtime: Arc<dyn RealtimeStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Backends {
    /// Postgres-backed adapters; the realtime flags follow `realtime.provider`.
    pub fn postgres(pool: PgPool, realtime: &RealtimeConfig) -> Result<Self, RealtimeError> {
        let realtime_store: Arc<dyn RealtimeStore> = match realtime.provider.as_str() {
            "firebase" => {
                let token = Some(realtime.auth_token.clone()).filter(|t| !t.is_empty());
                Arc::new(FirebaseRealtimeStore::new(
                    &realtime.database_url,
                    token,
                    realtime.timeout_ms,
                )?)
            }
            "memory" => Arc::new(MemoryRealtimeStore::new()),
            _ => Arc::new(PgRealtimeStore::new(pool.clone())),
        };
        info!(provider = %realtime.provider, "Realtime flag store selected");

        Ok(Self {
            docs: Arc::new(PgDocumentStore::new(pool.clone())),
            realtime: realtime_store,
            identity: Arc::new(PgIdentityProvider::new(pool.clone())),
            sessions: Arc::new(PgSessionStore::new(pool)),
        })
    }

    /// Process-local adapters for tests and local development.
    pub fn in_memory() -> Self {
        Self {
            docs: Arc::new(MemoryDocumentStore::new()),
            realtime: Arc::new(MemoryRealtimeStore::new()),
            identity: Arc::new(MemoryIdentityProvider::new()),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub docs: Arc<dyn DocumentStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub users: UserRepository,
    pub emergencies: EmergencyRepository,
    pub alerts: AlertRepository,
    pub sirens: SirenRepository,
    pub configuration: ConfigurationRepository,
    pub cookies: CookieHelper,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    pub fn new(config: Config, backends: Backends) -> Self {
        let rate_limiter = RateLimiterState::new(config.security.rate_limit_per_minute).map(Arc::new);
        let cookies = CookieHelper::new(&config.session);

        Self {
            users: UserRepository::new(backends.docs.clone(), backends.identity.clone()),
            emergencies: EmergencyRepository::new(backends.docs.clone()),
            alerts: AlertRepository::new(backends.docs.clone()),
            sirens: SirenRepository::new(backends.realtime.clone(), backends.docs.clone()),
            configuration: ConfigurationRepository::new(backends.docs.clone()),
            docs: backends.docs,
            sessions: backends.sessions,
            config: Arc::new(config),
            cookies,
            rate_limiter,
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        // Development: any origin, no credentials.
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .allow_credentials(true)
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Login flow (no session required)
    let auth_routes = Router::new()
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/login/otp", post(auth::login_otp))
        .route("/api/v1/auth/logout", post(auth::logout));

    // Reachable from a provisional session (2FA setup pending)
    let session_routes = Router::new()
        .route(
            "/api/v1/admin/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/api/v1/admin/2fa/setup", post(two_factor::setup))
        .route("/api/v1/admin/2fa/verify", post(two_factor::verify))
        .route("/api/v1/admin/2fa/disable", post(two_factor::disable))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    // Full admin session
    let admin_routes = Router::new()
        .route("/api/v1/dashboard", get(dashboard::get_dashboard))
        .route("/api/v1/reports", get(reports::get_reports))
        .route("/api/v1/alerts", get(alerts::get_alerts_view))
        .route("/api/v1/alerts/:id", delete(emergency_alerts::delete_alert))
        .route(
            "/api/v1/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/v1/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/v1/emergencies",
            get(emergencies::list_emergencies).post(emergencies::create_emergency),
        )
        .route("/api/v1/emergencies/count", get(emergencies::unviewed_count))
        .route(
            "/api/v1/emergencies/mark-viewed",
            post(emergencies::mark_viewed),
        )
        .route(
            "/api/v1/emergencies/:id",
            get(emergencies::get_emergency)
                .put(emergencies::update_emergency)
                .delete(emergencies::delete_emergency),
        )
        .route(
            "/api/v1/emergencies/:id/add-responder",
            post(emergencies::add_responder),
        )
        .route(
            "/api/v1/emergencies/:id/update-responder",
            post(emergencies::update_responder),
        )
        .route(
            "/api/v1/emergency-alerts",
            get(emergency_alerts::list_alerts).post(emergency_alerts::create_alert),
        )
        .route(
            "/api/v1/emergency-alerts/:id",
            get(emergency_alerts::get_alert).delete(emergency_alerts::delete_alert),
        )
        .route(
            "/api/v1/emergency-alerts/:id/add-person",
            post(emergency_alerts::add_person),
        )
        .route(
            "/api/v1/emergency-alerts/:id/remove-person",
            post(emergency_alerts::remove_person),
        )
        .route(
            "/api/v1/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/v1/notifications/count",
            get(notifications::unread_count),
        )
        .route(
            "/api/v1/notifications/mark-read",
            post(notifications::mark_read),
        )
        .route("/api/v1/sirens", get(sirens::sirens_view))
        .route("/api/v1/sirens/status", get(sirens::siren_status))
        .route("/api/v1/sirens/:siren_type/toggle", post(sirens::toggle))
        .route("/api/v1/sirens/:siren_type/activate", post(sirens::activate))
        .route(
            "/api/v1/sirens/:siren_type/deactivate",
            post(sirens::deactivate),
        )
        .route(
            "/api/v1/configuration",
            get(configuration::get_configuration).put(configuration::update_configuration),
        )
        .route("/api/v1/export/:kind/:format", get(exports::export))
        .route("/admin/dashboard", get(html::dashboard_page))
        .route("/admin/reports", get(html::reports_page))
        .route("/admin/alerts", get(html::alerts_page))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Rate limiting covers everything except the operational endpoints.
    let limited = Router::new()
        .merge(auth_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(limited)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            HstsEnabled(config.security.hsts_enabled),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state)
}
