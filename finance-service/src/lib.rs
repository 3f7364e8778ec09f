pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::FinanceConfig;
use crate::dtos::{ExpenseBody, IncomeBody};
use crate::middleware::{auth_middleware, require_permission, RequiredPermission};
use crate::models::EntryKind;
use crate::services::{
    AuthorizationGate, BypassPolicy, JwtService, MongoDb, RecordStore, RoleLookup,
    SummaryAggregator,
};

#[derive(Clone)]
pub struct AppState {
    pub config: FinanceConfig,
    pub db: MongoDb,
    pub roles: Arc<dyn RoleLookup>,
    pub jwt: JwtService,
    pub gate: AuthorizationGate,
    pub summary: SummaryAggregator,
}

impl AppState {
    /// Wires role lookups, the gate and the aggregator to the MongoDB store.
    pub fn new(config: FinanceConfig, db: MongoDb) -> Self {
        let roles: Arc<dyn RoleLookup> = Arc::new(db.clone());
        let records: Arc<dyn RecordStore> = Arc::new(db.clone());
        let bypass = BypassPolicy::new(config.authorization.bypass_role.clone());

        Self {
            jwt: JwtService::new(&config.jwt),
            gate: AuthorizationGate::new(roles.clone(), bypass),
            roles,
            summary: SummaryAggregator::new(records),
            config,
            db,
        }
    }
}

/// Layers the permission check onto every route of `router`.
fn guarded(state: &AppState, permission: impl Into<String>, router: Router<AppState>) -> Router<AppState> {
    router.route_layer(from_fn_with_state(
        RequiredPermission::new(state.gate.clone(), permission),
        require_permission,
    ))
}

fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(guarded(
            state,
            "view-users",
            Router::new()
                .route("/api/users", get(handlers::users::list_users))
                .route("/api/users/:id", get(handlers::users::get_user)),
        ))
        .merge(guarded(
            state,
            "update-user",
            Router::new()
                .route("/api/users/admin/approve", patch(handlers::users::approve_user))
                .route(
                    "/api/users/admin/deactivate",
                    patch(handlers::users::deactivate_user),
                )
                .route("/api/users/admin/activate", patch(handlers::users::activate_user)),
        ))
        .merge(guarded(
            state,
            "delete-user",
            Router::new().route(
                "/api/users/admin/delete/:id",
                delete(handlers::users::delete_user),
            ),
        ))
}

fn role_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(guarded(
            state,
            "view-roles",
            Router::new()
                .route("/api/roles", get(handlers::roles::list_roles))
                .route("/api/roles/:id", get(handlers::roles::get_role)),
        ))
        .merge(guarded(
            state,
            "add-roles",
            Router::new().route("/api/roles/add", post(handlers::roles::add_role)),
        ))
        .merge(guarded(
            state,
            "delete-roles",
            Router::new().route("/api/roles/delete/:id", delete(handlers::roles::delete_role)),
        ))
}

fn entry_routes<B: dtos::EntryBody>(state: &AppState) -> Router<AppState> {
    let kind: EntryKind = B::KIND;
    let base = format!("/api/{}", kind);
    Router::new()
        .merge(guarded(
            state,
            kind.permission("view"),
            Router::new()
                .route(&base, get(handlers::entries::list::<B>))
                .route(&format!("{}/:id", base), get(handlers::entries::get_one::<B>)),
        ))
        .merge(guarded(
            state,
            kind.permission("add"),
            Router::new().route(&format!("{}/add", base), post(handlers::entries::create::<B>)),
        ))
        .merge(guarded(
            state,
            kind.permission("update"),
            Router::new().route(
                &format!("{}/update", base),
                patch(handlers::entries::update::<B>),
            ),
        ))
        .merge(guarded(
            state,
            kind.permission("delete"),
            Router::new().route(
                &format!("{}/delete/:id", base),
                delete(handlers::entries::remove::<B>),
            ),
        ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(user_routes(&state))
        .merge(role_routes(&state))
        .merge(entry_routes::<IncomeBody>(&state))
        .merge(entry_routes::<ExpenseBody>(&state))
        .merge(guarded(
            &state,
            "view-summary",
            Router::new().route("/api/summary", get(handlers::summary::get_summary)),
        ))
        // Outermost route layer: authentication runs before any permission check
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route("/api/users/register", post(handlers::users::register))
        .route("/api/users/login", post(handlers::users::login))
        .merge(protected)
        .with_state(state.clone())
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
}
