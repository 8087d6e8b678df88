//! # catch-api
//!
//! HTTP surface of the catch annotation store: routing, the token auth
//! gate, response format negotiation and the CRUD service.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};

use catch_auth::Authenticator;
use catch_core::defaults::{AUTH_TOKEN_HEADER, CORS_MAX_AGE_SECS, RESPONSE_FORMAT_HEADER};
use catch_core::{AnnotationStore, ResponseFormat};
use catch_search::{SearchConfig, SearchEngine};

pub use config::ServerConfig;
pub use error::ApiError;
pub use services::CrudService;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = catch_core::new_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub crud: CrudService,
    pub search: Arc<SearchEngine>,
    pub auth: Arc<Authenticator>,
    /// Format used when the request names none.
    pub default_format: ResponseFormat,
}

impl AppState {
    pub fn new(store: Arc<dyn AnnotationStore>, config: &ServerConfig) -> Self {
        let search = SearchEngine::new(Arc::clone(&store))
            .with_config(SearchConfig::default().with_max_response_limit(config.response_limit));
        Self {
            crud: CrudService::new(store),
            search: Arc::new(search),
            auth: Arc::new(Authenticator::new(
                Arc::new(config.consumers.clone()),
                config.algorithm,
            )),
            default_format: config.default_format,
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Routes with the auth gate, without transport layers.
pub fn router(state: AppState) -> Router {
    let annos = Router::new()
        .route(
            "/annos/",
            get(handlers::create_or_search).post(handlers::create_or_search),
        )
        .route("/annos/search", get(handlers::search))
        .route(
            "/annos/compat/search",
            get(handlers::compat_search).post(handlers::compat_search_form),
        )
        .route("/annos/compat/create", post(handlers::compat_create))
        .route(
            "/annos/compat/update/:anno_id",
            post(handlers::compat_update),
        )
        .route(
            "/annos/compat/delete/:anno_id",
            delete(handlers::compat_delete),
        )
        .route("/annos/stash", post(handlers::stash))
        .route(
            "/annos/:anno_id",
            get(handlers::crud_api)
                .post(handlers::crud_api)
                .put(handlers::crud_api)
                .delete(handlers::crud_api)
                .fallback(handlers::crud_api),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_catchjwt,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(annos)
        .with_state(state)
}

/// Full application: routes plus tracing, request ids, CORS and body limit.
pub fn app(state: AppState, config: &ServerConfig) -> Router {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", o, e);
                None
            }
        })
        .collect();

    router(state)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([
                    Method::GET,
                    Method::HEAD,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    HeaderName::from_static(AUTH_TOKEN_HEADER),
                    HeaderName::from_static(RESPONSE_FORMAT_HEADER),
                ])
                .expose_headers([header::LOCATION])
                .allow_credentials(true)
                .max_age(Duration::from_secs(CORS_MAX_AGE_SECS)),
        )
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
}
