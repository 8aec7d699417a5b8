//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (panic guard, request ID, tracing, CORS, limits, metrics)
//! - Put the auth gate in front of protected routes
//! - Serve until shutdown, then close the connection pool

use axum::{
    body::Body,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Span;

use crate::auth::{optional_auth, require_auth, TokenCodec};
use crate::config::ApiConfig;
use crate::db::PgPool;
use crate::http::cors::cors_layer;
use crate::http::error::ApiError;
use crate::http::handlers::{self, auth, categories, diagnostic, health};
use crate::http::middleware::track_requests;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::resilience::RetryPolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub pool: PgPool,
    pub tokens: Arc<TokenCodec>,
    /// Retry schedule for request-path acquisitions.
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(config: ApiConfig, pool: PgPool, tokens: TokenCodec) -> Self {
        let retry = RetryPolicy::from_config(&config.database);
        Self {
            config: Arc::new(config),
            pool,
            tokens: Arc::new(tokens),
            retry,
        }
    }
}

/// HTTP server for the categories API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState) -> Router {
        let config = state.config.clone();

        let protected = Router::new()
            .route("/categories", get(categories::list).post(categories::create))
            .route(
                "/categories/{id}",
                get(categories::get)
                    .put(categories::update)
                    .delete(categories::delete),
            )
            .route("/auth/me", get(auth::me))
            .route_layer(middleware::from_fn_with_state(
                state.tokens.clone(),
                require_auth,
            ));

        let identified = Router::new()
            .route("/auth/logout", post(auth::logout))
            .route_layer(middleware::from_fn_with_state(
                state.tokens.clone(),
                optional_auth,
            ));

        let public = Router::new()
            .route("/auth/register", post(auth::register))
            .route("/auth/login", post(auth::login))
            .route("/auth/verify", get(auth::verify))
            .route("/health", get(health::health))
            .route("/diagnostic/health", get(diagnostic::liveness))
            .route("/diagnostic/db-test", get(diagnostic::db_test));

        Router::new()
            .merge(public)
            .merge(identified)
            .merge(protected)
            .route_layer(middleware::from_fn(track_requests))
            .fallback(handlers::not_found)
            .method_not_allowed_fallback(handlers::method_not_allowed)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
            .layer(cors_layer(&config.cors))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(CatchPanicLayer::custom(panic_response))
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then close the pool.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped; closing connection pool");
        self.state.pool.close().await;
        Ok(())
    }
}

fn request_span(req: &Request<Body>) -> Span {
    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        request_id = %request_id,
    )
}

/// Last-resort boundary: a panicking handler becomes a generic 500.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    ApiError::internal(format!("handler panicked: {detail}")).into_response()
}
