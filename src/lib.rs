// Library exports for the binaries and integration tests
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod poller;
pub mod routes;
pub mod services;
pub mod shutdown;

use std::{sync::Arc, time::Duration};

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use config::Config;
use services::{access_token::AccessTokenService, auth::AuthService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub auth: AuthService,
    pub access_tokens: AccessTokenService,
}

/// Builds the HTTP surface. CORS is layered on by the caller.
pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let access_tokens = state.access_tokens.clone();

    Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/api/v1/user/sign-up", post(routes::auth::sign_up))
        .route("/api/v1/user/sign-in", post(routes::auth::sign_in))
        .route("/api/v1/user/refresh", post(routes::auth::refresh))
        // Categories
        .route(
            "/api/v1/category",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route(
            "/api/v1/category/{id}",
            put(routes::categories::update_category).delete(routes::categories::delete_category),
        )
        // Products
        .route(
            "/api/v1/product",
            get(routes::products::list_products).post(routes::products::create_product),
        )
        .route(
            "/api/v1/product/{id}",
            put(routes::products::update_product).delete(routes::products::delete_product),
        )
        .layer(axum::Extension(access_tokens))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
