use std::{sync::Arc, time::Duration};

use axum::http::{header, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use product_catalog::{
    clock::{Clock, SystemClock},
    config::Config,
    db::{self, refresh_tokens::PgRefreshTokenRepository, users::PgUserRepository},
    router,
    services::{
        access_token::AccessTokenService, auth::AuthService, reaper,
        refresh_token::RefreshTokenService, users::UserService,
    },
    shutdown::shutdown_signal,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let access_tokens = AccessTokenService::new(
        &config.jwt_secret,
        config.access_token_ttl_minutes,
        clock.clone(),
    );
    let refresh_tokens = RefreshTokenService::new(
        Arc::new(PgRefreshTokenRepository::new(pool.clone())),
        clock,
        config.refresh_token_ttl_minutes,
        config.bcrypt_cost,
    );
    let users = UserService::new(Arc::new(PgUserRepository::new(pool.clone())), config.bcrypt_cost);
    let auth = AuthService::new(access_tokens.clone(), refresh_tokens.clone(), users);

    let reaper = reaper::start(refresh_tokens, Duration::from_secs(config.reaper_interval_secs));

    let state = AppState {
        db: pool,
        config: config.clone(),
        auth,
        access_tokens,
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(AllowOrigin::any());

    let app = router(state).layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    info!("product catalog API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.abort();
    Ok(())
}
