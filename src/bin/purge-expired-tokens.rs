/// Delete expired refresh tokens once and exit.
/// Useful from cron when the API's in-process reaper is disabled or down.
///
/// Usage: purge-expired-tokens [--dry-run]
///   --dry-run : Only report how many tokens are expired
use chrono::Utc;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use product_catalog::db::refresh_tokens::{PgRefreshTokenRepository, RefreshTokenRepository};

#[derive(Parser)]
#[command(
    name = "purge-expired-tokens",
    about = "Delete expired refresh tokens from the catalog database"
)]
struct Args {
    /// Count expired tokens without deleting them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Missing required env var: DATABASE_URL"))?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    if args.dry_run {
        let expired: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE expires_at <= $1")
                .bind(Utc::now())
                .fetch_one(&pool)
                .await?;
        tracing::info!(expired, "dry run, nothing deleted");
        return Ok(());
    }

    let removed = PgRefreshTokenRepository::new(pool)
        .delete_expired(Utc::now())
        .await?;
    tracing::info!(removed, "expired refresh tokens deleted");

    Ok(())
}
