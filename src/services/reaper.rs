use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::services::refresh_token::RefreshTokenService;

/// Spawn a background task that deletes expired refresh tokens every
/// `interval`. Failures are logged and the next tick tries again.
pub fn start(refresh_tokens: RefreshTokenService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_once(&refresh_tokens).await;
        }
    })
}

pub async fn sweep_once(refresh_tokens: &RefreshTokenService) -> u64 {
    match refresh_tokens.sweep_expired().await {
        Ok(0) => 0,
        Ok(n) => {
            info!(removed = n, "expired refresh tokens deleted");
            n
        }
        Err(e) => {
            warn!(error = %e, "can't delete expired refresh tokens");
            0
        }
    }
}
