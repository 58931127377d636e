pub mod aggregator;
pub mod balldontlie;
pub mod types;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use types::GameRecord;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },
    #[error("provider returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

/// Source of per-game box-score rows for one player.
///
/// Implementations handle pagination; retries and backoff belong here too,
/// never to the engine.
#[async_trait]
pub trait GameLogProvider: Send + Sync {
    async fn fetch_game_logs(
        &self,
        player_id: u64,
        season: i32,
        postseason: bool,
    ) -> Result<Vec<GameRecord>, FetchError>;
}
