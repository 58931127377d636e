use super::types::{GameRecord, SeasonSlice};
use super::GameLogProvider;
use crate::error::{ResolveError, ResolveResult};
use futures_util::future::join_all;
use std::sync::Arc;

/// Validate a caller-supplied player identifier.
pub fn parse_player_id(raw: &str) -> ResolveResult<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::MissingPlayerId);
    }
    match trimmed.parse::<u64>() {
        Ok(0) | Err(_) => Err(ResolveError::InvalidPlayerId(raw.to_string())),
        Ok(id) => Ok(id),
    }
}

/// Fetches current and prior season (regular + postseason) for a player.
///
/// Provider failures degrade the affected slice to empty instead of failing
/// the aggregation. Output is unsorted and may contain duplicates.
#[derive(Clone)]
pub struct SeasonAggregator {
    provider: Arc<dyn GameLogProvider>,
}

impl SeasonAggregator {
    pub fn new(provider: Arc<dyn GameLogProvider>) -> Self {
        Self { provider }
    }

    async fn fetch_slice(&self, player_id: u64, season: i32, postseason: bool) -> SeasonSlice {
        match self.provider.fetch_game_logs(player_id, season, postseason).await {
            Ok(records) => SeasonSlice::new(season, postseason, records),
            Err(e) if e.is_rate_limited() => {
                tracing::warn!(player_id, season, postseason, "rate limited, substituting empty slice");
                SeasonSlice::degraded(season, postseason, e.to_string())
            }
            Err(e) => {
                tracing::warn!(player_id, season, postseason, error = %e, "game log fetch failed, substituting empty slice");
                SeasonSlice::degraded(season, postseason, e.to_string())
            }
        }
    }

    /// Regular season and postseason for one season year, fetched concurrently.
    pub async fn fetch_season(&self, player_id: u64, season: i32) -> Vec<SeasonSlice> {
        let (regular, postseason) = tokio::join!(
            self.fetch_slice(player_id, season, false),
            self.fetch_slice(player_id, season, true),
        );
        vec![regular, postseason]
    }

    /// All four slices for `current_season` and the year before, in flight together.
    pub async fn fetch_seasons(
        &self,
        player_id: &str,
        current_season: i32,
    ) -> ResolveResult<Vec<SeasonSlice>> {
        let player_id = parse_player_id(player_id)?;
        let seasons = [current_season, current_season - 1];
        let slices: Vec<SeasonSlice> = join_all(seasons.map(|s| self.fetch_season(player_id, s)))
            .await
            .into_iter()
            .flatten()
            .collect();

        tracing::debug!(
            player_id,
            current_season,
            rows = slices.iter().map(|s| s.records.len()).sum::<usize>(),
            degraded = slices.iter().filter(|s| s.degraded.is_some()).count(),
            "aggregated season slices"
        );
        Ok(slices)
    }
}

/// Concatenation of all slices, in slice order.
pub fn concat(slices: &[SeasonSlice]) -> Vec<GameRecord> {
    slices.iter().flat_map(|s| s.records.iter().cloned()).collect()
}
