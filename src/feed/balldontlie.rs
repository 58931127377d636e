use super::types::*;
use super::{FetchError, GameLogProvider};
use crate::config::ProviderConfig;
use crate::engine::teams::TeamTable;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// balldontlie-style `/v1/stats` game-log provider.
pub struct BalldontlieFeed {
    client: Client,
    api_key: String,
    base_url: String,
    per_page: u32,
    max_pages: u32,
    teams: TeamTable,
}

impl BalldontlieFeed {
    pub fn new(api_key: String, config: &ProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent("statline/0.1")
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            per_page: config.per_page,
            max_pages: config.max_pages.max(1),
            teams: TeamTable::new(config.id_space),
        })
    }

    fn build_url(&self, player_id: u64, season: i32, postseason: bool, cursor: Option<u64>) -> String {
        let mut url = format!(
            "{}/v1/stats?player_ids[]={}&seasons[]={}&postseason={}&per_page={}",
            self.base_url, player_id, season, postseason, self.per_page,
        );
        if let Some(cursor) = cursor {
            url.push_str(&format!("&cursor={}", cursor));
        }
        url
    }
}

/// Parse one `/v1/stats` page into records plus the next cursor.
pub fn parse_stats_page(
    json: &str,
    teams: &TeamTable,
) -> Result<(Vec<GameRecord>, Option<u64>), FetchError> {
    let page: StatsPage = serde_json::from_str(json)?;
    let records = page
        .data
        .into_iter()
        .map(|row| {
            let team_abbr = row.team.and_then(|t| {
                t.abbreviation
                    .filter(|a| !a.trim().is_empty())
                    .or_else(|| teams.abbr_for(t.id).map(str::to_string))
            });
            GameRecord {
                game_id: Some(row.game.id),
                game_date: row.game.date,
                postseason: row.game.postseason,
                home_team_id: row.game.home_team_id,
                home_team_abbr: row
                    .game
                    .home_team_id
                    .and_then(|id| teams.abbr_for(id))
                    .map(str::to_string),
                visitor_team_id: row.game.visitor_team_id,
                visitor_team_abbr: row
                    .game
                    .visitor_team_id
                    .and_then(|id| teams.abbr_for(id))
                    .map(str::to_string),
                team_abbr,
                min: row.min,
                stats: row.stats,
            }
        })
        .collect();
    Ok((records, page.meta.and_then(|m| m.next_cursor)))
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl GameLogProvider for BalldontlieFeed {
    async fn fetch_game_logs(
        &self,
        player_id: u64,
        season: i32,
        postseason: bool,
    ) -> Result<Vec<GameRecord>, FetchError> {
        let mut records = Vec::new();
        let mut cursor = None;

        for page in 0..self.max_pages {
            let url = self.build_url(player_id, season, postseason, cursor);
            let resp = self
                .client
                .get(&url)
                .header("Authorization", self.api_key.as_str())
                .send()
                .await
                .context("game log request failed")?;

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = retry_after(resp.headers());
                tracing::warn!(player_id, season, postseason, ?retry_after, "game log provider rate limited (429)");
                return Err(FetchError::RateLimited { retry_after });
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(FetchError::Http {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = resp.text().await.context("failed to read game log response")?;
            let (rows, next) = parse_stats_page(&body, &self.teams)?;
            tracing::debug!(player_id, season, postseason, page, rows = rows.len(), "fetched game log page");
            records.extend(rows);

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(records)
    }
}
