//! Normalized internal types consumed by the engine (provider-agnostic),
//! plus the provider wire types they are built from.

use serde::{Deserialize, Deserializer, Serialize};

/// One player's box-score row for one game, as delivered by a provider.
///
/// Immutable for the duration of a pipeline run. The recorded team may be
/// wrong and the minutes string may be unreliable; the sanitizer deals with
/// both without touching the original row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(default)]
    pub game_id: Option<u64>,
    pub game_date: String,
    #[serde(default)]
    pub postseason: bool,
    #[serde(default)]
    pub home_team_id: Option<u32>,
    #[serde(default)]
    pub home_team_abbr: Option<String>,
    #[serde(default)]
    pub visitor_team_id: Option<u32>,
    #[serde(default)]
    pub visitor_team_abbr: Option<String>,
    /// Team the provider attributed the row to.
    #[serde(default)]
    pub team_abbr: Option<String>,
    /// Raw playing time: "32:15", "32", "31.5", "" or missing.
    #[serde(default)]
    pub min: Option<String>,
    #[serde(flatten)]
    pub stats: BoxScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoxScore {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub pts: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub reb: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub ast: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub stl: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub blk: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub turnover: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fgm: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fga: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fg3m: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fg3a: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub ftm: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub fta: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub oreb: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub dreb: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub pf: u32,
}

impl BoxScore {
    /// True when any core counting stat shows the player was on the floor.
    pub fn has_core_activity(&self) -> bool {
        self.pts > 0 || self.reb > 0 || self.ast > 0 || self.fgm > 0 || self.fga > 0
    }
}

/// Providers send `null` for stats that were never recorded.
fn zero_if_null<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

/// One season/postseason fetch result. This is the batch unit for the
/// sanitizer's zero-minutes rule.
#[derive(Debug, Clone, Default)]
pub struct SeasonSlice {
    pub season: i32,
    pub postseason: bool,
    pub records: Vec<GameRecord>,
    /// Set when the fetch failed and the slice was replaced by an empty one.
    pub degraded: Option<String>,
}

impl SeasonSlice {
    pub fn new(season: i32, postseason: bool, records: Vec<GameRecord>) -> Self {
        Self {
            season,
            postseason,
            records,
            degraded: None,
        }
    }

    pub fn degraded(season: i32, postseason: bool, reason: String) -> Self {
        Self {
            season,
            postseason,
            records: Vec::new(),
            degraded: Some(reason),
        }
    }
}

// ── balldontlie /v1/stats wire types ─────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatsPage {
    #[serde(default)]
    pub data: Vec<StatRow>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub next_cursor: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct StatRow {
    #[serde(default)]
    pub min: Option<String>,
    #[serde(flatten)]
    pub stats: BoxScore,
    #[serde(default)]
    pub team: Option<StatTeam>,
    pub game: StatGame,
}

#[derive(Debug, Deserialize)]
pub struct StatTeam {
    pub id: u32,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatGame {
    pub id: u64,
    pub date: String,
    #[serde(default)]
    pub postseason: bool,
    #[serde(default)]
    pub home_team_id: Option<u32>,
    #[serde(default)]
    pub visitor_team_id: Option<u32>,
}
