use super::opponent::{resolve_opponent, side_abbrs, Opponent};
use super::sanitizer::SanitizedRecord;
use super::teams::{same_abbr, TeamTable};
use crate::feed::types::GameRecord;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Most recent meetings kept for a head-to-head window.
pub const HEAD_TO_HEAD_LIMIT: usize = 6;

/// Requested analysis range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowSpec {
    LastN(usize),
    HeadToHead,
    ThisSeason,
    LastSeason,
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowSpec::LastN(n) => write!(f, "last:{}", n),
            WindowSpec::HeadToHead => f.write_str("h2h"),
            WindowSpec::ThisSeason => f.write_str("season"),
            WindowSpec::LastSeason => f.write_str("last-season"),
        }
    }
}

impl FromStr for WindowSpec {
    type Err = anyhow::Error;

    /// Accepts `last:10`, `l10`, `last10`, `h2h`, `season`, `last-season`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "h2h" | "head-to-head" => return Ok(WindowSpec::HeadToHead),
            "season" | "this-season" => return Ok(WindowSpec::ThisSeason),
            "last-season" | "prev-season" => return Ok(WindowSpec::LastSeason),
            _ => {}
        }
        let count = lower
            .strip_prefix("last:")
            .or_else(|| lower.strip_prefix("last"))
            .or_else(|| lower.strip_prefix('l'))
            .and_then(|n| n.parse::<usize>().ok());
        match count {
            Some(n) => Ok(WindowSpec::LastN(n)),
            None => anyhow::bail!("unrecognized window: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Home,
    Away,
}

impl FromStr for Venue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" => Ok(Venue::Home),
            "away" | "road" => Ok(Venue::Away),
            other => anyhow::bail!("unrecognized venue: {}", other),
        }
    }
}

/// Caller-side constraints applied before the window rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterContext {
    pub selected_team: Option<String>,
    /// Explicit opponent; also the head-to-head target.
    pub opponent: Option<String>,
    pub venue: Option<Venue>,
    /// Carried for downstream consumers; not applied here.
    pub teammate_id: Option<u64>,
}

impl FilterContext {
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.selected_team = Some(team.into());
        self
    }

    pub fn with_opponent(mut self, opponent: impl Into<String>) -> Self {
        self.opponent = Some(opponent.into().trim().to_uppercase());
        self
    }

    pub fn with_venue(mut self, venue: Venue) -> Self {
        self.venue = Some(venue);
        self
    }

    pub fn with_teammate(mut self, teammate_id: u64) -> Self {
        self.teammate_id = Some(teammate_id);
        self
    }

    fn opponent(&self) -> Option<&str> {
        self.opponent.as_deref().map(str::trim).filter(|o| !o.is_empty())
    }
}

/// A sanitized record with its opponent and venue resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub record: GameRecord,
    pub date: NaiveDate,
    pub season: i32,
    pub team: String,
    pub opponent: Opponent,
    pub is_home: bool,
}

impl Candidate {
    pub fn resolve(sanitized: SanitizedRecord, teams: &TeamTable) -> Self {
        let opponent = resolve_opponent(&sanitized.team, &sanitized.record, teams);
        let is_home = is_home_side(&sanitized.team, &sanitized.record, teams);
        Self {
            record: sanitized.record,
            date: sanitized.date,
            season: sanitized.season,
            team: sanitized.team,
            opponent,
            is_home,
        }
    }
}

fn is_home_side(team: &str, record: &GameRecord, teams: &TeamTable) -> bool {
    if let (Some(team_id), Some(home_id)) = (teams.id_for(team), record.home_team_id) {
        if team_id == home_id {
            return true;
        }
    }
    side_abbrs(record, teams)
        .0
        .is_some_and(|home| same_abbr(&home, team))
}

/// Newest first; game id breaks same-day ties so the order is total for
/// keyed records.
pub(crate) fn sort_newest_first(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.record.game_id.cmp(&a.record.game_id))
    });
}

/// Apply opponent and venue constraints, then the window rule.
///
/// The result is newest first and may still contain duplicate game ids.
pub fn select(
    pool: Vec<Candidate>,
    window: WindowSpec,
    ctx: &FilterContext,
    current_season: i32,
    head_to_head_limit: usize,
) -> Vec<Candidate> {
    let input = pool.len();
    let mut pool: Vec<Candidate> = pool
        .into_iter()
        .filter(|c| ctx.opponent().is_none_or(|opp| c.opponent.is(opp)))
        .filter(|c| match ctx.venue {
            Some(Venue::Home) => c.is_home,
            Some(Venue::Away) => !c.is_home,
            None => true,
        })
        .collect();
    let filtered = pool.len();

    let selected = match window {
        WindowSpec::LastN(n) => backfill(pool, n, current_season),
        WindowSpec::HeadToHead => match ctx.opponent() {
            Some(opp) => {
                pool.retain(|c| c.opponent.is(opp));
                sort_newest_first(&mut pool);
                pool.truncate(head_to_head_limit);
                pool
            }
            None => Vec::new(),
        },
        WindowSpec::ThisSeason => season_only(pool, current_season),
        WindowSpec::LastSeason => season_only(pool, current_season - 1),
    };

    tracing::debug!(
        %window,
        input,
        filtered,
        selected = selected.len(),
        "window selected"
    );
    selected
}

/// Rolling last-N: the current season is exhausted before any older game
/// is taken, then the most recent remaining games fill the gap.
fn backfill(pool: Vec<Candidate>, n: usize, current_season: i32) -> Vec<Candidate> {
    let (mut current, mut older): (Vec<_>, Vec<_>) =
        pool.into_iter().partition(|c| c.season == current_season);
    sort_newest_first(&mut current);
    sort_newest_first(&mut older);

    current.truncate(n);
    let missing = n - current.len();
    if missing > 0 && !older.is_empty() {
        tracing::debug!(current = current.len(), missing, "backfilling from prior seasons");
    }
    current.extend(older.into_iter().take(missing));
    current
}

fn season_only(mut pool: Vec<Candidate>, season: i32) -> Vec<Candidate> {
    pool.retain(|c| c.season == season);
    sort_newest_first(&mut pool);
    pool
}
