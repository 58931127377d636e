use super::teams::{same_abbr, TeamTable};
use crate::feed::types::GameRecord;
use std::fmt;

pub const UNKNOWN_OPPONENT: &str = "unknown";

/// Resolved opponent for one game. `Unknown` is a valid result: it keeps a
/// record out of head-to-head windows but not out of generic ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Opponent {
    Known(String),
    Unknown,
}

impl Opponent {
    pub fn label(&self) -> &str {
        match self {
            Opponent::Known(abbr) => abbr,
            Opponent::Unknown => UNKNOWN_OPPONENT,
        }
    }

    /// Exact match against a requested opponent. Never true for `Unknown`.
    pub fn is(&self, abbr: &str) -> bool {
        match self {
            Opponent::Known(known) => same_abbr(known, abbr),
            Opponent::Unknown => false,
        }
    }
}

impl fmt::Display for Opponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Home/visitor abbreviations for a record, filling gaps from the team table.
pub fn side_abbrs(record: &GameRecord, teams: &TeamTable) -> (Option<String>, Option<String>) {
    let side = |abbr: &Option<String>, id: Option<u32>| {
        abbr.as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_uppercase)
            .or_else(|| id.and_then(|id| teams.abbr_for(id)).map(str::to_string))
    };
    (
        side(&record.home_team_abbr, record.home_team_id),
        side(&record.visitor_team_abbr, record.visitor_team_id),
    )
}

/// Opponent of `team` in the game described by `record`.
///
/// Numeric ids are compared first when the team and both sides have them;
/// abbreviations are the fallback. Neither side matching gives `Unknown`.
pub fn resolve_opponent(team: &str, record: &GameRecord, teams: &TeamTable) -> Opponent {
    let (home_abbr, visitor_abbr) = side_abbrs(record, teams);
    let known = |abbr: Option<String>| abbr.map_or(Opponent::Unknown, Opponent::Known);

    if let (Some(team_id), Some(home_id), Some(visitor_id)) =
        (teams.id_for(team), record.home_team_id, record.visitor_team_id)
    {
        if team_id == home_id {
            return known(visitor_abbr);
        }
        if team_id == visitor_id {
            return known(home_abbr);
        }
    }

    match (home_abbr, visitor_abbr) {
        (Some(home), visitor) if same_abbr(&home, team) => known(visitor),
        (home, Some(visitor)) if same_abbr(&visitor, team) => known(home),
        _ => Opponent::Unknown,
    }
}
