use super::opponent::side_abbrs;
use super::season::{parse_game_date, season_of};
use super::teams::{canonical_abbr, same_abbr, TeamTable};
use crate::error::ResolveResult;
use crate::feed::types::{GameRecord, SeasonSlice};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Recorded-abbreviation confusions seen in upstream feeds, mapped to the
/// abbreviation the rest of the data uses.
const DEFAULT_TEAM_ALIASES: [(&str, &str); 9] = [
    ("PHO", "PHX"),
    ("GS", "GSW"),
    ("NO", "NOP"),
    ("SA", "SAS"),
    ("NY", "NYK"),
    ("UTAH", "UTA"),
    ("WSH", "WAS"),
    ("BRK", "BKN"),
    ("CHO", "CHA"),
];

/// Known corrective mappings for specific team confusions.
#[derive(Debug, Clone)]
pub struct TeamCorrections {
    aliases: HashMap<String, String>,
}

impl Default for TeamCorrections {
    fn default() -> Self {
        Self::new(
            DEFAULT_TEAM_ALIASES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string())),
        )
    }
}

impl TeamCorrections {
    pub fn new(aliases: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(from, to)| (from.trim().to_uppercase(), to.trim().to_uppercase()))
                .collect(),
        }
    }

    /// Built-in aliases with `extra` layered on top (extra wins on conflict).
    pub fn with_overrides(extra: &HashMap<String, String>) -> Self {
        let mut corrections = Self::default();
        for (from, to) in extra {
            corrections
                .aliases
                .insert(from.trim().to_uppercase(), to.trim().to_uppercase());
        }
        corrections
    }

    pub fn lookup(&self, recorded: &str) -> Option<&str> {
        self.aliases
            .get(&recorded.trim().to_uppercase())
            .map(String::as_str)
    }
}

/// A record that passed inclusion, with its corrected team carried
/// alongside the untouched original.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedRecord {
    pub record: GameRecord,
    pub date: NaiveDate,
    pub season: i32,
    pub team: String,
}

/// Minutes from a raw playing-time string. Unparsable or missing values
/// count as zero; they are a data defect, not invalid input.
pub fn parse_minutes(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };
    let minutes = match raw.split_once(':') {
        Some((m, s)) => {
            let m: f64 = m.trim().parse().unwrap_or(0.0);
            let s: f64 = s.trim().parse().unwrap_or(0.0);
            m + s / 60.0
        }
        None => raw.parse().unwrap_or(0.0),
    };
    if minutes.is_finite() && minutes > 0.0 {
        minutes
    } else {
        0.0
    }
}

/// A batch whose every row reports zero minutes has an unreliable
/// minutes column.
pub fn minutes_unreliable<'a>(records: impl IntoIterator<Item = &'a GameRecord>) -> bool {
    let mut seen = false;
    for record in records {
        if parse_minutes(record.min.as_deref()) > 0.0 {
            return false;
        }
        seen = true;
    }
    seen
}

fn played(record: &GameRecord, minutes_unreliable: bool) -> bool {
    let minutes = parse_minutes(record.min.as_deref());
    if minutes_unreliable {
        minutes > 0.0 || record.stats.has_core_activity()
    } else {
        minutes > 0.0
    }
}

fn normalize_abbr(raw: &str) -> String {
    canonical_abbr(raw)
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_uppercase())
}

/// Team a record really belongs to. The recorded team stands when it is
/// one of the game's sides, or when the sides are unknown. Otherwise a known
/// alias that lands on one of the sides wins, and the home side is the
/// last resort.
pub fn correct_team(
    recorded: &str,
    record: &GameRecord,
    teams: &TeamTable,
    corrections: &TeamCorrections,
) -> String {
    let recorded = normalize_abbr(recorded);
    let (home, visitor) = side_abbrs(record, teams);
    let is_side = |abbr: &str| {
        home.as_deref().is_some_and(|h| same_abbr(h, abbr))
            || visitor.as_deref().is_some_and(|v| same_abbr(v, abbr))
    };

    if (home.is_none() && visitor.is_none()) || is_side(recorded.as_str()) {
        return recorded;
    }

    if let Some(alias) = corrections.lookup(&recorded).filter(|a| is_side(*a)) {
        tracing::debug!(game_id = ?record.game_id, recorded = %recorded, corrected = alias, "team corrected by alias");
        return alias.to_string();
    }

    match home {
        Some(home) => {
            tracing::debug!(game_id = ?record.game_id, recorded = %recorded, corrected = %home, "team corrected to home side");
            home
        }
        None => recorded,
    }
}

/// Apply both corrective rules to one fetch batch.
///
/// `selected_team` stands in for the recorded team on rows that carry
/// none, which is the shape of a team's own game list.
pub fn sanitize_batch(
    records: &[GameRecord],
    selected_team: Option<&str>,
    teams: &TeamTable,
    corrections: &TeamCorrections,
) -> ResolveResult<Vec<SanitizedRecord>> {
    let rows: Vec<&GameRecord> = records.iter().collect();
    sanitize_rows(&rows, selected_team, teams, corrections)
}

fn sanitize_rows(
    records: &[&GameRecord],
    selected_team: Option<&str>,
    teams: &TeamTable,
    corrections: &TeamCorrections,
) -> ResolveResult<Vec<SanitizedRecord>> {
    let unreliable = minutes_unreliable(records.iter().copied());
    let mut out = Vec::with_capacity(records.len());

    for &record in records {
        let date = parse_game_date(&record.game_date)?;
        if !played(record, unreliable) {
            continue;
        }
        let recorded = record
            .team_abbr
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(selected_team)
            .unwrap_or_default();
        let team = correct_team(recorded, record, teams, corrections);
        out.push(SanitizedRecord {
            record: record.clone(),
            date,
            season: season_of(date),
            team,
        });
    }

    tracing::debug!(
        input = records.len(),
        kept = out.len(),
        minutes_unreliable = unreliable,
        "sanitized batch"
    );
    Ok(out)
}

/// Sanitize a flat row list. Batches are formed by (season year,
/// postseason flag), in first-seen order.
pub fn sanitize(
    records: &[GameRecord],
    selected_team: Option<&str>,
    teams: &TeamTable,
    corrections: &TeamCorrections,
) -> ResolveResult<Vec<SanitizedRecord>> {
    let mut order: Vec<(i32, bool)> = Vec::new();
    let mut batches: HashMap<(i32, bool), Vec<&GameRecord>> = HashMap::new();
    for record in records {
        let key = (season_of(parse_game_date(&record.game_date)?), record.postseason);
        batches
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(record);
    }

    let mut out = Vec::with_capacity(records.len());
    for key in order {
        if let Some(batch) = batches.get(&key) {
            out.extend(sanitize_rows(batch, selected_team, teams, corrections)?);
        }
    }
    Ok(out)
}

/// Sanitize aggregator output, one batch per slice.
pub fn sanitize_slices(
    slices: &[SeasonSlice],
    selected_team: Option<&str>,
    teams: &TeamTable,
    corrections: &TeamCorrections,
) -> ResolveResult<Vec<SanitizedRecord>> {
    let mut out = Vec::new();
    for slice in slices {
        out.extend(sanitize_batch(&slice.records, selected_team, teams, corrections)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::teams::IdSpace;
    use crate::error::ResolveError;

    fn row(id: u64, min: &str, pts: u32) -> GameRecord {
        let mut rec = GameRecord {
            game_id: Some(id),
            game_date: "2024-11-01".to_string(),
            home_team_abbr: Some("BOS".to_string()),
            visitor_team_abbr: Some("LAL".to_string()),
            team_abbr: Some("LAL".to_string()),
            min: Some(min.to_string()),
            ..Default::default()
        };
        rec.stats.pts = pts;
        rec
    }

    fn run(records: &[GameRecord]) -> Vec<SanitizedRecord> {
        sanitize_batch(
            records,
            None,
            &TeamTable::new(IdSpace::Balldontlie),
            &TeamCorrections::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_minutes_formats() {
        assert_eq!(parse_minutes(Some("32:30")), 32.5);
        assert_eq!(parse_minutes(Some("32")), 32.0);
        assert_eq!(parse_minutes(Some("31.5")), 31.5);
        assert_eq!(parse_minutes(Some("00")), 0.0);
        assert_eq!(parse_minutes(Some("0:00")), 0.0);
        assert_eq!(parse_minutes(Some("")), 0.0);
        assert_eq!(parse_minutes(Some("DNP")), 0.0);
        assert_eq!(parse_minutes(None), 0.0);
    }

    #[test]
    fn test_minutes_unreliable_over_borrowed_rows() {
        let rows = [row(1, "0", 3), row(2, "0:00", 0), row(3, "", 5)];
        assert!(minutes_unreliable(&rows));
        assert!(minutes_unreliable(rows.iter().filter(|r| r.stats.pts > 0)));
        let mixed = [row(1, "0", 3), row(2, "12:00", 8)];
        assert!(!minutes_unreliable(mixed.iter()));
        assert!(!minutes_unreliable(std::iter::empty::<&GameRecord>()));
    }

    #[test]
    fn test_all_zero_minutes_keeps_rows_with_stats() {
        let batch = vec![row(1, "0", 0), row(2, "0", 12), row(3, "", 0)];
        let kept = run(&batch);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].record.game_id, Some(2));
    }

    #[test]
    fn test_mixed_minutes_uses_normal_rule() {
        let batch = vec![row(1, "30:00", 20), row(2, "0", 12), row(3, "12:10", 0)];
        let kept: Vec<_> = run(&batch).into_iter().map(|s| s.record.game_id).collect();
        assert_eq!(kept, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_core_activity_includes_shot_attempts() {
        let mut only_fga = row(1, "0", 0);
        only_fga.stats.fga = 2;
        let mut only_steal = row(2, "0", 0);
        only_steal.stats.stl = 1;
        let kept = run(&[only_fga, only_steal]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].record.game_id, Some(1));
    }

    #[test]
    fn test_misattributed_team_falls_back_to_home() {
        let mut rec = row(1, "20:00", 5);
        rec.team_abbr = Some("DEN".to_string());
        let kept = run(&[rec.clone()]);
        assert_eq!(kept[0].team, "BOS");
        // the original row is untouched
        assert_eq!(kept[0].record.team_abbr.as_deref(), Some("DEN"));
    }

    #[test]
    fn test_alias_correction_preferred_over_home() {
        let mut rec = row(1, "20:00", 5);
        rec.home_team_abbr = Some("NYK".to_string());
        rec.visitor_team_abbr = Some("PHX".to_string());
        rec.team_abbr = Some("PHO".to_string());
        assert_eq!(run(&[rec])[0].team, "PHX");
    }

    #[test]
    fn test_alias_ignored_when_not_a_side() {
        let mut rec = row(1, "20:00", 5);
        rec.team_abbr = Some("PHO".to_string());
        assert_eq!(run(&[rec])[0].team, "BOS");
    }

    #[test]
    fn test_full_name_recorded_team_is_normalized() {
        let mut rec = row(1, "20:00", 5);
        rec.team_abbr = Some("Los Angeles Lakers".to_string());
        assert_eq!(run(&[rec])[0].team, "LAL");
    }

    #[test]
    fn test_selected_team_fills_missing_recorded_team() {
        let mut rec = row(1, "240:00", 110);
        rec.team_abbr = None;
        let kept = sanitize_batch(
            &[rec],
            Some("LAL"),
            &TeamTable::default(),
            &TeamCorrections::default(),
        )
        .unwrap();
        assert_eq!(kept[0].team, "LAL");
    }

    #[test]
    fn test_flat_input_batches_by_season() {
        // prior season: all zero minutes, one row with stats survives
        let mut old_a = row(1, "0", 0);
        old_a.game_date = "2023-12-01".to_string();
        let mut old_b = row(2, "0", 9);
        old_b.game_date = "2024-01-01".to_string();
        // current season has real minutes, so its zero-minute row is dropped
        let cur_a = row(3, "25:00", 10);
        let cur_b = row(4, "0", 7);

        let kept: Vec<_> = sanitize(
            &[old_a, cur_a, old_b, cur_b],
            None,
            &TeamTable::default(),
            &TeamCorrections::default(),
        )
        .unwrap()
        .into_iter()
        .map(|s| s.record.game_id)
        .collect();
        assert_eq!(kept, vec![Some(2), Some(3)]);
    }

    #[test]
    fn test_invalid_date_is_an_error() {
        let mut rec = row(1, "20:00", 5);
        rec.game_date = "yesterday".to_string();
        let err = sanitize_batch(&[rec], None, &TeamTable::default(), &TeamCorrections::default());
        assert_eq!(err, Err(ResolveError::InvalidDate("yesterday".to_string())));
    }

    #[test]
    fn test_overrides_layer_on_defaults() {
        let mut extra = HashMap::new();
        extra.insert("lak".to_string(), "lal".to_string());
        let corrections = TeamCorrections::with_overrides(&extra);
        assert_eq!(corrections.lookup("LAK"), Some("LAL"));
        assert_eq!(corrections.lookup("pho"), Some("PHX"));
    }
}
