use super::sanitizer::parse_minutes;
use super::sequencer::ResolvedRecord;
use crate::feed::types::GameRecord;
use serde::Serialize;

/// Turns a record into the single number charted for a metric.
pub trait StatValueResolver {
    fn resolve(&self, record: &GameRecord, metric: &str) -> Option<f64>;
}

impl<F> StatValueResolver for F
where
    F: Fn(&GameRecord, &str) -> Option<f64>,
{
    fn resolve(&self, record: &GameRecord, metric: &str) -> Option<f64> {
        self(record, metric)
    }
}

/// Box-score resolver: simple fields plus `a+b+c` composites and the usual
/// prop shorthands (`pra`, `pr`, `pa`, `ra`, `sb`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxScoreStats;

impl BoxScoreStats {
    fn field(record: &GameRecord, key: &str) -> Option<f64> {
        let s = &record.stats;
        let v = match key {
            "pts" | "points" => s.pts,
            "reb" | "rebounds" => s.reb,
            "ast" | "assists" => s.ast,
            "stl" | "steals" => s.stl,
            "blk" | "blocks" => s.blk,
            "turnover" | "tov" | "to" => s.turnover,
            "fgm" => s.fgm,
            "fga" => s.fga,
            "fg3m" | "3pm" | "threes" => s.fg3m,
            "fg3a" | "3pa" => s.fg3a,
            "ftm" => s.ftm,
            "fta" => s.fta,
            "oreb" => s.oreb,
            "dreb" => s.dreb,
            "pf" | "fouls" => s.pf,
            "min" | "minutes" => return Some(parse_minutes(record.min.as_deref())),
            _ => return None,
        };
        Some(v as f64)
    }
}

impl StatValueResolver for BoxScoreStats {
    fn resolve(&self, record: &GameRecord, metric: &str) -> Option<f64> {
        let metric = metric.trim().to_lowercase();
        let expanded = match metric.as_str() {
            "pra" => "pts+reb+ast",
            "pr" => "pts+reb",
            "pa" => "pts+ast",
            "ra" => "reb+ast",
            "sb" | "stocks" => "stl+blk",
            other => other,
        };
        expanded
            .split('+')
            .map(|part| Self::field(record, part.trim()))
            .sum()
    }
}

/// One chart point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTuple {
    pub index: usize,
    pub opponent: String,
    pub date: String,
    pub key: String,
    pub value: f64,
}

/// Map the final sequence to chart points. A metric the resolver can't
/// produce charts as 0.
pub fn materialize(
    records: &[ResolvedRecord],
    metric: &str,
    resolver: &dyn StatValueResolver,
) -> Vec<DisplayTuple> {
    records
        .iter()
        .map(|r| DisplayTuple {
            index: r.sequence,
            opponent: r.opponent.label().to_string(),
            date: r.date.format("%b %-d").to_string(),
            key: r.key.clone(),
            value: resolver.resolve(&r.record, metric).unwrap_or(0.0),
        })
        .collect()
}
