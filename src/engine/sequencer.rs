use super::opponent::Opponent;
use super::window::{sort_newest_first, Candidate};
use crate::feed::types::GameRecord;
use chrono::NaiveDate;
use std::collections::HashSet;

/// A record in its final chronological position.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub record: GameRecord,
    pub date: NaiveDate,
    pub season: i32,
    pub team: String,
    pub opponent: Opponent,
    pub is_home: bool,
    /// Game id, or a synthetic key when the row has none. Unique within a sequence.
    pub key: String,
    /// 1-based position, oldest first.
    pub sequence: usize,
}

/// Drop duplicate game ids and return the survivors oldest first.
///
/// Candidates are walked newest first and the first occurrence of each id
/// wins. Rows without a game id are never treated as duplicates.
pub fn dedupe(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    sort_newest_first(&mut candidates);

    let mut seen = HashSet::new();
    let before = candidates.len();
    candidates.retain(|c| c.record.game_id.is_none_or(|id| seen.insert(id)));
    if candidates.len() < before {
        tracing::debug!(dropped = before - candidates.len(), "removed duplicate games");
    }

    // Stable: same-day rows without ids keep their relative order.
    candidates.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.record.game_id.cmp(&b.record.game_id))
    });
    candidates
}

fn stable_key(candidate: &Candidate, sequence: usize) -> String {
    match candidate.record.game_id {
        Some(id) => id.to_string(),
        None => format!("synthetic-{}-{}", candidate.opponent.label(), sequence),
    }
}

/// Number the (already chronological) candidates 1..k and give each a stable key.
pub fn sequence(candidates: Vec<Candidate>) -> Vec<ResolvedRecord> {
    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let sequence = i + 1;
            let key = stable_key(&c, sequence);
            ResolvedRecord {
                record: c.record,
                date: c.date,
                season: c.season,
                team: c.team,
                opponent: c.opponent,
                is_home: c.is_home,
                key,
                sequence,
            }
        })
        .collect()
}
