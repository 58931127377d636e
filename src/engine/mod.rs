pub mod opponent;
pub mod sanitizer;
pub mod season;
pub mod sequencer;
pub mod series;
pub mod teams;
pub mod window;

pub use opponent::{Opponent, UNKNOWN_OPPONENT};
pub use sanitizer::{SanitizedRecord, TeamCorrections};
pub use season::{season_label, season_of};
pub use sequencer::ResolvedRecord;
pub use series::{BoxScoreStats, DisplayTuple, StatValueResolver};
pub use teams::{IdSpace, TeamTable};
pub use window::{Candidate, FilterContext, Venue, WindowSpec, HEAD_TO_HEAD_LIMIT};

use crate::config::Config;
use crate::error::ResolveResult;
use crate::feed::types::{GameRecord, SeasonSlice};

/// Sanitize -> select -> dedupe -> sequence -> materialize.
///
/// Synchronous and pure over the rows it is handed: no I/O, no shared state.
#[derive(Debug, Clone)]
pub struct WindowResolver {
    teams: TeamTable,
    corrections: TeamCorrections,
    head_to_head_limit: usize,
}

impl Default for WindowResolver {
    fn default() -> Self {
        Self::new(TeamTable::default(), TeamCorrections::default())
    }
}

impl WindowResolver {
    pub fn new(teams: TeamTable, corrections: TeamCorrections) -> Self {
        Self {
            teams,
            corrections,
            head_to_head_limit: HEAD_TO_HEAD_LIMIT,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut resolver = Self::new(
            TeamTable::new(config.provider.id_space),
            TeamCorrections::with_overrides(&config.sanitizer.team_aliases),
        );
        resolver.head_to_head_limit = config.window.head_to_head_limit.min(HEAD_TO_HEAD_LIMIT);
        resolver
    }

    pub fn teams(&self) -> &TeamTable {
        &self.teams
    }

    /// Chronological, deduplicated records for a window over a flat row list.
    pub fn resolve_sequence(
        &self,
        raw: &[GameRecord],
        window: WindowSpec,
        ctx: &FilterContext,
        current_season: i32,
    ) -> ResolveResult<Vec<ResolvedRecord>> {
        let sanitized =
            sanitizer::sanitize(raw, ctx.selected_team.as_deref(), &self.teams, &self.corrections)?;
        Ok(self.finish(sanitized, window, ctx, current_season))
    }

    /// Same as [`resolve_sequence`](Self::resolve_sequence), batching by fetch slice.
    pub fn resolve_slices_sequence(
        &self,
        slices: &[SeasonSlice],
        window: WindowSpec,
        ctx: &FilterContext,
        current_season: i32,
    ) -> ResolveResult<Vec<ResolvedRecord>> {
        let sanitized = sanitizer::sanitize_slices(
            slices,
            ctx.selected_team.as_deref(),
            &self.teams,
            &self.corrections,
        )?;
        Ok(self.finish(sanitized, window, ctx, current_season))
    }

    /// Chart points for a window.
    pub fn resolve_window(
        &self,
        raw: &[GameRecord],
        window: WindowSpec,
        ctx: &FilterContext,
        current_season: i32,
        metric: &str,
        stats: &dyn StatValueResolver,
    ) -> ResolveResult<Vec<DisplayTuple>> {
        let records = self.resolve_sequence(raw, window, ctx, current_season)?;
        Ok(series::materialize(&records, metric, stats))
    }

    fn finish(
        &self,
        sanitized: Vec<SanitizedRecord>,
        window: WindowSpec,
        ctx: &FilterContext,
        current_season: i32,
    ) -> Vec<ResolvedRecord> {
        if let Some(teammate) = ctx.teammate_id {
            tracing::trace!(teammate, "teammate constraint passed through");
        }
        let pool: Vec<Candidate> = sanitized
            .into_iter()
            .map(|s| Candidate::resolve(s, &self.teams))
            .collect();
        // Repeated rows must not hold window slots; the second pass is a no-op.
        let pool = sequencer::dedupe(pool);
        let selected = window::select(pool, window, ctx, current_season, self.head_to_head_limit);
        let records = sequencer::sequence(sequencer::dedupe(selected));
        tracing::debug!(
            %window,
            season = %season_label(current_season),
            count = records.len(),
            "window resolved"
        );
        records
    }
}
