use crate::engine::series::{self, DisplayTuple, StatValueResolver};
use crate::engine::{FilterContext, ResolvedRecord, WindowResolver, WindowSpec};
use crate::error::ResolveResult;
use crate::feed::aggregator::{parse_player_id, SeasonAggregator};
use crate::feed::types::SeasonSlice;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Identity of one load request. A background merge only lands if the
/// session's current tag still equals the tag it was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTag {
    pub generation: u64,
    pub player_id: u64,
    pub window: WindowSpec,
}

/// What the session currently holds; published through a watch channel.
#[derive(Debug, Clone, Default)]
pub struct SeriesState {
    pub tag: Option<RequestTag>,
    pub current_season: i32,
    pub slices: Vec<SeasonSlice>,
    pub backfill_pending: bool,
}

impl SeriesState {
    /// Resolve the held slices under the tagged window.
    pub fn resolve_sequence(
        &self,
        resolver: &WindowResolver,
        ctx: &FilterContext,
    ) -> ResolveResult<Vec<ResolvedRecord>> {
        match &self.tag {
            Some(tag) => resolver.resolve_slices_sequence(&self.slices, tag.window, ctx, self.current_season),
            None => Ok(Vec::new()),
        }
    }

    pub fn resolve_window(
        &self,
        resolver: &WindowResolver,
        ctx: &FilterContext,
        metric: &str,
        stats: &dyn StatValueResolver,
    ) -> ResolveResult<Vec<DisplayTuple>> {
        let records = self.resolve_sequence(resolver, ctx)?;
        Ok(series::materialize(&records, metric, stats))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// The session moved on to another request; the result was dropped.
    Stale,
}

/// Returned by [`GameLogSession::load`].
pub struct LoadHandle {
    pub tag: RequestTag,
    /// Prior-season merge still in flight, if one was started.
    pub backfill: Option<JoinHandle<MergeOutcome>>,
}

/// Loads game logs for whatever player/window the caller is looking at.
///
/// Current season lands first; for short `LastN` windows the prior season is
/// fetched in the background and merged only if the request is still current.
pub struct GameLogSession {
    aggregator: SeasonAggregator,
    resolver: WindowResolver,
    generation: AtomicU64,
    state_tx: watch::Sender<SeriesState>,
}

impl GameLogSession {
    pub fn new(aggregator: SeasonAggregator, resolver: WindowResolver) -> Arc<Self> {
        let (state_tx, _) = watch::channel(SeriesState::default());
        Arc::new(Self {
            aggregator,
            resolver,
            generation: AtomicU64::new(0),
            state_tx,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<SeriesState> {
        self.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> SeriesState {
        self.state_tx.borrow().clone()
    }

    /// Start a new request. Anything still in flight for an older tag
    /// becomes stale.
    pub fn begin(&self, player_id: u64, window: WindowSpec, current_season: i32) -> RequestTag {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tag = RequestTag {
            generation,
            player_id,
            window,
        };
        self.state_tx.send_replace(SeriesState {
            tag: Some(tag.clone()),
            current_season,
            slices: Vec::new(),
            backfill_pending: false,
        });
        tracing::debug!(generation, player_id, %window, current_season, "request started");
        tag
    }

    /// Merge slices fetched for `tag`. Dropped if the session has moved on.
    pub fn apply(&self, tag: &RequestTag, slices: Vec<SeasonSlice>, backfill_pending: bool) -> MergeOutcome {
        let mut outcome = MergeOutcome::Stale;
        self.state_tx.send_if_modified(|state| {
            if state.tag.as_ref() != Some(tag) {
                return false;
            }
            state.slices.extend(slices);
            state.backfill_pending = backfill_pending;
            outcome = MergeOutcome::Applied;
            true
        });
        if outcome == MergeOutcome::Stale {
            tracing::warn!(generation = tag.generation, player_id = tag.player_id, "discarding stale game log result");
        }
        outcome
    }

    /// Current-season games that qualify for `window` under `ctx`, after
    /// sanitizing and deduplication.
    fn qualifying_current(
        &self,
        current: &[SeasonSlice],
        window: WindowSpec,
        ctx: &FilterContext,
        current_season: i32,
    ) -> ResolveResult<usize> {
        let records = self
            .resolver
            .resolve_slices_sequence(current, window, ctx, current_season)?;
        Ok(records.iter().filter(|r| r.season == current_season).count())
    }

    /// Fetch the current season, publish it, then bring in the prior season:
    /// in the background for `LastN` windows the current season cannot fill
    /// under `ctx`, inline for windows that always need it.
    pub async fn load(
        self: &Arc<Self>,
        player_id: &str,
        window: WindowSpec,
        ctx: &FilterContext,
        current_season: i32,
    ) -> ResolveResult<LoadHandle> {
        let player_id = parse_player_id(player_id)?;
        let tag = self.begin(player_id, window, current_season);

        let current = self.aggregator.fetch_season(player_id, current_season).await;
        let prior_season = current_season - 1;

        match window {
            WindowSpec::ThisSeason => {
                self.apply(&tag, current, false);
                Ok(LoadHandle { tag, backfill: None })
            }
            WindowSpec::LastN(n) => {
                let qualifying = self.qualifying_current(&current, window, ctx, current_season)?;
                if qualifying >= n {
                    self.apply(&tag, current, false);
                    return Ok(LoadHandle { tag, backfill: None });
                }
                tracing::debug!(player_id, qualifying, n, "current season short, backfilling");
                if self.apply(&tag, current, true) == MergeOutcome::Stale {
                    return Ok(LoadHandle { tag, backfill: None });
                }
                let session = Arc::clone(self);
                let bg_tag = tag.clone();
                let handle = tokio::spawn(async move {
                    let prior = session.aggregator.fetch_season(player_id, prior_season).await;
                    session.apply(&bg_tag, prior, false)
                });
                Ok(LoadHandle { tag, backfill: Some(handle) })
            }
            WindowSpec::HeadToHead | WindowSpec::LastSeason => {
                let prior = self.aggregator.fetch_season(player_id, prior_season).await;
                let mut slices = current;
                slices.extend(prior);
                self.apply(&tag, slices, false);
                Ok(LoadHandle { tag, backfill: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::GameRecord;
    use crate::feed::{FetchError, GameLogProvider};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Semaphore;

    const CURRENT: i32 = 2024;

    /// Two played current-season games per player; prior-season fetches
    /// block on a per-player gate.
    struct GatedProvider {
        gates: HashMap<u64, Arc<Semaphore>>,
    }

    #[async_trait]
    impl GameLogProvider for GatedProvider {
        async fn fetch_game_logs(
            &self,
            player_id: u64,
            season: i32,
            postseason: bool,
        ) -> Result<Vec<GameRecord>, FetchError> {
            if postseason {
                return Ok(Vec::new());
            }
            if season < CURRENT {
                if let Some(gate) = self.gates.get(&player_id) {
                    let _permit = gate.acquire().await.expect("gate closed");
                }
            }
            Ok((1..=2)
                .map(|i| GameRecord {
                    game_id: Some(player_id * 1_000_000 + season as u64 * 10 + i),
                    game_date: format!("{}-12-0{}", season, i),
                    home_team_abbr: Some("BOS".to_string()),
                    visitor_team_abbr: Some("LAL".to_string()),
                    team_abbr: Some("LAL".to_string()),
                    min: Some("30:00".to_string()),
                    ..Default::default()
                })
                .collect())
        }
    }

    fn session(gated: &[u64]) -> (Arc<GameLogSession>, HashMap<u64, Arc<Semaphore>>) {
        let gates: HashMap<u64, Arc<Semaphore>> =
            gated.iter().map(|id| (*id, Arc::new(Semaphore::new(0)))).collect();
        let provider = Arc::new(GatedProvider { gates: gates.clone() });
        (GameLogSession::new(SeasonAggregator::new(provider), WindowResolver::default()), gates)
    }

    #[tokio::test]
    async fn test_short_last_n_backfills_in_background() {
        let (session, gates) = session(&[1]);
        let handle = session.load("1", WindowSpec::LastN(4), &FilterContext::default(), CURRENT).await.unwrap();

        let state = session.snapshot();
        assert!(state.backfill_pending);
        assert_eq!(state.slices.iter().map(|s| s.records.len()).sum::<usize>(), 2);

        gates[&1].add_permits(2);
        let outcome = handle.backfill.expect("backfill spawned").await.unwrap();
        assert_eq!(outcome, MergeOutcome::Applied);

        let state = session.snapshot();
        assert!(!state.backfill_pending);
        let records = state
            .resolve_sequence(&WindowResolver::default(), &FilterContext::default())
            .unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[tokio::test]
    async fn test_stale_background_merge_is_discarded() {
        let (session, gates) = session(&[1, 2]);
        let first = session.load("1", WindowSpec::LastN(10), &FilterContext::default(), CURRENT).await.unwrap();
        let second = session.load("2", WindowSpec::LastN(10), &FilterContext::default(), CURRENT).await.unwrap();

        // player 1's prior season arrives after the user moved to player 2
        gates[&1].add_permits(2);
        let outcome = first.backfill.unwrap().await.unwrap();
        assert_eq!(outcome, MergeOutcome::Stale);

        let state = session.snapshot();
        assert_eq!(state.tag.as_ref(), Some(&second.tag));
        assert!(state
            .slices
            .iter()
            .flat_map(|s| &s.records)
            .all(|r| r.game_id.is_some_and(|id| id / 1_000_000 == 2)));

        gates[&2].add_permits(2);
        assert_eq!(second.backfill.unwrap().await.unwrap(), MergeOutcome::Applied);
        assert_eq!(session.snapshot().slices.iter().map(|s| s.records.len()).sum::<usize>(), 4);
    }

    #[tokio::test]
    async fn test_same_player_new_window_invalidates() {
        let (session, gates) = session(&[1]);
        let first = session.load("1", WindowSpec::LastN(10), &FilterContext::default(), CURRENT).await.unwrap();
        let second = session.load("1", WindowSpec::ThisSeason, &FilterContext::default(), CURRENT).await.unwrap();
        assert_ne!(first.tag, second.tag);
        assert!(second.backfill.is_none());

        gates[&1].add_permits(4);
        assert_eq!(first.backfill.unwrap().await.unwrap(), MergeOutcome::Stale);
        assert_eq!(session.snapshot().slices.iter().map(|s| s.records.len()).sum::<usize>(), 2);
    }

    /// 12 current-season games, only the first 2 at home, and 20 prior-season
    /// home games.
    struct VenueSplitProvider;

    #[async_trait]
    impl GameLogProvider for VenueSplitProvider {
        async fn fetch_game_logs(
            &self,
            _player_id: u64,
            season: i32,
            postseason: bool,
        ) -> Result<Vec<GameRecord>, FetchError> {
            if postseason {
                return Ok(Vec::new());
            }
            let (count, home_games) = if season == CURRENT { (12, 2) } else { (20, 20) };
            Ok((0..count)
                .map(|i| {
                    let (home, visitor) = if i < home_games { ("LAL", "BOS") } else { ("BOS", "LAL") };
                    GameRecord {
                        game_id: Some(season as u64 * 100 + i),
                        game_date: format!("{}-12-{:02}", season, i + 1),
                        home_team_abbr: Some(home.to_string()),
                        visitor_team_abbr: Some(visitor.to_string()),
                        team_abbr: Some("LAL".to_string()),
                        min: Some("30:00".to_string()),
                        ..Default::default()
                    }
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_venue_filter_drives_backfill_decision() {
        let session = GameLogSession::new(
            SeasonAggregator::new(Arc::new(VenueSplitProvider)),
            WindowResolver::default(),
        );
        let home = FilterContext::default().with_venue(crate::engine::Venue::Home);
        let handle = session.load("1", WindowSpec::LastN(10), &home, CURRENT).await.unwrap();
        let outcome = handle.backfill.expect("home games alone cannot fill the window").await.unwrap();
        assert_eq!(outcome, MergeOutcome::Applied);

        let records = session
            .snapshot()
            .resolve_sequence(&WindowResolver::default(), &home)
            .unwrap();
        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| r.is_home));
        assert_eq!(records.iter().filter(|r| r.season == CURRENT).count(), 2);

        // unfiltered, the 12 current-season games already fill it
        let handle = session
            .load("1", WindowSpec::LastN(10), &FilterContext::default(), CURRENT)
            .await
            .unwrap();
        assert!(handle.backfill.is_none());
    }

    /// Every current-season page arrives twice; the prior season has 10 games.
    struct OverlappingPagesProvider;

    #[async_trait]
    impl GameLogProvider for OverlappingPagesProvider {
        async fn fetch_game_logs(
            &self,
            _player_id: u64,
            season: i32,
            postseason: bool,
        ) -> Result<Vec<GameRecord>, FetchError> {
            if postseason {
                return Ok(Vec::new());
            }
            let count = if season == CURRENT { 6 } else { 10 };
            let page: Vec<GameRecord> = (0..count)
                .map(|i| GameRecord {
                    game_id: Some(season as u64 * 100 + i),
                    game_date: format!("{}-11-{:02}", season, i + 1),
                    team_abbr: Some("LAL".to_string()),
                    min: Some("28:00".to_string()),
                    ..Default::default()
                })
                .collect();
            if season == CURRENT {
                Ok(page.iter().chain(page.iter()).cloned().collect())
            } else {
                Ok(page)
            }
        }
    }

    #[tokio::test]
    async fn test_repeated_current_rows_count_once() {
        let session = GameLogSession::new(
            SeasonAggregator::new(Arc::new(OverlappingPagesProvider)),
            WindowResolver::default(),
        );
        let ctx = FilterContext::default();
        let handle = session.load("1", WindowSpec::LastN(10), &ctx, CURRENT).await.unwrap();
        // 12 rows but only 6 games
        assert!(session.snapshot().backfill_pending);
        assert_eq!(handle.backfill.unwrap().await.unwrap(), MergeOutcome::Applied);

        let records = session.snapshot().resolve_sequence(&WindowResolver::default(), &ctx).unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records.iter().filter(|r| r.season == CURRENT).count(), 6);
    }

    #[tokio::test]
    async fn test_full_last_n_skips_backfill() {
        let (session, _) = session(&[]);
        let handle = session.load("3", WindowSpec::LastN(2), &FilterContext::default(), CURRENT).await.unwrap();
        assert!(handle.backfill.is_none());
        assert!(!session.snapshot().backfill_pending);
    }

    #[tokio::test]
    async fn test_last_season_loads_prior_inline() {
        let (session, _) = session(&[]);
        session.load("3", WindowSpec::LastSeason, &FilterContext::default(), CURRENT).await.unwrap();
        let records = session
            .snapshot()
            .resolve_sequence(&WindowResolver::default(), &FilterContext::default())
            .unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.season == CURRENT - 1));
    }

    #[tokio::test]
    async fn test_watch_subscribers_see_updates() {
        let (session, _) = session(&[]);
        let mut rx = session.subscribe();
        session.load("3", WindowSpec::ThisSeason, &FilterContext::default(), CURRENT).await.unwrap();
        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.tag.map(|t| t.player_id), Some(3));
    }

    #[tokio::test]
    async fn test_invalid_player_rejected() {
        let (session, _) = session(&[]);
        assert!(session.load("", WindowSpec::LastN(5), &FilterContext::default(), CURRENT).await.is_err());
        assert!(session.snapshot().tag.is_none());
    }
}
