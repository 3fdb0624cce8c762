// crates/roulette-engine/src/inventory.rs
// Inventory pool: a bounded, continuously replenished buffer of unseen
// candidates so most spins resolve without a network round trip.
//
// Lock order: the pool's state lock may be held while asking `SeenCandidates`
// (which locks history). Callers must never hold the history lock while
// calling into the pool.

use crate::clock::{Clock, week_minute};
use crate::config::SessionConfig;
use crate::error::{EngineError, Result, SearchError};
use crate::history::SeenCandidates;
use crate::search::PlaceSearch;
use crate::single_flight::SingleFlight;
use crate::{availability, geo};
use chrono::NaiveDateTime;
use rand::Rng;
use roulette_types::{Candidate, LatLng, MealTime, OperationalStatus};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How many times a refill is retried when it lands for outdated conditions
const MAX_STALE_RETRIES: usize = 2;

/// Result of one refill flight, tagged with the conditions it ran under
#[derive(Debug, Clone)]
struct RefillOutcome {
    epoch: u64,
    result: std::result::Result<usize, SearchError>,
}

/// Diagnostic counters for optional debug display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub pool_size: usize,
    pub valid: usize,
    pub refills: u64,
    pub failures: u64,
    pub stale_dropped: u64,
}

struct PoolState {
    candidates: Vec<Candidate>,
    location: Option<LatLng>,
    meal_time: MealTime,
    min_threshold: usize,
    batch_size: usize,
    /// Bumped whenever location or meal time change
    epoch: u64,
    /// Raw results of the last non-empty search, for degraded picks
    last_results: Vec<Candidate>,
    refills: u64,
    failures: u64,
    stale_dropped: u64,
}

impl PoolState {
    fn is_valid(&self, c: &Candidate, now: NaiveDateTime, seen: &dyn SeenCandidates) -> bool {
        availability::is_available(c, self.meal_time, now) && !seen.has_seen(&c.id)
    }
}

pub struct InventoryPool {
    search: Arc<dyn PlaceSearch>,
    clock: Arc<dyn Clock>,
    seen: Arc<dyn SeenCandidates>,
    state: Mutex<PoolState>,
    refill_flight: SingleFlight<RefillOutcome>,
}

impl InventoryPool {
    pub fn new(
        config: &SessionConfig,
        search: Arc<dyn PlaceSearch>,
        clock: Arc<dyn Clock>,
        seen: Arc<dyn SeenCandidates>,
    ) -> Arc<Self> {
        Arc::new(Self {
            search,
            clock,
            seen,
            state: Mutex::new(PoolState {
                candidates: Vec::new(),
                location: config.location,
                meal_time: config.meal_time,
                min_threshold: config.min_threshold,
                batch_size: config.batch_size.max(1),
                epoch: 0,
                last_results: Vec::new(),
                refills: 0,
                failures: 0,
                stale_dropped: 0,
            }),
            refill_flight: SingleFlight::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ═══════════════════════════════════════
    // CONDITIONS
    // ═══════════════════════════════════════

    /// Clear the pool and perform a blocking refill for new conditions.
    ///
    /// A search failure is logged, not returned: the pool stays empty and
    /// later picks degrade to the caller's fallback.
    pub async fn initialize(self: &Arc<Self>, location: LatLng, meal_time: MealTime) {
        self.reset(location, meal_time);
        if let Err(e) = self.refill().await {
            warn!(error = %e, location = %location, "Initial inventory fill failed");
        }
    }

    /// Invalidate the pool if location or meal time changed, scheduling a
    /// fresh fill in the background. Returns the fill's handle when one was
    /// scheduled.
    pub fn update_search_conditions(
        self: &Arc<Self>,
        location: LatLng,
        meal_time: MealTime,
    ) -> Option<JoinHandle<()>> {
        {
            let state = self.lock();
            if state.location == Some(location) && state.meal_time == meal_time {
                return None;
            }
        }
        info!(location = %location, meal_time = %meal_time, "Search conditions changed, invalidating pool");
        self.reset(location, meal_time);
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            if let Err(e) = this.refill().await {
                warn!(error = %e, "Background inventory fill failed");
            }
        }))
    }

    fn reset(&self, location: LatLng, meal_time: MealTime) {
        let mut state = self.lock();
        state.candidates.clear();
        state.last_results.clear();
        state.location = Some(location);
        state.meal_time = meal_time;
        state.epoch += 1;
    }

    // ═══════════════════════════════════════
    // REFILL
    // ═══════════════════════════════════════

    /// Fetch a batch from the search provider into the pool.
    ///
    /// At most one search runs at a time: callers arriving while one is in
    /// flight wait for it instead of issuing their own. Returns how many
    /// candidates were added. No-op without a location.
    pub async fn refill(self: &Arc<Self>) -> std::result::Result<usize, SearchError> {
        for _ in 0..=MAX_STALE_RETRIES {
            let current_epoch = {
                let state = self.lock();
                if state.location.is_none() {
                    debug!("Refill skipped, no location yet");
                    return Ok(0);
                }
                state.epoch
            };

            let this = Arc::clone(self);
            let outcome = self
                .refill_flight
                .run(move || async move { this.run_refill().await })
                .await;

            // Joined a flight started under older conditions; go again
            if outcome.epoch != current_epoch && self.lock().epoch == current_epoch {
                continue;
            }
            return outcome.result;
        }
        Ok(0)
    }

    async fn run_refill(self: Arc<Self>) -> RefillOutcome {
        let (epoch, location, meal_time) = {
            let state = self.lock();
            (state.epoch, state.location, state.meal_time)
        };
        let Some(location) = location else {
            return RefillOutcome {
                epoch,
                result: Ok(0),
            };
        };

        debug!(provider = self.search.name(), location = %location, meal_time = %meal_time, "Refilling inventory");
        let result = self.search.search(location, meal_time).await;

        let mut state = self.lock();
        let result = match result {
            Ok(_) if state.epoch != epoch => {
                state.stale_dropped += 1;
                debug!(epoch, current = state.epoch, "Conditions changed during refill, dropping results");
                Ok(0)
            }
            Ok(results) => {
                let added = self.absorb(&mut state, location, results);
                state.refills += 1;
                info!(added, pool_size = state.candidates.len(), "Inventory refilled");
                Ok(added)
            }
            Err(e) => {
                state.failures += 1;
                warn!(error = %e, provider = self.search.name(), "Inventory refill failed");
                Err(e)
            }
        };
        RefillOutcome { epoch, result }
    }

    /// Annotate, filter and append fresh results, then trim to batch size
    fn absorb(&self, state: &mut PoolState, location: LatLng, results: Vec<Candidate>) -> usize {
        let now = self.clock.now();
        let now_wm = week_minute(now);

        let results: Vec<Candidate> = results
            .into_iter()
            .map(|mut c| {
                c.distance_km = geo::distance_km(location, c.location);
                if c.status == OperationalStatus::Unknown
                    && c.hours.as_ref().is_some_and(|h| h.is_open_at(now_wm))
                {
                    c.status = OperationalStatus::Operational;
                }
                c
            })
            .collect();
        if !results.is_empty() {
            state.last_results = results.clone();
        }

        let mut present: HashSet<String> = state.candidates.iter().map(|c| c.id.clone()).collect();
        let mut added = 0;
        for c in results {
            if present.contains(&c.id) || !state.is_valid(&c, now, self.seen.as_ref()) {
                continue;
            }
            present.insert(c.id.clone());
            state.candidates.push(c);
            added += 1;
        }

        let excess = state.candidates.len().saturating_sub(state.batch_size);
        if excess > 0 {
            state.candidates.drain(..excess);
            debug!(evicted = excess, "Pool over batch size, evicted oldest");
        }
        added
    }

    fn spawn_refill(self: &Arc<Self>) {
        if self.refill_flight.is_in_flight() {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            // Failures are logged inside the refill
            let _ = this.refill().await;
        });
    }

    // ═══════════════════════════════════════
    // PICKS
    // ═══════════════════════════════════════

    /// Take a uniformly random valid candidate out of the pool.
    ///
    /// Prefetches in the background when running low; if nothing valid is
    /// left, refills once in the foreground before giving up with
    /// [`EngineError::ExhaustedInventory`].
    pub async fn get_next(self: &Arc<Self>) -> Result<Candidate> {
        // Measured before the pick: fewer than `min_threshold` valid remain
        let running_low = self.needs_refill();
        if let Some(candidate) = self.take_random_valid() {
            if running_low {
                debug!(valid = self.valid_count(), "Pool running low, prefetching");
                self.spawn_refill();
            }
            return Ok(candidate);
        }

        debug!("No valid candidates, refilling before retry");
        if let Err(e) = self.refill().await {
            warn!(error = %e, "Foreground refill failed");
            return match self.take_random_valid() {
                Some(candidate) => Ok(candidate),
                None => Err(EngineError::SearchFailure(e)),
            };
        }
        self.take_random_valid().ok_or(EngineError::ExhaustedInventory)
    }

    fn take_random_valid(&self) -> Option<Candidate> {
        let now = self.clock.now();
        let mut state = self.lock();
        let valid: Vec<usize> = state
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| state.is_valid(c, now, self.seen.as_ref()))
            .map(|(i, _)| i)
            .collect();
        if valid.is_empty() {
            return None;
        }
        let pick = valid[rand::rng().random_range(0..valid.len())];
        Some(state.candidates.remove(pick))
    }

    // ═══════════════════════════════════════
    // DIAGNOSTICS
    // ═══════════════════════════════════════

    pub fn pool_size(&self) -> usize {
        self.lock().candidates.len()
    }

    /// Candidates still valid for the active meal time and not yet seen
    pub fn valid_count(&self) -> usize {
        let now = self.clock.now();
        let state = self.lock();
        state
            .candidates
            .iter()
            .filter(|c| state.is_valid(c, now, self.seen.as_ref()))
            .count()
    }

    pub fn needs_refill(&self) -> bool {
        let min_threshold = self.lock().min_threshold;
        self.valid_count() < min_threshold
    }

    pub fn is_refilling(&self) -> bool {
        self.refill_flight.is_in_flight()
    }

    /// Raw results of the last non-empty search under current conditions
    pub fn last_results(&self) -> Vec<Candidate> {
        self.lock().last_results.clone()
    }

    pub fn conditions(&self) -> (Option<LatLng>, MealTime) {
        let state = self.lock();
        (state.location, state.meal_time)
    }

    pub fn stats(&self) -> PoolStats {
        let valid = self.valid_count();
        let state = self.lock();
        PoolStats {
            pool_size: state.candidates.len(),
            valid,
            refills: state.refills,
            failures: state.failures,
            stale_dropped: state.stale_dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::history::{HistoryTracker, NothingSeen};
    use crate::test_support::*;
    use roulette_types::{OpenPeriod, OpeningHours};

    fn config(min_threshold: usize, batch_size: usize) -> SessionConfig {
        SessionConfig::new(origin(), MealTime::Now).with_thresholds(min_threshold, batch_size)
    }

    fn pool_with(search: Arc<ScriptedSearch>, config: &SessionConfig) -> Arc<InventoryPool> {
        InventoryPool::new(
            config,
            search,
            Arc::new(FixedClock::new(noon())),
            Arc::new(NothingSeen),
        )
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_initialize_fills_pool() {
        let search = Arc::new(ScriptedSearch::new(vec![Ok(batch("a", 8))]));
        let pool = pool_with(search.clone(), &config(5, 20));
        pool.initialize(origin(), MealTime::Now).await;
        assert_eq!(pool.pool_size(), 8);
        assert_eq!(search.calls(), 1);
        assert!(!pool.needs_refill());
    }

    #[tokio::test]
    async fn test_initialize_failure_leaves_pool_empty() {
        let search = Arc::new(ScriptedSearch::new(vec![Err(SearchError::Http(
            "offline".to_string(),
        ))]));
        let pool = pool_with(search, &config(5, 20));
        pool.initialize(origin(), MealTime::Now).await;
        assert_eq!(pool.pool_size(), 0);
        assert_eq!(pool.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_refill_without_location_is_noop() {
        let search = Arc::new(ScriptedSearch::new(vec![Ok(batch("a", 3))]));
        let pool = pool_with(search.clone(), &SessionConfig::default());
        assert_eq!(pool.refill().await.unwrap(), 0);
        assert_eq!(search.calls(), 0);
    }

    #[tokio::test]
    async fn test_refill_dedups_by_id() {
        let search = Arc::new(ScriptedSearch::new(vec![
            Ok(batch("a", 4)),
            Ok(batch("a", 6)),
        ]));
        let pool = pool_with(search, &config(5, 20));
        pool.initialize(origin(), MealTime::Now).await;
        let added = pool.refill().await.unwrap();
        assert_eq!(added, 2);
        assert_eq!(pool.pool_size(), 6);
    }

    #[tokio::test]
    async fn test_refill_trims_to_batch_size_oldest_first() {
        let search = Arc::new(ScriptedSearch::new(vec![
            Ok(batch("old", 4)),
            Ok(batch("new", 4)),
        ]));
        let pool = pool_with(search, &config(2, 6));
        pool.initialize(origin(), MealTime::Now).await;
        pool.refill().await.unwrap();
        assert_eq!(pool.pool_size(), 6);
        let ids: Vec<String> = pool.lock().candidates.iter().map(|c| c.id.clone()).collect();
        assert!(!ids.contains(&"old0".to_string()));
        assert!(!ids.contains(&"old1".to_string()));
        assert!(ids.contains(&"new3".to_string()));
    }

    #[tokio::test]
    async fn test_refill_skips_closed_and_seen() {
        let history = Arc::new(Mutex::new(HistoryTracker::from_config(&SessionConfig::default())));
        history.lock().unwrap().record(candidate("seen"));
        let search = Arc::new(ScriptedSearch::new(vec![Ok(vec![
            candidate("ok"),
            candidate("seen"),
            candidate_with_status("shut", OperationalStatus::Closed),
        ])]));
        let pool = InventoryPool::new(
            &config(1, 20),
            search,
            Arc::new(FixedClock::new(noon())),
            history,
        );
        pool.initialize(origin(), MealTime::Now).await;
        assert_eq!(pool.pool_size(), 1);
        // The unfiltered set is still kept for fallback picks
        assert_eq!(pool.last_results().len(), 3);
    }

    #[tokio::test]
    async fn test_annotates_distance_and_promotes_open_unknown() {
        let mut far = candidate_with_status("far", OperationalStatus::Unknown);
        far.location = LatLng::new(origin().lat + 0.01, origin().lng);
        far.hours = Some(OpeningHours::always());
        let search = Arc::new(ScriptedSearch::new(vec![Ok(vec![far])]));
        let pool = pool_with(search, &config(1, 20));
        pool.initialize(origin(), MealTime::Now).await;

        let got = pool.get_next().await.unwrap();
        assert!((got.distance_km - 1.11).abs() < 0.01, "got {}", got.distance_km);
        assert_eq!(got.status, OperationalStatus::Operational);
    }

    #[tokio::test]
    async fn test_get_next_removes_pick() {
        let search = Arc::new(ScriptedSearch::new(vec![Ok(batch("a", 10))]));
        let pool = pool_with(search, &config(5, 20));
        pool.initialize(origin(), MealTime::Now).await;
        let first = pool.get_next().await.unwrap();
        assert_eq!(pool.pool_size(), 9);
        assert!(!pool.lock().candidates.iter().any(|c| c.id == first.id));
    }

    #[tokio::test]
    async fn test_low_pool_returns_immediately_and_prefetches() {
        let search = Arc::new(ScriptedSearch::gated(vec![
            Ok(batch("a", 3)),
            Ok(batch("b", 20)),
        ]));
        let pool = pool_with(search.clone(), &config(5, 20));

        search.release(1);
        pool.initialize(origin(), MealTime::Now).await;
        assert_eq!(pool.pool_size(), 3);

        let picked = pool.get_next().await.unwrap();
        assert!(picked.id.starts_with('a'));
        assert_eq!(pool.pool_size(), 2);

        // Background refill is blocked on the gate
        settle().await;
        assert!(pool.is_refilling());
        assert_eq!(search.calls(), 2);
        assert_eq!(pool.pool_size(), 2);

        search.release(1);
        while pool.is_refilling() {
            tokio::task::yield_now().await;
        }
        // 2 + 20 new, trimmed back to the batch size
        assert_eq!(pool.pool_size(), 20);
    }

    #[tokio::test]
    async fn test_pool_at_threshold_does_not_prefetch() {
        let search = Arc::new(ScriptedSearch::new(vec![Ok(batch("a", 5))]));
        let pool = pool_with(search.clone(), &config(5, 20));
        pool.initialize(origin(), MealTime::Now).await;

        pool.get_next().await.unwrap();
        settle().await;
        assert_eq!(search.calls(), 1);
        assert_eq!(pool.pool_size(), 4);

        // Now below the threshold, the next pick prefetches
        pool.get_next().await.unwrap();
        settle().await;
        assert_eq!(search.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_refills_issue_one_search() {
        let search = Arc::new(ScriptedSearch::gated(vec![Ok(batch("a", 10))]));
        let pool = pool_with(search.clone(), &config(5, 20));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move { pool.refill().await }));
        }
        settle().await;
        assert_eq!(search.calls(), 1);
        search.release(1);
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 10);
        }
        assert_eq!(search.calls(), 1);
        assert_eq!(pool.pool_size(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_get_next_on_empty_pool_share_refill() {
        let search = Arc::new(ScriptedSearch::gated(vec![Ok(batch("a", 10))]));
        let pool = pool_with(search.clone(), &config(2, 20));

        let a = tokio::spawn({
            let pool = pool.clone();
            async move { pool.get_next().await }
        });
        let b = tokio::spawn({
            let pool = pool.clone();
            async move { pool.get_next().await }
        });
        settle().await;
        search.release(1);

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(search.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_when_search_returns_nothing() {
        let search = Arc::new(ScriptedSearch::new(vec![Ok(vec![])]));
        let pool = pool_with(search, &config(5, 20));
        let err = pool.get_next().await.unwrap_err();
        assert!(matches!(err, EngineError::ExhaustedInventory));
    }

    #[tokio::test]
    async fn test_search_failure_on_empty_pool_surfaces() {
        let search = Arc::new(ScriptedSearch::new(vec![Err(SearchError::Http(
            "timeout".to_string(),
        ))]));
        let pool = pool_with(search, &config(5, 20));
        let err = pool.get_next().await.unwrap_err();
        assert!(matches!(err, EngineError::SearchFailure(_)));
    }

    #[tokio::test]
    async fn test_stale_candidates_are_skipped() {
        let clock = Arc::new(FixedClock::new(noon()));
        let mut lunch_only = candidate("lunch_only");
        lunch_only.hours = Some(OpeningHours::new(vec![OpenPeriod {
            day: 0,
            open_minute: 11 * 60,
            close_minute: 13 * 60,
        }]));
        let search = Arc::new(ScriptedSearch::new(vec![
            Ok(vec![lunch_only]),
            Ok(vec![]),
        ]));
        let pool = InventoryPool::new(&config(1, 20), search, clock.clone(), Arc::new(NothingSeen));
        pool.initialize(origin(), MealTime::Now).await;
        assert_eq!(pool.valid_count(), 1);

        clock.advance(chrono::Duration::hours(2));
        assert_eq!(pool.pool_size(), 1);
        assert_eq!(pool.valid_count(), 0);
        assert!(matches!(
            pool.get_next().await,
            Err(EngineError::ExhaustedInventory)
        ));
    }

    #[tokio::test]
    async fn test_update_conditions_unchanged_is_noop() {
        let search = Arc::new(ScriptedSearch::new(vec![Ok(batch("a", 3))]));
        let pool = pool_with(search.clone(), &config(1, 20));
        pool.initialize(origin(), MealTime::Now).await;
        assert!(pool.update_search_conditions(origin(), MealTime::Now).is_none());
        assert_eq!(pool.pool_size(), 3);
        assert_eq!(search.calls(), 1);
    }

    #[tokio::test]
    async fn test_update_conditions_clears_and_refills() {
        let search = Arc::new(ScriptedSearch::new(vec![
            Ok(batch("a", 3)),
            Ok(batch("dinner", 5)),
        ]));
        let pool = pool_with(search, &config(1, 20));
        pool.initialize(origin(), MealTime::Now).await;

        let handle = pool
            .update_search_conditions(origin(), MealTime::Dinner)
            .unwrap();
        assert_eq!(pool.pool_size(), 0);
        handle.await.unwrap();
        assert_eq!(pool.pool_size(), 5);
        assert_eq!(pool.conditions().1, MealTime::Dinner);
    }

    #[tokio::test]
    async fn test_results_landing_after_condition_change_are_dropped() {
        let search = Arc::new(ScriptedSearch::gated(vec![
            Ok(batch("stale", 5)),
            Ok(batch("fresh", 4)),
        ]));
        let pool = pool_with(search.clone(), &config(1, 20));

        let stale = tokio::spawn({
            let pool = pool.clone();
            async move { pool.refill().await }
        });
        settle().await;
        assert!(pool.is_refilling());

        let moved = LatLng::new(origin().lat + 0.2, origin().lng);
        let fresh = pool.update_search_conditions(moved, MealTime::Now).unwrap();
        search.release(2);

        let _ = stale.await.unwrap();
        fresh.await.unwrap();
        settle().await;

        let ids: Vec<String> = pool.lock().candidates.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.iter().all(|id| id.starts_with("fresh")));
        assert_eq!(pool.stats().stale_dropped, 1);
    }
}
