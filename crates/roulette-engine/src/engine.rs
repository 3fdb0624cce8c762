// crates/roulette-engine/src/engine.rs
// SpinEngine: wires pool, history, cursor, coordinator and kept list together
//
// Collaborators are injected at construction; nothing reaches into shared
// global state. Lock order: never hold the history lock while calling into
// the pool (the pool consults history through `SeenCandidates`).

use crate::animation::AnimationCoordinator;
use crate::clock::Clock;
use crate::config::{EngineConfig, SessionConfig};
use crate::cursor::{Direction, NavigationCursor};
use crate::error::{EngineError, Result};
use crate::history::{HistoryTracker, SeenCandidates};
use crate::input::Command;
use crate::inventory::{InventoryPool, PoolStats};
use crate::kept::KeptList;
use crate::search::PlaceSearch;
use rand::Rng;
use roulette_types::{Candidate, KeepStatus, LatLng, MealTime};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Snapshot of everything the presentation layer renders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineView {
    pub current: Option<Candidate>,
    pub history_len: usize,
    pub cursor_index: Option<usize>,
    pub kept: Vec<Candidate>,
    /// Keep-button state for `current`
    pub keep_status: Option<KeepStatus>,
    pub is_spinning: bool,
    pub is_sliding: bool,
    pub pool_size: usize,
    pub needs_refill: bool,
    pub meal_time: MealTime,
    /// Recoverable problem to show as a "try again" hint
    pub last_error: Option<String>,
}

/// Result of a spin request
#[derive(Debug, Clone)]
pub enum SpinOutcome {
    /// Fresh candidate from the inventory pool
    Presented(Candidate),
    /// Pool failed; random pick from the last known result set
    Fallback { candidate: Candidate, error: EngineError },
    /// Another transition was active
    Ignored,
    /// Pool and fallback both came up empty
    Unavailable(EngineError),
}

impl SpinOutcome {
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Presented(candidate) | Self::Fallback { candidate, .. } => Some(candidate),
            Self::Ignored | Self::Unavailable(_) => None,
        }
    }
}

/// Result of a next/previous request
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Cursor moved; the entry is presented when the slide finishes
    Sliding { index: usize },
    /// Stepped forward past the newest entry
    Spun(SpinOutcome),
    /// Busy, or already at the edge
    Ignored,
}

struct Inner {
    config: EngineConfig,
    session: Mutex<SessionConfig>,
    pool: Arc<InventoryPool>,
    history: Arc<Mutex<HistoryTracker>>,
    coordinator: AnimationCoordinator,
    cursor: Mutex<NavigationCursor>,
    kept: Mutex<KeptList>,
    current: Mutex<Option<Candidate>>,
    last_error: Mutex<Option<String>>,
    view_tx: watch::Sender<EngineView>,
    /// Bumped on every slide start and finish; invalidates auto-finish timers
    slide_seq: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cheaply cloneable handle to one engine session
#[derive(Clone)]
pub struct SpinEngine {
    inner: Arc<Inner>,
}

impl SpinEngine {
    pub fn new(
        session: SessionConfig,
        config: EngineConfig,
        search: Arc<dyn PlaceSearch>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let history = Arc::new(Mutex::new(HistoryTracker::from_config(&session)));
        let seen: Arc<dyn SeenCandidates> = history.clone();
        let pool = InventoryPool::new(&session, search, clock, seen);
        let (view_tx, _) = watch::channel(EngineView {
            meal_time: session.meal_time,
            ..EngineView::default()
        });

        Self {
            inner: Arc::new(Inner {
                kept: Mutex::new(KeptList::new(config.kept_capacity)),
                config,
                session: Mutex::new(session),
                pool,
                history,
                coordinator: AnimationCoordinator::new(),
                cursor: Mutex::new(NavigationCursor::new(0, false)),
                current: Mutex::new(None),
                last_error: Mutex::new(None),
                view_tx,
                slide_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Set the history baseline and fill the pool for the initial location.
    ///
    /// Without a location this only publishes the initial view; the first
    /// `update_location` starts the session instead.
    pub async fn start(&self) {
        let (location, meal_time) = {
            let session = lock(&self.inner.session);
            (session.location, session.meal_time)
        };
        if let Some(location) = location {
            lock(&self.inner.history).on_location_updated(location);
            self.inner.pool.initialize(location, meal_time).await;
            info!(location = %location, meal_time = %meal_time, pool_size = self.inner.pool.pool_size(), "Engine started");
        } else {
            debug!("Engine started without a location");
        }
        self.inner.publish();
    }

    // ═══════════════════════════════════════
    // SPIN
    // ═══════════════════════════════════════

    /// Pull the next candidate and present it once the spin animation ends.
    ///
    /// Never fails: pool errors degrade to a random pick from the last known
    /// results, and only when that is empty too is `Unavailable` returned.
    /// The spin runs on its own task, so dropping this future does not leave
    /// the engine stuck in the spinning state; the pick is still recorded and
    /// presented.
    pub async fn spin(&self) -> SpinOutcome {
        if !self.inner.coordinator.start_spin() {
            return SpinOutcome::Ignored;
        }
        self.inner.publish();

        let inner = Arc::clone(&self.inner);
        match tokio::spawn(async move { inner.run_spin().await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Spin task failed");
                let _ = self.inner.coordinator.end_spin();
                let error = EngineError::ExhaustedInventory;
                *lock(&self.inner.last_error) = Some(error.to_string());
                self.inner.publish();
                SpinOutcome::Unavailable(error)
            }
        }
    }

    // ═══════════════════════════════════════
    // NAVIGATION
    // ═══════════════════════════════════════

    /// Slide forward through history; at the newest entry, spin instead
    pub async fn next(&self) -> StepOutcome {
        let at_end = lock(&self.inner.cursor).at_end();
        if at_end {
            return StepOutcome::Spun(self.spin().await);
        }
        self.slide(Direction::Forward)
    }

    /// Slide back through history
    pub fn previous(&self) -> StepOutcome {
        self.slide(Direction::Back)
    }

    fn slide(&self, direction: Direction) -> StepOutcome {
        let inner = &self.inner;
        if !inner.coordinator.start_slide() {
            debug!(direction = ?direction, "Slide ignored, transition in progress");
            return StepOutcome::Ignored;
        }

        let index = {
            let mut cursor = lock(&inner.cursor);
            if cursor.step(direction) {
                cursor.index()
            } else {
                None
            }
        };
        let Some(index) = index else {
            let _ = inner.coordinator.end_slide();
            return StepOutcome::Ignored;
        };

        let target = Arc::clone(inner);
        inner
            .coordinator
            .request_update(move || target.present_history_entry(index));
        let seq = inner.slide_seq.fetch_add(1, Ordering::SeqCst) + 1;
        inner.publish();

        if let Some(duration) = inner.config.slide_duration {
            let engine = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                if engine.inner.slide_seq.load(Ordering::SeqCst) == seq {
                    engine.finish_slide().await;
                }
            });
        }
        StepOutcome::Sliding { index }
    }

    /// The presentation layer's "slide transition ended" signal.
    ///
    /// Returns `false` if no slide was in progress.
    pub async fn finish_slide(&self) -> bool {
        let inner = &self.inner;
        if !inner.coordinator.is_sliding() {
            return false;
        }
        inner.slide_seq.fetch_add(1, Ordering::SeqCst);
        if let Some(replay) = inner.coordinator.end_slide() {
            if let Err(e) = replay.await {
                warn!(error = %e, "Presenting slide target failed");
            }
        }
        inner.publish();
        true
    }

    /// Rewind one entry, dropping the current one from history
    pub fn go_back(&self) -> Result<Candidate> {
        let inner = &self.inner;
        let previous = lock(&inner.history).go_back()?;
        let target = Arc::clone(inner);
        let shown = previous.clone();
        inner.coordinator.request_update(move || target.present(shown));
        inner.publish();
        Ok(previous)
    }

    pub fn clear_history(&self) {
        lock(&self.inner.history).clear();
        lock(&self.inner.cursor).set_len(0);
        self.inner.publish();
    }

    // ═══════════════════════════════════════
    // KEPT LIST
    // ═══════════════════════════════════════

    pub fn add_to_kept(&self, candidate: Candidate) -> Result<()> {
        let id = candidate.id.clone();
        lock(&self.inner.kept).add(candidate).inspect_err(|rejection| {
            debug!(id = %id, rejection = %rejection, "Keep rejected");
        })?;
        info!(id = %id, "Added to kept list");
        self.inner.publish();
        Ok(())
    }

    /// Keep whatever is on screen; `Ok(false)` when nothing is
    pub fn keep_current(&self) -> Result<bool> {
        let current = lock(&self.inner.current).clone();
        match current {
            Some(candidate) => self.add_to_kept(candidate).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn remove_from_kept(&self, index: usize) -> Result<Candidate> {
        let removed = lock(&self.inner.kept).remove(index)?;
        self.inner.publish();
        Ok(removed)
    }

    pub fn keep_status(&self, candidate: &Candidate) -> KeepStatus {
        lock(&self.inner.kept).status(candidate)
    }

    pub fn kept(&self) -> Vec<Candidate> {
        lock(&self.inner.kept).items().to_vec()
    }

    // ═══════════════════════════════════════
    // SESSION CONDITIONS
    // ═══════════════════════════════════════

    /// Feed a location fix. A large jump clears history; any change
    /// invalidates the pool and refills it in the background.
    pub fn update_location(&self, location: LatLng) -> Option<JoinHandle<()>> {
        let inner = &self.inner;
        if lock(&inner.history).on_location_updated(location) {
            lock(&inner.cursor).set_len(0);
        }
        let meal_time = {
            let mut session = lock(&inner.session);
            session.location = Some(location);
            session.meal_time
        };
        let refill = inner.pool.update_search_conditions(location, meal_time);
        inner.publish();
        refill
    }

    /// Switch the meal-time filter, clearing history and the pool
    pub fn set_meal_time(&self, meal_time: MealTime) -> Option<JoinHandle<()>> {
        let inner = &self.inner;
        let location = {
            let mut session = lock(&inner.session);
            if session.meal_time == meal_time {
                return None;
            }
            session.meal_time = meal_time;
            session.location
        };
        lock(&inner.history).on_meal_time_changed(meal_time);
        lock(&inner.cursor).set_len(0);
        let refill = location.and_then(|loc| inner.pool.update_search_conditions(loc, meal_time));
        inner.publish();
        refill
    }

    // ═══════════════════════════════════════
    // INPUT
    // ═══════════════════════════════════════

    /// Run a command from any input source. Failures surface in the view.
    pub async fn dispatch(&self, command: Command) {
        debug!(command = ?command, "Dispatching command");
        match command {
            Command::Spin => {
                self.spin().await;
            }
            Command::Next => {
                self.next().await;
            }
            Command::Previous => {
                self.previous();
            }
            Command::GoBack => {
                // Nothing to go back to is not an error worth showing
                if let Err(e) = self.go_back() {
                    debug!(error = %e, "Go back ignored");
                }
            }
            Command::KeepCurrent => {
                if let Err(e) = self.keep_current() {
                    debug!(error = %e, "Keep current ignored");
                }
            }
            Command::ClearHistory => self.clear_history(),
        }
    }

    // ═══════════════════════════════════════
    // OBSERVABLE STATE
    // ═══════════════════════════════════════

    pub fn subscribe(&self) -> watch::Receiver<EngineView> {
        self.inner.view_tx.subscribe()
    }

    pub fn view(&self) -> EngineView {
        self.inner.view_tx.borrow().clone()
    }

    pub fn current(&self) -> Option<Candidate> {
        lock(&self.inner.current).clone()
    }

    pub fn history(&self) -> Vec<Candidate> {
        lock(&self.inner.history).iter().cloned().collect()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.inner.pool.stats()
    }
}

impl Inner {
    /// Body of a spin; the coordinator is already in the spinning state
    async fn run_spin(self: Arc<Self>) -> SpinOutcome {
        let (picked, _) = tokio::join!(
            self.pool.get_next(),
            tokio::time::sleep(self.config.spin_duration)
        );

        let outcome = match picked {
            Ok(candidate) => SpinOutcome::Presented(candidate),
            Err(error) => match self.fallback_pick() {
                Some(candidate) => {
                    warn!(error = %error, id = %candidate.id, "Inventory unavailable, using fallback pick");
                    SpinOutcome::Fallback { candidate, error }
                }
                None => {
                    warn!(error = %error, "Inventory and fallback both empty");
                    SpinOutcome::Unavailable(error)
                }
            },
        };

        *lock(&self.last_error) = match &outcome {
            SpinOutcome::Fallback { error, .. } | SpinOutcome::Unavailable(error) => {
                Some(error.to_string())
            }
            _ => None,
        };

        if let Some(candidate) = outcome.candidate().cloned() {
            lock(&self.history).record(candidate.clone());
            let target = Arc::clone(&self);
            self.coordinator
                .request_update(move || target.present(candidate));
        }

        if let Some(replay) = self.coordinator.end_spin() {
            if let Err(e) = replay.await {
                warn!(error = %e, "Presenting spin result failed");
            }
        }
        self.publish();
        outcome
    }

    /// Show `candidate` and point the cursor at its history entry
    fn present(&self, candidate: Candidate) {
        let (len, position) = {
            let history = lock(&self.history);
            let position = history.iter().position(|c| c.id == candidate.id);
            (history.len(), position)
        };
        {
            let mut cursor = lock(&self.cursor);
            cursor.set_len(len);
            if let Some(index) = position {
                cursor.jump_to(index);
            }
        }
        debug!(id = %candidate.id, name = %candidate.name, "Presenting candidate");
        *lock(&self.current) = Some(candidate);
        self.publish();
    }

    fn present_history_entry(&self, index: usize) {
        let entry = lock(&self.history).get(index).cloned();
        match entry {
            Some(candidate) => self.present(candidate),
            None => debug!(index, "History entry gone before slide finished"),
        }
    }

    /// Unfiltered uniform pick from the last known search results
    fn fallback_pick(&self) -> Option<Candidate> {
        let results = self.pool.last_results();
        if results.is_empty() {
            return None;
        }
        let pick = rand::rng().random_range(0..results.len());
        results.into_iter().nth(pick)
    }

    fn publish(&self) {
        let history_len = lock(&self.history).len();
        let cursor_index = lock(&self.cursor).index();
        let current = lock(&self.current).clone();
        let (kept, keep_status) = {
            let kept = lock(&self.kept);
            let status = current.as_ref().map(|c| kept.status(c));
            (kept.items().to_vec(), status)
        };
        let meal_time = lock(&self.session).meal_time;
        let view = EngineView {
            current,
            history_len,
            cursor_index,
            kept,
            keep_status,
            is_spinning: self.coordinator.is_spinning(),
            is_sliding: self.coordinator.is_sliding(),
            pool_size: self.pool.pool_size(),
            needs_refill: self.pool.needs_refill(),
            meal_time,
            last_error: lock(&self.last_error).clone(),
        };
        self.view_tx.send_replace(view);
    }
}
