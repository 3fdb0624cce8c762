// crates/roulette-engine/src/animation.rs
// Mutual-exclusion gate between visual transitions and data swaps
//
// A data update requested mid-transition is parked (last write wins) and
// replayed once the transition exits, on a later task turn so the replay can
// never re-enter a transition handler.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;

/// Deferred data update
pub type Update = Box<dyn FnOnce() + Send + 'static>;

/// Which transition, if any, is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Sliding,
    Spinning,
}

impl fmt::Display for AnimationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sliding => write!(f, "sliding"),
            Self::Spinning => write!(f, "spinning"),
        }
    }
}

/// What `request_update` did with the update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDisposition {
    /// Ran immediately
    Applied,
    /// Parked until the transition ends; `replaced` if it overwrote another
    Deferred { replaced: bool },
}

#[derive(Default)]
struct Inner {
    state: AnimationState,
    pending: Option<Update>,
}

#[derive(Default)]
pub struct AnimationCoordinator {
    inner: Mutex<Inner>,
}

impl AnimationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> AnimationState {
        self.lock().state
    }

    pub fn can_start_slide(&self) -> bool {
        self.state() == AnimationState::Idle
    }

    pub fn is_sliding(&self) -> bool {
        self.state() == AnimationState::Sliding
    }

    pub fn is_spinning(&self) -> bool {
        self.state() == AnimationState::Spinning
    }

    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Idle -> Sliding; `false` if another transition is active
    pub fn start_slide(&self) -> bool {
        self.enter(AnimationState::Sliding)
    }

    /// Sliding -> Idle, replaying any parked update
    pub fn end_slide(&self) -> Option<JoinHandle<()>> {
        self.exit(AnimationState::Sliding)
    }

    /// Idle -> Spinning; `false` if another transition is active
    pub fn start_spin(&self) -> bool {
        self.enter(AnimationState::Spinning)
    }

    /// Spinning -> Idle, replaying any parked update
    pub fn end_spin(&self) -> Option<JoinHandle<()>> {
        self.exit(AnimationState::Spinning)
    }

    /// Run `update` now if idle, otherwise park it, replacing any parked one
    pub fn request_update<F>(&self, update: F) -> UpdateDisposition
    where
        F: FnOnce() + Send + 'static,
    {
        let update: Update = Box::new(update);
        let immediate = {
            let mut inner = self.lock();
            if inner.state == AnimationState::Idle {
                Some(update)
            } else {
                let replaced = inner.pending.replace(update).is_some();
                if replaced {
                    debug!(state = %inner.state, "Replaced pending update");
                }
                return UpdateDisposition::Deferred { replaced };
            }
        };
        // Run outside the lock so the update may inspect the coordinator
        if let Some(update) = immediate {
            update();
        }
        UpdateDisposition::Applied
    }

    fn enter(&self, target: AnimationState) -> bool {
        let mut inner = self.lock();
        if inner.state != AnimationState::Idle {
            debug!(state = %inner.state, requested = %target, "Transition ignored, another is active");
            return false;
        }
        inner.state = target;
        true
    }

    fn exit(&self, from: AnimationState) -> Option<JoinHandle<()>> {
        let pending = {
            let mut inner = self.lock();
            if inner.state != from {
                return None;
            }
            inner.state = AnimationState::Idle;
            inner.pending.take()
        }?;
        Some(tokio::spawn(async move { pending() }))
    }
}

impl fmt::Debug for AnimationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("AnimationCoordinator")
            .field("state", &inner.state)
            .field("pending", &inner.pending.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn test_starts_idle() {
        let ac = AnimationCoordinator::new();
        assert_eq!(ac.state(), AnimationState::Idle);
        assert!(ac.can_start_slide());
    }

    #[test]
    fn test_update_runs_immediately_when_idle() {
        let ac = AnimationCoordinator::new();
        let hits = counter();
        let h = hits.clone();
        let disposition = ac.request_update(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(disposition, UpdateDisposition::Applied);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_only_one_transition_at_a_time() {
        let ac = AnimationCoordinator::new();
        assert!(ac.start_slide());
        assert!(!ac.start_slide());
        assert!(!ac.start_spin());
        assert!(!ac.can_start_slide());
        assert!(ac.is_sliding());
    }

    #[tokio::test]
    async fn test_second_update_wins_while_sliding() {
        let ac = AnimationCoordinator::new();
        let first = counter();
        let second = counter();
        assert!(ac.start_slide());

        let f = first.clone();
        assert_eq!(
            ac.request_update(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }),
            UpdateDisposition::Deferred { replaced: false }
        );
        let s = second.clone();
        assert_eq!(
            ac.request_update(move || {
                s.fetch_add(1, Ordering::SeqCst);
            }),
            UpdateDisposition::Deferred { replaced: true }
        );
        assert_eq!(second.load(Ordering::SeqCst), 0);

        let replay = ac.end_slide().unwrap();
        replay.await.unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(!ac.has_pending());
        assert_eq!(ac.state(), AnimationState::Idle);
    }

    #[tokio::test]
    async fn test_replay_is_not_synchronous() {
        let ac = Arc::new(AnimationCoordinator::new());
        let hits = counter();
        assert!(ac.start_spin());
        let h = hits.clone();
        ac.request_update(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        let replay = ac.end_spin().unwrap();
        // Not run inside end_spin itself
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        replay.await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_replayed_update_can_start_transition() {
        let ac = Arc::new(AnimationCoordinator::new());
        assert!(ac.start_slide());
        let inner = ac.clone();
        ac.request_update(move || {
            assert!(inner.start_slide());
        });
        ac.end_slide().unwrap().await.unwrap();
        assert!(ac.is_sliding());
    }

    #[test]
    fn test_end_without_start_is_noop() {
        let ac = AnimationCoordinator::new();
        assert!(ac.end_slide().is_none());
        assert!(ac.start_spin());
        assert!(ac.end_slide().is_none());
        assert!(ac.is_spinning());
    }

    #[tokio::test]
    async fn test_end_without_pending_returns_none() {
        let ac = AnimationCoordinator::new();
        assert!(ac.start_slide());
        assert!(ac.end_slide().is_none());
        assert!(ac.can_start_slide());
    }
}
