// crates/roulette-engine/src/single_flight.rs
// Single-flight async primitive: concurrent callers share one in-flight run
// instead of each triggering the underlying work.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

type Flight<T> = Shared<BoxFuture<'static, T>>;

struct Slot<T: Clone> {
    /// Bumped every time a new flight starts
    generation: u64,
    flight: Option<Flight<T>>,
}

/// Deduplicates concurrent runs of the same async work.
///
/// The first caller of [`SingleFlight::run`] starts the work; callers arriving
/// while it is in flight attach to it and receive a clone of its output. The
/// slot is cleared by whichever caller observes completion first, so an error
/// result never blocks the next run.
pub struct SingleFlight<T: Clone> {
    slot: Mutex<Slot<T>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                generation: 0,
                flight: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `make()` unless a run is already in flight, in which case wait for
    /// that one. `make` is only called by the caller that starts the flight.
    pub async fn run<F, Fut>(&self, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (generation, flight) = {
            let mut slot = self.lock();
            match &slot.flight {
                Some(flight) if flight.peek().is_none() => (slot.generation, flight.clone()),
                _ => {
                    slot.generation += 1;
                    let flight = make().boxed().shared();
                    slot.flight = Some(flight.clone());
                    (slot.generation, flight)
                }
            }
        };

        let output = flight.await;
        self.finish(generation);
        output
    }

    /// Wait for the in-flight run, if any, without starting a new one
    pub async fn join(&self) -> Option<T> {
        let (generation, flight) = {
            let slot = self.lock();
            match &slot.flight {
                Some(flight) if flight.peek().is_none() => (slot.generation, flight.clone()),
                _ => return None,
            }
        };
        let output = flight.await;
        self.finish(generation);
        Some(output)
    }

    /// Whether a run has started and not yet completed
    pub fn is_in_flight(&self) -> bool {
        self.lock()
            .flight
            .as_ref()
            .is_some_and(|flight| flight.peek().is_none())
    }

    fn finish(&self, generation: u64) {
        let mut slot = self.lock();
        if slot.generation == generation {
            slot.flight = None;
        }
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
