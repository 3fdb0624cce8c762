// crates/roulette-engine/src/test_support.rs
// Shared test helpers: candidate builders and a scripted search provider

use crate::error::SearchError;
use crate::search::PlaceSearch;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use roulette_types::{Candidate, LatLng, MealTime, OperationalStatus};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// Monday 2026-10-19 at 12:00 local
pub fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default()
}

pub fn origin() -> LatLng {
    LatLng::new(40.4237, -86.9212)
}

/// Operational candidate with unknown hours
pub fn candidate(id: &str) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: format!("Restaurant {}", id),
        location: origin(),
        distance_km: 0.0,
        rating: Some(4.0),
        price_level: Some(2),
        cuisine_tags: vec!["thai".to_string()],
        status: OperationalStatus::Operational,
        hours: None,
    }
}

pub fn candidate_with_status(id: &str, status: OperationalStatus) -> Candidate {
    Candidate {
        status,
        ..candidate(id)
    }
}

/// `count` candidates with ids `{prefix}0..`
pub fn batch(prefix: &str, count: usize) -> Vec<Candidate> {
    (0..count)
        .map(|i| candidate(&format!("{}{}", prefix, i)))
        .collect()
}

/// Search provider that replays scripted responses in order.
///
/// Once the script runs out, the last response repeats. With a gate, every
/// call blocks until a permit is released via [`ScriptedSearch::release`].
pub struct ScriptedSearch {
    script: Mutex<VecDeque<Result<Vec<Candidate>, SearchError>>>,
    last: Mutex<Result<Vec<Candidate>, SearchError>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSearch {
    pub fn new(script: Vec<Result<Vec<Candidate>, SearchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Ok(Vec::new())),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(script: Vec<Result<Vec<Candidate>, SearchError>>) -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new(script)
        }
    }

    /// Let `n` blocked calls complete
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaceSearch for ScriptedSearch {
    async fn search(
        &self,
        _location: LatLng,
        _meal_time: MealTime,
    ) -> Result<Vec<Candidate>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(response) = next {
            *last = response;
        }
        last.clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
