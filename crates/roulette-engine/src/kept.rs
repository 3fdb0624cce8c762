// crates/roulette-engine/src/kept.rs
// User-curated shortlist of restaurants

use crate::error::KeepRejection;
use roulette_types::{Candidate, KeepStatus};

#[derive(Debug, Clone)]
pub struct KeptList {
    items: Vec<Candidate>,
    capacity: usize,
}

impl KeptList {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Whether `candidate` can be kept; drives the keep button's label.
    ///
    /// A closed place reports `NotOperational` first, then an already kept
    /// one reports `AlreadyKept` even when the list is full.
    pub fn status(&self, candidate: &Candidate) -> KeepStatus {
        if !candidate.is_operational() {
            KeepStatus::NotOperational
        } else if self.contains(&candidate.id) {
            KeepStatus::AlreadyKept
        } else if self.items.len() >= self.capacity {
            KeepStatus::ListFull
        } else {
            KeepStatus::Available
        }
    }

    pub fn add(&mut self, candidate: Candidate) -> Result<(), KeepRejection> {
        match self.status(&candidate) {
            KeepStatus::Available => {
                self.items.push(candidate);
                Ok(())
            }
            KeepStatus::NotOperational => Err(KeepRejection::NotOperational),
            KeepStatus::AlreadyKept => Err(KeepRejection::AlreadyKept),
            KeepStatus::ListFull => Err(KeepRejection::ListFull),
        }
    }

    pub fn remove(&mut self, index: usize) -> Result<Candidate, KeepRejection> {
        if index >= self.items.len() {
            return Err(KeepRejection::OutOfRange);
        }
        Ok(self.items.remove(index))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|c| c.id == id)
    }

    pub fn items(&self) -> &[Candidate] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
