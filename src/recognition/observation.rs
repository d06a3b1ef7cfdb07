// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::Serialize;
use std::collections::VecDeque;

/// One (class, confidence) pair from a processed frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub class_id: usize,
    /// Raw classifier score, not a probability
    pub confidence: f32,
}

impl Observation {
    pub fn new(class_id: usize, confidence: f32) -> Self {
        Self {
            class_id,
            confidence,
        }
    }
}

/// Fixed-capacity FIFO of recent observations
///
/// Pushing beyond capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct ObservationWindow {
    entries: VecDeque<Observation>,
    capacity: usize,
}

impl ObservationWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, observation: Observation) {
        self.entries.push_back(observation);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Observation> + '_ {
        self.entries.iter()
    }

    /// The newest `n` entries, oldest first. `None` when fewer are buffered.
    pub fn last_n(&self, n: usize) -> Option<impl Iterator<Item = &Observation> + '_> {
        if self.entries.len() < n {
            return None;
        }
        Some(self.entries.iter().skip(self.entries.len() - n))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
