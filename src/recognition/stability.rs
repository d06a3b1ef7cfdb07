// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Stability gate
//!
//! A class is surfaced only after the last `run_length` observations agree on
//! it. The last stabilized class is remembered and only ever replaced by
//! another stabilized class, never by confidence alone.

use serde::Serialize;

use super::observation::{Observation, ObservationWindow};

/// What a single `check` did to the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityOutcome {
    /// A new class just stabilized (state transition)
    NewlyStable,
    /// The stable class was confirmed again
    Steady,
    /// Confidence under the hard floor
    BelowFloor,
    /// Fewer observations than the run length
    InsufficientHistory,
    /// Recent observations disagree
    Unstable,
}

impl StabilityOutcome {
    pub fn is_stable(&self) -> bool {
        matches!(self, StabilityOutcome::NewlyStable | StabilityOutcome::Steady)
    }
}

#[derive(Debug, Clone)]
pub struct StabilityGate {
    history: ObservationWindow,
    run_length: usize,
    min_confidence: f32,
    last_stable_class: Option<usize>,
}

impl StabilityGate {
    pub fn new(history_capacity: usize, run_length: usize, min_confidence: f32) -> Self {
        Self {
            history: ObservationWindow::new(history_capacity),
            run_length,
            min_confidence,
            last_stable_class: None,
        }
    }

    /// Record a frame and report whether `class_id` is currently stable
    pub fn check(&mut self, class_id: usize, confidence: f32) -> bool {
        self.evaluate(class_id, confidence).is_stable()
    }

    /// Like [`check`](Self::check) but says why
    pub fn evaluate(&mut self, class_id: usize, confidence: f32) -> StabilityOutcome {
        self.history.push(Observation::new(class_id, confidence));

        if confidence < self.min_confidence {
            return StabilityOutcome::BelowFloor;
        }

        let Some(mut recent) = self.history.last_n(self.run_length) else {
            return StabilityOutcome::InsufficientHistory;
        };

        if !recent.all(|o| o.class_id == class_id) {
            return StabilityOutcome::Unstable;
        }

        if self.last_stable_class == Some(class_id) {
            StabilityOutcome::Steady
        } else {
            self.last_stable_class = Some(class_id);
            StabilityOutcome::NewlyStable
        }
    }

    pub fn last_stable_class(&self) -> Option<usize> {
        self.last_stable_class
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn run_length(&self) -> usize {
        self.run_length
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// Forget history and the stable class
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_stable_class = None;
    }
}
