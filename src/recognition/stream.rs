// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-client recognition state
//!
//! A stream owns the smoothing window, the stability history and the last
//! stable class for one client. Frames from different clients never share
//! windows.

use std::time::{Duration, Instant};

use super::smoothing::SmoothingFilter;
use super::stability::StabilityGate;
use crate::config::StabilizationConfig;

#[derive(Debug, Clone)]
pub struct RecognitionStream {
    pub(crate) smoother: SmoothingFilter,
    pub(crate) gate: StabilityGate,
    frames_processed: u64,
    created_at: Instant,
    last_activity: Instant,
}

impl RecognitionStream {
    pub fn new(config: &StabilizationConfig) -> Self {
        let now = Instant::now();
        Self {
            smoother: SmoothingFilter::new(config.smoothing_window, config.smoothing_hysteresis),
            gate: StabilityGate::new(
                config.stability_window,
                config.stability_threshold,
                config.min_confidence,
            ),
            frames_processed: 0,
            created_at: now,
            last_activity: now,
        }
    }

    /// Mark a frame as handled by this stream
    pub fn touch(&mut self) {
        self.frames_processed += 1;
        self.last_activity = Instant::now();
    }

    pub fn last_stable_class(&self) -> Option<usize> {
        self.gate.last_stable_class()
    }

    pub fn smoothing_len(&self) -> usize {
        self.smoother.len()
    }

    pub fn history_len(&self) -> usize {
        self.gate.history_len()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn is_expired(&self, idle_timeout: Duration) -> bool {
        self.idle_for() > idle_timeout
    }

    /// Clear both windows and forget the stable class
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.gate.reset();
        self.last_activity = Instant::now();
    }
}

impl Default for RecognitionStream {
    fn default() -> Self {
        Self::new(&StabilizationConfig::default())
    }
}
