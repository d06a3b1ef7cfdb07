// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Confidence-weighted smoothing over the last few frames
//!
//! Once the window is full, confidences are summed per class. The class with
//! the largest sum replaces the current frame only when that sum beats the
//! current confidence by the hysteresis factor (1.2 by default), so a marginal
//! majority never overrides the live frame.

use super::observation::{Observation, ObservationWindow};

#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    window: ObservationWindow,
    hysteresis: f32,
}

impl SmoothingFilter {
    pub fn new(capacity: usize, hysteresis: f32) -> Self {
        Self {
            window: ObservationWindow::new(capacity),
            hysteresis,
        }
    }

    /// Record a frame and return the (possibly overridden) class and confidence
    pub fn observe(&mut self, class_id: usize, confidence: f32) -> (usize, f32) {
        self.window.push(Observation::new(class_id, confidence));

        if !self.window.is_full() {
            return (class_id, confidence);
        }

        match self.weighted_vote() {
            Some((best_class, best_sum)) if best_sum > confidence * self.hysteresis => {
                (best_class, best_sum)
            }
            _ => (class_id, confidence),
        }
    }

    /// Class with the largest summed confidence; earliest-seen class wins ties
    fn weighted_vote(&self) -> Option<(usize, f32)> {
        let mut sums: Vec<(usize, f32)> = Vec::with_capacity(self.window.len());
        let mut total = 0.0f32;

        for observation in self.window.iter() {
            total += observation.confidence;
            match sums.iter_mut().find(|(class_id, _)| *class_id == observation.class_id) {
                Some((_, sum)) => *sum += observation.confidence,
                None => sums.push((observation.class_id, observation.confidence)),
            }
        }

        if total <= 0.0 {
            return None;
        }

        sums.into_iter().fold(None, |best, (class_id, sum)| match best {
            Some((_, best_sum)) if sum <= best_sum => best,
            _ => Some((class_id, sum)),
        })
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}
