// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Confidence evaluation and threshold tiering
//!
//! The tier is chosen from the softmax percentage, but the threshold it
//! selects is compared against the *raw* classifier score.

use serde::Serialize;

use crate::vision::{InferenceError, ScoreVector};

/// Softmax percentage below which a frame is in the low tier
pub const LOW_TIER_CEILING: f32 = 20.0;
/// Softmax percentage below which a frame is in the medium tier
pub const MEDIUM_TIER_CEILING: f32 = 50.0;

/// Acceptance threshold bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// `< 20` is low, `20..50` medium, `>= 50` high
    pub fn from_percent(softmax_percent: f32) -> Self {
        if softmax_percent < LOW_TIER_CEILING {
            ConfidenceTier::Low
        } else if softmax_percent < MEDIUM_TIER_CEILING {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::High
        }
    }

    /// Minimum raw confidence accepted in this tier
    pub fn threshold(&self) -> f32 {
        match self {
            ConfidenceTier::Low => 0.1,
            ConfidenceTier::Medium => 0.3,
            ConfidenceTier::High => 0.5,
        }
    }
}

/// Result of evaluating one score vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Index of the maximum raw score (first wins on ties)
    pub predicted_class: usize,
    /// The maximum raw score itself
    pub raw_confidence: f32,
    /// `100 * softmax(scores)[predicted_class]`
    pub softmax_percent: f32,
    pub tier: ConfidenceTier,
}

impl Evaluation {
    pub fn threshold(&self) -> f32 {
        self.tier.threshold()
    }
}

/// Numerically stable softmax (scores shifted by their maximum)
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Argmax, raw confidence, softmax percent and tier for a score vector
pub fn evaluate(output: &ScoreVector) -> Result<Evaluation, InferenceError> {
    if let Some(class_id) = output.scores.iter().position(|s| !s.is_finite()) {
        return Err(InferenceError::NonFiniteScore(class_id));
    }

    let (predicted_class, raw_confidence) = output
        .scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, score)| match best {
            Some((_, best_score)) if score <= best_score => best,
            _ => Some((i, score)),
        })
        .ok_or(InferenceError::EmptyOutput)?;

    let softmax_percent = softmax(&output.scores)[predicted_class] * 100.0;

    Ok(Evaluation {
        predicted_class,
        raw_confidence,
        softmax_percent,
        tier: ConfidenceTier::from_percent(softmax_percent),
    })
}
