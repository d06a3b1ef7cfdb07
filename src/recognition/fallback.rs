// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fallback preprocessing search
//!
//! When the primary result is below its acceptance threshold, every catalog
//! strategy is tried once, the primary's own included. The result with the highest raw confidence
//! wins; it must be strictly greater than the running best, so ties keep the
//! earlier result. A strategy that fails is recorded and skipped.

use serde::Serialize;
use tracing::{debug, warn};

use super::confidence::evaluate;
use crate::vision::{NormalizationStrategy, PixelGrid, SignClassifier};

/// A (class, confidence) result together with the strategy that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub strategy: NormalizationStrategy,
    pub output_shape: Vec<usize>,
}

/// One strategy tried during the search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackAttempt {
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_class: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    pub best: Candidate,
    pub attempts: Vec<FallbackAttempt>,
}

impl FallbackOutcome {
    /// Whether the search replaced the primary result
    pub fn improved_on(&self, primary: &Candidate) -> bool {
        self.best != *primary
    }
}

/// Retry the frame under every catalog strategy
///
/// Performs exactly `catalog.len()` inference calls.
/// Re-running the primary's strategy cannot replace it, since equal
/// confidence never wins.
pub fn improve(
    classifier: &dyn SignClassifier,
    grid: &PixelGrid,
    primary: Candidate,
) -> FallbackOutcome {
    let mut best = primary;
    let mut attempts = Vec::with_capacity(NormalizationStrategy::catalog().len());

    for &strategy in NormalizationStrategy::catalog() {
        let result = strategy
            .normalize(grid)
            .map_err(|e| e.to_string())
            .and_then(|tensor| classifier.infer(&tensor).map_err(|e| e.to_string()))
            .and_then(|output| {
                evaluate(&output)
                    .map(|eval| (eval, output.shape))
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok((eval, shape)) => {
                debug!(
                    "Fallback {}: class {} confidence {:.4}",
                    strategy.name(),
                    eval.predicted_class,
                    eval.raw_confidence
                );
                attempts.push(FallbackAttempt {
                    method: strategy.name(),
                    predicted_class: Some(eval.predicted_class),
                    confidence: Some(eval.raw_confidence),
                    error: None,
                });
                if eval.raw_confidence > best.confidence {
                    best = Candidate {
                        class_id: eval.predicted_class,
                        confidence: eval.raw_confidence,
                        strategy,
                        output_shape: shape,
                    };
                }
            }
            Err(e) => {
                warn!("Fallback {} failed: {}", strategy.name(), e);
                attempts.push(FallbackAttempt {
                    method: strategy.name(),
                    predicted_class: None,
                    confidence: None,
                    error: Some(e),
                });
            }
        }
    }

    FallbackOutcome { best, attempts }
}
