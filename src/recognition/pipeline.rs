// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition pipeline
//!
//! Per frame: default normalization, inference, confidence evaluation, hard
//! floor, smoothing, fallback search (only below the tier threshold), final
//! threshold check, stability gate and symbol lookup. All window state lives
//! in the caller's [`RecognitionStream`].

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::confidence::evaluate;
use super::fallback::{improve, Candidate, FallbackAttempt};
use super::stream::RecognitionStream;
use super::symbols::{SymbolTable, UNKNOWN_SYMBOL};
use crate::vision::{
    InferenceError, NormalizationStrategy, PixelGrid, PreprocessError, SignClassifier,
};

/// Faults that abort a single recognition
#[derive(Debug, Error)]
pub enum RecognitionFault {
    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("{0}")]
    Inference(#[from] InferenceError),
}

/// Why a frame was answered with the unknown symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Raw confidence under the hard floor; no window was touched
    ConfidenceBelowMinimum,
    /// Still under the tier threshold after smoothing and fallback
    ConfidenceBelowThreshold,
}

/// Diagnostics returned with every recognition
#[derive(Debug, Clone, Serialize)]
pub struct DebugTrace {
    pub preprocessing_method: &'static str,
    pub confidence_raw: f32,
    pub confidence_percent: f32,
    pub predicted_class: usize,
    pub model_output_shape: Vec<usize>,
    pub threshold_used: f32,
    pub is_stable: bool,
    pub last_stable_class: Option<usize>,
    pub stability_threshold: usize,
    pub prediction_history_length: usize,
    pub smoothing_window_length: usize,
    pub smoothed: bool,
    pub fallback_attempted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallback_attempts: Vec<FallbackAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

/// Outcome of one frame
#[derive(Debug, Clone)]
pub struct Recognition {
    /// Symbol to display
    pub text: String,
    /// Final (possibly smoothed or fallback) confidence
    pub confidence: f32,
    /// Final predicted class, which may differ from the displayed symbol
    pub class_id: usize,
    pub trace: DebugTrace,
}

impl Recognition {
    pub fn is_unknown(&self) -> bool {
        self.text == UNKNOWN_SYMBOL
    }
}

#[derive(Clone)]
pub struct RecognitionPipeline {
    classifier: Arc<dyn SignClassifier>,
    symbols: SymbolTable,
}

impl RecognitionPipeline {
    pub fn new(classifier: Arc<dyn SignClassifier>, symbols: SymbolTable) -> Self {
        Self {
            classifier,
            symbols,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Run one frame through the pipeline, updating `stream`
    pub fn recognize(
        &self,
        grid: &PixelGrid,
        stream: &mut RecognitionStream,
    ) -> Result<Recognition, RecognitionFault> {
        let strategy = NormalizationStrategy::default_strategy();
        let tensor = strategy.normalize(grid)?;
        let output = self.classifier.infer(&tensor)?;
        let primary = evaluate(&output)?;
        stream.touch();

        debug!(
            "Primary {}: class {} raw {:.4} ({:.2}%), threshold {}",
            strategy.name(),
            primary.predicted_class,
            primary.raw_confidence,
            primary.softmax_percent,
            primary.threshold()
        );

        let threshold = primary.threshold();
        let mut trace = DebugTrace {
            preprocessing_method: strategy.name(),
            confidence_raw: primary.raw_confidence,
            confidence_percent: primary.softmax_percent,
            predicted_class: primary.predicted_class,
            model_output_shape: output.shape.clone(),
            threshold_used: threshold,
            is_stable: false,
            last_stable_class: stream.last_stable_class(),
            stability_threshold: stream.gate.run_length(),
            prediction_history_length: stream.history_len(),
            smoothing_window_length: stream.smoothing_len(),
            smoothed: false,
            fallback_attempted: false,
            fallback_attempts: Vec::new(),
            reason: None,
        };

        if primary.raw_confidence < stream.gate.min_confidence() {
            debug!(
                "Confidence {:.4} below floor {}",
                primary.raw_confidence,
                stream.gate.min_confidence()
            );
            trace.reason = Some(RejectReason::ConfidenceBelowMinimum);
            return Ok(Recognition {
                text: UNKNOWN_SYMBOL.to_string(),
                confidence: primary.raw_confidence,
                class_id: primary.predicted_class,
                trace,
            });
        }

        let (class_id, confidence) = stream
            .smoother
            .observe(primary.predicted_class, primary.raw_confidence);
        trace.smoothed =
            class_id != primary.predicted_class || confidence != primary.raw_confidence;
        trace.smoothing_window_length = stream.smoothing_len();

        let mut best = Candidate {
            class_id,
            confidence,
            strategy,
            output_shape: output.shape,
        };

        if best.confidence < threshold {
            debug!(
                "Low confidence {:.4} < {}, trying alternative preprocessing",
                best.confidence, threshold
            );
            let outcome = improve(self.classifier.as_ref(), grid, best.clone());
            if outcome.improved_on(&best) {
                info!(
                    "Using {} preprocessing (confidence {:.4} -> {:.4})",
                    outcome.best.strategy.name(),
                    best.confidence,
                    outcome.best.confidence
                );
            }
            trace.fallback_attempted = true;
            trace.fallback_attempts = outcome.attempts;
            best = outcome.best;
        }

        trace.preprocessing_method = best.strategy.name();
        trace.confidence_raw = best.confidence;
        trace.predicted_class = best.class_id;
        trace.model_output_shape = best.output_shape;

        if best.confidence < threshold {
            debug!(
                "Final confidence {:.4} still below {}",
                best.confidence, threshold
            );
            trace.reason = Some(RejectReason::ConfidenceBelowThreshold);
            return Ok(Recognition {
                text: UNKNOWN_SYMBOL.to_string(),
                confidence: best.confidence,
                class_id: best.class_id,
                trace,
            });
        }

        let is_stable = stream.gate.check(best.class_id, best.confidence);
        let last_stable = stream.last_stable_class();

        let text = match (is_stable, last_stable) {
            (true, _) => self.symbols.glyph(best.class_id),
            (false, Some(stable_class)) => self.symbols.glyph(stable_class),
            (false, None) => UNKNOWN_SYMBOL,
        };

        if is_stable {
            debug!("Stable prediction {} (class {})", text, best.class_id);
        } else {
            debug!(
                "Unstable class {}, showing {} (last stable {:?})",
                best.class_id, text, last_stable
            );
        }

        trace.is_stable = is_stable;
        trace.last_stable_class = last_stable;
        trace.prediction_history_length = stream.history_len();

        Ok(Recognition {
            text: text.to_string(),
            confidence: best.confidence,
            class_id: best.class_id,
            trace,
        })
    }
}
