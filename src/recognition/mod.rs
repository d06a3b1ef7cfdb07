// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction stabilization
//!
//! Turns a stream of per-frame classifier outputs into a debounced symbol
//! stream:
//! - Confidence evaluation and threshold tiering
//! - Confidence-weighted smoothing over the last few frames
//! - Fallback preprocessing search for low-confidence frames
//! - A stability gate that only surfaces agreeing runs
//! - Per-client stream state and its store

pub mod confidence;
pub mod fallback;
pub mod observation;
pub mod pipeline;
pub mod session_store;
pub mod smoothing;
pub mod stability;
pub mod stream;
pub mod symbols;

pub use confidence::{evaluate, softmax, ConfidenceTier, Evaluation};
pub use fallback::{improve, Candidate, FallbackAttempt, FallbackOutcome};
pub use observation::{Observation, ObservationWindow};
pub use pipeline::{DebugTrace, Recognition, RecognitionFault, RecognitionPipeline, RejectReason};
pub use session_store::{
    SharedStream, StoreMetrics, StreamStore, StreamStoreConfig, StreamStoreError,
    DEFAULT_STREAM_ID,
};
pub use smoothing::SmoothingFilter;
pub use stability::{StabilityGate, StabilityOutcome};
pub use stream::RecognitionStream;
pub use symbols::{SignSymbol, SymbolTable, UNKNOWN_SYMBOL};
