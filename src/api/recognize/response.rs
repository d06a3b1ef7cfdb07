// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sign recognition response types

use serde::Serialize;

use crate::recognition::{DebugTrace, Recognition, SymbolTable, UNKNOWN_SYMBOL};
use crate::vision::PLACEHOLDER_MODEL_VERSION;

/// Confidence reported for placeholder answers
pub const PLACEHOLDER_CONFIDENCE: f32 = 0.85;

/// Number of payload bytes echoed by the debug endpoint
pub const DEBUG_PREFIX_LEN: usize = 100;

/// Content type reported when the request carries none
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

const DEBUG_MESSAGE: &str = "Debug info - check if image data is being received correctly";

/// Response from POST /api/sign/recognize
#[derive(Debug, Clone, Serialize)]
pub struct RecognizeResponse {
    /// Symbol to display
    pub text: String,
    /// Final raw confidence (not a probability)
    pub confidence: f32,
    /// Predicted class, `-1` when inference failed
    pub class: i64,
    /// Diagnostics, absent for placeholder and fault responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTrace>,
    /// Inference fault message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub model_version: String,
    /// True when no classifier is loaded
    pub placeholder: bool,
    /// Stream the frame was applied to
    pub session_id: String,
}

impl RecognizeResponse {
    pub fn from_recognition(
        recognition: Recognition,
        model_version: String,
        session_id: String,
    ) -> Self {
        Self {
            text: recognition.text,
            confidence: recognition.confidence,
            class: recognition.class_id as i64,
            debug: Some(recognition.trace),
            error: None,
            model_version,
            placeholder: false,
            session_id,
        }
    }

    /// Random symbol name served while no classifier is loaded
    pub fn placeholder(symbols: &SymbolTable, session_id: String) -> Self {
        let (text, class) = match symbols.random() {
            Some((class_id, symbol)) => (symbol.name.to_string(), class_id as i64),
            None => (UNKNOWN_SYMBOL.to_string(), -1),
        };

        Self {
            text,
            confidence: PLACEHOLDER_CONFIDENCE,
            class,
            debug: None,
            error: None,
            model_version: PLACEHOLDER_MODEL_VERSION.to_string(),
            placeholder: true,
            session_id,
        }
    }

    /// Unknown result for a frame whose inference failed
    pub fn inference_failed(
        message: impl std::fmt::Display,
        model_version: String,
        session_id: String,
    ) -> Self {
        Self {
            text: UNKNOWN_SYMBOL.to_string(),
            confidence: 0.0,
            class: -1,
            debug: None,
            error: Some(format!("Model inference failed: {}", message)),
            model_version,
            placeholder: false,
            session_id,
        }
    }
}

/// Response from POST /api/sign/recognize-debug
#[derive(Debug, Clone, Serialize)]
pub struct RecognizeDebugResponse {
    pub received_bytes: usize,
    pub content_type: String,
    /// Escaped rendering of the first bytes of the payload
    pub first_100_bytes: String,
    pub message: String,
}

impl RecognizeDebugResponse {
    pub fn new(body: &[u8], content_type: Option<&str>) -> Self {
        Self {
            received_bytes: body.len(),
            content_type: content_type.unwrap_or(UNKNOWN_CONTENT_TYPE).to_string(),
            first_100_bytes: escape_prefix(body, DEBUG_PREFIX_LEN),
            message: DEBUG_MESSAGE.to_string(),
        }
    }
}

/// Response from POST /api/sign/reset
#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    /// False when the stream did not exist
    pub reset: bool,
}

/// ASCII-escape up to `len` leading bytes
pub fn escape_prefix(bytes: &[u8], len: usize) -> String {
    bytes
        .iter()
        .take(len)
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect()
}
