// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sign recognition API endpoint module
//!
//! Provides POST /api/sign/recognize, POST /api/sign/recognize-debug and
//! POST /api/sign/reset.

pub mod handler;
pub mod response;

pub use handler::{
    recognize_debug_handler, recognize_handler, reset_handler, session_id_from, SESSION_HEADER,
};
pub use response::{RecognizeDebugResponse, RecognizeResponse, ResetResponse};
