// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Sila sign recognition node

/// Full version string with feature description
pub const VERSION: &str = "v1.2.0-stream-sessions-2026-10-15";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.2.0";

/// Major version number
pub const VERSION_MAJOR: u32 = 1;

/// Minor version number
pub const VERSION_MINOR: u32 = 2;

/// Patch version number
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2026-10-15";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "sign-recognition",
    "prediction-smoothing",
    "stability-gate",
    "adaptive-threshold",
    "fallback-preprocessing",
    "stream-sessions",
    "placeholder-mode",
];

/// Breaking changes from previous version
pub const BREAKING_CHANGES: &[&str] = &[
    "Stabilization state is now scoped per stream (X-Session-Id header); requests without the header share the default stream",
    "Frames rejected by the minimum-confidence floor no longer enter the smoothing window",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Sila Sign Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
        "breaking_changes": BREAKING_CHANGES,
    })
}
