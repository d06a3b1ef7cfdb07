// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! Every flag can also be supplied through the environment (and therefore a
//! `.env` file loaded before parsing).

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::recognition::StreamStoreConfig;
use crate::vision::ClassifierModelConfig;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Tunables of the stabilization pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilizationConfig {
    /// Observations kept by the smoothing filter (B)
    pub smoothing_window: usize,
    /// Observations kept by the stability gate (H)
    pub stability_window: usize,
    /// Consecutive agreeing observations needed to stabilize (S)
    pub stability_threshold: usize,
    /// Hard floor on raw confidence
    pub min_confidence: f32,
    /// Smoothed sum must exceed this multiple of the current confidence
    pub smoothing_hysteresis: f32,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            stability_window: 10,
            stability_threshold: 3,
            min_confidence: 0.1,
            smoothing_hysteresis: 1.2,
        }
    }
}

impl StabilizationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smoothing_window == 0 {
            return Err(ConfigError::Invalid {
                field: "smoothing_window",
                message: "must be at least 1".to_string(),
            });
        }
        if self.stability_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "stability_threshold",
                message: "must be at least 1".to_string(),
            });
        }
        if self.stability_threshold > self.stability_window {
            return Err(ConfigError::Invalid {
                field: "stability_window",
                message: format!(
                    "{} cannot hold a run of {} observations",
                    self.stability_window, self.stability_threshold
                ),
            });
        }
        if self.min_confidence.is_nan() || self.min_confidence < 0.0 {
            return Err(ConfigError::Invalid {
                field: "min_confidence",
                message: "must be a non-negative number".to_string(),
            });
        }
        if self.smoothing_hysteresis.is_nan() || self.smoothing_hysteresis <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "smoothing_hysteresis",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Sila sign recognition node
#[derive(Parser, Debug, Clone)]
#[command(name = "sila-sign-node")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Real-time sign language recognition API", long_about = None)]
pub struct NodeConfig {
    /// Interface to listen on
    #[arg(long, env = "API_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "API_PORT", default_value_t = 8010)]
    pub port: u16,

    /// Path to the ONNX sign classifier
    #[arg(long, env = "MODEL_PATH", default_value = "assets/model.onnx")]
    pub model_path: String,

    /// Upper bound on one recognition request (decode + inference + fallback)
    #[arg(long, env = "INFERENCE_TIMEOUT_MS", default_value_t = 5000)]
    pub inference_timeout_ms: u64,

    /// Comma-separated allowed CORS origins ("*" allows any)
    #[arg(
        long,
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:8000,http://127.0.0.1:8000"
    )]
    pub cors_origins: Vec<String>,

    /// Maximum number of concurrent recognition streams
    #[arg(long, env = "MAX_STREAMS", default_value_t = 1000)]
    pub max_streams: usize,

    /// Seconds of inactivity after which a stream is dropped
    #[arg(long, env = "STREAM_IDLE_SECS", default_value_t = 300)]
    pub stream_idle_secs: u64,

    /// Seconds between expired-stream sweeps
    #[arg(long, env = "CLEANUP_INTERVAL_SECS", default_value_t = 60)]
    pub cleanup_interval_secs: u64,

    /// Smoothing window size
    #[arg(long, env = "SMOOTHING_WINDOW", default_value_t = 5)]
    pub smoothing_window: usize,

    /// Stability history size
    #[arg(long, env = "STABILITY_WINDOW", default_value_t = 10)]
    pub stability_window: usize,

    /// Consecutive predictions required before a symbol changes
    #[arg(long, env = "STABILITY_THRESHOLD", default_value_t = 3)]
    pub stability_threshold: usize,

    /// Minimum raw confidence for any prediction
    #[arg(long, env = "MIN_CONFIDENCE", default_value_t = 0.1)]
    pub min_confidence: f32,

    /// Required improvement factor before smoothing overrides a frame
    #[arg(long, env = "SMOOTHING_HYSTERESIS", default_value_t = 1.2)]
    pub smoothing_hysteresis: f32,
}

impl NodeConfig {
    /// Load `.env` (if present) and parse flags plus environment
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }

    pub fn stabilization(&self) -> StabilizationConfig {
        StabilizationConfig {
            smoothing_window: self.smoothing_window,
            stability_window: self.stability_window,
            stability_threshold: self.stability_threshold,
            min_confidence: self.min_confidence,
            smoothing_hysteresis: self.smoothing_hysteresis,
        }
    }

    pub fn stream_store(&self) -> StreamStoreConfig {
        StreamStoreConfig {
            max_streams: self.max_streams,
            idle_timeout_seconds: self.stream_idle_secs,
            cleanup_interval_seconds: self.cleanup_interval_secs,
        }
    }

    pub fn classifier_model(&self) -> ClassifierModelConfig {
        ClassifierModelConfig {
            model_path: Some(self.model_path.clone()),
            ..ClassifierModelConfig::default()
        }
    }

    /// Validate everything that clap cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inference_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "inference_timeout_ms",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_streams == 0 {
            return Err(ConfigError::Invalid {
                field: "max_streams",
                message: "must be at least 1".to_string(),
            });
        }
        self.stabilization().validate()
    }
}
