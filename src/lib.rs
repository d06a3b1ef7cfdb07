// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod recognition;
pub mod version;
pub mod vision;

pub use config::{NodeConfig, StabilizationConfig};
pub use recognition::{Recognition, RecognitionPipeline, RecognitionStream, StreamStore};
pub use vision::{ClassifierManager, SignClassifier};
