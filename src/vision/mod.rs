// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for sign recognition
//!
//! This module provides:
//! - Frame decoding from raw request bytes
//! - Grayscale 64x64 preprocessing with a catalog of normalization strategies
//! - The classifier inference adapter (ONNX Runtime, CPU only)
//! - Model loading with a placeholder fallback

pub mod classifier;
pub mod image_utils;
pub mod model_manager;
pub mod preprocessing;

pub use classifier::{InferenceError, OnnxSignClassifier, ScoreVector, SignClassifier};
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use model_manager::{
    ClassifierManager, ClassifierModelConfig, PLACEHOLDER_MODEL_VERSION,
};
pub use preprocessing::{NormalizationStrategy, PixelGrid, PreprocessError, INPUT_SHAPE};

#[cfg(test)]
pub use classifier::MockSignClassifier;
