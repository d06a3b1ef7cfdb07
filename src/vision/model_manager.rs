// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Classifier model manager
//!
//! Loads the sign classifier once at start-up. A missing or broken model does
//! not stop the node: it keeps serving in placeholder mode, where recognition
//! answers with a random symbol name instead of running inference.

use rand::Rng;
use std::sync::Arc;

use crate::vision::classifier::{OnnxSignClassifier, SignClassifier};
use crate::vision::preprocessing::{NormalizationStrategy, PixelGrid, GRID_LEN};

/// Model version reported while no classifier is loaded
pub const PLACEHOLDER_MODEL_VERSION: &str = "placeholder";

/// Configuration for loading the classifier
#[derive(Debug, Clone)]
pub struct ClassifierModelConfig {
    /// Path to the ONNX model (optional)
    pub model_path: Option<String>,
    /// Number of classes the model scores
    pub num_classes: usize,
}

impl Default for ClassifierModelConfig {
    fn default() -> Self {
        Self {
            model_path: Some("assets/model.onnx".to_string()),
            num_classes: crate::recognition::SymbolTable::arabic().len(),
        }
    }
}

/// Holds the loaded classifier, or nothing in placeholder mode
#[derive(Clone, Default)]
pub struct ClassifierManager {
    classifier: Option<Arc<dyn SignClassifier>>,
}

impl ClassifierManager {
    /// Load the classifier described by `config`
    ///
    /// Load failures are logged and leave the manager in placeholder mode.
    pub async fn new(config: ClassifierModelConfig) -> Self {
        let Some(ref path) = config.model_path else {
            tracing::warn!("⚠️ No classifier model configured, serving placeholder results");
            return Self::placeholder();
        };

        match OnnxSignClassifier::new(path, config.num_classes).await {
            Ok(model) => {
                tracing::info!("✅ Sign classifier loaded from {}", path);
                let manager = Self::with_classifier(Arc::new(model));
                if !manager.validate_model() {
                    tracing::warn!("⚠️ Model validation failed, but continuing...");
                }
                manager
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Failed to load sign classifier from {}: {:#}. Serving placeholder results",
                    path,
                    e
                );
                Self::placeholder()
            }
        }
    }

    /// Manager wrapping an already constructed classifier
    pub fn with_classifier(classifier: Arc<dyn SignClassifier>) -> Self {
        Self {
            classifier: Some(classifier),
        }
    }

    /// Manager with no classifier
    pub fn placeholder() -> Self {
        Self { classifier: None }
    }

    pub fn classifier(&self) -> Option<Arc<dyn SignClassifier>> {
        self.classifier.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn model_version(&self) -> String {
        self.classifier
            .as_ref()
            .map(|c| c.model_version())
            .unwrap_or_else(|| PLACEHOLDER_MODEL_VERSION.to_string())
    }

    /// Push a random frame through the default strategy and the classifier
    ///
    /// Logs the output shape and value range. Returns `false` on any failure.
    pub fn validate_model(&self) -> bool {
        let Some(classifier) = self.classifier.as_ref() else {
            return false;
        };

        tracing::info!("🔍 Validating model...");

        let mut rng = rand::thread_rng();
        let samples: Vec<u8> = (0..GRID_LEN).map(|_| rng.gen()).collect();
        let tensor = match PixelGrid::from_samples(samples)
            .and_then(|grid| NormalizationStrategy::default_strategy().normalize(&grid))
        {
            Ok(tensor) => tensor,
            Err(e) => {
                tracing::warn!("❌ Model validation preprocessing failed: {}", e);
                return false;
            }
        };

        match classifier.infer(&tensor) {
            Ok(output) if output.len() != classifier.num_classes() => {
                tracing::warn!(
                    "❌ Model validation failed: {} scores for {} classes",
                    output.len(),
                    classifier.num_classes()
                );
                false
            }
            Ok(output) => {
                let (lo, hi) = output
                    .scores
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    });
                tracing::info!(
                    "✅ Inference test passed: input {:?}, output {:?}, range [{:.4}, {:.4}]",
                    tensor.shape(),
                    output.shape,
                    lo,
                    hi
                );
                true
            }
            Err(e) => {
                tracing::warn!("❌ Model validation failed: {}", e);
                false
            }
        }
    }
}
