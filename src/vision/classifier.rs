// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sign classifier inference adapter
//!
//! Wraps the pre-trained fingerspelling classifier. The adapter is a black
//! box: tensor in, one raw score per class out. It never retries; the
//! fallback search varies the input instead.

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::preprocessing::INPUT_SHAPE;

/// Inference failures surfaced to the pipeline
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InferenceError {
    #[error("invalid input shape {actual:?}, expected {expected:?}")]
    InputShape {
        expected: [usize; 4],
        actual: Vec<usize>,
    },

    #[error("model returned {actual} scores, expected {expected}")]
    OutputLength { expected: usize, actual: usize },

    #[error("model returned an empty score vector")]
    EmptyOutput,

    #[error("model returned a non-finite score for class {0}")]
    NonFiniteScore(usize),

    #[error("inference runtime error: {0}")]
    Runtime(String),

    #[error("inference timed out after {0:?}")]
    Timeout(Duration),
}

/// Raw classifier output for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
    /// One raw score per class, in class-id order
    pub scores: Vec<f32>,
    /// Shape of the output tensor as reported by the model (e.g. `[1, 32]`)
    pub shape: Vec<usize>,
}

impl ScoreVector {
    /// Wrap a flat score list as a `[1, N]` output
    pub fn from_scores(scores: Vec<f32>) -> Self {
        let shape = vec![1, scores.len()];
        Self { scores, shape }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Opaque classifier: preprocessed tensor in, raw score vector out
#[cfg_attr(test, mockall::automock)]
pub trait SignClassifier: Send + Sync {
    /// Run one forward pass over a `[1, 1, 64, 64]` tensor
    fn infer(&self, input: &Array4<f32>) -> Result<ScoreVector, InferenceError>;

    /// Number of classes in the score vector
    fn num_classes(&self) -> usize;

    /// Identifier reported to clients as `model_version`
    fn model_version(&self) -> String;
}

/// Check a tensor against the classifier input shape
pub fn validate_input_shape(input: &Array4<f32>) -> Result<(), InferenceError> {
    if input.shape() != INPUT_SHAPE {
        return Err(InferenceError::InputShape {
            expected: INPUT_SHAPE,
            actual: input.shape().to_vec(),
        });
    }
    Ok(())
}

/// ONNX Runtime classifier (CPU only)
#[derive(Clone)]
pub struct OnnxSignClassifier {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Number of classes the model scores
    num_classes: usize,
    /// Model file stem, used as the reported version
    model_version: String,
}

impl std::fmt::Debug for OnnxSignClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSignClassifier")
            .field("input_name", &self.input_name)
            .field("num_classes", &self.num_classes)
            .field("model_version", &self.model_version)
            .finish_non_exhaustive()
    }
}

impl OnnxSignClassifier {
    /// Load the classifier from an ONNX file
    ///
    /// # Errors
    /// Returns error if the file does not exist or ONNX Runtime rejects it.
    pub async fn new<P: AsRef<Path>>(model_path: P, num_classes: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Sign classifier model not found: {}", model_path.display());
        }

        info!("Loading sign classifier from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load sign classifier from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        if let Some(input) = session.inputs.first() {
            info!("Classifier expected input: {:?}", input.input_type);
        }

        let model_version = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!("✅ Sign classifier loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            num_classes,
            model_version,
        })
    }
}

impl SignClassifier for OnnxSignClassifier {
    fn infer(&self, input: &Array4<f32>) -> Result<ScoreVector, InferenceError> {
        validate_input_shape(input)?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        let input_value = Value::from_array(input.to_owned())
            .map_err(|e| InferenceError::Runtime(format!("Failed to create input tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| InferenceError::Runtime(e.to_string()))?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| InferenceError::Runtime(format!("Failed to extract output tensor: {}", e)))?;

        let shape = output_tensor.shape().to_vec();
        let scores: Vec<f32> = output_tensor.iter().copied().collect();
        debug!("Classifier output shape: {:?}", shape);

        if scores.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        if scores.len() != self.num_classes {
            return Err(InferenceError::OutputLength {
                expected: self.num_classes,
                actual: scores.len(),
            });
        }

        Ok(ScoreVector { scores, shape })
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn model_version(&self) -> String {
        self.model_version.clone()
    }
}
