// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frame preprocessing for the sign classifier
//!
//! The classifier consumes a single-channel 64x64 tensor in NCHW layout
//! (`[1, 1, 64, 64]`). A decoded frame is first reduced to a [`PixelGrid`]
//! (grayscale + resize), then normalized by one of the catalog strategies.
//!
//! The catalog order is also the order in which the fallback search tries
//! alternatives when the default strategy yields a low-confidence result.

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Side length of the classifier input
pub const INPUT_SIZE: u32 = 64;

/// Number of samples in a pixel grid
pub const GRID_LEN: usize = (INPUT_SIZE * INPUT_SIZE) as usize;

/// Tensor shape expected by the classifier (batch, channel, height, width)
pub const INPUT_SHAPE: [usize; 4] = [1, 1, INPUT_SIZE as usize, INPUT_SIZE as usize];

/// Guard added to divisors that can collapse to zero on flat frames
const EPSILON: f32 = 1e-8;

/// Lower/upper percentiles used by the robust strategy
const ROBUST_LOW_PERCENTILE: f32 = 2.0;
const ROBUST_HIGH_PERCENTILE: f32 = 98.0;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("pixel grid has {actual} samples, expected {expected}")]
    GridSize { expected: usize, actual: usize },

    #[error("{strategy} produced a non-finite value at index {index}")]
    NonFinite { strategy: &'static str, index: usize },

    #[error("failed to build input tensor: {0}")]
    Shape(String),
}

/// 64x64 grayscale samples in row-major order, values in `0..=255`
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    samples: Vec<f32>,
}

impl PixelGrid {
    /// Convert a decoded frame to grayscale and resize it to the input size
    pub fn from_image(image: &DynamicImage) -> Self {
        let gray = image.to_luma8();
        let resized = image::imageops::resize(&gray, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

        Self {
            samples: resized.as_raw().iter().map(|&p| p as f32).collect(),
        }
    }

    /// Build a grid from raw row-major grayscale samples
    pub fn from_samples(samples: Vec<u8>) -> Result<Self, PreprocessError> {
        if samples.len() != GRID_LEN {
            return Err(PreprocessError::GridSize {
                expected: GRID_LEN,
                actual: samples.len(),
            });
        }

        Ok(Self {
            samples: samples.into_iter().map(|p| p as f32).collect(),
        })
    }

    /// A flat grid where every sample has the same value
    pub fn filled(value: u8) -> Self {
        Self {
            samples: vec![value as f32; GRID_LEN],
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    fn mean(&self) -> f32 {
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    /// Population standard deviation
    fn std_dev(&self, mean: f32) -> f32 {
        let variance = self
            .samples
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f32>()
            / self.samples.len() as f32;
        variance.sqrt()
    }

    fn min_max(&self) -> (f32, f32) {
        self.samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Percentile with linear interpolation between closest ranks
    fn percentile(sorted: &[f32], percent: f32) -> f32 {
        let rank = percent / 100.0 * (sorted.len() - 1) as f32;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let weight = rank - lower as f32;
        sorted[lower] + (sorted[upper] - sorted[lower]) * weight
    }
}

/// Input normalization strategies, in fallback search order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationStrategy {
    /// `x / 255`
    Linear01,
    /// `(x / 255 - 0.5) / 0.5`
    LinearSigned,
    /// `(x - mean) / (std + eps)`
    ZScore,
    /// `2 * (x - min) / (max - min + eps) - 1`
    MinMax,
    /// `clip((x - p2) / (p98 - p2), 0, 1)`
    RobustPercentile,
    /// `clip((x - 128) / 128, -1, 1)`
    ContrastCentered,
}

impl NormalizationStrategy {
    pub const CATALOG: [NormalizationStrategy; 6] = [
        NormalizationStrategy::Linear01,
        NormalizationStrategy::LinearSigned,
        NormalizationStrategy::ZScore,
        NormalizationStrategy::MinMax,
        NormalizationStrategy::RobustPercentile,
        NormalizationStrategy::ContrastCentered,
    ];

    /// All strategies in fallback search priority order
    pub fn catalog() -> &'static [NormalizationStrategy] {
        &Self::CATALOG
    }

    /// Strategy tried first, before any fallback
    pub fn default_strategy() -> Self {
        NormalizationStrategy::LinearSigned
    }

    /// Display name reported in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            NormalizationStrategy::Linear01 => "Standard [0,1]",
            NormalizationStrategy::LinearSigned => "Standard [-1,1]",
            NormalizationStrategy::ZScore => "Z-score",
            NormalizationStrategy::MinMax => "Min-max [-1,1]",
            NormalizationStrategy::RobustPercentile => "Robust [0,1]",
            NormalizationStrategy::ContrastCentered => "Enhanced [-1,1]",
        }
    }

    /// Normalize a grid into a `[1, 1, 64, 64]` tensor
    ///
    /// Flat frames (zero variance or range) never divide by zero; the guarded
    /// divisor maps them to a constant tensor.
    pub fn normalize(&self, grid: &PixelGrid) -> Result<Array4<f32>, PreprocessError> {
        let samples = grid.samples();

        let values: Vec<f32> = match self {
            NormalizationStrategy::Linear01 => samples.iter().map(|v| v / 255.0).collect(),
            NormalizationStrategy::LinearSigned => {
                samples.iter().map(|v| (v / 255.0 - 0.5) / 0.5).collect()
            }
            NormalizationStrategy::ZScore => {
                let mean = grid.mean();
                let std = grid.std_dev(mean);
                samples.iter().map(|v| (v - mean) / (std + EPSILON)).collect()
            }
            NormalizationStrategy::MinMax => {
                let (min, max) = grid.min_max();
                samples
                    .iter()
                    .map(|v| 2.0 * (v - min) / (max - min + EPSILON) - 1.0)
                    .collect()
            }
            NormalizationStrategy::RobustPercentile => {
                let mut sorted = samples.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let low = PixelGrid::percentile(&sorted, ROBUST_LOW_PERCENTILE);
                let high = PixelGrid::percentile(&sorted, ROBUST_HIGH_PERCENTILE);
                let range = (high - low).max(EPSILON);
                samples
                    .iter()
                    .map(|v| ((v - low) / range).clamp(0.0, 1.0))
                    .collect()
            }
            NormalizationStrategy::ContrastCentered => samples
                .iter()
                .map(|v| ((v - 128.0) / 128.0).clamp(-1.0, 1.0))
                .collect(),
        };

        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(PreprocessError::NonFinite {
                strategy: self.name(),
                index,
            });
        }

        Array4::from_shape_vec(
            (INPUT_SHAPE[0], INPUT_SHAPE[1], INPUT_SHAPE[2], INPUT_SHAPE[3]),
            values,
        )
        .map_err(|e| PreprocessError::Shape(e.to_string()))
    }
}

impl Default for NormalizationStrategy {
    fn default() -> Self {
        Self::default_strategy()
    }
}

impl fmt::Display for NormalizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
