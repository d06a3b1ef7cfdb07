// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Recognition pipeline tests
//!
//! Drive `RecognitionPipeline::recognize` with scripted classifiers and check
//! smoothing, stability, floor and fallback behaviour across frames.

use ndarray::Array4;
use sila_sign_node::{
    recognition::{
        RecognitionPipeline, RecognitionStream, RejectReason, SymbolTable, UNKNOWN_SYMBOL,
    },
    vision::{InferenceError, PixelGrid, ScoreVector, SignClassifier},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn one_hot(len: usize, class_id: usize, confidence: f32) -> ScoreVector {
    let mut scores = vec![0.0; len];
    scores[class_id] = confidence;
    ScoreVector::from_scores(scores)
}

/// Answers frames in order; repeats the last answer once exhausted
struct SequenceClassifier {
    frames: Mutex<Vec<ScoreVector>>,
}

impl SequenceClassifier {
    fn new(frames: Vec<ScoreVector>) -> Self {
        let mut frames = frames;
        frames.reverse();
        Self {
            frames: Mutex::new(frames),
        }
    }
}

impl SignClassifier for SequenceClassifier {
    fn infer(&self, _input: &Array4<f32>) -> Result<ScoreVector, InferenceError> {
        let mut frames = self.frames.lock().unwrap();
        if frames.len() > 1 {
            Ok(frames.pop().unwrap())
        } else {
            frames.last().cloned().ok_or(InferenceError::EmptyOutput)
        }
    }

    fn num_classes(&self) -> usize {
        32
    }

    fn model_version(&self) -> String {
        "sequence".to_string()
    }
}

/// Answers by looking at the first normalized value, which tells the
/// strategies apart on a flat frame
struct StrategyClassifier {
    calls: AtomicUsize,
    respond: fn(f32) -> ScoreVector,
}

impl SignClassifier for StrategyClassifier {
    fn infer(&self, input: &Array4<f32>) -> Result<ScoreVector, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.respond)(input[[0, 0, 0, 0]]))
    }

    fn num_classes(&self) -> usize {
        32
    }

    fn model_version(&self) -> String {
        "strategy".to_string()
    }
}

fn pipeline(classifier: Arc<dyn SignClassifier>) -> RecognitionPipeline {
    RecognitionPipeline::new(classifier, SymbolTable::arabic())
}

#[test]
fn test_fallback_uses_better_strategy() {
    // Flat 200 frame: LinearSigned ~0.5686, ContrastCentered 0.5625
    let classifier = Arc::new(StrategyClassifier {
        calls: AtomicUsize::new(0),
        respond: |v| {
            if (v - 0.5686).abs() < 1e-3 {
                let mut scores = vec![-5.0; 32];
                scores[0] = 0.2;
                ScoreVector::from_scores(scores)
            } else if (v - 0.5625).abs() < 1e-3 {
                one_hot(32, 11, 0.75)
            } else {
                one_hot(32, 4, 0.15)
            }
        },
    });
    let pipeline = pipeline(classifier.clone());
    let mut stream = RecognitionStream::default();

    let result = pipeline
        .recognize(&PixelGrid::filled(200), &mut stream)
        .unwrap();

    assert_eq!(classifier.calls.load(Ordering::SeqCst), 7);
    assert_eq!(result.class_id, 11);
    assert_eq!(result.confidence, 0.75);
    assert_eq!(result.trace.preprocessing_method, "Enhanced [-1,1]");
    assert_eq!(result.trace.threshold_used, 0.5);
    assert!(result.trace.fallback_attempted);
    assert_eq!(result.trace.fallback_attempts.len(), 6);
    assert!(result.trace.reason.is_none());
}

#[test]
fn test_no_fallback_above_threshold() {
    let classifier = Arc::new(StrategyClassifier {
        calls: AtomicUsize::new(0),
        respond: |_| one_hot(32, 6, 0.9),
    });
    let pipeline = pipeline(classifier.clone());
    let mut stream = RecognitionStream::default();

    let result = pipeline
        .recognize(&PixelGrid::filled(30), &mut stream)
        .unwrap();
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    assert!(!result.trace.fallback_attempted);
    assert_eq!(result.trace.preprocessing_method, "Standard [-1,1]");
}

#[test]
fn test_smoothing_overrides_noisy_frame() {
    let mut frames = vec![one_hot(32, 2, 0.9); 5];
    frames.push(one_hot(32, 9, 0.5));
    let pipeline = pipeline(Arc::new(SequenceClassifier::new(frames)));
    let mut stream = RecognitionStream::default();
    let grid = PixelGrid::filled(100);

    for _ in 0..5 {
        pipeline.recognize(&grid, &mut stream).unwrap();
    }
    let noisy = pipeline.recognize(&grid, &mut stream).unwrap();

    assert_eq!(noisy.class_id, 2);
    assert!(noisy.trace.smoothed);
    // Four raw 0.9 frames of class 2 remain in the window
    assert!((noisy.confidence - 3.6).abs() < 1e-4);
    assert_eq!(noisy.text, "أ");
    assert_eq!(noisy.trace.smoothing_window_length, 5);
}

#[test]
fn test_single_interruption_resets_stability() {
    // A A A B A A A
    let frames = [0, 0, 0, 1, 0, 0, 0]
        .iter()
        .map(|&class_id| one_hot(32, class_id, 0.9))
        .collect();
    let pipeline = pipeline(Arc::new(SequenceClassifier::new(frames)));
    let mut stream = RecognitionStream::default();
    let grid = PixelGrid::filled(100);

    let stable: Vec<bool> = (0..7)
        .map(|_| pipeline.recognize(&grid, &mut stream).unwrap().trace.is_stable)
        .collect();
    assert_eq!(stable, vec![false, false, true, false, false, false, true]);
}

#[test]
fn test_unstable_frame_keeps_showing_last_symbol() {
    let frames = [0, 0, 0, 1]
        .iter()
        .map(|&class_id| one_hot(32, class_id, 0.9))
        .collect();
    let pipeline = pipeline(Arc::new(SequenceClassifier::new(frames)));
    let mut stream = RecognitionStream::default();
    let grid = PixelGrid::filled(100);

    for _ in 0..3 {
        pipeline.recognize(&grid, &mut stream).unwrap();
    }
    let interrupted = pipeline.recognize(&grid, &mut stream).unwrap();
    assert_eq!(interrupted.class_id, 1);
    assert_eq!(interrupted.text, "ع");
    assert!(!interrupted.is_unknown());
}

#[test]
fn test_floor_ignores_window_state() {
    let mut frames = vec![one_hot(32, 8, 0.9); 4];
    frames.push(one_hot(32, 8, 0.09));
    let pipeline = pipeline(Arc::new(SequenceClassifier::new(frames)));
    let mut stream = RecognitionStream::default();
    let grid = PixelGrid::filled(100);

    for _ in 0..4 {
        pipeline.recognize(&grid, &mut stream).unwrap();
    }
    assert_eq!(stream.last_stable_class(), Some(8));
    let weak = pipeline.recognize(&grid, &mut stream).unwrap();
    assert_eq!(weak.text, UNKNOWN_SYMBOL);
    assert_eq!(weak.trace.reason, Some(RejectReason::ConfidenceBelowMinimum));
    assert_eq!(weak.trace.last_stable_class, Some(8));
    assert_eq!(stream.history_len(), 4);
}

#[test]
fn test_unmapped_class_is_unknown() {
    // A model with more outputs than the symbol table
    let frames = vec![one_hot(40, 35, 0.9)];
    let pipeline = pipeline(Arc::new(SequenceClassifier::new(frames)));
    let mut stream = RecognitionStream::default();
    let grid = PixelGrid::filled(100);

    for _ in 0..2 {
        pipeline.recognize(&grid, &mut stream).unwrap();
    }
    let result = pipeline.recognize(&grid, &mut stream).unwrap();
    assert!(result.trace.is_stable);
    assert_eq!(result.class_id, 35);
    assert_eq!(result.text, UNKNOWN_SYMBOL);
}
