// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Recognition endpoint tests for POST /api/sign/recognize
//!
//! These tests drive the full router with `oneshot` and verify that:
//! - Empty bodies and malformed images are rejected
//! - Placeholder mode answers 200 with a random symbol name
//! - Three agreeing frames surface a symbol, per session
//! - Inference faults and timeouts answer 200 with the unknown symbol
//! - Streams can be reset and are capped

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use serde_json::Value;
use sila_sign_node::{
    api::http_server::{create_app, AppState},
    config::StabilizationConfig,
    recognition::{StreamStore, StreamStoreConfig, UNKNOWN_SYMBOL},
    vision::{InferenceError, ScoreVector, SignClassifier},
};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`

/// Always predicts one class with a fixed raw score
struct FixedClassifier {
    class_id: usize,
    confidence: f32,
}

impl SignClassifier for FixedClassifier {
    fn infer(&self, _input: &Array4<f32>) -> Result<ScoreVector, InferenceError> {
        let mut scores = vec![0.0; 32];
        scores[self.class_id] = self.confidence;
        Ok(ScoreVector::from_scores(scores))
    }

    fn num_classes(&self) -> usize {
        32
    }

    fn model_version(&self) -> String {
        "fixed-test".to_string()
    }
}

/// Fails every inference
struct BrokenClassifier;

impl SignClassifier for BrokenClassifier {
    fn infer(&self, _input: &Array4<f32>) -> Result<ScoreVector, InferenceError> {
        Err(InferenceError::OutputLength {
            expected: 32,
            actual: 7,
        })
    }

    fn num_classes(&self) -> usize {
        32
    }

    fn model_version(&self) -> String {
        "broken-test".to_string()
    }
}

/// Takes longer than the request timeout
struct SlowClassifier;

impl SignClassifier for SlowClassifier {
    fn infer(&self, _input: &Array4<f32>) -> Result<ScoreVector, InferenceError> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(ScoreVector::from_scores(vec![0.9; 32]))
    }

    fn num_classes(&self) -> usize {
        32
    }

    fn model_version(&self) -> String {
        "slow-test".to_string()
    }
}

fn png_frame(gray: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(48, 48, Rgb([gray, gray, gray]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn state_with(classifier: Arc<dyn SignClassifier>) -> Arc<AppState> {
    Arc::new(AppState::new_for_test().with_classifier(classifier))
}

fn recognize_request(body: Vec<u8>, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/sign/recognize")
        .header("content-type", "application/octet-stream");
    if let Some(session) = session {
        builder = builder.header("x-session-id", session);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = create_app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[cfg(test)]
mod recognize_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_body_returns_400() {
        let state = Arc::new(AppState::new_for_test());
        let (status, json) = send(&state, recognize_request(Vec::new(), None)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No image data received");
        assert_eq!(json["session_id"], "default");
    }

    #[tokio::test]
    async fn test_placeholder_mode_returns_symbol_name() {
        let state = Arc::new(AppState::new_for_test());
        let (status, json) = send(&state, recognize_request(png_frame(128), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["placeholder"], true);
        assert_eq!(json["model_version"], "placeholder");
        assert!((json["confidence"].as_f64().unwrap() - 0.85).abs() < 1e-6);

        let class = json["class"].as_i64().unwrap();
        assert!((0..32).contains(&class));
        assert!(!json["text"].as_str().unwrap().is_empty());
        assert!(json.get("debug").is_none());
    }

    #[tokio::test]
    async fn test_malformed_image_returns_500() {
        let state = Arc::new(AppState::new_for_test());
        let (status, json) = send(
            &state,
            recognize_request(b"definitely not an image".to_vec(), None),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().starts_with("Internal server error"));
    }

    #[tokio::test]
    async fn test_truncated_png_returns_500_with_model_loaded() {
        let state = state_with(Arc::new(FixedClassifier {
            class_id: 3,
            confidence: 0.9,
        }));
        let mut frame = png_frame(90);
        frame.truncate(20);

        let (status, json) = send(&state, recognize_request(frame, None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error_type"], "decode_error");
    }

    #[tokio::test]
    async fn test_three_agreeing_frames_stabilize() {
        let state = state_with(Arc::new(FixedClassifier {
            class_id: 3,
            confidence: 0.9,
        }));

        let (_, first) = send(&state, recognize_request(png_frame(200), None)).await;
        assert_eq!(first["text"], UNKNOWN_SYMBOL);
        assert_eq!(first["class"], 3);
        assert_eq!(first["debug"]["is_stable"], false);
        assert_eq!(first["debug"]["preprocessing_method"], "Standard [-1,1]");

        send(&state, recognize_request(png_frame(200), None)).await;
        let (status, third) = send(&state, recognize_request(png_frame(200), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(third["text"], "ب");
        assert_eq!(third["model_version"], "fixed-test");
        assert_eq!(third["placeholder"], false);
        assert_eq!(third["debug"]["is_stable"], true);
        assert_eq!(third["debug"]["last_stable_class"], 3);
        assert_eq!(third["debug"]["stability_threshold"], 3);
        assert_eq!(third["debug"]["prediction_history_length"], 3);
        assert_eq!(third["debug"]["model_output_shape"], serde_json::json!([1, 32]));
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_windows() {
        let state = state_with(Arc::new(FixedClassifier {
            class_id: 17,
            confidence: 0.9,
        }));

        for _ in 0..3 {
            send(&state, recognize_request(png_frame(40), Some("tab-a"))).await;
        }
        let (_, a) = send(&state, recognize_request(png_frame(40), Some("tab-a"))).await;
        let (_, b) = send(&state, recognize_request(png_frame(40), Some("tab-b"))).await;

        assert_eq!(a["text"], "م");
        assert_eq!(a["session_id"], "tab-a");
        assert_eq!(b["text"], UNKNOWN_SYMBOL);
        assert_eq!(b["debug"]["prediction_history_length"], 1);
        assert_eq!(state.streams.count().await, 2);
    }

    #[tokio::test]
    async fn test_floor_rejection_reports_reason() {
        let state = state_with(Arc::new(FixedClassifier {
            class_id: 5,
            confidence: 0.05,
        }));

        let (status, json) = send(&state, recognize_request(png_frame(10), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["text"], UNKNOWN_SYMBOL);
        assert_eq!(json["debug"]["reason"], "confidence_below_minimum");
        assert_eq!(json["debug"]["prediction_history_length"], 0);
    }

    #[tokio::test]
    async fn test_inference_fault_returns_unknown() {
        let state = state_with(Arc::new(BrokenClassifier));
        let (status, json) = send(&state, recognize_request(png_frame(128), None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["text"], UNKNOWN_SYMBOL);
        assert_eq!(json["class"], -1);
        assert_eq!(json["confidence"], 0.0);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Model inference failed: "));
    }

    #[tokio::test]
    async fn test_slow_inference_times_out() {
        let mut state = AppState::new_for_test().with_classifier(Arc::new(SlowClassifier));
        state.inference_timeout = Duration::from_millis(50);
        let state = Arc::new(state);

        let (status, json) = send(&state, recognize_request(png_frame(128), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["class"], -1);
        assert!(json["error"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_timed_out_frames_leave_stream_untouched() {
        let mut state = AppState::new_for_test().with_classifier(Arc::new(SlowClassifier));
        state.inference_timeout = Duration::from_millis(50);
        let state = Arc::new(state);

        for _ in 0..3 {
            let (status, json) = send(&state, recognize_request(png_frame(128), None)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["class"], -1);
        }

        // Let the detached recognition finish
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let stream = state.streams.get("default").await.unwrap();
        let stream = stream.lock().await;
        assert_eq!(stream.frames_processed(), 0);
        assert_eq!(stream.smoothing_len(), 0);
        assert_eq!(stream.history_len(), 0);
        assert_eq!(stream.last_stable_class(), None);
    }

    #[tokio::test]
    async fn test_reset_waits_for_frame_without_blocking_runtime() {
        let state = state_with(Arc::new(SlowClassifier));

        let in_flight = tokio::spawn({
            let state = state.clone();
            async move { send(&state, recognize_request(png_frame(128), Some("busy"))).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let reset = || {
            Request::builder()
                .method(Method::POST)
                .uri("/api/sign/reset")
                .header("x-session-id", "busy")
                .body(Body::empty())
                .unwrap()
        };
        // Timers still fire while reset waits on the busy stream
        let waited =
            tokio::time::timeout(Duration::from_millis(50), send(&state, reset())).await;
        assert!(waited.is_err());

        let (status, frame) = in_flight.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(frame["debug"]["prediction_history_length"], 1);

        let (status, json) = send(&state, reset()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["reset"], true);
        let stream = state.streams.get("busy").await.unwrap();
        assert_eq!(stream.lock().await.history_len(), 0);
    }

    #[tokio::test]
    async fn test_invalid_session_id_rejected() {
        let state = state_with(Arc::new(FixedClassifier {
            class_id: 1,
            confidence: 0.9,
        }));
        let (status, json) = send(&state, recognize_request(png_frame(128), Some("no spaces"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_type"], "invalid_request");
    }

    #[tokio::test]
    async fn test_stream_limit_returns_503() {
        let mut state = AppState::new_for_test().with_classifier(Arc::new(FixedClassifier {
            class_id: 1,
            confidence: 0.9,
        }));
        state.streams = Arc::new(StreamStore::new(
            StreamStoreConfig {
                max_streams: 1,
                ..Default::default()
            },
            StabilizationConfig::default(),
        ));
        let state = Arc::new(state);

        let (first, _) = send(&state, recognize_request(png_frame(128), Some("one"))).await;
        let (second, json) = send(&state, recognize_request(png_frame(128), Some("two"))).await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["session_id"], "two");
    }

    #[tokio::test]
    async fn test_reset_clears_stable_symbol() {
        let state = state_with(Arc::new(FixedClassifier {
            class_id: 0,
            confidence: 0.9,
        }));
        for _ in 0..3 {
            send(&state, recognize_request(png_frame(70), Some("tab-r"))).await;
        }

        let reset = Request::builder()
            .method(Method::POST)
            .uri("/api/sign/reset")
            .header("x-session-id", "tab-r")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&state, reset).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["reset"], true);
        assert_eq!(json["session_id"], "tab-r");

        let (_, after) = send(&state, recognize_request(png_frame(70), Some("tab-r"))).await;
        assert_eq!(after["text"], UNKNOWN_SYMBOL);
        assert!(after["debug"]["last_stable_class"].is_null());
    }

    #[tokio::test]
    async fn test_reset_unknown_stream() {
        let state = Arc::new(AppState::new_for_test());
        let reset = Request::builder()
            .method(Method::POST)
            .uri("/api/sign/reset")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&state, reset).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["session_id"], "default");
        assert_eq!(json["reset"], false);
    }
}
