// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sign recognition endpoint handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use super::response::{RecognizeDebugResponse, RecognizeResponse, ResetResponse};
use crate::api::errors::{ApiError, ApiErrorResponse};
use crate::api::http_server::AppState;
use crate::recognition::{Recognition, RecognitionFault, RecognitionPipeline, DEFAULT_STREAM_ID};
use crate::vision::image_utils::format_to_extension;
use crate::vision::{decode_image_bytes, ImageError, InferenceError, PixelGrid};

/// Request header naming the recognition stream
pub const SESSION_HEADER: &str = "x-session-id";

/// Stream id from `X-Session-Id`, or the shared default stream
///
/// A header that is present but not valid UTF-8 yields an empty id, which
/// the stream store rejects.
pub fn session_id_from(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .map(|value| value.to_str().unwrap_or("").trim().to_string())
        .unwrap_or_else(|| DEFAULT_STREAM_ID.to_string())
}

enum FrameError {
    Decode(ImageError),
    Fault(RecognitionFault),
    /// The request timed out before the frame could be committed
    Abandoned,
}

/// POST /api/sign/recognize - Recognize one fingerspelling frame
///
/// The body is the raw image (PNG, JPEG, WebP, GIF, BMP or TIFF). Frames are
/// applied to the stream named by `X-Session-Id`; without the header all
/// frames share the `default` stream.
///
/// # Errors
/// - 400 Bad Request: empty body or invalid session id
/// - 503 Service Unavailable: stream limit reached
/// - 500 Internal Server Error: the image could not be decoded
///
/// Inference faults and timeouts are not errors: they answer 200 with the
/// unknown symbol, class `-1` and an `error` message.
pub async fn recognize_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RecognizeResponse>, ApiErrorResponse> {
    let session_id = session_id_from(&headers);
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("recognize", %request_id, session_id = %session_id);

    recognize_frame(state, session_id, body).instrument(span).await
}

async fn recognize_frame(
    state: Arc<AppState>,
    session_id: String,
    body: Bytes,
) -> Result<Json<RecognizeResponse>, ApiErrorResponse> {
    debug!("Received {} bytes", body.len());

    if body.is_empty() {
        warn!("Empty request body");
        return Err(ApiError::EmptyBody.with_session(session_id));
    }

    let Some(classifier) = state.classifier_manager.classifier() else {
        // Malformed frames still fail in placeholder mode
        decode_image_bytes(&body).map_err(|e| {
            warn!("Failed to decode image: {}", e);
            ApiError::from(e).with_session(session_id.clone())
        })?;
        debug!("No classifier loaded, answering with placeholder");
        return Ok(Json(RecognizeResponse::placeholder(&state.symbols, session_id)));
    };

    let stream = state
        .streams
        .get_or_create(&session_id)
        .await
        .map_err(|e| {
            warn!("Cannot open stream: {}", e);
            ApiError::from(e).with_session(session_id.clone())
        })?;

    let model_version = classifier.model_version();
    let pipeline = RecognitionPipeline::new(classifier, state.symbols);
    let span = tracing::Span::current();

    // Claimed by whichever side settles the frame first: the task when it
    // commits the updated stream, or the handler when the timeout fires.
    let settled = Arc::new(AtomicBool::new(false));
    let task_settled = settled.clone();

    let mut task = tokio::task::spawn_blocking(move || -> Result<Recognition, FrameError> {
        let _entered = span.enter();
        let (image, info) = decode_image_bytes(&body).map_err(FrameError::Decode)?;
        debug!(
            "Decoded image: {}x{} {}, {} bytes",
            info.width,
            info.height,
            format_to_extension(info.format),
            info.size_bytes
        );
        let grid = PixelGrid::from_image(&image);

        let mut stream = stream.blocking_lock();
        if task_settled.load(Ordering::Acquire) {
            debug!("Request timed out while waiting for the stream, skipping frame");
            return Err(FrameError::Abandoned);
        }

        // Work on a copy so an abandoned frame leaves the stream untouched
        let mut draft = stream.clone();
        let result = pipeline.recognize(&grid, &mut draft);
        if task_settled.swap(true, Ordering::AcqRel) {
            debug!("Request timed out during recognition, discarding frame");
            return Err(FrameError::Abandoned);
        }
        *stream = draft;
        result.map_err(FrameError::Fault)
    });

    let waited = tokio::time::timeout(state.inference_timeout, &mut task).await;
    let joined = match waited {
        Ok(joined) => joined,
        // The task already committed, so its result is moments away
        Err(_) if settled.swap(true, Ordering::AcqRel) => task.await,
        Err(_) => Ok(Err(FrameError::Abandoned)),
    };

    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(join_error) => {
            warn!("Recognition task failed: {}", join_error);
            return Err(ApiError::InternalError(join_error.to_string()).with_session(session_id));
        }
    };

    match outcome {
        Ok(recognition) => {
            info!(
                "Recognized '{}' (class {}, confidence {:.4}, stable {})",
                recognition.text,
                recognition.class_id,
                recognition.confidence,
                recognition.trace.is_stable
            );
            Ok(Json(RecognizeResponse::from_recognition(
                recognition,
                model_version,
                session_id,
            )))
        }
        Err(FrameError::Decode(e)) => {
            warn!("Failed to decode image: {}", e);
            Err(ApiError::from(e).with_session(session_id))
        }
        Err(FrameError::Fault(fault)) => {
            warn!("❌ Model inference error: {}", fault);
            Ok(Json(RecognizeResponse::inference_failed(
                fault,
                model_version,
                session_id,
            )))
        }
        Err(FrameError::Abandoned) => {
            let fault =
                RecognitionFault::Inference(InferenceError::Timeout(state.inference_timeout));
            warn!("❌ Model inference error: {}", fault);
            Ok(Json(RecognizeResponse::inference_failed(
                fault,
                model_version,
                session_id,
            )))
        }
    }
}

/// POST /api/sign/recognize-debug - Echo what the server received
///
/// Never runs inference.
pub async fn recognize_debug_handler(
    headers: HeaderMap,
    body: Bytes,
) -> Json<RecognizeDebugResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    debug!(
        "Debug request: {} bytes, content type {:?}",
        body.len(),
        content_type
    );
    Json(RecognizeDebugResponse::new(&body, content_type))
}

/// POST /api/sign/reset - Clear the windows of the caller's stream
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ResetResponse>, ApiErrorResponse> {
    let session_id = session_id_from(&headers);
    crate::recognition::StreamStore::validate_id(&session_id)
        .map_err(|e| ApiError::from(e).with_session(session_id.clone()))?;

    let reset = state.streams.reset(&session_id).await;
    info!("Reset stream {}: {}", session_id, reset);

    Ok(Json(ResetResponse { session_id, reset }))
}
