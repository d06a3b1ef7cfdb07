// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::recognition::StreamStoreError;
use crate::vision::ImageError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    EmptyBody,
    InvalidRequest(String),
    ImageDecode(String),
    StreamLimit(usize),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self, session_id: Option<String>) -> ErrorResponse {
        let error_type = match self {
            ApiError::EmptyBody => "empty_body",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::ImageDecode(_) => "decode_error",
            ApiError::StreamLimit(_) => "service_unavailable",
            ApiError::InternalError(_) => "internal_error",
        };

        ErrorResponse {
            error: self.to_string(),
            error_type: error_type.to_string(),
            session_id,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::EmptyBody | ApiError::InvalidRequest(_) => 400,
            ApiError::StreamLimit(_) => 503,
            ApiError::ImageDecode(_) | ApiError::InternalError(_) => 500,
        }
    }

    /// Attach the stream id the failing request was addressed to
    pub fn with_session(self, session_id: impl Into<String>) -> ApiErrorResponse {
        ApiErrorResponse(self, Some(session_id.into()))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::EmptyBody => write!(f, "No image data received"),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ImageDecode(msg) => write!(f, "Internal server error: {}", msg),
            ApiError::StreamLimit(max) => write!(
                f,
                "Service unavailable: maximum number of recognition streams ({}) reached",
                max
            ),
            ApiError::InternalError(msg) => write!(f, "Internal server error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        ApiError::ImageDecode(e.to_string())
    }
}

impl From<StreamStoreError> for ApiError {
    fn from(e: StreamStoreError) -> Self {
        match e {
            StreamStoreError::CapacityReached(max) => ApiError::StreamLimit(max),
            StreamStoreError::InvalidId(_) => ApiError::InvalidRequest(e.to_string()),
        }
    }
}

/// An [`ApiError`] rendered as JSON, optionally tagged with a session id
#[derive(Debug)]
pub struct ApiErrorResponse(pub ApiError, pub Option<String>);

impl From<ApiError> for ApiErrorResponse {
    fn from(e: ApiError) -> Self {
        ApiErrorResponse(e, None)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_response(self.1))).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ApiErrorResponse(self, None).into_response()
    }
}
