// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use super::stream::RecognitionStream;
use crate::config::StabilizationConfig;

/// Stream used when a request carries no session id
pub const DEFAULT_STREAM_ID: &str = "default";

/// Longest accepted client-supplied stream id
pub const MAX_STREAM_ID_LEN: usize = 128;

/// A stream is held for a whole frame, so waiters must not block the runtime.
/// Blocking tasks take it with `blocking_lock`.
pub type SharedStream = Arc<Mutex<RecognitionStream>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStoreConfig {
    pub max_streams: usize,
    pub idle_timeout_seconds: u64,
    pub cleanup_interval_seconds: u64,
}

impl Default for StreamStoreConfig {
    fn default() -> Self {
        Self {
            max_streams: 1000,
            idle_timeout_seconds: 300, // 5 minutes
            cleanup_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum StreamStoreError {
    #[error("Maximum number of streams reached ({0})")]
    CapacityReached(usize),

    #[error("Invalid stream id: {0}")]
    InvalidId(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetrics {
    pub active_streams: usize,
    pub total_frames: u64,
    pub stable_streams: usize,
}

/// Recognition streams keyed by client session id
pub struct StreamStore {
    config: StreamStoreConfig,
    stabilization: StabilizationConfig,
    streams: Arc<RwLock<HashMap<String, SharedStream>>>,
}

impl StreamStore {
    pub fn new(config: StreamStoreConfig, stabilization: StabilizationConfig) -> Self {
        Self {
            config,
            stabilization,
            streams: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &StreamStoreConfig {
        &self.config
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.config.idle_timeout_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.config.cleanup_interval_seconds)
    }

    /// Check a client-supplied stream id
    pub fn validate_id(stream_id: &str) -> Result<(), StreamStoreError> {
        let valid = !stream_id.is_empty()
            && stream_id.len() <= MAX_STREAM_ID_LEN
            && stream_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
        if valid {
            Ok(())
        } else {
            Err(StreamStoreError::InvalidId(stream_id.to_string()))
        }
    }

    /// Existing stream for `stream_id`, or a fresh one if capacity allows
    pub async fn get_or_create(&self, stream_id: &str) -> Result<SharedStream, StreamStoreError> {
        Self::validate_id(stream_id)?;

        {
            let streams = self.streams.read().await;
            if let Some(stream) = streams.get(stream_id) {
                return Ok(stream.clone());
            }
        } // Release read lock before getting write lock

        let mut streams = self.streams.write().await;
        // Another request may have created it in between
        if let Some(stream) = streams.get(stream_id) {
            return Ok(stream.clone());
        }
        if streams.len() >= self.config.max_streams {
            return Err(StreamStoreError::CapacityReached(self.config.max_streams));
        }

        let stream = Arc::new(Mutex::new(RecognitionStream::new(&self.stabilization)));
        streams.insert(stream_id.to_string(), stream.clone());
        tracing::debug!("Created recognition stream {}", stream_id);
        Ok(stream)
    }

    pub async fn get(&self, stream_id: &str) -> Option<SharedStream> {
        let streams = self.streams.read().await;
        streams.get(stream_id).cloned()
    }

    pub async fn exists(&self, stream_id: &str) -> bool {
        let streams = self.streams.read().await;
        streams.contains_key(stream_id)
    }

    /// Clear the windows of a stream; returns false if it does not exist
    ///
    /// Waits for any frame in flight on the stream to finish.
    pub async fn reset(&self, stream_id: &str) -> bool {
        match self.get(stream_id).await {
            Some(stream) => {
                stream.lock().await.reset();
                true
            }
            None => false,
        }
    }

    pub async fn destroy(&self, stream_id: &str) -> bool {
        let mut streams = self.streams.write().await;
        streams.remove(stream_id).is_some()
    }

    /// Drop streams idle for longer than the configured timeout
    pub async fn cleanup_expired(&self) -> usize {
        let idle_timeout = self.idle_timeout();
        let mut streams = self.streams.write().await;
        let initial_count = streams.len();

        streams.retain(|_, stream| {
            // A stream locked by an in-flight request is in use
            match stream.try_lock() {
                Ok(stream) => !stream.is_expired(idle_timeout),
                Err(_) => true,
            }
        });

        initial_count - streams.len()
    }

    pub async fn count(&self) -> usize {
        let streams = self.streams.read().await;
        streams.len()
    }

    pub async fn metrics(&self) -> StoreMetrics {
        // Snapshot the map so the read lock is not held while streams are busy
        let snapshot: Vec<SharedStream> = {
            let streams = self.streams.read().await;
            streams.values().cloned().collect()
        };

        let mut total_frames = 0;
        let mut stable_streams = 0;
        for stream in &snapshot {
            let stream = stream.lock().await;
            total_frames += stream.frames_processed();
            if stream.last_stable_class().is_some() {
                stable_streams += 1;
            }
        }

        StoreMetrics {
            active_streams: snapshot.len(),
            total_frames,
            stable_streams,
        }
    }
}
