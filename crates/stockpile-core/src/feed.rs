//! Snapshot sources and the auto-advance polling state machine

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::surface::SceneObjectDocument;
use crate::survey::SurveyPayload;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("not authorized")]
    Unauthorized,
    #[error("server returned status {0}")]
    Status(u16),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("no snapshots available")]
    Empty,
}

/// Where snapshots come from
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    /// Identifier of the snapshot after `current` (wrapping)
    async fn next_identifier(&self, current: Option<&str>) -> Result<String, FeedError>;

    async fn fetch_survey(&self, id: &str) -> Result<SurveyPayload, FeedError>;

    async fn fetch_mesh(&self, id: &str) -> Result<SceneObjectDocument, FeedError>;
}

/// A survey together with its surface document, loaded as a unit
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub id: String,
    pub payload: SurveyPayload,
    pub surface: SceneObjectDocument,
}

/// Resolve the next snapshot and fetch both of its parts
pub async fn load_next<S: SnapshotSource>(
    source: &S,
    current: Option<&str>,
) -> Result<LoadedSnapshot, FeedError> {
    let id = source.next_identifier(current).await?;
    let payload = source.fetch_survey(&id).await?;
    let surface = source.fetch_mesh(&id).await?;
    Ok(LoadedSnapshot { id, payload, surface })
}

/// A poll the host should start now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceRequest {
    pub current: Option<String>,
}

/// Drives periodic "load the next snapshot" polls.
///
/// At most one poll is in flight. A failed poll stops playback until
/// [`AutoAdvance::resume`] is called.
#[derive(Debug, Clone)]
pub struct AutoAdvance {
    interval: Duration,
    elapsed: Duration,
    playing: bool,
    in_flight: bool,
    current: Option<String>,
    last_error: Option<FeedError>,
}

impl AutoAdvance {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            playing: false,
            in_flight: false,
            current: None,
            last_error: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_advancing(&self) -> bool {
        self.in_flight
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn last_error(&self) -> Option<&FeedError> {
        self.last_error.as_ref()
    }

    /// Start (or restart after a failure) playback
    pub fn resume(&mut self) {
        self.playing = true;
        self.last_error = None;
        self.elapsed = Duration::ZERO;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// Advance the clock; returns a request when a poll is due
    pub fn tick(&mut self, delta: Duration) -> Option<AdvanceRequest> {
        if !self.playing {
            return None;
        }
        self.elapsed += delta;
        if self.elapsed < self.interval || self.in_flight {
            return None;
        }
        self.elapsed = Duration::ZERO;
        self.in_flight = true;
        Some(AdvanceRequest {
            current: self.current.clone(),
        })
    }

    /// Record a successful poll. Returns false when the result should be
    /// dropped because playback was paused while it was in flight.
    pub fn finish(&mut self, id: impl Into<String>) -> bool {
        self.in_flight = false;
        if !self.playing {
            debug!("Discarding snapshot that arrived while paused");
            return false;
        }
        self.current = Some(id.into());
        true
    }

    /// Record a failed poll and halt playback
    pub fn fail(&mut self, error: FeedError) {
        warn!(error = %error, "Snapshot poll failed, pausing playback");
        self.in_flight = false;
        self.playing = false;
        self.last_error = Some(error);
    }
}

impl Default for AutoAdvance {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}
