//! Per-browser UI sessions and their submission cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::analysis::{AnalysisResult, Diagnosis};
use crate::error::{ErrorKind, IntakeError};
use crate::intake::{self, ImageSource, SelectedImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTone {
    Info,
    Error,
}

/// Toast-style message. Lives until dismissed or replaced by the next action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub tone: NotificationTone,
}

impl Notification {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            title: kind.title().to_string(),
            message: message.into(),
            tone: NotificationTone::Error,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            tone: NotificationTone::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ImageSelected,
    Analyzing,
    Complete,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please select an image first")]
    NoImage,

    #[error("An analysis is already in progress")]
    Busy,
}

#[derive(Debug, Default)]
pub struct UiState {
    selected_image: Option<SelectedImage>,
    report: Option<Diagnosis>,
    is_analyzing: bool,
    notification: Option<Notification>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_image(&self) -> Option<&SelectedImage> {
        self.selected_image.as_ref()
    }

    pub fn report(&self) -> Option<&Diagnosis> {
        self.report.as_ref()
    }

    pub fn is_analyzing(&self) -> bool {
        self.is_analyzing
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn phase(&self) -> Phase {
        match (&self.selected_image, &self.report, self.is_analyzing) {
            (None, _, _) => Phase::Idle,
            (Some(_), _, true) => Phase::Analyzing,
            (Some(_), Some(_), false) => Phase::Complete,
            (Some(_), None, false) => Phase::ImageSelected,
        }
    }

    /// Runs intake on a new file. On success the previous image and report
    /// are replaced; on failure the current image stays as it was.
    pub fn select(&mut self, source: ImageSource) -> Result<(), IntakeError> {
        match intake::select_file(source) {
            Ok(image) => {
                self.selected_image = Some(image);
                self.report = None;
                self.notification = None;
                Ok(())
            }
            Err(e) => {
                self.notification = Some(Notification::error(ErrorKind::Validation, e.to_string()));
                Err(e)
            }
        }
    }

    /// Marks an analysis as in flight and hands out the image to submit.
    pub fn begin_analysis(&mut self) -> Result<SelectedImage, SessionError> {
        if self.is_analyzing {
            return Err(SessionError::Busy);
        }
        let image = self.selected_image.clone().ok_or(SessionError::NoImage)?;
        self.is_analyzing = true;
        self.report = None;
        self.notification = None;
        Ok(image)
    }

    pub fn complete_analysis(&mut self, result: AnalysisResult) {
        self.is_analyzing = false;
        match result {
            AnalysisResult::Success(diagnosis) => {
                self.report = Some(diagnosis);
                self.notification = Some(Notification::info(
                    "Analysis Complete",
                    "Your plant health report is ready",
                ));
            }
            AnalysisResult::Failure(failure) => {
                self.notification = Some(Notification::error(failure.kind, failure.message));
            }
        }
    }

    /// Shows a message without touching the rest of the state.
    pub fn notify(&mut self, notification: Notification) {
        self.notification = Some(notification);
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }
}

pub type SessionId = Uuid;

/// Sessions untouched for this long are dropped, unless an analysis is
/// still in flight for them.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

struct SessionEntry {
    state: UiState,
    last_seen: Instant,
}

/// One `UiState` per browser, keyed by the session cookie.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the session's state, creating it on first use.
    pub async fn with<R>(&self, id: SessionId, f: impl FnOnce(&mut UiState) -> R) -> R {
        self.with_at(id, Instant::now(), f).await
    }

    async fn with_at<R>(
        &self,
        id: SessionId,
        now: Instant,
        f: impl FnOnce(&mut UiState) -> R,
    ) -> R {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|key, entry| {
            *key == id
                || entry.state.is_analyzing()
                || now.saturating_duration_since(entry.last_seen) < SESSION_IDLE_TTL
        });
        let entry = sessions.entry(id).or_insert_with(|| SessionEntry {
            state: UiState::new(),
            last_seen: now,
        });
        entry.last_seen = now;
        f(&mut entry.state)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
