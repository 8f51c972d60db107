//! Speech capture session state.
//!
//! The recognizer itself lives outside this crate; it reports results and
//! errors into a [`VoiceCapture`], which tracks the transcript and decides
//! when there is something to interpret.
//!
//! ```text
//! Idle --start--> Listening --end (non-empty)--> Processing --settle--> Idle
//!                     |  \--end (empty)------------------------------> Idle
//!                     \--error-------------------------------------> Idle
//! ```

use crate::error::{FinanceError, Result};

/// Message shown when the recognizer fails.
const RECOGNITION_FAILED: &str = "Failed to recognize speech. Please try again.";

/// Message shown when interpretation or commit fails.
const PROCESSING_FAILED: &str = "Failed to process voice input. Please try again.";

/// Where a capture session is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CapturePhase {
    /// No session; ready to start.
    #[default]
    Idle,
    /// The recognizer is producing results.
    Listening,
    /// A transcript was handed off for interpretation.
    Processing,
}

/// A single speech capture session. Only one may be active at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceCapture {
    /// Current phase.
    phase: CapturePhase,
    /// Latest final result.
    final_transcript: String,
    /// Latest interim result.
    interim_transcript: String,
    /// User-visible message from the last failure.
    error: Option<String>,
}

impl VoiceCapture {
    /// Creates an idle capture.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Returns the message from the last failure, if any.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the transcript to display: the final result if there is
    /// one, otherwise the latest interim result.
    #[inline]
    #[must_use]
    pub fn transcript(&self) -> &str {
        if self.final_transcript.is_empty() {
            &self.interim_transcript
        } else {
            &self.final_transcript
        }
    }

    /// Starts a session, clearing the previous transcript and error.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::Capture`] if a session is already listening
    /// or processing.
    #[inline]
    pub fn start(&mut self) -> Result<()> {
        if self.phase != CapturePhase::Idle {
            return Err(FinanceError::Capture(
                "a capture session is already active".to_owned(),
            ));
        }
        tracing::debug!("capture started");
        *self = Self {
            phase: CapturePhase::Listening,
            ..Self::default()
        };
        Ok(())
    }

    /// Records a recognizer result. Ignored unless listening.
    #[inline]
    pub fn on_result(&mut self, text: &str, is_final: bool) {
        if self.phase != CapturePhase::Listening {
            return;
        }
        tracing::trace!(is_final, "recognition result");
        if is_final {
            text.clone_into(&mut self.final_transcript);
        } else {
            text.clone_into(&mut self.interim_transcript);
        }
    }

    /// Records a recognizer error and returns to idle.
    #[inline]
    pub fn on_error(&mut self, detail: &str) {
        if self.phase != CapturePhase::Listening {
            return;
        }
        tracing::warn!(detail, "speech recognition failed");
        self.phase = CapturePhase::Idle;
        self.error = Some(RECOGNITION_FAILED.to_owned());
    }

    /// Ends listening.
    ///
    /// Returns the transcript to interpret and moves to
    /// [`CapturePhase::Processing`], or returns `None` and goes back to
    /// idle if nothing was heard.
    #[inline]
    pub fn end(&mut self) -> Option<String> {
        if self.phase != CapturePhase::Listening {
            return None;
        }
        let transcript = self.transcript().trim().to_owned();
        if transcript.is_empty() {
            tracing::debug!("capture ended without speech");
            self.phase = CapturePhase::Idle;
            None
        } else {
            tracing::debug!(chars = transcript.len(), "capture ended");
            self.phase = CapturePhase::Processing;
            Some(transcript)
        }
    }

    /// Finishes processing with the outcome of interpretation (or commit)
    /// and returns to idle. A failure is recorded as a user-visible message.
    #[inline]
    pub fn settle<T>(&mut self, outcome: &Result<T>) {
        if self.phase != CapturePhase::Processing {
            return;
        }
        self.phase = CapturePhase::Idle;
        if let Err(err) = outcome.as_ref() {
            tracing::warn!(error = %err, "voice processing failed");
            self.error = Some(PROCESSING_FAILED.to_owned());
        }
    }

    /// Abandons the session from any phase without recording an error.
    #[inline]
    pub fn cancel(&mut self) {
        self.phase = CapturePhase::Idle;
    }
}
