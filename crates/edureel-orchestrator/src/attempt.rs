//! Attempt tracking for the generation-retry loop.
//!
//! This module defines the stage machine for one request and the immutable
//! history of failed attempts that feeds the next prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EdureelError, Result};

// ============================================================================
// GenerationStage
// ============================================================================

/// Stage of a generation request.
///
/// The stage transitions through these states:
/// - `Drafting` -> `Extracting` -> `Rendering` -> `Publishing` -> `Done`
/// - `Drafting`, `Extracting` or `Rendering` -> `Failed`
/// - From `Failed`:
///   - `Drafting` (attempts remain)
///   - `Exhausted` (attempt budget spent)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    /// Waiting on the model's reply.
    #[default]
    Drafting,
    /// Pulling code, narration and questions out of the reply.
    Extracting,
    /// Rendering the scene and laying narration over it.
    Rendering,
    /// Uploading the finished video.
    Publishing,
    /// Video published.
    Done,
    /// The current attempt failed.
    Failed,
    /// Every attempt failed.
    Exhausted,
}

impl GenerationStage {
    /// Returns `true` if this stage ends the request.
    ///
    /// # Examples
    ///
    /// ```
    /// use edureel_orchestrator::GenerationStage;
    ///
    /// assert!(GenerationStage::Done.is_terminal());
    /// assert!(GenerationStage::Exhausted.is_terminal());
    /// assert!(!GenerationStage::Failed.is_terminal());
    /// ```
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Exhausted)
    }

    /// Returns `true` if a failure in this stage starts a new attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Drafting | Self::Extracting | Self::Rendering)
    }

    /// Returns `true` if moving from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Drafting, Self::Extracting)
                | (Self::Extracting, Self::Rendering)
                | (Self::Rendering, Self::Publishing)
                | (Self::Publishing, Self::Done)
                | (Self::Drafting | Self::Extracting | Self::Rendering, Self::Failed)
                | (Self::Failed, Self::Drafting | Self::Exhausted)
        )
    }
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Drafting => "drafting",
            Self::Extracting => "extracting",
            Self::Rendering => "rendering",
            Self::Publishing => "publishing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Exhausted => "exhausted",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// AttemptRecord
// ============================================================================

/// Record of one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Zero-based attempt index.
    pub index: u32,

    /// Stage the attempt failed in.
    pub stage: GenerationStage,

    /// Scene code the attempt produced, if it got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Error text of the failure.
    pub error: String,

    /// When the attempt started.
    pub started_at: DateTime<Utc>,

    /// When the attempt failed.
    pub ended_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Creates a record ending now.
    #[must_use]
    pub fn new(
        index: u32,
        stage: GenerationStage,
        code: Option<String>,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            index,
            stage,
            code,
            error: error.into(),
            started_at,
            ended_at: Utc::now(),
        }
    }
}

// ============================================================================
// AttemptHistory
// ============================================================================

/// Append-only history of failed attempts.
///
/// [`AttemptHistory::push`] returns a new history and leaves the original
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptHistory {
    records: Vec<AttemptRecord>,
}

impl AttemptHistory {
    /// Creates an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// Returns a new history with `record` appended.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use edureel_orchestrator::{AttemptHistory, AttemptRecord, GenerationStage};
    ///
    /// let empty = AttemptHistory::new();
    /// let record = AttemptRecord::new(0, GenerationStage::Rendering, None, "boom", Utc::now());
    /// let one = empty.push(record);
    ///
    /// assert!(empty.is_empty());
    /// assert_eq!(one.len(), 1);
    /// assert_eq!(one.last_error(), Some("boom"));
    /// ```
    #[must_use]
    pub fn push(&self, record: AttemptRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    /// Number of recorded attempts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no attempt has failed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    /// Error text of the most recent failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.records.last().map(|r| r.error.as_str())
    }

    /// Code from the most recent attempt that produced any.
    #[must_use]
    pub fn last_code(&self) -> Option<&str> {
        self.records.iter().rev().find_map(|r| r.code.as_deref())
    }
}

// ============================================================================
// GenerationState
// ============================================================================

/// Progress of one generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationState {
    /// Current stage.
    pub stage: GenerationStage,

    /// Zero-based index of the current attempt.
    pub attempt: u32,

    /// Attempt budget.
    pub max_attempts: u32,

    /// Failed attempts so far.
    pub history: AttemptHistory,

    /// When the current attempt started.
    pub attempt_started_at: DateTime<Utc>,
}

impl GenerationState {
    /// Creates a state at the start of the first attempt.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            stage: GenerationStage::Drafting,
            attempt: 0,
            max_attempts,
            history: AttemptHistory::new(),
            attempt_started_at: Utc::now(),
        }
    }

    /// Moves to `next`, rejecting transitions the stage machine forbids.
    pub fn advance(&mut self, next: GenerationStage) -> Result<()> {
        if !self.stage.can_transition_to(next) {
            return Err(EdureelError::invalid_transition(self.stage, next));
        }
        self.stage = next;
        Ok(())
    }

    /// Records the current attempt as failed and moves to `Failed`.
    pub fn fail(&mut self, code: Option<String>, error: impl Into<String>) -> Result<()> {
        let failed_in = self.stage;
        self.advance(GenerationStage::Failed)?;
        let record =
            AttemptRecord::new(self.attempt, failed_in, code, error, self.attempt_started_at);
        self.history = self.history.push(record);
        Ok(())
    }

    /// Returns `true` if another attempt fits in the budget.
    #[must_use]
    pub const fn has_attempts_left(&self) -> bool {
        self.attempt + 1 < self.max_attempts
    }

    /// After a failure, starts the next attempt or moves to `Exhausted`.
    ///
    /// Returns `true` if a new attempt was started.
    pub fn retry_or_exhaust(&mut self) -> Result<bool> {
        if self.has_attempts_left() {
            self.advance(GenerationStage::Drafting)?;
            self.attempt += 1;
            self.attempt_started_at = Utc::now();
            Ok(true)
        } else {
            self.advance(GenerationStage::Exhausted)?;
            Ok(false)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
