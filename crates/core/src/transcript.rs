//! The chronological transcript of one training dialogue.
//!
//! The transcript is append-only: turns are pushed as they happen and never
//! reordered or truncated while the session lives, because the full ordered
//! text is rendered into every continuation and evaluation prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    /// The human trainee.
    Student,
    /// The generated patient persona.
    Patient,
}

impl fmt::Display for SpeakerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeakerRole::Student => write!(f, "student"),
            SpeakerRole::Patient => write!(f, "patient"),
        }
    }
}

/// A single role-attributed utterance. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: SpeakerRole,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Ordered sequence of [`Turn`]s, append-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript(Vec<Turn>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one turn, stamping it with the current time.
    pub fn push(&mut self, role: SpeakerRole, message: impl Into<String>) {
        self.0.push(Turn {
            role,
            message: message.into(),
            at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.0
    }

    /// Text of the most recent patient turn, if any.
    pub fn last_patient_message(&self) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|t| t.role == SpeakerRole::Patient)
            .map(|t| t.message.as_str())
    }

    /// Renders the transcript as chronological `role: message` lines, the
    /// form embedded in continuation and evaluation prompts.
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|t| format!("{}: {}", t.role, t.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
