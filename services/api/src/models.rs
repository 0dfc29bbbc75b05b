//! API Models
//!
//! Request and response bodies for the REST API, with `utoipa` schema
//! derives for the generated OpenAPI documentation. Core domain types stay
//! in `therasim-core`; this module only defines their wire-facing views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use therasim_core::{PatientProfile, SessionSnapshot, StudentTurnOutcome, Turn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Operator input describing the synthetic patient for a new session.
#[derive(Deserialize, ToSchema)]
pub struct CreateSessionPayload {
    #[schema(example = 34)]
    pub age: u8,
    #[schema(example = json!(["anxiety", "insomnia"]))]
    pub symptoms: Vec<String>,
    #[schema(example = "guarded")]
    pub behavior: String,
    #[schema(example = "flat")]
    pub tone: String,
}

impl CreateSessionPayload {
    pub fn into_profile(self) -> PatientProfile {
        PatientProfile::new(self.age, self.symptoms, self.behavior, self.tone)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionCreatedResponse {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    /// The patient's opening line.
    pub opening: String,
}

#[derive(Deserialize, ToSchema)]
pub struct StudentMessagePayload {
    #[schema(example = "How are you feeling today?")]
    pub message: String,
}

/// Outcome of one student message: either the patient's reply, or — when
/// the message was a stop command — the end-of-session report.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StudentReplyResponse {
    Reply { reply: String },
    Ended { report: String },
}

impl From<StudentTurnOutcome> for StudentReplyResponse {
    fn from(outcome: StudentTurnOutcome) -> Self {
        match outcome {
            StudentTurnOutcome::Reply(reply) => Self::Reply { reply },
            StudentTurnOutcome::Ended { report } => Self::Ended { report },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedbackResponse {
    pub report: String,
}

/// One transcript entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct TurnView {
    #[schema(example = "patient")]
    pub role: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.to_string(),
            message: turn.message.clone(),
            at: turn.at,
        }
    }
}

/// Read-only view of a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    #[schema(value_type = String, format = Uuid)]
    pub session_id: Uuid,
    pub active: bool,
    pub started_at: DateTime<Utc>,
    pub turns: Vec<TurnView>,
    pub performance_report: Option<String>,
}

impl From<SessionSnapshot> for SessionView {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            session_id: snapshot.id,
            active: snapshot.active,
            started_at: snapshot.started_at,
            turns: snapshot.turns.iter().map(TurnView::from).collect(),
            performance_report: snapshot.performance_report,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
