//! The turn-taking state machine for one training session.
//!
//! The machine is a pure transition function over an owned [`SessionState`]:
//! [`SessionState::advance`] consumes a state and an [`Event`] and returns
//! the next state plus an [`Effect`] telling the driver what to do next. No
//! I/O happens here; generation calls and input delivery are the
//! orchestrator's job. Keeping the function pure is what lets the
//! orchestrator work on a scratch copy and commit only after every external
//! call in an operation has succeeded.

use crate::error::SessionError;
use crate::gateway::PromptKind;
use crate::profile::PatientProfile;
use crate::transcript::{SpeakerRole, Transcript};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Messages that end the dialogue instead of being spoken to the patient.
const TERMINATION_KEYWORDS: [&str; 2] = ["exit", "quit"];

/// Returns `true` when the student message is a stop command rather than
/// patient-facing content. Matching is case-insensitive on the trimmed
/// message; a sentence merely containing "quit" is a normal turn.
fn is_termination(message: &str) -> bool {
    let trimmed = message.trim();
    TERMINATION_KEYWORDS
        .iter()
        .any(|keyword| trimmed.eq_ignore_ascii_case(keyword))
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Created, opening line not yet generated.
    Init,
    /// Waiting for the next student message.
    AwaitInput,
    /// A continuation prompt is in flight.
    GeneratePatientReply,
    /// Deciding between another patient reply and the final critique.
    /// Transient: resolved inside [`SessionState::advance`], never observed
    /// by callers.
    Route,
    /// The evaluation prompt is in flight.
    GenerateFeedback,
    /// Absorbing state; the session is over.
    Terminal,
}

impl Phase {
    /// Returns `true` if no further dialogue is possible from this phase.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }
}

/// External stimulus applied to the machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// The generation service returned text for the prompt kind the machine
    /// is waiting on.
    Generated { kind: PromptKind, text: String },
    /// One student message, delivered by the transport layer.
    StudentInput(String),
    /// The student asked for the session to end and be evaluated.
    EndRequested,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Generated { .. } => "generated",
            Event::StudentInput(_) => "student_input",
            Event::EndRequested => "end_requested",
        }
    }
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Render the prompt of the given kind and call the generation service.
    Generate(PromptKind),
    /// Nothing to do until the next student message arrives.
    AwaitStudent,
    /// The session is over and `performance_report` is set.
    Ended,
}

/// The aggregate state of one training session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub profile: PatientProfile,
    pub transcript: Transcript,
    pub phase: Phase,
    /// True while the dialogue may continue. Once false, stays false.
    pub active: bool,
    /// Set when the student explicitly ended the session.
    pub stop_requested: bool,
    /// The critique of the trainee, set exactly once at session end.
    pub performance_report: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    /// Creates a fresh session in `Init` with an empty transcript. The
    /// driver's first step is to generate the opening line
    /// ([`Effect::Generate`] with [`PromptKind::Opening`]).
    pub fn new(profile: PatientProfile) -> Self {
        Self {
            profile,
            transcript: Transcript::new(),
            phase: Phase::Init,
            active: true,
            stop_requested: false,
            performance_report: None,
            started_at: Utc::now(),
        }
    }

    /// Applies one event, returning the next state and the effect the
    /// driver must carry out.
    pub fn advance(mut self, event: Event) -> Result<(Self, Effect), SessionError> {
        match (self.phase, event) {
            (
                Phase::Init,
                Event::Generated {
                    kind: PromptKind::Opening,
                    text,
                },
            ) => {
                self.transcript.push(SpeakerRole::Patient, text);
                self.phase = Phase::AwaitInput;
                Ok((self, Effect::AwaitStudent))
            }

            (Phase::AwaitInput, Event::StudentInput(message)) => {
                if is_termination(&message) {
                    // A stop command is a control signal, not dialogue: it
                    // is never appended to the transcript.
                    self.stop_requested = true;
                    self.active = false;
                } else {
                    self.transcript.push(SpeakerRole::Student, message);
                }
                Ok(self.route())
            }

            (Phase::AwaitInput, Event::EndRequested) => {
                self.active = false;
                Ok(self.route())
            }

            (
                Phase::GeneratePatientReply,
                Event::Generated {
                    kind: PromptKind::Continuation,
                    text,
                },
            ) => {
                self.transcript.push(SpeakerRole::Patient, text);
                Ok(self.route())
            }

            (
                Phase::GenerateFeedback,
                Event::Generated {
                    kind: PromptKind::Evaluation,
                    text,
                },
            ) => {
                self.performance_report = Some(text);
                self.active = false;
                self.phase = Phase::Terminal;
                Ok((self, Effect::Ended))
            }

            (Phase::Terminal, Event::StudentInput(_)) => Err(SessionError::SessionEnded),

            // Repeated end requests are a no-op: the stored report stands
            // and the generation service is not called again.
            (Phase::Terminal, Event::EndRequested) => Ok((self, Effect::Ended)),

            (phase, event) => Err(SessionError::InvalidTransition {
                phase,
                event: event.name(),
            }),
        }
    }

    /// The `Route` decision: ending sessions go to feedback, live ones get
    /// another patient reply.
    fn route(mut self) -> (Self, Effect) {
        self.phase = Phase::Route;
        if self.stop_requested || !self.active {
            if self.performance_report.is_some() {
                // Feedback already generated; do not bill a second call.
                self.phase = Phase::Terminal;
                (self, Effect::Ended)
            } else {
                self.phase = Phase::GenerateFeedback;
                (self, Effect::Generate(PromptKind::Evaluation))
            }
        } else {
            self.phase = Phase::GeneratePatientReply;
            (self, Effect::Generate(PromptKind::Continuation))
        }
    }
}
