//! Drives session state machines against the generation gateway.
//!
//! Each public operation locks the target session, replays events through
//! the pure [`SessionState::advance`] function on a scratch copy, performs
//! the gateway call for every [`Effect::Generate`] it is handed, and swaps
//! the successor state into the store only once the whole operation has
//! succeeded. A [`GenerationUnavailable`] failure therefore leaves the
//! stored session exactly as it was, and the caller may retry the same
//! input.

use crate::error::SessionError;
use crate::gateway::{GenerationGateway, PromptKind};
use crate::profile::PatientProfile;
use crate::prompt::PromptSet;
use crate::session::{Effect, Event, Phase, SessionState};
use crate::store::SessionStore;
use crate::transcript::Turn;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Result of starting a session: the new id and the patient's opening line.
#[derive(Debug, Clone)]
pub struct SessionStarted {
    pub id: Uuid,
    pub opening: String,
}

/// Tagged result of posting one student message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentTurnOutcome {
    /// The dialogue continues; this is the new trailing patient reply.
    Reply(String),
    /// The message was a stop command; the session was evaluated and ended.
    Ended { report: String },
}

/// Read-only view of a session for the transport layer.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub active: bool,
    pub profile: PatientProfile,
    pub turns: Vec<Turn>,
    pub performance_report: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// The turn-taking conversation orchestrator.
pub struct Orchestrator {
    store: SessionStore,
    gateway: Arc<dyn GenerationGateway>,
    prompts: PromptSet,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn GenerationGateway>, prompts: PromptSet) -> Self {
        Self {
            store: SessionStore::new(),
            gateway,
            prompts,
        }
    }

    /// Creates a session for the given profile, generates the patient's
    /// opening line, and registers the session.
    ///
    /// The session only becomes visible once the opening generation has
    /// succeeded; a failed call leaves nothing behind and the caller simply
    /// retries.
    #[instrument(skip_all)]
    pub async fn start_session(
        &self,
        profile: PatientProfile,
    ) -> Result<SessionStarted, SessionError> {
        let state = SessionState::new(profile);
        let (state, _effect) = self
            .drive(state, Effect::Generate(PromptKind::Opening))
            .await?;

        let opening = state
            .transcript
            .last_patient_message()
            .unwrap_or_default()
            .to_string();
        let id = self.store.insert(state).await;
        info!(session_id = %id, "training session started");
        Ok(SessionStarted { id, opening })
    }

    /// Applies one student message: appends it (unless it is a stop
    /// command), generates the patient reply or the final critique, and
    /// returns the tagged outcome.
    #[instrument(skip(self, message), fields(session_id = %id))]
    pub async fn post_student_message(
        &self,
        id: Uuid,
        message: &str,
    ) -> Result<StudentTurnOutcome, SessionError> {
        let slot = self.store.get(id).await?;
        let mut current = slot.lock().await;

        let (state, effect) = self
            .apply(current.clone(), Event::StudentInput(message.to_string()))
            .await?;

        let outcome = if let Effect::Ended = effect {
            info!("session ended by stop command");
            StudentTurnOutcome::Ended {
                report: state.performance_report.clone().unwrap_or_default(),
            }
        } else {
            StudentTurnOutcome::Reply(
                state
                    .transcript
                    .last_patient_message()
                    .unwrap_or_default()
                    .to_string(),
            )
        };
        *current = state;
        Ok(outcome)
    }

    /// Ends the session and returns the performance report, generating it
    /// if it has not been generated yet. Idempotent: repeated calls return
    /// the stored report without touching the gateway again.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn end_session(&self, id: Uuid) -> Result<String, SessionError> {
        let slot = self.store.get(id).await?;
        let mut current = slot.lock().await;

        let (state, _effect) = self.apply(current.clone(), Event::EndRequested).await?;
        let report = state.performance_report.clone().unwrap_or_default();
        *current = state;
        info!("session evaluated");
        Ok(report)
    }

    /// A read-only view of the session for transports.
    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let slot = self.store.get(id).await?;
        let state = slot.lock().await;
        Ok(SessionSnapshot {
            id,
            active: state.active,
            profile: state.profile.clone(),
            turns: state.transcript.turns().to_vec(),
            performance_report: state.performance_report.clone(),
            started_at: state.started_at,
        })
    }

    /// Applies an event and then pumps the machine until it no longer asks
    /// for generation.
    async fn apply(
        &self,
        state: SessionState,
        event: Event,
    ) -> Result<(SessionState, Effect), SessionError> {
        let (state, effect) = state.advance(event)?;
        self.drive(state, effect).await
    }

    /// Resolves `Generate` effects by rendering the prompt, calling the
    /// gateway, and feeding the completion back into the machine.
    async fn drive(
        &self,
        mut state: SessionState,
        mut effect: Effect,
    ) -> Result<(SessionState, Effect), SessionError> {
        while let Effect::Generate(kind) = effect {
            let prompt = self.prompts.render(kind, &state.profile, &state.transcript);
            debug!(kind = %kind, phase = ?state.phase, "requesting generation");
            let text = self.gateway.generate(kind, &prompt).await?;
            (state, effect) = state.advance(Event::Generated { kind, text })?;
        }
        debug_assert!(!matches!(state.phase, Phase::Route));
        Ok((state, effect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GenerationUnavailable, MockGenerationGateway, PromptKind};
    use mockall::Sequence;
    use mockall::predicate::{always, eq};

    fn profile() -> PatientProfile {
        PatientProfile::new(
            34,
            vec!["anxiety".to_string()],
            "guarded".to_string(),
            "flat".to_string(),
        )
    }

    fn orchestrator(gateway: MockGenerationGateway) -> Orchestrator {
        Orchestrator::new(Arc::new(gateway), PromptSet::builtin())
    }

    fn expect_opening(gateway: &mut MockGenerationGateway, text: &str) {
        let text = text.to_string();
        gateway
            .expect_generate()
            .with(eq(PromptKind::Opening), always())
            .times(1)
            .returning(move |_, _| Ok(text.clone()));
    }

    #[tokio::test]
    async fn start_session_returns_opening_line() {
        let mut gateway = MockGenerationGateway::new();
        expect_opening(&mut gateway, "I... I'm not sure why I'm here.");
        let orch = orchestrator(gateway);

        let started = orch.start_session(profile()).await.unwrap();
        assert_eq!(started.opening, "I... I'm not sure why I'm here.");

        let snapshot = orch.snapshot(started.id).await.unwrap();
        assert!(snapshot.active);
        assert_eq!(snapshot.turns.len(), 1);
        assert_eq!(snapshot.turns[0].message, started.opening);
        assert!(snapshot.performance_report.is_none());
    }

    #[tokio::test]
    async fn failed_opening_registers_no_session() {
        let mut gateway = MockGenerationGateway::new();
        gateway
            .expect_generate()
            .with(eq(PromptKind::Opening), always())
            .times(1)
            .returning(|_, _| Err(GenerationUnavailable::EmptyCompletion));
        let orch = orchestrator(gateway);

        let err = orch.start_session(profile()).await.unwrap_err();
        assert!(matches!(err, SessionError::Generation(_)));
        assert!(orch.store.is_empty().await);
    }

    #[tokio::test]
    async fn accepted_message_grows_transcript_by_two() {
        let mut gateway = MockGenerationGateway::new();
        expect_opening(&mut gateway, "opening");
        gateway
            .expect_generate()
            .with(eq(PromptKind::Continuation), always())
            .times(2)
            .returning(|_, _| Ok("a patient reply".to_string()));
        let orch = orchestrator(gateway);

        let started = orch.start_session(profile()).await.unwrap();
        for expected_len in [3, 5] {
            let outcome = orch
                .post_student_message(started.id, "How are you feeling today?")
                .await
                .unwrap();
            assert_eq!(
                outcome,
                StudentTurnOutcome::Reply("a patient reply".to_string())
            );
            let snapshot = orch.snapshot(started.id).await.unwrap();
            assert_eq!(snapshot.turns.len(), expected_len);
            assert!(snapshot.active);
            // The returned reply is the trailing patient turn.
            assert_eq!(snapshot.turns.last().unwrap().message, "a patient reply");
        }
    }

    #[tokio::test]
    async fn stop_command_evaluates_without_appending_a_turn() {
        let mut gateway = MockGenerationGateway::new();
        expect_opening(&mut gateway, "opening");
        gateway
            .expect_generate()
            .with(eq(PromptKind::Evaluation), always())
            .times(1)
            .returning(|_, _| Ok("solid first session".to_string()));
        let orch = orchestrator(gateway);

        let started = orch.start_session(profile()).await.unwrap();
        let outcome = orch
            .post_student_message(started.id, " QUIT ")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            StudentTurnOutcome::Ended {
                report: "solid first session".to_string()
            }
        );

        let snapshot = orch.snapshot(started.id).await.unwrap();
        assert!(!snapshot.active);
        assert_eq!(snapshot.turns.len(), 1);
        assert_eq!(
            snapshot.performance_report.as_deref(),
            Some("solid first session")
        );
    }

    #[tokio::test]
    async fn end_session_is_idempotent_and_bills_one_evaluation() {
        let mut gateway = MockGenerationGateway::new();
        expect_opening(&mut gateway, "opening");
        gateway
            .expect_generate()
            .with(eq(PromptKind::Evaluation), always())
            .times(1)
            .returning(|_, _| Ok("the report".to_string()));
        let orch = orchestrator(gateway);

        let started = orch.start_session(profile()).await.unwrap();
        let first = orch.end_session(started.id).await.unwrap();
        let second = orch.end_session(started.id).await.unwrap();
        assert_eq!(first, "the report");
        assert_eq!(second, "the report");
    }

    #[tokio::test]
    async fn message_after_end_fails_with_session_ended() {
        let mut gateway = MockGenerationGateway::new();
        expect_opening(&mut gateway, "opening");
        gateway
            .expect_generate()
            .with(eq(PromptKind::Evaluation), always())
            .times(1)
            .returning(|_, _| Ok("report".to_string()));
        let orch = orchestrator(gateway);

        let started = orch.start_session(profile()).await.unwrap();
        orch.end_session(started.id).await.unwrap();

        let err = orch
            .post_student_message(started.id, "one more question")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SessionEnded));
    }

    #[tokio::test]
    async fn unknown_session_fails_with_no_active_session() {
        let orch = orchestrator(MockGenerationGateway::new());
        let id = Uuid::new_v4();
        let err = orch.post_student_message(id, "hello").await.unwrap_err();
        assert!(matches!(err, SessionError::NoActiveSession(missing) if missing == id));
    }

    #[tokio::test]
    async fn failed_reply_leaves_transcript_unchanged_and_is_retriable() {
        let mut gateway = MockGenerationGateway::new();
        let mut seq = Sequence::new();
        gateway
            .expect_generate()
            .with(eq(PromptKind::Opening), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("opening".to_string()));
        gateway
            .expect_generate()
            .with(eq(PromptKind::Continuation), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(GenerationUnavailable::EmptyCompletion));
        gateway
            .expect_generate()
            .with(eq(PromptKind::Continuation), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("better now".to_string()));
        let orch = orchestrator(gateway);

        let started = orch.start_session(profile()).await.unwrap();
        let err = orch
            .post_student_message(started.id, "What brings you in?")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Generation(_)));

        // Nothing committed: not even the student turn.
        let snapshot = orch.snapshot(started.id).await.unwrap();
        assert_eq!(snapshot.turns.len(), 1);
        assert!(snapshot.active);

        // The same input retried succeeds and lands both turns.
        let outcome = orch
            .post_student_message(started.id, "What brings you in?")
            .await
            .unwrap();
        assert_eq!(outcome, StudentTurnOutcome::Reply("better now".to_string()));
        assert_eq!(orch.snapshot(started.id).await.unwrap().turns.len(), 3);
    }

    #[tokio::test]
    async fn end_session_before_any_student_turn_is_legal() {
        let mut gateway = MockGenerationGateway::new();
        expect_opening(&mut gateway, "opening");
        gateway
            .expect_generate()
            .with(eq(PromptKind::Evaluation), always())
            .times(1)
            .returning(|_, _| Ok("short session".to_string()));
        let orch = orchestrator(gateway);

        let started = orch.start_session(profile()).await.unwrap();
        let report = orch.end_session(started.id).await.unwrap();
        assert_eq!(report, "short session");
    }

    /// The end-to-end walkthrough: open, one exchange, quit, evaluate.
    #[tokio::test]
    async fn full_session_scenario() {
        let mut gateway = MockGenerationGateway::new();
        let mut seq = Sequence::new();
        gateway
            .expect_generate()
            .with(eq(PromptKind::Opening), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("I don't know why I'm so tense.".to_string()));
        gateway
            .expect_generate()
            .with(eq(PromptKind::Continuation), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("Maybe since my job changed... my chest aches.".to_string()));
        gateway
            .expect_generate()
            .with(eq(PromptKind::Evaluation), always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("Good opening question; probe feelings sooner.".to_string()));
        let orch = orchestrator(gateway);

        let started = orch.start_session(profile()).await.unwrap();
        assert_eq!(orch.snapshot(started.id).await.unwrap().turns.len(), 1);

        let reply = orch
            .post_student_message(started.id, "How are you feeling today?")
            .await
            .unwrap();
        assert_eq!(
            reply,
            StudentTurnOutcome::Reply("Maybe since my job changed... my chest aches.".to_string())
        );
        assert_eq!(orch.snapshot(started.id).await.unwrap().turns.len(), 3);

        let outcome = orch.post_student_message(started.id, "quit").await.unwrap();
        let StudentTurnOutcome::Ended { report } = outcome else {
            panic!("expected the session to end");
        };
        assert_eq!(report, "Good opening question; probe feelings sooner.");

        let err = orch
            .post_student_message(started.id, "still there?")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SessionEnded));

        let again = orch.end_session(started.id).await.unwrap();
        assert!(!again.is_empty());
        assert_eq!(again, report);
    }
}
