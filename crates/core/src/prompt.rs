//! Prompt templates and rendering.
//!
//! The three prompts are Markdown templates with `{age}`, `{symptoms}`,
//! `{behavior}`, `{tone}` and `{transcript}` placeholders. Built-in
//! templates ship with the crate; a deployment may override any of them by
//! pointing the service at a directory containing `opening.md`,
//! `continuation.md`, or `evaluation.md`. Rendering is deterministic from
//! `(profile, transcript)` — the non-determinism lives entirely behind the
//! generation gateway.

use crate::gateway::PromptKind;
use crate::profile::PatientProfile;
use crate::transcript::Transcript;
use anyhow::{Context, Result};
use std::path::Path;

/// The set of templates a session runs with, fixed at startup.
#[derive(Debug, Clone)]
pub struct PromptSet {
    opening: String,
    continuation: String,
    evaluation: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptSet {
    /// The templates compiled into the crate.
    pub fn builtin() -> Self {
        Self {
            opening: include_str!("../prompts/opening.md").to_string(),
            continuation: include_str!("../prompts/continuation.md").to_string(),
            evaluation: include_str!("../prompts/evaluation.md").to_string(),
        }
    }

    /// Loads templates from a directory, falling back to the built-in text
    /// for any of the three files that is absent.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut set = Self::builtin();
        for (name, slot) in [
            ("opening.md", &mut set.opening),
            ("continuation.md", &mut set.continuation),
            ("evaluation.md", &mut set.evaluation),
        ] {
            let path = dir.join(name);
            if path.is_file() {
                *slot = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read prompt template {}", path.display()))?;
            }
        }
        Ok(set)
    }

    /// Renders the prompt of the given kind for a profile and transcript.
    ///
    /// The opening template carries no `{transcript}` placeholder: the
    /// opening line is built from the profile alone.
    pub fn render(
        &self,
        kind: PromptKind,
        profile: &PatientProfile,
        transcript: &Transcript,
    ) -> String {
        let template = match kind {
            PromptKind::Opening => &self.opening,
            PromptKind::Continuation => &self.continuation,
            PromptKind::Evaluation => &self.evaluation,
        };
        template
            .replace("{age}", &profile.age.to_string())
            .replace("{symptoms}", &profile.symptoms_line())
            .replace("{behavior}", &profile.behavior)
            .replace("{tone}", &profile.tone)
            .replace("{transcript}", &transcript.render())
    }
}
