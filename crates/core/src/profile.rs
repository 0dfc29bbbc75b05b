use serde::{Deserialize, Serialize};

/// The synthetic patient persona a training session is built around.
///
/// A profile is captured once from operator input when the session is
/// created and never changes for the lifetime of the session. Every prompt
/// sent to the generation service embeds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Patient age in years.
    pub age: u8,
    /// Presenting symptoms, in the order the operator listed them.
    pub symptoms: Vec<String>,
    /// Behavioral presentation, e.g. "guarded", "open", "agitated".
    pub behavior: String,
    /// Speaking tone, e.g. "flat", "hopeful", "irritable".
    pub tone: String,
}

impl PatientProfile {
    /// Creates a new profile from operator-supplied descriptors.
    pub fn new(age: u8, symptoms: Vec<String>, behavior: String, tone: String) -> Self {
        Self {
            age,
            symptoms,
            behavior,
            tone,
        }
    }

    /// The symptom list as a single comma-separated string, the form the
    /// prompt templates expect.
    pub fn symptoms_line(&self) -> String {
        self.symptoms.join(", ")
    }
}
