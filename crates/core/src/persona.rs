//! Personas: the role framing prepended to each phase prompt.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PLANNER_KEY: &str = "planner_agent";
pub const ACTOR_KEY: &str = "actor_agent";
pub const REFLECTOR_KEY: &str = "reflector_agent";

/// A persona record. Every field is optional; gaps render with defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Personality, rendered as CHARACTER
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,

    /// What the agent does, rendered as FUNCTION
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strengths: Option<Vec<String>>,
}

impl Persona {
    pub fn new(
        role: impl Into<String>,
        persona: impl Into<String>,
        description: impl Into<String>,
        strengths: &[&str],
    ) -> Self {
        Self {
            role: Some(role.into()),
            persona: Some(persona.into()),
            description: Some(description.into()),
            strengths: Some(strengths.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.persona.is_none()
            && self.description.is_none()
            && self.strengths.is_none()
    }
}

/// Render the context block for a persona.
///
/// Returns an empty string when no persona (or an empty one) is supplied.
pub fn render_context(persona: Option<&Persona>) -> String {
    let Some(persona) = persona.filter(|p| !p.is_empty()) else {
        return String::new();
    };

    let role = persona.role.as_deref().unwrap_or("Assistant");
    let character = persona.persona.as_deref().unwrap_or("Helpful and knowledgeable");
    let function = persona
        .description
        .as_deref()
        .unwrap_or("Provides helpful responses");
    let strengths = match &persona.strengths {
        Some(list) => list.join(", "),
        None => "Assistance".to_string(),
    };

    format!(
        "=== AGENT CONTEXT ===\n\
         ROLE: {role}\n\
         CHARACTER: {character}\n\
         FUNCTION: {function}\n\
         STRENGTHS: {strengths}\n\
         ==================\n\
         \n\
         You are acting as the {role}. Your personality is {character}\n"
    )
}

/// Role key to persona lookup, shared read-only across executions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaCatalog {
    personas: HashMap<String, Persona>,
}

impl PersonaCatalog {
    /// An empty catalog: every lookup yields no persona.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in personas for the three loop phases.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.insert(
            PLANNER_KEY,
            Persona::new(
                "Task Planner",
                "Methodical and thorough",
                "Breaks a request into ordered, tool-aware steps with a clear success criterion",
                &["Decomposition", "Anticipating obstacles", "Choosing the right tools"],
            ),
        );
        catalog.insert(
            ACTOR_KEY,
            Persona::new(
                "Action Executor",
                "Decisive and practical",
                "Carries out the next step of the plan using tools or reasoning",
                &["Tool usage", "Focused execution", "Producing concrete results"],
            ),
        );
        catalog.insert(
            REFLECTOR_KEY,
            Persona::new(
                "Progress Reflector",
                "Critical and honest",
                "Judges progress against the plan and decides whether the task is complete",
                &["Self-assessment", "Spotting gaps", "Course correction"],
            ),
        );
        catalog
    }

    pub fn insert(&mut self, key: impl Into<String>, persona: Persona) {
        self.personas.insert(key.into(), persona);
    }

    pub fn get(&self, key: &str) -> Option<&Persona> {
        self.personas.get(key)
    }

    /// Overlay `other` onto this catalog; entries in `other` win.
    pub fn merged(mut self, other: &PersonaCatalog) -> Self {
        for (key, persona) in &other.personas {
            self.personas.insert(key.clone(), persona.clone());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl From<HashMap<String, Persona>> for PersonaCatalog {
    fn from(personas: HashMap<String, Persona>) -> Self {
        Self { personas }
    }
}
