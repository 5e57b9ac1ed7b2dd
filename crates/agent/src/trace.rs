//! The execution trace returned alongside the final answer.

use serde::{Deserialize, Serialize};

/// Which phase produced a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentRole {
    #[serde(rename = "Task Planner")]
    Planner,
    #[serde(rename = "Action Executor")]
    Executor,
    #[serde(rename = "Progress Reflector")]
    Reflector,
    #[serde(rename = "Task Summarizer")]
    Summarizer,
}

impl AgentRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Planner => "Task Planner",
            Self::Executor => "Action Executor",
            Self::Reflector => "Progress Reflector",
            Self::Summarizer => "Task Summarizer",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One trace entry. Entries are appended in phase order and never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent_role: AgentRole,

    /// Human-readable summary of the phase
    pub content: String,

    /// The phase payload as JSON
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl AgentResponse {
    pub fn new(agent_role: AgentRole, content: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            agent_role,
            content: content.into(),
            metadata,
        }
    }
}
