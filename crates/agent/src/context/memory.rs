//! Per-execution agent memory.
//!
//! Owned by a single execution and never shared. The iteration log and the
//! observation history only grow, and `task_complete` only moves from
//! false to true.

use serde::Serialize;
use steward_core::provider::ToolDefinition;

use crate::phase::{Action, Plan, Reflection};

/// What happened during one plan–act–reflect pass.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub plan: Plan,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,

    /// Absent when the action was a `final_result`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<Reflection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentMemory {
    task: String,
    tools: Vec<ToolDefinition>,
    iterations: Vec<IterationRecord>,
    observations: Vec<String>,
    task_complete: bool,
}

impl AgentMemory {
    pub fn new(task: impl Into<String>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            task: task.into(),
            tools,
            iterations: Vec::new(),
            observations: Vec::new(),
            task_complete: false,
        }
    }

    /// Open a new iteration with its plan.
    pub fn begin_iteration(&mut self, plan: Plan) {
        self.iterations.push(IterationRecord {
            plan,
            action: None,
            observation: None,
            reflection: None,
        });
    }

    /// Record the current iteration's action and its observation.
    pub fn record_action(&mut self, action: Action, observation: String) {
        if let Some(current) = self.iterations.last_mut() {
            current.action = Some(action);
            current.observation = Some(observation.clone());
        }
        self.observations.push(observation);
    }

    pub fn record_reflection(&mut self, reflection: Reflection) {
        if reflection.task_complete {
            self.task_complete = true;
        }
        if let Some(current) = self.iterations.last_mut() {
            current.reflection = Some(reflection);
        }
    }

    pub fn mark_complete(&mut self) {
        self.task_complete = true;
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn iterations(&self) -> &[IterationRecord] {
        &self.iterations
    }

    pub fn observations(&self) -> &[String] {
        &self.observations
    }

    pub fn is_complete(&self) -> bool {
        self.task_complete
    }

    /// The iteration log as prose for the planning prompt. Empty before the
    /// first iteration.
    pub fn render_history(&self) -> String {
        if self.iterations.is_empty() {
            return String::new();
        }

        let entries: Vec<String> = self
            .iterations
            .iter()
            .enumerate()
            .map(|(i, record)| {
                format!(
                    "Iteration {}:\nPlan: {}\nAction: {}\nObservation: {}\nReflection: {}\n",
                    i + 1,
                    compact(&record.plan),
                    record.action.as_ref().map_or_else(|| "No action".into(), compact),
                    record.observation.as_deref().unwrap_or("No observation"),
                    record
                        .reflection
                        .as_ref()
                        .map_or_else(|| "No reflection".into(), compact),
                )
            })
            .collect();

        format!("Previous iterations:\n{}", entries.join("\n"))
    }
}

fn compact<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflection(done: bool) -> Reflection {
        Reflection {
            progress_assessment: "ok".into(),
            completed_steps: vec![1],
            unexpected_observations: None,
            task_complete: done,
            next_step: None,
        }
    }

    #[test]
    fn records_one_entry_per_iteration() {
        let mut memory = AgentMemory::new("task", vec![]);
        memory.begin_iteration(Plan::fallback());
        memory.record_action(Action::reasoning("think"), "Reasoning: think".into());
        memory.record_reflection(reflection(false));

        assert_eq!(memory.iterations().len(), 1);
        assert_eq!(memory.observations(), ["Reasoning: think"]);
        let record = &memory.iterations()[0];
        assert!(record.action.is_some());
        assert!(record.reflection.is_some());
    }

    #[test]
    fn completion_is_monotonic() {
        let mut memory = AgentMemory::new("task", vec![]);
        memory.begin_iteration(Plan::fallback());
        memory.record_reflection(reflection(true));
        assert!(memory.is_complete());

        memory.begin_iteration(Plan::fallback());
        memory.record_reflection(reflection(false));
        assert!(memory.is_complete());
    }

    #[test]
    fn history_is_empty_before_first_iteration() {
        let memory = AgentMemory::new("task", vec![]);
        assert_eq!(memory.render_history(), "");
    }

    #[test]
    fn history_lists_every_iteration() {
        let mut memory = AgentMemory::new("task", vec![]);
        memory.begin_iteration(Plan::fallback());
        memory.record_action(Action::reasoning("a"), "Reasoning: a".into());
        memory.begin_iteration(Plan::fallback());

        let history = memory.render_history();
        assert!(history.starts_with("Previous iterations:\n"));
        assert!(history.contains("Iteration 1:"));
        assert!(history.contains("Observation: Reasoning: a"));
        assert!(history.contains("Iteration 2:"));
        assert!(history.contains("Action: No action"));
        assert!(history.contains("Reflection: No reflection"));
    }

    #[test]
    fn serializes_for_trace_metadata() {
        let mut memory = AgentMemory::new("task", vec![]);
        memory.begin_iteration(Plan::fallback());
        memory.mark_complete();
        let value = serde_json::to_value(&memory).unwrap();
        assert_eq!(value["task"], "task");
        assert_eq!(value["task_complete"], true);
        assert_eq!(value["iterations"][0]["plan"]["task_understanding"], "Fallback plan");
        assert!(value["iterations"][0].get("action").is_none());
    }
}
