//! Prompt rendering for each phase.
//!
//! Pure functions over memory and phase payloads; nothing here touches the
//! provider or the tool registry.

use serde::Serialize;
use steward_core::provider::ToolDefinition;

use super::memory::AgentMemory;
use crate::phase::{Action, NO_RESULT, Plan};

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn tool_catalog(tools: &[ToolDefinition]) -> String {
    pretty(tools)
}

pub fn planning_prompt(persona_context: &str, memory: &AgentMemory) -> String {
    format!(
        "{persona_context}
TASK: {task}

{history}

Available tools:
{tools}

Create a detailed plan for accomplishing the request above. Work out the steps,
which tools could help at each step, and what a successful outcome looks like.

If earlier iterations are listed, build on what they found and adjust the plan
accordingly.
",
        task = memory.task(),
        history = memory.render_history(),
        tools = tool_catalog(memory.tools()),
    )
}

pub fn acting_prompt(persona_context: &str, memory: &AgentMemory, plan: &Plan) -> String {
    format!(
        "{persona_context}
TASK: {task}

Current Plan:
{plan}

Previous Observations:
{observations}

Available tools:
{tools}

Carry out the next appropriate step of the plan. You may call one of the
available tools, reason about the current state, or report an intermediate or
final result.

Think step by step and take the single action that moves the task closest to
completion.
",
        task = memory.task(),
        plan = pretty(plan),
        observations = pretty(memory.observations()),
        tools = tool_catalog(memory.tools()),
    )
}

pub fn reflection_prompt(
    persona_context: &str,
    memory: &AgentMemory,
    plan: &Plan,
    action: &Action,
    observation: &str,
) -> String {
    format!(
        "{persona_context}
TASK: {task}

Current Plan:
{plan}

Recent Action:
{action}

Observation from Action:
{observation}

Previous Iterations:
{iterations}

Reflect on progress toward the overall task. Assess what has been done, which
plan steps are complete, and what remains. Decide whether the task is now
complete and, if not, what the next step should be.
",
        task = memory.task(),
        plan = pretty(plan),
        action = pretty(action),
        iterations = pretty(memory.iterations()),
    )
}

/// Free-text prompt used once the iteration budget runs out.
pub fn summary_prompt(memory: &AgentMemory) -> String {
    format!(
        "TASK: {task}

EXECUTION HISTORY:
{history}

Using the execution history above, write a complete summary of the findings and
results that answers the original request.
",
        task = memory.task(),
        history = pretty(memory.iterations()),
    )
}

/// Human-readable content for an `Action Executor` trace entry.
pub fn format_action_content(action: &Action, observation: &str) -> String {
    match action {
        Action::UseTool {
            tool_name,
            tool_parameters,
        } => format!(
            "Tool Used: {tool_name}\n\nParameters: {}\n\nObservation: {observation}",
            pretty(tool_parameters)
        ),
        Action::Reasoning { reasoning } => {
            format!("Reasoning:\n{reasoning}\n\nObservation: {observation}")
        }
        Action::IntermediateResult { result } => {
            format!("Intermediate Result:\n{result}\n\nObservation: {observation}")
        }
        Action::FinalResult { result } => format!(
            "Final Result:\n{}\n\nObservation: {observation}",
            result.as_deref().unwrap_or(NO_RESULT)
        ),
    }
}
