//! Typed payloads for the three loop phases.
//!
//! Each phase forces the model to call one function. The decoded
//! arguments become a [`Plan`], an [`Action`], or a [`Reflection`]; any
//! other answer is a mismatch and the phase falls back to a fixed payload.
//!
//! Only required fields decide a mismatch. A malformed optional field
//! decodes to its default so the rest of the payload survives.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use steward_core::error::ProviderError;
use steward_core::provider::{GenerateResponse, ToolDefinition};

pub const PLAN_FUNCTION: &str = "create_task_plan";
pub const ACTION_FUNCTION: &str = "execute_action";
pub const REFLECTION_FUNCTION: &str = "reflect_on_progress";

// ── Plan ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub task_understanding: String,

    #[serde(default, deserialize_with = "lenient_plan_steps")]
    pub plan_steps: Vec<PlanStep>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub expected_outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(deserialize_with = "step_number")]
    pub step_number: u32,
    pub step_description: String,

    #[serde(
        default,
        deserialize_with = "lenient_strings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required_tools: Vec<String>,
}

impl Plan {
    /// Used when the model answers without calling `create_task_plan`.
    pub fn fallback() -> Self {
        Self {
            task_understanding: "Fallback plan".into(),
            plan_steps: Vec::new(),
            expected_outcome: "Best effort.".into(),
        }
    }

    pub fn from_error(error: &ProviderError) -> Self {
        Self {
            task_understanding: format!("Error: {error}"),
            plan_steps: Vec::new(),
            expected_outcome: "Error occurred.".into(),
        }
    }
}

// ── Action ──────────────────────────────────────────────────────────────

/// One step taken by the actor, tagged by `action_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum Action {
    UseTool {
        #[serde(default, deserialize_with = "lenient_string")]
        tool_name: String,
        #[serde(default, deserialize_with = "lenient_object")]
        tool_parameters: serde_json::Map<String, Value>,
    },
    Reasoning {
        #[serde(default = "no_reasoning")]
        reasoning: String,
    },
    IntermediateResult {
        #[serde(default = "no_result")]
        result: String,
    },
    /// `None` when the model omitted the result.
    FinalResult {
        #[serde(
            default,
            deserialize_with = "lenient_text",
            skip_serializing_if = "Option::is_none"
        )]
        result: Option<String>,
    },
}

/// Shown in observations and the trace for a `final_result` without a result.
pub const NO_RESULT: &str = "No result provided.";

/// The final answer for a `final_result` without a result.
pub const COMPLETED: &str = "Task completed successfully.";

fn no_reasoning() -> String {
    "No reasoning provided.".into()
}
fn no_result() -> String {
    NO_RESULT.into()
}

impl Action {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning {
            reasoning: text.into(),
        }
    }

    /// Used when the model answers without calling `execute_action`.
    pub fn fallback() -> Self {
        Self::reasoning("Unable to determine next action.")
    }

    pub fn from_error(error: &ProviderError) -> Self {
        Self::reasoning(format!("Error occurred: {error}"))
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::FinalResult { .. })
    }

    /// The answer a `final_result` hands back to the caller.
    pub fn final_answer(&self) -> Option<&str> {
        match self {
            Self::FinalResult { result } => Some(result.as_deref().unwrap_or(COMPLETED)),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UseTool { .. } => "use_tool",
            Self::Reasoning { .. } => "reasoning",
            Self::IntermediateResult { .. } => "intermediate_result",
            Self::FinalResult { .. } => "final_result",
        }
    }
}

// ── Reflection ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub progress_assessment: String,

    #[serde(
        default,
        deserialize_with = "lenient_step_numbers",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub completed_steps: Vec<u32>,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub unexpected_observations: Option<String>,

    pub task_complete: bool,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_step: Option<String>,
}

impl Reflection {
    fn incomplete(assessment: String) -> Self {
        Self {
            progress_assessment: assessment,
            completed_steps: Vec::new(),
            unexpected_observations: None,
            task_complete: false,
            next_step: None,
        }
    }

    /// Used when the model answers without calling `reflect_on_progress`.
    pub fn fallback() -> Self {
        Self::incomplete("Unable to assess progress.".into())
    }

    pub fn from_error(error: &ProviderError) -> Self {
        Self::incomplete(format!("Error occurred: {error}"))
    }
}

// ── Lenient fields ──────────────────────────────────────────────────────

/// A non-negative whole number, also when sent as `3.0`.
fn whole_number(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    let f = value.as_f64()?;
    (f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX)).then_some(f as u32)
}

fn step_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    whole_number(&value).ok_or_else(|| D::Error::custom(format!("invalid step number: {value}")))
}

fn lenient_step_numbers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u32>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(whole_number).collect(),
        _ => Vec::new(),
    })
}

/// Steps that fail to decode are dropped, not the plan.
fn lenient_plan_steps<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<PlanStep>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    lenient_text(deserializer).map(Option::unwrap_or_default)
}

/// `null` or any non-object becomes an empty argument map.
fn lenient_object<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<serde_json::Map<String, Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    })
}

// ── Decoding ────────────────────────────────────────────────────────────

/// Outcome of one constrained call.
#[derive(Debug)]
pub enum Decoded<T> {
    Payload(T),
    /// The model answered, but not with a well-formed call to the function.
    Mismatch(String),
    Failed(ProviderError),
}

/// Decode a phase answer, requiring a call to `function` whose arguments
/// deserialize into `T`.
pub fn decode<T: DeserializeOwned>(
    response: Result<GenerateResponse, ProviderError>,
    function: &str,
) -> Decoded<T> {
    match response {
        Err(e) => Decoded::Failed(e),
        Ok(GenerateResponse::Text { content }) => {
            let preview: String = content.chars().take(80).collect();
            Decoded::Mismatch(format!("expected a call to {function}, got text: {preview}"))
        }
        Ok(GenerateResponse::ToolCall { name, .. }) if name != function => {
            Decoded::Mismatch(format!("expected a call to {function}, got {name}"))
        }
        Ok(GenerateResponse::ToolCall { arguments, .. }) => {
            match serde_json::from_value::<T>(arguments) {
                Ok(payload) => Decoded::Payload(payload),
                Err(e) => Decoded::Mismatch(format!("malformed {function} arguments: {e}")),
            }
        }
    }
}

// ── Function schemas ────────────────────────────────────────────────────

pub fn plan_schema() -> ToolDefinition {
    ToolDefinition {
        name: PLAN_FUNCTION.into(),
        description: "Creates a plan for how to accomplish the given task".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "task_understanding": {
                    "type": "string",
                    "description": "Detailed understanding of the task requirements"
                },
                "plan_steps": {
                    "type": "array",
                    "description": "Ordered steps to accomplish the task",
                    "items": {
                        "type": "object",
                        "properties": {
                            "step_number": {
                                "type": "integer",
                                "description": "Position of the step in the plan"
                            },
                            "step_description": {
                                "type": "string",
                                "description": "What this step accomplishes"
                            },
                            "required_tools": {
                                "type": "array",
                                "items": { "type": "string" },
                                "description": "Tools needed for this step"
                            }
                        },
                        "required": ["step_number", "step_description"]
                    }
                },
                "expected_outcome": {
                    "type": "string",
                    "description": "What success looks like for this task"
                }
            },
            "required": ["task_understanding", "plan_steps", "expected_outcome"]
        }),
    }
}

pub fn action_schema() -> ToolDefinition {
    ToolDefinition {
        name: ACTION_FUNCTION.into(),
        description: "Executes an action or tool to work toward task completion".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "action_type": {
                    "type": "string",
                    "enum": ["use_tool", "reasoning", "intermediate_result", "final_result"],
                    "description": "Type of action to take"
                },
                "tool_name": {
                    "type": "string",
                    "description": "Name of the tool to use (when action_type is use_tool)"
                },
                "tool_parameters": {
                    "type": "object",
                    "description": "Arguments for the tool (when action_type is use_tool)"
                },
                "reasoning": {
                    "type": "string",
                    "description": "Reasoning about the current state (when action_type is reasoning)"
                },
                "result": {
                    "type": "string",
                    "description": "Intermediate or final result (when action_type is intermediate_result or final_result)"
                }
            },
            "required": ["action_type"]
        }),
    }
}

pub fn reflection_schema() -> ToolDefinition {
    ToolDefinition {
        name: REFLECTION_FUNCTION.into(),
        description: "Evaluates progress toward task completion and decides next steps".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "progress_assessment": {
                    "type": "string",
                    "description": "Assessment of progress toward the goal"
                },
                "completed_steps": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "Plan steps that are now complete"
                },
                "unexpected_observations": {
                    "type": "string",
                    "description": "Unexpected findings or obstacles"
                },
                "task_complete": {
                    "type": "boolean",
                    "description": "Whether the overall task is now complete"
                },
                "next_step": {
                    "type": "string",
                    "description": "The next step to take if the task is not complete"
                }
            },
            "required": ["progress_assessment", "task_complete"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_plan_call() {
        let response = GenerateResponse::tool_call(
            PLAN_FUNCTION,
            json!({
                "task_understanding": "Say hello",
                "plan_steps": [{"step_number": 1, "step_description": "Greet"}],
                "expected_outcome": "A greeting"
            }),
        );
        let Decoded::Payload(plan) = decode::<Plan>(Ok(response), PLAN_FUNCTION) else {
            panic!("expected a plan");
        };
        assert_eq!(plan.task_understanding, "Say hello");
        assert_eq!(plan.plan_steps[0].step_number, 1);
        assert!(plan.plan_steps[0].required_tools.is_empty());
    }

    #[test]
    fn text_answer_is_mismatch() {
        let decoded = decode::<Plan>(Ok(GenerateResponse::text("I think...")), PLAN_FUNCTION);
        assert!(matches!(decoded, Decoded::Mismatch(_)));
    }

    #[test]
    fn wrong_function_is_mismatch() {
        let response = GenerateResponse::tool_call("something_else", json!({}));
        let decoded = decode::<Reflection>(Ok(response), REFLECTION_FUNCTION);
        assert!(matches!(decoded, Decoded::Mismatch(m) if m.contains("something_else")));
    }

    #[test]
    fn malformed_arguments_are_mismatch() {
        let response = GenerateResponse::tool_call(REFLECTION_FUNCTION, json!({"task_complete": "yes"}));
        let decoded = decode::<Reflection>(Ok(response), REFLECTION_FUNCTION);
        assert!(matches!(decoded, Decoded::Mismatch(_)));
    }

    #[test]
    fn odd_optional_fields_keep_the_reflection() {
        let response = GenerateResponse::tool_call(
            REFLECTION_FUNCTION,
            json!({
                "progress_assessment": "All done",
                "completed_steps": [1.0, 2, "three", -1],
                "unexpected_observations": null,
                "task_complete": true,
                "next_step": 7
            }),
        );
        let Decoded::Payload(reflection) = decode::<Reflection>(Ok(response), REFLECTION_FUNCTION)
        else {
            panic!("expected a reflection");
        };
        assert!(reflection.task_complete);
        assert_eq!(reflection.completed_steps, vec![1, 2]);
        assert_eq!(reflection.unexpected_observations, None);
        assert_eq!(reflection.next_step, None);
    }

    #[test]
    fn odd_optional_fields_keep_the_plan() {
        let response = GenerateResponse::tool_call(
            PLAN_FUNCTION,
            json!({
                "task_understanding": "Check the weather",
                "plan_steps": [
                    {"step_number": 1.0, "step_description": "Look it up", "required_tools": ["get_weather", 5]},
                    {"step_description": "missing number"}
                ],
                "expected_outcome": null
            }),
        );
        let Decoded::Payload(plan) = decode::<Plan>(Ok(response), PLAN_FUNCTION) else {
            panic!("expected a plan");
        };
        assert_eq!(plan.plan_steps.len(), 1);
        assert_eq!(plan.plan_steps[0].step_number, 1);
        assert_eq!(plan.plan_steps[0].required_tools, vec!["get_weather".to_string()]);
        assert_eq!(plan.expected_outcome, "");
    }

    #[test]
    fn null_tool_parameters_become_empty() {
        let action: Action = serde_json::from_value(json!({
            "action_type": "use_tool",
            "tool_name": "echo",
            "tool_parameters": null
        }))
        .unwrap();
        assert_eq!(
            action,
            Action::UseTool {
                tool_name: "echo".into(),
                tool_parameters: serde_json::Map::new(),
            }
        );
    }

    #[test]
    fn final_result_without_result() {
        let action: Action = serde_json::from_value(json!({"action_type": "final_result"})).unwrap();
        assert_eq!(action, Action::FinalResult { result: None });
        assert_eq!(action.final_answer(), Some(COMPLETED));

        let done = Action::FinalResult {
            result: Some("Done".into()),
        };
        assert_eq!(done.final_answer(), Some("Done"));
        assert_eq!(Action::reasoning("x").final_answer(), None);
    }

    #[test]
    fn provider_error_is_failed() {
        let decoded = decode::<Action>(
            Err(ProviderError::Network("refused".into())),
            ACTION_FUNCTION,
        );
        assert!(matches!(decoded, Decoded::Failed(ProviderError::Network(_))));
    }

    #[test]
    fn action_variants_deserialize() {
        let tool: Action = serde_json::from_value(json!({
            "action_type": "use_tool",
            "tool_name": "echo",
            "tool_parameters": {"text": "hi"}
        }))
        .unwrap();
        assert_eq!(tool.kind(), "use_tool");

        let reasoning: Action = serde_json::from_value(json!({"action_type": "reasoning"})).unwrap();
        assert_eq!(reasoning, Action::reasoning("No reasoning provided."));

        let done: Action =
            serde_json::from_value(json!({"action_type": "final_result", "result": "Done"})).unwrap();
        assert!(done.is_final());

        let unknown = serde_json::from_value::<Action>(json!({"action_type": "dance"}));
        assert!(unknown.is_err());
    }

    #[test]
    fn action_serializes_with_tag() {
        let value = serde_json::to_value(Action::IntermediateResult {
            result: "half".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"action_type": "intermediate_result", "result": "half"}));
    }

    #[test]
    fn fallbacks_match_phase_contract() {
        let err = ProviderError::Timeout("60s".into());
        assert_eq!(Plan::fallback().task_understanding, "Fallback plan");
        assert_eq!(Plan::from_error(&err).expected_outcome, "Error occurred.");
        assert!(Plan::from_error(&err).task_understanding.starts_with("Error: "));
        assert_eq!(Action::fallback(), Action::reasoning("Unable to determine next action."));
        assert!(!Reflection::fallback().task_complete);
        assert!(
            Reflection::from_error(&err)
                .progress_assessment
                .starts_with("Error occurred: ")
        );
    }

    #[test]
    fn schemas_name_their_functions() {
        assert_eq!(plan_schema().name, PLAN_FUNCTION);
        assert_eq!(action_schema().parameters["required"], json!(["action_type"]));
        assert_eq!(
            reflection_schema().parameters["required"],
            json!(["progress_assessment", "task_complete"])
        );
    }
}
