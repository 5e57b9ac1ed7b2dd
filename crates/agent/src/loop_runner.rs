//! The plan–act–reflect loop implementation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use steward_config::AgentConfig;
use steward_core::error::{ProviderError, ToolError};
use steward_core::persona::{ACTOR_KEY, PLANNER_KEY, REFLECTOR_KEY, PersonaCatalog, render_context};
use steward_core::provider::{GenerateRequest, GenerateResponse, Provider};
use steward_core::tool::ToolRegistry;
use tracing::{debug, error, info, warn};

use crate::context::AgentMemory;
use crate::context::prompt;
use crate::phase::{
    ACTION_FUNCTION, Action, Decoded, NO_RESULT, PLAN_FUNCTION, Plan, REFLECTION_FUNCTION, Reflection,
    action_schema, decode, plan_schema, reflection_schema,
};
use crate::trace::{AgentResponse, AgentRole};

/// Final answer used when nothing better was produced.
pub const DEFAULT_FINAL_RESPONSE: &str = "Task processed, but no specific result was generated.";

/// Tunables for one execution.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Upper bound on plan–act–reflect cycles
    pub max_iterations: u32,

    pub planning_temperature: f32,
    pub acting_temperature: f32,
    pub reflection_temperature: f32,
    pub summarization_temperature: f32,

    /// Max tokens per LLM response
    pub max_tokens: Option<u32>,

    /// Deadline for each LLM call; expiry counts as a provider failure
    pub call_timeout: Duration,

    /// Deadline for each tool invocation
    pub tool_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

impl LoopSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            planning_temperature: config.planning_temperature,
            acting_temperature: config.acting_temperature,
            reflection_temperature: config.reflection_temperature,
            summarization_temperature: config.summarization_temperature,
            max_tokens: Some(config.max_tokens).filter(|&t| t > 0),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
        }
    }
}

/// What one execution produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub final_response: String,

    /// Trace entries in phase order, ending with one `Task Summarizer` entry
    pub intermediate_steps: Vec<AgentResponse>,

    /// Iterations started
    pub iterations: u32,

    pub task_complete: bool,

    /// Whether the execution stopped on a cancellation request
    pub cancelled: bool,
}

/// Runs the plan–act–reflect loop for one task at a time.
///
/// The agent holds only shared, read-only collaborators. All per-task
/// state lives in an [`AgentMemory`] created by each call to
/// [`execute`](Self::execute), so one agent can serve concurrent
/// executions.
pub struct AutonomousAgent {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Tools the actor may call
    tools: Arc<ToolRegistry>,

    /// Personas prepended to phase prompts
    personas: Arc<PersonaCatalog>,

    settings: LoopSettings,
}

impl AutonomousAgent {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            tools,
            personas: Arc::new(PersonaCatalog::empty()),
            settings: LoopSettings::default(),
        }
    }

    pub fn with_personas(mut self, personas: Arc<PersonaCatalog>) -> Self {
        self.personas = personas;
        self
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the maximum number of plan–act–reflect cycles.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.settings.max_iterations = max;
        self
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Run a task to completion.
    pub async fn execute(&self, query: &str) -> ExecutionResult {
        self.execute_with_cancel(query, &AtomicBool::new(false)).await
    }

    /// Run a task, stopping before the next phase once `cancel` is set.
    ///
    /// A cancelled execution skips summarization but still returns a final
    /// response and a trailing `Task Summarizer` entry.
    pub async fn execute_with_cancel(&self, query: &str, cancel: &AtomicBool) -> ExecutionResult {
        let max_iterations = self.settings.max_iterations;
        let mut memory = AgentMemory::new(query, self.tools.definitions());
        let mut trace: Vec<AgentResponse> = Vec::new();
        let mut final_response = DEFAULT_FINAL_RESPONSE.to_string();
        let mut iteration: u32 = 0;
        let mut cancelled = false;

        info!(
            provider = self.provider.name(),
            model = %self.model,
            tools = self.tools.len(),
            max_iterations,
            "Starting autonomous execution"
        );

        while iteration < max_iterations && !memory.is_complete() {
            if cancel.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }
            iteration += 1;
            info!(iteration, max_iterations, "Starting iteration");

            // ── Plan ──
            let plan = self.plan(&memory).await;
            trace.push(AgentResponse::new(
                AgentRole::Planner,
                format!("Plan created: {}", plan.task_understanding),
                to_metadata(&plan),
            ));
            memory.begin_iteration(plan.clone());

            if cancel.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }

            // ── Act ──
            let action = self.act(&memory, &plan).await;
            let observation = self.observe(&action).await;
            if let Some(answer) = action.final_answer() {
                memory.mark_complete();
                final_response = answer.to_string();
            }
            trace.push(AgentResponse::new(
                AgentRole::Executor,
                prompt::format_action_content(&action, &observation),
                serde_json::json!({
                    "action": to_metadata(&action),
                    "observation": observation,
                }),
            ));
            memory.record_action(action.clone(), observation.clone());

            if memory.is_complete() {
                info!(iteration, "Final result produced");
                break;
            }
            if cancel.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }

            // ── Reflect ──
            let reflection = self.reflect(&memory, &plan, &action, &observation).await;
            trace.push(AgentResponse::new(
                AgentRole::Reflector,
                format!("Progress Assessment:\n{}", reflection.progress_assessment),
                to_metadata(&reflection),
            ));
            memory.record_reflection(reflection);

            if memory.is_complete() {
                info!(iteration, "Task marked as complete");
            }
        }

        if cancelled {
            warn!(iteration, "Execution cancelled");
        } else if !memory.is_complete() {
            warn!(max_iterations, "Iteration budget exhausted without completion");
            match self.summarize(&memory).await {
                Ok(summary) if !summary.trim().is_empty() => final_response = summary,
                Ok(_) => warn!("Summarization returned no text, keeping default response"),
                Err(e) => {
                    error!(error = %e, "Error generating summary");
                    final_response.push_str(&format!(" Error generating summary: {e}"));
                }
            }
        }

        let task_complete = memory.is_complete();
        trace.push(AgentResponse::new(
            AgentRole::Summarizer,
            format!(
                "Summary of execution:\n- Completed {iteration} iterations\n- Task complete: {}\n- Final response generated",
                if task_complete { "Yes" } else { "No" }
            ),
            serde_json::json!({
                "iterations": iteration,
                "task_complete": task_complete,
                "memory": to_metadata(&memory),
            }),
        ));

        ExecutionResult {
            final_response,
            intermediate_steps: trace,
            iterations: iteration,
            task_complete,
            cancelled,
        }
    }

    // ── Phases ───────────────────────────────────────────────────────────

    async fn plan(&self, memory: &AgentMemory) -> Plan {
        let context = render_context(self.personas.get(PLANNER_KEY));
        let request = GenerateRequest::constrained(
            &self.model,
            prompt::planning_prompt(&context, memory),
            plan_schema(),
            self.settings.planning_temperature,
        );

        match decode::<Plan>(self.call(request).await, PLAN_FUNCTION) {
            Decoded::Payload(plan) => {
                debug!(steps = plan.plan_steps.len(), "Plan received");
                plan
            }
            Decoded::Mismatch(reason) => {
                warn!(%reason, "Planning call not returned, using fallback plan");
                Plan::fallback()
            }
            Decoded::Failed(e) => {
                error!(error = %e, "Planning phase failed");
                Plan::from_error(&e)
            }
        }
    }

    async fn act(&self, memory: &AgentMemory, plan: &Plan) -> Action {
        let context = render_context(self.personas.get(ACTOR_KEY));
        let request = GenerateRequest::constrained(
            &self.model,
            prompt::acting_prompt(&context, memory, plan),
            action_schema(),
            self.settings.acting_temperature,
        );

        match decode::<Action>(self.call(request).await, ACTION_FUNCTION) {
            Decoded::Payload(action) => {
                debug!(action_type = action.kind(), "Action received");
                action
            }
            Decoded::Mismatch(reason) => {
                warn!(%reason, "Action call not returned, using fallback action");
                Action::fallback()
            }
            Decoded::Failed(e) => {
                error!(error = %e, "Action phase failed");
                Action::from_error(&e)
            }
        }
    }

    async fn reflect(
        &self,
        memory: &AgentMemory,
        plan: &Plan,
        action: &Action,
        observation: &str,
    ) -> Reflection {
        let context = render_context(self.personas.get(REFLECTOR_KEY));
        let request = GenerateRequest::constrained(
            &self.model,
            prompt::reflection_prompt(&context, memory, plan, action, observation),
            reflection_schema(),
            self.settings.reflection_temperature,
        );

        match decode::<Reflection>(self.call(request).await, REFLECTION_FUNCTION) {
            Decoded::Payload(reflection) => reflection,
            Decoded::Mismatch(reason) => {
                warn!(%reason, "Reflection call not returned, using fallback reflection");
                Reflection::fallback()
            }
            Decoded::Failed(e) => {
                error!(error = %e, "Reflection phase failed");
                Reflection::from_error(&e)
            }
        }
    }

    async fn summarize(&self, memory: &AgentMemory) -> Result<String, ProviderError> {
        let request = GenerateRequest::text(
            &self.model,
            prompt::summary_prompt(memory),
            self.settings.summarization_temperature,
        );
        match self.call(request).await? {
            GenerateResponse::Text { content } => Ok(content),
            GenerateResponse::ToolCall { name, .. } => Err(ProviderError::InvalidResponse(format!(
                "expected a text summary, got a call to {name}"
            ))),
        }
    }

    /// One provider call under the configured deadline.
    async fn call(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let request = match self.settings.max_tokens {
            Some(max) => request.with_max_tokens(max),
            None => request,
        };
        let deadline = self.settings.call_timeout;
        match tokio::time::timeout(deadline, self.provider.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "no answer from {} within {}s",
                self.provider.name(),
                deadline.as_secs()
            ))),
        }
    }

    // ── Observation ──────────────────────────────────────────────────────

    async fn observe(&self, action: &Action) -> String {
        match action {
            Action::UseTool {
                tool_name,
                tool_parameters,
            } => self.run_tool(tool_name, tool_parameters.clone()).await,
            Action::Reasoning { reasoning } => format!("Reasoning: {reasoning}"),
            Action::IntermediateResult { result } => format!("Result: {result}"),
            Action::FinalResult { result } => {
                format!("Result: {}", result.as_deref().unwrap_or(NO_RESULT))
            }
        }
    }

    /// Invoke a tool, turning every failure into an observation string.
    async fn run_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> String {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = name, "Requested tool is not registered");
            return format!("Tool '{name}' not found or not executable.");
        };

        info!(tool = name, "Executing tool");
        let invocation = AssertUnwindSafe(tool.execute(serde_json::Value::Object(arguments)))
            .catch_unwind();

        let failure = match tokio::time::timeout(self.settings.tool_timeout, invocation).await {
            Ok(Ok(Ok(result))) => {
                debug!(tool = name, success = result.success, bytes = result.output.len(), "Tool finished");
                return result.output;
            }
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(panic)) => panic_message(panic.as_ref()),
            Err(_) => ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_secs: self.settings.tool_timeout.as_secs(),
            }
            .to_string(),
        };

        let observation = format!("Error executing tool {name}: {failure}");
        error!(tool = name, "{observation}");
        observation
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".into()
    }
}

fn to_metadata<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedProvider, action_call, plan_call, reflection_call};
    use serde_json::json;
    use steward_core::tool::FnTool;

    fn echo_registry() -> Arc<ToolRegistry> {
        let echo = FnTool::new(
            "echo",
            "Echo the text back",
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}),
            |args| {
                Box::pin(async move {
                    args["text"]
                        .as_str()
                        .map(String::from)
                        .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))
                })
            },
        );
        Arc::new(ToolRegistry::from_tools(vec![Box::new(echo)]).unwrap())
    }

    fn agent(provider: Arc<ScriptedProvider>, tools: Arc<ToolRegistry>) -> AutonomousAgent {
        AutonomousAgent::new(provider, "mock-model", tools)
    }

    fn roles(result: &ExecutionResult) -> Vec<AgentRole> {
        result.intermediate_steps.iter().map(|s| s.agent_role).collect()
    }

    #[tokio::test]
    async fn tool_observation_flows_into_trace() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("Echo a greeting"),
            action_call(json!({"action_type": "use_tool", "tool_name": "echo", "tool_parameters": {"text": "hi"}})),
            reflection_call(true),
        ]));
        let result = agent(provider.clone(), echo_registry()).execute("Say hi").await;

        assert_eq!(
            roles(&result),
            vec![
                AgentRole::Planner,
                AgentRole::Executor,
                AgentRole::Reflector,
                AgentRole::Summarizer
            ]
        );
        let executor = &result.intermediate_steps[1];
        assert!(executor.content.contains("echo"));
        assert!(executor.content.contains("hi"));
        assert_eq!(executor.metadata["observation"], "hi");
        assert!(result.task_complete);
        assert_eq!(provider.call_count(), 3);
        // Completion by reflection does not trigger summarization.
        assert_eq!(result.final_response, DEFAULT_FINAL_RESPONSE);
    }

    #[tokio::test]
    async fn final_result_skips_reflection() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("Answer directly"),
            action_call(json!({"action_type": "final_result", "result": "Done"})),
        ]));
        let result = agent(provider.clone(), echo_registry()).execute("Finish").await;

        assert_eq!(result.final_response, "Done");
        assert_eq!(
            roles(&result),
            vec![AgentRole::Planner, AgentRole::Executor, AgentRole::Summarizer]
        );
        assert_eq!(provider.call_count(), 2);
        assert!(result.task_complete);
        assert_eq!(result.iterations, 1);
    }

    #[tokio::test]
    async fn exhausted_budget_is_summarized() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("Think it over"),
            action_call(json!({"action_type": "reasoning", "reasoning": "Need more data"})),
            reflection_call(false),
            GenerateResponse::text("Here is what I found."),
        ]));
        let result = agent(provider.clone(), echo_registry())
            .with_max_iterations(1)
            .execute("Investigate")
            .await;

        assert_eq!(result.final_response, "Here is what I found.");
        assert!(!result.task_complete);
        assert_eq!(result.intermediate_steps.len(), 4);

        let requests = provider.requests();
        assert_eq!(requests.len(), 4);
        let summary = &requests[3];
        assert!(summary.constraint.is_none());
        assert!((summary.temperature - 0.7).abs() < f32::EPSILON);
        assert!(summary.prompt.contains("EXECUTION HISTORY"));
    }

    #[tokio::test]
    async fn unknown_tool_still_reflects() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("Use a tool"),
            action_call(json!({"action_type": "use_tool", "tool_name": "teleport", "tool_parameters": {}})),
            reflection_call(true),
        ]));
        let result = agent(provider, echo_registry()).execute("Go").await;

        let observation = result.intermediate_steps[1].metadata["observation"].as_str().unwrap();
        assert!(observation.contains("not found"));
        assert_eq!(observation, "Tool 'teleport' not found or not executable.");
        assert_eq!(result.intermediate_steps[2].agent_role, AgentRole::Reflector);
    }

    #[tokio::test]
    async fn float_step_numbers_keep_reflection_completion() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("Reason once"),
            action_call(json!({"action_type": "reasoning", "reasoning": "Easy"})),
            GenerateResponse::tool_call(
                REFLECTION_FUNCTION,
                json!({
                    "progress_assessment": "All done",
                    "completed_steps": [1.0],
                    "task_complete": true
                }),
            ),
        ]));
        let result = agent(provider.clone(), echo_registry()).execute("Go").await;

        assert!(result.task_complete);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(
            result.intermediate_steps[2].content,
            "Progress Assessment:\nAll done"
        );
    }

    #[tokio::test]
    async fn null_tool_parameters_still_run_the_tool() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("Use a tool"),
            action_call(json!({"action_type": "use_tool", "tool_name": "echo", "tool_parameters": null})),
            reflection_call(true),
        ]));
        let result = agent(provider, echo_registry()).execute("Go").await;

        let observation = result.intermediate_steps[1].metadata["observation"].as_str().unwrap();
        assert_eq!(
            observation,
            "Error executing tool echo: Invalid tool arguments: Missing 'text' argument"
        );
    }

    #[tokio::test]
    async fn final_result_without_result_uses_both_defaults() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("Wrap up"),
            action_call(json!({"action_type": "final_result"})),
        ]));
        let result = agent(provider, echo_registry()).execute("Finish").await;

        assert_eq!(result.final_response, "Task completed successfully.");
        let executor = &result.intermediate_steps[1];
        assert_eq!(executor.metadata["observation"], "Result: No result provided.");
        assert_eq!(
            executor.content,
            "Final Result:\nNo result provided.\n\nObservation: Result: No result provided."
        );
    }

    #[tokio::test]
    async fn tool_lookup_is_case_sensitive() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("Use a tool"),
            action_call(json!({"action_type": "use_tool", "tool_name": "ECHO", "tool_parameters": {"text": "x"}})),
            reflection_call(true),
        ]));
        let result = agent(provider, echo_registry()).execute("Go").await;
        let observation = result.intermediate_steps[1].metadata["observation"].as_str().unwrap();
        assert!(observation.contains("not found"));
    }

    #[tokio::test]
    async fn failing_provider_still_answers() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let result = agent(provider.clone(), echo_registry())
            .with_max_iterations(2)
            .execute("Anything")
            .await;

        assert!(result.final_response.starts_with(DEFAULT_FINAL_RESPONSE));
        assert!(result.final_response.contains(" Error generating summary: "));
        // two full cycles plus the summarizer
        assert_eq!(result.intermediate_steps.len(), 7);
        assert!(result.intermediate_steps[0].content.starts_with("Plan created: Error: "));
        assert_eq!(
            result.intermediate_steps[1].metadata["action"]["action_type"],
            "reasoning"
        );
        assert!(
            result.intermediate_steps[2]
                .content
                .starts_with("Progress Assessment:\nError occurred: ")
        );
        assert_eq!(provider.call_count(), 7);
    }

    #[tokio::test]
    async fn mismatched_answers_use_fallbacks() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            GenerateResponse::text("not a plan"),
            GenerateResponse::text("not an action"),
            GenerateResponse::tool_call("something_else", json!({})),
            GenerateResponse::text("Best summary I can give."),
        ]));
        let result = agent(provider, echo_registry())
            .with_max_iterations(1)
            .execute("Anything")
            .await;

        let steps = &result.intermediate_steps;
        assert_eq!(steps[0].content, "Plan created: Fallback plan");
        assert_eq!(steps[1].metadata["observation"], "Reasoning: Unable to determine next action.");
        assert_eq!(steps[2].content, "Progress Assessment:\nUnable to assess progress.");
        assert_eq!(result.final_response, "Best summary I can give.");
    }

    #[tokio::test]
    async fn reflection_completion_stops_before_next_plan() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "intermediate_result", "result": "partial"})),
            reflection_call(true),
        ]));
        let result = agent(provider.clone(), echo_registry())
            .with_max_iterations(5)
            .execute("Go")
            .await;

        assert_eq!(provider.call_count(), 3);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.intermediate_steps[1].metadata["observation"], "Result: partial");
        let summary = result.intermediate_steps.last().unwrap();
        assert_eq!(summary.metadata["iterations"], 1);
        assert_eq!(summary.metadata["task_complete"], true);
        assert!(summary.content.contains("Task complete: Yes"));
    }

    #[tokio::test]
    async fn phases_use_their_functions_and_temperatures() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "reasoning", "reasoning": "r"})),
            reflection_call(true),
        ]));
        agent(provider.clone(), echo_registry()).execute("Go").await;

        let requests = provider.requests();
        let expected = [
            (PLAN_FUNCTION, 0.4),
            (ACTION_FUNCTION, 0.5),
            (REFLECTION_FUNCTION, 0.4),
        ];
        for (request, (function, temperature)) in requests.iter().zip(expected) {
            let constraint = request.constraint.as_ref().unwrap();
            assert_eq!(constraint.function.name, function);
            assert!((request.temperature - temperature).abs() < f32::EPSILON);
            assert_eq!(request.model, "mock-model");
        }
    }

    #[tokio::test]
    async fn personas_frame_each_phase() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "reasoning", "reasoning": "r"})),
            reflection_call(true),
        ]));
        agent(provider.clone(), echo_registry())
            .with_personas(Arc::new(PersonaCatalog::builtin()))
            .execute("Go")
            .await;

        let requests = provider.requests();
        assert!(requests[0].prompt.contains("ROLE: Task Planner"));
        assert!(requests[1].prompt.contains("ROLE: Action Executor"));
        assert!(requests[2].prompt.contains("ROLE: Progress Reflector"));
    }

    #[tokio::test]
    async fn no_personas_means_no_context_block() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "final_result", "result": "ok"})),
        ]));
        agent(provider.clone(), echo_registry()).execute("Go").await;
        assert!(!provider.requests()[0].prompt.contains("AGENT CONTEXT"));
    }

    #[tokio::test]
    async fn blank_summary_keeps_default_response() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "reasoning", "reasoning": "r"})),
            reflection_call(false),
            GenerateResponse::text("   "),
        ]));
        let result = agent(provider, echo_registry())
            .with_max_iterations(1)
            .execute("Go")
            .await;
        assert_eq!(result.final_response, DEFAULT_FINAL_RESPONSE);
    }

    #[tokio::test]
    async fn tool_call_summary_is_an_error() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "reasoning", "reasoning": "r"})),
            reflection_call(false),
            GenerateResponse::tool_call("create_task_plan", json!({})),
        ]));
        let result = agent(provider, echo_registry())
            .with_max_iterations(1)
            .execute("Go")
            .await;
        assert!(result.final_response.contains("Error generating summary"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let provider = Arc::new(
            ScriptedProvider::ok(vec![plan_call("never seen")]).with_delay(Duration::from_secs(3600)),
        );
        let settings = LoopSettings {
            max_iterations: 1,
            call_timeout: Duration::from_secs(5),
            ..LoopSettings::default()
        };
        let result = agent(provider, echo_registry())
            .with_settings(settings)
            .execute("Go")
            .await;

        assert!(result.intermediate_steps[0].content.contains("timed out"));
        assert!(result.final_response.contains("Error generating summary"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out() {
        let sleepy = FnTool::new("sleepy", "Sleeps", json!({"type": "object"}), |_| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("woke".to_string())
            })
        });
        let tools = Arc::new(ToolRegistry::from_tools(vec![Box::new(sleepy)]).unwrap());
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "use_tool", "tool_name": "sleepy"})),
            reflection_call(true),
        ]));
        let settings = LoopSettings {
            tool_timeout: Duration::from_secs(2),
            ..LoopSettings::default()
        };
        let result = agent(provider, tools).with_settings(settings).execute("Go").await;

        let observation = result.intermediate_steps[1].metadata["observation"].as_str().unwrap();
        assert!(observation.starts_with("Error executing tool sleepy: "));
        assert!(observation.contains("timed out"));
    }

    #[tokio::test]
    async fn panicking_tool_becomes_observation() {
        let explode = FnTool::new("explode", "Always panics", json!({"type": "object"}), |_| {
            Box::pin(async {
                if true {
                    panic!("boom");
                }
                Ok::<_, ToolError>(String::new())
            })
        });
        let tools = Arc::new(ToolRegistry::from_tools(vec![Box::new(explode)]).unwrap());
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "use_tool", "tool_name": "explode", "tool_parameters": {}})),
            reflection_call(true),
        ]));
        let result = agent(provider, tools).execute("Go").await;

        assert_eq!(
            result.intermediate_steps[1].metadata["observation"],
            "Error executing tool explode: boom"
        );
        assert_eq!(result.intermediate_steps.len(), 4);
    }

    #[tokio::test]
    async fn tool_error_becomes_observation() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "use_tool", "tool_name": "echo", "tool_parameters": {}})),
            reflection_call(true),
        ]));
        let result = agent(provider, echo_registry()).execute("Go").await;
        let observation = result.intermediate_steps[1].metadata["observation"].as_str().unwrap();
        assert!(observation.starts_with("Error executing tool echo: Invalid tool arguments"));
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let cancel = AtomicBool::new(true);
        let result = agent(provider.clone(), echo_registry())
            .execute_with_cancel("Go", &cancel)
            .await;

        assert_eq!(provider.call_count(), 0);
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(roles(&result), vec![AgentRole::Summarizer]);
        assert_eq!(result.final_response, DEFAULT_FINAL_RESPONSE);
    }

    #[tokio::test]
    async fn cancellation_stops_between_phases() {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let stop = FnTool::new("stop", "Requests cancellation", json!({"type": "object"}), move |_| {
            flag.store(true, Ordering::SeqCst);
            Box::pin(async { Ok("stopping".to_string()) })
        });
        let tools = Arc::new(ToolRegistry::from_tools(vec![Box::new(stop)]).unwrap());
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("p"),
            action_call(json!({"action_type": "use_tool", "tool_name": "stop"})),
            reflection_call(false),
            GenerateResponse::text("should not be requested"),
        ]));

        let result = agent(provider.clone(), tools)
            .execute_with_cancel("Go", &cancel)
            .await;

        assert!(result.cancelled);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(
            roles(&result),
            vec![AgentRole::Planner, AgentRole::Executor, AgentRole::Summarizer]
        );
        assert_eq!(result.final_response, DEFAULT_FINAL_RESPONSE);
    }

    #[tokio::test]
    async fn summarizer_metadata_carries_memory() {
        let provider = Arc::new(ScriptedProvider::ok(vec![
            plan_call("Plan it"),
            action_call(json!({"action_type": "final_result", "result": "Done"})),
        ]));
        let result = agent(provider, echo_registry()).execute("Remember me").await;

        let summary = result.intermediate_steps.last().unwrap();
        assert_eq!(summary.agent_role, AgentRole::Summarizer);
        assert_eq!(summary.metadata["memory"]["task"], "Remember me");
        assert_eq!(summary.metadata["memory"]["tools"][0]["name"], "echo");
        assert_eq!(
            summary.metadata["memory"]["iterations"][0]["action"]["result"],
            "Done"
        );
        assert!(summary.content.starts_with("Summary of execution:\n- Completed 1 iterations"));
    }
}
