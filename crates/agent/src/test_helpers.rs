//! Shared test helpers for loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use steward_core::error::ProviderError;
use steward_core::provider::{GenerateRequest, GenerateResponse, Provider};

type Scripted = Result<GenerateResponse, ProviderError>;

/// A mock provider that replays scripted answers in order.
///
/// Every request is recorded. Once the script runs out, each further call
/// fails with `NotConfigured`, so an empty script is a provider that
/// always fails.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<GenerateRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn ok(responses: Vec<GenerateResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ProviderError::NotConfigured("script exhausted".into())))
    }
}

pub fn plan_call(understanding: &str) -> GenerateResponse {
    GenerateResponse::tool_call(
        "create_task_plan",
        serde_json::json!({
            "task_understanding": understanding,
            "plan_steps": [
                {"step_number": 1, "step_description": "Do the work", "required_tools": []}
            ],
            "expected_outcome": "Task answered"
        }),
    )
}

pub fn action_call(arguments: serde_json::Value) -> GenerateResponse {
    GenerateResponse::tool_call("execute_action", arguments)
}

pub fn reflection_call(task_complete: bool) -> GenerateResponse {
    GenerateResponse::tool_call(
        "reflect_on_progress",
        serde_json::json!({
            "progress_assessment": if task_complete { "All done" } else { "Still working" },
            "completed_steps": [1],
            "task_complete": task_complete
        }),
    )
}
