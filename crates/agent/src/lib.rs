//! The plan–act–reflect loop at the centre of Steward.
//!
//! Each execution cycles through three phases until the task is done or
//! the iteration budget runs out:
//!
//! 1. **Plan**: the model is forced to call `create_task_plan`
//! 2. **Act**: the model is forced to call `execute_action`; tool requests
//!    are dispatched against the registry and produce an observation
//! 3. **Reflect**: the model is forced to call `reflect_on_progress` and
//!    decides whether the task is complete
//!
//! A `final_result` action ends the loop immediately. When the budget is
//! exhausted without completion, a free-text summarization call produces
//! the final answer. Every phase has a fallback payload, so no model or
//! tool failure aborts an execution.

pub mod context;
pub mod loop_runner;
pub mod phase;
pub mod trace;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{AgentMemory, IterationRecord};
pub use loop_runner::{AutonomousAgent, ExecutionResult, LoopSettings};
pub use phase::{Action, Plan, PlanStep, Reflection};
pub use trace::{AgentResponse, AgentRole};
