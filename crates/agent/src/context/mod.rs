//! Execution state and the prompts rendered from it.

pub mod memory;
pub mod prompt;

pub use memory::{AgentMemory, IterationRecord};
