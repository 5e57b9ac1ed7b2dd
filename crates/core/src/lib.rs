//! # Steward Core
//!
//! Domain types, traits, and error definitions for the Steward task agent.
//! This crate has **no framework dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! Every subsystem the agent loop talks to (LLM backends, tools, personas)
//! is described here; implementations live in their respective crates.

pub mod error;
pub mod persona;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, RegistryError, ToolError};
pub use persona::{Persona, PersonaCatalog, render_context};
pub use provider::{CallMode, Constraint, GenerateRequest, GenerateResponse, Provider, ToolDefinition};
pub use tool::{FnTool, Tool, ToolRegistry, ToolResult};
