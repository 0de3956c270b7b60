//! Agents
//!
//! Agent specs, the factories that build agents from them, the registry that
//! caches one instance per id, and the reason/act runtime the instances run.

pub mod catalog;
pub mod factory;
pub mod memory;
pub mod registry;
pub mod runtime;
pub mod spec;
pub mod validation;

pub use catalog::{builtin_specs, DEFAULT_AGENT_ID};
pub use factory::{build_agent, spec_factory, AgentFactory, AgentServices};
pub use memory::Memory;
pub use registry::{AgentRegistry, EntryState, OverwritePolicy};
pub use runtime::{
    run_to_completion, Agent, AgentEvent, AgentEventStream, ReActAgent, RunInput, RunOutput,
};
pub use spec::{AgentSpec, MemoryKind};
pub use validation::validate_agent_spec;
