//! agentd: Multi-Agent Dispatch Service
//!
//! Routes AG-UI requests to conversational agents. Each request names its
//! target through a path segment, a header, or a body field; the resolved id
//! is looked up in a registry that builds each agent lazily from its spec and
//! caches one instance per id.

pub mod agent;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod server;
pub mod tooling;
pub mod tools;
pub mod types;
