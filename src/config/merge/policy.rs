//! Base layer of the merge: built-in defaults.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

/// Builder seeded with the top-level defaults. Nested tables fall back to
/// their serde defaults.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("default_agent_id", crate::agent::DEFAULT_AGENT_ID)?
        .set_default("include_builtin_agents", true)
}
