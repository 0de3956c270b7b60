//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::ServiceConfig;
use crate::error::ApiError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file, `explicit` when given, and the
    /// environment, then validate the result.
    pub fn load(explicit: Option<&Path>) -> Result<ServiceConfig, ApiError> {
        let config = MergeService::load(explicit)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file with environment overlay,
    /// skipping the global file.
    pub fn load_from_file(path: &Path) -> Result<ServiceConfig, ApiError> {
        let config = MergeService::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Create default configuration.
    pub fn default() -> ServiceConfig {
        ServiceConfig::default()
    }
}
