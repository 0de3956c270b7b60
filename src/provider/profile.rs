//! Provider profile: model configuration shape and validation.

pub mod config;

pub use config::{endpoint_url_is_valid, ModelConfig, ProviderType};
