use crate::error::ApiError;
use crate::provider::clients::OpenAiCompatibleClient;
use crate::provider::credentials::api_key_from_env;
use crate::provider::profile::ModelConfig;
use crate::provider::{ChatModel, ModelClientResolver};
use std::sync::Arc;

/// Builds OpenAI-compatible clients, reading API keys from the environment
/// each time a client is created.
#[derive(Debug, Default, Clone)]
pub struct EnvModelClientResolver;

impl EnvModelClientResolver {
    pub fn new() -> Self {
        Self
    }
}

impl ModelClientResolver for EnvModelClientResolver {
    fn create_chat_model(&self, config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ApiError> {
        config.validate().map_err(ApiError::ProviderNotConfigured)?;
        let endpoint = config.resolved_endpoint().ok_or_else(|| {
            ApiError::ProviderNotConfigured(format!(
                "{} provider requires endpoint",
                config.provider.slug()
            ))
        })?;
        let api_key = api_key_from_env(config.provider)?;
        Ok(Arc::new(OpenAiCompatibleClient::new(
            endpoint,
            config.model_name.clone(),
            api_key,
        )))
    }
}
