use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Model configuration carried by an agent spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: ProviderType,

    /// Model identifier.
    pub model_name: String,

    /// Whether replies are requested as a token stream.
    #[serde(default)]
    pub streaming: bool,

    /// Base URL override; providers fall back to their public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Provider-specific request options (temperature, enable_thinking, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_options: BTreeMap<String, Value>,
}

impl ModelConfig {
    pub fn new(provider: ProviderType, model_name: impl Into<String>) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            streaming: false,
            endpoint: None,
            extra_options: BTreeMap::new(),
        }
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_options.insert(key.into(), value);
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Endpoint to send requests to, with a scheme inferred for local hosts.
    pub fn resolved_endpoint(&self) -> Option<String> {
        match &self.endpoint {
            Some(endpoint) => Some(infer_endpoint_scheme(self.provider, endpoint)),
            None => self.provider.default_endpoint().map(str::to_string),
        }
    }

    /// Validate model configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_name.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }

        if let Some(endpoint) = &self.endpoint {
            if !endpoint_url_is_valid(self.provider, endpoint) {
                return Err(format!("Invalid endpoint URL: {}", endpoint));
            }
        } else if self.provider == ProviderType::LocalCustom {
            return Err("Local provider requires an endpoint".to_string());
        }

        if let Some(temp) = self.extra_options.get("temperature") {
            match temp.as_f64() {
                Some(t) if (0.0..=2.0).contains(&t) => {}
                _ => {
                    return Err(format!(
                        "Temperature must be a number between 0.0 and 2.0, got {}",
                        temp
                    ))
                }
            }
        }

        for reserved in ["model", "messages", "tools", "stream"] {
            if self.extra_options.contains_key(reserved) {
                return Err(format!("extra_options cannot override '{}'", reserved));
            }
        }

        Ok(())
    }
}

/// Provider type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// DashScope OpenAI-compatible mode
    #[default]
    #[serde(rename = "dashscope")]
    DashScope,
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

impl ProviderType {
    pub fn slug(self) -> &'static str {
        match self {
            ProviderType::DashScope => "dashscope",
            ProviderType::OpenAI => "openai",
            ProviderType::Ollama => "ollama",
            ProviderType::LocalCustom => "local",
        }
    }

    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            ProviderType::DashScope => Some("https://dashscope.aliyuncs.com/compatible-mode/v1"),
            ProviderType::OpenAI => Some("https://api.openai.com/v1"),
            ProviderType::Ollama => Some("http://localhost:11434/v1"),
            ProviderType::LocalCustom => None,
        }
    }

    /// Environment variable holding the API key, when the provider needs one.
    pub fn api_key_env_var(self) -> Option<&'static str> {
        match self {
            ProviderType::DashScope => Some("DASHSCOPE_API_KEY"),
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            ProviderType::Ollama | ProviderType::LocalCustom => None,
        }
    }
}

fn endpoint_has_scheme(endpoint: &str) -> bool {
    endpoint.starts_with("http://") || endpoint.starts_with("https://")
}

fn infer_endpoint_scheme(provider_type: ProviderType, endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if provider_type == ProviderType::LocalCustom && !endpoint_has_scheme(endpoint) {
        format!("https://{}", endpoint)
    } else {
        endpoint.to_string()
    }
}

pub fn endpoint_url_is_valid(provider_type: ProviderType, endpoint: &str) -> bool {
    let endpoint = infer_endpoint_scheme(provider_type, endpoint);
    let Some(rest) = endpoint.split_once("://").map(|(_, rest)| rest) else {
        return false;
    };
    if !endpoint_has_scheme(&endpoint) || rest.is_empty() || rest.chars().any(char::is_whitespace)
    {
        return false;
    }

    let authority = rest.split('/').next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    let host = if host_port.starts_with('[') {
        let Some(end_bracket) = host_port.find(']') else {
            return false;
        };
        &host_port[1..end_bracket]
    } else {
        host_port.split(':').next().unwrap_or_default()
    };

    if host.is_empty() {
        return false;
    }

    host == "localhost" || host.contains('.') || host.parse::<std::net::IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn local_custom_endpoint_infers_https() {
        let config = ModelConfig::new(ProviderType::LocalCustom, "llama3")
            .endpoint("chat.internal.example.dev/");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.resolved_endpoint().as_deref(),
            Some("https://chat.internal.example.dev")
        );
    }

    #[test]
    fn local_custom_requires_endpoint() {
        let config = ModelConfig::new(ProviderType::LocalCustom, "llama3");
        assert!(config.validate().is_err());
    }

    #[test]
    fn dashscope_uses_compatible_mode_endpoint() {
        let config = ModelConfig::new(ProviderType::DashScope, "qwen-plus");
        assert_eq!(
            config.resolved_endpoint().as_deref(),
            Some("https://dashscope.aliyuncs.com/compatible-mode/v1")
        );
        assert_eq!(ProviderType::DashScope.api_key_env_var(), Some("DASHSCOPE_API_KEY"));
    }

    #[test]
    fn rejects_bad_temperature_and_reserved_keys() {
        let hot = ModelConfig::new(ProviderType::OpenAI, "gpt-4o").option("temperature", json!(3.5));
        assert!(hot.validate().is_err());

        let reserved = ModelConfig::new(ProviderType::OpenAI, "gpt-4o").option("stream", json!(true));
        assert!(reserved.validate().is_err());

        let ok = ModelConfig::new(ProviderType::OpenAI, "gpt-4o")
            .option("temperature", json!(0.2))
            .option("enable_thinking", json!(false));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn endpoint_validation() {
        assert!(endpoint_url_is_valid(ProviderType::Ollama, "http://localhost:11434"));
        assert!(endpoint_url_is_valid(ProviderType::OpenAI, "https://10.0.0.2/v1"));
        assert!(!endpoint_url_is_valid(ProviderType::OpenAI, "api.openai.com"));
        assert!(!endpoint_url_is_valid(ProviderType::OpenAI, "https://bad host"));
    }
}
