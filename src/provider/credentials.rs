//! API key lookup for providers that require one.

use crate::error::ApiError;
use crate::provider::profile::ProviderType;
use std::collections::BTreeSet;

/// Read the API key for `provider` from the process environment.
///
/// Returns `Ok(None)` for providers that do not need a key. A required key
/// that is unset or blank is a [`ApiError::MissingCredential`].
pub fn api_key_from_env(provider: ProviderType) -> Result<Option<String>, ApiError> {
    let Some(var) = provider.api_key_env_var() else {
        return Ok(None);
    };
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
        _ => Err(ApiError::MissingCredential(format!(
            "{} environment variable is required for the {} provider. \
             Please set it before starting the service.",
            var,
            provider.slug()
        ))),
    }
}

/// Check that every provider in `providers` has its credential available.
///
/// Called at startup so a missing key halts the process instead of surfacing
/// on the first request.
pub fn preflight<I>(providers: I) -> Result<(), ApiError>
where
    I: IntoIterator<Item = ProviderType>,
{
    let unique: BTreeSet<ProviderType> = providers.into_iter().collect();
    for provider in unique {
        api_key_from_env(provider)?;
    }
    Ok(())
}
