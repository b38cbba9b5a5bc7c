//! Reasoning-capability implementations

pub mod openai;

use crate::{Completion, Context, Error, Result};
use async_trait::async_trait;

/// The external reasoning capability: one request, one complete reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Invoke the model with the windowed context and tool schemas
    async fn invoke(&self, context: &Context) -> Result<Completion>;

    /// Model identifier, for display and logs
    fn model_id(&self) -> &str;
}

/// Get an API key from the provided value or the environment
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided {
        return Ok(key.to_string());
    }

    std::env::var(env_var).map_err(|_| Error::InvalidApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_api_key_prefers_provided() {
        let key = get_api_key(Some("sk-test"), "NEXUS_TEST_UNSET_VAR").unwrap();
        assert_eq!(key, "sk-test");
    }

    #[test]
    fn test_get_api_key_missing() {
        let err = get_api_key(None, "NEXUS_TEST_DEFINITELY_UNSET_VAR").unwrap_err();
        assert!(matches!(err, Error::InvalidApiKey));
    }
}
