//! API Client Configuration

use crate::error::{ApiError, Result};

/// Payment API configuration
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Base URL of the payment API (no trailing slash)
    pub base_url: String,

    /// Session token issued to the merchant page
    pub session_token: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".into(),
            session_token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_token: session_token.into(),
            ..Default::default()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let session_token = std::env::var("CHECKOUT_SESSION_TOKEN")
            .map_err(|_| ApiError::Config("CHECKOUT_SESSION_TOKEN not set".into()))?;
        let base_url = std::env::var("CHECKOUT_API_URL")
            .unwrap_or_else(|_| Self::default().base_url);
        let timeout_secs = std::env::var("CHECKOUT_API_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            timeout_secs,
            ..Self::new(base_url, session_token)
        })
    }

    /// Join an endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let config = ApiConfig::new("https://api.example.com/v1/", "tok");
        assert_eq!(config.endpoint("/sessions/current"), "https://api.example.com/v1/sessions/current");
        assert_eq!(config.endpoint("cards/400000"), "https://api.example.com/v1/cards/400000");
    }
}
