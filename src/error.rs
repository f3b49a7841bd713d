//! Error type shared by every pipeline stage.
//!
//! Each stage returns [`Result`]; the workflow driver records the error on the
//! article's [`WorkflowResult`](crate::models::WorkflowResult) and moves on to
//! the next article. Nothing here is retried automatically.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing API key for {provider}: set {env_var} or configure it in the config file")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("{provider} quota exhausted: {detail}")]
    QuotaExceeded { provider: String, detail: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Provider {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unexpected response: {reason}")]
    MalformedResponse { provider: String, reason: String },

    #[error("Authorization required: {0}")]
    AuthorizationRequired(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Feed parse error: {0}")]
    Feed(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Whether switching provider or trying again later could succeed.
    ///
    /// Configuration and authorization problems need an operator; transport
    /// and provider-side failures do not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::QuotaExceeded { .. }
                | PipelineError::Provider { .. }
                | PipelineError::MalformedResponse { .. }
                | PipelineError::Http(_)
        )
    }

    /// Turn a non-2xx provider response into the matching error.
    ///
    /// Successful responses are handed back untouched so callers can chain
    /// `PipelineError::check(name, resp).await?.json()`.
    pub async fn check(provider: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Self::from_status(provider, status.as_u16(), body))
    }

    pub(crate) fn from_status(provider: &str, status: u16, body: String) -> Self {
        let quota = status == 429 || body.contains("quotaExceeded") || body.contains("RESOURCE_EXHAUSTED");
        match status {
            401 => PipelineError::AuthorizationRequired(format!(
                "{provider} rejected the credentials (HTTP 401): {body}"
            )),
            _ if quota => PipelineError::QuotaExceeded {
                provider: provider.to_string(),
                detail: body,
            },
            _ => PipelineError::Provider {
                provider: provider.to_string(),
                status,
                body,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_maps_to_quota() {
        let err = PipelineError::from_status("OpenAI", 429, "slow down".into());
        assert!(matches!(err, PipelineError::QuotaExceeded { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_youtube_quota_body_maps_to_quota() {
        let body = r#"{"error":{"errors":[{"reason":"quotaExceeded"}]}}"#.to_string();
        let err = PipelineError::from_status("YouTube", 403, body);
        assert!(matches!(err, PipelineError::QuotaExceeded { .. }));
    }

    #[test]
    fn test_unauthorized_requires_manual_action() {
        let err = PipelineError::from_status("YouTube", 401, "invalid_token".into());
        assert!(matches!(err, PipelineError::AuthorizationRequired(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_server_error_is_provider_error() {
        let err = PipelineError::from_status("Gemini", 503, "unavailable".into());
        match err {
            PipelineError::Provider { status, .. } => assert_eq!(status, 503),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_key_message_names_env_var() {
        let err = PipelineError::MissingApiKey {
            provider: "ElevenLabs",
            env_var: "ELEVENLABS_API_KEY",
        };
        assert!(err.to_string().contains("ELEVENLABS_API_KEY"));
        assert!(!err.is_recoverable());
    }
}
