use thiserror::Error;

use crate::config::ProviderKind;

const MAX_BODY_IN_ERROR: usize = 500;

/// Why a backend call failed. Carries enough detail to classify quota and
/// rate-limit failures; never shown to end users.
#[derive(Error, Debug)]
pub enum BackendFailure {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        code: Option<String>,
        body: String,
    },

    #[error("Unexpected response: {0}")]
    Malformed(String),
}

impl BackendFailure {
    pub(crate) fn network(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timed out: {}", err))
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Build from a non-success response, pulling the vendor error code out of
    /// `{"error": {"code" | "status": ...}}` bodies.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::from_status(status, &body)
    }

    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let code = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                let error = json.get("error")?;
                error
                    .get("code")
                    .and_then(|c| c.as_str())
                    .or_else(|| error.get("status").and_then(|s| s.as_str()))
                    .map(str::to_string)
            });

        Self::Status {
            status,
            code,
            body: body.chars().take(MAX_BODY_IN_ERROR).collect(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Quota exhaustion or rate limiting on the vendor side.
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            Self::Status { status, code, body } => {
                let body = body.to_lowercase();
                *status == 429
                    || matches!(
                        code.as_deref(),
                        Some("insufficient_quota") | Some("rate_limit_exceeded") | Some("RESOURCE_EXHAUSTED")
                    )
                    || body.contains("quota")
                    || body.contains("rate limit")
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} embedding failed: {failure}")]
    Embedding {
        provider: ProviderKind,
        #[source]
        failure: BackendFailure,
    },

    #[error("{provider} completion failed: {failure}")]
    Completion {
        provider: ProviderKind,
        #[source]
        failure: BackendFailure,
    },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Embedding { provider, .. } | Self::Completion { provider, .. } => *provider,
        }
    }

    pub fn failure(&self) -> &BackendFailure {
        match self {
            Self::Embedding { failure, .. } | Self::Completion { failure, .. } => failure,
        }
    }

    pub fn is_quota_exhausted(&self) -> bool {
        self.failure().is_quota_exhausted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_insufficient_quota() {
        let failure = BackendFailure::from_status(
            403,
            r#"{"error": {"message": "You exceeded your current plan", "type": "insufficient_quota", "code": "insufficient_quota"}}"#,
        );
        assert!(failure.is_quota_exhausted());
        assert_eq!(failure.status(), Some(403));
    }

    #[test]
    fn test_gemini_resource_exhausted() {
        let failure = BackendFailure::from_status(
            400,
            r#"{"error": {"code": 400, "message": "limit hit", "status": "RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(failure.is_quota_exhausted());
    }

    #[test]
    fn test_rate_limit_status() {
        assert!(BackendFailure::from_status(429, "slow down").is_quota_exhausted());
    }

    #[test]
    fn test_server_error_is_not_quota() {
        let failure = BackendFailure::from_status(500, "upstream exploded");
        assert!(!failure.is_quota_exhausted());
        assert!(!BackendFailure::MissingApiKey.is_quota_exhausted());
    }

    #[test]
    fn test_error_display_names_provider() {
        let err = ProviderError::Completion {
            provider: ProviderKind::Gemini,
            failure: BackendFailure::from_status(503, "{}"),
        };
        assert_eq!(err.provider(), ProviderKind::Gemini);
        assert!(err.to_string().starts_with("gemini completion failed: HTTP 503"));
    }

    #[test]
    fn test_body_is_truncated() {
        let body = "x".repeat(2_000);
        match BackendFailure::from_status(500, &body) {
            BackendFailure::Status { body, .. } => assert_eq!(body.len(), MAX_BODY_IN_ERROR),
            other => panic!("unexpected failure: {:?}", other),
        }
    }
}
