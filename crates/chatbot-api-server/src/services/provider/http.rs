use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::BackendFailure;
use crate::config::ProviderConfig;

/// Where a backend expects its API key.
#[derive(Debug, Clone, Copy)]
pub(super) enum AuthScheme {
    Bearer,
    Header(&'static str),
}

impl AuthScheme {
    fn apply(self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        match self {
            Self::Bearer => request.bearer_auth(api_key),
            Self::Header(name) => request.header(name, api_key),
        }
    }
}

/// POST `body` as JSON and decode the JSON reply. Fails with
/// `MissingApiKey` before any request is sent when no key is configured.
pub(super) async fn post_json<T, R>(
    client: &Client,
    config: &ProviderConfig,
    auth: AuthScheme,
    url: &str,
    body: &T,
) -> Result<R, BackendFailure>
where
    T: Serialize + ?Sized,
    R: DeserializeOwned,
{
    if !config.has_api_key() {
        return Err(BackendFailure::MissingApiKey);
    }

    let request = client.post(url).timeout(config.timeout()).json(body);

    let response = auth
        .apply(request, &config.api_key)
        .send()
        .await
        .map_err(BackendFailure::network)?;

    if !response.status().is_success() {
        return Err(BackendFailure::from_response(response).await);
    }

    response
        .json::<R>()
        .await
        .map_err(|e| BackendFailure::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_key: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: api_key.to_string(),
            ..ProviderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_custom_header_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "k-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let reply: Value = post_json(
            &Client::new(),
            &config("k-123"),
            AuthScheme::Header("x-api-key"),
            &server.uri(),
            &json!({}),
        )
        .await
        .unwrap();

        assert_eq!(reply["ok"], true);
    }

    #[tokio::test]
    async fn test_error_status_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = post_json::<_, Value>(&Client::new(), &config("k"), AuthScheme::Bearer, &server.uri(), &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(429));
        assert!(err.is_quota_exhausted());
    }

    #[tokio::test]
    async fn test_missing_key_skips_request() {
        let server = MockServer::start().await;

        let err = post_json::<_, Value>(&Client::new(), &config("  "), AuthScheme::Bearer, &server.uri(), &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendFailure::MissingApiKey));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
