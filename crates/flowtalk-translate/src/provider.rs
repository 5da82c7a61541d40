//! Translator adapters.
//!
//! [`HttpTranslateProvider`] calls the external translation service over
//! HTTPS with a hard per-call timeout and retries with exponential backoff.
//! [`PhraseTableProvider`] is the deterministic offline fallback. Both honor
//! the same contract: same-language or whitespace-only input comes back
//! verbatim without an external call, and a failed translation surfaces as an
//! error rather than fabricated output.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use flowtalk_shared::Language;

use crate::error::TranslateError;
use crate::phrase_table;
use crate::retry::{with_retry_if, RetryConfig};

/// Hard timeout for a single external call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait TranslateProvider: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslateError>;
}

/// Request/response shape agreed with the provider; opaque JSON otherwise.
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

pub struct HttpTranslateProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    retry: RetryConfig,
}

impl HttpTranslateProvider {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self, TranslateError> {
        Self::with_retry(api_url, api_key, RetryConfig::translator_call())
    }

    pub fn with_retry(
        api_url: &str,
        api_key: &str,
        retry: RetryConfig,
    ) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TranslateError::Provider {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            retry,
        })
    }

    async fn request(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslateError> {
        let request = TranslateRequest {
            q: text,
            source: source.code(),
            target: target.code(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(from_reqwest)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
            return Err(TranslateError::Provider {
                status: Some(status),
                message: body,
            });
        }

        let parsed: TranslateResponse = response.json().await.map_err(from_reqwest)?;
        if parsed.translated_text.trim().is_empty() {
            return Err(TranslateError::Provider {
                status: None,
                message: "provider returned an empty translation".to_string(),
            });
        }
        Ok(parsed.translated_text)
    }
}

#[async_trait]
impl TranslateProvider for HttpTranslateProvider {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslateError> {
        if source == target || text.trim().is_empty() {
            return Ok(text.to_string());
        }

        with_retry_if(
            &self.retry,
            &format!("translate {}->{}", source.code(), target.code()),
            || self.request(text, source, target),
            is_retryable,
        )
        .await
    }
}

fn from_reqwest(e: reqwest::Error) -> TranslateError {
    if e.is_timeout() {
        TranslateError::Timeout
    } else {
        TranslateError::Provider {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// 429 and 5xx are transient; other 4xx are not worth retrying.
fn is_retryable(error: &TranslateError) -> bool {
    match error {
        TranslateError::Timeout => true,
        TranslateError::Provider {
            status: Some(status),
            ..
        } => *status == 429 || *status >= 500,
        TranslateError::Provider { status: None, .. } => true,
        _ => false,
    }
}

/// Deterministic offline fallback backed by the built-in phrase table.
///
/// Phrases outside the table come back as the original text prefixed with the
/// target-language tag; callers are free to treat that as a failed
/// translation.
pub struct PhraseTableProvider;

#[async_trait]
impl TranslateProvider for PhraseTableProvider {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, TranslateError> {
        if source == target || text.trim().is_empty() {
            return Ok(text.to_string());
        }

        match phrase_table::lookup(text, target) {
            Some(phrase) => Ok(phrase.to_string()),
            None => Ok(format!("[{}] {}", target.code(), text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(3, Duration::from_millis(10))
    }

    fn provider_for(server: &MockServer) -> HttpTranslateProvider {
        HttpTranslateProvider::with_retry(
            &format!("{}/translate", server.uri()),
            "test-api-key",
            fast_retry(),
        )
        .unwrap()
    }

    fn ok_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "translatedText": text }))
    }

    #[tokio::test]
    async fn translates_via_http() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(body_partial_json(serde_json::json!({
                "source": "en",
                "target": "es",
            })))
            .respond_with(ok_response("Hola mundo"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let out = provider
            .translate("Hello world", Language::En, Language::Es)
            .await
            .unwrap();
        assert_eq!(out, "Hola mundo");
    }

    #[tokio::test]
    async fn same_language_skips_the_call() {
        // An unroutable URL proves no request is made.
        let provider = HttpTranslateProvider::with_retry(
            "http://invalid.test/translate",
            "key",
            fast_retry(),
        )
        .unwrap();

        let out = provider
            .translate("already fine", Language::Es, Language::Es)
            .await
            .unwrap();
        assert_eq!(out, "already fine");
    }

    #[tokio::test]
    async fn whitespace_only_skips_the_call() {
        let provider = HttpTranslateProvider::with_retry(
            "http://invalid.test/translate",
            "key",
            fast_retry(),
        )
        .unwrap();

        let out = provider
            .translate("   \n", Language::En, Language::Es)
            .await
            .unwrap();
        assert_eq!(out, "   \n");
    }

    #[tokio::test]
    async fn retries_on_500_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ok_response("Hola"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let out = provider
            .translate("Hello", Language::En, Language::Es)
            .await
            .unwrap();
        assert_eq!(out, "Hola");
    }

    #[tokio::test]
    async fn does_not_retry_on_400() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .translate("Hello", Language::En, Language::Es)
            .await
            .unwrap_err();

        match err {
            TranslateError::Provider { status, .. } => assert_eq!(status, Some(400)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn exhausts_retries_on_persistent_500() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(3)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .translate("Hello", Language::En, Language::Es)
            .await
            .unwrap_err();

        match err {
            TranslateError::Provider { status, .. } => assert_eq!(status, Some(503)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_translation_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ok_response("   "))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert!(provider
            .translate("Hello", Language::En, Language::Es)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn phrase_table_hit() {
        let out = PhraseTableProvider
            .translate("thank you", Language::En, Language::Es)
            .await
            .unwrap();
        assert_eq!(out, "gracias");
    }

    #[tokio::test]
    async fn phrase_table_miss_is_tagged() {
        let out = PhraseTableProvider
            .translate("the quick brown fox", Language::En, Language::Es)
            .await
            .unwrap();
        assert_eq!(out, "[es] the quick brown fox");
    }

    #[tokio::test]
    async fn phrase_table_same_language_skips() {
        let out = PhraseTableProvider
            .translate("hello", Language::En, Language::En)
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }
}
