use crate::error::{ModelError, Result};
use crate::payload::{ContentPart, PromptPayload};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Anything that can turn a prompt payload into raw model text.
///
/// Implementations make exactly one upstream call per invocation.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, payload: &PromptPayload) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

// Function calls and other part kinds have no text; thought summaries are not the answer
#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Client for the Gemini `generateContent` REST endpoint
pub struct GeminiClient {
    client: Client,
    api_base: Url,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("Phishwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2).max(1)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        let api_base = Url::parse(DEFAULT_API_BASE)
            .map_err(|e| ModelError::InvalidUrl(format!("{}: {}", DEFAULT_API_BASE, e)))?;

        Ok(Self {
            client,
            api_base,
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: Url) -> Self {
        // Url::join drops the last path segment unless it ends in '/'
        let mut api_base = api_base;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        self.api_base = api_base;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn endpoint(&self) -> Result<Url> {
        let relative = format!("models/{}:generateContent", self.model);
        self.api_base
            .join(&relative)
            .map_err(|e| ModelError::InvalidUrl(format!("{}: {}", relative, e)))
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, payload: &PromptPayload) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::MissingApiKey)?;
        let endpoint = self.endpoint()?;

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: payload.parts(),
            }],
        };

        info!(
            model = %self.model,
            prompt_chars = payload.prompt().chars().count(),
            has_image = payload.has_image(),
            "Sending generateContent request"
        );
        let start = Instant::now();

        let response = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generateContent responded"
        );

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| text.trim().to_string());
            warn!(status = status.as_u16(), %message, "Model API returned an error");
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| ModelError::DecodeError(e.to_string()))?;

        extract_text(parsed)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .ok_or(ModelError::EmptyResponse)?;

    let text: String = content
        .parts
        .into_iter()
        .filter(|part| !part.thought)
        .filter_map(|part| part.text)
        .collect();

    if text.is_empty() {
        return Err(ModelError::EmptyResponse);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::with_timeout(Some("test-key".to_string()), 5)
            .unwrap()
            .with_api_base(Url::parse(&format!("{}/v1beta", server.uri())).unwrap())
    }

    fn candidate_body(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn test_endpoint_defaults() {
        let client = GeminiClient::new(Some("key".to_string())).unwrap();
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_blank_api_key_is_treated_as_missing() {
        let client = GeminiClient::new(Some("   ".to_string())).unwrap();
        assert!(!client.has_api_key());
    }

    #[tokio::test]
    async fn test_generate_sends_text_and_image_parts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "judge this page" },
                        { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("{\"risk_score\": 10}")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let payload = PromptPayload::new("judge this page")
            .with_image(ContentPart::image("image/png", "iVBORw0KGgo="));

        let text = client_for(&mock_server).generate(&payload).await.unwrap();
        assert_eq!(text, "{\"risk_score\": 10}");
    }

    #[tokio::test]
    async fn test_generate_joins_answer_text_parts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [
                        { "text": "Looking at the form...", "thought": true },
                        { "text": "```json\n{" },
                        { "functionCall": { "name": "noop", "args": {} } },
                        { "text": "}\n```" }
                    ] }
                }]
            })))
            .mount(&mock_server)
            .await;

        let text = client_for(&mock_server)
            .generate(&PromptPayload::new("p"))
            .await
            .unwrap();
        assert_eq!(text, "```json\n{}\n```");
    }

    #[tokio::test]
    async fn test_generate_surfaces_api_error_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "code": 429,
                    "message": "Resource has been exhausted",
                    "status": "RESOURCE_EXHAUSTED"
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .generate(&PromptPayload::new("p"))
            .await
            .unwrap_err();

        match err {
            ModelError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource has been exhausted");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_keeps_plain_text_error_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway\n"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .generate(&PromptPayload::new("p"))
            .await
            .unwrap_err();

        match err {
            ModelError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_times_out_on_slow_upstream() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(candidate_body("{}"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client = GeminiClient::with_timeout(Some("test-key".to_string()), 1)
            .unwrap()
            .with_api_base(Url::parse(&format!("{}/v1beta", mock_server.uri())).unwrap());

        let start = Instant::now();
        let err = client.generate(&PromptPayload::new("p")).await.unwrap_err();

        match err {
            ModelError::HttpError(e) => assert!(e.is_timeout(), "expected timeout, got {:?}", e),
            other => panic!("expected HttpError, got {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_generate_without_candidates_is_empty_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .generate(&PromptPayload::new("p"))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_a_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("{}")))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = GeminiClient::new(None)
            .unwrap()
            .with_api_base(Url::parse(&mock_server.uri()).unwrap());

        let err = client.generate(&PromptPayload::new("p")).await.unwrap_err();
        assert!(matches!(err, ModelError::MissingApiKey));
        assert_eq!(err.to_string(), "GEMINI_API_KEY is not set");
    }
}
