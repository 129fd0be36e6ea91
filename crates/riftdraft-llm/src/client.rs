// Gemini `generateContent` client.
//
// One call is one HTTP round trip. Retries, cancellation and response
// parsing are layered on top by `RequestManager`; this module only
// classifies the outcome of a single attempt.

use async_trait::async_trait;
use riftdraft_core::config::Config;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::CallError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// ---------------------------------------------------------------------------
// Request shape
// ---------------------------------------------------------------------------

/// Everything the service needs for one generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub prompt: String,
    /// JSON schema the model is asked to conform to. When set the response
    /// MIME type is forced to `application/json`.
    pub response_schema: Option<Value>,
    pub max_output_tokens: u32,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            response_schema: None,
            max_output_tokens: 1024,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = n;
        self
    }

    /// Request body in the `generateContent` wire format.
    pub fn to_body(&self) -> Value {
        let mut generation_config = json!({ "maxOutputTokens": self.max_output_tokens });
        if let Some(schema) = &self.response_schema {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema.clone();
        }

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": self.prompt }] }],
            "generationConfig": generation_config,
        });
        if let Some(system) = &self.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

// ---------------------------------------------------------------------------
// AiClient trait
// ---------------------------------------------------------------------------

/// A single-attempt text generator. Implementations must not retry.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, CallError>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl AiClient for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, CallError> {
        if self.api_key.is_empty() {
            return Err(CallError::NotConfigured);
        }

        debug!(model = %self.model, prompt_len = request.prompt.len(), "generateContent");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request.to_body())
            .send()
            .await
            .map_err(|e| CallError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = CallError::from_status(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "AI service returned an error status");
            return Err(err);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| CallError::Decode(e.to_string()))?;

        match parse_candidate_text(&payload) {
            Some(text) => Ok(text),
            None => {
                let reason = payload
                    .get("promptFeedback")
                    .and_then(|f| f.get("blockReason"))
                    .and_then(Value::as_str)
                    .map(|r| format!("prompt blocked: {r}"))
                    .unwrap_or_else(|| "response has no candidates".to_string());
                warn!(%reason, "AI response carried no text");
                Err(CallError::Decode(reason))
            }
        }
    }
}

/// Concatenate `candidates[0].content.parts[*].text`.
///
/// A candidate with no text parts yields an empty string rather than `None`;
/// emptiness is reported later by the response parser.
pub(crate) fn parse_candidate_text(payload: &Value) -> Option<String> {
    let candidate = payload.get("candidates")?.get(0)?;
    let parts = match candidate.get("content").and_then(|c| c.get("parts")) {
        Some(Value::Array(parts)) => parts,
        _ => return Some(String::new()),
    };
    Some(
        parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// LlmClient enum
// ---------------------------------------------------------------------------

/// The application's AI client: live when a key is configured, otherwise a
/// disabled stand-in that fails every call without touching the network.
pub enum LlmClient {
    Active(GeminiClient),
    Disabled,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Self {
        match config.credentials.gemini_api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => LlmClient::Active(GeminiClient::with_base_url(
                key.trim().to_string(),
                config.ai.model.clone(),
                config.ai.base_url.clone(),
            )),
            _ => {
                warn!("no Gemini API key configured; AI features disabled");
                LlmClient::Disabled
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }
}

#[async_trait]
impl AiClient for LlmClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, CallError> {
        match self {
            LlmClient::Active(client) => client.generate(request).await,
            LlmClient::Disabled => Err(CallError::NotConfigured),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // -- Body / payload helpers --

    #[test]
    fn body_includes_schema_and_system_when_set() {
        let req = GenerateRequest::new("pick a champion")
            .with_system("You are a drafter.")
            .with_schema(json!({ "type": "object" }))
            .with_max_output_tokens(256);
        let body = req.to_body();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "pick a champion");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a drafter.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "object");
    }

    #[test]
    fn plain_body_has_no_schema() {
        let body = GenerateRequest::new("hi").to_body();
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn candidate_text_joins_parts() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(parse_candidate_text(&payload).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn candidate_without_parts_is_empty_text() {
        let payload = json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] });
        assert_eq!(parse_candidate_text(&payload).as_deref(), Some(""));
        assert_eq!(parse_candidate_text(&json!({})), None);
    }

    // -- Integration-style tests with a mock TCP server --

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Serve exactly one canned response and return the base URL.
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        });

        format!("http://{addr}")
    }

    fn client_for(base_url: String) -> GeminiClient {
        GeminiClient::with_base_url("test-key".into(), "test-model".into(), base_url)
    }

    #[tokio::test]
    async fn success_returns_candidate_text() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"champion\":\"Ahri\"}"}]}}]}"#;
        let base = serve_once(http_response("200 OK", body)).await;

        let text = client_for(base)
            .generate(&GenerateRequest::new("go"))
            .await
            .unwrap();
        assert_eq!(text, r#"{"champion":"Ahri"}"#);
    }

    #[tokio::test]
    async fn rate_limit_is_retryable() {
        let body = r#"{"error":{"code":429,"message":"Resource exhausted"}}"#;
        let base = serve_once(http_response("429 Too Many Requests", body)).await;

        let err = client_for(base)
            .generate(&GenerateRequest::new("go"))
            .await
            .unwrap_err();
        assert_eq!(err, CallError::RateLimited);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unauthorized_is_not_retryable() {
        let body = r#"{"error":{"code":401,"message":"API key not valid"}}"#;
        let base = serve_once(http_response("401 Unauthorized", body)).await;

        let err = client_for(base)
            .generate(&GenerateRequest::new("go"))
            .await
            .unwrap_err();
        assert_eq!(err, CallError::Unauthorized);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(format!("http://{addr}"))
            .generate(&GenerateRequest::new("go"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Network(_)), "{err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn empty_key_short_circuits() {
        let client = GeminiClient::with_base_url(
            String::new(),
            "m".into(),
            "http://127.0.0.1:1".into(),
        );
        let err = client.generate(&GenerateRequest::new("go")).await.unwrap_err();
        assert_eq!(err, CallError::NotConfigured);
    }

    #[tokio::test]
    async fn disabled_client_fails_without_network() {
        let err = LlmClient::Disabled
            .generate(&GenerateRequest::new("go"))
            .await
            .unwrap_err();
        assert_eq!(err, CallError::NotConfigured);
        assert!(!LlmClient::Disabled.is_active());
    }
}
