use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use yathra_core::{
    ExchangeError, ExchangeProvider, ExchangeReply, ExchangeRequest, GenerationConfig, Role,
    SafetySetting, Turn, Usage,
};

use crate::retry::retry_with_backoff;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry_delays: Vec<Duration>,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        info!("Creating GeminiProvider: model={model}");
        Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: api_key.into(),
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry_delays: vec![Duration::from_secs(1), Duration::from_secs(2)],
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    /// Helper method to send a single request
    async fn try_send(
        &self,
        request: &GenerateContentRequest<'_>,
    ) -> Result<ExchangeReply, ExchangeError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| ExchangeError::Service {
                status: Some(status.as_u16()),
                message: format!("invalid response format: {e}"),
            })?;

        extract_reply(parsed)
    }
}

#[async_trait]
impl ExchangeProvider for GeminiProvider {
    async fn exchange(&self, request: ExchangeRequest<'_>) -> Result<ExchangeReply, ExchangeError> {
        if self.api_key.trim().is_empty() {
            return Err(ExchangeError::Configuration("Gemini API key is empty".into()));
        }

        let body = GenerateContentRequest::new(request.turns, request.generation, request.safety);

        info!(
            "Sending request to Gemini API: model={}, contents={}",
            self.model,
            body.contents.len()
        );

        let reply = retry_with_backoff(
            || self.try_send(&body),
            &self.retry_delays,
            ExchangeError::is_retryable,
        )
        .await?;

        info!("Received response from Gemini API");
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: WireGenerationConfig,
    safety_settings: &'a [SafetySetting],
}

impl<'a> GenerateContentRequest<'a> {
    fn new(turns: &'a [Turn], generation: &GenerationConfig, safety: &'a [SafetySetting]) -> Self {
        Self {
            contents: turns.iter().map(Content::from_turn).collect(),
            generation_config: WireGenerationConfig::from(generation),
            safety_settings: safety,
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

impl<'a> Content<'a> {
    /// Gemini only knows `user` and `model`; the persona priming turn goes
    /// out as a user turn so the seed keeps its user/model alternation.
    fn from_turn(turn: &'a Turn) -> Self {
        let role = match turn.role() {
            Role::User | Role::System => "user",
            Role::Assistant => "model",
        };
        Self {
            role,
            parts: [Part { text: turn.text() }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl From<&GenerationConfig> for WireGenerationConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

const SAFETY_FINISH_REASONS: [&str; 3] = ["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT"];

fn extract_reply(response: GenerateContentResponse) -> Result<ExchangeReply, ExchangeError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(ExchangeError::SafetyBlocked(reason));
    }

    let candidate = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or(ExchangeError::EmptyReply)?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason {
            Some(reason) if SAFETY_FINISH_REASONS.contains(&reason.as_str()) => {
                Err(ExchangeError::SafetyBlocked(reason))
            }
            _ => Err(ExchangeError::EmptyReply),
        };
    }

    let usage = response.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count.unwrap_or(0),
        completion_tokens: u.candidates_token_count.unwrap_or(0),
        total_tokens: u.total_token_count.unwrap_or(0),
    });

    debug!("Gemini reply: {} chars", text.len());
    Ok(ExchangeReply { text, usage })
}

fn map_http_error(status: StatusCode, body: &str) -> ExchangeError {
    let message = serde_json::from_str::<ErrorWrapper>(body).map_or_else(
        |_| body.to_string(),
        |wrapper| {
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            match wrapper.error.status {
                Some(status_text) if !status_text.is_empty() => format!("{status_text}: {msg}"),
                _ => msg,
            }
        },
    );

    ExchangeError::Service {
        status: Some(status.as_u16()),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use yathra_core::SeedPair;

    const ENDPOINT: &str = "/models/gemini-2.0-flash:generateContent";

    fn provider(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new("test-key", DEFAULT_MODEL)
            .with_base_url(server.uri())
            .with_retry_delays(vec![Duration::from_millis(1)])
    }

    fn context() -> Vec<Turn> {
        let mut turns = SeedPair::default().turns().to_vec();
        turns.push(Turn::user("Plan a 3-day trip to Kyoto"));
        turns
    }

    fn text_reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 42,
                "candidatesTokenCount": 7,
                "totalTokenCount": 49
            }
        })
    }

    async fn exchange(provider: &GeminiProvider) -> Result<ExchangeReply, ExchangeError> {
        let turns = context();
        let generation = GenerationConfig::default();
        let safety = SafetySetting::default_policy();
        provider
            .exchange(ExchangeRequest {
                turns: &turns,
                generation: &generation,
                safety: &safety,
            })
            .await
    }

    #[tokio::test]
    async fn sends_transcript_generation_config_and_safety_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [
                    { "role": "user" },
                    { "role": "model" },
                    { "role": "user", "parts": [{ "text": "Plan a 3-day trip to Kyoto" }] }
                ],
                "generationConfig": { "topK": 40, "maxOutputTokens": 1000 },
                "safetySettings": [
                    { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_MEDIUM_AND_ABOVE" },
                    { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_MEDIUM_AND_ABOVE" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Day 1: Fushimi Inari")))
            .expect(1)
            .mount(&server)
            .await;

        let reply = match exchange(&provider(&server)).await {
            Ok(reply) => reply,
            Err(e) => panic!("exchange failed: {e}"),
        };
        assert_eq!(reply.text, "Day 1: Fushimi Inari");
        assert_eq!(
            reply.usage,
            Some(Usage {
                prompt_tokens: 42,
                completion_tokens: 7,
                total_tokens: 49
            })
        );
    }

    #[tokio::test]
    async fn joins_multiple_text_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Hello, " }, { "text": "traveler" }] }
                }]
            })))
            .mount(&server)
            .await;

        let reply = exchange(&provider(&server)).await;

        assert_eq!(reply.map(|r| r.text).ok().as_deref(), Some("Hello, traveler"));
    }

    #[tokio::test]
    async fn blocked_prompt_is_a_safety_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = exchange(&provider(&server)).await;

        assert!(matches!(result, Err(ExchangeError::SafetyBlocked(reason)) if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn safety_finish_without_text_is_a_safety_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let result = exchange(&provider(&server)).await;

        assert!(matches!(result, Err(ExchangeError::SafetyBlocked(_))));
    }

    #[tokio::test]
    async fn retries_transient_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": 503, "message": "overloaded", "status": "UNAVAILABLE" }
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("recovered")))
            .mount(&server)
            .await;

        let reply = exchange(&provider(&server)).await;

        assert_eq!(reply.map(|r| r.text).ok().as_deref(), Some("recovered"));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = exchange(&provider(&server)).await;

        match result {
            Err(ExchangeError::Service { status, message }) => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "INVALID_ARGUMENT: API key not valid");
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_api_key_fails_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("unreachable")))
            .expect(0)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("  ", DEFAULT_MODEL).with_base_url(server.uri());
        let result = exchange(&provider).await;

        assert!(matches!(result, Err(ExchangeError::Configuration(_))));
    }
}
