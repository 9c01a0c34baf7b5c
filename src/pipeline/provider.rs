use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ProviderError;

/// Default generation model, matching the platform's provisioned deployment.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Hosted generative-language endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// HTTP client for the hosted generative-language API.
///
/// One instance per process, injected into the pipeline (never a global).
/// Carries its own request timeout; callers see timeouts as
/// `ProviderError::UpstreamUnavailable`.
pub struct GenerativeClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GenerativeClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = GenerateContentRequest {
            system_instruction: ContentPart::text(system),
            contents: vec![ContentPart::text(prompt)],
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::UpstreamUnavailable("request timed out".into())
                } else {
                    ProviderError::UpstreamUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "response contained no candidates".into(),
            ));
        }
        Ok(text)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: ContentPart,
    contents: Vec<ContentPart>,
}

#[derive(Serialize)]
struct ContentPart {
    parts: Vec<TextPart>,
}

impl ContentPart {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![TextPart { text: text.to_string() }],
        }
    }
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Scripted model client for tests — replays queued responses in order.
pub struct MockModelClient {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_response(response: &str) -> Self {
        let mock = Self::new();
        mock.push_ok(response);
        mock
    }

    pub fn push_ok(&self, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(response.to_string()));
    }

    pub fn push_err(&self, err: ProviderError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    fn next(&self) -> Result<String, ProviderError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::UpstreamUnavailable(
                    "mock has no queued response".into(),
                ))
            })
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Model backend, fixed at construction.
pub enum ModelClient {
    Hosted(GenerativeClient),
    Mock(MockModelClient),
}

impl ModelClient {
    /// Send one prompt and return the raw text response.
    pub async fn generate(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        match self {
            Self::Hosted(client) => client.generate(system, prompt).await,
            Self::Mock(mock) => mock.next(),
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock(_))
    }
}
