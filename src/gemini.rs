//! Gemini API client for chat completion.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-002:generateContent";

const SYSTEM_PROMPT: &str = "\
You are the owner's personal AI assistant, answering WhatsApp messages on \
their behalf when they are unavailable. You don't pretend to be them, but \
you represent them: friendly, casual, and helpful. If something is too \
personal or you don't know, say the owner will get back to them. Keep \
replies brief and human, never robotic, with the occasional emoji.";

/// One conversation turn. This is both the Gemini content shape and the
/// format persisted under `chat:<user>` in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, parts: vec![text.into()] }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, parts: vec![text.into()] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Model capability failure: transport, quota, or an unusable response.
/// Callers convert this to a fixed user-visible fallback; it is never
/// retried and never propagated as a crash.
#[derive(Debug)]
pub enum ProviderError {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Api(e) => write!(f, "API error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Empty => write!(f, "empty response"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// One-shot chat seam used by the message handler. Implemented by
/// [`GeminiClient`] and by the fakes in the bot tests.
pub trait ChatModel: Send + Sync {
    /// Answer `text` in the context of `history` (oldest turn first).
    fn reply(
        &self,
        history: &[Turn],
        text: &str,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
}

/// A chat session primed with prior history. Stateless on the wire: every
/// send posts the full content list.
pub struct ChatSession<'a> {
    client: &'a GeminiClient,
    history: Vec<Turn>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self { api_key, client }
    }

    /// Start a chat session seeded with prior conversation history.
    pub fn start_chat(&self, history: Vec<Turn>) -> ChatSession<'_> {
        ChatSession { client: self, history }
    }
}

impl<'a> ChatSession<'a> {
    /// Send one message and return the model's reply text, trimmed.
    pub async fn send(&mut self, text: &str) -> Result<String, ProviderError> {
        self.history.push(Turn::user(text));

        let contents = self.history.iter().map(to_content).collect();
        let request = GenerateRequest {
            contents,
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: SYSTEM_PROMPT.to_string() }],
            },
        };

        let url = format!("{}?key={}", GEMINI_API_URL, self.client.api_key);
        let response = self
            .client
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(ProviderError::Api(format!("{status}: {body}")));
        }

        let reply = extract_text(&body)?;
        self.history.push(Turn::model(reply.clone()));
        Ok(reply)
    }
}

impl ChatModel for GeminiClient {
    async fn reply(&self, history: &[Turn], text: &str) -> Result<String, ProviderError> {
        let mut session = self.start_chat(history.to_vec());
        session.send(text).await
    }
}

fn to_content(turn: &Turn) -> Content {
    Content {
        role: Some(match turn.role {
            Role::User => "user",
            Role::Model => "model",
        }),
        parts: turn.parts.iter().map(|t| Part { text: t.clone() }).collect(),
    }
}

/// Pull the first candidate's concatenated text out of a response body.
fn extract_text(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(ProviderError::Api(error.message));
    }

    let candidates = parsed.candidates.ok_or(ProviderError::Empty)?;
    let content = candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .ok_or(ProviderError::Empty)?;

    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_single_part() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  hey there 👋\n"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "hey there 👋");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"one "},{"text":"two"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "one two");
    }

    #[test]
    fn test_extract_text_api_error() {
        let body = r#"{"error":{"message":"quota exceeded"}}"#;
        match extract_text(body) {
            Err(ProviderError::Api(msg)) => assert_eq!(msg, "quota exceeded"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_text_no_candidates() {
        assert!(matches!(extract_text("{}"), Err(ProviderError::Empty)));
    }

    #[test]
    fn test_extract_text_blank_reply_is_empty() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#;
        assert!(matches!(extract_text(body), Err(ProviderError::Empty)));
    }

    #[test]
    fn test_extract_text_malformed_json() {
        assert!(matches!(extract_text("not json"), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_turn_serialization_matches_cache_layout() {
        let turn = Turn::user("hello");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"user","parts":["hello"]}"#);

        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }

    #[test]
    fn test_model_role_round_trip() {
        let json = r#"{"role":"model","parts":["sure thing"]}"#;
        let turn: Turn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.role, Role::Model);
        assert_eq!(turn.parts, vec!["sure thing"]);
    }
}
