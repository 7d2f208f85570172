//! JSON messages exchanged with browser clients.
//!
//! Every frame is an object `{"event": <name>, "data": <payload>}`.

use crate::inference::GenerationParams;
use serde::{Deserialize, Serialize, Serializer};

pub const DEFAULT_PROMPT: &str = "What do you see?";
pub const DEFAULT_MAX_TOKENS: i64 = 30;
pub const MAX_TOKENS_LIMIT: i64 = 50;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Messages sent by the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    AnalyzeFrame(AnalysisRequest),
}

/// A request to describe one captured frame.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisRequest {
    /// Data-URI encoded frame. Missing images are reported as decode errors.
    #[serde(default)]
    pub image: Option<String>,
    /// User prompt; missing, `null` or blank means [`DEFAULT_PROMPT`].
    #[serde(default)]
    pub prompt: Option<String>,
    /// Token budget; missing or `null` means [`DEFAULT_MAX_TOKENS`].
    #[serde(default)]
    pub max_tokens: Option<i64>,
    /// Sampling temperature; missing or `null` means [`DEFAULT_TEMPERATURE`].
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl AnalysisRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            prompt: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// The prompt to send, falling back to [`DEFAULT_PROMPT`] when blank.
    pub fn prompt(&self) -> &str {
        match self.prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => prompt,
            _ => DEFAULT_PROMPT,
        }
    }

    /// Sampling parameters with `max_tokens` clamped to `1..=50` and the
    /// temperature clamped into `(0, 1]`.
    pub fn generation_params(&self) -> GenerationParams {
        let temperature = match self.temperature {
            Some(t) if t.is_finite() && t > 0.0 => t.min(1.0),
            _ => DEFAULT_TEMPERATURE,
        };
        let max_tokens = self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        GenerationParams {
            max_tokens: max_tokens.clamp(1, MAX_TOKENS_LIMIT) as usize,
            temperature,
        }
    }
}

/// Outcome of one analysis request.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Success { response: String },
    Failure { error: String },
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success { .. })
    }
}

// on the wire: {"success": bool, "response"|"error": string}
#[derive(Serialize, Deserialize)]
struct AnalysisResultWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Serialize for AnalysisResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            AnalysisResult::Success { response } => AnalysisResultWire {
                success: true,
                response: Some(response.clone()),
                error: None,
            },
            AnalysisResult::Failure { error } => AnalysisResultWire {
                success: false,
                response: None,
                error: Some(error.clone()),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnalysisResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = AnalysisResultWire::deserialize(deserializer)?;
        Ok(if wire.success {
            AnalysisResult::Success {
                response: wire.response.unwrap_or_default(),
            }
        } else {
            AnalysisResult::Failure {
                error: wire.error.unwrap_or_default(),
            }
        })
    }
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    AnalysisResult(AnalysisResult),
    Error { message: String },
}

impl From<AnalysisResult> for ServerEvent {
    fn from(result: AnalysisResult) -> Self {
        ServerEvent::AnalysisResult(result)
    }
}
