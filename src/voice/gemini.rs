//! Gemini-style `generateContent` provider.
//!
//! The reply shape is pinned with `generationConfig.responseSchema`, so the
//! model returns the batch JSON directly as text.

use reqwest::header::HeaderValue;
use secrecy::ExposeSecret as _;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::client::send_request;
use crate::error::{FinanceError, Result};
use crate::models::{AccountType, CategoryType, PaymentMethod, TransactionType};

use super::provider::{ProviderBuilder, ProviderConfig};
use super::{InterpretationProvider, InterpretationRequest, Prompt, SuggestedBatch};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'req> {
    /// The rules and context.
    system_instruction: Content<'req>,
    /// The transcript as a single user turn.
    contents: [Content<'req>; 1],
    /// Output constraints.
    generation_config: GenerationConfig,
}

/// A turn made of text parts.
#[derive(Debug, Serialize)]
struct Content<'req> {
    /// Speaker, omitted for the system instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    /// Text parts.
    parts: [TextPart<'req>; 1],
}

/// One text part.
#[derive(Debug, Serialize)]
struct TextPart<'req> {
    /// Part text.
    text: &'req str,
}

/// Output constraints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    /// Always `application/json`.
    response_mime_type: &'static str,
    /// OpenAPI-style schema of the batch.
    response_schema: Value,
}

/// The parts of a `generateContent` reply we read.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    /// Candidate replies.
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// One candidate reply.
#[derive(Debug, Deserialize)]
struct Candidate {
    /// Reply content; absent when the candidate was blocked.
    #[serde(default)]
    content: Option<CandidateContent>,
}

/// Candidate content.
#[derive(Debug, Deserialize)]
struct CandidateContent {
    /// Reply parts.
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

/// One reply part.
#[derive(Debug, Deserialize)]
struct CandidatePart {
    /// Part text.
    #[serde(default)]
    text: Option<String>,
}

/// Schema describing a [`SuggestedBatch`] to the model.
fn batch_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "transactions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {"type": "STRING"},
                        "amount": {"type": "NUMBER"},
                        "type": {"type": "STRING", "enum": TransactionType::NAMES},
                        "categoryId": {"type": "STRING"},
                        "accountId": {"type": "STRING"},
                        "paymentMethod": {"type": "STRING", "enum": PaymentMethod::NAMES},
                        "details": {"type": "STRING"},
                        "date": {"type": "STRING"}
                    },
                    "required": ["name", "amount", "type", "categoryId", "accountId", "paymentMethod", "date"]
                }
            },
            "accounts": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {"type": "STRING"},
                        "type": {"type": "STRING", "enum": AccountType::NAMES},
                        "color": {"type": "STRING"}
                    },
                    "required": ["name", "color"]
                }
            },
            "categories": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {"type": "STRING"},
                        "type": {"type": "STRING", "enum": CategoryType::NAMES},
                        "color": {"type": "STRING"}
                    },
                    "required": ["name", "type", "color"]
                }
            }
        },
        "required": ["transactions", "accounts", "categories"]
    })
}

/// Calls `POST {base}/v1beta/models/{model}:generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    /// Shared settings.
    config: ProviderConfig,
}

impl GeminiProvider {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";

    /// Creates a builder; finish it with [`ProviderBuilder::gemini`].
    #[inline]
    #[must_use]
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::default()
    }

    /// Wraps validated settings.
    pub(crate) const fn from_config(config: ProviderConfig) -> Self {
        Self { config }
    }

    /// Returns the model name.
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

impl InterpretationProvider for GeminiProvider {
    #[tracing::instrument(skip_all, fields(model = %self.config.model))]
    async fn generate_transactions(&self, request: &InterpretationRequest) -> Result<SuggestedBatch> {
        let prompt = Prompt::for_request(request)?;
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: [TextPart { text: &prompt.system }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [TextPart { text: &prompt.user }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: batch_schema(),
            },
        };
        let method = format!("{}:generateContent", self.config.model);
        let url = self.config.endpoint(&["v1beta", "models", &method])?;
        let mut key = HeaderValue::from_str(self.config.api_key.expose_secret())
            .map_err(|err| FinanceError::Configuration(format!("invalid API key: {err}")))?;
        key.set_sensitive(true);
        tracing::debug!("requesting content");
        let reply = send_request(
            self.config
                .http
                .post(url)
                .header(API_KEY_HEADER, key)
                .json(&body),
        )
        .await?;

        let response: GenerateResponse = serde_json::from_str(&reply).map_err(|err| {
            FinanceError::Interpretation(format!("unexpected generateContent reply: {err}"))
        })?;
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(FinanceError::Interpretation("no response from provider".to_owned()));
        }
        SuggestedBatch::from_json(&text)
    }
}
