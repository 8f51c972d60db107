//! OpenAI-style chat completions provider.

use secrecy::ExposeSecret as _;
use serde::{Deserialize, Serialize};

use crate::client::send_request;
use crate::error::{FinanceError, Result};

use super::provider::{ProviderBuilder, ProviderConfig};
use super::{InterpretationProvider, InterpretationRequest, Prompt, SuggestedBatch};

/// Sampling temperature sent with every request.
const TEMPERATURE: f64 = 1.0;

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'req> {
    /// Model name.
    model: &'req str,
    /// System then user message.
    messages: [ChatMessage<'req>; 2],
    /// Sampling temperature.
    temperature: f64,
    /// Forces a JSON object reply.
    response_format: ResponseFormat,
}

/// One chat message.
#[derive(Debug, Serialize)]
struct ChatMessage<'req> {
    /// `system` or `user`.
    role: &'static str,
    /// Message text.
    content: &'req str,
}

/// `{"type": "json_object"}`.
#[derive(Debug, Serialize)]
struct ResponseFormat {
    /// Format name.
    #[serde(rename = "type")]
    kind: &'static str,
}

/// The parts of a chat completions reply we read.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// Candidate replies.
    #[serde(default)]
    choices: Vec<Choice>,
}

/// One candidate reply.
#[derive(Debug, Deserialize)]
struct Choice {
    /// The assistant message.
    message: ChoiceMessage,
}

/// Assistant message body.
#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    /// Reply text; absent on refusals.
    #[serde(default)]
    content: Option<String>,
}

/// Calls `POST {base}/v1/chat/completions` with a bearer key.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    /// Shared settings.
    config: ProviderConfig,
}

impl OpenAiProvider {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gpt-3.5-turbo";

    /// Creates a builder; finish it with [`ProviderBuilder::openai`].
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

impl InterpretationProvider for OpenAiProvider {
    #[tracing::instrument(skip_all, fields(model = %self.config.model))]
    async fn generate_transactions(&self, request: &InterpretationRequest) -> Result<SuggestedBatch> {
        let prompt = Prompt::for_request(request)?;
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
        };
        let url = self.config.endpoint(&["v1", "chat", "completions"])?;
        tracing::debug!("requesting completion");
        let reply = send_request(
            self.config
                .http
                .post(url)
                .bearer_auth(self.config.api_key.expose_secret())
                .json(&body),
        )
        .await?;

        let response: ChatResponse = serde_json::from_str(&reply).map_err(|err| {
            FinanceError::Interpretation(format!("unexpected completion reply: {err}"))
        })?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| FinanceError::Interpretation("no response from provider".to_owned()))?;
        SuggestedBatch::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FinanceSnapshot;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::builder()
            .api_key("sk-test")
            .base_url(server.uri())
            .openai()
            .unwrap()
    }

    fn request() -> InterpretationRequest {
        InterpretationRequest::new(
            "paid 5 in cash for coffee",
            "en-US",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            &FinanceSnapshot::default(),
        )
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]})
    }

    #[tokio::test]
    async fn posts_chat_completion_and_parses_batch() {
        let server = MockServer::start().await;
        let batch = json!({
            "transactions": [{
                "name": "Coffee", "amount": 5, "type": "EXPENSE",
                "categoryId": "Coffee:ID", "accountId": "Cash:ID",
                "paymentMethod": "CASH", "date": "2024-01-15"
            }],
            "accounts": [{"name": "Cash", "color": "#FFBB28"}],
            "categories": [{"name": "Coffee", "type": "EXPENSE", "color": "#FF8042"}]
        });
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&batch.to_string())))
            .expect(1)
            .mount(&server)
            .await;

        let suggested = provider(&server).generate_transactions(&request()).await.unwrap();
        assert_eq!(suggested.transactions.len(), 1);
        assert_eq!(suggested.transactions[0].account_id.as_inner(), "Cash:ID");
        assert_eq!(suggested.accounts[0].name, "Cash");
        assert_eq!(suggested.categories[0].name, "Coffee");
    }

    #[tokio::test]
    async fn empty_content_is_an_interpretation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  ")))
            .mount(&server)
            .await;

        let err = provider(&server).generate_transactions(&request()).await.unwrap_err();
        assert!(matches!(err, FinanceError::Interpretation(_)));
    }

    #[tokio::test]
    async fn non_json_content_is_an_interpretation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Sure! Here you go")))
            .mount(&server)
            .await;

        let err = provider(&server).generate_transactions(&request()).await.unwrap_err();
        assert!(matches!(err, FinanceError::Interpretation(_)));
    }

    #[tokio::test]
    async fn rejected_key_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = provider(&server).generate_transactions(&request()).await.unwrap_err();
        assert!(matches!(err, FinanceError::Api { status: 401, .. }));
    }
}
