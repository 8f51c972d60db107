//! The interpretation capability and its explicit selection.

use core::future::Future;

use secrecy::SecretString;
use url::Url;

use crate::error::{FinanceError, Result};

use super::{GeminiProvider, InterpretationRequest, OpenAiProvider, SuggestedBatch};

/// Turns a transcript into a suggested batch of entities.
pub trait InterpretationProvider: core::fmt::Debug + Send + Sync {
    /// Asks the model to interpret `request`.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::Api`] or [`FinanceError::Http`] if the
    /// provider call fails, and [`FinanceError::Interpretation`] if the
    /// reply is empty or not a valid batch.
    fn generate_transactions(
        &self,
        request: &InterpretationRequest,
    ) -> impl Future<Output = Result<SuggestedBatch>> + Send;
}

/// Which provider implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OpenAI chat completions.
    OpenAi,
    /// Google Gemini `generateContent`.
    #[default]
    Gemini,
}

impl ProviderKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [Self] = &[Self::OpenAi, Self::Gemini];

    /// Returns the lowercase name used on the command line.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl core::fmt::Display for ProviderKind {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProviderKind {
    type Err = FinanceError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                FinanceError::Configuration(format!(
                    "unknown provider \"{s}\", expected \"openai\" or \"gemini\""
                ))
            })
    }
}

/// One concrete provider, chosen explicitly.
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI-style chat completions.
    OpenAi(OpenAiProvider),
    /// Gemini-style content generation.
    Gemini(GeminiProvider),
}

impl Provider {
    /// Creates a builder shared by both provider kinds.
    #[inline]
    #[must_use]
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::default()
    }

    /// Returns which implementation this is.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match *self {
            Self::OpenAi(_) => ProviderKind::OpenAi,
            Self::Gemini(_) => ProviderKind::Gemini,
        }
    }

    /// Returns the model name requests are sent to.
    #[inline]
    #[must_use]
    pub fn model(&self) -> &str {
        match *self {
            Self::OpenAi(ref provider) => provider.model(),
            Self::Gemini(ref provider) => provider.model(),
        }
    }
}

impl InterpretationProvider for Provider {
    async fn generate_transactions(&self, request: &InterpretationRequest) -> Result<SuggestedBatch> {
        match *self {
            Self::OpenAi(ref provider) => provider.generate_transactions(request).await,
            Self::Gemini(ref provider) => provider.generate_transactions(request).await,
        }
    }
}

/// Builder for [`OpenAiProvider`], [`GeminiProvider`] or [`Provider`].
#[derive(Debug, Default)]
pub struct ProviderBuilder {
    /// API key (required).
    api_key: Option<SecretString>,
    /// Model override.
    model: Option<String>,
    /// Base URL override.
    base_url: Option<String>,
}

impl ProviderBuilder {
    /// Sets the API key.
    #[inline]
    #[must_use]
    pub fn api_key<T: Into<String>>(mut self, key: T) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Overrides the model name.
    #[inline]
    #[must_use]
    pub fn model<T: Into<String>>(mut self, model: T) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Overrides the API base URL (used by tests and proxies).
    #[inline]
    #[must_use]
    pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds an OpenAI-style provider.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::Configuration`] if the key is missing or
    /// the base URL is invalid.
    #[inline]
    pub fn openai(self) -> Result<OpenAiProvider> {
        Ok(OpenAiProvider::from_config(
            self.config(OpenAiProvider::DEFAULT_BASE_URL, OpenAiProvider::DEFAULT_MODEL)?,
        ))
    }

    /// Builds a Gemini-style provider.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::Configuration`] if the key is missing or
    /// the base URL is invalid.
    #[inline]
    pub fn gemini(self) -> Result<GeminiProvider> {
        Ok(GeminiProvider::from_config(
            self.config(GeminiProvider::DEFAULT_BASE_URL, GeminiProvider::DEFAULT_MODEL)?,
        ))
    }

    /// Builds the provider of the given kind.
    ///
    /// # Errors
    ///
    /// Same as [`Self::openai`] and [`Self::gemini`].
    #[inline]
    pub fn build(self, kind: ProviderKind) -> Result<Provider> {
        match kind {
            ProviderKind::OpenAi => self.openai().map(Provider::OpenAi),
            ProviderKind::Gemini => self.gemini().map(Provider::Gemini),
        }
    }

    /// Resolves defaults and checks the settings.
    #[tracing::instrument(skip_all)]
    fn config(self, default_base: &str, default_model: &str) -> Result<ProviderConfig> {
        let api_key = self
            .api_key
            .ok_or_else(|| FinanceError::Configuration("provider API key is required".to_owned()))?;
        let raw = self.base_url.unwrap_or_else(|| default_base.to_owned());
        let base_url = Url::parse(&raw).map_err(|err| {
            FinanceError::Configuration(format!("invalid provider URL \"{raw}\": {err}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FinanceError::Configuration(format!(
                "provider URL \"{raw}\" cannot have path segments"
            )));
        }
        let model = self.model.unwrap_or_else(|| default_model.to_owned());
        tracing::debug!(base_url = %base_url, model = %model, "building provider");
        Ok(ProviderConfig {
            http: reqwest::Client::builder().build()?,
            base_url,
            api_key,
            model,
        })
    }
}

/// Settings shared by every provider implementation.
#[derive(Debug, Clone)]
pub(crate) struct ProviderConfig {
    /// Underlying HTTP client.
    pub(crate) http: reqwest::Client,
    /// API base URL.
    pub(crate) base_url: Url,
    /// API key.
    pub(crate) api_key: SecretString,
    /// Model name.
    pub(crate) model: String,
}

impl ProviderConfig {
    /// Joins percent-encoded path segments onto the base URL.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                FinanceError::Configuration("provider URL cannot have path segments".to_owned())
            })?;
            let _path = path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" gemini ".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        let err = "claude".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, FinanceError::Configuration(_)));
    }

    #[test]
    fn builder_requires_key() {
        let err = Provider::builder().openai().unwrap_err();
        assert!(matches!(err, FinanceError::Configuration(_)));
    }

    #[test]
    fn builder_applies_defaults() {
        let provider = Provider::builder()
            .api_key("k")
            .build(ProviderKind::Gemini)
            .unwrap();
        assert_eq!(provider.kind(), ProviderKind::Gemini);
        assert_eq!(provider.model(), GeminiProvider::DEFAULT_MODEL);
    }

    #[test]
    fn builder_rejects_bad_url() {
        let err = Provider::builder()
            .api_key("k")
            .base_url("mailto:someone@example.com")
            .openai()
            .unwrap_err();
        assert!(matches!(err, FinanceError::Configuration(_)));
    }

    #[test]
    fn debug_output_hides_key() {
        let provider = Provider::builder().api_key("sk-very-secret").openai().unwrap();
        assert!(!format!("{provider:?}").contains("sk-very-secret"));
    }
}
