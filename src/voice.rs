//! Voice transaction entry.
//!
//! A spoken description goes through three steps:
//!
//! 1. [`VoiceCapture`] collects the transcript from a speech recognizer.
//! 2. [`interpret`] sends it, together with the store's accounts and
//!    categories, to an [`InterpretationProvider`] and returns a
//!    [`SuggestedBatch`] for the user to review.
//! 3. [`SuggestedBatch::commit`] creates the new accounts, categories and
//!    transactions through the [`FinanceStore`].
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::Local;
//! use finance_ai::client::FinanceClient;
//! use finance_ai::storage::InMemoryStorage;
//! use finance_ai::store::FinanceStore;
//! use finance_ai::voice::{PlaceholderPolicy, Provider, ProviderKind, interpret};
//!
//! # async fn example() -> finance_ai::error::Result<()> {
//! let client = FinanceClient::builder()
//!     .base_url("http://localhost:3000/api")
//!     .session_token("token")
//!     .build()?;
//! let store = FinanceStore::new(client, InMemoryStorage::new());
//! store.initialize().await?;
//!
//! let provider = Provider::builder().api_key("key").build(ProviderKind::Gemini)?;
//! let today = Local::now().date_naive();
//! let batch = interpret(&provider, &store, "coffee for 4 dollars", "en-US", today).await?;
//! for line in batch.preview(&store.snapshot()) {
//!     println!("{} {} ({})", line.name, line.amount, line.category_name);
//! }
//! batch.commit(&store, PlaceholderPolicy::Reject).await?;
//! # Ok(())
//! # }
//! ```

mod batch;
mod capture;
mod gemini;
mod openai;
mod prompt;
mod provider;
mod request;

use chrono::NaiveDate;

use crate::backend::Backend;
use crate::error::{FinanceError, Result};
use crate::storage::Storage;
use crate::store::FinanceStore;

pub use batch::{
    CommitSummary, PlaceholderPolicy, SuggestedAccount, SuggestedBatch, TransactionPreview,
    placeholder_name,
};
pub use capture::{CapturePhase, VoiceCapture};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use prompt::{PLACEHOLDER_SUFFIX, Prompt};
pub use provider::{InterpretationProvider, Provider, ProviderBuilder, ProviderKind};
pub use request::{AccountContext, CategoryContext, InterpretationContext, InterpretationRequest};

/// Interprets `transcript` against the store's current accounts and
/// categories.
///
/// Nothing is written; review the batch and call
/// [`SuggestedBatch::commit`] to apply it.
///
/// # Errors
///
/// Returns [`FinanceError::Interpretation`] for an empty transcript or a
/// malformed reply, or the provider's transport error.
#[inline]
#[tracing::instrument(skip_all, fields(language = language))]
pub async fn interpret<P, B, S>(
    provider: &P,
    store: &FinanceStore<B, S>,
    transcript: &str,
    language: &str,
    today: NaiveDate,
) -> Result<SuggestedBatch>
where
    P: InterpretationProvider,
    B: Backend,
    S: Storage,
{
    let voice_input = transcript.trim();
    if voice_input.is_empty() {
        return Err(FinanceError::Interpretation("transcript is empty".to_owned()));
    }
    let request = InterpretationRequest::new(voice_input, language, today, &store.snapshot());
    let batch = provider.generate_transactions(&request).await?;
    tracing::debug!(
        transactions = batch.transactions.len(),
        accounts = batch.accounts.len(),
        categories = batch.categories.len(),
        "interpreted transcript"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::models::{AccountId, CategoryId, CreateTransaction, PaymentMethod, TransactionType};
    use crate::storage::InMemoryStorage;
    use std::sync::Mutex;

    /// Returns a fixed batch and records the last request.
    #[derive(Debug, Default)]
    struct FixedProvider {
        reply: SuggestedBatch,
        seen: Mutex<Option<InterpretationRequest>>,
    }

    impl InterpretationProvider for FixedProvider {
        async fn generate_transactions(
            &self,
            request: &InterpretationRequest,
        ) -> Result<SuggestedBatch> {
            *self.seen.lock().unwrap() = Some(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[tokio::test]
    async fn empty_transcript_is_rejected_without_provider_call() {
        let provider = FixedProvider::default();
        let store = FinanceStore::new(MockBackend::new(), InMemoryStorage::new());
        let err = interpret(&provider, &store, "  ", "en-US", today()).await.unwrap_err();
        assert!(matches!(err, FinanceError::Interpretation(_)));
        assert!(provider.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn capture_interpret_commit_flow() {
        let provider = FixedProvider {
            reply: SuggestedBatch {
                transactions: vec![CreateTransaction {
                    name: "Coffee".to_owned(),
                    details: None,
                    date: "2024-01-15".to_owned(),
                    kind: TransactionType::Expense,
                    amount: 5.0,
                    category_id: CategoryId::from("c1"),
                    account_id: AccountId::from("Cash:ID"),
                    payment_method: PaymentMethod::Cash,
                }],
                accounts: vec![SuggestedAccount {
                    name: "Cash".to_owned(),
                    kind: None,
                    color: "#FFBB28".to_owned(),
                }],
                categories: Vec::new(),
            },
            seen: Mutex::default(),
        };
        let backend = MockBackend::new();
        let store = FinanceStore::new(backend.clone(), InMemoryStorage::new());

        let mut capture = VoiceCapture::new();
        capture.start().unwrap();
        capture.on_result("five dollars cash for coffee", true);
        let transcript = capture.end().unwrap();

        let outcome = interpret(&provider, &store, &transcript, "en-US", today()).await;
        capture.settle(&outcome);
        let batch = outcome.unwrap();
        assert_eq!(capture.phase(), CapturePhase::Idle);

        let seen = provider.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.voice_input, "five dollars cash for coffee");
        assert_eq!(seen.date, "2024-01-15");

        let summary = batch.commit(&store, PlaceholderPolicy::Reject).await.unwrap();
        assert_eq!(summary.transactions[0].account_id, summary.accounts[0].id);
        assert_eq!(backend.server_accounts().len(), 1);
    }
}
