//! Instructions sent to the language model.

use crate::error::Result;
use crate::models::PaymentMethod;

use super::InterpretationRequest;

/// Suffix marking a reference to an entity created in the same batch.
pub const PLACEHOLDER_SUFFIX: &str = ":ID";

/// A system message with the rules and a user message with the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Context and extraction rules.
    pub system: String,
    /// The transcript to interpret.
    pub user: String,
}

impl Prompt {
    /// Renders the prompt for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FinanceError::Serialization`] if the context
    /// cannot be rendered as JSON.
    #[inline]
    pub fn for_request(request: &InterpretationRequest) -> Result<Self> {
        let categories = serde_json::to_string_pretty(&request.context.categories)?;
        let accounts = serde_json::to_string_pretty(&request.context.accounts)?;
        let methods = if request.context.payment_methods.is_empty() {
            PaymentMethod::ALL.to_vec()
        } else {
            request.context.payment_methods.clone()
        };
        let payment_methods = methods
            .iter()
            .map(|method| format!("- {method}"))
            .collect::<Vec<_>>()
            .join("\n");
        let default_method = PaymentMethod::CreditCard;
        let language = &request.language;
        let date = &request.date;

        let system = format!(
            "You are a financial assistant that turns spoken descriptions of spending and income into transactions.\n\
             Extract every transaction from the user's words and express it with the options below.\n\
             \n\
             Existing categories:\n{categories}\n\
             \n\
             Existing accounts:\n{accounts}\n\
             \n\
             Payment methods:\n{payment_methods}\n\
             \n\
             Rules:\n\
             1. Decide from context whether each transaction is INCOME or EXPENSE.\n\
             2. Reuse the closest existing category. Create a new one only if none fits, and never use catch-all names like \"Other\" or \"Uncategorized\".\n\
             3. Reuse the closest existing account. Create a new one only if none fits.\n\
             4. Use {default_method} when no payment method is mentioned.\n\
             5. Amounts are plain numbers (\"twenty dollars\" is 20).\n\
             6. Give each transaction a short, clear name and put any extra information in details.\n\
             7. Write every text value in {language}.\n\
             8. Today is {date}. Resolve relative dates against it and output dates as YYYY-MM-DD.\n\
             9. To reference an account or category you are creating in this response, use \"<Name>{PLACEHOLDER_SUFFIX}\" as its id, e.g. \"Groceries{PLACEHOLDER_SUFFIX}\".\n\
             10. Names of new accounts and categories must be general (\"Bank Account\", \"Groceries\", \"Restaurants\"), not specific to one purchase.\n\
             11. List only accounts and categories that do not exist yet.\n\
             12. Create one transaction per purchase or payment mentioned.\n\
             13. Give every new account and category a vibrant hex color, distinct from the existing ones and readable on light and dark backgrounds.\n\
             \n\
             Respond with ONLY a JSON object of this shape:\n\
             {{\"transactions\": [{{\"name\", \"amount\", \"type\", \"categoryId\", \"accountId\", \"paymentMethod\", \"details\", \"date\"}}], \
             \"accounts\": [{{\"name\", \"type\", \"color\"}}], \
             \"categories\": [{{\"name\", \"type\", \"color\"}}]}}"
        );
        let user = format!(
            "Create transactions from this voice input: \"{}\"",
            request.voice_input
        );
        Ok(Self { system, user })
    }
}
