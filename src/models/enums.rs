//! Enumeration types for constrained API values.

use serde::{Deserialize, Serialize};

use super::{ValidationErrors, Violation, ViolationKind};

/// Defines a fieldless enum serialized by explicit wire names, together
/// with its variant table, `as_str`, `Display` and case-insensitive `FromStr`.
macro_rules! define_wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $wire:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire names of every variant, in declaration order.
            pub const NAMES: &'static [&'static str] = &[$($wire),+];

            /// Returns the wire name of this variant.
            #[inline]
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name {
            type Err = ValidationErrors;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| {
                        ValidationErrors::from(vec![Violation::new(
                            "value",
                            ViolationKind::InvalidEnum {
                                allowed: Self::NAMES,
                            },
                        )])
                    })
            }
        }
    };
}

define_wire_enum! {
    /// Kind of financial account.
    AccountType {
        /// Checking / current account.
        Checking => "CHECKING",
        /// Savings account.
        Savings => "SAVINGS",
        /// Credit card.
        CreditCard => "CREDIT_CARD",
        /// Brokerage or investment account.
        Investment => "INVESTMENT",
    }
}

define_wire_enum! {
    /// Direction of money flow. The sign of an amount is implied by this.
    TransactionType {
        /// Money coming in.
        Income => "INCOME",
        /// Money going out.
        Expense => "EXPENSE",
    }
}

/// Category type. Informational only: it is not required to match the type
/// of the transactions that reference the category.
pub type CategoryType = TransactionType;

define_wire_enum! {
    /// How a transaction was paid.
    PaymentMethod {
        /// Credit card.
        CreditCard => "CREDIT_CARD",
        /// Debit card.
        DebitCard => "DEBIT_CARD",
        /// Physical cash.
        Cash => "CASH",
        /// Bank transfer.
        BankTransfer => "BANK_TRANSFER",
        /// Digital wallet (e.g. phone payments).
        DigitalWallet => "DIGITAL_WALLET",
    }
}
