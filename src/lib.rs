//! Client library for a personal finance tracker with voice entry.
//!
//! The crate is organised around three pieces of state and the services
//! they talk to:
//!
//! - [`store::FinanceStore`] caches accounts, categories and transactions,
//!   guards deletes against dangling references, and persists its
//!   collections to a [`storage::Storage`].
//! - [`auth::AuthStore`] tracks the signed-in user.
//! - [`voice`] turns a spoken description into a suggested batch through
//!   an LLM provider and commits it through the finance store.
//!
//! Both stores reach the backend through the [`backend::Backend`] trait,
//! implemented over HTTP by [`client::FinanceClient`]. Every entity and DTO
//! in [`models`] can be validated field by field, and [`reports`] computes
//! dashboard aggregates from cached transactions.

pub mod auth;
pub mod backend;
pub mod client;
pub mod error;
#[cfg(test)]
mod mock;
pub mod models;
pub mod reports;
pub mod storage;
pub mod store;
pub mod voice;
