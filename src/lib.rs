//! Moneybook - a personal ledger core.
//!
//! Records money movements ([`Entry`]) against named payment methods
//! ([`Method`]), and tracks the lifecycle of debts ([`Debt`]) and
//! inter-method transfers ([`Transfer`]). Entities are immutable values:
//! every "update" validates and returns a new value. The [`db`] module
//! provides a SQLite implementation of the repository ports in [`repo`].

pub mod balance;
pub mod db;
pub mod error;
pub mod models;
pub mod repo;
mod validate;

pub use db::{Database, DebtEntryInput, TransferInput};
pub use error::{ErrorCode, LedgerError, Result};
pub use models::{Debt, DebtType, Entry, EntryType, Method, Transfer};
