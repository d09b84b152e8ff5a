//! Balance folding over entries.
//!
//! A balance is the decimal sum of entry impacts starting from zero.
//! Addition is commutative, so no ordering of the fetched entries is
//! assumed or required. Transfers contribute only their source leg here;
//! the destination credit belongs to the paired
//! [`Transfer`](crate::models::Transfer) record.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{ErrorCode, LedgerError, Result};
use crate::models::Entry;
use crate::repo::EntryRepository;

/// Sum of [`Entry::balance_impact`] over the given entries.
pub fn fold_entries(entries: &[Entry]) -> Decimal {
    entries
        .iter()
        .fold(Decimal::ZERO, |total, entry| total + entry.balance_impact())
}

/// Hook to invoke before committing a transfer or a large expense: the
/// method's running balance up to `on_date` must cover `amount`, else
/// `INSUFFICIENT_FUNDS`. The transfer value itself holds no balance state;
/// the lookup is delegated to the repository's balance calculation.
pub fn check_sufficient_funds<R>(
    repo: &R,
    method_id: i64,
    amount: Decimal,
    on_date: NaiveDate,
) -> Result<()>
where
    R: EntryRepository + ?Sized,
{
    let available = repo.calculate_balance(method_id, NaiveDate::MIN, on_date)?;
    if available < amount {
        return Err(LedgerError::rule(
            ErrorCode::InsufficientFunds,
            format!("method {method_id} holds {available}, needs {amount}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
