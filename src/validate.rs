//! Field-level checks shared by entity construction.
//!
//! These are the structural half of validation; business rules that need
//! more than one value (duplicate lookups, archived methods, repayment
//! limits) live with the repositories.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{ErrorCode, LedgerError, Result};

/// Scheme for evidence attachments managed by the application itself.
pub(crate) const EVIDENCE_SCHEME: &str = "evidence://";

pub(crate) fn non_blank(field: &'static str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::validation(field, "must not be blank"));
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(LedgerError::validation(
            field,
            format!("must be at most {max_len} characters, got {len}"),
        ));
    }
    Ok(())
}

pub(crate) fn positive_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::rule(
            ErrorCode::InvalidValueRange,
            format!("amount must be positive, got {amount}"),
        ));
    }
    Ok(())
}

/// `later` must not precede `earlier`.
pub(crate) fn date_not_before(
    field: &'static str,
    later: NaiveDate,
    earlier: NaiveDate,
) -> Result<()> {
    if later < earlier {
        return Err(LedgerError::rule(
            ErrorCode::InvalidDateRange,
            format!("{field} {later} is before {earlier}"),
        ));
    }
    Ok(())
}

/// Evidence notes are free text, except that anything carrying a URI scheme
/// must point at an internally managed resource. External URLs are rejected.
pub(crate) fn evidence_note(value: &str) -> Result<()> {
    if looks_like_uri(value) && !value.starts_with(EVIDENCE_SCHEME) {
        return Err(LedgerError::rule(
            ErrorCode::InvalidInput,
            format!("evidence_note must use the {EVIDENCE_SCHEME} namespace, got {value}"),
        ));
    }
    Ok(())
}

fn looks_like_uri(value: &str) -> bool {
    match value.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_uri() {
        assert!(looks_like_uri("https://example.com/x"));
        assert!(looks_like_uri("evidence://2024/receipt-1.png"));
        assert!(looks_like_uri("s3+http://bucket/key"));
        assert!(!looks_like_uri("receipt in the shoebox"));
        assert!(!looks_like_uri("://no-scheme"));
        assert!(!looks_like_uri("9ab://digit-first"));
        assert!(!looks_like_uri("bad scheme://spaces"));
    }
}
