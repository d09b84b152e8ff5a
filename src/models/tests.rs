#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::error::{ErrorCode, LedgerError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn make_entry(entry_type: EntryType, amount: Decimal) -> crate::error::Result<Entry> {
    let debt_id = entry_type.is_debt_related().then_some(7);
    Entry::new(entry_type, date(2025, 1, 15), amount, 1, debt_id)
}

// ── EntryType ─────────────────────────────────────────────────

#[test]
fn test_entry_type_roundtrip() {
    for t in EntryType::all() {
        assert_eq!(EntryType::parse(t.as_str()), Some(*t));
    }
    assert_eq!(EntryType::parse("dividend"), None);
    assert_eq!(EntryType::parse("INCOME"), None);
}

#[test]
fn test_entry_type_display() {
    assert_eq!(format!("{}", EntryType::RepaymentReceive), "repayment_receive");
    assert_eq!(format!("{}", EntryType::InitialBalance), "initial_balance");
}

#[test]
fn test_classification_is_exhaustive() {
    for t in EntryType::all() {
        let buckets = [
            t.is_income(),
            t.is_expense(),
            t.is_transfer(),
            t.is_initial_balance(),
        ];
        // Every type lands in exactly one classification bucket.
        assert_eq!(buckets.iter().filter(|b| **b).count(), 1, "{t}");
    }
}

#[test]
fn test_classification_tables() {
    assert!(EntryType::Income.is_income());
    assert!(EntryType::Borrow.is_income());
    assert!(EntryType::RepaymentReceive.is_income());
    assert!(EntryType::Expense.is_expense());
    assert!(EntryType::Lend.is_expense());
    assert!(EntryType::Repayment.is_expense());
    assert!(EntryType::Transfer.is_transfer());
    assert!(EntryType::InitialBalance.is_initial_balance());

    assert!(EntryType::Borrow.is_debt_related());
    assert!(EntryType::Lend.is_debt_related());
    assert!(EntryType::Repayment.is_debt_related());
    assert!(EntryType::RepaymentReceive.is_debt_related());
    assert!(!EntryType::Income.is_debt_related());
    assert!(!EntryType::Transfer.is_debt_related());
}

// ── Entry ─────────────────────────────────────────────────────

#[test]
fn test_entry_rejects_non_positive_amount() {
    for amount in [Decimal::ZERO, dec!(-1), dec!(-0.01)] {
        let err = make_entry(EntryType::Expense, amount).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidValueRange), "{amount}");
    }
}

#[test]
fn test_entry_accepts_positive_amount() {
    assert!(make_entry(EntryType::Income, dec!(0.01)).is_ok());
    assert!(make_entry(EntryType::Expense, dec!(350000.00)).is_ok());
}

#[test]
fn test_debt_related_entry_requires_debt_id() {
    for t in [
        EntryType::Borrow,
        EntryType::Lend,
        EntryType::Repayment,
        EntryType::RepaymentReceive,
    ] {
        let err = Entry::new(t, date(2025, 1, 15), dec!(100), 1, None).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidValueCombination), "{t}");

        let ok = Entry::new(t, date(2025, 1, 15), dec!(100), 1, Some(3));
        assert!(ok.is_ok(), "{t}");
    }
}

#[test]
fn test_non_debt_entry_without_debt_id() {
    for t in [
        EntryType::Income,
        EntryType::Expense,
        EntryType::Transfer,
        EntryType::InitialBalance,
    ] {
        assert!(Entry::new(t, date(2025, 1, 15), dec!(100), 1, None).is_ok(), "{t}");
    }
}

#[test]
fn test_entry_validation_order_amount_first() {
    // Both violations present: the amount check reports first.
    let err = Entry::new(EntryType::Borrow, date(2025, 1, 15), dec!(-5), 1, None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidValueRange));
}

#[test]
fn test_entry_validate_is_idempotent() {
    let entry = make_entry(EntryType::Income, dec!(100)).unwrap();
    assert!(entry.validate().is_ok());
    assert!(entry.validate().is_ok());
}

#[test]
fn test_entry_evidence_note_rules() {
    let entry = make_entry(EntryType::Expense, dec!(100)).unwrap();

    let internal = entry
        .with_evidence_note(Some("evidence://2025/receipt-42.png"))
        .unwrap();
    assert_eq!(
        internal.evidence_note.as_deref(),
        Some("evidence://2025/receipt-42.png")
    );

    let plain = entry.with_evidence_note(Some("paper receipt in drawer")).unwrap();
    assert!(plain.validate().is_ok());

    let err = entry
        .with_evidence_note(Some("https://example.com/receipt.png"))
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidInput));

    let err = entry
        .with_evidence_note(Some("ftp://files.example.com/r.png"))
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidInput));
}

#[test]
fn test_entry_with_combinators() {
    let entry = make_entry(EntryType::Expense, dec!(1200)).unwrap();
    let entry = entry
        .with_category(Some(4))
        .with_purpose(Some("lunch"))
        .with_private_purpose(Some("team lunch, my treat"))
        .with_note(Some("paid cash"));
    assert_eq!(entry.category_id, Some(4));
    assert_eq!(entry.purpose.as_deref(), Some("lunch"));
    assert_eq!(entry.private_purpose.as_deref(), Some("team lunch, my treat"));
    assert_eq!(entry.note.as_deref(), Some("paid cash"));
    // The value itself is unchanged otherwise.
    assert_eq!(entry.amount, dec!(1200));
    assert_eq!(entry.entry_type, EntryType::Expense);
}

#[test]
fn test_balance_impact_signs() {
    assert_eq!(make_entry(EntryType::Income, dec!(100)).unwrap().balance_impact(), dec!(100));
    assert_eq!(make_entry(EntryType::Borrow, dec!(100)).unwrap().balance_impact(), dec!(100));
    assert_eq!(
        make_entry(EntryType::RepaymentReceive, dec!(100)).unwrap().balance_impact(),
        dec!(100)
    );
    assert_eq!(
        make_entry(EntryType::InitialBalance, dec!(100)).unwrap().balance_impact(),
        dec!(100)
    );
    assert_eq!(make_entry(EntryType::Expense, dec!(100)).unwrap().balance_impact(), dec!(-100));
    assert_eq!(make_entry(EntryType::Lend, dec!(100)).unwrap().balance_impact(), dec!(-100));
    assert_eq!(
        make_entry(EntryType::Repayment, dec!(100)).unwrap().balance_impact(),
        dec!(-100)
    );
}

#[test]
fn test_balance_impact_transfer_is_source_leg() {
    // The entry's own method is the source; the destination credit comes
    // from the paired Transfer, never from the entry.
    let entry = make_entry(EntryType::Transfer, dec!(500)).unwrap();
    assert_eq!(entry.balance_impact(), dec!(-500));
}

// ── Method ────────────────────────────────────────────────────

#[test]
fn test_method_new() {
    let method = Method::new("Wallet", Some(dec!(5000))).unwrap();
    assert!(method.id.is_none());
    assert_eq!(method.name, "Wallet");
    assert_eq!(method.initial_balance, Some(dec!(5000)));
    assert!(!method.archived);
}

#[test]
fn test_method_name_rules() {
    let err = Method::new("", None).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "name", .. }));

    let err = Method::new("   ", None).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "name", .. }));

    let err = Method::new("x".repeat(51), None).unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "name", .. }));

    assert!(Method::new("x".repeat(50), None).is_ok());
}

#[test]
fn test_method_rename() {
    let method = Method::new("Wallet", None).unwrap();
    let renamed = method.rename("Cash").unwrap();
    assert_eq!(renamed.name, "Cash");
    assert_eq!(method.name, "Wallet");

    assert!(method.rename("").is_err());
    assert!(method.rename("y".repeat(51)).is_err());
}

#[test]
fn test_method_rename_same_name_is_noop() {
    let method = Method::new("Wallet", None).unwrap();
    let same = method.rename("Wallet").unwrap();
    assert_eq!(same, method);
}

#[test]
fn test_method_set_archived() {
    let method = Method::new("Old Bank", None).unwrap();
    let archived = method.set_archived(true);
    assert!(archived.archived);
    assert!(!method.archived);
    assert_eq!(method.set_archived(false), method);
}

#[test]
fn test_method_set_initial_balance() {
    let method = Method::new("Bank", Some(dec!(100))).unwrap();
    let cleared = method.set_initial_balance(None);
    assert_eq!(cleared.initial_balance, None);
    let same = method.set_initial_balance(Some(dec!(100)));
    assert_eq!(same, method);
}

#[test]
fn test_method_display() {
    let method = Method::new("Wallet", None).unwrap();
    assert_eq!(format!("{method}"), "Wallet");
}

// ── Debt ──────────────────────────────────────────────────────

fn make_debt() -> Debt {
    Debt::new(DebtType::Borrow, 10, date(2025, 1, 10), dec!(5000), "Alice", None).unwrap()
}

#[test]
fn test_debt_type_roundtrip() {
    assert_eq!(DebtType::parse("borrow"), Some(DebtType::Borrow));
    assert_eq!(DebtType::parse("lend"), Some(DebtType::Lend));
    assert_eq!(DebtType::parse("owed"), None);
    assert_eq!(DebtType::Borrow.as_str(), "borrow");
    assert_eq!(format!("{}", DebtType::Lend), "lend");
}

#[test]
fn test_debt_new_rules() {
    let err = Debt::new(DebtType::Borrow, 10, date(2025, 1, 10), dec!(0), "Alice", None)
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidValueRange));

    let err = Debt::new(DebtType::Borrow, 10, date(2025, 1, 10), dec!(100), " ", None)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation { field: "counterpart", .. }));

    // repaid_at before the debt date is rejected at construction too.
    let err = Debt::new(
        DebtType::Lend,
        10,
        date(2025, 1, 10),
        dec!(100),
        "Bob",
        Some(date(2025, 1, 9)),
    )
    .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidDateRange));
}

#[test]
fn test_debt_mark_as_repaid_once() {
    let debt = make_debt();
    assert!(!debt.is_repaid());

    let repaid = debt.mark_as_repaid(date(2025, 2, 1)).unwrap();
    assert!(repaid.is_repaid());
    assert_eq!(repaid.repaid_at, Some(date(2025, 2, 1)));
    // Original value untouched.
    assert!(!debt.is_repaid());

    let err = repaid.mark_as_repaid(date(2025, 3, 1)).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::DebtAlreadyRepaid));
}

#[test]
fn test_debt_mark_as_repaid_same_day_ok() {
    let debt = make_debt();
    assert!(debt.mark_as_repaid(date(2025, 1, 10)).is_ok());
}

#[test]
fn test_debt_mark_as_repaid_before_date() {
    let debt = make_debt();
    let err = debt.mark_as_repaid(date(2025, 1, 9)).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidDateRange));
}

#[test]
fn test_debt_validate_is_idempotent() {
    let debt = make_debt();
    assert!(debt.validate().is_ok());
    assert!(debt.validate().is_ok());
}

#[test]
fn test_debt_updates() {
    let debt = make_debt();
    let with_memo = debt.update_memo(Some("split the dinner bill"));
    assert_eq!(with_memo.memo.as_deref(), Some("split the dinner bill"));
    assert_eq!(debt.update_memo(None), debt);

    let renamed = debt.update_counterpart("Alice W.").unwrap();
    assert_eq!(renamed.counterpart, "Alice W.");
    assert_eq!(debt.update_counterpart("Alice").unwrap(), debt);
    assert!(debt.update_counterpart("").is_err());
}

#[test]
fn test_debt_classification() {
    let borrow = make_debt();
    assert!(borrow.is_borrow());
    assert!(!borrow.is_lend());

    let lend = Debt::new(DebtType::Lend, 11, date(2025, 1, 10), dec!(100), "Bob", None).unwrap();
    assert!(lend.is_lend());
    assert!(!lend.is_borrow());
}

// ── Transfer ──────────────────────────────────────────────────

#[test]
fn test_transfer_identical_accounts() {
    let err = Transfer::new(1, 2, 2, date(2025, 1, 15), None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::IdenticalAccounts));
}

#[test]
fn test_transfer_distinct_accounts_ok() {
    let transfer = Transfer::new(1, 2, 3, date(2025, 1, 15), Some("to savings")).unwrap();
    assert_eq!(transfer.from_method_id, 2);
    assert_eq!(transfer.to_method_id, 3);
    assert!(transfer.validate().is_ok());
    assert!(transfer.validate().is_ok());
}

#[test]
fn test_transfer_reverse_roundtrip() {
    let transfer = Transfer::new(1, 2, 3, date(2025, 1, 15), Some("note")).unwrap();
    let reversed = transfer.reverse();
    assert_eq!(reversed.from_method_id, 3);
    assert_eq!(reversed.to_method_id, 2);
    assert_eq!(reversed.date, transfer.date);
    assert_eq!(reversed.note, transfer.note);
    assert_eq!(reversed.reverse(), transfer);
}

#[test]
fn test_transfer_with_combinators() {
    let transfer = Transfer::new(1, 2, 3, date(2025, 1, 15), None).unwrap();
    let dated = transfer.with_date(date(2025, 1, 20));
    assert_eq!(dated.date, date(2025, 1, 20));
    assert_eq!(dated.from_method_id, 2);

    let noted = transfer.with_note(Some("rent move"));
    assert_eq!(noted.note.as_deref(), Some("rent move"));
    assert_eq!(noted.with_note(None).note, None);
}

#[test]
fn test_transfer_involves_method() {
    let transfer = Transfer::new(1, 2, 3, date(2025, 1, 15), None).unwrap();
    assert!(transfer.involves_method(2));
    assert!(transfer.involves_method(3));
    assert!(!transfer.involves_method(4));
}
