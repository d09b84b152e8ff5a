#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;
use crate::models::EntryType;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

fn entry(entry_type: EntryType, amount: Decimal, day: u32) -> Entry {
    let debt_id = entry_type.is_debt_related().then_some(1);
    Entry::new(entry_type, date(day), amount, 1, debt_id).unwrap()
}

#[test]
fn test_fold_empty() {
    assert_eq!(fold_entries(&[]), Decimal::ZERO);
}

#[test]
fn test_fold_mixed_entries() {
    // income 10000, expense 3000, expense 2000, borrow 5000 -> 10000
    let entries = vec![
        entry(EntryType::Income, dec!(10000), 5),
        entry(EntryType::Expense, dec!(3000), 10),
        entry(EntryType::Expense, dec!(2000), 15),
        entry(EntryType::Borrow, dec!(5000), 20),
    ];
    assert_eq!(fold_entries(&entries), dec!(10000));
}

#[test]
fn test_fold_is_order_independent() {
    let mut entries = vec![
        entry(EntryType::Income, dec!(10000), 5),
        entry(EntryType::Expense, dec!(3000), 10),
        entry(EntryType::Expense, dec!(2000), 15),
        entry(EntryType::Borrow, dec!(5000), 20),
    ];
    let total = fold_entries(&entries);
    entries.reverse();
    assert_eq!(fold_entries(&entries), total);
    entries.swap(0, 2);
    assert_eq!(fold_entries(&entries), total);
}

#[test]
fn test_fold_counts_only_source_leg_of_transfers() {
    let entries = vec![
        entry(EntryType::InitialBalance, dec!(1000), 1),
        entry(EntryType::Transfer, dec!(400), 2),
    ];
    // The transfer debits this method; the destination credit lives on the
    // paired Transfer record, not on any entry.
    assert_eq!(fold_entries(&entries), dec!(600));
}

#[test]
fn test_fold_keeps_decimal_precision() {
    let entries = vec![
        entry(EntryType::Income, dec!(0.10), 1),
        entry(EntryType::Income, dec!(0.20), 2),
        entry(EntryType::Expense, dec!(0.30), 3),
    ];
    assert_eq!(fold_entries(&entries), Decimal::ZERO);
}
