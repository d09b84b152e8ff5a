//! Repository ports the ledger core is consumed through.
//!
//! These traits abstract the storage backend away from the domain layer.
//! Implementations translate their own constraint violations into the
//! [`LedgerError`](crate::error::LedgerError) taxonomy; raw storage errors
//! only ever surface wrapped as `System`. Every `find_by_id` fails with
//! `NotFound` for a missing id.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::balance;
use crate::error::Result;
use crate::models::{Debt, DebtType, Entry, EntryType, Method, Transfer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Offset/limit pagination, applied after filtering and sorting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodSortField {
    #[default]
    Name,
    CreatedAt,
}

#[derive(Debug, Clone, Default)]
pub struct MethodFilter {
    pub name_contains: Option<String>,
    pub include_archived: bool,
    pub sort_by: MethodSortField,
    pub direction: SortDirection,
    pub page: Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntrySortField {
    #[default]
    Date,
    Amount,
    CreatedAt,
}

/// Search criteria for entries. Empty vecs mean "no restriction".
/// Entries carrying a private purpose are excluded unless `include_private`.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub types: Vec<EntryType>,
    pub method_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
    pub debt_id: Option<i64>,
    pub include_private: bool,
    pub sort_by: EntrySortField,
    pub direction: SortDirection,
    pub page: Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebtSortField {
    #[default]
    Date,
    Amount,
}

#[derive(Debug, Clone, Default)]
pub struct DebtFilter {
    pub debt_type: Option<DebtType>,
    pub counterpart_contains: Option<String>,
    pub outstanding_only: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sort_by: DebtSortField,
    pub direction: SortDirection,
    pub page: Page,
}

#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub method_id: Option<i64>,
    pub direction: SortDirection,
    pub page: Page,
}

pub trait MethodRepository {
    fn find_method(&self, id: i64) -> Result<Method>;

    /// All methods ordered by name; archived ones only when asked for.
    fn find_all_methods(&self, include_archived: bool) -> Result<Vec<Method>>;

    fn find_methods_by_options(&self, filter: &MethodFilter) -> Result<Vec<Method>>;

    /// Persists a new method and returns it with its assigned id.
    fn create_method(&mut self, method: &Method) -> Result<Method>;

    fn update_method(&mut self, method: &Method) -> Result<Method>;

    fn set_archive_status(&mut self, id: i64, archived: bool) -> Result<Method>;

    /// Fails with `METHOD_IN_USE` while any entry or transfer references the
    /// method.
    fn delete_method(&mut self, id: i64) -> Result<()>;
}

pub trait EntryRepository {
    fn find_entry(&self, id: i64) -> Result<Entry>;

    fn find_entries_by_options(&self, filter: &EntryFilter) -> Result<Vec<Entry>>;

    fn find_entries_by_method(&self, method_id: i64) -> Result<Vec<Entry>>;

    fn find_entries_by_category(&self, category_id: i64) -> Result<Vec<Entry>>;

    fn find_entries_by_debt(&self, debt_id: i64) -> Result<Vec<Entry>>;

    /// Persists a new entry after running the business guards: the method
    /// must exist and not be archived (`METHOD_ARCHIVED`), a non-transfer
    /// entry must not collide with an existing (date, amount, method,
    /// purpose, type) tuple (`DUPLICATE_ENTRY`), and repayment entries must
    /// match their debt's direction and not overshoot its amount
    /// (`EXCESS_REPAYMENT_AMOUNT`).
    fn create_entry(&mut self, entry: &Entry) -> Result<Entry>;

    fn update_entry(&mut self, entry: &Entry) -> Result<Entry>;

    /// Fails for entries that root a debt or transfer; those are deleted
    /// through their owning repository together with the entry.
    fn delete_entry(&mut self, id: i64) -> Result<()>;

    /// Signed balance of a method over `[start, end]`, both ends inclusive:
    /// fetch the method's entries in range and fold their
    /// [`balance_impact`](crate::models::Entry::balance_impact) with decimal
    /// addition from zero. Deliberately not transfer-aware beyond the
    /// entry's own (source) leg; see `balance_impact` for the destination
    /// side.
    fn calculate_balance(&self, method_id: i64, start: NaiveDate, end: NaiveDate) -> Result<Decimal> {
        let filter = EntryFilter {
            start_date: Some(start),
            end_date: Some(end),
            method_ids: vec![method_id],
            include_private: true,
            ..EntryFilter::default()
        };
        let entries = self.find_entries_by_options(&filter)?;
        Ok(balance::fold_entries(&entries))
    }
}

pub trait DebtRepository {
    fn find_debt(&self, id: i64) -> Result<Debt>;

    fn find_debt_by_root_entry(&self, root_entry_id: i64) -> Result<Debt>;

    fn find_debts_by_options(&self, filter: &DebtFilter) -> Result<Vec<Debt>>;

    /// Debts not yet repaid, optionally narrowed to one direction.
    fn find_outstanding_debts(&self, debt_type: Option<DebtType>) -> Result<Vec<Debt>>;

    fn create_debt(&mut self, debt: &Debt) -> Result<Debt>;

    fn update_debt(&mut self, debt: &Debt) -> Result<Debt>;

    /// Open -> Repaid with a check-then-set guarantee: two callers racing to
    /// repay the same debt cannot both succeed; the loser gets
    /// `DEBT_ALREADY_REPAID`. `repaid_at` earlier than the debt date fails
    /// with `INVALID_DATE_RANGE`.
    fn mark_as_repaid(&mut self, id: i64, repaid_at: NaiveDate) -> Result<Debt>;

    /// Removes the debt and its root entry together. Fails while repayment
    /// entries still reference the debt.
    fn delete_debt(&mut self, id: i64) -> Result<()>;
}

pub trait TransferRepository {
    fn find_transfer(&self, id: i64) -> Result<Transfer>;

    fn find_transfer_by_root_entry(&self, root_entry_id: i64) -> Result<Transfer>;

    fn find_transfers_by_options(&self, filter: &TransferFilter) -> Result<Vec<Transfer>>;

    /// Transfers where the method appears on either side.
    fn find_transfers_by_method(&self, method_id: i64) -> Result<Vec<Transfer>>;

    /// Persists a new transfer. Identical endpoints fail with
    /// `IDENTICAL_ACCOUNTS`; the root entry must be a transfer entry whose
    /// method is the source leg (`from_method_id`).
    fn create_transfer(&mut self, transfer: &Transfer) -> Result<Transfer>;

    /// Only date and note are writable; endpoints and root link are fixed.
    fn update_transfer(&mut self, transfer: &Transfer) -> Result<Transfer>;

    /// Removes the transfer and its root entry together.
    fn delete_transfer(&mut self, id: i64) -> Result<()>;
}
