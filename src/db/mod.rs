mod schema;

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use crate::error::{ErrorCode, LedgerError, Result};
use crate::models::{Debt, DebtType, Entry, EntryType, Method, Transfer};
use crate::repo::{
    DebtFilter, DebtRepository, DebtSortField, EntryFilter, EntryRepository, EntrySortField,
    MethodFilter, MethodRepository, MethodSortField, Page, SortDirection, TransferFilter,
    TransferRepository,
};
use crate::validate;

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::System(anyhow::Error::new(err))
    }
}

const METHOD_COLS: &str = "id, name, initial_balance, archived, created_at";
const ENTRY_COLS: &str = "id, entry_type, date, amount, method_id, category_id, purpose, \
                          private_purpose, note, evidence_note, debt_id, created_at";
const DEBT_COLS: &str = "id, debt_type, root_entry_id, date, amount, counterpart, repaid_at, memo";
const TRANSFER_COLS: &str = "id, root_entry_id, from_method_id, to_method_id, date, note";

/// SQLite-backed implementation of the four repository ports.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database: {}", path.display()))
            .map_err(LedgerError::System)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            debug!("initialized ledger schema v{}", schema::CURRENT_VERSION);
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
            debug!(
                "migrated ledger schema v{current} -> v{}",
                schema::CURRENT_VERSION
            );
        }

        Ok(())
    }

    // ── Guards shared by entry creation paths ─────────────────

    fn ensure_method_active(&self, method_id: i64) -> Result<Method> {
        let method = self.find_method(method_id)?;
        if method.archived {
            return Err(LedgerError::rule(
                ErrorCode::MethodArchived,
                format!("method \"{}\" is archived", method.name),
            ));
        }
        Ok(method)
    }

    /// Advisory duplicate check: an existing entry with the same
    /// (date, amount, method, purpose, type) tuple is treated as an
    /// accidental double-entry. Not applied to transfers.
    fn ensure_not_duplicate(
        &self,
        entry_type: EntryType,
        date: NaiveDate,
        amount: Decimal,
        method_id: i64,
        purpose: Option<&str>,
    ) -> Result<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM entries
              WHERE date = ?1 AND amount = ?2 AND method_id = ?3
                AND entry_type = ?4 AND purpose IS ?5)",
            params![
                date.to_string(),
                amount.to_string(),
                method_id,
                entry_type.as_str(),
                purpose
            ],
            |row| row.get(0),
        )?;
        if exists {
            warn!("rejected possible duplicate: {entry_type} {amount} on {date}");
            return Err(LedgerError::rule(
                ErrorCode::DuplicateEntry,
                format!("an identical {entry_type} entry of {amount} on {date} already exists"),
            ));
        }
        Ok(())
    }

    fn ensure_repayment_fits(&self, entry: &Entry, debt: &Debt) -> Result<()> {
        let expected = match entry.entry_type {
            EntryType::Repayment => DebtType::Borrow,
            EntryType::RepaymentReceive => DebtType::Lend,
            _ => return Ok(()),
        };
        if debt.debt_type != expected {
            return Err(LedgerError::rule(
                ErrorCode::InvalidValueCombination,
                format!(
                    "a {} entry cannot repay a {} debt",
                    entry.entry_type, debt.debt_type
                ),
            ));
        }
        let already_repaid = self.repaid_total(debt)?;
        if already_repaid + entry.amount > debt.amount {
            return Err(LedgerError::rule(
                ErrorCode::ExcessRepaymentAmount,
                format!(
                    "repaying {} would exceed the debt of {} ({} already repaid)",
                    entry.amount, debt.amount, already_repaid
                ),
            ));
        }
        Ok(())
    }

    fn repaid_total(&self, debt: &Debt) -> Result<Decimal> {
        let Some(debt_id) = debt.id else {
            return Ok(Decimal::ZERO);
        };
        let mut stmt = self.conn.prepare(
            "SELECT amount FROM entries
              WHERE debt_id = ?1 AND entry_type IN ('repayment', 'repayment_receive')",
        )?;
        let rows = stmt.query_map(params![debt_id], |row| row.get::<_, String>(0))?;
        let mut total = Decimal::ZERO;
        for amount in rows {
            total += Decimal::from_str(&amount?).unwrap_or_default();
        }
        Ok(total)
    }
}

// ── Composite ledger operations ───────────────────────────────

/// Input for recording a borrow or lend together with its debt record.
/// The draft carries no ids: both are assigned inside the transaction.
#[derive(Debug, Clone)]
pub struct DebtEntryInput {
    pub debt_type: DebtType,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub method_id: i64,
    pub counterpart: String,
    pub category_id: Option<i64>,
    pub purpose: Option<String>,
    pub memo: Option<String>,
}

/// Input for recording a transfer together with its root entry.
#[derive(Debug, Clone)]
pub struct TransferInput {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub from_method_id: i64,
    pub to_method_id: i64,
    pub note: Option<String>,
}

impl Database {
    /// Records a borrow or lend as one logical transaction: the entry and
    /// its debt are created together or not at all. The entry's `debt_id`
    /// and the debt's `root_entry_id` are wired inside the transaction.
    pub fn create_debt_entry(&mut self, input: &DebtEntryInput) -> Result<(Entry, Debt)> {
        validate::positive_amount(input.amount)?;
        validate::non_blank("counterpart", &input.counterpart, Debt::MAX_COUNTERPART_LEN)?;
        self.ensure_method_active(input.method_id)?;
        let entry_type = match input.debt_type {
            DebtType::Borrow => EntryType::Borrow,
            DebtType::Lend => EntryType::Lend,
        };
        self.ensure_not_duplicate(
            entry_type,
            input.date,
            input.amount,
            input.method_id,
            input.purpose.as_deref(),
        )?;

        let created_at = Utc::now();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO entries (entry_type, date, amount, method_id, category_id, purpose, debt_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
            params![
                entry_type.as_str(),
                input.date.to_string(),
                input.amount.to_string(),
                input.method_id,
                input.category_id,
                input.purpose,
                created_at.to_rfc3339(),
            ],
        )?;
        let entry_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO debts (debt_type, root_entry_id, date, amount, counterpart, repaid_at, memo)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)",
            params![
                input.debt_type.as_str(),
                entry_id,
                input.date.to_string(),
                input.amount.to_string(),
                input.counterpart,
                input.memo,
            ],
        )?;
        let debt_id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE entries SET debt_id = ?1 WHERE id = ?2",
            params![debt_id, entry_id],
        )?;
        tx.commit()?;
        debug!("recorded {entry_type} of {} against method {}", input.amount, input.method_id);

        let entry = Entry {
            id: Some(entry_id),
            entry_type,
            date: input.date,
            amount: input.amount,
            method_id: input.method_id,
            category_id: input.category_id,
            purpose: input.purpose.clone(),
            private_purpose: None,
            note: None,
            evidence_note: None,
            debt_id: Some(debt_id),
            created_at,
        };
        let debt = Debt {
            id: Some(debt_id),
            debt_type: input.debt_type,
            root_entry_id: entry_id,
            date: input.date,
            amount: input.amount,
            counterpart: input.counterpart.clone(),
            repaid_at: None,
            memo: input.memo.clone(),
        };
        Ok((entry, debt))
    }

    /// Records a transfer as one logical transaction: the root entry (the
    /// source leg, so `method_id = from_method_id`) and the transfer are
    /// created together or not at all. Sufficient funds are not checked
    /// here; callers invoke [`crate::balance::check_sufficient_funds`]
    /// first.
    pub fn create_transfer_entry(&mut self, input: &TransferInput) -> Result<(Entry, Transfer)> {
        validate::positive_amount(input.amount)?;
        if input.from_method_id == input.to_method_id {
            return Err(LedgerError::rule(
                ErrorCode::IdenticalAccounts,
                format!(
                    "cannot transfer from method {} to itself",
                    input.from_method_id
                ),
            ));
        }
        self.ensure_method_active(input.from_method_id)?;
        self.find_method(input.to_method_id)?;

        let created_at = Utc::now();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO entries (entry_type, date, amount, method_id, created_at)
             VALUES ('transfer', ?1, ?2, ?3, ?4)",
            params![
                input.date.to_string(),
                input.amount.to_string(),
                input.from_method_id,
                created_at.to_rfc3339(),
            ],
        )?;
        let entry_id = tx.last_insert_rowid();
        let transfer = Transfer::new(
            entry_id,
            input.from_method_id,
            input.to_method_id,
            input.date,
            input.note.as_deref(),
        )?;
        tx.execute(
            "INSERT INTO transfers (root_entry_id, from_method_id, to_method_id, date, note)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                transfer.root_entry_id,
                transfer.from_method_id,
                transfer.to_method_id,
                transfer.date.to_string(),
                transfer.note,
            ],
        )?;
        let transfer_id = tx.last_insert_rowid();
        tx.commit()?;
        debug!(
            "recorded transfer of {} from method {} to method {}",
            input.amount, input.from_method_id, input.to_method_id
        );

        let entry = Entry {
            id: Some(entry_id),
            entry_type: EntryType::Transfer,
            date: input.date,
            amount: input.amount,
            method_id: input.from_method_id,
            category_id: None,
            purpose: None,
            private_purpose: None,
            note: None,
            evidence_note: None,
            debt_id: None,
            created_at,
        };
        Ok((
            entry,
            Transfer {
                id: Some(transfer_id),
                ..transfer
            },
        ))
    }
}

// ── Methods ───────────────────────────────────────────────────

impl MethodRepository for Database {
    fn find_method(&self, id: i64) -> Result<Method> {
        lookup(
            self.conn.query_row(
                &format!("SELECT {METHOD_COLS} FROM methods WHERE id = ?1"),
                params![id],
                map_method_row,
            ),
            "method",
            id,
        )
    }

    fn find_all_methods(&self, include_archived: bool) -> Result<Vec<Method>> {
        let sql = if include_archived {
            format!("SELECT {METHOD_COLS} FROM methods ORDER BY name")
        } else {
            format!("SELECT {METHOD_COLS} FROM methods WHERE archived = 0 ORDER BY name")
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_method_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn find_methods_by_options(&self, filter: &MethodFilter) -> Result<Vec<Method>> {
        let mut sql = format!("SELECT {METHOD_COLS} FROM methods WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(name) = &filter.name_contains {
            sql.push_str(&format!(" AND name LIKE ?{}", param_values.len() + 1));
            param_values.push(Box::new(format!("%{name}%")));
        }
        if !filter.include_archived {
            sql.push_str(" AND archived = 0");
        }
        let column = match filter.sort_by {
            MethodSortField::Name => "name",
            MethodSortField::CreatedAt => "created_at",
        };
        sql.push_str(&order_by(column, filter.direction));
        push_page(&mut sql, filter.page);

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), map_method_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn create_method(&mut self, method: &Method) -> Result<Method> {
        method.validate()?;
        self.conn.execute(
            "INSERT INTO methods (name, initial_balance, archived, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                method.name,
                method.initial_balance.map(|b| b.to_string()),
                method.archived,
                method.created_at.to_rfc3339(),
            ],
        )?;
        Ok(Method {
            id: Some(self.conn.last_insert_rowid()),
            ..method.clone()
        })
    }

    fn update_method(&mut self, method: &Method) -> Result<Method> {
        let id = persisted_id(method.id, "method")?;
        method.validate()?;
        let changed = self.conn.execute(
            "UPDATE methods SET name = ?1, initial_balance = ?2, archived = ?3 WHERE id = ?4",
            params![
                method.name,
                method.initial_balance.map(|b| b.to_string()),
                method.archived,
                id
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("method", id));
        }
        Ok(method.clone())
    }

    fn set_archive_status(&mut self, id: i64, archived: bool) -> Result<Method> {
        let changed = self.conn.execute(
            "UPDATE methods SET archived = ?1 WHERE id = ?2",
            params![archived, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("method", id));
        }
        self.find_method(id)
    }

    fn delete_method(&mut self, id: i64) -> Result<()> {
        let entry_refs: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE method_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let transfer_refs: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transfers WHERE from_method_id = ?1 OR to_method_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if entry_refs + transfer_refs > 0 {
            warn!("refused to delete method {id}: {entry_refs} entries, {transfer_refs} transfers");
            return Err(LedgerError::rule(
                ErrorCode::MethodInUse,
                format!(
                    "method {id} is referenced by {entry_refs} entries and {transfer_refs} transfers"
                ),
            ));
        }
        let changed = self
            .conn
            .execute("DELETE FROM methods WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(LedgerError::not_found("method", id));
        }
        Ok(())
    }
}

// ── Entries ───────────────────────────────────────────────────

impl EntryRepository for Database {
    fn find_entry(&self, id: i64) -> Result<Entry> {
        lookup(
            self.conn.query_row(
                &format!("SELECT {ENTRY_COLS} FROM entries WHERE id = ?1"),
                params![id],
                map_entry_row,
            ),
            "entry",
            id,
        )
    }

    fn find_entries_by_options(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let mut sql = format!("SELECT {ENTRY_COLS} FROM entries WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(start) = filter.start_date {
            sql.push_str(&format!(" AND date >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(start.to_string()));
        }
        if let Some(end) = filter.end_date {
            sql.push_str(&format!(" AND date <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(end.to_string()));
        }
        if !filter.types.is_empty() {
            let placeholders = placeholders(param_values.len(), filter.types.len());
            sql.push_str(&format!(" AND entry_type IN ({placeholders})"));
            for t in &filter.types {
                param_values.push(Box::new(t.as_str()));
            }
        }
        if !filter.method_ids.is_empty() {
            let placeholders = placeholders(param_values.len(), filter.method_ids.len());
            sql.push_str(&format!(" AND method_id IN ({placeholders})"));
            for mid in &filter.method_ids {
                param_values.push(Box::new(*mid));
            }
        }
        if !filter.category_ids.is_empty() {
            let placeholders = placeholders(param_values.len(), filter.category_ids.len());
            sql.push_str(&format!(" AND category_id IN ({placeholders})"));
            for cid in &filter.category_ids {
                param_values.push(Box::new(*cid));
            }
        }
        if let Some(debt_id) = filter.debt_id {
            sql.push_str(&format!(" AND debt_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(debt_id));
        }
        if !filter.include_private {
            sql.push_str(" AND private_purpose IS NULL");
        }
        let column = match filter.sort_by {
            EntrySortField::Date => "date",
            EntrySortField::Amount => "CAST(amount AS REAL)",
            EntrySortField::CreatedAt => "created_at",
        };
        sql.push_str(&order_by(column, filter.direction));
        push_page(&mut sql, filter.page);

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), map_entry_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn find_entries_by_method(&self, method_id: i64) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLS} FROM entries WHERE method_id = ?1 ORDER BY date, id"
        ))?;
        let rows = stmt.query_map(params![method_id], map_entry_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn find_entries_by_category(&self, category_id: i64) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLS} FROM entries WHERE category_id = ?1 ORDER BY date, id"
        ))?;
        let rows = stmt.query_map(params![category_id], map_entry_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn find_entries_by_debt(&self, debt_id: i64) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLS} FROM entries WHERE debt_id = ?1 ORDER BY date, id"
        ))?;
        let rows = stmt.query_map(params![debt_id], map_entry_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn create_entry(&mut self, entry: &Entry) -> Result<Entry> {
        entry.validate()?;
        self.ensure_method_active(entry.method_id)?;
        if let Some(debt_id) = entry.debt_id {
            let debt = self.find_debt(debt_id)?;
            self.ensure_repayment_fits(entry, &debt)?;
        }
        if !entry.entry_type.is_transfer() {
            self.ensure_not_duplicate(
                entry.entry_type,
                entry.date,
                entry.amount,
                entry.method_id,
                entry.purpose.as_deref(),
            )?;
        }
        self.conn.execute(
            "INSERT INTO entries (entry_type, date, amount, method_id, category_id, purpose,
                                  private_purpose, note, evidence_note, debt_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.entry_type.as_str(),
                entry.date.to_string(),
                entry.amount.to_string(),
                entry.method_id,
                entry.category_id,
                entry.purpose,
                entry.private_purpose,
                entry.note,
                entry.evidence_note,
                entry.debt_id,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(Entry {
            id: Some(self.conn.last_insert_rowid()),
            ..entry.clone()
        })
    }

    fn update_entry(&mut self, entry: &Entry) -> Result<Entry> {
        let id = persisted_id(entry.id, "entry")?;
        entry.validate()?;
        let changed = self.conn.execute(
            "UPDATE entries SET entry_type = ?1, date = ?2, amount = ?3, method_id = ?4,
                                category_id = ?5, purpose = ?6, private_purpose = ?7,
                                note = ?8, evidence_note = ?9, debt_id = ?10
             WHERE id = ?11",
            params![
                entry.entry_type.as_str(),
                entry.date.to_string(),
                entry.amount.to_string(),
                entry.method_id,
                entry.category_id,
                entry.purpose,
                entry.private_purpose,
                entry.note,
                entry.evidence_note,
                entry.debt_id,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("entry", id));
        }
        Ok(entry.clone())
    }

    fn delete_entry(&mut self, id: i64) -> Result<()> {
        let roots_debt: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM debts WHERE root_entry_id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        let roots_transfer: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM transfers WHERE root_entry_id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        if roots_debt || roots_transfer {
            return Err(LedgerError::rule(
                ErrorCode::InvalidValueCombination,
                format!("entry {id} roots a debt or transfer; delete that record instead"),
            ));
        }
        let changed = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(LedgerError::not_found("entry", id));
        }
        Ok(())
    }
}

// ── Debts ─────────────────────────────────────────────────────

impl DebtRepository for Database {
    fn find_debt(&self, id: i64) -> Result<Debt> {
        lookup(
            self.conn.query_row(
                &format!("SELECT {DEBT_COLS} FROM debts WHERE id = ?1"),
                params![id],
                map_debt_row,
            ),
            "debt",
            id,
        )
    }

    fn find_debt_by_root_entry(&self, root_entry_id: i64) -> Result<Debt> {
        lookup(
            self.conn.query_row(
                &format!("SELECT {DEBT_COLS} FROM debts WHERE root_entry_id = ?1"),
                params![root_entry_id],
                map_debt_row,
            ),
            "debt",
            root_entry_id,
        )
    }

    fn find_debts_by_options(&self, filter: &DebtFilter) -> Result<Vec<Debt>> {
        let mut sql = format!("SELECT {DEBT_COLS} FROM debts WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(debt_type) = filter.debt_type {
            sql.push_str(&format!(" AND debt_type = ?{}", param_values.len() + 1));
            param_values.push(Box::new(debt_type.as_str()));
        }
        if let Some(counterpart) = &filter.counterpart_contains {
            sql.push_str(&format!(" AND counterpart LIKE ?{}", param_values.len() + 1));
            param_values.push(Box::new(format!("%{counterpart}%")));
        }
        if filter.outstanding_only {
            sql.push_str(" AND repaid_at IS NULL");
        }
        if let Some(start) = filter.start_date {
            sql.push_str(&format!(" AND date >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(start.to_string()));
        }
        if let Some(end) = filter.end_date {
            sql.push_str(&format!(" AND date <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(end.to_string()));
        }
        let column = match filter.sort_by {
            DebtSortField::Date => "date",
            DebtSortField::Amount => "CAST(amount AS REAL)",
        };
        sql.push_str(&order_by(column, filter.direction));
        push_page(&mut sql, filter.page);

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), map_debt_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn find_outstanding_debts(&self, debt_type: Option<DebtType>) -> Result<Vec<Debt>> {
        let filter = DebtFilter {
            debt_type,
            outstanding_only: true,
            ..DebtFilter::default()
        };
        self.find_debts_by_options(&filter)
    }

    fn create_debt(&mut self, debt: &Debt) -> Result<Debt> {
        debt.validate()?;
        let root = self.find_entry(debt.root_entry_id)?;
        let expected = match debt.debt_type {
            DebtType::Borrow => EntryType::Borrow,
            DebtType::Lend => EntryType::Lend,
        };
        if root.entry_type != expected {
            return Err(LedgerError::rule(
                ErrorCode::InvalidValueCombination,
                format!(
                    "a {} debt must root a {expected} entry, found {}",
                    debt.debt_type, root.entry_type
                ),
            ));
        }
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM debts WHERE root_entry_id = ?1)",
            params![debt.root_entry_id],
            |row| row.get(0),
        )?;
        if taken {
            return Err(LedgerError::rule(
                ErrorCode::InvalidValueCombination,
                format!("entry {} already roots a debt", debt.root_entry_id),
            ));
        }
        self.conn.execute(
            "INSERT INTO debts (debt_type, root_entry_id, date, amount, counterpart, repaid_at, memo)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                debt.debt_type.as_str(),
                debt.root_entry_id,
                debt.date.to_string(),
                debt.amount.to_string(),
                debt.counterpart,
                debt.repaid_at.map(|d| d.to_string()),
                debt.memo,
            ],
        )?;
        Ok(Debt {
            id: Some(self.conn.last_insert_rowid()),
            ..debt.clone()
        })
    }

    fn update_debt(&mut self, debt: &Debt) -> Result<Debt> {
        let id = persisted_id(debt.id, "debt")?;
        debt.validate()?;
        // Only the correction fields are writable; the lifecycle fields go
        // through mark_as_repaid.
        let changed = self.conn.execute(
            "UPDATE debts SET counterpart = ?1, memo = ?2 WHERE id = ?3",
            params![debt.counterpart, debt.memo, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("debt", id));
        }
        self.find_debt(id)
    }

    fn mark_as_repaid(&mut self, id: i64, repaid_at: NaiveDate) -> Result<Debt> {
        let tx = self.conn.transaction()?;
        let (date_str, existing): (String, Option<String>) = match tx.query_row(
            "SELECT date, repaid_at FROM debts WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ) {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(LedgerError::not_found("debt", id))
            }
            Err(e) => return Err(e.into()),
        };
        if existing.is_some() {
            return Err(LedgerError::rule(
                ErrorCode::DebtAlreadyRepaid,
                format!("debt {id} is already repaid"),
            ));
        }
        let opened = parse_date(&date_str);
        if repaid_at < opened {
            return Err(LedgerError::rule(
                ErrorCode::InvalidDateRange,
                format!("repaid_at {repaid_at} is before the debt date {opened}"),
            ));
        }
        // Check-then-set: the WHERE clause closes the read-update window.
        let changed = tx.execute(
            "UPDATE debts SET repaid_at = ?1 WHERE id = ?2 AND repaid_at IS NULL",
            params![repaid_at.to_string(), id],
        )?;
        if changed == 0 {
            return Err(LedgerError::rule(
                ErrorCode::DebtAlreadyRepaid,
                format!("debt {id} is already repaid"),
            ));
        }
        tx.commit()?;
        info!("debt {id} marked repaid on {repaid_at}");
        self.find_debt(id)
    }

    fn delete_debt(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        let root_entry_id: i64 = match tx.query_row(
            "SELECT root_entry_id FROM debts WHERE id = ?1",
            params![id],
            |row| row.get(0),
        ) {
            Ok(root) => root,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(LedgerError::not_found("debt", id))
            }
            Err(e) => return Err(e.into()),
        };
        let repayments: i64 = tx.query_row(
            "SELECT COUNT(*) FROM entries WHERE debt_id = ?1 AND id <> ?2",
            params![id, root_entry_id],
            |row| row.get(0),
        )?;
        if repayments > 0 {
            return Err(LedgerError::rule(
                ErrorCode::InvalidValueCombination,
                format!("debt {id} has {repayments} repayment entries; delete them first"),
            ));
        }
        // The debt and its root entry reference each other; unlink before
        // deleting either side.
        tx.execute(
            "UPDATE entries SET debt_id = NULL WHERE id = ?1",
            params![root_entry_id],
        )?;
        tx.execute("DELETE FROM debts WHERE id = ?1", params![id])?;
        tx.execute("DELETE FROM entries WHERE id = ?1", params![root_entry_id])?;
        tx.commit()?;
        Ok(())
    }
}

// ── Transfers ─────────────────────────────────────────────────

impl TransferRepository for Database {
    fn find_transfer(&self, id: i64) -> Result<Transfer> {
        lookup(
            self.conn.query_row(
                &format!("SELECT {TRANSFER_COLS} FROM transfers WHERE id = ?1"),
                params![id],
                map_transfer_row,
            ),
            "transfer",
            id,
        )
    }

    fn find_transfer_by_root_entry(&self, root_entry_id: i64) -> Result<Transfer> {
        lookup(
            self.conn.query_row(
                &format!("SELECT {TRANSFER_COLS} FROM transfers WHERE root_entry_id = ?1"),
                params![root_entry_id],
                map_transfer_row,
            ),
            "transfer",
            root_entry_id,
        )
    }

    fn find_transfers_by_options(&self, filter: &TransferFilter) -> Result<Vec<Transfer>> {
        let mut sql = format!("SELECT {TRANSFER_COLS} FROM transfers WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(start) = filter.start_date {
            sql.push_str(&format!(" AND date >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(start.to_string()));
        }
        if let Some(end) = filter.end_date {
            sql.push_str(&format!(" AND date <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(end.to_string()));
        }
        if let Some(method_id) = filter.method_id {
            sql.push_str(&format!(
                " AND (from_method_id = ?{0} OR to_method_id = ?{0})",
                param_values.len() + 1
            ));
            param_values.push(Box::new(method_id));
        }
        sql.push_str(&order_by("date", filter.direction));
        push_page(&mut sql, filter.page);

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), map_transfer_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn find_transfers_by_method(&self, method_id: i64) -> Result<Vec<Transfer>> {
        let filter = TransferFilter {
            method_id: Some(method_id),
            ..TransferFilter::default()
        };
        self.find_transfers_by_options(&filter)
    }

    fn create_transfer(&mut self, transfer: &Transfer) -> Result<Transfer> {
        transfer.validate()?;
        let root = self.find_entry(transfer.root_entry_id)?;
        if root.entry_type != EntryType::Transfer {
            return Err(LedgerError::rule(
                ErrorCode::InvalidValueCombination,
                format!(
                    "root entry {} is a {} entry, expected transfer",
                    transfer.root_entry_id, root.entry_type
                ),
            ));
        }
        if root.method_id != transfer.from_method_id {
            // The root entry's method is the source leg by construction;
            // balance folding relies on it.
            return Err(LedgerError::rule(
                ErrorCode::InvalidValueCombination,
                format!(
                    "root entry belongs to method {}, but the transfer leaves method {}",
                    root.method_id, transfer.from_method_id
                ),
            ));
        }
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM transfers WHERE root_entry_id = ?1)",
            params![transfer.root_entry_id],
            |row| row.get(0),
        )?;
        if taken {
            return Err(LedgerError::rule(
                ErrorCode::InvalidValueCombination,
                format!("entry {} already roots a transfer", transfer.root_entry_id),
            ));
        }
        self.find_method(transfer.to_method_id)?;
        self.conn.execute(
            "INSERT INTO transfers (root_entry_id, from_method_id, to_method_id, date, note)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                transfer.root_entry_id,
                transfer.from_method_id,
                transfer.to_method_id,
                transfer.date.to_string(),
                transfer.note,
            ],
        )?;
        Ok(Transfer {
            id: Some(self.conn.last_insert_rowid()),
            ..transfer.clone()
        })
    }

    fn update_transfer(&mut self, transfer: &Transfer) -> Result<Transfer> {
        let id = persisted_id(transfer.id, "transfer")?;
        transfer.validate()?;
        // Endpoints and root link are immutable for the life of a transfer.
        let changed = self.conn.execute(
            "UPDATE transfers SET date = ?1, note = ?2 WHERE id = ?3",
            params![transfer.date.to_string(), transfer.note, id],
        )?;
        if changed == 0 {
            return Err(LedgerError::not_found("transfer", id));
        }
        self.find_transfer(id)
    }

    fn delete_transfer(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        let root_entry_id: i64 = match tx.query_row(
            "SELECT root_entry_id FROM transfers WHERE id = ?1",
            params![id],
            |row| row.get(0),
        ) {
            Ok(root) => root,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(LedgerError::not_found("transfer", id))
            }
            Err(e) => return Err(e.into()),
        };
        tx.execute("DELETE FROM transfers WHERE id = ?1", params![id])?;
        tx.execute("DELETE FROM entries WHERE id = ?1", params![root_entry_id])?;
        tx.commit()?;
        Ok(())
    }
}

// ── Row mapping and query building ────────────────────────────

fn lookup<T>(result: rusqlite::Result<T>, entity: &'static str, id: i64) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(LedgerError::not_found(entity, id)),
        Err(e) => Err(e.into()),
    }
}

fn persisted_id(id: Option<i64>, what: &'static str) -> Result<i64> {
    id.ok_or_else(|| LedgerError::validation("id", format!("{what} has not been persisted yet")))
}

fn placeholders(taken: usize, count: usize) -> String {
    (0..count)
        .map(|i| format!("?{}", taken + i + 1))
        .collect::<Vec<_>>()
        .join(",")
}

fn order_by(column: &str, direction: SortDirection) -> String {
    let dir = match direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    };
    format!(" ORDER BY {column} {dir}, id {dir}")
}

fn push_page(sql: &mut String, page: Page) {
    match (page.limit, page.offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        // SQLite requires a LIMIT clause before OFFSET; -1 means unbounded.
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

fn map_method_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Method> {
    let initial_balance: Option<String> = row.get(2)?;
    let created_at: String = row.get(4)?;
    Ok(Method {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        initial_balance: initial_balance.map(|s| Decimal::from_str(&s).unwrap_or_default()),
        archived: row.get(3)?,
        created_at: parse_timestamp(&created_at),
    })
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    let type_str: String = row.get(1)?;
    let entry_type = EntryType::parse(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown entry type: {type_str}").into(),
        )
    })?;
    let date: String = row.get(2)?;
    let amount: String = row.get(3)?;
    let created_at: String = row.get(11)?;
    Ok(Entry {
        id: Some(row.get(0)?),
        entry_type,
        date: parse_date(&date),
        amount: Decimal::from_str(&amount).unwrap_or_default(),
        method_id: row.get(4)?,
        category_id: row.get(5)?,
        purpose: row.get(6)?,
        private_purpose: row.get(7)?,
        note: row.get(8)?,
        evidence_note: row.get(9)?,
        debt_id: row.get(10)?,
        created_at: parse_timestamp(&created_at),
    })
}

fn map_debt_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Debt> {
    let type_str: String = row.get(1)?;
    let debt_type = DebtType::parse(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown debt type: {type_str}").into(),
        )
    })?;
    let date: String = row.get(3)?;
    let amount: String = row.get(4)?;
    let repaid_at: Option<String> = row.get(6)?;
    Ok(Debt {
        id: Some(row.get(0)?),
        debt_type,
        root_entry_id: row.get(2)?,
        date: parse_date(&date),
        amount: Decimal::from_str(&amount).unwrap_or_default(),
        counterpart: row.get(5)?,
        repaid_at: repaid_at.map(|s| parse_date(&s)),
        memo: row.get(7)?,
    })
}

fn map_transfer_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transfer> {
    let date: String = row.get(4)?;
    Ok(Transfer {
        id: Some(row.get(0)?),
        root_entry_id: row.get(1)?,
        from_method_id: row.get(2)?,
        to_method_id: row.get(3)?,
        date: parse_date(&date),
        note: row.get(5)?,
    })
}
