use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::{ErrorCode, LedgerError, Result};
use crate::validate;

/// The kind of money movement an [`Entry`] records.
///
/// This is a closed set: classification is done with exhaustive matches so
/// that adding a variant forces every call site to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Income,
    Expense,
    Borrow,
    Lend,
    Repayment,
    RepaymentReceive,
    Transfer,
    InitialBalance,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Borrow => "borrow",
            Self::Lend => "lend",
            Self::Repayment => "repayment",
            Self::RepaymentReceive => "repayment_receive",
            Self::Transfer => "transfer",
            Self::InitialBalance => "initial_balance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            "borrow" => Some(Self::Borrow),
            "lend" => Some(Self::Lend),
            "repayment" => Some(Self::Repayment),
            "repayment_receive" => Some(Self::RepaymentReceive),
            "transfer" => Some(Self::Transfer),
            "initial_balance" => Some(Self::InitialBalance),
            _ => None,
        }
    }

    pub fn all() -> &'static [EntryType] {
        &[
            Self::Income,
            Self::Expense,
            Self::Borrow,
            Self::Lend,
            Self::Repayment,
            Self::RepaymentReceive,
            Self::Transfer,
            Self::InitialBalance,
        ]
    }

    /// Money coming into the method: income, borrowing, repayment received.
    pub fn is_income(&self) -> bool {
        matches!(self, Self::Income | Self::Borrow | Self::RepaymentReceive)
    }

    /// Money leaving the method: expense, lending, repayment made.
    pub fn is_expense(&self) -> bool {
        matches!(self, Self::Expense | Self::Lend | Self::Repayment)
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::Transfer)
    }

    pub fn is_initial_balance(&self) -> bool {
        matches!(self, Self::InitialBalance)
    }

    /// Types that must reference a [`Debt`](super::Debt).
    pub fn is_debt_related(&self) -> bool {
        matches!(
            self,
            Self::Borrow | Self::Lend | Self::Repayment | Self::RepaymentReceive
        )
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One atomic recorded money movement against a method.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: Option<i64>,
    pub entry_type: EntryType,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub method_id: i64,
    pub category_id: Option<i64>,
    pub purpose: Option<String>,
    pub private_purpose: Option<String>,
    pub note: Option<String>,
    pub evidence_note: Option<String>,
    pub debt_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Builds an entry with the fields that carry invariants. Optional text
    /// fields attach through the `with_*` combinators.
    pub fn new(
        entry_type: EntryType,
        date: NaiveDate,
        amount: Decimal,
        method_id: i64,
        debt_id: Option<i64>,
    ) -> Result<Self> {
        let entry = Self {
            id: None,
            entry_type,
            date,
            amount,
            method_id,
            category_id: None,
            purpose: None,
            private_purpose: None,
            note: None,
            evidence_note: None,
            debt_id,
            created_at: Utc::now(),
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Checks the entry's invariants in a fixed order and returns the first
    /// violation. Idempotent: a valid entry always passes.
    pub fn validate(&self) -> Result<()> {
        validate::positive_amount(self.amount)?;
        if self.entry_type.is_debt_related() && self.debt_id.is_none() {
            return Err(LedgerError::rule(
                ErrorCode::InvalidValueCombination,
                format!("{} entries must reference a debt", self.entry_type),
            ));
        }
        if let Some(note) = &self.evidence_note {
            validate::evidence_note(note)?;
        }
        Ok(())
    }

    pub fn with_category(&self, category_id: Option<i64>) -> Entry {
        Entry {
            category_id,
            ..self.clone()
        }
    }

    pub fn with_purpose(&self, purpose: Option<&str>) -> Entry {
        Entry {
            purpose: purpose.map(str::to_owned),
            ..self.clone()
        }
    }

    pub fn with_private_purpose(&self, private_purpose: Option<&str>) -> Entry {
        Entry {
            private_purpose: private_purpose.map(str::to_owned),
            ..self.clone()
        }
    }

    pub fn with_note(&self, note: Option<&str>) -> Entry {
        Entry {
            note: note.map(str::to_owned),
            ..self.clone()
        }
    }

    pub fn with_evidence_note(&self, evidence_note: Option<&str>) -> Result<Entry> {
        if let Some(note) = evidence_note {
            validate::evidence_note(note)?;
        }
        Ok(Entry {
            evidence_note: evidence_note.map(str::to_owned),
            ..self.clone()
        })
    }

    /// The signed contribution of this entry to its own method's balance.
    ///
    /// Income-classified types and `InitialBalance` contribute `+amount`;
    /// expense-classified types contribute `-amount`. A `Transfer` entry
    /// contributes `-amount`: the entry's method is always the source leg,
    /// because a transfer's root entry is created with `method_id` equal to
    /// the transfer's `from_method_id`. The destination side is not
    /// representable on the entry alone; callers wanting both legs fetch the
    /// paired [`Transfer`](super::Transfer) and credit its `to_method_id`
    /// with `+amount`. Folding entries therefore never double-counts a
    /// transfer.
    pub fn balance_impact(&self) -> Decimal {
        match self.entry_type {
            EntryType::Income
            | EntryType::Borrow
            | EntryType::RepaymentReceive
            | EntryType::InitialBalance => self.amount,
            EntryType::Expense
            | EntryType::Lend
            | EntryType::Repayment
            | EntryType::Transfer => -self.amount,
        }
    }
}
