use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{ErrorCode, LedgerError, Result};
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtType {
    Borrow,
    Lend,
}

impl DebtType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Borrow => "borrow",
            Self::Lend => "lend",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "borrow" => Some(Self::Borrow),
            "lend" => Some(Self::Lend),
            _ => None,
        }
    }
}

impl std::fmt::Display for DebtType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The lifecycle record of a borrow or lend, paired 1:1 with the entry that
/// originated it. Open until `mark_as_repaid`, which is a one-way door.
#[derive(Debug, Clone, PartialEq)]
pub struct Debt {
    pub id: Option<i64>,
    pub debt_type: DebtType,
    pub root_entry_id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub counterpart: String,
    pub repaid_at: Option<NaiveDate>,
    pub memo: Option<String>,
}

impl Debt {
    pub const MAX_COUNTERPART_LEN: usize = 50;

    pub fn new(
        debt_type: DebtType,
        root_entry_id: i64,
        date: NaiveDate,
        amount: Decimal,
        counterpart: impl Into<String>,
        repaid_at: Option<NaiveDate>,
    ) -> Result<Self> {
        let debt = Self {
            id: None,
            debt_type,
            root_entry_id,
            date,
            amount,
            counterpart: counterpart.into(),
            repaid_at,
            memo: None,
        };
        debt.validate()?;
        Ok(debt)
    }

    pub fn validate(&self) -> Result<()> {
        validate::positive_amount(self.amount)?;
        validate::non_blank("counterpart", &self.counterpart, Self::MAX_COUNTERPART_LEN)?;
        if let Some(repaid_at) = self.repaid_at {
            validate::date_not_before("repaid_at", repaid_at, self.date)?;
        }
        Ok(())
    }

    /// Transitions Open -> Repaid. Repaid is terminal: a second call fails
    /// with `DEBT_ALREADY_REPAID`.
    pub fn mark_as_repaid(&self, repaid_at: NaiveDate) -> Result<Debt> {
        if self.repaid_at.is_some() {
            return Err(LedgerError::rule(
                ErrorCode::DebtAlreadyRepaid,
                format!("debt to {} is already repaid", self.counterpart),
            ));
        }
        validate::date_not_before("repaid_at", repaid_at, self.date)?;
        Ok(Debt {
            repaid_at: Some(repaid_at),
            ..self.clone()
        })
    }

    pub fn update_memo(&self, memo: Option<&str>) -> Debt {
        if self.memo.as_deref() == memo {
            return self.clone();
        }
        Debt {
            memo: memo.map(str::to_owned),
            ..self.clone()
        }
    }

    pub fn update_counterpart(&self, counterpart: &str) -> Result<Debt> {
        if self.counterpart == counterpart {
            return Ok(self.clone());
        }
        validate::non_blank("counterpart", counterpart, Self::MAX_COUNTERPART_LEN)?;
        Ok(Debt {
            counterpart: counterpart.to_owned(),
            ..self.clone()
        })
    }

    pub fn is_borrow(&self) -> bool {
        matches!(self.debt_type, DebtType::Borrow)
    }

    pub fn is_lend(&self) -> bool {
        matches!(self.debt_type, DebtType::Lend)
    }

    pub fn is_repaid(&self) -> bool {
        self.repaid_at.is_some()
    }
}
