use chrono::NaiveDate;

use crate::error::{ErrorCode, LedgerError, Result};

/// A paired movement between two methods, 1:1 with its root entry (the
/// entry of type `Transfer` whose method is the source leg). Endpoints and
/// the root link are fixed for the life of the value; date and note may be
/// replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub id: Option<i64>,
    pub root_entry_id: i64,
    pub from_method_id: i64,
    pub to_method_id: i64,
    pub date: NaiveDate,
    pub note: Option<String>,
}

impl Transfer {
    pub fn new(
        root_entry_id: i64,
        from_method_id: i64,
        to_method_id: i64,
        date: NaiveDate,
        note: Option<&str>,
    ) -> Result<Self> {
        let transfer = Self {
            id: None,
            root_entry_id,
            from_method_id,
            to_method_id,
            date,
            note: note.map(str::to_owned),
        };
        transfer.validate()?;
        Ok(transfer)
    }

    pub fn validate(&self) -> Result<()> {
        if self.from_method_id == self.to_method_id {
            return Err(LedgerError::rule(
                ErrorCode::IdenticalAccounts,
                format!(
                    "cannot transfer from method {} to itself",
                    self.from_method_id
                ),
            ));
        }
        Ok(())
    }

    /// The symmetric counter-movement: endpoints swapped, same id, date and
    /// note. `reverse().reverse()` restores the original endpoints.
    pub fn reverse(&self) -> Transfer {
        Transfer {
            from_method_id: self.to_method_id,
            to_method_id: self.from_method_id,
            ..self.clone()
        }
    }

    pub fn with_note(&self, note: Option<&str>) -> Transfer {
        Transfer {
            note: note.map(str::to_owned),
            ..self.clone()
        }
    }

    pub fn with_date(&self, date: NaiveDate) -> Transfer {
        Transfer { date, ..self.clone() }
    }

    pub fn involves_method(&self, method_id: i64) -> bool {
        self.from_method_id == method_id || self.to_method_id == method_id
    }
}
