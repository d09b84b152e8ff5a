use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::validate;

/// A named payment source or sink: a wallet, a bank account, a prepaid card.
///
/// Methods are immutable values; `rename`, `set_archived` and
/// `set_initial_balance` return a new `Method` instead of mutating. Setting
/// a field to its current value is a no-op that returns a copy, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub id: Option<i64>,
    pub name: String,
    pub initial_balance: Option<Decimal>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Method {
    pub const MAX_NAME_LEN: usize = 50;

    pub fn new(name: impl Into<String>, initial_balance: Option<Decimal>) -> Result<Self> {
        let name = name.into();
        validate::non_blank("name", &name, Self::MAX_NAME_LEN)?;
        Ok(Self {
            id: None,
            name,
            initial_balance,
            archived: false,
            created_at: Utc::now(),
        })
    }

    pub fn rename(&self, new_name: impl Into<String>) -> Result<Method> {
        let new_name = new_name.into();
        if new_name == self.name {
            return Ok(self.clone());
        }
        validate::non_blank("name", &new_name, Self::MAX_NAME_LEN)?;
        Ok(Method {
            name: new_name,
            ..self.clone()
        })
    }

    pub fn set_archived(&self, archived: bool) -> Method {
        if archived == self.archived {
            return self.clone();
        }
        Method {
            archived,
            ..self.clone()
        }
    }

    pub fn set_initial_balance(&self, initial_balance: Option<Decimal>) -> Method {
        if initial_balance == self.initial_balance {
            return self.clone();
        }
        Method {
            initial_balance,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate::non_blank("name", &self.name, Self::MAX_NAME_LEN)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
