use thiserror::Error;

/// Stable machine-readable codes for business rule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MethodArchived,
    MethodInUse,
    DuplicateEntry,
    InvalidDateRange,
    DebtAlreadyRepaid,
    ExcessRepaymentAmount,
    IdenticalAccounts,
    InsufficientFunds,
    InvalidValueRange,
    InvalidValueCombination,
    InvalidInput,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MethodArchived => "METHOD_ARCHIVED",
            Self::MethodInUse => "METHOD_IN_USE",
            Self::DuplicateEntry => "DUPLICATE_ENTRY",
            Self::InvalidDateRange => "INVALID_DATE_RANGE",
            Self::DebtAlreadyRepaid => "DEBT_ALREADY_REPAID",
            Self::ExcessRepaymentAmount => "EXCESS_REPAYMENT_AMOUNT",
            Self::IdenticalAccounts => "IDENTICAL_ACCOUNTS",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::InvalidValueRange => "INVALID_VALUE_RANGE",
            Self::InvalidValueCombination => "INVALID_VALUE_COMBINATION",
            Self::InvalidInput => "INVALID_INPUT",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every failure the ledger can produce, in four kinds.
///
/// `Validation` covers structural input problems and is reported per field.
/// `BusinessRule` covers domain-rule violations on structurally valid input
/// and always carries an [`ErrorCode`]. `NotFound` covers dangling id
/// references. `System` wraps storage failures; the original cause is kept
/// for logging and never interpreted by the domain.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{code}: {message}")]
    BusinessRule { code: ErrorCode, message: String },

    #[error("{entity} not found: id {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("storage error")]
    System(#[source] anyhow::Error),
}

impl LedgerError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn rule(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::BusinessRule {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// The business rule code, when this is a `BusinessRule` error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::BusinessRule { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
