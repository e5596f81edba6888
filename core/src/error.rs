use crate::types::{AccountId, Amount, Currency, EntryId, TransferId};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("account {account_id} not found")]
    AccountNotFound { account_id: AccountId },

    #[error("transfer {transfer_id} not found")]
    TransferNotFound { transfer_id: TransferId },

    #[error("entry {entry_id} not found")]
    EntryNotFound { entry_id: EntryId },

    #[error(
        "currency mismatch: account {from_account_id} is {from_currency}, \
         account {to_account_id} is {to_currency}"
    )]
    CurrencyMismatch {
        from_account_id: AccountId,
        from_currency: Currency,
        to_account_id: AccountId,
        to_currency: Currency,
    },

    #[error("account {account_id} has insufficient funds: balance {balance} < {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Amount,
        requested: Amount,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("owner '{owner}' already has a {currency} account")]
    DuplicateAccount { owner: String, currency: Currency },

    #[error("account {account_id} doesn't belong to '{caller}'")]
    Unauthorized { caller: String, account_id: AccountId },

    #[error("invalid page: page_id={page_id}, page_size={page_size}")]
    InvalidPage { page_id: u32, page_size: u32 },

    /// Lost a lock race against a concurrent unit of work. Safe to retry.
    #[error("transfer conflicted with a concurrent transaction")]
    SerializationConflict(#[source] rusqlite::Error),

    #[error("ledger storage unavailable")]
    StorageUnavailable(#[source] rusqlite::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Coarse outcome class used by the request layer to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Invalid,
    Forbidden,
    Conflict,
    Unavailable,
}

impl LedgerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::AccountNotFound { .. }
            | LedgerError::TransferNotFound { .. }
            | LedgerError::EntryNotFound { .. } => ErrorClass::NotFound,
            LedgerError::CurrencyMismatch { .. }
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::InvalidAmount(_)
            | LedgerError::InvalidPage { .. } => ErrorClass::Invalid,
            LedgerError::Unauthorized { .. } | LedgerError::DuplicateAccount { .. } => {
                ErrorClass::Forbidden
            }
            LedgerError::SerializationConflict(_) => ErrorClass::Conflict,
            LedgerError::StorageUnavailable(_) => ErrorClass::Unavailable,
        }
    }

    /// The caller's request was at fault (4xx), as opposed to the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self.class(),
            ErrorClass::Conflict | ErrorClass::Unavailable
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::SerializationConflict(_))
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                LedgerError::SerializationConflict(err)
            }
            _ => LedgerError::StorageUnavailable(err),
        }
    }
}

/// True when a storage error is a constraint violation (unique, check, FK).
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn busy_and_locked_are_retryable_conflicts() {
        let busy: LedgerError = sqlite_failure(ffi::SQLITE_BUSY).into();
        let locked: LedgerError = sqlite_failure(ffi::SQLITE_LOCKED).into();
        assert!(busy.is_retryable());
        assert!(locked.is_retryable());
        assert_eq!(busy.class(), ErrorClass::Conflict);
    }

    #[test]
    fn other_storage_errors_are_terminal() {
        let err: LedgerError = sqlite_failure(ffi::SQLITE_IOERR).into();
        assert!(!err.is_retryable());
        assert!(!err.is_client_error());
        assert_eq!(err.class(), ErrorClass::Unavailable);
    }

    #[test]
    fn display_does_not_leak_storage_details() {
        let err: LedgerError = rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_IOERR),
            Some("disk I/O error on /var/db/ledger.db".into()),
        )
        .into();
        assert_eq!(err.to_string(), "ledger storage unavailable");
    }

    #[test]
    fn validation_errors_are_client_errors() {
        let err = LedgerError::InsufficientFunds {
            account_id: 1,
            balance: 10,
            requested: 20,
        };
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }
}
