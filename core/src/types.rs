//! Shared primitive types used across the ledger.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Row id of an account.
pub type AccountId = i64;

/// Row id of an entry.
pub type EntryId = i64;

/// Row id of a transfer.
pub type TransferId = i64;

/// A monetary amount in minor currency units (cents).
pub type Amount = i64;

/// Supported account currencies. Fixed at account creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(UnknownCurrency(other.to_string())),
        }
    }
}

impl ToSql for Currency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Currency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: UnknownCurrency| FromSqlError::Other(Box::new(e)))
    }
}

/// Offset pagination as bound by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page_id: u32,
    page_size: u32,
}

impl Page {
    pub const MIN_SIZE: u32 = 5;
    pub const MAX_SIZE: u32 = 10;

    /// `page_id` is 1-based; `page_size` must be within [MIN_SIZE, MAX_SIZE].
    pub fn new(page_id: u32, page_size: u32) -> crate::error::LedgerResult<Self> {
        if page_id == 0 || !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&page_size) {
            return Err(crate::error::LedgerError::InvalidPage { page_id, page_size });
        }
        Ok(Self { page_id, page_size })
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page_id as i64 - 1) * self.page_size as i64
    }
}
