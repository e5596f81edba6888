//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The balance mutator and the transfer orchestrator go through
//! `LedgerTx` on an open `UnitOfWork`; they never execute SQL directly.

mod account;
mod entry;
mod transfer;
mod unit_of_work;

pub use unit_of_work::UnitOfWork;

use crate::{
    config::{BeginMode, StoreConfig},
    error::LedgerResult,
    types::{AccountId, Amount, Currency, EntryId, TransferId},
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A balance-holding account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: String,
    pub balance: Amount,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

/// One signed ledger line. `transfer_id` is `None` for deposits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub transfer_id: Option<TransferId>,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

pub struct LedgerStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
    config: StoreConfig,
}

impl LedgerStore {
    /// Open (or create) the ledger database at `path`. Accepts SQLite URIs.
    pub fn open(path: &str, config: &StoreConfig) -> LedgerResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        if config.wal {
            // Shared-memory and :memory: databases keep their own journal mode.
            if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
                log::warn!("store: could not enable WAL on {path}: {e}");
            }
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
            config: config.clone(),
        })
    }

    /// Open a private in-memory database (used in tests).
    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: None,
            config: StoreConfig::default(),
        })
    }

    /// Open another connection to the same database, for another worker.
    /// For in-memory databases this returns a new, isolated database.
    pub fn reopen(&self) -> LedgerResult<Self> {
        match &self.path {
            Some(p) => Self::open(p, &self.config),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LedgerResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_ledger.sql"))?;
        Ok(())
    }

    /// Start a unit of work. Dropping it without `commit` rolls back.
    pub fn begin(&mut self) -> LedgerResult<UnitOfWork<'_>> {
        let behavior = match self.config.begin {
            BeginMode::Immediate => TransactionBehavior::Immediate,
            BeginMode::Deferred => TransactionBehavior::Deferred,
        };
        let tx = self.conn.transaction_with_behavior(behavior)?;
        Ok(UnitOfWork::new(tx))
    }
}
