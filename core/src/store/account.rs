use super::{Account, Entry, LedgerStore};
use crate::{
    balance,
    error::{is_constraint_violation, LedgerError, LedgerResult},
    ledger::LedgerTx,
    types::{AccountId, Amount, Currency, Page},
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";

pub(super) fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        owner: row.get(1)?,
        balance: row.get(2)?,
        currency: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(super) fn fetch_account(conn: &Connection, account_id: AccountId) -> LedgerResult<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
            params![account_id],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

impl LedgerStore {
    // ── Account ───────────────────────────────────────────────────

    /// Open a zero-balance account. One account per (owner, currency).
    pub fn create_account(&self, owner: &str, currency: Currency) -> LedgerResult<Account> {
        let result = self.conn.query_row(
            &format!(
                "INSERT INTO accounts (owner, balance, currency, created_at)
                 VALUES (?1, 0, ?2, ?3)
                 RETURNING {ACCOUNT_COLUMNS}"
            ),
            params![owner, currency, Utc::now()],
            account_from_row,
        );
        match result {
            Ok(account) => {
                log::info!(
                    "store: opened {} account {} for '{}'",
                    account.currency,
                    account.id,
                    account.owner
                );
                Ok(account)
            }
            Err(e) if is_constraint_violation(&e) => Err(LedgerError::DuplicateAccount {
                owner: owner.to_string(),
                currency,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        fetch_account(&self.conn, account_id)?
            .ok_or(LedgerError::AccountNotFound { account_id })
    }

    pub fn list_accounts(&self, owner: &str, page: Page) -> LedgerResult<Vec<Account>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE owner = ?1
             ORDER BY id ASC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(params![owner, page.limit(), page.offset()], account_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every account, by id. Used for audits.
    pub fn all_accounts(&self) -> LedgerResult<Vec<Account>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id ASC"))?;
        let rows = stmt.query_map([], account_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Credit external funds: one standalone entry plus the balance change,
    /// in a single unit of work.
    pub fn deposit(&mut self, account_id: AccountId, amount: Amount) -> LedgerResult<(Entry, Account)> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "deposit must be positive, got {amount}"
            )));
        }
        let uow = self.begin()?;
        uow.lock_account(account_id)?;
        let entry = uow.create_entry(account_id, None, amount)?;
        let account = balance::adjust_balance(&uow, account_id, amount)?;
        uow.commit()?;
        log::debug!("store: deposited {amount} into account {account_id}");
        Ok((entry, account))
    }

    pub fn total_balance(&self, currency: Currency) -> LedgerResult<Amount> {
        let total: Amount = self.conn.query_row(
            "SELECT COALESCE(SUM(balance), 0) FROM accounts WHERE currency = ?1",
            params![currency],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn negative_balance_count(&self) -> LedgerResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE balance < 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
