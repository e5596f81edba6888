use super::{
    account::{account_from_row, fetch_account, ACCOUNT_COLUMNS},
    entry::{entry_from_row, ENTRY_COLUMNS},
    transfer::{transfer_from_row, TRANSFER_COLUMNS},
    Account, Entry, Transfer,
};
use crate::{
    error::{LedgerError, LedgerResult},
    ledger::LedgerTx,
    transfer::TransferParams,
    types::{AccountId, Amount, TransferId},
};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Transaction};

/// One open SQLite transaction. Every `LedgerTx` call runs inside it.
///
/// Dropping a `UnitOfWork` without calling `commit` rolls it back, so an
/// early return, a `?` or an unwinding panic never leaves partial writes.
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> UnitOfWork<'conn> {
    pub(super) fn new(tx: Transaction<'conn>) -> Self {
        Self { tx }
    }

    pub fn commit(self) -> LedgerResult<()> {
        self.tx.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> LedgerResult<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

impl LedgerTx for UnitOfWork<'_> {
    fn get_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        fetch_account(&self.tx, account_id)?.ok_or(LedgerError::AccountNotFound { account_id })
    }

    fn lock_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        // A no-op write: takes the write lock on the row before anything
        // reads its balance for a decision.
        self.tx
            .query_row(
                &format!(
                    "UPDATE accounts SET balance = balance WHERE id = ?1
                     RETURNING {ACCOUNT_COLUMNS}"
                ),
                params![account_id],
                account_from_row,
            )
            .optional()?
            .ok_or(LedgerError::AccountNotFound { account_id })
    }

    fn create_transfer(&self, params: &TransferParams) -> LedgerResult<Transfer> {
        let transfer = self.tx.query_row(
            &format!(
                "INSERT INTO transfers (from_account_id, to_account_id, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING {TRANSFER_COLUMNS}"
            ),
            params![
                params.from_account_id,
                params.to_account_id,
                params.amount,
                Utc::now(),
            ],
            transfer_from_row,
        )?;
        Ok(transfer)
    }

    fn create_entry(
        &self,
        account_id: AccountId,
        transfer_id: Option<TransferId>,
        amount: Amount,
    ) -> LedgerResult<Entry> {
        let entry = self.tx.query_row(
            &format!(
                "INSERT INTO entries (account_id, transfer_id, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING {ENTRY_COLUMNS}"
            ),
            params![account_id, transfer_id, amount, Utc::now()],
            entry_from_row,
        )?;
        Ok(entry)
    }

    fn add_account_balance(
        &self,
        account_id: AccountId,
        delta: Amount,
    ) -> LedgerResult<Option<Account>> {
        let account = self
            .tx
            .query_row(
                &format!(
                    "UPDATE accounts SET balance = balance + ?2
                     WHERE id = ?1 AND balance + ?2 >= 0
                       AND (?2 <= 0 OR balance <= 9223372036854775807 - ?2)
                     RETURNING {ACCOUNT_COLUMNS}"
                ),
                params![account_id, delta],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }
}
