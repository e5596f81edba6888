//! The ledger store contract seen by the balance mutator and the
//! transfer orchestrator.
//!
//! RULE: Every operation runs inside the caller's open unit of work.
//! An implementation never begins or commits a transaction of its own.

use crate::{
    error::LedgerResult,
    store::{Account, Entry, Transfer},
    transfer::TransferParams,
    types::{AccountId, Amount, TransferId},
};

pub trait LedgerTx {
    /// Point lookup. `AccountNotFound` if the id does not resolve.
    fn get_account(&self, account_id: AccountId) -> LedgerResult<Account>;

    /// Take the account's write lock and return the row as of that moment.
    /// `AccountNotFound` if the id does not resolve.
    fn lock_account(&self, account_id: AccountId) -> LedgerResult<Account>;

    fn create_transfer(&self, params: &TransferParams) -> LedgerResult<Transfer>;

    fn create_entry(
        &self,
        account_id: AccountId,
        transfer_id: Option<TransferId>,
        amount: Amount,
    ) -> LedgerResult<Entry>;

    /// Atomically add `delta` to the balance and return the updated row.
    /// Returns `None`, changing nothing, when the account does not exist or
    /// the result would be negative.
    fn add_account_balance(
        &self,
        account_id: AccountId,
        delta: Amount,
    ) -> LedgerResult<Option<Account>>;
}
