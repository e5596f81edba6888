//! Transfer orchestrator. Moves funds between two accounts as one
//! indivisible step inside a caller-provided unit of work.
//!
//! EXECUTION ORDER (fixed):
//!   1. Re-validate parameters (amount > 0, from != to).
//!   2. Lock both accounts in ascending id order, whatever the direction.
//!   3. Re-check currency match.
//!   4. Insert the transfer row.
//!   5. Insert the debit and credit entries.
//!   6. Apply both balance legs, again in ascending id order.
//!
//! RULES:
//!   - One call is one attempt. Retrying belongs to the caller.
//!   - Nothing is written before steps 1–3 pass.
//!   - Commit and rollback belong to whoever opened the unit of work.

use crate::{
    balance,
    error::{LedgerError, LedgerResult},
    ledger::LedgerTx,
    store::{Account, Entry, Transfer},
    types::{AccountId, Amount},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Amount,
}

impl TransferParams {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: Amount) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.amount <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "transfer amount must be positive, got {}",
                self.amount
            )));
        }
        if self.from_account_id == self.to_account_id {
            return Err(LedgerError::InvalidAmount(format!(
                "cannot transfer from account {} to itself",
                self.from_account_id
            )));
        }
        Ok(())
    }
}

/// Everything a committed transfer produced, with post-transfer balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

/// The global acquisition order for a pair of accounts: ascending id.
pub fn lock_order(a: AccountId, b: AccountId) -> (AccountId, AccountId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// One transfer attempt. The caller owns `tx` and decides commit/rollback;
/// on `Err` the caller must roll back.
pub fn transfer<L>(tx: &L, params: &TransferParams) -> LedgerResult<TransferResult>
where
    L: LedgerTx + ?Sized,
{
    params.validate()?;
    let TransferParams {
        from_account_id,
        to_account_id,
        amount,
    } = *params;

    let (first_id, second_id) = lock_order(from_account_id, to_account_id);
    let first = tx.lock_account(first_id)?;
    let second = tx.lock_account(second_id)?;
    let (from, to) = if first_id == from_account_id {
        (first, second)
    } else {
        (second, first)
    };

    if from.currency != to.currency {
        return Err(LedgerError::CurrencyMismatch {
            from_account_id,
            from_currency: from.currency,
            to_account_id,
            to_currency: to.currency,
        });
    }

    let transfer = tx.create_transfer(params)?;
    let from_entry = tx.create_entry(from_account_id, Some(transfer.id), -amount)?;
    let to_entry = tx.create_entry(to_account_id, Some(transfer.id), amount)?;

    let (from_account, to_account) = if from_account_id < to_account_id {
        let from_account = balance::adjust_balance(tx, from_account_id, -amount)?;
        let to_account = balance::adjust_balance(tx, to_account_id, amount)?;
        (from_account, to_account)
    } else {
        let to_account = balance::adjust_balance(tx, to_account_id, amount)?;
        let from_account = balance::adjust_balance(tx, from_account_id, -amount)?;
        (from_account, to_account)
    };

    Ok(TransferResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}
