//! Balance mutator: the only code path that changes an account balance.
//!
//! RULE: A balance is never read, computed and written back in separate
//! steps. The store applies the delta and the non-negative guard in one
//! statement and hands back the updated row.

use crate::{
    error::{LedgerError, LedgerResult},
    ledger::LedgerTx,
    store::Account,
    types::{AccountId, Amount},
};

/// Apply `delta` (negative = debit, positive = credit) to one account inside
/// the caller's unit of work and return the post-update row.
///
/// Fails with `InsufficientFunds` when the balance would go below zero,
/// with `InvalidAmount` when a credit would overflow the balance, and with
/// `AccountNotFound` when the id does not resolve. No row is changed on
/// failure.
pub fn adjust_balance<L>(tx: &L, account_id: AccountId, delta: Amount) -> LedgerResult<Account>
where
    L: LedgerTx + ?Sized,
{
    if delta == 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "balance delta for account {account_id} must be non-zero"
        )));
    }

    if let Some(account) = tx.add_account_balance(account_id, delta)? {
        return Ok(account);
    }

    // Nothing matched: either the row is missing or the guard refused it.
    let current = tx.get_account(account_id)?;
    if delta > 0 && current.balance.checked_add(delta).is_none() {
        return Err(LedgerError::InvalidAmount(format!(
            "credit of {delta} overflows the balance of account {account_id}"
        )));
    }
    Err(LedgerError::InsufficientFunds {
        account_id,
        balance: current.balance,
        requested: delta.saturating_neg(),
    })
}
