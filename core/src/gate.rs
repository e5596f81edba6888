//! Validation gate: the request-facing side of the engine.
//!
//! Checks request shape, ownership and currency from plain reads, rejects
//! obviously unfunded transfers early, then runs the orchestrator through
//! the retry policy. The early balance check reads a possibly stale
//! balance; the balance mutator's atomic check inside the unit of work is
//! the one that counts.

use crate::{
    error::{LedgerError, LedgerResult},
    retry::RetryPolicy,
    store::{Account, LedgerStore, Transfer},
    transfer::{TransferParams, TransferResult},
    types::{AccountId, Amount, TransferId},
};
use serde::{Deserialize, Serialize};

/// A transfer request from an already-authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub caller: String,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Amount,
}

impl TransferRequest {
    pub fn params(&self) -> TransferParams {
        TransferParams::new(self.from_account_id, self.to_account_id, self.amount)
    }
}

/// Running counters for one gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub submitted: u64,
    pub committed: u64,
    /// Requests turned away before any unit of work was opened.
    pub early_rejects: u64,
    /// Orchestrator attempts, including retries.
    pub attempts: u64,
}

pub struct TransferGate {
    store: LedgerStore,
    retry: RetryPolicy,
    stats: GateStats,
}

impl TransferGate {
    pub fn new(store: LedgerStore, retry: RetryPolicy) -> Self {
        Self {
            store,
            retry,
            stats: GateStats::default(),
        }
    }

    pub fn submit(&mut self, request: &TransferRequest) -> LedgerResult<TransferResult> {
        self.stats.submitted += 1;
        let params = request.params();
        if let Err(err) = self.precheck(request, &params) {
            self.stats.early_rejects += 1;
            return Err(err);
        }

        let store = &mut self.store;
        let stats = &mut self.stats;
        let result = self.retry.run(|_attempt| {
            stats.attempts += 1;
            store.execute_transfer(&params)
        })?;
        self.stats.committed += 1;
        Ok(result)
    }

    fn precheck(&self, request: &TransferRequest, params: &TransferParams) -> LedgerResult<()> {
        params.validate()?;

        let from = self.store.get_account(params.from_account_id)?;
        if from.owner != request.caller {
            return Err(LedgerError::Unauthorized {
                caller: request.caller.clone(),
                account_id: from.id,
            });
        }
        if from.balance < params.amount {
            return Err(LedgerError::InsufficientFunds {
                account_id: from.id,
                balance: from.balance,
                requested: params.amount,
            });
        }

        let to = self.store.get_account(params.to_account_id)?;
        if from.currency != to.currency {
            return Err(LedgerError::CurrencyMismatch {
                from_account_id: from.id,
                from_currency: from.currency,
                to_account_id: to.id,
                to_currency: to.currency,
            });
        }
        Ok(())
    }

    /// Read an account the caller owns.
    pub fn account_for(&self, caller: &str, account_id: AccountId) -> LedgerResult<Account> {
        let account = self.store.get_account(account_id)?;
        if account.owner != caller {
            return Err(LedgerError::Unauthorized {
                caller: caller.to_string(),
                account_id,
            });
        }
        Ok(account)
    }

    /// Read a transfer the caller is a party to, on either side.
    pub fn transfer_for(&self, caller: &str, transfer_id: TransferId) -> LedgerResult<Transfer> {
        let transfer = self.store.get_transfer(transfer_id)?;
        let from = self.store.get_account(transfer.from_account_id)?;
        if from.owner == caller {
            return Ok(transfer);
        }
        let to = self.store.get_account(transfer.to_account_id)?;
        if to.owner == caller {
            return Ok(transfer);
        }
        Err(LedgerError::Unauthorized {
            caller: caller.to_string(),
            account_id: transfer.from_account_id,
        })
    }

    pub fn stats(&self) -> &GateStats {
        &self.stats
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }
}
