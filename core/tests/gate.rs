//! Validation gate and store read-side tests.
//!
//! Tests cover: ownership checks, early rejects, the in-transaction
//! balance check overruling a stale early read, retry accounting,
//! account opening rules, deposits, and paginated listings.

use ledger_core::{
    config::LedgerConfig,
    error::{ErrorClass, LedgerError},
    gate::{TransferGate, TransferRequest},
    retry::RetryPolicy,
    store::{Account, LedgerStore},
    transfer::{self, TransferParams},
    types::{Currency, Page},
};
use std::thread;
use std::time::Duration;

fn build() -> LedgerStore {
    let store = LedgerStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn funded(store: &mut LedgerStore, owner: &str, currency: Currency, balance: i64) -> Account {
    let account = store.create_account(owner, currency).expect("create account");
    if balance > 0 {
        store.deposit(account.id, balance).expect("deposit");
    }
    store.get_account(account.id).expect("read back")
}

fn request(caller: &str, from: &Account, to: &Account, amount: i64) -> TransferRequest {
    TransferRequest {
        caller: caller.to_string(),
        from_account_id: from.id,
        to_account_id: to.id,
        amount,
    }
}

#[test]
fn owner_can_transfer_and_stats_count_one_attempt() {
    let mut store = build();
    let a = funded(&mut store, "alice", Currency::Usd, 500);
    let b = funded(&mut store, "bob", Currency::Usd, 200);
    let mut gate = TransferGate::new(store, RetryPolicy::default());

    let result = gate.submit(&request("alice", &a, &b, 300)).unwrap();
    assert_eq!(result.from_account.balance, 200);
    assert_eq!(result.to_account.balance, 500);

    let stats = gate.stats();
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.committed, 1);
    assert_eq!(stats.attempts, 1);
    assert_eq!(stats.early_rejects, 0);
}

#[test]
fn non_owner_is_forbidden_and_nothing_is_written() {
    let mut store = build();
    let a = funded(&mut store, "alice", Currency::Usd, 500);
    let b = funded(&mut store, "bob", Currency::Usd, 200);
    let mut gate = TransferGate::new(store, RetryPolicy::default());

    let err = gate.submit(&request("bob", &a, &b, 100)).unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized { .. }));
    assert_eq!(err.class(), ErrorClass::Forbidden);
    assert_eq!(gate.stats().early_rejects, 1);
    assert_eq!(gate.stats().attempts, 0);
    assert_eq!(gate.store().transfer_count().unwrap(), 0);
}

#[test]
fn unfunded_request_is_rejected_before_any_attempt() {
    let mut store = build();
    let a = funded(&mut store, "alice", Currency::Usd, 50);
    let b = funded(&mut store, "bob", Currency::Usd, 0);
    let mut gate = TransferGate::new(store, RetryPolicy::default());

    let err = gate.submit(&request("alice", &a, &b, 51)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds { balance: 50, requested: 51, .. }
    ));
    assert_eq!(gate.stats().attempts, 0);
    assert_eq!(gate.store().get_account(a.id).unwrap().balance, 50);
}

#[test]
fn gate_rejects_currency_mismatch_and_bad_shapes() {
    let mut store = build();
    let a = funded(&mut store, "alice", Currency::Usd, 500);
    let c = funded(&mut store, "carol", Currency::Eur, 500);
    let mut gate = TransferGate::new(store, RetryPolicy::default());

    let err = gate.submit(&request("alice", &a, &c, 10)).unwrap_err();
    assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));

    let err = gate.submit(&request("alice", &a, &a, 10)).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let err = gate.submit(&request("alice", &a, &c, 0)).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    assert_eq!(gate.stats().early_rejects, 3);
    assert_eq!(gate.store().transfer_count().unwrap(), 0);
}

#[test]
fn reads_through_the_gate_check_ownership() {
    let mut store = build();
    let a = funded(&mut store, "alice", Currency::Usd, 500);
    let b = funded(&mut store, "bob", Currency::Usd, 0);
    let _c = funded(&mut store, "carol", Currency::Usd, 0);
    let mut gate = TransferGate::new(store, RetryPolicy::default());

    let transfer = gate.submit(&request("alice", &a, &b, 10)).unwrap().transfer;

    assert_eq!(gate.account_for("alice", a.id).unwrap().balance, 490);
    assert!(matches!(
        gate.account_for("carol", a.id),
        Err(LedgerError::Unauthorized { .. })
    ));

    assert_eq!(gate.transfer_for("alice", transfer.id).unwrap(), transfer);
    assert_eq!(gate.transfer_for("bob", transfer.id).unwrap(), transfer);
    assert!(matches!(
        gate.transfer_for("carol", transfer.id),
        Err(LedgerError::Unauthorized { .. })
    ));
}

#[test]
fn one_account_per_owner_and_currency() {
    let store = build();
    store.create_account("alice", Currency::Usd).unwrap();
    store.create_account("alice", Currency::Eur).unwrap();

    let err = store.create_account("alice", Currency::Usd).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::DuplicateAccount { ref owner, currency: Currency::Usd } if owner == "alice"
    ));
    assert_eq!(err.class(), ErrorClass::Forbidden);
}

#[test]
fn new_accounts_start_at_zero_and_deposits_write_entries() {
    let mut store = build();
    let a = store.create_account("alice", Currency::Usd).unwrap();
    assert_eq!(a.balance, 0);
    assert_eq!(a.currency, Currency::Usd);

    let (entry, account) = store.deposit(a.id, 250).unwrap();
    assert_eq!(entry.account_id, a.id);
    assert_eq!(entry.transfer_id, None);
    assert_eq!(entry.amount, 250);
    assert_eq!(account.balance, 250);
    assert_eq!(store.get_entry(entry.id).unwrap(), entry);

    assert!(matches!(
        store.deposit(a.id, 0),
        Err(LedgerError::InvalidAmount(_))
    ));
    assert!(matches!(
        store.deposit(999, 10),
        Err(LedgerError::AccountNotFound { account_id: 999 })
    ));
    assert!(matches!(
        store.get_entry(entry.id + 50),
        Err(LedgerError::EntryNotFound { .. })
    ));
}

#[test]
fn listings_are_paginated_and_scoped_to_owner() {
    let mut store = build();
    let a = funded(&mut store, "alice", Currency::Usd, 10_000);
    let b = funded(&mut store, "bob", Currency::Usd, 0);
    let _ae = funded(&mut store, "alice", Currency::Eur, 0);
    let c = funded(&mut store, "carol", Currency::Usd, 100);
    let mut gate = TransferGate::new(store, RetryPolicy::default());

    for amount in 1..=12 {
        gate.submit(&request("alice", &a, &b, amount)).unwrap();
    }
    gate.submit(&request("carol", &c, &b, 5)).unwrap();
    let store = gate.store();

    let accounts = store.list_accounts("alice", Page::new(1, 5).unwrap()).unwrap();
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|acc| acc.owner == "alice"));

    // alice: 1 deposit + 12 debits = 13 entries.
    let first = store.list_entries(a.id, Page::new(1, 10).unwrap()).unwrap();
    let second = store.list_entries(a.id, Page::new(2, 10).unwrap()).unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 3);
    assert!(first.last().unwrap().id < second[0].id);

    let alice_transfers = store.list_transfers("alice", Page::new(3, 5).unwrap()).unwrap();
    assert_eq!(alice_transfers.len(), 2);
    let bob_transfers = store.list_transfers("bob", Page::new(3, 5).unwrap()).unwrap();
    assert_eq!(bob_transfers.len(), 3, "bob is on the receiving side of all 13");
    let carol_transfers = store.list_transfers("carol", Page::new(1, 5).unwrap()).unwrap();
    assert_eq!(carol_transfers.len(), 1);

    assert!(matches!(
        Page::new(1, 20),
        Err(LedgerError::InvalidPage { page_id: 1, page_size: 20 })
    ));
}

/// The gate's early check sees the committed balance of 100 while another
/// connection holds an uncommitted unit of work draining it to 20. Once
/// that commits, the gate's own unit of work rejects the debit.
#[test]
fn stale_early_check_is_overruled_inside_the_unit_of_work() {
    let path = std::env::temp_dir()
        .join(format!("ledger-gate-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    let config = LedgerConfig::default_test();

    let mut writer = LedgerStore::open(&path, &config.store).unwrap();
    writer.migrate().unwrap();
    let a = funded(&mut writer, "alice", Currency::Usd, 100);
    let b = funded(&mut writer, "bob", Currency::Usd, 0);
    let c = funded(&mut writer, "carol", Currency::Usd, 0);
    let mut gate = TransferGate::new(
        writer.reopen().unwrap(),
        RetryPolicy::from_config(&config.retry),
    );
    let req = request("alice", &a, &b, 50);

    let outcome = thread::scope(|s| {
        let uow = writer.begin().unwrap();
        transfer::transfer(&uow, &TransferParams::new(a.id, c.id, 80)).unwrap();

        let gate = &mut gate;
        let req = &req;
        let submitted = s.spawn(move || gate.submit(req));
        // Precheck runs against the old snapshot; the gate then waits on
        // the write lock held here.
        thread::sleep(Duration::from_millis(300));
        uow.commit().unwrap();
        submitted.join().expect("gate thread panicked")
    });

    let err = outcome.unwrap_err();
    assert!(
        matches!(err, LedgerError::InsufficientFunds { balance: 20, requested: 50, .. }),
        "got {err:?}"
    );
    let stats = gate.stats();
    assert_eq!(stats.early_rejects, 0);
    assert_eq!(stats.attempts, 1);
    assert_eq!(stats.committed, 0);

    assert_eq!(writer.get_account(a.id).unwrap().balance, 20);
    assert_eq!(writer.get_account(b.id).unwrap().balance, 0);
    assert_eq!(writer.get_account(c.id).unwrap().balance, 80);
    assert_eq!(writer.transfer_count().unwrap(), 1);

    drop(gate);
    drop(writer);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path}{suffix}"));
    }
}
