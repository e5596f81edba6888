//! ledger-runner: concurrent transfer workload against a ledger database.
//!
//! Usage:
//!   ledger-runner --seed 12345 --accounts 8 --workers 4 --transfers 250
//!   ledger-runner --db ledger.db --data-dir ./data --json
//!
//! Opens the accounts, funds them, runs random transfers from every worker
//! thread through the validation gate, then audits the ledger. Exits
//! non-zero if any invariant is broken.

use anyhow::{bail, Result};
use ledger_core::{
    config::LedgerConfig,
    error::LedgerError,
    gate::{GateStats, TransferGate, TransferRequest},
    retry::RetryPolicy,
    rng::WorkerRng,
    store::{Account, LedgerStore},
    types::Currency,
};
use std::env;
use std::path::Path;
use std::thread;
use std::time::Instant;

#[derive(Debug, Default, serde::Serialize)]
struct WorkerReport {
    worker: u64,
    stats: GateStats,
    insufficient_funds: u64,
    conflicts_exhausted: u64,
    failed: u64,
}

#[derive(serde::Serialize)]
struct RunSummary {
    db: String,
    seed: u64,
    accounts: usize,
    workers: u64,
    elapsed_ms: u128,
    committed: u64,
    attempts: u64,
    early_rejects: u64,
    insufficient_funds: u64,
    conflicts_exhausted: u64,
    failed: u64,
    total_before: i64,
    total_after: i64,
    negative_balances: i64,
    entry_mismatches: usize,
    reports: Vec<WorkerReport>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let account_count = parse_arg(&args, "--accounts", 8usize);
    let workers = parse_arg(&args, "--workers", 4u64);
    let transfers = parse_arg(&args, "--transfers", 250usize);
    let initial_balance = parse_arg(&args, "--initial-balance", 10_000i64);
    let json = args.iter().any(|a| a == "--json");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");

    if account_count < 2 {
        bail!("--accounts must be at least 2, got {account_count}");
    }
    if initial_balance <= 0 {
        bail!("--initial-balance must be positive, got {initial_balance}");
    }

    let config = if Path::new(&format!("{data_dir}/ledger.json")).exists() {
        LedgerConfig::load(data_dir)?
    } else {
        log::warn!("no {data_dir}/ledger.json, using default config");
        LedgerConfig::default()
    };

    let run_tag = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
    let (db, temporary) = match str_arg(&args, "--db") {
        Some(path) => (path.to_string(), false),
        None => {
            let path = env::temp_dir().join(format!("ledger-run-{run_tag}.db"));
            (path.to_string_lossy().into_owned(), true)
        }
    };

    if !json {
        println!("ledger-runner");
        println!("  seed:       {seed}");
        println!("  db:         {db}");
        println!("  accounts:   {account_count}");
        println!("  workers:    {workers}");
        println!("  transfers:  {transfers} per worker");
        println!();
    }

    let mut store = LedgerStore::open(&db, &config.store)?;
    store.migrate()?;

    let mut accounts = Vec::with_capacity(account_count);
    for i in 0..account_count {
        let account = store.create_account(&format!("{run_tag}-owner-{i}"), Currency::Usd)?;
        store.deposit(account.id, initial_balance)?;
        accounts.push(store.get_account(account.id)?);
    }
    let total_before = store.total_balance(Currency::Usd)?;
    log::info!("runner: opened {account_count} accounts, total {total_before}");

    let started = Instant::now();
    let reports = run_workload(&store, &config, &accounts, seed, workers, transfers)?;
    let elapsed_ms = started.elapsed().as_millis();

    let total_after = store.total_balance(Currency::Usd)?;
    let negative_balances = store.negative_balance_count()?;
    let mut entry_mismatches = 0;
    for account in store.all_accounts()? {
        let sum = store.entry_sum(account.id)?;
        if sum != account.balance {
            log::warn!(
                "runner: account {} balance {} != entry sum {sum}",
                account.id,
                account.balance
            );
            entry_mismatches += 1;
        }
    }

    let sum_of = |f: fn(&WorkerReport) -> u64| reports.iter().map(f).sum::<u64>();
    let committed = sum_of(|r| r.stats.committed);
    let attempts = sum_of(|r| r.stats.attempts);
    let early_rejects = sum_of(|r| r.stats.early_rejects);
    let insufficient_funds = sum_of(|r| r.insufficient_funds);
    let conflicts_exhausted = sum_of(|r| r.conflicts_exhausted);
    let failed = sum_of(|r| r.failed);
    let summary = RunSummary {
        db: db.clone(),
        seed,
        accounts: account_count,
        workers,
        elapsed_ms,
        committed,
        attempts,
        early_rejects,
        insufficient_funds,
        conflicts_exhausted,
        failed,
        total_before,
        total_after,
        negative_balances,
        entry_mismatches,
        reports,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    drop(store);
    if temporary {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{db}{suffix}"));
        }
    }

    if summary.total_before != summary.total_after {
        bail!(
            "conservation violated: {} before, {} after",
            summary.total_before,
            summary.total_after
        );
    }
    if summary.negative_balances > 0 {
        bail!("{} accounts have a negative balance", summary.negative_balances);
    }
    if summary.entry_mismatches > 0 {
        bail!("{} accounts disagree with their entries", summary.entry_mismatches);
    }
    Ok(())
}

fn run_workload(
    store: &LedgerStore,
    config: &LedgerConfig,
    accounts: &[Account],
    seed: u64,
    workers: u64,
    transfers: usize,
) -> Result<Vec<WorkerReport>> {
    let ids: Vec<_> = accounts.iter().map(|a| a.id).collect();
    let max_amount = (accounts[0].balance / 4).max(1);

    let mut gates = Vec::with_capacity(workers as usize);
    for _ in 0..workers {
        gates.push(TransferGate::new(
            store.reopen()?,
            RetryPolicy::from_config(&config.retry),
        ));
    }

    let reports = thread::scope(|s| {
        let handles: Vec<_> = gates
            .into_iter()
            .enumerate()
            .map(|(worker, mut gate)| {
                let ids = &ids;
                s.spawn(move || {
                    let worker = worker as u64;
                    let mut rng = WorkerRng::new(seed, worker);
                    let mut report = WorkerReport {
                        worker,
                        ..WorkerReport::default()
                    };
                    for _ in 0..transfers {
                        let (from, to) = rng.pick_pair(ids);
                        let caller = accounts
                            .iter()
                            .find(|a| a.id == from)
                            .map(|a| a.owner.clone())
                            .unwrap_or_default();
                        let request = TransferRequest {
                            caller,
                            from_account_id: from,
                            to_account_id: to,
                            amount: rng.amount_up_to(max_amount),
                        };
                        match gate.submit(&request) {
                            Ok(_) => {}
                            Err(LedgerError::InsufficientFunds { .. }) => {
                                report.insufficient_funds += 1;
                            }
                            Err(LedgerError::SerializationConflict(_)) => {
                                report.conflicts_exhausted += 1;
                            }
                            Err(e) => {
                                log::warn!("worker {worker}: {request:?} failed: {e}");
                                report.failed += 1;
                            }
                        }
                    }
                    report.stats = gate.stats().clone();
                    log::info!(
                        "worker {worker}: {} committed, {} attempts",
                        report.stats.committed,
                        report.stats.attempts
                    );
                    report
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow::anyhow!("worker thread panicked")))
            .collect::<Result<Vec<_>>>()
    })?;
    Ok(reports)
}

fn print_summary(summary: &RunSummary) {
    println!("=== RUN SUMMARY ===");
    println!("  elapsed:          {} ms", summary.elapsed_ms);
    println!("  committed:        {}", summary.committed);
    println!("  attempts:         {}", summary.attempts);
    println!("  early rejects:    {}", summary.early_rejects);
    println!("  insufficient:     {}", summary.insufficient_funds);
    println!("  conflicts (gave up): {}", summary.conflicts_exhausted);
    println!("  other failures:   {}", summary.failed);
    println!();
    println!("=== AUDIT ===");
    println!("  total before:     {}", summary.total_before);
    println!("  total after:      {}", summary.total_after);
    println!("  negative:         {}", summary.negative_balances);
    println!("  entry mismatches: {}", summary.entry_mismatches);
    for r in &summary.reports {
        println!(
            "  worker {:>2} | committed {:>5} | attempts {:>5} | rejected early {:>5}",
            r.worker, r.stats.committed, r.stats.attempts, r.stats.early_rejects
        );
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
