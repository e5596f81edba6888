//! Atomic funds transfers over a SQLite ledger.
//!
//! Layers, leaves first: `store` (persistence and the `UnitOfWork`),
//! `balance` (the only balance mutator), `transfer` (one atomic attempt),
//! `retry` (bounded backoff at the call site) and `gate` (request checks).

pub mod balance;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod retry;
pub mod rng;
pub mod store;
pub mod transfer;
pub mod types;
