//! Deterministic random workloads.
//!
//! Each worker gets its own stream seeded from
//! (master_seed XOR worker_index * golden-ratio constant), so a workload
//! is reproducible per worker regardless of thread scheduling.

use crate::types::{AccountId, Amount};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct WorkerRng {
    inner: Pcg64Mcg,
}

impl WorkerRng {
    /// The index must stay stable for a worker to replay the same stream.
    pub fn new(master_seed: u64, worker_index: u64) -> Self {
        let derived_seed = master_seed ^ (worker_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Two distinct entries of `ids`, in random order.
    pub fn pick_pair(&mut self, ids: &[AccountId]) -> (AccountId, AccountId) {
        assert!(ids.len() >= 2, "need at least two accounts");
        let len = ids.len() as u64;
        let a = self.next_u64_below(len) as usize;
        let offset = 1 + self.next_u64_below(len - 1) as usize;
        let b = (a + offset) % ids.len();
        (ids[a], ids[b])
    }

    /// An amount in [1, max].
    pub fn amount_up_to(&mut self, max: Amount) -> Amount {
        assert!(max > 0, "max must be > 0");
        1 + self.next_u64_below(max as u64) as Amount
    }
}
