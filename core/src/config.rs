use serde::{Deserialize, Serialize};

/// How a unit of work acquires its write lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeginMode {
    /// Take the database write lock at BEGIN.
    Immediate,
    /// Take it at the first write (the first `lock_account`).
    Deferred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long a connection waits on a held lock before reporting BUSY.
    pub busy_timeout_ms: u64,
    /// WAL journaling for file databases. Ignored for in-memory stores.
    pub wal: bool,
    pub begin: BeginMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            wal: true,
            begin: BeginMode::Immediate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction of the delay randomly added or removed, in [0, 1].
    pub jitter_pct: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 10,
            max_delay_ms: 200,
            jitter_pct: 0.25,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub store: StoreConfig,
    pub retry: RetryConfig,
}

impl LedgerConfig {
    /// Load from `<data_dir>/ledger.json`. Missing fields take their defaults.
    /// In tests, use LedgerConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/ledger.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: LedgerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    /// Config with hardcoded values for tests: generous busy timeout,
    /// many quick retries with no jitter.
    pub fn default_test() -> Self {
        Self {
            store: StoreConfig {
                busy_timeout_ms: 10_000,
                wal: true,
                begin: BeginMode::Immediate,
            },
            retry: RetryConfig {
                max_attempts: 20,
                base_delay_ms: 1,
                max_delay_ms: 20,
                jitter_pct: 0.0,
            },
        }
    }
}
