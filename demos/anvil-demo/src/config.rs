use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use vstate::LedgerConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub state_path: PathBuf,
    pub persist: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = LedgerConfig::default();

        let depth = match std::env::var("ANVIL_TREE_DEPTH") {
            Ok(v) => v.parse::<u8>().with_context(|| format!("ANVIL_TREE_DEPTH is not a depth: {v}"))?,
            Err(_) => defaults.depth,
        };
        let history_size = match std::env::var("ANVIL_HISTORY_SIZE") {
            Ok(v) => v
                .parse::<usize>()
                .with_context(|| format!("ANVIL_HISTORY_SIZE is not a count: {v}"))?,
            Err(_) => defaults.history_size,
        };
        let state_path = std::env::var("ANVIL_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("anvil_ledger.json"));
        let persist = std::env::var("ANVIL_PERSIST")
            .ok()
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
            .unwrap_or(false);

        let ledger = LedgerConfig { depth, history_size };
        if ledger.validate().is_err() {
            bail!("ANVIL_TREE_DEPTH must be between 1 and {}", vstate::MAX_DEPTH);
        }

        Ok(Self {
            ledger,
            state_path,
            persist,
        })
    }
}
