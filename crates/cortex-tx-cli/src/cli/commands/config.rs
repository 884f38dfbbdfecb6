//! `cortex-tx config` – print the effective configuration.

use anyhow::Result;
use cortex_tx_core::config::{self, TxConfig};

pub fn run_config(cfg: &TxConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    println!("{}", serde_json::to_string_pretty(cfg)?);
    println!("effective base URL: {}", cfg.effective_base_url());
    if let Err(e) = cfg.validate() {
        println!("warning: {e:#}");
    }
    Ok(())
}
