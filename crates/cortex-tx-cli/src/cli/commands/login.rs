//! `cortex-tx login <token>` – store the bearer token.

use anyhow::{bail, Result};
use cortex_tx_core::session::FileCredentials;

pub fn run_login(token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("token must not be empty");
    }
    let creds = FileCredentials::open_default()?;
    creds.store(token)?;
    println!("Token stored at {}", creds.path().display());
    Ok(())
}
