//! `cortex-tx logout` – forget the stored token.

use anyhow::Result;
use cortex_tx_core::session::{CredentialsProvider, FileCredentials};

pub fn run_logout() -> Result<()> {
    let creds = FileCredentials::open_default()?;
    creds.clear();
    println!("Logged out");
    Ok(())
}
