//! CLI command handlers, one file per command.

mod config;
mod create;
mod delete;
mod get;
mod login;
mod logout;
mod update;

pub use config::run_config;
pub use create::run_create;
pub use delete::run_delete;
pub use get::run_get;
pub use login::run_login;
pub use logout::run_logout;
pub use update::run_update;

use anyhow::Result;
use cortex_tx_core::api::{Transaction, TransactionsApi};
use cortex_tx_core::config::TxConfig;
use cortex_tx_core::dispatcher::Dispatcher;
use cortex_tx_core::session::{FileCredentials, LogNavigator, Navigator};
use std::sync::Arc;

/// Logs the redirect and tells the user to log in again.
struct LoginHint(LogNavigator);

impl Navigator for LoginHint {
    fn redirect(&self, location: &str) {
        self.0.redirect(location);
        eprintln!("Sessão expirada. Execute `cortex-tx login <token>` para entrar novamente.");
    }
}

/// API client wired to the stored token.
pub struct Session {
    pub api: TransactionsApi,
}

impl Session {
    pub fn open(cfg: &TxConfig) -> Result<Self> {
        cfg.validate()?;
        let credentials = Arc::new(FileCredentials::open_default()?);
        let navigator = Arc::new(LoginHint(LogNavigator));
        let dispatcher = Dispatcher::from_config(cfg, credentials, navigator);
        Ok(Self {
            api: TransactionsApi::new(dispatcher),
        })
    }
}

fn print_transaction(tx: &Transaction) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(tx)?);
    Ok(())
}
