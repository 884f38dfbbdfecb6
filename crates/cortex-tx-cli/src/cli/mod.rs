//! CLI for the Cortex Bank transactions API.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use cortex_tx_core::api::TransactionType;
use cortex_tx_core::config;

use commands::{
    run_config, run_create, run_delete, run_get, run_login, run_logout, run_update, Session,
};

/// Top-level CLI for the transactions API.
#[derive(Debug, Parser)]
#[command(name = "cortex-tx")]
#[command(about = "cortex-tx: manage Cortex Bank account transactions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Optional fields shared by `create` and `update`.
#[derive(Debug, Clone, Default, Args)]
pub struct TxFields {
    /// Account the transaction belongs to (defaults to `account_id` in config).
    #[arg(long)]
    pub account_id: Option<String>,
    /// Amount.
    #[arg(long, allow_negative_numbers = true)]
    pub value: Option<f64>,
    /// debit or credit.
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: Option<TransactionType>,
    /// Counterparty the money comes from.
    #[arg(long)]
    pub from: Option<String>,
    /// Counterparty the money goes to.
    #[arg(long)]
    pub to: Option<String>,
    /// Attachment file name.
    #[arg(long)]
    pub anexo: Option<String>,
    /// Attachment URL.
    #[arg(long)]
    pub url_anexo: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Show one transaction.
    Get {
        /// Transaction identifier.
        id: String,
    },

    /// Create a transaction. Requires --value and --type.
    Create {
        #[command(flatten)]
        fields: TxFields,
    },

    /// Update a transaction. Fields not given keep their current value.
    Update {
        /// Transaction identifier.
        id: String,
        #[command(flatten)]
        fields: TxFields,
    },

    /// Delete a transaction.
    Delete {
        /// Transaction identifier.
        id: String,
    },

    /// Store the bearer token used for API calls.
    Login {
        /// Token issued by the authentication service.
        token: String,
    },

    /// Forget the stored token.
    Logout,

    /// Print the effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        cfg.apply_env();
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get { id } => run_get(&Session::open(&cfg)?, &id).await?,
            CliCommand::Create { fields } => {
                run_create(&Session::open(&cfg)?, &cfg, &fields).await?
            }
            CliCommand::Update { id, fields } => {
                run_update(&Session::open(&cfg)?, &id, &fields).await?
            }
            CliCommand::Delete { id } => run_delete(&Session::open(&cfg)?, &id).await?,
            CliCommand::Login { token } => run_login(&token)?,
            CliCommand::Logout => run_logout()?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
