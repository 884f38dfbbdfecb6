//! `cortex-tx create` – create a transaction from flags.

use super::{print_transaction, Session};
use crate::cli::TxFields;
use anyhow::{Context, Result};
use cortex_tx_core::api::TransactionRequest;
use cortex_tx_core::config::TxConfig;

/// Build the request body; the account falls back to the configured one.
pub(crate) fn request_from_fields(fields: &TxFields, cfg: &TxConfig) -> Result<TransactionRequest> {
    let account_id = fields
        .account_id
        .clone()
        .or_else(|| cfg.account_id.clone())
        .context("no account: pass --account-id or set account_id in config.toml")?;
    let value = fields.value.context("--value is required")?;
    let kind = fields.kind.context("--type is required (debit or credit)")?;

    let mut req = TransactionRequest::new(account_id, value, kind);
    req.from = fields.from.clone();
    req.to = fields.to.clone();
    req.anexo = fields.anexo.clone();
    req.url_anexo = fields.url_anexo.clone();
    Ok(req)
}

pub async fn run_create(session: &Session, cfg: &TxConfig, fields: &TxFields) -> Result<()> {
    let req = request_from_fields(fields, cfg)?;
    let tx = session.api.create(&req).await?;
    print_transaction(&tx)
}
