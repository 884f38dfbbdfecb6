//! `cortex-tx update <id>` – change some fields of a transaction.

use super::{print_transaction, Session};
use crate::cli::TxFields;
use anyhow::Result;
use cortex_tx_core::api::{Transaction, TransactionRequest};

/// Current transaction with the given flags applied on top.
pub(crate) fn merge_fields(current: &Transaction, fields: &TxFields) -> TransactionRequest {
    let mut req = TransactionRequest::from(current);
    if let Some(account_id) = &fields.account_id {
        req.account_id = account_id.clone();
    }
    if let Some(value) = fields.value {
        req.value = value;
    }
    if let Some(kind) = fields.kind {
        req.kind = kind;
    }
    for (slot, given) in [
        (&mut req.from, &fields.from),
        (&mut req.to, &fields.to),
        (&mut req.anexo, &fields.anexo),
        (&mut req.url_anexo, &fields.url_anexo),
    ] {
        if given.is_some() {
            *slot = given.clone();
        }
    }
    req
}

pub async fn run_update(session: &Session, id: &str, fields: &TxFields) -> Result<()> {
    let current = session.api.get(id).await?;
    let req = merge_fields(&current, fields);
    let tx = session.api.update(id, &req).await?;
    print_transaction(&tx)
}
