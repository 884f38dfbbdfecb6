//! `cortex-tx get <id>` – show one transaction.

use super::{print_transaction, Session};
use anyhow::Result;

pub async fn run_get(session: &Session, id: &str) -> Result<()> {
    let tx = session.api.get(id).await?;
    print_transaction(&tx)
}
