//! `cortex-tx delete <id>` – delete a transaction.

use super::Session;
use anyhow::Result;

pub async fn run_delete(session: &Session, id: &str) -> Result<()> {
    session.api.delete(id).await?;
    println!("Deleted transaction {id}");
    Ok(())
}
