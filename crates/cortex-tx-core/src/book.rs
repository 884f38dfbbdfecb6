//! In-memory list of transactions kept in step with the API.
//!
//! Mutations go through the API first, except `delete`, which removes the
//! entry optimistically and puts it back where it was if the call fails.

use crate::api::{ApiError, Transaction, TransactionRequest, TransactionsApi};
use crate::retry::{classify_error, ErrorDescriptor, Sleeper};
use crate::transport::Transport;

/// Ordered list of transactions, newest first.
#[derive(Debug, Clone, Default)]
pub struct TransactionBook {
    items: Vec<Transaction>,
    last_error: Option<ErrorDescriptor>,
}

impl TransactionBook {
    pub fn new(items: Vec<Transaction>) -> Self {
        Self {
            items,
            last_error: None,
        }
    }

    pub fn items(&self) -> &[Transaction] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Transaction> {
        self.items.iter().find(|tx| tx.id.as_deref() == Some(id))
    }

    /// Error from the last failed API call, for display.
    pub fn last_error(&self) -> Option<&ErrorDescriptor> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Put `tx` at the front.
    pub fn insert(&mut self, tx: Transaction) {
        self.items.insert(0, tx);
    }

    /// Replace the entry with `id`. Returns false if there is none.
    pub fn replace(&mut self, id: &str, tx: Transaction) -> bool {
        match self.position(id) {
            Some(i) => {
                self.items[i] = tx;
                true
            }
            None => false,
        }
    }

    /// Drop the entry with `id`, returning it.
    pub fn remove(&mut self, id: &str) -> Option<Transaction> {
        self.position(id).map(|i| self.items.remove(i))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|tx| tx.id.as_deref() == Some(id))
    }

    fn record<V>(&mut self, result: Result<V, ApiError>) -> Result<V, ApiError> {
        if let Err(e) = &result {
            self.last_error = Some(match e {
                ApiError::Request(d) => d.clone(),
                other => classify_error(other),
            });
        }
        result
    }

    pub async fn create<T: Transport, S: Sleeper>(
        &mut self,
        api: &TransactionsApi<T, S>,
        req: &TransactionRequest,
    ) -> Result<Transaction, ApiError> {
        self.clear_error();
        let result = api.create(req).await;
        if let Ok(tx) = &result {
            self.insert(tx.clone());
        }
        self.record(result)
    }

    pub async fn update<T: Transport, S: Sleeper>(
        &mut self,
        api: &TransactionsApi<T, S>,
        id: &str,
        req: &TransactionRequest,
    ) -> Result<Transaction, ApiError> {
        self.clear_error();
        let result = api.update(id, req).await;
        if let Ok(tx) = &result {
            self.replace(id, tx.clone());
        }
        self.record(result)
    }

    pub async fn delete<T: Transport, S: Sleeper>(
        &mut self,
        api: &TransactionsApi<T, S>,
        id: &str,
    ) -> Result<(), ApiError> {
        self.clear_error();
        let removed = self.position(id).map(|i| (i, self.items.remove(i)));
        let result = api.delete(id).await;
        if result.is_err() {
            if let Some((i, tx)) = removed {
                tracing::debug!(id, "delete failed; restoring transaction");
                self.items.insert(i.min(self.items.len()), tx);
            }
        }
        self.record(result)
    }
}
