//! Transactions REST API on top of the dispatcher.

mod transactions;
mod types;

pub use transactions::{ApiError, TransactionsApi};
pub use types::{Envelope, Transaction, TransactionPayload, TransactionRequest, TransactionType};
