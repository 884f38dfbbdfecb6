//! Wire types of the transactions API.

use serde::{Deserialize, Serialize};

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Debit,
    Credit,
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debit" => Ok(TransactionType::Debit),
            "credit" => Ok(TransactionType::Credit),
            other => Err(format!("unknown transaction type {other:?} (expected debit or credit)")),
        }
    }
}

/// A transaction as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub account_id: String,
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Attachment file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anexo: Option<String>,
    /// Attachment URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_anexo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Body of create and update calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub account_id: String,
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anexo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_anexo: Option<String>,
}

impl TransactionRequest {
    pub fn new(account_id: impl Into<String>, value: f64, kind: TransactionType) -> Self {
        Self {
            account_id: account_id.into(),
            value,
            kind,
            from: None,
            to: None,
            anexo: None,
            url_anexo: None,
        }
    }
}

impl From<&Transaction> for TransactionRequest {
    fn from(tx: &Transaction) -> Self {
        Self {
            account_id: tx.account_id.clone(),
            value: tx.value,
            kind: tx.kind,
            from: tx.from.clone(),
            to: tx.to.clone(),
            anexo: tx.anexo.clone(),
            url_anexo: tx.url_anexo.clone(),
        }
    }
}

/// `{ message, result }` wrapper around every API payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub message: String,
    pub result: T,
}

/// The shapes `result` has been observed in for a single-transaction lookup.
///
/// `List` is the current contract. The other two are older backend shapes
/// still accepted for compatibility; anything else fails to decode.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransactionPayload {
    List(Vec<Transaction>),
    Nested { transactions: Vec<Transaction> },
    Single(Transaction),
}

impl TransactionPayload {
    /// First transaction carried by the payload, if any.
    pub fn into_first(self) -> Option<Transaction> {
        match self {
            TransactionPayload::List(items) => items.into_iter().next(),
            TransactionPayload::Nested { transactions } => {
                tracing::warn!("transaction lookup answered with legacy {{transactions: [...]}} shape");
                transactions.into_iter().next()
            }
            TransactionPayload::Single(tx) => {
                tracing::warn!("transaction lookup answered with legacy single-object shape");
                Some(tx)
            }
        }
    }
}
