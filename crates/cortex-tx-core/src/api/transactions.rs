//! CRUD calls for a single transaction.

use super::types::{Envelope, Transaction, TransactionPayload, TransactionRequest};
use crate::dispatcher::{Dispatcher, RequestOptions};
use crate::retry::{ErrorDescriptor, Sleeper, TokioSleeper};
use crate::transport::{CurlTransport, HttpResponse, Transport};
use serde::de::DeserializeOwned;
use serde::Serialize;

const TRANSACTION_PATH: &str = "/account/transaction";

/// Failure of a transactions API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request itself failed; the descriptor's message is user-facing.
    #[error("{0}")]
    Request(#[from] ErrorDescriptor),
    /// The request body could not be serialized.
    #[error("não foi possível montar a requisição: {0}")]
    Encode(#[source] serde_json::Error),
    /// The response body did not match any known shape.
    #[error("resposta inválida do servidor: {0}")]
    Decode(#[source] serde_json::Error),
    /// The lookup succeeded but carried no transaction.
    #[error("Transação não encontrada")]
    NotFound,
    /// The transaction id cannot be used in a path.
    #[error("identificador de transação inválido: {0:?}")]
    InvalidId(String),
}

impl ApiError {
    /// Whether offering a retry makes sense.
    pub fn retryable(&self) -> bool {
        match self {
            ApiError::Request(d) => d.retryable(),
            ApiError::Encode(_)
            | ApiError::Decode(_)
            | ApiError::NotFound
            | ApiError::InvalidId(_) => false,
        }
    }

    pub fn descriptor(&self) -> Option<&ErrorDescriptor> {
        match self {
            ApiError::Request(d) => Some(d),
            _ => None,
        }
    }
}

/// Get, create, update and delete transactions.
pub struct TransactionsApi<T = CurlTransport, S = TokioSleeper> {
    dispatcher: Dispatcher<T, S>,
}

impl<T: Transport, S: Sleeper> TransactionsApi<T, S> {
    pub fn new(dispatcher: Dispatcher<T, S>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher<T, S> {
        &self.dispatcher
    }

    /// Fetch one transaction by id.
    pub async fn get(&self, id: &str) -> Result<Transaction, ApiError> {
        let path = item_path(id)?;
        let resp = self.dispatcher.request(RequestOptions::get(path)).await?;
        let envelope: Envelope<TransactionPayload> = decode(&resp)?;
        envelope.result.into_first().ok_or(ApiError::NotFound)
    }

    pub async fn create(&self, req: &TransactionRequest) -> Result<Transaction, ApiError> {
        let opts = with_json(RequestOptions::post(TRANSACTION_PATH), req)?;
        let resp = self.dispatcher.request(opts).await?;
        let envelope: Envelope<Transaction> = decode(&resp)?;
        tracing::info!(id = ?envelope.result.id, "created transaction: {}", envelope.message);
        Ok(envelope.result)
    }

    pub async fn update(&self, id: &str, req: &TransactionRequest) -> Result<Transaction, ApiError> {
        let opts = with_json(RequestOptions::put(item_path(id)?), req)?;
        let resp = self.dispatcher.request(opts).await?;
        let envelope: Envelope<Transaction> = decode(&resp)?;
        tracing::info!(id, "updated transaction: {}", envelope.message);
        Ok(envelope.result)
    }

    /// Delete one transaction. The response body is ignored.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.dispatcher
            .request(RequestOptions::delete(item_path(id)?))
            .await?;
        tracing::info!(id, "deleted transaction");
        Ok(())
    }
}

fn item_path(id: &str) -> Result<String, ApiError> {
    let trimmed = id.trim();
    let usable = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !usable || trimmed == "." || trimmed == ".." {
        return Err(ApiError::InvalidId(id.to_string()));
    }
    Ok(format!("{TRANSACTION_PATH}/{trimmed}"))
}

fn with_json<B: Serialize + ?Sized>(opts: RequestOptions, body: &B) -> Result<RequestOptions, ApiError> {
    opts.json(body).map_err(ApiError::Encode)
}

fn decode<D: DeserializeOwned>(resp: &HttpResponse) -> Result<D, ApiError> {
    resp.json().map_err(ApiError::Decode)
}
