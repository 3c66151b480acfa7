use thiserror::Error;

use crate::helpers::amounts::AmountError;

/// Errors raised by the session façade, the token registry and config loading.
///
/// Collaborator failures never show up here: the components below the façade
/// turn them into state flags instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WalletError {
    #[error("no wallet is connected")]
    NotConnected,
    #[error("unknown token: {0}")]
    UnknownToken(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
    #[error("invalid recipient address: {0:?}")]
    InvalidRecipient(String),
    #[error("invalid token table: {0}")]
    InvalidTokenTable(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Quote(#[from] QuoteError),
}

/// Why a swap quote could not be obtained or used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("swap service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("no route found: {0}")]
    NoRoute(String),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("quote is stale: {0}")]
    Stale(String),
}

pub type WalletResult<T> = Result<T, WalletError>;
