//! Task dispatch and execution errors

use thiserror::Error;

use crate::domain::DomainError;

/// Enqueue failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("failed to serialize task payload: {0}")]
    SerializationError(String),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),
}

impl From<DispatchError> for DomainError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::SerializationError(_) => DomainError::internal(err.to_string()),
            DispatchError::BrokerUnavailable(_) => DomainError::broker(err.to_string()),
        }
    }
}

/// Handler failure, classified by whether redelivery can help
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("{0}")]
    Retryable(String),

    #[error("{0} (skip retry)")]
    Terminal(String),
}

impl TaskError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable(message.into())
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

impl From<DomainError> for TaskError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. } | DomainError::Validation { .. } => {
                TaskError::terminal(err.to_string())
            }
            _ => TaskError::retryable(err.to_string()),
        }
    }
}
