use thiserror::Error;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("topic name must not be empty")]
    EmptyTopic,

    #[error("bus is closed for topic {0}")]
    Closed(String),
}
