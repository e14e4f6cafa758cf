//! Application-wide error types.

use thiserror::Error;

use crate::corpus::CorpusError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
