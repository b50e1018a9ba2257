use std::fmt;

use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Calamine(#[from] calamine::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error("provider request failed for {scope}: {message}")]
    Provider { scope: String, message: String },
    #[error("sink write failed: {0}")]
    SinkWrite(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("operation cancelled by shutdown")]
    Cancelled,
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    pub fn provider<S: fmt::Display, T: Into<String>>(scope: S, message: T) -> Self {
        AppError::Provider {
            scope: scope.to_string(),
            message: message.into(),
        }
    }

    pub fn sink_write<T: Into<String>>(msg: T) -> Self {
        AppError::SinkWrite(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        AppError::Config(msg.into())
    }
}
