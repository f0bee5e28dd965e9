use miette::Diagnostic;
use thiserror::Error;

use crate::core::Provider;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{provider} API error: {message}")]
    Provider { provider: Provider, message: String },

    #[error("Missing API key for {0}. Set {env} or pass --api-key", env = .0.key_vars().join(" or "))]
    MissingApiKey(Provider),

    #[error("Model reply did not contain a SQL statement")]
    EmptyResponse,

    #[error("Query validation failed: {}", .errors.join("; "))]
    Rejected { errors: Vec<String> },

    #[error("Table '{0}' not found")]
    UnknownTable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Server(String),
}
