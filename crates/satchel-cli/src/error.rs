use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] satchel_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid field assignment '{0}', expected KEY=VALUE")]
    InvalidField(String),
    #[error("No fields provided; repeat --field KEY=VALUE for each value")]
    EmptyForm,
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("Email cannot be empty")]
    EmptyEmail,
    #[error("Confirmation required; pass --yes to delete without a prompt")]
    ConfirmationRequired,
    #[error("API base URL is not configured. Run `satchel login <email> --api-url <URL>` first.")]
    ApiNotConfigured,
}
