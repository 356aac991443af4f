use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("SQLite error")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error")]
    Json(#[from] serde_json::Error),
    #[error("Failed to write CSV")]
    Csv(#[from] polars::error::PolarsError),
    #[error("Stored row {id} is invalid: {reason}")]
    InvalidRow { id: i64, reason: String },
    #[error("No results stored for run '{0}'")]
    RunNotFound(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> StoreError {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}
