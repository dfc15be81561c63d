use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, H2hError>;

#[derive(Debug, Error)]
pub enum H2hError {
    /// No stored table for the team in this league. Aborts the whole analysis.
    #[error("team data not found: league '{league}', team '{team}'")]
    TeamNotFound { league: String, team: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid league metadata {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl H2hError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TeamNotFound { .. })
    }
}
