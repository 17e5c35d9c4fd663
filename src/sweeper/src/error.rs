use std::path::PathBuf;

use crate::sweep::DatabaseReport;

/// Errors raised while finding or dropping orphaned temp schemas
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid connection string: {0}")]
    InvalidDsn(String),

    #[error("Failed to drop schema {schema} ({} dropped before failure): {source}", dropped.len())]
    Drop {
        schema: String,
        dropped: Vec<String>,
        #[source]
        source: Box<SweepError>,
    },

    #[error("Sweep of {database} failed after {} database(s) completed: {source}", reports.len())]
    Partial {
        database: String,
        /// Databases swept before the failure, with their confirmed drops
        reports: Vec<DatabaseReport>,
        #[source]
        source: Box<SweepError>,
    },

    #[error("Failed to write repair script {path}: {source}")]
    RepairScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for sweep operations
pub type SweepResult<T> = Result<T, SweepError>;
