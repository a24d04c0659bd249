use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AituberError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("utt_log not found: {}", path.display())]
    LogNotFound { path: PathBuf },

    #[error("Invalid JSON at line {line}: {source}")]
    LogParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed utt_log entry at line {line}: {source}")]
    LogEntry {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Entry not found in utt_log: session_id={session_id}, utt_id={utt_id}")]
    EntryNotFound { session_id: String, utt_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AituberError>;
