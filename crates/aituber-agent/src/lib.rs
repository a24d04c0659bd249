//! Turn pipeline orchestrator.
//!
//! Runs one session as a strictly sequential series of turns. Each turn
//! generates an utterance, resolves its style hint, synthesizes audio,
//! appends one merged entry to the utterance log, then advances the
//! session clock.

use std::path::PathBuf;

pub mod runtime;

pub use runtime::Orchestrator;

/// Caller overrides for one session run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Number of turns; defaults to `llm.max_turns`.
    pub turns: Option<u32>,
    /// Session id suffix appended to `session.id_prefix`; defaults to a
    /// timestamp plus the seed.
    pub session_suffix: Option<String>,
}

/// Result of a completed session run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub session_id: String,
    pub turns: u32,
    /// Session clock after the last turn (audio plus pauses).
    pub timeline_ms: u64,
    pub utt_log: PathBuf,
    pub duration_ms: u64,
}
