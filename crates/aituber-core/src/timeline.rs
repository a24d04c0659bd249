//! Per-session utterance sequence and playback clock.
//!
//! Accumulation rule (`llm_tts_contracts_v0.2`): each utterance advances the
//! clock by its audio duration plus its suggested pause, so
//! `offset[i + 1] = offset[i] + audio_ms[i] + next_wait_ms[i]`.

use crate::records::format_utt_id;

/// Session id from a configured prefix and a suffix.
pub fn session_id(prefix: &str, suffix: &str) -> String {
    format!("{prefix}{suffix}")
}

/// Default session suffix: UTC start time plus the seed, so two runs with the
/// same seed still get distinct ids in a shared log.
pub fn default_session_suffix(seed: u64) -> String {
    format!("{}_s{seed}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
}

/// In-memory state for one session run. Owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct SessionTimeline {
    session_id: String,
    next_seq: u64,
    elapsed_ms: u64,
}

impl SessionTimeline {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            next_seq: 1,
            elapsed_ms: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current playback position, i.e. the offset the next utterance gets.
    pub fn offset_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Hand out the next utterance id (`utt_000001`, `utt_000002`, ...).
    pub fn next_utterance_id(&mut self) -> String {
        let id = format_utt_id(self.next_seq);
        self.next_seq += 1;
        id
    }

    /// Move the clock past one utterance and its trailing pause.
    /// Returns the offset before advancing.
    pub fn advance(&mut self, audio_ms: u64, pause_ms: u64) -> u64 {
        let start = self.elapsed_ms;
        self.elapsed_ms = start.saturating_add(audio_ms).saturating_add(pause_ms);
        start
    }
}
