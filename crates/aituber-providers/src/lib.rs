//! Utterance generation backends.
//!
//! Each backend implements the [`LlmClient`] trait: given the identity of the
//! next turn, produce one [`GenerationRecord`]. The orchestrator owns the
//! session clock and id sequence; backends only fill in content.

use async_trait::async_trait;
use rand::rngs::StdRng;

use aituber_core::records::GenerationRecord;

pub mod dummy;

pub use dummy::DummyLlmClient;

/// Identity and per-session state for one generation call.
pub struct TurnContext<'a> {
    pub session_id: &'a str,
    /// Pre-allocated utterance id; backends must copy it into the record.
    pub utt_id: &'a str,
    /// 0-based turn number within the session.
    pub turn_index: u64,
    /// Session-scoped RNG. Same seed, same sequence.
    pub rng: &'a mut StdRng,
}

/// A text-generation backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produce the generation record for one turn.
    ///
    /// `tts_style_prompt` is left unset; the orchestrator fills it in.
    async fn generate(&self, turn: TurnContext<'_>) -> anyhow::Result<GenerationRecord>;
}
