//! Text-to-speech backends.
//!
//! A backend implements [`TtsClient`]: render one generation record to an
//! audio file at a caller-chosen path and describe what it wrote.

use std::path::Path;

use async_trait::async_trait;

use aituber_core::config::TtsConfig;
use aituber_core::records::{GenerationRecord, SynthesisRecord};

pub mod dummy;

pub use dummy::DummyTtsClient;

/// A speech-synthesis backend.
#[async_trait]
pub trait TtsClient: Send + Sync {
    /// Synthesize `record.text` into `audio_path`.
    ///
    /// The style hint, if any, is `record.tts_style_prompt`. The returned
    /// record must carry the same session and utterance id.
    async fn synthesize(
        &self,
        record: &GenerationRecord,
        audio_path: &Path,
    ) -> anyhow::Result<SynthesisRecord>;
}

/// Linear text-length duration model.
///
/// `audio_ms = base_ms_min + base_ms_per_char * max(chars, 1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationModel {
    pub base_ms_min: u64,
    pub base_ms_per_char: u64,
}

impl DurationModel {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            base_ms_min: config.base_ms_min,
            base_ms_per_char: config.base_ms_per_char,
        }
    }

    /// Estimated duration in milliseconds. Characters are Unicode scalar
    /// values, not bytes.
    pub fn estimate_ms(&self, text: &str) -> u64 {
        let chars = text.chars().count().max(1) as u64;
        self.base_ms_min
            .saturating_add(self.base_ms_per_char.saturating_mul(chars))
    }
}
