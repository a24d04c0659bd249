//! Per-stage records and the persisted utterance log schema.
//!
//! - [`GenerationRecord`] (M1): what the text generator produced for one turn.
//! - [`SynthesisRecord`] (M2): what the synthesizer produced for that turn.
//! - [`UttLogEntry`]: M1 + M2 + timeline offset, one JSON line per turn.
//! - [`M3PrimeInput`]: the narrower projection handed to the pose-sync stage.

use serde::{Deserialize, Serialize};

use crate::error::{AituberError, Result};

/// Default playback step for the pose-sync stage (40 ms ≈ 25 fps).
pub const DEFAULT_STEP_MS: u32 = 40;

/// Free-form metadata attached by the generator.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// Zero-padded utterance id for a 1-based sequence number.
pub fn format_utt_id(seq: u64) -> String {
    format!("utt_{seq:06}")
}

/// Output of the text-generation stage for one turn (M1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub schema_version: String,
    pub session_id: String,
    pub utt_id: String,
    pub mode: String,
    pub text: String,
    pub emo_id: String,
    /// Filled in by the orchestrator from the style map, never by the generator.
    pub tts_style_prompt: Option<String>,
    /// Suggested pause before the next utterance.
    pub next_wait_ms: u64,
    #[serde(default)]
    pub meta: Meta,
}

/// Output of the audio-synthesis stage for one turn (M2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRecord {
    pub schema_version: String,
    pub session_id: String,
    pub utt_id: String,
    pub wav_path: String,
    pub audio_ms: u64,
    pub sample_rate: u32,
    pub num_channels: u16,
    pub fmt: String,
    pub tts_engine: String,
    pub tts_preset: Option<String>,
    /// Phonetic transcription; only present when a text→kana step exists.
    #[serde(default)]
    pub tts_kana: Option<String>,
}

/// One line of `utt_log.jsonl`.
///
/// Optional fields serialize as `null` so every line carries the full key set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UttLogEntry {
    pub schema_version: String,
    pub session_id: String,
    pub utt_id: String,
    pub mode: String,
    pub text: String,
    pub emo_id: String,
    pub tts_style_prompt: Option<String>,
    pub next_wait_ms: u64,
    #[serde(default)]
    pub meta: Meta,
    pub wav_path: String,
    pub audio_ms: u64,
    pub sample_rate: u32,
    pub num_channels: u16,
    pub fmt: String,
    pub tts_engine: String,
    pub tts_preset: Option<String>,
    pub tts_kana: Option<String>,
    /// Milliseconds from session start at which this utterance begins playback.
    pub utterance_offset_ms: u64,
}

impl UttLogEntry {
    /// Merge one turn's generation and synthesis output at the given offset.
    ///
    /// Both records must describe the same (session, utterance).
    pub fn merge(
        generation: GenerationRecord,
        synthesis: SynthesisRecord,
        utterance_offset_ms: u64,
    ) -> Result<Self> {
        if generation.session_id != synthesis.session_id || generation.utt_id != synthesis.utt_id {
            return Err(AituberError::Synthesis(format!(
                "synthesis record {}/{} does not match generation record {}/{}",
                synthesis.session_id, synthesis.utt_id, generation.session_id, generation.utt_id
            )));
        }

        Ok(Self {
            schema_version: generation.schema_version,
            session_id: generation.session_id,
            utt_id: generation.utt_id,
            mode: generation.mode,
            text: generation.text,
            emo_id: generation.emo_id,
            tts_style_prompt: generation.tts_style_prompt,
            next_wait_ms: generation.next_wait_ms,
            meta: generation.meta,
            wav_path: synthesis.wav_path,
            audio_ms: synthesis.audio_ms,
            sample_rate: synthesis.sample_rate,
            num_channels: synthesis.num_channels,
            fmt: synthesis.fmt,
            tts_engine: synthesis.tts_engine,
            tts_preset: synthesis.tts_preset,
            tts_kana: synthesis.tts_kana,
            utterance_offset_ms,
        })
    }

    /// Serialize as a single log line, including the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Input record for the pose-sync (M3') stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct M3PrimeInput {
    pub schema_version: String,
    pub session_id: String,
    pub utt_id: String,
    pub text: String,
    /// `null` means kana conversion is left to a separate step.
    pub kana: Option<String>,
    pub audio_ms: u64,
    pub step_ms: u32,
    /// `null` when the logged `emo_id` is empty, so an absent emotion is
    /// never passed downstream as the id `""`.
    pub emo_id: Option<String>,
    pub utterance_offset_ms: u64,
}

impl M3PrimeInput {
    /// Project a log entry into the pose-sync input schema.
    pub fn from_entry(entry: &UttLogEntry, step_ms: u32) -> Self {
        Self {
            schema_version: entry.schema_version.clone(),
            session_id: entry.session_id.clone(),
            utt_id: entry.utt_id.clone(),
            text: entry.text.clone(),
            kana: entry.tts_kana.clone(),
            audio_ms: entry.audio_ms,
            step_ms,
            emo_id: Some(entry.emo_id.clone()).filter(|e| !e.is_empty()),
            utterance_offset_ms: entry.utterance_offset_ms,
        }
    }
}
