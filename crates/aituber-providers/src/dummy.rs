//! Offline generator: canned lines, cycled emotion ids, seeded pauses.

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use aituber_core::config::Config;
use aituber_core::records::{GenerationRecord, Meta};

use crate::{LlmClient, TurnContext};

/// Emotion ids cycled through, one per turn.
pub const DEFAULT_EMO_IDS: [&str; 6] = ["1_0", "1_1", "2_1", "3_1", "7_1", "9_1"];

const DEFAULT_LINES: [&str; 5] = [
    "今日はいい天気だね！",
    "見て見て、このリボンかわいいでしょ？",
    "ちょっと緊張してきたかも……。",
    "ねむくなってきちゃった……。",
    "びっくりした！今のコメント面白いね！",
];

const MIN_WAIT_MS: u64 = 1000;
const MAX_WAIT_MS: u64 = 3000;

pub struct DummyLlmClient {
    schema_version: String,
    mode: String,
    emo_ids: Vec<String>,
    lines: Vec<String>,
}

impl DummyLlmClient {
    pub fn new(config: &Config) -> Self {
        Self {
            schema_version: config.schema_version.clone(),
            mode: config.llm.mode.clone(),
            emo_ids: DEFAULT_EMO_IDS.iter().map(|s| s.to_string()).collect(),
            lines: DEFAULT_LINES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Emotion id for a turn: a pure function of the turn index.
    pub fn emo_id_for(&self, turn_index: u64) -> &str {
        let idx = (turn_index % self.emo_ids.len() as u64) as usize;
        &self.emo_ids[idx]
    }
}

#[async_trait]
impl LlmClient for DummyLlmClient {
    async fn generate(&self, turn: TurnContext<'_>) -> anyhow::Result<GenerationRecord> {
        let TurnContext {
            session_id,
            utt_id,
            turn_index,
            rng,
        } = turn;

        let text = self.lines[rng.random_range(0..self.lines.len())].clone();
        let next_wait_ms = rng.random_range(MIN_WAIT_MS..=MAX_WAIT_MS);
        let emo_id = self.emo_id_for(turn_index).to_string();

        debug!(
            session_id,
            utt_id,
            emo_id = %emo_id,
            next_wait_ms,
            "Dummy generator produced utterance"
        );

        let mut meta = Meta::new();
        meta.insert("source".into(), serde_json::Value::from("dummy_llm"));

        Ok(GenerationRecord {
            schema_version: self.schema_version.clone(),
            session_id: session_id.to_string(),
            utt_id: utt_id.to_string(),
            mode: self.mode.clone(),
            text,
            emo_id,
            tts_style_prompt: None,
            next_wait_ms,
            meta,
        })
    }
}
