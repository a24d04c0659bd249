//! Session runtime loop: drives generation and synthesis one turn at a time.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use aituber_core::config::Config;
use aituber_core::emo_map::EmoStyleMap;
use aituber_core::error::{AituberError, Result};
use aituber_core::records::UttLogEntry;
use aituber_core::timeline::{self, SessionTimeline};
use aituber_core::utt_log::UttLog;
use aituber_providers::{DummyLlmClient, LlmClient, TurnContext};
use aituber_tts::{DummyTtsClient, TtsClient};

use crate::{RunOptions, RunSummary};

/// Drives session runs against one pair of backends and one utterance log.
///
/// Any backend or log failure aborts the run. Entries already appended stay;
/// the failing turn leaves nothing in the log.
pub struct Orchestrator {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tts: Arc<dyn TtsClient>,
    styles: EmoStyleMap,
    log: UttLog,
}

impl Orchestrator {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>, tts: Arc<dyn TtsClient>) -> Self {
        let log = UttLog::new(config.paths.utt_log_path());
        Self {
            config,
            llm,
            tts,
            styles: EmoStyleMap::default(),
            log,
        }
    }

    /// Offline backends plus the style map the config points at, if any.
    pub fn from_config(config: Config) -> Result<Self> {
        let styles = match config.emo_map_path() {
            Some(path) => EmoStyleMap::load(&path)?,
            None => EmoStyleMap::default(),
        };
        let llm = Arc::new(DummyLlmClient::new(&config));
        let tts = Arc::new(DummyTtsClient::new(&config));
        Ok(Self::new(config, llm, tts).with_styles(styles))
    }

    pub fn with_styles(mut self, styles: EmoStyleMap) -> Self {
        self.styles = styles;
        self
    }

    pub fn utt_log(&self) -> &UttLog {
        &self.log
    }

    /// Audio location for one utterance: `<audio_dir>/<session_id>/<utt_id>.wav`.
    pub fn audio_path(&self, session_id: &str, utt_id: &str) -> PathBuf {
        self.config
            .paths
            .audio_dir()
            .join(session_id)
            .join(format!("{utt_id}.wav"))
    }

    /// Run one session to completion, or stop at the first failing turn.
    pub async fn run_session(&self, options: &RunOptions) -> Result<RunSummary> {
        let start = Instant::now();
        let turns = options.turns.unwrap_or(self.config.llm.max_turns);
        let seed = self.config.session.seed;

        let suffix = options
            .session_suffix
            .clone()
            .unwrap_or_else(|| timeline::default_session_suffix(seed));
        let mut timeline =
            SessionTimeline::new(timeline::session_id(&self.config.session.id_prefix, &suffix));
        let mut rng = StdRng::seed_from_u64(seed);

        info!(
            session_id = timeline.session_id(),
            turns,
            seed,
            styles = self.styles.len(),
            utt_log = %self.log.path().display(),
            "Starting session"
        );

        for turn_index in 0..turns {
            let entry = self
                .run_turn(&mut timeline, &mut rng, u64::from(turn_index))
                .await?;
            info!(
                session_id = %entry.session_id,
                utt_id = %entry.utt_id,
                emo_id = %entry.emo_id,
                audio_ms = entry.audio_ms,
                offset_ms = entry.utterance_offset_ms,
                "Turn complete"
            );
        }

        let summary = RunSummary {
            session_id: timeline.session_id().to_string(),
            turns,
            timeline_ms: timeline.offset_ms(),
            utt_log: self.log.path().to_path_buf(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            session_id = %summary.session_id,
            turns = summary.turns,
            timeline_ms = summary.timeline_ms,
            "Session finished"
        );
        Ok(summary)
    }

    async fn run_turn(
        &self,
        timeline: &mut SessionTimeline,
        rng: &mut StdRng,
        turn_index: u64,
    ) -> Result<UttLogEntry> {
        let utt_id = timeline.next_utterance_id();
        debug!(session_id = timeline.session_id(), utt_id = %utt_id, turn_index, "Turn start");

        // 1. Generate
        let mut generation = self
            .llm
            .generate(TurnContext {
                session_id: timeline.session_id(),
                utt_id: &utt_id,
                turn_index,
                rng,
            })
            .await
            .map_err(|e| AituberError::Generation(format!("{utt_id}: {e:#}")))?;

        if generation.session_id != timeline.session_id() || generation.utt_id != utt_id {
            return Err(AituberError::Generation(format!(
                "generator returned {}/{}, expected {}/{utt_id}",
                generation.session_id,
                generation.utt_id,
                timeline.session_id()
            )));
        }

        // 2. Resolve the style hint
        if let Some(style) = self.styles.resolve(&generation.emo_id) {
            generation.tts_style_prompt = Some(style.to_string());
        }

        // 3. Synthesize
        let audio_path = self.audio_path(timeline.session_id(), &utt_id);
        let synthesis = self
            .tts
            .synthesize(&generation, &audio_path)
            .await
            .map_err(|e| AituberError::Synthesis(format!("{utt_id}: {e:#}")))?;

        // 4. Merge at the current offset
        let entry = UttLogEntry::merge(generation, synthesis, timeline.offset_ms())?;

        // 5. Append
        self.log.append(&entry).await?;

        // 6. Advance the clock
        timeline.advance(entry.audio_ms, entry.next_wait_ms);

        Ok(entry)
    }
}
