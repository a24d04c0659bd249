//! Offline synthesizer: a sine tone whose length follows the duration model.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use aituber_core::config::Config;
use aituber_core::records::{GenerationRecord, SynthesisRecord};

use crate::{DurationModel, TtsClient};

pub const ENGINE_ID: &str = "dummy-tts";

const TONE_HZ: f64 = 440.0;
const AMPLITUDE: f64 = 8000.0;
const NUM_CHANNELS: u16 = 1;

pub struct DummyTtsClient {
    schema_version: String,
    sample_rate: u32,
    model: DurationModel,
}

impl DummyTtsClient {
    pub fn new(config: &Config) -> Self {
        Self {
            schema_version: config.schema_version.clone(),
            sample_rate: config.tts.sample_rate,
            model: DurationModel::from_config(&config.tts),
        }
    }
}

/// Write a mono 16-bit PCM sine tone of `duration_ms` to `path`.
fn write_sine_wav(path: &Path, duration_ms: u64, sample_rate: u32) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: NUM_CHANNELS,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let n_samples = u64::from(sample_rate) * duration_ms / 1000;

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for i in 0..n_samples {
        let t = i as f64 / f64::from(sample_rate);
        let value = (AMPLITUDE * (2.0 * PI * TONE_HZ * t).sin()) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;
    Ok(())
}

#[async_trait]
impl TtsClient for DummyTtsClient {
    async fn synthesize(
        &self,
        record: &GenerationRecord,
        audio_path: &Path,
    ) -> anyhow::Result<SynthesisRecord> {
        let audio_ms = self.model.estimate_ms(&record.text);

        if let Some(parent) = audio_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Render beside the target, then move into place.
        let tmp: PathBuf = audio_path.with_extension("wav.tmp");
        let sample_rate = self.sample_rate;
        let render_path = tmp.clone();
        tokio::task::spawn_blocking(move || write_sine_wav(&render_path, audio_ms, sample_rate))
            .await
            .context("wav writer task panicked")??;
        tokio::fs::rename(&tmp, audio_path).await?;

        debug!(
            utt_id = %record.utt_id,
            path = %audio_path.display(),
            audio_ms,
            "Dummy synthesizer wrote tone"
        );

        Ok(SynthesisRecord {
            schema_version: self.schema_version.clone(),
            session_id: record.session_id.clone(),
            utt_id: record.utt_id.clone(),
            wav_path: audio_path.display().to_string(),
            audio_ms,
            sample_rate: self.sample_rate,
            num_channels: NUM_CHANNELS,
            fmt: "wav".into(),
            tts_engine: ENGINE_ID.into(),
            tts_preset: record.tts_style_prompt.clone(),
            tts_kana: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aituber_core::records::Meta;

    fn record(text: &str, style: Option<&str>) -> GenerationRecord {
        GenerationRecord {
            schema_version: "llm_tts_contracts_v0.2".into(),
            session_id: "sess_t".into(),
            utt_id: "utt_000001".into(),
            mode: "monologue".into(),
            text: text.into(),
            emo_id: "1_0".into(),
            tts_style_prompt: style.map(str::to_string),
            next_wait_ms: 1000,
            meta: Meta::new(),
        }
    }

    fn config(sample_rate: u32) -> Config {
        let mut config = Config::default();
        config.tts.sample_rate = sample_rate;
        config
    }

    #[tokio::test]
    async fn test_writes_wav_of_estimated_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio").join("sess_t").join("utt_000001.wav");
        let client = DummyTtsClient::new(&config(8000));

        let out = client.synthesize(&record("abcd", None), &path).await.unwrap();
        assert_eq!(out.audio_ms, 960);
        assert_eq!(out.sample_rate, 8000);
        assert_eq!(out.num_channels, 1);
        assert_eq!(out.fmt, "wav");
        assert_eq!(out.tts_engine, "dummy-tts");
        assert_eq!(out.utt_id, "utt_000001");
        assert!(out.tts_kana.is_none());
        assert!(!path.with_extension("wav.tmp").exists());

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 8000 * 960 / 1000);
    }

    #[tokio::test]
    async fn test_style_prompt_becomes_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("utt.wav");
        let client = DummyTtsClient::new(&config(8000));

        let out = client
            .synthesize(&record("hi", Some("calm voice")), &path)
            .await
            .unwrap();
        assert_eq!(out.tts_preset.as_deref(), Some("calm voice"));
    }

    #[tokio::test]
    async fn test_same_text_same_duration() {
        let dir = tempfile::tempdir().unwrap();
        let client = DummyTtsClient::new(&config(8000));
        let a = client
            .synthesize(&record("同じ文", None), &dir.path().join("a.wav"))
            .await
            .unwrap();
        let b = client
            .synthesize(&record("同じ文", None), &dir.path().join("b.wav"))
            .await
            .unwrap();
        assert_eq!(a.audio_ms, b.audio_ms);
    }
}
