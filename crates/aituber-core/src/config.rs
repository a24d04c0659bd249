//! Configuration loading, defaults, and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AituberError, Result};

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "configs/default.yaml";

/// Style map looked up beside the config file when none is configured.
pub const SIBLING_EMO_MAP_FILE: &str = "emo_tts_map.yaml";

/// Top-level pipeline configuration.
///
/// Every section has defaults, so an empty or missing file resolves to a
/// runnable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub tts: TtsConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub session: SessionConfig,

    /// Explicit emotion → style map. Falls back to `emo_tts_map.yaml`
    /// beside the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emo_map_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// File this config was loaded from (not serialized).
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            llm: LlmConfig::default(),
            tts: TtsConfig::default(),
            paths: PathsConfig::default(),
            session: SessionConfig::default(),
            emo_map_path: None,
            logging: None,
            config_path: None,
        }
    }
}

fn default_schema_version() -> String {
    "llm_tts_contracts_v0.2".into()
}

/// Text-generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Number of turns per session run.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Generation mode label copied into every record (e.g. "monologue").
    #[serde(default = "default_mode")]
    pub mode: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            mode: default_mode(),
        }
    }
}

fn default_max_turns() -> u32 {
    5
}

fn default_mode() -> String {
    "monologue".into()
}

/// Audio-synthesis settings, including the duration model coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Milliseconds added per character of text.
    #[serde(default = "default_base_ms_per_char")]
    pub base_ms_per_char: u64,

    /// Floor added to every utterance, in milliseconds.
    #[serde(default = "default_base_ms_min")]
    pub base_ms_min: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            base_ms_per_char: default_base_ms_per_char(),
            base_ms_min: default_base_ms_min(),
        }
    }
}

fn default_sample_rate() -> u32 {
    24_000
}

fn default_base_ms_per_char() -> u64 {
    90
}

fn default_base_ms_min() -> u64 {
    600
}

/// Output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_out_root")]
    pub out_root: String,

    #[serde(default = "default_audio_subdir")]
    pub audio_subdir: String,

    #[serde(default = "default_utt_log_filename")]
    pub utt_log_filename: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            out_root: default_out_root(),
            audio_subdir: default_audio_subdir(),
            utt_log_filename: default_utt_log_filename(),
        }
    }
}

fn default_out_root() -> String {
    "out".into()
}

fn default_audio_subdir() -> String {
    "audio".into()
}

fn default_utt_log_filename() -> String {
    "utt_log.jsonl".into()
}

impl PathsConfig {
    /// Output root with `~` expanded.
    pub fn out_root(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.out_root);
        PathBuf::from(expanded.as_ref())
    }

    /// Directory holding synthesized audio.
    pub fn audio_dir(&self) -> PathBuf {
        self.out_root().join(&self.audio_subdir)
    }

    /// The utterance log shared by every session run against this root.
    pub fn utt_log_path(&self) -> PathBuf {
        self.out_root().join(&self.utt_log_filename)
    }
}

/// Session identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// Seed for the session-scoped RNG handed to the generator.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_id_prefix(),
            seed: default_seed(),
        }
    }
}

fn default_id_prefix() -> String {
    "sess_".into()
}

fn default_seed() -> u64 {
    12345
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "aituber_agent=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .into_owned()
}

impl Config {
    /// Load config from a YAML file, substituting `${ENV_VAR}` references.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                config_path: Some(path.to_path_buf()),
                ..Self::default()
            });
        }

        let raw = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&raw);

        // An empty document parses as null; treat it like an empty mapping.
        let mut config: Config = if substituted.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&substituted)
                .map_err(|e| AituberError::Config(format!("{}: {e}", path.display())))?
        };
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load the config the user asked for.
    ///
    /// An explicit path must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
    /// used and may be absent.
    pub fn open(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(AituberError::Config(format!(
                "config file not found: {}",
                path.display()
            ))),
            Some(path) => Self::load(path),
            None => Self::load(Path::new(DEFAULT_CONFIG_PATH)),
        }
    }

    /// Load, then reject the config if validation reports errors.
    pub fn load_validated(path: &Path) -> Result<Self> {
        Self::load(path)?.validated()
    }

    /// Reject the config if validation reports errors. Warnings are logged.
    pub fn validated(self) -> Result<Self> {
        let (warnings, errors) = self.validate();
        let origin = self
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<defaults>".into());
        for w in &warnings {
            warn!(config = %origin, "{w}");
        }
        if !errors.is_empty() {
            return Err(AituberError::Config(errors.join("; ")));
        }
        Ok(self)
    }

    /// File the config was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Resolve the emotion → style map location.
    ///
    /// An explicit `emo_map_path` wins (relative paths resolve against the
    /// config directory); otherwise `emo_tts_map.yaml` beside the config file
    /// is used when it exists.
    pub fn emo_map_path(&self) -> Option<PathBuf> {
        let config_dir = self.config_path.as_deref().and_then(Path::parent);

        if let Some(explicit) = &self.emo_map_path {
            let expanded = shellexpand::tilde(explicit);
            let p = PathBuf::from(expanded.as_ref());
            return Some(match config_dir {
                Some(dir) if p.is_relative() => dir.join(p),
                _ => p,
            });
        }

        let sibling = config_dir?.join(SIBLING_EMO_MAP_FILE);
        sibling.exists().then_some(sibling)
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if self.schema_version.trim().is_empty() {
            errors.push("schema_version cannot be empty".to_string());
        }

        if self.llm.max_turns == 0 {
            warnings.push("llm.max_turns is 0; a run will produce no utterances".to_string());
        }

        if self.tts.sample_rate == 0 {
            errors.push("tts.sample_rate cannot be 0".to_string());
        }

        if self.tts.base_ms_per_char == 0 {
            warnings.push(
                "tts.base_ms_per_char is 0; every utterance gets the same duration".to_string(),
            );
        }

        if self.paths.utt_log_filename.trim().is_empty() {
            errors.push("paths.utt_log_filename cannot be empty".to_string());
        }

        if self.paths.audio_subdir.trim().is_empty() {
            errors.push("paths.audio_subdir cannot be empty".to_string());
        }

        if self.session.id_prefix.trim().is_empty() {
            errors.push("session.id_prefix cannot be empty".to_string());
        }

        if self.emo_map_path.is_some() {
            if let Some(path) = self.emo_map_path() {
                if !path.exists() {
                    errors.push(format!("emo map file not found: {}", path.display()));
                }
            }
        }

        (warnings, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only, single-threaded test runner
        unsafe { std::env::set_var("TEST_AITUBER_OUT", "/tmp/aituber-out") };
        let input = "paths:\n  out_root: \"${TEST_AITUBER_OUT}\"\n  audio_subdir: wav";
        let result = substitute_env_vars(input);
        assert!(result.contains("/tmp/aituber-out"));
        assert!(result.contains("wav"));
        unsafe { std::env::remove_var("TEST_AITUBER_OUT") };
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, "llm_tts_contracts_v0.2");
        assert_eq!(config.llm.max_turns, 5);
        assert_eq!(config.llm.mode, "monologue");
        assert_eq!(config.tts.sample_rate, 24_000);
        assert_eq!(config.tts.base_ms_per_char, 90);
        assert_eq!(config.tts.base_ms_min, 600);
        assert_eq!(config.session.id_prefix, "sess_");
        assert_eq!(config.session.seed, 12345);
        assert_eq!(config.paths.utt_log_path(), PathBuf::from("out/utt_log.jsonl"));
        assert_eq!(config.paths.audio_dir(), PathBuf::from("out/audio"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config.llm.max_turns, 5);
        assert!(config.emo_map_path().is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.yaml");
        std::fs::write(
            &path,
            "llm:\n  max_turns: 3\ntts:\n  base_ms_min: 500\nsession:\n  seed: 7\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.llm.max_turns, 3);
        assert_eq!(config.llm.mode, "monologue");
        assert_eq!(config.tts.base_ms_min, 500);
        assert_eq!(config.tts.base_ms_per_char, 90);
        assert_eq!(config.session.seed, 7);
        assert_eq!(config.session.id_prefix, "sess_");
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.llm.max_turns, 5);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "llm:\n  max_turns: [not, a, number]\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, AituberError::Config(_)), "got {err:?}");
    }

    #[test]
    fn test_sibling_emo_map_discovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.yaml");
        std::fs::write(&path, "llm:\n  max_turns: 1\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.emo_map_path().is_none());

        std::fs::write(dir.path().join(SIBLING_EMO_MAP_FILE), "1_0: calm\n").unwrap();
        assert_eq!(
            config.emo_map_path(),
            Some(dir.path().join(SIBLING_EMO_MAP_FILE))
        );
    }

    #[test]
    fn test_explicit_emo_map_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.yaml");
        std::fs::write(&path, "emo_map_path: styles/emo.yaml\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.emo_map_path(),
            Some(dir.path().join("styles").join("emo.yaml"))
        );
    }

    #[test]
    fn test_validate_missing_explicit_emo_map_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.yaml");
        std::fs::write(&path, "emo_map_path: missing.yaml\n").unwrap();

        let err = Config::load_validated(&path).unwrap_err();
        assert!(err.to_string().contains("emo map file not found"), "got {err}");
    }

    #[test]
    fn test_validate_zero_sample_rate_errors() {
        let mut config = Config::default();
        config.tts.sample_rate = 0;
        config.session.id_prefix = String::new();
        let (_warnings, errors) = config.validate();
        assert!(errors.iter().any(|e| e.contains("sample_rate")), "got {errors:?}");
        assert!(errors.iter().any(|e| e.contains("id_prefix")), "got {errors:?}");
    }

    #[test]
    fn test_validate_zero_turns_warns() {
        let mut config = Config::default();
        config.llm.max_turns = 0;
        let (warnings, errors) = config.validate();
        assert!(errors.is_empty());
        assert!(warnings.iter().any(|w| w.contains("max_turns")));
    }

    #[test]
    fn test_logging_config_defaults() {
        let config: Config = serde_yaml::from_str("logging: {}\n").unwrap();
        let logging = config.logging.expect("logging should be present");
        assert_eq!(logging.format, "plain");
        assert!(logging.level.is_none());
        assert_eq!(logging.output, "stderr");
        assert!(logging.filters.is_empty());
    }

    #[test]
    fn test_open_explicit_missing_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.yaml");
        let err = Config::open(Some(&path)).unwrap_err();
        assert!(matches!(err, AituberError::Config(_)), "got {err:?}");
        assert!(err.to_string().contains("typo.yaml"), "got {err}");
    }

    #[test]
    fn test_open_explicit_path_loads_and_records_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.yaml");
        std::fs::write(&path, "llm:\n  max_turns: 2\n").unwrap();

        let config = Config::open(Some(&path)).unwrap().validated().unwrap();
        assert_eq!(config.llm.max_turns, 2);
        assert_eq!(config.path(), Some(path.as_path()));
    }
}
