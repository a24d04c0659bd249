//! Emotion id → TTS style prompt lookup.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AituberError, Result};

/// One value in the style map file: either the prompt itself or a table
/// carrying it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StyleEntry {
    Prompt(String),
    Detailed { tts_style_prompt: String },
}

impl StyleEntry {
    fn into_prompt(self) -> String {
        match self {
            StyleEntry::Prompt(p) => p,
            StyleEntry::Detailed { tts_style_prompt } => tts_style_prompt,
        }
    }
}

/// Mapping from emotion id to a style hint handed to the synthesizer.
///
/// ```yaml
/// 1_0: "calm, soft voice"
/// 2_1:
///   tts_style_prompt: "excited, bright"
/// ```
#[derive(Debug, Clone, Default)]
pub struct EmoStyleMap {
    styles: HashMap<String, String>,
}

impl EmoStyleMap {
    pub fn new(styles: HashMap<String, String>) -> Self {
        Self { styles }
    }

    /// Load a style map from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let entries: HashMap<String, StyleEntry> = serde_yaml::from_str(&raw)
            .map_err(|e| AituberError::Config(format!("{}: {e}", path.display())))?;

        let styles: HashMap<String, String> = entries
            .into_iter()
            .map(|(emo_id, entry)| (emo_id, entry.into_prompt()))
            .collect();
        debug!(path = %path.display(), styles = styles.len(), "Loaded emo style map");

        Ok(Self { styles })
    }

    /// Style prompt for an emotion id, if mapped.
    pub fn resolve(&self, emo_id: &str) -> Option<&str> {
        self.styles.get(emo_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_mixed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emo_tts_map.yaml");
        std::fs::write(
            &path,
            "1_0: calm voice\n2_1:\n  tts_style_prompt: excited, bright\n",
        )
        .unwrap();

        let map = EmoStyleMap::load(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve("1_0"), Some("calm voice"));
        assert_eq!(map.resolve("2_1"), Some("excited, bright"));
        assert_eq!(map.resolve("9_1"), None);
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emo_tts_map.yaml");
        std::fs::write(&path, "").unwrap();
        assert!(EmoStyleMap::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_non_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emo_tts_map.yaml");
        std::fs::write(&path, "- 1_0\n- 2_1\n").unwrap();
        assert!(matches!(
            EmoStyleMap::load(&path),
            Err(AituberError::Config(_))
        ));
    }
}
