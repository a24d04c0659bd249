//! Pull one utterance out of the log and write it as M3' input.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::records::{DEFAULT_STEP_MS, M3PrimeInput};
use crate::utt_log::UttLog;

pub const DEFAULT_UTT_LOG_PATH: &str = "out/utt_log.jsonl";
pub const DEFAULT_OUTPUT_PATH: &str = "out/m3prime_input.json";

/// One extraction: which entry to read and where to write it.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub utt_log: PathBuf,
    pub session_id: String,
    pub utt_id: String,
    pub output: PathBuf,
    pub step_ms: u32,
}

impl ExtractRequest {
    pub fn new(session_id: impl Into<String>, utt_id: impl Into<String>) -> Self {
        Self {
            utt_log: PathBuf::from(DEFAULT_UTT_LOG_PATH),
            session_id: session_id.into(),
            utt_id: utt_id.into(),
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
            step_ms: DEFAULT_STEP_MS,
        }
    }
}

/// Look up the requested entry and project it. Reads only.
pub fn project(request: &ExtractRequest) -> Result<M3PrimeInput> {
    let entry = UttLog::new(&request.utt_log).find(&request.session_id, &request.utt_id)?;
    Ok(M3PrimeInput::from_entry(&entry, request.step_ms))
}

/// Pretty-printed JSON document for an M3' input record.
pub fn render(input: &M3PrimeInput) -> Result<String> {
    let mut doc = serde_json::to_string_pretty(input)?;
    doc.push('\n');
    Ok(doc)
}

/// Write the record to `path`, creating parent directories.
///
/// Written to a temp file first and renamed into place, so readers never see
/// a half-written document.
pub fn write_m3prime_input(path: &Path, input: &M3PrimeInput) -> Result<()> {
    let doc = render(input)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, doc.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Find, project and write. Nothing is written when the lookup fails.
pub fn extract(request: &ExtractRequest) -> Result<M3PrimeInput> {
    let input = project(request)?;
    write_m3prime_input(&request.output, &input)?;
    info!(
        session_id = %input.session_id,
        utt_id = %input.utt_id,
        output = %request.output.display(),
        "Wrote M3' input"
    );
    Ok(input)
}
