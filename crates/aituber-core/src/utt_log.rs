//! Append-only JSONL utterance log.
//!
//! Layout: one [`UttLogEntry`] JSON object per line; blank lines are ignored.
//! Lines are never rewritten. Each entry is written with a single append so a
//! concurrent reader sees either the whole line or none of it.
//!
//! Readers match on the raw `session_id`/`utt_id` keys and decode only the
//! lines they return, so a well-formed line in another shape (another
//! session, an older schema) is a non-match rather than an error.

use std::fs::File;
use std::io::{BufRead, BufReader, SeekFrom};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{AituberError, Result};
use crate::records::UttLogEntry;

/// Handle to a `utt_log.jsonl` file.
#[derive(Debug, Clone)]
pub struct UttLog {
    path: PathBuf,
}

impl UttLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line.
    ///
    /// The line is fully serialized before the file is touched, so a
    /// serialization failure leaves the log unchanged. A failed write is
    /// truncated back to the previous length.
    pub async fn append(&self, entry: &UttLogEntry) -> Result<()> {
        let line = entry.to_line()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;
        let len = file.metadata().await?.len();

        let mut payload = Vec::with_capacity(line.len() + 1);
        if len > 0 && !ends_with_newline(&mut file, len).await? {
            // A torn tail from an interrupted append keeps its own line.
            warn!(path = %self.path.display(), "utt_log ends mid-line, starting a new line");
            payload.push(b'\n');
        }
        payload.extend_from_slice(line.as_bytes());

        if let Err(e) = write_synced(&mut file, &payload).await {
            if let Err(rollback) = file.set_len(len).await {
                warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "Failed to truncate utt_log after a failed append"
                );
            }
            return Err(e.into());
        }

        debug!(
            path = %self.path.display(),
            session_id = %entry.session_id,
            utt_id = %entry.utt_id,
            bytes = payload.len(),
            "Appended utt_log entry"
        );
        Ok(())
    }

    /// Start a fresh scan from the first line.
    pub fn scan(&self) -> Result<LogScan> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AituberError::LogNotFound {
                path: self.path.clone(),
            },
            _ => AituberError::Io(e),
        })?;
        Ok(LogScan {
            reader: BufReader::new(file),
            line_no: 0,
            buf: String::new(),
            done: false,
        })
    }

    /// First entry in file order keyed by (`session_id`, `utt_id`).
    ///
    /// Stops at the first match. A line that is not valid JSON before the
    /// match is an error, since the key may have been on that line. A
    /// matching line that does not decode as an entry is a
    /// [`AituberError::LogEntry`] error.
    pub fn find(&self, session_id: &str, utt_id: &str) -> Result<UttLogEntry> {
        for item in self.scan()? {
            let (line, value) = item?;
            if has_key(&value, "session_id", session_id) && has_key(&value, "utt_id", utt_id) {
                debug!(path = %self.path.display(), line, session_id, utt_id, "Found utt_log entry");
                return decode(line, value);
            }
        }
        Err(AituberError::EntryNotFound {
            session_id: session_id.to_string(),
            utt_id: utt_id.to_string(),
        })
    }

    /// All entries of one session, in file order.
    pub fn session_entries(&self, session_id: &str) -> Result<Vec<UttLogEntry>> {
        let mut entries = Vec::new();
        for item in self.scan()? {
            let (line, value) = item?;
            if has_key(&value, "session_id", session_id) {
                entries.push(decode(line, value)?);
            }
        }
        Ok(entries)
    }
}

async fn ends_with_newline(file: &mut tokio::fs::File, len: u64) -> std::io::Result<bool> {
    file.seek(SeekFrom::Start(len - 1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

async fn write_synced(file: &mut tokio::fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await
}

fn has_key(value: &Value, field: &str, expected: &str) -> bool {
    value.get(field).and_then(Value::as_str) == Some(expected)
}

fn decode(line: usize, value: Value) -> Result<UttLogEntry> {
    serde_json::from_value(value).map_err(|source| AituberError::LogEntry { line, source })
}

/// Lazy iterator over parsed log lines, yielding `(line_number, value)` with
/// 1-based line numbers.
///
/// Iteration ends after the first error. An unterminated last line that does
/// not parse is treated as a write still in flight and is not reported.
pub struct LogScan {
    reader: BufReader<File>,
    line_no: usize,
    buf: String,
    done: bool,
}

impl Iterator for LogScan {
    type Item = Result<(usize, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            let read = match self.reader.read_line(&mut self.buf) {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(AituberError::Io(e)));
                }
            };
            if read == 0 {
                self.done = true;
                break;
            }
            self.line_no += 1;

            let terminated = self.buf.ends_with('\n');
            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }

            return match serde_json::from_str::<Value>(line) {
                Ok(value) => Some(Ok((self.line_no, value))),
                Err(_) if !terminated => {
                    debug!(line = self.line_no, "Ignoring partial trailing utt_log line");
                    self.done = true;
                    None
                }
                Err(source) => {
                    self.done = true;
                    Some(Err(AituberError::LogParse {
                        line: self.line_no,
                        source,
                    }))
                }
            };
        }
        None
    }
}
