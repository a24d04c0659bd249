//! Core records, config, errors, session timeline and utterance log for the
//! AITuber turn pipeline.

pub mod config;
pub mod emo_map;
pub mod error;
pub mod extract;
pub mod records;
pub mod timeline;
pub mod utt_log;
