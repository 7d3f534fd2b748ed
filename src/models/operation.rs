use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::GpsData;

/// Caller-approved edits for one file. Absent fields are left untouched;
/// GPS is written as a complete group or not at all.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub gps: Option<GpsData>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.gps.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.keywords.is_none()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Done,
    Error,
    Skipped,
}

/// Per-item progress notification, emitted exactly once per record in input
/// order.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteProgressEvent {
    pub current: usize,
    pub total: usize,
    pub file_path: PathBuf,
    pub outcome: WriteOutcome,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemResult {
    pub index: usize,
    pub file_path: PathBuf,
    pub outcome: WriteOutcome,
    pub message: Option<String>,
}

impl ItemResult {
    pub fn done(index: usize, file_path: PathBuf) -> Self {
        Self {
            index,
            file_path,
            outcome: WriteOutcome::Done,
            message: None,
        }
    }

    pub fn error(index: usize, file_path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            index,
            file_path,
            outcome: WriteOutcome::Error,
            message: Some(message.into()),
        }
    }

    pub fn skipped(index: usize, file_path: PathBuf) -> Self {
        Self {
            index,
            file_path,
            outcome: WriteOutcome::Skipped,
            message: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WriteBackSummary {
    pub total: usize,
    pub written: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl WriteBackSummary {
    pub fn from_results(results: &[ItemResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            match result.outcome {
                WriteOutcome::Done => summary.written += 1,
                WriteOutcome::Error => summary.failed += 1,
                WriteOutcome::Skipped => summary.skipped += 1,
            }
        }

        summary
    }
}
