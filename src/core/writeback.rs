use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::core::exif_io::ExifAdapter;
use crate::core::sanitize;
use crate::models::{
    ImageRecord, ItemResult, MetadataUpdate, RecordStatus, WriteBackSummary, WriteOutcome,
    WriteProgressEvent,
};

/// Persists pending edits record by record. Clean records are skipped, a
/// failing record never stops its successors, and every record produces
/// exactly one progress event in input order.
pub struct MetadataWriteBack {
    adapter: Arc<dyn ExifAdapter>,
}

impl MetadataWriteBack {
    pub fn new(adapter: Arc<dyn ExifAdapter>) -> Self {
        Self { adapter }
    }

    pub fn write_back(
        &self,
        records: &mut [ImageRecord],
        progress: Option<&Sender<WriteProgressEvent>>,
    ) -> Vec<ItemResult> {
        let total = records.len();
        let mut results = Vec::with_capacity(total);

        for (position, record) in records.iter_mut().enumerate() {
            let result = if record.status.is_clean() {
                ItemResult::skipped(record.index, record.file_path.clone())
            } else {
                let update = build_update(record);
                match self.adapter.write(&record.file_path, &update) {
                    Ok(()) => {
                        apply_written_fields(record, &update);
                        ItemResult::done(record.index, record.file_path.clone())
                    }
                    Err(err) => {
                        log::warn!(
                            "metadata write to {} failed: {err:#}",
                            record.file_path.display()
                        );
                        ItemResult::error(
                            record.index,
                            record.file_path.clone(),
                            format!("{err:#}"),
                        )
                    }
                }
            };

            if let Some(sink) = progress {
                let _ = sink.send(WriteProgressEvent {
                    current: position + 1,
                    total,
                    file_path: record.file_path.clone(),
                    outcome: result.outcome,
                    message: result.message.clone(),
                });
            }

            results.push(result);
        }

        results
    }

    pub fn summarize(results: &[ItemResult]) -> WriteBackSummary {
        WriteBackSummary::from_results(results)
    }
}

/// Maps a record's desired final values onto the collaborator's field set.
/// Text fields pass through the shared sanitization rules and are dropped
/// when empty afterwards; GPS goes out as a complete group or not at all.
pub fn build_update(record: &ImageRecord) -> MetadataUpdate {
    let title = non_empty(sanitize::sanitize_field("Title", &record.title));
    let description = non_empty(sanitize::sanitize_field("Description", &record.description));

    let mut seen = Vec::new();
    for keyword in &record.keywords {
        let cleaned = sanitize::sanitize_field("Keywords", keyword);
        if !cleaned.is_empty() && !seen.contains(&cleaned) {
            seen.push(cleaned);
        }
    }
    let keywords = if seen.is_empty() { None } else { Some(seen) };

    MetadataUpdate {
        gps: record.gps.clone(),
        title,
        description,
        keywords,
    }
}

/// After a successful write the record mirrors exactly what was persisted,
/// and its status reflects the just-written GPS state.
fn apply_written_fields(record: &mut ImageRecord, update: &MetadataUpdate) {
    if let Some(title) = &update.title {
        record.title = title.clone();
    }
    if let Some(description) = &update.description {
        record.description = description.clone();
    }
    if let Some(keywords) = &update.keywords {
        record.keywords = keywords.clone();
    }

    record.status = if record.gps.is_some() {
        RecordStatus::LoadedWithGps
    } else {
        RecordStatus::LoadedNoGps
    };
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
