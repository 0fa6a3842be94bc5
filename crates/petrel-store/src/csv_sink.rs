use std::path::{Path, PathBuf};

use petrel_core::error::HarvestError;
use petrel_core::models::HarvestRecord;
use petrel_core::traits::RecordSink;

/// Append-only result table persisted as CSV.
///
/// Every flush is a truncating overwrite of the same destination with
/// the full accumulated table, so a checkpoint that dies halfway leaves
/// at worst a short file, never interleaved rows. Columns match the
/// original collection format: `id,reasons,updates,data`.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn flush(&self, records: &[HarvestRecord]) -> Result<(), HarvestError> {
        let mut writer = csv::Writer::from_path(&self.path)
            .map_err(|e| HarvestError::Sink(format!("{}: {e}", self.path.display())))?;

        writer
            .write_record(["id", "reasons", "updates", "data"])
            .map_err(|e| HarvestError::Sink(e.to_string()))?;

        for record in records {
            let data = serde_json::to_string(&record.data)
                .map_err(|e| HarvestError::Sink(format!("snapshot not serializable: {e}")))?;
            writer
                .write_record([
                    record.petition_id.to_string().as_str(),
                    record.reasons.as_str(),
                    record.updates.as_str(),
                    data.as_str(),
                ])
                .map_err(|e| HarvestError::Sink(e.to_string()))?;
        }

        writer
            .flush()
            .map_err(|e| HarvestError::Sink(e.to_string()))?;
        tracing::debug!(path = %self.path.display(), rows = records.len(), "Table written");
        Ok(())
    }
}
