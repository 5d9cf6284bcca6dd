//! CSV export of buffered metric events.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{info, warn};

use crate::recorder::MetricsRecorder;

pub const CSV_HEADER: [&str; 5] = ["SourceId", "EventType", "Value", "Context", "Timestamp"];

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("cannot export metrics: buffer is empty")]
    EmptyBuffer,
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Write every buffered event as CSV. Values carry two decimals and
/// timestamps are RFC 3339. Returns the number of rows written.
pub fn export_csv<W: Write>(recorder: &MetricsRecorder, writer: W) -> Result<usize, MetricsError> {
    if recorder.event_count() == 0 {
        warn!("cannot export metrics: buffer is empty");
        return Err(MetricsError::EmptyBuffer);
    }
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CSV_HEADER)?;
    let mut rows = 0;
    for e in recorder.events() {
        let value = format!("{:.2}", e.value);
        let timestamp = e.timestamp.to_rfc3339();
        out.write_record([
            e.source.as_str(),
            e.event_type.as_str(),
            value.as_str(),
            e.context.as_str(),
            timestamp.as_str(),
        ])?;
        rows += 1;
    }
    out.flush().map_err(csv::Error::from)?;
    Ok(rows)
}

/// [`export_csv`] into a new file at `path`.
pub fn export_csv_to_path(recorder: &MetricsRecorder, path: &Path) -> Result<usize, MetricsError> {
    let io_err = |source| MetricsError::Io {
        path: path.display().to_string(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let rows = export_csv(recorder, BufWriter::new(file))?;
    info!("exported {rows} metrics to {}", path.display());
    Ok(rows)
}

// ===========================================================================
// Tests
// ===========================================================================
