//! Export the filtered detail table to CSV.
//!
//! The export keeps the sheet's own header names so the file can be pasted back into
//! the spreadsheet or re-read with `--csv-file`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{Record, columns};
use crate::error::AppError;

/// Write records to a CSV file.
pub fn write_records_csv(path: &Path, records: &[Record]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_records(file, records)?;
    tracing::info!(path = %path.display(), rows = records.len(), "exported detail table");
    Ok(())
}

/// Write records as CSV to any writer.
pub fn write_records<W: Write>(writer: W, records: &[Record]) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);

    out.write_record(columns::ALL)
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;

    for r in records {
        let period = r.period.map(|p| p.to_string()).unwrap_or_default();
        out.write_record([
            r.platform.clone(),
            r.campaign.clone(),
            period,
            r.investment.to_string(),
            r.leads.to_string(),
            r.sales.to_string(),
            r.impressions.to_string(),
            r.clicks.to_string(),
        ])
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
