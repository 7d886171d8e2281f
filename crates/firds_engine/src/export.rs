use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use thiserror::Error;

use crate::persist::{PersistError, WorkingDir};
use crate::records::InstrumentRecord;

/// Output column headers, in serialization order. The leading index
/// column has an empty header cell.
pub const OUTPUT_COLUMNS: [&str; 6] = [
    "FinInstrmGnlAttrbts.Id",
    "FinInstrmGnlAttrbts.FullNm",
    "FinInstrmGnlAttrbts.ClssfctnTp",
    "FinInstrmGnlAttrbts.CmmdtyDerivInd",
    "FinInstrmGnlAttrbts.NtnlCcy",
    "Issr",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("output row {row} has {found} columns, expected {expected}")]
    Malformed {
        row: usize,
        found: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub record_count: usize,
    pub output_path: PathBuf,
}

/// Serialize the output table and persist it atomically as
/// `{working_dir}/{filename}`.
///
/// Rows carry a zero-based leading index column followed by the six
/// fixed columns; missing fields render as empty cells.
pub fn write_output_table(
    working_dir: &WorkingDir,
    filename: &str,
    records: &[InstrumentRecord],
) -> Result<ExportSummary, ExportError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let mut header = vec![""];
    header.extend(OUTPUT_COLUMNS);
    writer.write_record(&header)?;

    for (index, record) in records.iter().enumerate() {
        let index = index.to_string();
        let mut row = vec![index.as_str()];
        let columns = record.columns();
        row.extend(columns);
        writer.write_record(&row)?;
    }

    let buffer = writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))?;
    let content = String::from_utf8(buffer)
        .map_err(|err| ExportError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))?;

    let output_path = working_dir.write(filename, &content)?;
    Ok(ExportSummary {
        record_count: records.len(),
        output_path,
    })
}

/// Re-read an output table written by [`write_output_table`]. Empty
/// cells come back as `None`; the leading index column is dropped.
pub fn read_output_table(path: &Path) -> Result<Vec<InstrumentRecord>, ExportError> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        if record.len() != OUTPUT_COLUMNS.len() + 1 {
            return Err(ExportError::Malformed {
                row,
                found: record.len(),
                expected: OUTPUT_COLUMNS.len() + 1,
            });
        }
        let field = |cell: usize| {
            record
                .get(cell + 1)
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string())
        };
        records.push(InstrumentRecord {
            id: field(0),
            full_name: field(1),
            classification: field(2),
            commodity_derivative: field(3),
            notional_currency: field(4),
            issuer: field(5),
        });
    }
    Ok(records)
}
