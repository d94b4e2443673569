// Tabular source decoding.
//
// Turns the delimited text exported from the scouting spreadsheet (Players
// and Config tabs) into plain rows of trimmed string cells. No header
// handling happens here; the row mapper decides which rows matter.

use std::io::Read;
use std::path::Path;

/// One decoded row of string cells.
pub type Row = Vec<String>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed delimited text in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode delimited text into rows.
///
/// Rows may have different widths, quoted cells may contain commas and
/// doubled quotes, every cell is trimmed and blank lines are skipped.
pub fn decode_rows<R: Read>(rdr: R) -> Result<Vec<Row>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = record.iter().map(str::to_string).collect();
        if row.iter().all(String::is_empty) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Decode rows from a file on disk.
pub fn load_rows(path: &Path) -> Result<Vec<Row>, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    decode_rows(file).map_err(|e| SourceError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
