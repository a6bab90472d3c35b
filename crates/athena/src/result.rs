use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Raw `GetQueryResults` rows: first row is the header, `None` is SQL NULL.
pub type ResultGrid = Vec<Vec<Option<String>>>;

/// One output row, keyed by header name in header order.
pub type Record = IndexMap<String, Option<String>>;

/// Execution metadata for a completed Athena query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetadata {
    /// Athena query execution ID.
    pub query_id: String,
    /// Total bytes scanned during execution.
    pub bytes_scanned: u64,
    /// Engine execution time in milliseconds.
    pub execution_time_ms: u64,
    /// Number of status checks before the query turned terminal.
    pub polls: u32,
}

/// Athena pricing: $5 per TB scanned.
const DOLLARS_PER_BYTE: f64 = 5.0 / (1024.0 * 1024.0 * 1024.0 * 1024.0);

impl QueryMetadata {
    /// Estimates the query cost in USD based on Athena's $5/TB pricing model.
    pub fn cost_estimate_usd(&self) -> f64 {
        self.bytes_scanned as f64 * DOLLARS_PER_BYTE
    }
}

/// Header plus data rows of a finished query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub grid: ResultGrid,
    pub metadata: QueryMetadata,
}

impl QueryResult {
    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.grid.len().saturating_sub(1)
    }

    pub fn to_records(&self) -> Vec<Record> {
        grid_to_records(&self.grid)
    }
}

/// Zip every data row against the header row.
///
/// A row shorter than the header leaves the missing trailing fields out of
/// its record; cells past the end of the header are dropped. A NULL header
/// cell names its column `""`.
pub fn grid_to_records(grid: &[Vec<Option<String>>]) -> Vec<Record> {
    let Some((header, rows)) = grid.split_first() else {
        return Vec::new();
    };

    let names: Vec<&str> = header
        .iter()
        .map(|cell| cell.as_deref().unwrap_or(""))
        .collect();

    rows.iter()
        .map(|row| {
            names
                .iter()
                .zip(row)
                .map(|(name, cell)| (name.to_string(), cell.clone()))
                .collect::<Record>()
        })
        .collect()
}
