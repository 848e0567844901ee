use std::path::Path;

use district_summary::Cell;

/// The content of one source, before normalization: the header row and the data rows.
#[derive(PartialEq, Debug, Clone)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    /// Adds a row. Rows with only blank cells are dropped.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        if row.iter().any(|c| *c != Cell::Missing) {
            self.rows.push(row);
        }
    }
}

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
