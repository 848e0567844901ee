use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::sentinel::{io_common::RawSheet, *};

/// Reads a worksheet of an Excel file. The first row is the header.
pub fn read_excel_table(path: &Path, worksheet: Option<&str>) -> SentinelResult<RawSheet> {
    let p = path.display().to_string();
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path: p.clone() })?;
    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name })?
            .context(OpeningExcelSnafu { path: p.clone() })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path: p.clone() })?,
    };

    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyFileSnafu {})?;
    debug!("read_excel_table: {}: header: {:?}", p, header);

    let mut sheet = RawSheet {
        headers: header.iter().map(header_text).collect(),
        rows: Vec::new(),
    };
    for row in iter {
        sheet.push_row(row.iter().map(read_cell).collect());
    }
    Ok(sheet)
}

fn header_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Empty => String::new(),
        other => read_cell(other).to_text(),
    }
}

fn read_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) if f.is_finite() => Cell::Number(*f),
        DataType::Float(_) => Cell::Missing,
        DataType::String(s) => Cell::parse(s),
        DataType::Empty => Cell::Missing,
        // Dates, booleans and errors are not counters.
        other => Cell::Text(format!("{:?}", other)),
    }
}
