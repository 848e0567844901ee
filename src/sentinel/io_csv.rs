// Primitives for reading and writing CSV files.

use crate::sentinel::{io_common::RawSheet, *};

pub fn read_csv_table(path: &Path) -> SentinelResult<RawSheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {
            path: path.display().to_string(),
        })?;

    let headers: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1u64 })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    ensure!(!headers.is_empty(), EmptyFileSnafu {});
    debug!("read_csv_table: {:?} headers: {:?}", path, headers);

    let mut sheet = RawSheet {
        headers,
        rows: Vec::new(),
    };
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx as u64 + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        sheet.push_row(line.iter().map(Cell::parse).collect());
    }
    Ok(sheet)
}

/// Serializes the summary table.
pub fn render_master_csv(table: &MasterTable) -> SentinelResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(table.header()).context(CsvWriteSnafu {})?;
    for r in table.records.iter() {
        let mut row: Vec<String> = vec![r.key.state.clone(), r.key.district.clone()];
        row.extend(r.values.iter().map(|x| format_value(*x)));
        row.push(format_value(r.total_enrol));
        row.push(format_value(r.total_updates));
        row.push(format_value(r.vulnerability_score));
        wtr.write_record(&row).context(CsvWriteSnafu {})?;
    }
    wtr.into_inner()
        .map_err(|e| std::io::Error::new(e.error().kind(), e.error().to_string()))
        .context(CsvFlushSnafu {})
}

/// Reads back a summary table written by `render_master_csv`.
pub fn read_master_csv(path: &Path) -> SentinelResult<MasterTable> {
    let p = path.display().to_string();
    let sheet = read_csv_table(path)?;
    let h = &sheet.headers;
    let n = h.len();
    let derived = [TOTAL_ENROL, TOTAL_UPDATES, VULNERABILITY_SCORE];
    ensure!(
        n >= 5
            && h[0] == STATE_COLUMN
            && h[1] == DISTRICT_COLUMN
            && h[n - 3..].iter().zip(derived.iter()).all(|(a, b)| a == b),
        MasterFormatSnafu {
            path: p.clone(),
            message: format!("unexpected header {:?}", h),
        }
    );

    let mut records: Vec<MasterRecord> = Vec::new();
    for (idx, row) in sheet.rows.iter().enumerate() {
        let lineno = idx + 2;
        let mut values: Vec<f64> = Vec::new();
        for col in 2..n {
            match row.get(col) {
                Some(Cell::Number(x)) => values.push(*x),
                other => {
                    return MasterFormatSnafu {
                        path: p,
                        message: format!("line {}: {} is not a number: {:?}", lineno, h[col], other),
                    }
                    .fail()
                }
            }
        }
        let key = DistrictKey::new(
            &row.get(0).unwrap_or(&Cell::Missing).to_text(),
            &row.get(1).unwrap_or(&Cell::Missing).to_text(),
        );
        let vulnerability_score = values.pop().unwrap_or_default();
        let total_updates = values.pop().unwrap_or_default();
        let total_enrol = values.pop().unwrap_or_default();
        records.push(MasterRecord {
            key,
            values,
            total_enrol,
            total_updates,
            vulnerability_score,
        });
    }
    debug!("read_master_csv: {} records from {}", records.len(), p);
    Ok(MasterTable {
        columns: h[2..n - 3].to_vec(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use district_summary::builder::Builder;

    #[test]
    fn short_rows_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("enrolment.csv");
        fs::write(&p, " State ,district,age_0_5\nGoa,North Goa\n,,\nGoa,South Goa,3\n").unwrap();
        let sheet = read_csv_table(&p).unwrap();
        assert_eq!(sheet.headers, vec![" State ", "district", "age_0_5"]);
        assert_eq!(
            sheet.rows,
            vec![
                vec![Cell::Text("Goa".to_string()), Cell::Text("North Goa".to_string())],
                vec![
                    Cell::Text("Goa".to_string()),
                    Cell::Text("South Goa".to_string()),
                    Cell::Number(3.0)
                ],
            ]
        );
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("enrolment.csv");
        fs::write(&p, "").unwrap();
        assert!(matches!(read_csv_table(&p), Err(SentinelError::EmptyFile {})));
    }

    #[test]
    fn master_table_reads_back() {
        let mut builder = Builder::new();
        builder
            .add_record_simple(
                Category::Enrolment,
                &[("state", "Goa"), ("district", "North Goa"), ("age_5_17", "9")],
            )
            .unwrap();
        builder
            .add_record_simple(
                Category::Demographic,
                &[("state", "Goa"), ("district", "North Goa"), ("demo_age_17_", "1")],
            )
            .unwrap();
        let master = builder.build().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("summary.csv");
        fs::write(&p, render_master_csv(&master).unwrap()).unwrap();
        let back = read_master_csv(&p).unwrap();
        assert_eq!(back, master);
    }

    #[test]
    fn malformed_master_table() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("summary.csv");
        fs::write(&p, "state,district,age_0_5\nGOA,X,1\n").unwrap();
        assert!(matches!(
            read_master_csv(&p),
            Err(SentinelError::MasterFormat { .. })
        ));
        fs::write(
            &p,
            "state,district,total_enrol,total_updates,vulnerability_score\nGOA,X,1,one,0.5\n",
        )
        .unwrap();
        assert!(matches!(
            read_master_csv(&p),
            Err(SentinelError::MasterFormat { .. })
        ));
    }
}
