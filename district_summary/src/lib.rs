pub mod builder;
mod config;
pub mod manual;

use log::{debug, info};

use std::collections::{BTreeMap, BTreeSet, HashSet};

pub use crate::config::*;

/// Trims and lower-cases a column header, so that `" State "` and `"state"`
/// refer to the same column.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

impl CategoryTable {
    pub fn new(category: Category) -> CategoryTable {
        CategoryTable {
            category,
            columns: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Appends the rows of one source to the table.
    ///
    /// Columns are matched by normalized name. Rows shorter than the header are
    /// padded with missing cells. The table is left untouched if the source is rejected.
    pub fn append(
        &mut self,
        headers: &[String],
        rows: &[Vec<Cell>],
    ) -> Result<usize, AggregationErrors> {
        let names: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let state_idx = names
            .iter()
            .position(|n| n == STATE_COLUMN)
            .ok_or_else(|| AggregationErrors::MissingKeyColumn(STATE_COLUMN.to_string()))?;
        let district_idx = names
            .iter()
            .position(|n| n == DISTRICT_COLUMN)
            .ok_or_else(|| AggregationErrors::MissingKeyColumn(DISTRICT_COLUMN.to_string()))?;

        if let Some(idx) = rows.iter().position(|row| row.len() > names.len()) {
            // The header is line 1.
            return Err(AggregationErrors::RowTooLong { lineno: idx + 2 });
        }

        for name in names.iter() {
            if name != STATE_COLUMN && name != DISTRICT_COLUMN && !self.columns.contains(name) {
                self.columns.push(name.clone());
            }
        }

        for row in rows.iter() {
            let state = row.get(state_idx).unwrap_or(&Cell::Missing);
            let district = row.get(district_idx).unwrap_or(&Cell::Missing);
            let cells = names
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != state_idx && *idx != district_idx)
                .map(|(idx, name)| (name.clone(), row.get(idx).cloned().unwrap_or(Cell::Missing)))
                .collect();
            self.records.push(RawRecord {
                key: DistrictKey::from_cells(state, district),
                cells,
            });
        }
        debug!(
            "append: {}: {} rows, {} columns",
            self.category,
            rows.len(),
            self.columns.len()
        );
        Ok(rows.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// A column is numeric when none of its cells holds text.
fn numeric_columns(table: &CategoryTable) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|c| {
            !table
                .records
                .iter()
                .any(|r| matches!(r.cells.get(*c), Some(Cell::Text(_))))
        })
        .cloned()
        .collect()
}

/// Groups a category table by district and sums all its numeric columns.
///
/// Non-numeric columns are dropped. Missing cells do not contribute to the
/// sums: a group with only missing values sums to zero.
pub fn aggregate_category(table: &CategoryTable) -> AggregatedTable {
    let columns = numeric_columns(table);
    if columns.len() < table.columns.len() {
        let dropped: Vec<&String> = table
            .columns
            .iter()
            .filter(|c| !columns.contains(c))
            .collect();
        debug!(
            "aggregate_category: {}: dropping non-numeric columns {:?}",
            table.category, dropped
        );
    }

    let mut rows: BTreeMap<DistrictKey, Vec<f64>> = BTreeMap::new();
    for r in table.records.iter() {
        let acc = rows
            .entry(r.key.clone())
            .or_insert_with(|| vec![0.0; columns.len()]);
        for (idx, c) in columns.iter().enumerate() {
            if let Some(Cell::Number(x)) = r.cells.get(c) {
                acc[idx] += *x;
            }
        }
    }
    info!(
        "Aggregated {} {} records into {} districts",
        table.len(),
        table.category,
        rows.len()
    );
    AggregatedTable {
        category: table.category,
        columns,
        rows,
    }
}

// The result of the outer joins, before the missing values are filled.
#[derive(PartialEq, Debug, Clone)]
struct JoinedTable {
    columns: Vec<String>,
    rows: BTreeMap<DistrictKey, Vec<Option<f64>>>,
}

impl JoinedTable {
    fn from_base(base: &AggregatedTable) -> JoinedTable {
        JoinedTable {
            columns: base.columns.clone(),
            rows: base
                .rows
                .iter()
                .map(|(k, vs)| (k.clone(), vs.iter().map(|x| Some(*x)).collect()))
                .collect(),
        }
    }

    /// Outer join on the district key. Columns present on both sides get the
    /// suffixes `_x` (left) and `_y` (right).
    fn outer_join(self, right: &AggregatedTable) -> JoinedTable {
        let left_names: HashSet<&String> = self.columns.iter().collect();
        let right_names: HashSet<&String> = right.columns.iter().collect();
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if right_names.contains(c) {
                    format!("{}_x", c)
                } else {
                    c.clone()
                }
            })
            .chain(right.columns.iter().map(|c| {
                if left_names.contains(c) {
                    format!("{}_y", c)
                } else {
                    c.clone()
                }
            }))
            .collect();
        debug!("outer_join: {}: columns {:?}", right.category, columns);

        let left_width = self.columns.len();
        let right_width = right.columns.len();
        let keys: BTreeSet<DistrictKey> = self
            .rows
            .keys()
            .chain(right.rows.keys())
            .cloned()
            .collect();

        let mut left_rows = self.rows;
        let mut rows: BTreeMap<DistrictKey, Vec<Option<f64>>> = BTreeMap::new();
        for key in keys {
            let mut values = left_rows
                .remove(&key)
                .unwrap_or_else(|| vec![None; left_width]);
            match right.rows.get(&key) {
                Some(vs) => values.extend(vs.iter().map(|x| Some(*x))),
                None => values.extend(std::iter::repeat(None).take(right_width)),
            }
            rows.insert(key, values);
        }
        JoinedTable { columns, rows }
    }

    // Zero fill is applied globally: a category absent for a district and a
    // legitimate zero count are not distinguished.
    fn fill_missing(self) -> (Vec<String>, BTreeMap<DistrictKey, Vec<f64>>) {
        let rows = self
            .rows
            .into_iter()
            .map(|(k, vs)| (k, vs.into_iter().map(|x| x.unwrap_or(0.0)).collect()))
            .collect();
        (self.columns, rows)
    }
}

fn counter_positions(columns: &[String], counters: &[&str]) -> Vec<usize> {
    counters
        .iter()
        .filter_map(|name| {
            let pos = columns.iter().position(|c| c == name);
            if pos.is_none() {
                debug!("counter_positions: {} is absent, counted as zero", name);
            }
            pos
        })
        .collect()
}

/// Computes the derived fields of every row.
///
/// Counters absent from the columns contribute zero. Input columns that carry
/// the name of a derived field are replaced by the derived field.
pub fn derive_metrics(columns: Vec<String>, rows: BTreeMap<DistrictKey, Vec<f64>>) -> MasterTable {
    let derived = [TOTAL_ENROL, TOTAL_UPDATES, VULNERABILITY_SCORE];
    let kept: Vec<usize> = (0..columns.len())
        .filter(|idx| !derived.contains(&columns[*idx].as_str()))
        .collect();
    let enrol_pos = counter_positions(&columns, &ENROLMENT_COUNTERS);
    let update_pos = counter_positions(&columns, &UPDATE_COUNTERS);

    let records: Vec<MasterRecord> = rows
        .into_iter()
        .map(|(key, values)| {
            let total_enrol: f64 = enrol_pos.iter().map(|idx| values[*idx]).sum();
            let total_updates: f64 = update_pos.iter().map(|idx| values[*idx]).sum();
            MasterRecord {
                key,
                values: kept.iter().map(|idx| values[*idx]).collect(),
                total_enrol,
                total_updates,
                vulnerability_score: total_updates / (total_enrol + 1.0),
            }
        })
        .collect();

    MasterTable {
        columns: kept.iter().map(|idx| columns[*idx].clone()).collect(),
        records,
    }
}

/// Builds the master table out of the category tables.
///
/// Arguments:
/// * `tables` the loaded tables. Only the first table of each category is
/// considered. The enrolment table must have at least one record; the
/// other categories are optional and left out of the join when empty.
///
/// The rows are returned in ascending key order.
pub fn build_master_table(tables: &[CategoryTable]) -> Result<MasterTable, AggregationErrors> {
    info!("Processing {} category tables", tables.len());
    let table_for = |c: Category| tables.iter().find(|t| t.category == c);

    let enrolment = match table_for(Category::Enrolment) {
        Some(t) if !t.is_empty() => t,
        _ => return Err(AggregationErrors::MissingAnchorCategory),
    };
    let mut joined = JoinedTable::from_base(&aggregate_category(enrolment));

    for category in Category::ALL.iter().filter(|c| !c.is_anchor()) {
        match table_for(*category) {
            Some(t) if !t.is_empty() => {
                joined = joined.outer_join(&aggregate_category(t));
            }
            _ => {
                info!("No {} records, left out of the join", category);
            }
        }
    }

    let (columns, rows) = joined.fill_missing();
    let master = derive_metrics(columns, rows);
    info!(
        "Master table: {} districts, {} summed columns",
        master.len(),
        master.columns.len()
    );
    Ok(master)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn table(category: Category, headers: &[&str], rows: &[&[&str]]) -> CategoryTable {
        let mut t = CategoryTable::new(category);
        let hs: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let cells: Vec<Vec<Cell>> = rows
            .iter()
            .map(|r| r.iter().map(|s| Cell::parse(s)).collect())
            .collect();
        t.append(&hs, &cells).unwrap();
        t
    }

    fn enrolment_pune() -> CategoryTable {
        table(
            Category::Enrolment,
            &["state", "district", "age_0_5", "age_5_17", "age_18_greater"],
            &[&["Maharashtra", " Pune ", "10", "20", "5"]],
        )
    }

    #[test]
    fn pune_scenario() {
        init();
        let bio = table(
            Category::Biometric,
            &["state", "district", "bio_age_5_17"],
            &[&["MAHARASHTRA", "PUNE", "7"]],
        );
        let master = build_master_table(&[enrolment_pune(), bio]).unwrap();
        assert_eq!(master.len(), 1);
        let r = &master.records[0];
        assert_eq!(r.key, DistrictKey::new("MAHARASHTRA", "PUNE"));
        assert_eq!(r.total_enrol, 35.0);
        assert_eq!(r.total_updates, 7.0);
        assert!((r.vulnerability_score - 7.0 / 36.0).abs() < 1e-12);
    }

    #[test]
    fn headers_are_normalized() {
        let mut t = CategoryTable::new(Category::Enrolment);
        t.append(
            &[" State ".to_string(), "DISTRICT".to_string(), " Age_0_5".to_string()],
            &[vec![Cell::parse("goa"), Cell::parse("north goa"), Cell::parse("3")]],
        )
        .unwrap();
        t.append(
            &["state".to_string(), "district".to_string(), "age_0_5".to_string()],
            &[vec![Cell::parse("GOA"), Cell::parse("NORTH GOA "), Cell::parse("4")]],
        )
        .unwrap();
        assert_eq!(t.columns, vec!["age_0_5".to_string()]);
        let agg = aggregate_category(&t);
        assert_eq!(agg.rows.len(), 1);
        assert_eq!(agg.rows[&DistrictKey::new("GOA", "NORTH GOA")], vec![7.0]);
    }

    #[test]
    fn missing_key_column_is_rejected() {
        let mut t = CategoryTable::new(Category::Biometric);
        let res = t.append(
            &["state".to_string(), "bio_age_5_17".to_string()],
            &[vec![Cell::parse("GOA"), Cell::parse("1")]],
        );
        assert_eq!(
            res,
            Err(AggregationErrors::MissingKeyColumn("district".to_string()))
        );
        assert!(t.is_empty());
        assert!(t.columns.is_empty());
    }

    #[test]
    fn long_rows_are_rejected() {
        let mut t = CategoryTable::new(Category::Enrolment);
        let res = t.append(
            &["state".to_string(), "district".to_string()],
            &[
                vec![Cell::parse("A"), Cell::parse("B")],
                vec![Cell::parse("A"), Cell::parse("B"), Cell::parse("1")],
            ],
        );
        assert_eq!(res, Err(AggregationErrors::RowTooLong { lineno: 3 }));
        assert!(t.is_empty());
    }

    #[test]
    fn missing_anchor_is_fatal() {
        let bio = table(
            Category::Biometric,
            &["state", "district", "bio_age_5_17"],
            &[&["A", "B", "1"]],
        );
        assert_eq!(
            build_master_table(&[bio.clone()]),
            Err(AggregationErrors::MissingAnchorCategory)
        );
        let empty = CategoryTable::new(Category::Enrolment);
        assert_eq!(
            build_master_table(&[empty, bio]),
            Err(AggregationErrors::MissingAnchorCategory)
        );
    }

    #[test]
    fn biometric_only_district_is_kept() {
        let bio = table(
            Category::Biometric,
            &["state", "district", "bio_age_5_17", "bio_age_17_"],
            &[&["Kerala", "Idukki", "4", "5"]],
        );
        let master = build_master_table(&[enrolment_pune(), bio]).unwrap();
        assert_eq!(master.len(), 2);
        let r = master.get(&DistrictKey::new("KERALA", "IDUKKI")).unwrap();
        assert_eq!(r.total_enrol, 0.0);
        assert_eq!(r.total_updates, 9.0);
        assert_eq!(r.vulnerability_score, 9.0);
        assert_eq!(master.value(r, "age_0_5"), Some(0.0));
    }

    #[test]
    fn row_count_is_the_union_of_keys() {
        let enrol = table(
            Category::Enrolment,
            &["state", "district", "age_0_5"],
            &[&["A", "X", "1"], &["A", "Y", "1"], &["a ", "x", "2"]],
        );
        let bio = table(
            Category::Biometric,
            &["state", "district", "bio_age_5_17"],
            &[&["A", "Y", "1"], &["B", "Z", "1"]],
        );
        let demo = table(
            Category::Demographic,
            &["state", "district", "demo_age_17_"],
            &[&["C", "W", "1"], &["A", "X", "3"]],
        );
        let master = build_master_table(&[demo, bio, enrol]).unwrap();
        let keys: Vec<String> = master.records.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["A/X", "A/Y", "B/Z", "C/W"]);
        let ax = master.get(&DistrictKey::new("A", "X")).unwrap();
        assert_eq!(ax.total_enrol, 3.0);
        assert_eq!(ax.total_updates, 3.0);
    }

    #[test]
    fn score_relation_holds() {
        let enrol = table(
            Category::Enrolment,
            &["state", "district", "age_0_5", "age_5_17", "age_18_greater"],
            &[&["A", "X", "3", "0.5", "11"], &["A", "Y", "0", "0", "0"]],
        );
        let demo = table(
            Category::Demographic,
            &["state", "district", "demo_age_5_17", "demo_age_17_"],
            &[&["A", "X", "13", "2"], &["A", "Y", "1", ""]],
        );
        let master = build_master_table(&[enrol, demo]).unwrap();
        for r in master.records.iter() {
            let lhs = r.vulnerability_score * (r.total_enrol + 1.0);
            assert!((lhs - r.total_updates).abs() < 1e-9, "{:?}", r);
        }
    }

    #[test]
    fn text_columns_are_dropped() {
        let enrol = table(
            Category::Enrolment,
            &["date", "state", "district", "pincode", "age_0_5"],
            &[
                &["01-03-2025", "A", "X", "110001", "1"],
                &["02-03-2025", "A", "X", "", "2"],
            ],
        );
        let agg = aggregate_category(&enrol);
        assert_eq!(agg.columns, vec!["pincode".to_string(), "age_0_5".to_string()]);
        assert_eq!(agg.rows[&DistrictKey::new("A", "X")], vec![110001.0, 3.0]);
    }

    #[test]
    fn shared_columns_get_suffixes() {
        let enrol = table(
            Category::Enrolment,
            &["state", "district", "pincode", "age_0_5"],
            &[&["A", "X", "10", "1"]],
        );
        let bio = table(
            Category::Biometric,
            &["state", "district", "pincode", "bio_age_5_17"],
            &[&["A", "X", "20", "1"]],
        );
        let demo = table(
            Category::Demographic,
            &["state", "district", "pincode", "demo_age_5_17"],
            &[&["A", "X", "30", "1"]],
        );
        let master = build_master_table(&[enrol, bio, demo]).unwrap();
        assert_eq!(
            master.columns,
            vec![
                "pincode_x",
                "age_0_5",
                "pincode_y",
                "bio_age_5_17",
                "pincode",
                "demo_age_5_17"
            ]
        );
        let r = &master.records[0];
        assert_eq!(r.values, vec![10.0, 1.0, 20.0, 1.0, 30.0, 1.0]);
        assert_eq!(r.total_updates, 2.0);
    }

    #[test]
    fn missing_keys_become_nan() {
        let enrol = table(
            Category::Enrolment,
            &["state", "district", "age_0_5"],
            &[&["A", "", "1"]],
        );
        let master = build_master_table(&[enrol]).unwrap();
        assert_eq!(master.records[0].key, DistrictKey::new("A", "NAN"));
    }

    #[test]
    fn missing_markers_keep_counters() {
        let enrol = table(
            Category::Enrolment,
            &["state", "district", "age_0_5", "age_5_17", "age_18_greater"],
            &[
                &["A", "X", "10", "20", "5"],
                &["A", "Y", "NA", "1", "1"],
                &["A", "Y", "3", "NaN", "n/a"],
            ],
        );
        let master = build_master_table(&[enrol]).unwrap();
        assert_eq!(master.columns, vec!["age_0_5", "age_5_17", "age_18_greater"]);
        let x = master.get(&DistrictKey::new("A", "X")).unwrap();
        assert_eq!(x.total_enrol, 35.0);
        let y = master.get(&DistrictKey::new("A", "Y")).unwrap();
        assert_eq!(y.values, vec![3.0, 1.0, 1.0]);
        assert_eq!(y.total_enrol, 5.0);
    }

    #[test]
    fn missing_marker_keys_become_nan() {
        let enrol = table(
            Category::Enrolment,
            &["state", "district", "age_0_5"],
            &[&["NA", "null", "1"], &["A", "Na", "2"]],
        );
        let master = build_master_table(&[enrol]).unwrap();
        let keys: Vec<String> = master.records.iter().map(|r| r.key.to_string()).collect();
        // Markers are case-sensitive: "Na" is a district name.
        assert_eq!(keys, vec!["A/NA", "NAN/NAN"]);
    }

    #[test]
    fn numeric_keys_are_canonical() {
        let enrol = table(
            Category::Enrolment,
            &["state", "district", "age_0_5"],
            &[&["A", "007", "1"], &["A", "7.0", "2"], &["A", "Seven", "4"]],
        );
        let master = build_master_table(&[enrol]).unwrap();
        let keys: Vec<String> = master.records.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["A/7", "A/SEVEN"]);
        assert_eq!(master.records[0].total_enrol, 3.0);
    }

    #[test]
    fn header_lists_derived_fields_last() {
        let master = build_master_table(&[enrolment_pune()]).unwrap();
        assert_eq!(
            master.header(),
            vec![
                "state",
                "district",
                "age_0_5",
                "age_5_17",
                "age_18_greater",
                "total_enrol",
                "total_updates",
                "vulnerability_score"
            ]
        );
    }

    #[test]
    fn values_are_formatted() {
        assert_eq!(format_value(35.0), "35");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(7.0 / 36.0), "0.19444444444444445");
        assert_eq!(format_value(2.5), "2.5");
    }

    #[test]
    fn cells_are_coerced() {
        assert_eq!(Cell::parse(" 12 "), Cell::Number(12.0));
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("#N/A"), Cell::Missing);
        assert_eq!(Cell::parse("None"), Cell::Missing);
        assert_eq!(Cell::parse("inf"), Cell::Missing);
        assert_eq!(Cell::parse("NONE"), Cell::Text("NONE".to_string()));
        assert_eq!(Cell::parse("Pune"), Cell::Text("Pune".to_string()));
    }
}
