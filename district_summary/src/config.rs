// ********* Input data structures ***********

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::Display;

pub const STATE_COLUMN: &str = "state";
pub const DISTRICT_COLUMN: &str = "district";

/// The age-bracket counters that make up the enrolment volume.
pub const ENROLMENT_COUNTERS: [&str; 3] = ["age_0_5", "age_5_17", "age_18_greater"];

/// The age-bracket counters of the biometric and demographic updates.
pub const UPDATE_COUNTERS: [&str; 4] = [
    "bio_age_5_17",
    "bio_age_17_",
    "demo_age_5_17",
    "demo_age_17_",
];

pub const TOTAL_ENROL: &str = "total_enrol";
pub const TOTAL_UPDATES: &str = "total_updates";
pub const VULNERABILITY_SCORE: &str = "vulnerability_score";

/// The classes of input data.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Category {
    /// The anchor dataset. It defines the base row set of the master table.
    Enrolment,
    Biometric,
    Demographic,
}

impl Category {
    /// All the categories, in join order.
    pub const ALL: [Category; 3] = [
        Category::Enrolment,
        Category::Biometric,
        Category::Demographic,
    ];

    /// The keyword used to recognize the files of this category.
    pub fn keyword(&self) -> &'static str {
        match self {
            Category::Enrolment => "enrolment",
            Category::Biometric => "biometric",
            Category::Demographic => "demographic",
        }
    }

    /// Parses an explicit category tag. Tags are case-insensitive.
    pub fn from_tag(tag: &str) -> Option<Category> {
        let t = tag.trim().to_lowercase();
        Category::ALL.iter().find(|c| c.keyword() == t).cloned()
    }

    pub fn is_anchor(&self) -> bool {
        *self == Category::Enrolment
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// The content of a single cell, after best-effort type coercion.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    /// The column does not exist in the file, or the cell is blank.
    Missing,
    Number(f64),
    Text(String),
}

/// The cell values that stand for a missing value in the exports. The match is
/// case-sensitive.
pub const MISSING_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

impl Cell {
    /// Coerces a raw value. Blank cells, missing markers and non-finite numbers
    /// are missing.
    pub fn parse(raw: &str) -> Cell {
        let s = raw.trim();
        if s.is_empty() || MISSING_MARKERS.contains(&s) {
            return Cell::Missing;
        }
        match s.parse::<f64>() {
            Ok(x) if x.is_finite() => Cell::Number(x),
            Ok(_) => Cell::Missing,
            Err(_) => Cell::Text(s.to_string()),
        }
    }

    /// The textual form of the cell, used when the cell is a key.
    /// Missing values are written out as `nan`.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Missing => "nan".to_string(),
            Cell::Number(x) => format_value(*x),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// Renders a value for the output files.
///
/// Integral values do not carry a fractional part, everything else uses the
/// shortest representation that reads back to the same float.
pub fn format_value(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// The aggregation and join key: a (state, district) pair, uppercased and trimmed.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct DistrictKey {
    pub state: String,
    pub district: String,
}

impl DistrictKey {
    pub fn new(state: &str, district: &str) -> DistrictKey {
        DistrictKey {
            state: state.to_uppercase().trim().to_string(),
            district: district.to_uppercase().trim().to_string(),
        }
    }

    pub fn from_cells(state: &Cell, district: &Cell) -> DistrictKey {
        DistrictKey::new(&state.to_text(), &district.to_text())
    }
}

impl Display for DistrictKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.state, self.district)
    }
}

/// One row of a source file.
///
/// Only the columns present in the source file are recorded: the other
/// columns of the category are missing for this row.
#[derive(PartialEq, Debug, Clone)]
pub struct RawRecord {
    pub key: DistrictKey,
    pub cells: HashMap<String, Cell>,
}

/// All the records of one category, unioned by column name.
#[derive(PartialEq, Debug, Clone)]
pub struct CategoryTable {
    pub category: Category,
    /// The non-key columns, in order of first appearance.
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

// ******** Output data structures *********

/// A category table grouped by district, with all its numeric columns summed.
/// There is exactly one row per key.
#[derive(PartialEq, Debug, Clone)]
pub struct AggregatedTable {
    pub category: Category,
    pub columns: Vec<String>,
    pub rows: BTreeMap<DistrictKey, Vec<f64>>,
}

/// A row of the master table.
#[derive(PartialEq, Debug, Clone)]
pub struct MasterRecord {
    pub key: DistrictKey,
    /// The summed values, in the order of `MasterTable::columns`.
    pub values: Vec<f64>,
    pub total_enrol: f64,
    pub total_updates: f64,
    pub vulnerability_score: f64,
}

/// The final per-district table.
#[derive(PartialEq, Debug, Clone)]
pub struct MasterTable {
    /// The summed numeric columns from all the categories.
    pub columns: Vec<String>,
    pub records: Vec<MasterRecord>,
}

impl MasterTable {
    /// The header of the serialized table: key, summed columns, then the derived fields.
    pub fn header(&self) -> Vec<String> {
        let mut h = vec![STATE_COLUMN.to_string(), DISTRICT_COLUMN.to_string()];
        h.extend(self.columns.iter().cloned());
        h.push(TOTAL_ENROL.to_string());
        h.push(TOTAL_UPDATES.to_string());
        h.push(VULNERABILITY_SCORE.to_string());
        h
    }

    /// The value of a summed column for a record, if the column exists.
    pub fn value(&self, record: &MasterRecord, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| record.values.get(idx).cloned())
    }

    pub fn get(&self, key: &DistrictKey) -> Option<&MasterRecord> {
        self.records.iter().find(|r| r.key == *key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Errors that prevent the aggregation from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AggregationErrors {
    /// The enrolment category has no usable row.
    MissingAnchorCategory,
    /// A source has no `state` or no `district` column.
    MissingKeyColumn(String),
    /// A row has more cells than the header.
    RowTooLong { lineno: usize },
}

impl Error for AggregationErrors {}

impl Display for AggregationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationErrors::MissingAnchorCategory => {
                write!(f, "enrolment data is missing, the analysis cannot continue")
            }
            AggregationErrors::MissingKeyColumn(c) => write!(f, "missing key column {:?}", c),
            AggregationErrors::RowTooLong { lineno } => {
                write!(f, "row {} has more cells than the header", lineno)
            }
        }
    }
}
