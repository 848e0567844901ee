pub use crate::config::*;

use crate::build_master_table;

/// A builder for collecting the records of all the categories.
///
/// It holds one table per category, and accepts rows in the raw textual form
/// in which they are read from the source files.
///
/// ```
/// pub use district_summary::builder::Builder;
/// pub use district_summary::Category;
/// # use district_summary::AggregationErrors;
///
/// let mut builder = Builder::new();
///
/// builder.add_record_simple(
///     Category::Enrolment,
///     &[(" State ", "Kerala"), ("district", "Idukki"), ("age_0_5", "4")],
/// )?;
/// builder.add_record_simple(
///     Category::Biometric,
///     &[("state", "KERALA"), ("district", "IDUKKI"), ("bio_age_5_17", "10")],
/// )?;
///
/// let master = builder.build()?;
/// assert_eq!(master.records[0].total_updates, 10.0);
/// assert_eq!(master.records[0].vulnerability_score, 2.0);
///
/// # Ok::<(), AggregationErrors>(())
/// ```
pub struct Builder {
    pub(crate) _tables: Vec<CategoryTable>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _tables: Category::ALL.iter().map(|c| CategoryTable::new(*c)).collect(),
        }
    }

    /// Adds a single record, given as (column, value) pairs.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_record_simple(
        &mut self,
        category: Category,
        fields: &[(&str, &str)],
    ) -> Result<(), AggregationErrors> {
        let headers: Vec<String> = fields.iter().map(|(h, _)| h.to_string()).collect();
        let row: Vec<String> = fields.iter().map(|(_, v)| v.to_string()).collect();
        self.add_rows(category, &headers, &[row]).map(|_| ())
    }

    /// Adds all the rows of one source file.
    ///
    /// headers: the first row of the file, before normalization.
    /// rows: the cells of each row, as text. Blank cells are treated as missing.
    ///
    /// Returns the number of rows added. If the source is rejected, nothing is added.
    pub fn add_rows(
        &mut self,
        category: Category,
        headers: &[String],
        rows: &[Vec<String>],
    ) -> Result<usize, AggregationErrors> {
        let cells: Vec<Vec<Cell>> = rows
            .iter()
            .map(|r| r.iter().map(|s| Cell::parse(s)).collect())
            .collect();
        self.add_cells(category, headers, &cells)
    }

    /// Same as `add_rows`, for sources that already carry typed cells.
    pub fn add_cells(
        &mut self,
        category: Category,
        headers: &[String],
        rows: &[Vec<Cell>],
    ) -> Result<usize, AggregationErrors> {
        self.table_mut(category).append(headers, rows)
    }

    pub fn table(&self, category: Category) -> Option<&CategoryTable> {
        self._tables.iter().find(|t| t.category == category)
    }

    fn table_mut(&mut self, category: Category) -> &mut CategoryTable {
        // Tables are stored in the order of Category::ALL.
        &mut self._tables[category as usize]
    }

    pub fn build(&self) -> Result<MasterTable, AggregationErrors> {
        build_master_table(&self._tables)
    }
}
