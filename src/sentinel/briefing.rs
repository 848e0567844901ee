//! Read side of the summary table: the figures shown to the people acting on it.

use std::fmt::Display;
use std::time::SystemTime;

use crate::sentinel::*;

/// The number of districts listed as priority nodes.
pub const PRIORITY_COUNT: usize = 5;
/// Above this maintenance index, the system is considered stable.
pub const STABLE_INDEX_THRESHOLD: f64 = 100.0;
pub const NO_DATA_MESSAGE: &str = "No data available for the selected filters.";

/// Loads the summary table once, and again only when the file changes.
///
/// The file is considered changed when its modification time differs from the one
/// seen at the last load. `invalidate` forces a reload on the next access.
#[derive(Debug)]
pub struct MasterCache {
    path: PathBuf,
    loaded: Option<(SystemTime, MasterTable)>,
    loads: usize,
}

impl MasterCache {
    pub fn new(path: &Path) -> MasterCache {
        MasterCache {
            path: path.to_path_buf(),
            loaded: None,
            loads: 0,
        }
    }

    pub fn get(&mut self) -> SentinelResult<&MasterTable> {
        let modified = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .context(MasterMetadataSnafu {
                path: self.path.display().to_string(),
            })?;
        let entry = match self.loaded.take() {
            Some((seen, table)) if seen == modified => (seen, table),
            _ => {
                let table = io_csv::read_master_csv(&self.path)?;
                self.loads += 1;
                info!(
                    "Loaded {} districts from {} (load #{})",
                    table.len(),
                    self.path.display(),
                    self.loads
                );
                (modified, table)
            }
        };
        let (_, table) = self.loaded.insert(entry);
        Ok(table)
    }

    pub fn invalidate(&mut self) {
        debug!("invalidate: {}", self.path.display());
        self.loaded = None;
    }

    /// The number of times the file has been read.
    pub fn loads(&self) -> usize {
        self.loads
    }
}

/// A selection of districts: everything, one state, or one district of a state.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Selection {
    pub state: Option<String>,
    pub district: Option<String>,
}

impl Selection {
    /// The names are normalized like the keys. A district without a state is ignored.
    pub fn new(state: Option<&str>, district: Option<&str>) -> Selection {
        let state = state.map(|s| s.to_uppercase().trim().to_string());
        let district = match state {
            Some(_) => district.map(|d| d.to_uppercase().trim().to_string()),
            None => None,
        };
        Selection { state, district }
    }

    pub fn matches(&self, key: &DistrictKey) -> bool {
        self.state.as_ref().map_or(true, |s| *s == key.state)
            && self.district.as_ref().map_or(true, |d| *d == key.district)
    }

    pub fn apply<'a>(&self, table: &'a MasterTable) -> Vec<&'a MasterRecord> {
        table
            .records
            .iter()
            .filter(|r| self.matches(&r.key))
            .collect()
    }

    pub fn label(&self) -> String {
        match (&self.state, &self.district) {
            (_, Some(d)) => d.clone(),
            (Some(s), None) => s.clone(),
            (None, None) => "Nationwide".to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SystemHealth {
    Stable,
    Critical,
}

impl Display for SystemHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemHealth::Stable => write!(f, "Stable"),
            SystemHealth::Critical => write!(f, "Critical"),
        }
    }
}

/// The headline figures of a selection.
#[derive(PartialEq, Debug, Clone)]
pub struct Headline {
    pub districts_analyzed: usize,
    /// Total number of updates.
    pub service_volume: u64,
    /// Mean vulnerability score, rounded to 2 decimals. None for an empty selection.
    pub maintenance_index: Option<f64>,
    pub system_health: SystemHealth,
}

pub fn headline(records: &[&MasterRecord]) -> Headline {
    let service_volume: f64 = records.iter().map(|r| r.total_updates).sum();
    let maintenance_index = if records.is_empty() {
        None
    } else {
        let mean =
            records.iter().map(|r| r.vulnerability_score).sum::<f64>() / records.len() as f64;
        Some((mean * 100.0).round() / 100.0)
    };
    let system_health = match maintenance_index {
        Some(x) if x > STABLE_INDEX_THRESHOLD => SystemHealth::Stable,
        _ => SystemHealth::Critical,
    };
    Headline {
        districts_analyzed: records.len(),
        service_volume: service_volume as u64,
        maintenance_index,
        system_health,
    }
}

/// The districts with the lowest vulnerability scores, lowest first.
pub fn priority_nodes<'a>(records: &[&'a MasterRecord], count: usize) -> Vec<&'a MasterRecord> {
    let mut sorted: Vec<&MasterRecord> = records.to_vec();
    sorted.sort_by(|a, b| a.vulnerability_score.total_cmp(&b.vulnerability_score));
    sorted.truncate(count);
    sorted
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Recommendation {
    pub district: String,
    pub warning: String,
    pub response: String,
}

/// The recommended action for the district with the lowest vulnerability score.
pub fn recommend(records: &[&MasterRecord]) -> Option<Recommendation> {
    let priority = priority_nodes(records, 1).into_iter().next()?;
    Some(Recommendation {
        district: priority.key.district.clone(),
        warning: format!(
            "High Priority: District {} is identified as a primary exclusion risk.",
            priority.key.district
        ),
        response: "Recommended Response: Deploy 2 Mobile Aadhaar Units to this district to \
                   facilitate Mandatory Biometric Updates (MBU) for the 5-15 age cohort."
            .to_string(),
    })
}

/// Writes the selected rows to a new file, unchanged.
pub fn export_selection(
    path: &Path,
    table: &MasterTable,
    records: &[&MasterRecord],
) -> SentinelResult<usize> {
    let subset = MasterTable {
        columns: table.columns.clone(),
        records: records.iter().map(|r| (*r).clone()).collect(),
    };
    let contents = io_csv::render_master_csv(&subset)?;
    fs::write(path, contents).context(WriteFailureSnafu {
        path: path.display().to_string(),
    })?;
    Ok(subset.len())
}

fn print_briefing(selection: &Selection, records: &[&MasterRecord]) {
    let h = headline(records);
    println!("Briefing: {}", selection.label());
    println!("  Districts analyzed: {}", h.districts_analyzed);
    println!("  Service volume:     {}", h.service_volume);
    match h.maintenance_index {
        Some(x) => println!("  Maintenance index:  {:.2}", x),
        None => println!("  Maintenance index:  n/a"),
    }
    println!("  System health:      {}", h.system_health);

    println!("Top priority nodes:");
    for r in priority_nodes(records, PRIORITY_COUNT) {
        println!(
            "  {:<30} {}",
            r.key.district,
            format_value(r.vulnerability_score)
        );
    }

    match recommend(records) {
        Some(rec) => {
            println!("{}", rec.warning);
            println!("{}", rec.response);
        }
        None => println!("{}", NO_DATA_MESSAGE),
    }
}

/// Prints the briefing for a selection of the summary table, and optionally exports the
/// selected rows.
pub fn run_briefing(
    cache: &mut MasterCache,
    selection: &Selection,
    export: Option<&Path>,
) -> SentinelResult<usize> {
    let table = cache.get()?;
    let records = selection.apply(table);
    info!(
        "run_briefing: {:?} selects {} of {} districts",
        selection,
        records.len(),
        table.len()
    );
    print_briefing(selection, &records);
    if let Some(p) = export {
        let n = export_selection(p, table, &records)?;
        println!("Exported {} districts to {}", n, p.display());
    }
    Ok(records.len())
}
