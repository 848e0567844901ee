use log::{debug, info, warn};

use district_summary::builder::Builder;
use district_summary::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use text_diff::print_diff;

pub mod briefing;
pub mod collector;
pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;

use crate::sentinel::collector::SourceFile;
use crate::sentinel::config_reader::*;
use crate::sentinel::io_common::{simplify_file_name, RawSheet};

/// The name of the summary table, written in the root directory by default.
pub const DEFAULT_OUTPUT_FILE: &str = "processed_aadhaar_data.csv";

#[derive(Debug, Snafu)]
pub enum SentinelError {
    #[snafu(display("No input data: no CSV file found under {root}"))]
    NoInputFound { root: String },

    #[snafu(display("Could not read {path}: {source}"))]
    UnparseableFile {
        path: String,
        #[snafu(source(from(SentinelError, Box::new)))]
        source: Box<SentinelError>,
    },

    #[snafu(display("Enrolment data is missing. Analysis cannot continue."))]
    MissingAnchorCategory {},

    #[snafu(display("No usable {category} data, the category is left out"))]
    MissingOptionalCategory { category: Category },

    #[snafu(display("Could not write {path}: {source}"))]
    WriteFailure {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("Error opening file {path}: {source}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno}: {source}"))]
    CsvLineParse { source: csv::Error, lineno: u64 },
    #[snafu(display("Error serializing the summary table: {source}"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Error flushing the summary table"))]
    CsvFlush { source: std::io::Error },
    #[snafu(display("The file has no header row"))]
    EmptyFile {},
    #[snafu(display("Unsupported file type {extension:?}"))]
    UnsupportedFormat { extension: String },

    #[snafu(display("Error opening file {path}: {source}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook has no worksheet"))]
    EmptyExcel {},
    #[snafu(display("The workbook has no worksheet named {name:?}"))]
    MissingWorksheet { name: String },

    #[snafu(display("{source}"))]
    RejectedSource { source: AggregationErrors },
    #[snafu(display("Aggregation failed: {source}"))]
    Aggregation { source: AggregationErrors },

    #[snafu(display("Invalid search pattern"))]
    GlobPattern { source: glob::PatternError },

    #[snafu(display("Error opening configuration file {path}: {source}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the configuration file: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Unknown category {tag:?} (expected enrolment, biometric or demographic)"))]
    UnknownCategory { tag: String },
    #[snafu(display("Cannot find the parent directory of {path}"))]
    MissingParentDir { path: String },

    #[snafu(display("Error opening reference file {path}: {source}"))]
    OpeningReference {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between the summary table and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(display("Cannot access the summary table {path}, run the pipeline first"))]
    MasterMetadata {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Malformed summary table {path}: {message}"))]
    MasterFormat { path: String, message: String },
}

pub type SentinelResult<T> = Result<T, SentinelError>;

/// The settings of one run of the pipeline.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunSettings {
    /// The directory searched for input files.
    pub root: PathBuf,
    /// Overrides the output location.
    pub out: Option<PathBuf>,
    /// A configuration file with explicit sources.
    pub config: Option<String>,
    /// A reference table to compare the output with.
    pub reference: Option<String>,
}

impl RunSettings {
    pub fn new(root: &Path) -> RunSettings {
        RunSettings {
            root: root.to_path_buf(),
            out: None,
            config: None,
            reference: None,
        }
    }
}

/// What a successful run did.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub districts: usize,
    pub files_read: usize,
    pub files_skipped: usize,
}

fn read_source(source: &SourceFile) -> SentinelResult<RawSheet> {
    let extension = source
        .path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    debug!("read_source: {:?} ({})", source.path, extension);
    match extension.as_str() {
        "csv" => io_csv::read_csv_table(&source.path),
        "xlsx" | "xlsm" => io_excel::read_excel_table(&source.path, source.worksheet.as_deref()),
        x => UnsupportedFormatSnafu { extension: x }.fail(),
    }
}

// Loads one file into the builder. The file is either fully added or not at all.
fn load_source(builder: &mut Builder, source: &SourceFile) -> SentinelResult<usize> {
    let sheet = read_source(source)?;
    builder
        .add_cells(source.category, &sheet.headers, &sheet.rows)
        .context(RejectedSourceSnafu {})
}

/// Finds the sources and where the summary table goes.
fn plan_sources(settings: &RunSettings) -> SentinelResult<(Vec<SourceFile>, PathBuf)> {
    let default_out = settings.root.join(DEFAULT_OUTPUT_FILE);
    match &settings.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let (sources, configured_out) = resolve_sources(&config, config_path)?;
            ensure!(
                !sources.is_empty(),
                NoInputFoundSnafu {
                    root: config_path.clone()
                }
            );
            println!("Using {} configured sources.", sources.len());
            let out = settings
                .out
                .clone()
                .or(configured_out)
                .unwrap_or(default_out);
            Ok((sources, out))
        }
        None => {
            let out = settings.out.clone().unwrap_or(default_out);
            let files = collector::discover_files(&settings.root, &out)?;
            println!("Found {} files across your folders.", files.len());
            ensure!(
                !files.is_empty(),
                NoInputFoundSnafu {
                    root: settings.root.display().to_string()
                }
            );
            Ok((collector::assign_by_keyword(&settings.root, &files), out))
        }
    }
}

/// Runs the whole pipeline: discovery, loading, aggregation, metrics and writing.
///
/// Unreadable files are skipped with a warning. All the other failures stop the run, and
/// nothing is written if the run stops before the writing stage.
pub fn run_pipeline(settings: &RunSettings) -> SentinelResult<RunReport> {
    println!("Starting data processing...");
    info!("run_pipeline: settings: {:?}", settings);
    let (sources, out) = plan_sources(settings)?;

    let mut builder = Builder::new();
    let mut files_read = 0;
    let mut files_skipped = 0;
    for category in Category::ALL.iter() {
        let category_sources: Vec<&SourceFile> =
            sources.iter().filter(|s| s.category == *category).collect();
        if category_sources.is_empty() {
            println!("No files found for: {}", category);
        } else {
            println!(
                "Processing {} data from {} files...",
                category,
                category_sources.len()
            );
        }
        for source in category_sources {
            let path = source.path.display().to_string();
            match load_source(&mut builder, source).context(UnparseableFileSnafu { path }) {
                Ok(n) => {
                    info!("Read {} rows from {}", n, simplify_file_name(&source.path));
                    files_read += 1;
                }
                Err(e) => {
                    warn!("{}", e);
                    println!("Could not read {}, skipping it.", source.path.display());
                    files_skipped += 1;
                }
            }
        }
    }

    for category in Category::ALL.iter() {
        let empty = builder.table(*category).map_or(true, |t| t.is_empty());
        if empty && category.is_anchor() {
            return MissingAnchorCategorySnafu {}.fail();
        }
        if empty {
            let e = MissingOptionalCategorySnafu {
                category: *category,
            }
            .build();
            warn!("{}", e);
        }
    }

    println!("Merging datasets into a master record...");
    let master = match builder.build() {
        Ok(m) => m,
        Err(AggregationErrors::MissingAnchorCategory) => {
            return MissingAnchorCategorySnafu {}.fail();
        }
        Err(e) => return Err(e).context(AggregationSnafu {}),
    };

    let contents = io_csv::render_master_csv(&master)?;
    fs::write(&out, &contents).context(WriteFailureSnafu {
        path: out.display().to_string(),
    })?;
    println!(
        "SUCCESS: '{}' created with {} districts.",
        out.display(),
        master.len()
    );

    if let Some(reference) = &settings.reference {
        check_reference(reference, &contents)?;
    }

    Ok(RunReport {
        output: out,
        districts: master.len(),
        files_read,
        files_skipped,
    })
}

/// Compares the produced table with a reference table, line by line.
fn check_reference(reference_path: &str, contents: &[u8]) -> SentinelResult<()> {
    let reference = fs::read_to_string(reference_path).context(OpeningReferenceSnafu {
        path: reference_path,
    })?;
    let produced = String::from_utf8_lossy(contents);
    if reference != produced {
        warn!("Found differences with the reference table");
        print_diff(reference.as_str(), produced.as_ref(), "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("The summary table matches the reference {}", reference_path);
    Ok(())
}
