// Discovery of the input files and assignment to categories.

use glob::{glob_with, MatchOptions, Pattern};

use crate::sentinel::*;

/// The extensions of the files considered as tabular data.
pub const TABULAR_EXTENSIONS: [&str; 2] = ["csv", "xlsx"];

/// A file to load, with the category it contributes to.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceFile {
    pub category: Category,
    pub path: PathBuf,
    /// For Excel-based inputs, the name of the worksheet. The first one by default.
    pub worksheet: Option<String>,
}

/// Finds all the tabular files under the root directory, recursively.
///
/// A missing root directory yields no file. The output file is left out, as well as
/// any file whose name contains the stem of the default output file, so that a
/// previous output is never read back. The paths are returned sorted.
pub fn discover_files(root: &Path, output: &Path) -> SentinelResult<Vec<PathBuf>> {
    if !root.is_dir() {
        warn!("discover_files: {} is not a directory", root.display());
        return Ok(vec![]);
    }
    let default_stem = Path::new(DEFAULT_OUTPUT_FILE)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let output_c = output.canonicalize().ok();
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let escaped_root = Pattern::escape(&root.display().to_string());

    let mut res: Vec<PathBuf> = Vec::new();
    for extension in TABULAR_EXTENSIONS.iter() {
        let pattern = format!("{}/**/*.{}", escaped_root, extension);
        debug!("discover_files: pattern {}", pattern);
        for entry in glob_with(&pattern, options).context(GlobPatternSnafu {})? {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!("discover_files: skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let name = simplify_file_name(&path).to_lowercase();
            let is_output = output_c.is_some() && path.canonicalize().ok() == output_c;
            if is_output || name.contains(&default_stem) {
                debug!("discover_files: skipping previous output {}", path.display());
                continue;
            }
            res.push(path);
        }
    }
    res.sort();
    res.dedup();
    info!("discover_files: {} files under {}", res.len(), root.display());
    Ok(res)
}

/// Assigns the files to the categories whose keyword appears in their path.
///
/// The match is done on the path relative to the root, without case sensitivity.
/// A file matching several keywords is assigned to every one of them. This
/// is ambiguous, and flagged with a warning.
pub fn assign_by_keyword(root: &Path, files: &[PathBuf]) -> Vec<SourceFile> {
    let mut res: Vec<SourceFile> = Vec::new();
    for category in Category::ALL.iter() {
        for path in files.iter() {
            if path_matches(root, path, *category) {
                res.push(SourceFile {
                    category: *category,
                    path: path.clone(),
                    worksheet: None,
                });
            }
        }
    }

    for path in files.iter() {
        let matched: Vec<String> = Category::ALL
            .iter()
            .filter(|c| path_matches(root, path, **c))
            .map(|c| c.to_string())
            .collect();
        match matched.len() {
            0 => debug!("assign_by_keyword: {} matches no category", path.display()),
            1 => {}
            _ => warn!(
                "{} matches several categories ({}), it is used for each of them. \
                 Use a configuration file with explicit categories to resolve this.",
                path.display(),
                matched.join(", ")
            ),
        }
    }
    res
}

fn path_matches(root: &Path, path: &Path, category: Category) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .to_string_lossy()
        .to_lowercase()
        .contains(category.keyword())
}
