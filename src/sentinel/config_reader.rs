use crate::sentinel::*;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Relative to the directory of the configuration file.
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub category: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "worksheetName")]
    pub worksheet_name: Option<String>,
}

impl FileSource {
    pub fn category(&self) -> SentinelResult<Category> {
        Category::from_tag(&self.category).context(UnknownCategorySnafu {
            tag: self.category.clone(),
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    pub sources: Vec<FileSource>,
}

pub fn read_config(path: &str) -> SentinelResult<SentinelConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SentinelConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Resolves the sources and the output file against the directory of the configuration file.
pub fn resolve_sources(
    config: &SentinelConfig,
    config_path: &str,
) -> SentinelResult<(Vec<SourceFile>, Option<PathBuf>)> {
    let root_p = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu { path: config_path })?;

    let mut sources: Vec<SourceFile> = Vec::new();
    for cfs in config.sources.iter() {
        let category = cfs.category()?;
        let p: PathBuf = root_p.join(&cfs.file_path);
        info!("Configured {} source {:?}", category, p);
        sources.push(SourceFile {
            category,
            path: p,
            worksheet: cfs.worksheet_name.clone(),
        });
    }

    let out = config
        .output_settings
        .as_ref()
        .and_then(|os| os.output_file.as_ref())
        .map(|f| root_p.join(f));
    Ok((sources, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sources() {
        let config: SentinelConfig = serde_json::from_str(
            r#"{
                "outputSettings": { "outputFile": "summary.csv" },
                "sources": [
                    { "category": "demographic", "filePath": "d/updates.xlsx", "worksheetName": "demo" },
                    { "category": "ENROLMENT", "filePath": "e.csv" }
                ]
            }"#,
        )
        .unwrap();
        let (sources, out) = resolve_sources(&config, "/data/run/sentinel.json").unwrap();
        assert_eq!(out, Some(PathBuf::from("/data/run/summary.csv")));
        assert_eq!(
            sources,
            vec![
                SourceFile {
                    category: Category::Demographic,
                    path: PathBuf::from("/data/run/d/updates.xlsx"),
                    worksheet: Some("demo".to_string()),
                },
                SourceFile {
                    category: Category::Enrolment,
                    path: PathBuf::from("/data/run/e.csv"),
                    worksheet: None,
                },
            ]
        );
    }

    #[test]
    fn output_settings_are_optional() {
        let config: SentinelConfig =
            serde_json::from_str(r#"{ "sources": [] }"#).unwrap();
        let (sources, out) = resolve_sources(&config, "sentinel.json").unwrap();
        assert!(sources.is_empty());
        assert_eq!(out, None);
    }
}
