//! Run configuration, read once from a TOML file.
//!
//! ```toml
//! template_path = "Template Jan-4.xlsx"
//! data_folder = "Data"
//! output_folder = "Out"
//!
//! [[regions]]
//! sheet = "Tracker"
//! range = "A2:H100"
//!
//! [[regions]]
//! sheet = "Totals"
//! range = "B1"
//! formatting = false
//! conditional = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::batch::FolderSource;
use crate::region::{MergePlan, PlanError, RegionSpec};

/// Errors loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Everything one batch run needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyConfig {
    /// Workbook cloned for every output
    pub template_path: PathBuf,
    /// Folder holding one input workbook per entity
    pub data_folder: PathBuf,
    /// Folder receiving the assembled workbooks, named after their inputs
    pub output_folder: PathBuf,
    /// Input file extensions, matched case-insensitively
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Regions merged into every output, in order
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    /// Excel bridge settings
    #[serde(default)]
    pub excel: Option<ExcelSettings>,
}

/// A `[[regions]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    pub sheet: String,
    pub range: String,
    #[serde(default = "enabled")]
    pub formatting: bool,
    #[serde(default = "enabled")]
    pub conditional: bool,
}

/// The `[excel]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExcelSettings {
    /// Path to `tracker-forge-bridge.exe`
    pub bridge_exe: Option<PathBuf>,
    /// WINE executable, `wine` when unset
    pub wine: Option<PathBuf>,
    pub wine_prefix: Option<PathBuf>,
}

fn default_extensions() -> Vec<String> {
    vec!["xlsx".to_string(), "xlsm".to_string()]
}

fn enabled() -> bool {
    true
}

impl AssemblyConfig {
    /// Load a configuration file. Relative paths are taken relative to its folder.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Anchor every relative path at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        anchor(&mut self.template_path);
        anchor(&mut self.data_folder);
        anchor(&mut self.output_folder);
        if let Some(excel) = &mut self.excel {
            if let Some(exe) = &mut excel.bridge_exe {
                anchor(exe);
            }
            if let Some(prefix) = &mut excel.wine_prefix {
                anchor(prefix);
            }
        }
    }

    /// The validated merge plan.
    pub fn plan(&self) -> Result<MergePlan, PlanError> {
        let regions = self
            .regions
            .iter()
            .map(|r| -> Result<RegionSpec, PlanError> {
                Ok(RegionSpec::new(r.sheet.as_str(), &r.range)?
                    .with_formatting(r.formatting)
                    .with_conditional_formatting(r.conditional))
            })
            .collect::<Result<Vec<_>, _>>()?;
        MergePlan::new(regions)
    }

    /// The data folder as an input source.
    pub fn input_source(&self) -> FolderSource {
        FolderSource::new(&self.data_folder, self.extensions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TRACKER: &str = r#"
template_path = "Template Jan-4.xlsx"
data_folder = "Data"
output_folder = "/srv/trackers/out"

[[regions]]
sheet = "Tracker"
range = "A2:H100"

[[regions]]
sheet = "Tracker"
range = "J2:L100"
conditional = false

[[regions]]
sheet = "Totals"
range = "B1"
formatting = false
conditional = false
"#;

    #[test]
    fn test_defaults() {
        let config = AssemblyConfig::from_toml_str(TRACKER).unwrap();
        assert_eq!(config.extensions, vec!["xlsx", "xlsm"]);
        assert_eq!(config.excel, None);
        assert!(config.regions[0].formatting && config.regions[0].conditional);
    }

    #[test]
    fn test_plan_from_regions() {
        let plan = AssemblyConfig::from_toml_str(TRACKER).unwrap().plan().unwrap();
        let described: Vec<String> = plan.iter().map(ToString::to_string).collect();
        assert_eq!(
            described,
            vec![
                "Tracker!A2:H100 (with formatting and conditional formatting)",
                "Tracker!J2:L100 (with formatting)",
                "Totals!B1 (data only)",
            ]
        );
    }

    #[test]
    fn test_relative_paths_follow_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        fs::write(&path, format!("{TRACKER}\n[excel]\nbridge_exe = \"bin/bridge.exe\"\n")).unwrap();

        let config = AssemblyConfig::load(&path).unwrap();
        assert_eq!(config.template_path, dir.path().join("Template Jan-4.xlsx"));
        assert_eq!(config.data_folder, dir.path().join("Data"));
        assert_eq!(config.output_folder, PathBuf::from("/srv/trackers/out"));
        assert_eq!(
            config.excel.unwrap().bridge_exe,
            Some(dir.path().join("bin/bridge.exe"))
        );
    }

    #[test]
    fn test_unknown_keys_and_bad_ranges() {
        let typo = TRACKER.replace("output_folder", "output_dir");
        assert!(matches!(
            AssemblyConfig::from_toml_str(&typo),
            Err(ConfigError::Parse(_))
        ));

        let bad = TRACKER.replace("J2:L100", "J2:L100:M4");
        let config = AssemblyConfig::from_toml_str(&bad).unwrap();
        assert!(matches!(config.plan(), Err(PlanError::InvalidRange { .. })));
    }

    #[test]
    fn test_example_config() {
        let config =
            AssemblyConfig::from_toml_str(include_str!("../../../demos/tracker.example.toml"))
                .unwrap();
        let plan = config.plan().unwrap();
        assert_eq!(plan.len(), 6);
        assert_eq!(config.excel.unwrap().wine, Some(PathBuf::from("wine")));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AssemblyConfig::load(Path::new("/nonexistent/forge.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
