use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ExtractionPolicy, PageMargins, TraceLabelPolicy};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub parsing: Option<ParsingSection>,
    pub export: Option<ExportSection>,
    pub display: Option<DisplaySection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingSection {
    /// Requirement id prefix, e.g. `RCM_SW` for `RCM_SW-123`.
    pub requirement_prefix: Option<String>,
    /// Full regex for requirement ids; takes precedence over the prefix.
    pub requirement_pattern: Option<String>,
    pub strip_trailing_trace_artifact: Option<bool>,
    pub trace_label: Option<TraceLabelPolicy>,
    pub keep_leading_record: Option<bool>,
    /// Fraction of PDF page height at the top to ignore (running headers).
    pub header_exclusion: Option<f32>,
    /// Fraction of PDF page height at the bottom to ignore (page footers).
    pub footer_exclusion: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSection {
    pub explode: Option<bool>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplaySection {
    pub color: Option<bool>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigFile {
    /// Resolve the extraction policy, falling back to defaults for unset keys.
    pub fn extraction_policy(&self) -> ExtractionPolicy {
        let defaults = ExtractionPolicy::default();
        let parsing = self.parsing.as_ref();
        ExtractionPolicy {
            strip_trailing_trace_artifact: parsing
                .and_then(|p| p.strip_trailing_trace_artifact)
                .unwrap_or(defaults.strip_trailing_trace_artifact),
            explode_on_export: self
                .export
                .as_ref()
                .and_then(|e| e.explode)
                .unwrap_or(defaults.explode_on_export),
            trace_label: parsing
                .and_then(|p| p.trace_label)
                .unwrap_or(defaults.trace_label),
            keep_leading_record: parsing
                .and_then(|p| p.keep_leading_record)
                .unwrap_or(defaults.keep_leading_record),
        }
    }

    /// Header/footer exclusion for PDF backends; unset keys disable it.
    pub fn page_margins(&self) -> PageMargins {
        let parsing = self.parsing.as_ref();
        PageMargins {
            header: parsing.and_then(|p| p.header_exclusion).unwrap_or(0.0),
            footer: parsing.and_then(|p| p.footer_exclusion).unwrap_or(0.0),
        }
    }
}

/// Platform config directory path: `<config_dir>/tracematrix/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tracematrix").join("config.toml"))
}

/// Load config by cascading CWD `.tracematrix.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".tracematrix.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Load a config the user pointed at explicitly. Unlike [`load_from_path`],
/// a missing or malformed file is an error.
pub fn load_explicit(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_parsing = base.parsing.unwrap_or_default();
    let overlay_parsing = overlay.parsing.unwrap_or_default();
    let base_export = base.export.unwrap_or_default();
    let overlay_export = overlay.export.unwrap_or_default();
    let base_display = base.display.unwrap_or_default();
    let overlay_display = overlay.display.unwrap_or_default();

    ConfigFile {
        parsing: Some(ParsingSection {
            requirement_prefix: overlay_parsing
                .requirement_prefix
                .or(base_parsing.requirement_prefix),
            requirement_pattern: overlay_parsing
                .requirement_pattern
                .or(base_parsing.requirement_pattern),
            strip_trailing_trace_artifact: overlay_parsing
                .strip_trailing_trace_artifact
                .or(base_parsing.strip_trailing_trace_artifact),
            trace_label: overlay_parsing.trace_label.or(base_parsing.trace_label),
            keep_leading_record: overlay_parsing
                .keep_leading_record
                .or(base_parsing.keep_leading_record),
            header_exclusion: overlay_parsing
                .header_exclusion
                .or(base_parsing.header_exclusion),
            footer_exclusion: overlay_parsing
                .footer_exclusion
                .or(base_parsing.footer_exclusion),
        }),
        export: Some(ExportSection {
            explode: overlay_export.explode.or(base_export.explode),
            format: overlay_export.format.or(base_export.format),
        }),
        display: Some(DisplaySection {
            color: overlay_display.color.or(base_display.color),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_config_deserializes() {
        let toml_str = "[parsing]\nrequirement_prefix = \"ABC_SYS\"\ntrace_label = \"ends-scenario\"\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let parsing = parsed.parsing.unwrap();
        assert_eq!(parsing.requirement_prefix.as_deref(), Some("ABC_SYS"));
        assert_eq!(parsing.trace_label, Some(TraceLabelPolicy::EndsScenario));
        assert!(parsing.requirement_pattern.is_none());
        assert!(parsed.export.is_none());
    }

    #[test]
    fn policy_defaults_when_unset() {
        let policy = ConfigFile::default().extraction_policy();
        assert_eq!(policy, ExtractionPolicy::default());
    }

    #[test]
    fn policy_reads_sections() {
        let toml_str = "[parsing]\nstrip_trailing_trace_artifact = false\nkeep_leading_record = false\n[export]\nexplode = true\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let policy = parsed.extraction_policy();
        assert!(!policy.strip_trailing_trace_artifact);
        assert!(!policy.keep_leading_record);
        assert!(policy.explode_on_export);
        assert_eq!(policy.trace_label, TraceLabelPolicy::Marker);
    }

    #[test]
    fn page_margins_from_parsing_section() {
        assert_eq!(ConfigFile::default().page_margins(), PageMargins::default());

        let toml_str = "[parsing]\nfooter_exclusion = 0.08\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let margins = parsed.page_margins();
        assert_eq!(margins.header, 0.0);
        assert_eq!(margins.footer, 0.08);
    }

    #[test]
    fn merge_keeps_base_margins() {
        let base = ConfigFile {
            parsing: Some(ParsingSection {
                header_exclusion: Some(0.1),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            parsing: Some(ParsingSection {
                footer_exclusion: Some(0.05),
                ..Default::default()
            }),
            ..Default::default()
        };
        let margins = merge(base, overlay).page_margins();
        assert_eq!(margins, PageMargins { header: 0.1, footer: 0.05 });
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            parsing: Some(ParsingSection {
                requirement_prefix: Some("BASE".to_string()),
                keep_leading_record: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            parsing: Some(ParsingSection {
                requirement_prefix: Some("OVERLAY".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let parsing = merged.parsing.unwrap();
        assert_eq!(parsing.requirement_prefix.as_deref(), Some("OVERLAY"));
        assert_eq!(parsing.keep_leading_record, Some(false));
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            display: Some(DisplaySection { color: Some(false) }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.display.unwrap().color, Some(false));
    }

    #[test]
    fn load_from_path_ignores_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is = = not toml").unwrap();
        assert!(load_from_path(file.path()).is_none());
    }

    #[test]
    fn load_explicit_reports_errors() {
        let missing = load_explicit(Path::new("/no/such/tracematrix.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[parsing\n").unwrap();
        assert!(matches!(
            load_explicit(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn load_explicit_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[export]\nformat = \"markdown\"\n").unwrap();
        let config = load_explicit(file.path()).unwrap();
        assert_eq!(config.export.unwrap().format.as_deref(), Some("markdown"));
    }
}
