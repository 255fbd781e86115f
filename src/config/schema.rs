//! Configuration schema types
//!
//! Types deserialized from the volumes file (`volumes.yaml`) and the styles
//! file (`styles.yaml`). Mappings use `IndexMap` so that declaration order
//! survives deserialization: volumes are built in that order and style
//! rules are applied in that order.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Volumes File
// ============================================================================

/// Root of the volumes file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VolumesConfig {
    /// Volume name → volume settings, in declaration order.
    #[serde(default)]
    pub volumes: IndexMap<String, VolumeConfig>,

    /// Settings for the external conversion tools.
    #[serde(default)]
    pub export: ExportSettings,
}

impl VolumesConfig {
    /// Resolves every declared volume, in declaration order.
    #[must_use]
    pub fn resolved(&self) -> Vec<Volume> {
        self.volumes
            .iter()
            .map(|(name, config)| Volume::resolve(name, config))
            .collect()
    }

    /// Resolves a single volume by name.
    #[must_use]
    pub fn volume(&self, name: &str) -> Option<Volume> {
        self.volumes
            .get(name)
            .map(|config| Volume::resolve(name, config))
    }

    /// Configured volume names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.volumes.keys().map(String::as_str)
    }
}

/// Per-volume settings as written in the volumes file.
///
/// Every field is optional and falls back to the volume name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VolumeConfig {
    /// Display heading for the merged document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Source subdirectory under the input root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_name: Option<String>,

    /// Base name of the exported artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,

    /// Reference document handed to the converter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

/// A volume with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    /// Mapping key; also the base name of every intermediate document.
    pub name: String,
    /// Display heading.
    pub title: String,
    /// Source subdirectory.
    pub input_name: String,
    /// Artifact base name.
    pub output_name: String,
    /// Reference document, when the volume overrides the export default.
    pub template: Option<PathBuf>,
}

impl Volume {
    /// Applies defaults to a configured volume.
    #[must_use]
    pub fn resolve(name: &str, config: &VolumeConfig) -> Self {
        Self {
            name: name.to_string(),
            title: config.title.clone().unwrap_or_else(|| name.to_string()),
            input_name: config
                .input_name
                .clone()
                .unwrap_or_else(|| name.to_string()),
            output_name: config
                .output_name
                .clone()
                .unwrap_or_else(|| name.to_string()),
            template: config.template.clone(),
        }
    }

    /// File name used for this volume at every intermediate stage.
    #[must_use]
    pub fn document_file_name(&self) -> String {
        format!("{}.md", self.name)
    }
}

// ============================================================================
// Export Settings
// ============================================================================

/// One way of invoking an external tool.
///
/// Either a bare program name or path, or a full argv prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// `soffice`
    Program(String),
    /// `[soffice, --norestore]`
    Argv(Vec<String>),
}

impl CommandSpec {
    /// The argv prefix for this candidate.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        match self {
            Self::Program(program) => vec![program.clone()],
            Self::Argv(argv) => argv.clone(),
        }
    }

    /// The program part, if any.
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        match self {
            Self::Program(program) => Some(program.as_str()),
            Self::Argv(argv) => argv.first().map(String::as_str),
        }
    }
}

/// Settings for the external conversion tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExportSettings {
    /// Extension of the intermediate word-processor document.
    #[serde(default = "default_format")]
    pub format: String,

    /// Candidate invocations of the markdown converter, tried in order.
    #[serde(default = "default_converter")]
    pub converter: Vec<CommandSpec>,

    /// Candidate invocations of the office suite, tried in order.
    #[serde(default = "default_rasterizer")]
    pub rasterizer: Vec<CommandSpec>,

    /// Converter filter scripts, resolved against `filters_dir`.
    #[serde(default)]
    pub filters: Vec<String>,

    /// Directory holding the filter scripts.
    #[serde(default = "default_filters_dir")]
    pub filters_dir: PathBuf,

    /// Resource search path handed to the converter.
    #[serde(default = "default_resource_path")]
    pub resource_path: Option<PathBuf>,

    /// Extra converter arguments appended verbatim.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Per-invocation timeout, in `humantime` syntax (`90s`, `5m`).
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Reference document for volumes that do not name one.
    #[serde(default = "default_template")]
    pub default_template: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: default_format(),
            converter: default_converter(),
            rasterizer: default_rasterizer(),
            filters: Vec::new(),
            filters_dir: default_filters_dir(),
            resource_path: default_resource_path(),
            extra_args: Vec::new(),
            timeout: default_timeout(),
            default_template: default_template(),
        }
    }
}

impl ExportSettings {
    /// Parses the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns the `humantime` parse error if the value is malformed.
    pub fn timeout(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.timeout)
    }

    /// Template for `volume`, relative paths anchored at `base_dir`.
    #[must_use]
    pub fn template_for(&self, volume: &Volume, base_dir: &Path) -> PathBuf {
        let template = volume.template.as_ref().unwrap_or(&self.default_template);
        base_dir.join(template)
    }
}

fn default_format() -> String {
    "odt".to_string()
}

fn default_converter() -> Vec<CommandSpec> {
    vec![CommandSpec::Program("pandoc".to_string())]
}

fn default_rasterizer() -> Vec<CommandSpec> {
    vec![
        CommandSpec::Program("libreoffice".to_string()),
        CommandSpec::Program("soffice".to_string()),
        CommandSpec::Program(r"C:\Program Files\LibreOffice\program\soffice.exe".to_string()),
        CommandSpec::Program(
            r"C:\Program Files (x86)\LibreOffice\program\soffice.exe".to_string(),
        ),
    ]
}

fn default_filters_dir() -> PathBuf {
    PathBuf::from("filters")
}

#[allow(clippy::unnecessary_wraps)] // serde default for an optional field
fn default_resource_path() -> Option<PathBuf> {
    Some(PathBuf::from("resources"))
}

fn default_timeout() -> String {
    "5m".to_string()
}

fn default_template() -> PathBuf {
    PathBuf::from("templates/Default.ott")
}

// ============================================================================
// Styles File
// ============================================================================

/// Root of the styles file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Style name → rewrite rules, in declaration order.
    #[serde(default)]
    pub styles: IndexMap<String, StyleDefinition>,
}

/// A named group of rewrite rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleDefinition {
    /// Ordered (pattern, replacement) pairs.
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
}

/// One regex rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Regular expression, compiled in multi-line mode.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pattern: String,

    /// Substitution template; `\1` and `\g<name>` refer to capture groups.
    /// Left empty (or `~`), the rule is disabled.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub replacement: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_defaults_to_name() {
        let config: VolumesConfig = serde_yaml::from_str("volumes:\n  volume-001: {}\n").unwrap();
        let volume = config.volume("volume-001").unwrap();
        assert_eq!(volume.title, "volume-001");
        assert_eq!(volume.input_name, "volume-001");
        assert_eq!(volume.output_name, "volume-001");
        assert_eq!(volume.template, None);
        assert_eq!(volume.document_file_name(), "volume-001.md");
    }

    #[test]
    fn volumes_keep_declaration_order() {
        let yaml = "volumes:\n  zeta: {}\n  alpha: {}\n  mid: {}\n";
        let config: VolumesConfig = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<&str> = config.names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn export_defaults() {
        let settings = ExportSettings::default();
        assert_eq!(settings.format, "odt");
        assert_eq!(settings.converter[0].program(), Some("pandoc"));
        assert_eq!(settings.rasterizer.len(), 4);
        assert_eq!(settings.timeout().unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn command_spec_accepts_string_or_list() {
        let yaml = "rasterizer:\n  - soffice\n  - [flatpak, run, org.libreoffice.LibreOffice]\n";
        let settings: ExportSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.rasterizer[0], CommandSpec::Program("soffice".into()));
        assert_eq!(
            settings.rasterizer[1].argv(),
            vec!["flatpak", "run", "org.libreoffice.LibreOffice"]
        );
        assert_eq!(settings.rasterizer[1].program(), Some("flatpak"));
    }

    #[test]
    fn template_falls_back_to_default() {
        let settings = ExportSettings::default();
        let plain = Volume::resolve("v", &VolumeConfig::default());
        assert_eq!(
            settings.template_for(&plain, Path::new("/proj")),
            PathBuf::from("/proj/templates/Default.ott")
        );

        let custom = Volume::resolve(
            "v",
            &VolumeConfig {
                template: Some(PathBuf::from("templates/Deco.ott")),
                ..VolumeConfig::default()
            },
        );
        assert_eq!(
            settings.template_for(&custom, Path::new("/proj")),
            PathBuf::from("/proj/templates/Deco.ott")
        );
    }

    #[test]
    fn styles_keep_rule_order() {
        let yaml = r#"
styles:
  second:
    patterns:
      - pattern: "b"
        replacement: "c"
  first:
    patterns:
      - pattern: "a"
        replacement: "b"
"#;
        let config: StylesConfig = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<&String> = config.styles.keys().collect();
        assert_eq!(names, vec!["second", "first"]);
        assert_eq!(config.styles["first"].patterns[0].replacement, "b");
    }
}
