//! Configuration validation
//!
//! Semantic checks run on the deserialized volumes and styles files.
//! Validation collects ALL issues (doesn't stop at first) to provide
//! comprehensive feedback to users.

use crate::config::loader::ConfigLimits;
use crate::config::schema::{CommandSpec, StylesConfig, Volume, VolumesConfig};
use crate::error::{Severity, ValidationIssue};
use crate::transform::styles::compile_rule;

use std::collections::HashMap;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a volumes file.
    pub fn validate_volumes(
        &mut self,
        config: &VolumesConfig,
        limits: &ConfigLimits,
    ) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_volume_entries(config, limits);
        self.validate_export(config);

        self.finish()
    }

    /// Validates a styles file.
    ///
    /// Compiles every pattern so that broken rules are reported up front;
    /// the pipeline skips them at run time either way.
    pub fn validate_styles(&mut self, config: &StylesConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        if config.styles.is_empty() {
            self.add_error("styles", "No styles defined");
        }

        for (style_name, style) in &config.styles {
            let base = format!("styles.{style_name}");
            if style.patterns.is_empty() {
                self.add_warning(&base, "Style has no patterns");
            }
            for (i, rule) in style.patterns.iter().enumerate() {
                let path = format!("{base}.patterns[{i}]");
                if rule.pattern.is_empty() {
                    self.add_warning(&path, "Empty pattern, rule will be skipped");
                    continue;
                }
                if let Err(e) = compile_rule(style_name, rule) {
                    self.add_warning(&path, &format!("{e}, rule will be skipped"));
                }
            }
        }

        self.finish()
    }

    // ========================================================================
    // Volumes
    // ========================================================================

    fn validate_volume_entries(&mut self, config: &VolumesConfig, limits: &ConfigLimits) {
        if config.volumes.is_empty() {
            self.add_error("volumes", "No volumes found in configuration");
            return;
        }

        if config.volumes.len() > limits.max_volumes {
            self.add_error(
                "volumes",
                &format!(
                    "Too many volumes: {} (limit {})",
                    config.volumes.len(),
                    limits.max_volumes
                ),
            );
        }

        let mut output_names: HashMap<String, &str> = HashMap::new();
        let mut input_names: HashMap<String, &str> = HashMap::new();

        for (name, volume_config) in &config.volumes {
            let volume = Volume::resolve(name, volume_config);
            let path = format!("volumes.{name}");

            if name.trim().is_empty() {
                self.add_error(&path, "Volume name cannot be empty");
            }
            if name.contains(['/', '\\']) {
                self.add_error(&path, "Volume name cannot contain a path separator");
            }
            if volume.title.trim().is_empty() {
                self.add_warning(&format!("{path}.title"), "Volume title is empty");
            }

            if let Some(previous) = output_names.get(&volume.output_name) {
                self.add_warning(
                    &format!("{path}.output_name"),
                    &format!(
                        "Output name '{}' is also used by volume '{previous}'",
                        volume.output_name
                    ),
                );
            } else {
                output_names.insert(volume.output_name.clone(), name);
            }

            if let Some(previous) = input_names.get(&volume.input_name) {
                self.add_warning(
                    &format!("{path}.input_name"),
                    &format!(
                        "Input directory '{}' is also used by volume '{previous}'",
                        volume.input_name
                    ),
                );
            } else {
                input_names.insert(volume.input_name.clone(), name);
            }
        }
    }

    // ========================================================================
    // Export
    // ========================================================================

    fn validate_export(&mut self, config: &VolumesConfig) {
        let export = &config.export;

        match export.timeout() {
            Ok(timeout) if timeout.is_zero() => {
                self.add_error("export.timeout", "Timeout must be greater than zero");
            }
            Ok(_) => {}
            Err(e) => {
                self.add_error(
                    "export.timeout",
                    &format!("Invalid duration '{}': {e}", export.timeout),
                );
            }
        }

        if export.format.trim().is_empty() || export.format.contains(['/', '\\', '.']) {
            self.add_error(
                "export.format",
                &format!("Invalid document extension '{}'", export.format),
            );
        }

        self.validate_candidates("export.converter", &export.converter);
        self.validate_candidates("export.rasterizer", &export.rasterizer);
    }

    fn validate_candidates(&mut self, path: &str, candidates: &[CommandSpec]) {
        if candidates.is_empty() {
            self.add_error(path, "At least one candidate command is required");
        }
        for (i, candidate) in candidates.iter().enumerate() {
            if candidate.program().is_none_or(|p| p.trim().is_empty()) {
                self.add_error(&format!("{path}[{i}]"), "Candidate command is empty");
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn finish(&mut self) -> ValidationResult {
        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{PatternRule, StyleDefinition, VolumeConfig};

    fn volumes(yaml: &str) -> VolumesConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn empty_volumes_is_error() {
        let result = Validator::new().validate_volumes(&VolumesConfig::default(), &ConfigLimits::default());
        assert!(result.has_errors());
        assert!(result.errors[0].message.contains("No volumes"));
    }

    #[test]
    fn valid_volumes_pass() {
        let config = volumes("volumes:\n  volume-001:\n    title: One\n  volume-002:\n    title: Two\n");
        let result = Validator::new().validate_volumes(&config, &ConfigLimits::default());
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn volume_name_with_separator_is_error() {
        let mut config = VolumesConfig::default();
        config
            .volumes
            .insert("../escape".to_string(), VolumeConfig::default());
        let result = Validator::new().validate_volumes(&config, &ConfigLimits::default());
        assert!(result.has_errors());
        assert_eq!(result.errors[0].path, "volumes.../escape");
    }

    #[test]
    fn shared_output_name_is_warning() {
        let config = volumes(
            "volumes:\n  a:\n    output_name: book\n  b:\n    output_name: book\n",
        );
        let result = Validator::new().validate_volumes(&config, &ConfigLimits::default());
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("'a'"));
        assert_eq!(result.warnings[0].path, "volumes.b.output_name");
    }

    #[test]
    fn shared_input_name_is_warning() {
        let config = volumes("volumes:\n  a:\n    input_name: src\n  b:\n    input_name: src\n");
        let result = Validator::new().validate_volumes(&config, &ConfigLimits::default());
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, "volumes.b.input_name");
    }

    #[test]
    fn empty_title_is_warning() {
        let config = volumes("volumes:\n  a:\n    title: \"\"\n");
        let result = Validator::new().validate_volumes(&config, &ConfigLimits::default());
        assert!(result.is_valid());
        assert_eq!(result.warnings[0].path, "volumes.a.title");
    }

    #[test]
    fn too_many_volumes_is_error() {
        let config = volumes("volumes:\n  a: {}\n  b: {}\n");
        let limits = ConfigLimits {
            max_volumes: 1,
            ..ConfigLimits::default()
        };
        let result = Validator::new().validate_volumes(&config, &limits);
        assert!(result.has_errors());
    }

    #[test]
    fn bad_timeout_is_error() {
        let config = volumes("volumes:\n  a: {}\nexport:\n  timeout: soon\n");
        let result = Validator::new().validate_volumes(&config, &ConfigLimits::default());
        assert!(result.errors.iter().any(|e| e.path == "export.timeout"));

        let config = volumes("volumes:\n  a: {}\nexport:\n  timeout: 0s\n");
        let result = Validator::new().validate_volumes(&config, &ConfigLimits::default());
        assert!(result.errors.iter().any(|e| e.path == "export.timeout"));
    }

    #[test]
    fn empty_candidates_are_errors() {
        let config = volumes("volumes:\n  a: {}\nexport:\n  converter: []\n  rasterizer: [[]]\n");
        let result = Validator::new().validate_volumes(&config, &ConfigLimits::default());
        let paths: Vec<&str> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"export.converter"));
        assert!(paths.contains(&"export.rasterizer[0]"));
    }

    #[test]
    fn styles_without_entries_is_error() {
        let result = Validator::new().validate_styles(&StylesConfig::default());
        assert!(result.has_errors());
    }

    #[test]
    fn bad_style_pattern_is_warning() {
        let mut config = StylesConfig::default();
        config.styles.insert(
            "broken".to_string(),
            StyleDefinition {
                patterns: vec![
                    PatternRule {
                        pattern: "(unclosed".to_string(),
                        replacement: "x".to_string(),
                    },
                    PatternRule {
                        pattern: String::new(),
                        replacement: "x".to_string(),
                    },
                ],
            },
        );
        config
            .styles
            .insert("empty".to_string(), StyleDefinition::default());

        let result = Validator::new().validate_styles(&config);
        assert!(result.is_valid());
        let paths: Vec<&str> = result.warnings.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["styles.broken.patterns[0]", "styles.broken.patterns[1]", "styles.empty"]
        );
        assert!(result.warnings[0].message.contains("invalid regex pattern"));
    }
}
