//! Configuration loader
//!
//! Loading pipeline for the volumes file:
//! 1. Size limit check
//! 2. Read, strip UTF-8 BOM
//! 3. Environment variable expansion (pre-parse, on raw text)
//! 4. YAML parsing
//! 5. Deserialization to typed config
//! 6. Validation
//!
//! The styles file follows the same pipeline minus step 3, since regular
//! expressions and replacement templates routinely contain `$`.

use crate::config::schema::{StylesConfig, VolumesConfig};
use crate::config::validation::{ValidationResult, Validator};
use crate::error::ConfigError;

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ============================================================================
// Public API
// ============================================================================

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum number of volumes.
    pub max_volumes: usize,

    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_volumes: env_or("BOOKWRIGHT_MAX_VOLUMES", 1000),
            max_config_size: env_or("BOOKWRIGHT_MAX_CONFIG_SIZE", 10 * 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult<T> {
    /// The loaded and validated configuration.
    pub config: T,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: ConfigLimits,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given limits.
    #[must_use]
    pub const fn new(limits: ConfigLimits) -> Self {
        Self { limits }
    }

    /// Creates a new configuration loader with default limits.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ConfigLimits::default())
    }

    /// Loads and validates a volumes file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist or is too large
    /// - A required environment variable is unset
    /// - YAML parsing fails or the document is empty
    /// - Validation fails
    pub fn load_volumes(&self, path: &Path) -> Result<LoadResult<VolumesConfig>, ConfigError> {
        let raw = self.read(path)?;
        self.volumes_from_str(&raw, path)
    }

    /// Parses and validates volumes YAML that has already been read.
    ///
    /// # Errors
    ///
    /// Same as [`load_volumes`](Self::load_volumes), minus file access.
    pub fn load_volumes_from_str(
        &self,
        yaml: &str,
    ) -> Result<LoadResult<VolumesConfig>, ConfigError> {
        self.volumes_from_str(yaml, Path::new("<inline>"))
    }

    /// Loads and validates a styles file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be parsed, or
    /// declares no styles.
    pub fn load_styles(&self, path: &Path) -> Result<LoadResult<StylesConfig>, ConfigError> {
        let raw = self.read(path)?;
        let config: StylesConfig = parse_yaml(&raw, path)?;
        let validation = Validator::new().validate_styles(&config);
        finish(config, validation, path, Vec::new())
    }

    fn volumes_from_str(
        &self,
        raw: &str,
        path: &Path,
    ) -> Result<LoadResult<VolumesConfig>, ConfigError> {
        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw, path)?;

        let config: VolumesConfig = parse_yaml(&substituted, path)?;
        let validation = Validator::new().validate_volumes(&config, &self.limits);
        finish(config, validation, path, env_sub.warnings)
    }

    fn read(&self, path: &Path) -> Result<String, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.limits.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.limits.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: e.to_string(),
        })?;

        Ok(raw
            .strip_prefix('\u{feff}')
            .map_or_else(|| raw.clone(), str::to_string))
    }
}

fn parse_yaml<T: DeserializeOwned>(text: &str, path: &Path) -> Result<T, ConfigError> {
    let root: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

    if root.is_null() {
        return Err(ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: "Configuration file is empty".to_string(),
        });
    }

    serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        line: None,
        message: format!("Failed to deserialize configuration: {e}"),
    })
}

fn finish<T>(
    config: T,
    validation: ValidationResult,
    path: &Path,
    mut warnings: Vec<LoadWarning>,
) -> Result<LoadResult<T>, ConfigError> {
    if validation.has_errors() {
        return Err(ConfigError::ValidationError {
            path: path.display().to_string(),
            errors: validation.errors,
        });
    }

    warnings.extend(validation.warnings.into_iter().map(|issue| LoadWarning {
        message: issue.message,
        location: Some(issue.path),
    }));

    Ok(LoadResult { config, warnings })
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution.
///
/// Runs on raw YAML text BEFORE parsing to preserve type inference.
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str, source_path: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let spec = Self::parse_var_spec(&mut chars, source_path)?;

                    match std::env::var(&spec.name) {
                        Ok(value) => result.push_str(&value),
                        Err(_) => {
                            if let Some(default_val) = spec.default {
                                result.push_str(&default_val);
                            } else if let Some(msg) = spec.required {
                                return Err(ConfigError::EnvVarNotSet {
                                    var: spec.name,
                                    location: msg,
                                });
                            } else {
                                self.warnings.push(LoadWarning {
                                    message: format!(
                                        "Environment variable '{}' is not set, using empty string",
                                        spec.name
                                    ),
                                    location: Some(source_path.display().to_string()),
                                });
                            }
                        }
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    /// Parses a variable reference from `${...}`.
    fn parse_var_spec(
        chars: &mut std::iter::Peekable<std::str::Chars>,
        source_path: &Path,
    ) -> Result<VarSpec, ConfigError> {
        let mut name = String::new();

        while let Some(&c) = chars.peek() {
            match c {
                '}' => {
                    chars.next();
                    return Ok(VarSpec {
                        name,
                        default: None,
                        required: None,
                    });
                }
                ':' => {
                    chars.next();
                    match chars.peek() {
                        Some('-') => {
                            chars.next();
                            let default = Self::read_until_close(chars, source_path)?;
                            return Ok(VarSpec {
                                name,
                                default: Some(default),
                                required: None,
                            });
                        }
                        Some('?') => {
                            chars.next();
                            let msg = Self::read_until_close(chars, source_path)?;
                            return Ok(VarSpec {
                                name,
                                default: None,
                                required: Some(msg),
                            });
                        }
                        _ => name.push(':'),
                    }
                }
                _ => {
                    chars.next();
                    name.push(c);
                }
            }
        }

        Err(ConfigError::ParseError {
            path: source_path.to_path_buf(),
            line: None,
            message: format!("Unclosed environment variable reference: ${{{name}"),
        })
    }

    /// Reads content until closing `}`, handling nested braces.
    fn read_until_close(
        chars: &mut std::iter::Peekable<std::str::Chars>,
        source_path: &Path,
    ) -> Result<String, ConfigError> {
        let mut value = String::new();
        let mut depth = 1;

        for c in chars.by_ref() {
            match c {
                '{' => {
                    depth += 1;
                    value.push(c);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(value);
                    }
                    value.push(c);
                }
                _ => value.push(c),
            }
        }

        Err(ConfigError::ParseError {
            path: PathBuf::from(source_path),
            line: None,
            message: "Unclosed environment variable reference".to_string(),
        })
    }
}

/// A parsed `${...}` reference.
struct VarSpec {
    name: String,
    default: Option<String>,
    required: Option<String>,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
