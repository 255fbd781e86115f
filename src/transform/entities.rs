//! Named character entities.
//!
//! Definitions files are line oriented: `<hex-code> <name> [comment...]`,
//! with `#` comment lines. Documents reference entries as `&name;`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{BookwrightError, ConfigError, StageError};
use crate::observability::Reporter;

use super::{StageOutcome, output_path_for, read_stage_input, write_stage_output};

/// Names a reference can match: `[A-Za-z][A-Za-z0-9_]*`.
fn is_entity_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

static ENTITY_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9_]*);").expect("valid regex"));

/// Entity name → character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityTable {
    entries: HashMap<String, char>,
}

impl EntityTable {
    /// Parses a definitions file.
    ///
    /// Lines with fewer than two fields, or whose code lacks the `0x`
    /// prefix, are ignored. A prefixed code that is not a valid Unicode
    /// scalar value, or a name outside `[A-Za-z][A-Za-z0-9_]*`, is returned
    /// as an error and the line is skipped. Later definitions of a name
    /// replace earlier ones.
    #[must_use]
    pub fn parse(text: &str) -> (Self, Vec<StageError>) {
        let mut table = Self::default();
        let mut rejected = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (Some(code), Some(name)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Some(hex) = code.strip_prefix("0x") else {
                continue;
            };
            if !is_entity_name(name) {
                rejected.push(StageError::InvalidEntityName {
                    name: name.to_string(),
                    line: index + 1,
                });
                continue;
            }

            match parse_code_point(hex) {
                Some(c) => table.insert(name, c),
                None => rejected.push(StageError::InvalidEntityDefinition {
                    name: name.to_string(),
                    code: code.to_string(),
                    line: index + 1,
                }),
            }
        }

        (table, rejected)
    }

    /// Reads and parses a definitions file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if the file does not exist, or
    /// [`ConfigError::ParseError`] if it cannot be read as UTF-8 text.
    pub fn load(path: &Path) -> Result<(Self, Vec<StageError>), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::MissingFile {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::ParseError {
                    path: path.to_path_buf(),
                    line: None,
                    message: e.to_string(),
                }
            }
        })?;
        Ok(Self::parse(&text))
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, name: &str, value: char) {
        self.entries.insert(name.to_string(), value);
    }

    /// Looks up an entity.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<char> {
        self.entries.get(name).copied()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_code_point(hex: &str) -> Option<char> {
    if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

/// Output of [`substitute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// Text with every known reference replaced.
    pub text: String,
    /// Unknown names, once per occurrence, in document order.
    pub unknown: Vec<String>,
}

/// Replaces every `&name;` found in `table` with its character.
///
/// Unknown references are left byte-for-byte as written. Substituted
/// characters are never rescanned.
#[must_use]
pub fn substitute(text: &str, table: &EntityTable) -> Substitution {
    let mut unknown = Vec::new();
    let replaced = ENTITY_REF.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        table.get(name).map_or_else(
            || {
                unknown.push(name.to_string());
                caps[0].to_string()
            },
            String::from,
        )
    });

    Substitution {
        text: replaced.into_owned(),
        unknown,
    }
}

/// Substitutes entities in one file, writing it into `output_dir` under the
/// same name.
///
/// # Errors
///
/// Returns an I/O error if the file exists but cannot be read, or the
/// output cannot be written. A missing input is reported and skipped.
pub fn entitize_file(
    input: &Path,
    output_dir: &Path,
    table: &EntityTable,
    reporter: &dyn Reporter,
) -> Result<StageOutcome, BookwrightError> {
    let Some(text) = read_stage_input(input)? else {
        let skipped = StageError::InputFileMissing {
            path: input.to_path_buf(),
        };
        reporter.warn(&skipped.to_string());
        return Ok(StageOutcome::Skipped(skipped));
    };

    let substitution = substitute(&text, table);
    for name in substitution.unknown {
        reporter.warn(&format!(
            "{} in {}",
            StageError::UnknownEntityReference { name },
            input.display()
        ));
    }

    let output = output_path_for(input, output_dir);
    write_stage_output(&output, &substitution.text)?;
    reporter.info(&format!(
        "Substituted entities {} -> {}",
        input.display(),
        output.display()
    ));

    Ok(StageOutcome::Written(output))
}
