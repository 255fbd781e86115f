//! Shared integration-test harness: a throwaway project tree and a helper
//! that runs the `bookwright` binary inside it.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// A volumes file with two volumes, the second without sources.
pub const VOLUMES: &str = "\
volumes:
  volume-001:
    title: Volume One
  volume-002:
    title: Volume Two
";

/// A styles file with one rule per style.
pub const STYLES: &str = r#"
styles:
  quotes:
    patterns:
      - pattern: "'"
        replacement: "’"
  dashes:
    patterns:
      - pattern: " -- "
        replacement: " – "
"#;

/// A definitions file with one comment and one entry.
pub const ENTITIES: &str = "# name table\n0x00E9 eacute\n";

/// A temporary project directory.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    /// Creates an empty project.
    #[allow(clippy::missing_panics_doc)]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Creates a project with the standard configuration files and one
    /// populated volume.
    pub fn standard() -> Self {
        let project = Self::new();
        project.write("volumes.yaml", VOLUMES);
        project.write("styles.yaml", STYLES);
        project.write("entities.nam", ENTITIES);
        project.write("volume-001/01-intro.md", "Intro\n=====\nIt's caf&eacute; -- open");
        project.write("volume-001/02-more.md", "# More\n::: include\nIt's raw\n:::\n");
        project.write("volume-001/03-draft.tmp.md", "# Draft");
        project
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a project file.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Writes a project file, creating parent directories.
    #[allow(clippy::missing_panics_doc)]
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        std::fs::create_dir_all(path.parent().expect("path has a parent"))
            .expect("failed to create parent");
        std::fs::write(path, contents).expect("failed to write fixture");
    }

    /// Reads a project file.
    #[allow(clippy::missing_panics_doc)]
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("failed to read {relative}: {e}"))
    }

    /// Runs `bookwright` with `args` from the project root.
    #[allow(clippy::missing_panics_doc)]
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_bookwright"))
            .args(args)
            .current_dir(self.root())
            .env_remove("BOOKWRIGHT_LOG_LEVEL")
            .env_remove("BOOKWRIGHT_OUTPUT_DIR")
            .env_remove("BOOKWRIGHT_TEMP_DIR")
            .env("NO_COLOR", "1")
            .output()
            .expect("failed to run bookwright")
    }
}

/// Formats a process result for assertion messages.
pub fn describe(output: &Output) -> String {
    format!(
        "status: {:?}\nstdout:\n{}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
