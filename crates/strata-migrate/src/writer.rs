//! Migration file output.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::generator::MigrationScript;

/// Builds a file stem like `20240115093000_add_users`.
///
/// The name is lowercased and every run of characters outside `[a-z0-9]`
/// becomes a single `_`. An empty result falls back to `auto`.
#[must_use]
pub fn generate_migration_name(timestamp: DateTime<Utc>, name: &str) -> String {
    format!("{}_{}", timestamp.format("%Y%m%d%H%M%S"), sanitize(name))
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "auto".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Paths of a written migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFiles {
    /// `<stem>.up.sql`
    pub up: PathBuf,
    /// `<stem>.down.sql`
    pub down: PathBuf,
}

/// Writes migration scripts into a directory.
#[derive(Debug, Clone)]
pub struct MigrationWriter {
    dir: PathBuf,
}

impl MigrationWriter {
    /// Creates a writer for `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths the script would be written to.
    #[must_use]
    pub fn paths(&self, script: &MigrationScript, timestamp: DateTime<Utc>) -> MigrationFiles {
        let stem = generate_migration_name(timestamp, &script.name);
        MigrationFiles {
            up: self.dir.join(format!("{stem}.up.sql")),
            down: self.dir.join(format!("{stem}.down.sql")),
        }
    }

    /// Writes the up and down files.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::MigrationExists`] if either file is already
    /// present (nothing is written in that case), or an IO error.
    pub fn write(&self, script: &MigrationScript, timestamp: DateTime<Utc>) -> Result<MigrationFiles> {
        let files = self.paths(script, timestamp);
        for path in [&files.up, &files.down] {
            if path.exists() {
                return Err(MigrateError::MigrationExists(path.clone()));
            }
        }

        fs::create_dir_all(&self.dir)?;
        write_new(&files.up, &script.up)?;
        write_new(&files.down, &script.down)?;

        debug!(path = %files.up.display(), "wrote migration");
        Ok(files)
    }
}

fn write_new(path: &Path, contents: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => MigrateError::MigrationExists(path.to_path_buf()),
            _ => MigrateError::Io(e),
        })?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use strata_sql::Dialect;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
    }

    fn script(name: &str) -> MigrationScript {
        MigrationScript {
            name: name.to_string(),
            dialect: Dialect::Sqlite,
            up: "CREATE TABLE \"t\" (\n    \"id\" INTEGER\n);\n".into(),
            down: "DROP TABLE IF EXISTS \"t\";\n".into(),
            creation_order: vec!["t".into()],
            deferred: Vec::new(),
        }
    }

    #[test]
    fn test_generate_migration_name() {
        assert_eq!(generate_migration_name(at(), "add_users"), "20240115093000_add_users");
        assert_eq!(
            generate_migration_name(at(), "Add Users & Posts!"),
            "20240115093000_add_users_posts"
        );
        assert_eq!(generate_migration_name(at(), "--"), "20240115093000_auto");
        assert_eq!(generate_migration_name(at(), ""), "20240115093000_auto");
    }

    #[test]
    fn test_write_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path().join("migrations"));

        let files = writer.write(&script("init"), at()).unwrap();

        assert!(files.up.ends_with("20240115093000_init.up.sql"));
        assert_eq!(fs::read_to_string(&files.up).unwrap(), script("init").up);
        assert_eq!(fs::read_to_string(&files.down).unwrap(), script("init").down);
    }

    #[test]
    fn test_write_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path());
        let files = writer.paths(&script("init"), at());
        fs::write(&files.down, "keep me").unwrap();

        let err = writer.write(&script("init"), at()).unwrap_err();

        assert!(matches!(err, MigrateError::MigrationExists(ref p) if p == &files.down));
        assert!(!files.up.exists());
        assert_eq!(fs::read_to_string(&files.down).unwrap(), "keep me");
    }
}
