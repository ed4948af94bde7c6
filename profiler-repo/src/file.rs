use std::fs;
use std::path::{Path, PathBuf};

use profiler_core::{OutputRepository, RepositoryError, SampleRecord};
use tracing::warn;

// === FileRepository === //

/// Writes every terminated context's folded-stack output to the same file,
/// overwriting the previous contents by default. Mirrors
/// `pysample.repository.FileRepository`.
pub struct FileRepository {
    path: PathBuf,
    overwrite: bool,
}

impl FileRepository {
    /// Fails at construction, not at `store` time, if `path` already exists
    /// as something other than a plain file, or exists and `overwrite` is
    /// false — both are configuration errors (spec §7).
    pub fn new(path: impl Into<PathBuf>, overwrite: bool) -> Result<Self, RepositoryError> {
        let path = path.into();
        if path.exists() {
            if !path.is_file() {
                return Err(RepositoryError(format!(
                    "{} is not a file",
                    path.display()
                )));
            }
            if overwrite {
                warn!(path = %path.display(), "file already exists and will be overwritten");
            } else {
                return Err(RepositoryError(format!(
                    "{} already exists",
                    path.display()
                )));
            }
        }
        Ok(Self { path, overwrite })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputRepository for FileRepository {
    fn store(&self, record: &SampleRecord) -> Result<(), RepositoryError> {
        if !self.overwrite && self.path.exists() {
            return Ok(());
        }
        fs::write(&self.path, &record.flame_output)
            .map_err(|err| RepositoryError(format!("failed to write {}: {err}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_flame_output_to_the_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let repo = FileRepository::new(&path, true).unwrap();

        let record = SampleRecord {
            name: "work".to_string(),
            ident: profiler_core::SampleIdent::new(),
            lifecycle_ms: 12,
            flame_output: "f (a.py:1) 10\n".to_string(),
        };
        repo.store(&record).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "f (a.py:1) 10\n");
    }

    #[test]
    fn refuses_to_overwrite_when_configured_not_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "existing").unwrap();

        assert!(FileRepository::new(&path, false).is_err());
    }

    #[test]
    fn skips_the_write_silently_when_overwrite_disabled_after_construction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let repo = FileRepository::new(&path, true).unwrap();
        fs::write(&path, "existing").unwrap();

        let repo = FileRepository {
            path: repo.path,
            overwrite: false,
        };
        let record = SampleRecord {
            name: "work".to_string(),
            ident: profiler_core::SampleIdent::new(),
            lifecycle_ms: 12,
            flame_output: "new".to_string(),
        };
        repo.store(&record).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "existing");
    }
}
