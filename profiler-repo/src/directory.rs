use std::fs;
use std::path::PathBuf;

use chrono::Local;
use profiler_core::{OutputRepository, RepositoryError, SampleRecord};

// === DirectoryRepository === //

/// Writes each terminated context's output to its own file inside a
/// date-stamped subdirectory: `<directory>/<YYYY-MM-DD>/<name>-<HH_MM_SS_ffffff>.txt`.
/// Mirrors `pysample.repository.DirectoryRepository`.
pub struct DirectoryRepository {
    dated_dir: PathBuf,
}

impl DirectoryRepository {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let directory = directory.into();
        if directory.exists() && !directory.is_dir() {
            return Err(RepositoryError(format!(
                "{} is not a directory",
                directory.display()
            )));
        }

        let today = Local::now().format("%Y-%m-%d").to_string();
        let dated_dir = directory.join(today);
        fs::create_dir_all(&dated_dir)
            .map_err(|err| RepositoryError(format!("failed to create {}: {err}", dated_dir.display())))?;

        Ok(Self { dated_dir })
    }
}

impl OutputRepository for DirectoryRepository {
    fn store(&self, record: &SampleRecord) -> Result<(), RepositoryError> {
        let stamp = Local::now().format("%H_%M_%S_%6f").to_string();
        let path = self.dated_dir.join(format!("{}-{}.txt", record.name, stamp));
        fs::write(&path, &record.flame_output)
            .map_err(|err| RepositoryError(format!("failed to write {}: {err}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_file_per_record_under_a_dated_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let repo = DirectoryRepository::new(dir.path()).unwrap();

        let today = Local::now().format("%Y-%m-%d").to_string();
        assert!(dir.path().join(&today).is_dir());

        let record = SampleRecord {
            name: "work".to_string(),
            ident: profiler_core::SampleIdent::new(),
            lifecycle_ms: 5,
            flame_output: "f (a.py:1) 5\n".to_string(),
        };
        repo.store(&record).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path().join(&today))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("work-"));
    }

    #[test]
    fn rejects_an_existing_path_that_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-dir");
        fs::write(&path, "x").unwrap();

        assert!(DirectoryRepository::new(&path).is_err());
    }
}
