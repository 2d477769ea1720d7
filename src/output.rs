use crate::error::ReorderResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// A set of output files written all-or-nothing.
///
/// Each file is first written to a temporary file in the destination
/// directory. Nothing appears under its final name until `commit`, and
/// dropping an uncommitted batch removes every temporary file.
pub struct OutputBatch {
    dir: PathBuf,
    staged: Vec<(NamedTempFile, PathBuf)>,
}

impl OutputBatch {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf(), staged: Vec::new() }
    }

    pub fn stage_csv<T: Serialize>(&mut self, file_name: &str, rows: &[T]) -> ReorderResult<()> {
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file());
            for r in rows {
                wtr.serialize(r)?;
            }
            wtr.flush()?;
        }
        self.staged.push((tmp, self.dir.join(file_name)));
        Ok(())
    }

    pub fn stage_json<T: Serialize>(&mut self, file_name: &str, value: &T) -> ReorderResult<()> {
        let tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(tmp.as_file(), value)?;
        self.staged.push((tmp, self.dir.join(file_name)));
        Ok(())
    }

    /// Move every staged file to its final name. If one of them cannot be
    /// moved, the files already moved by this call are removed again before
    /// the error is returned.
    pub fn commit(self) -> ReorderResult<Vec<PathBuf>> {
        let mut written: Vec<PathBuf> = Vec::with_capacity(self.staged.len());
        for (tmp, dest) in self.staged {
            if let Err(e) = tmp.persist(&dest) {
                for path in &written {
                    if let Err(rm) = std::fs::remove_file(path) {
                        warn!(path = %path.display(), error = %rm, "could not roll back output file");
                    }
                }
                return Err(e.into());
            }
            written.push(dest);
        }
        info!(files = written.len(), dir = %self.dir.display(), "outputs written");
        Ok(written)
    }
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReorderError;
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct Row {
        #[serde(rename = "Item number")]
        item: &'static str,
        qty: u64,
    }

    #[test]
    fn nothing_lands_until_commit() {
        let dir = tempdir().expect("tempdir");
        let mut batch = OutputBatch::new(dir.path());
        batch.stage_csv("a.csv", &[Row { item: "100", qty: 5 }]).unwrap();
        batch.stage_json("s.json", &serde_json::json!({ "ok": true })).unwrap();
        assert!(!dir.path().join("a.csv").exists());

        let written = batch.commit().unwrap();
        assert_eq!(written.len(), 2);
        let csv = std::fs::read_to_string(dir.path().join("a.csv")).unwrap();
        assert_eq!(csv, "Item number,qty\n100,5\n");
    }

    #[test]
    fn dropped_batch_leaves_no_files() {
        let dir = tempdir().expect("tempdir");
        {
            let mut batch = OutputBatch::new(dir.path());
            batch.stage_csv("a.csv", &[Row { item: "1", qty: 1 }]).unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_commit_removes_files_already_moved() {
        let dir = tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("b.csv")).unwrap();
        std::fs::write(dir.path().join("b.csv").join("keep"), "x").unwrap();

        let mut batch = OutputBatch::new(dir.path());
        batch.stage_csv("a.csv", &[Row { item: "1", qty: 1 }]).unwrap();
        batch.stage_csv("b.csv", &[Row { item: "2", qty: 2 }]).unwrap();
        batch.stage_json("s.json", &serde_json::json!({ "ok": true })).unwrap();

        assert!(matches!(batch.commit(), Err(ReorderError::Persist(_))));
        assert!(!dir.path().join("a.csv").exists());
        assert!(!dir.path().join("s.json").exists());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("b.csv")]);
    }
}
