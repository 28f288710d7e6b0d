// src/store.rs
use crate::types::Capture;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

const SAMPLE_SUFFIX: &str = ".csv";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("label name is empty after sanitization")]
    EmptyLabel,
    #[error("label '{0}' already exists")]
    DuplicateLabel(String),
    #[error("sample '{0}' not found")]
    SampleNotFound(String),
    #[error("capture is empty, nothing to save")]
    EmptyCapture,
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSummary {
    pub name: String,
    pub sample_count: usize,
}

/// Keeps only the characters allowed in a label directory name: alphanumeric,
/// underscore and hyphen. Idempotent.
pub fn sanitize_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Owns the on-disk directory tree: one directory per label under `base`,
/// one CSV file per stored capture. Every listing re-reads the filesystem so
/// the result always reflects current disk state; nothing is cached.
pub struct LabelStore {
    base: PathBuf,
}

impl LabelStore {
    /// Opens the store, creating the base folder on first run.
    pub fn open(base: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn label_dir(&self, label: &str) -> PathBuf {
        self.base.join(label)
    }

    pub fn sample_path(&self, label: &str, filename: &str) -> PathBuf {
        self.label_dir(label).join(filename)
    }

    /// Lists labels with their sample counts, sorted by name ascending.
    pub fn list_labels(&self) -> Result<Vec<LabelSummary>, StoreError> {
        let mut labels = Vec::new();
        for entry in fs::read_dir(&self.base)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            let sample_count = self.list_samples(&name)?.len();
            labels.push(LabelSummary { name, sample_count });
        }
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(labels)
    }

    /// Sanitizes and creates a new label directory, returning the canonical
    /// name. Rejects names that sanitize to nothing or already exist.
    pub fn create_label(&self, raw_name: &str) -> Result<String, StoreError> {
        let name = sanitize_label(raw_name);
        if name.is_empty() {
            return Err(StoreError::EmptyLabel);
        }
        let dir = self.label_dir(&name);
        if dir.exists() {
            return Err(StoreError::DuplicateLabel(name));
        }
        fs::create_dir(&dir)?;
        Ok(name)
    }

    /// Lists a label's sample files newest first. Filenames embed a sortable
    /// timestamp, so plain lexicographic descent gives that order.
    pub fn list_samples(&self, label: &str) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.label_dir(label))? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if name.ends_with(SAMPLE_SUFFIX) {
                names.push(name);
            }
        }
        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Removes one sample file. A file already gone reports `SampleNotFound`
    /// so a stale listing surfaces as a status message, not a crash.
    pub fn delete_sample(&self, label: &str, filename: &str) -> Result<(), StoreError> {
        let path = self.sample_path(label, filename);
        if !path.exists() {
            return Err(StoreError::SampleNotFound(filename.to_owned()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Serializes one capture as `{label}_{YYYYMMDD_HHMMSS}.csv` under the
    /// label's directory, one row per record, no header. The rows go through
    /// a temp file in the same directory first, so an interrupted write
    /// leaves no sample behind.
    pub fn write_sample(&self, label: &str, capture: &Capture) -> Result<PathBuf, StoreError> {
        if capture.is_empty() {
            return Err(StoreError::EmptyCapture);
        }
        let dir = self.label_dir(label);
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{label}_{stamp}{SAMPLE_SUFFIX}"));

        let mut temp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = csv::Writer::from_writer(temp.as_file_mut());
            for row in &capture.rows {
                writer.write_record(row.iter().map(|v| v.to_string()))?;
            }
            writer.flush()?;
        }
        temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(path)
    }

    /// Loads a stored sample back as float rows. Rows that fail to parse are
    /// skipped, mirroring capture-time tolerance for odd lines.
    pub fn read_sample(&self, label: &str, filename: &str) -> Result<Vec<Vec<f64>>, StoreError> {
        let path = self.sample_path(label, filename);
        if !path.exists() {
            return Err(StoreError::SampleNotFound(filename.to_owned()));
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = Vec::with_capacity(record.len());
            let mut valid = true;
            for field in record.iter() {
                match field.trim().parse::<f64>() {
                    Ok(value) => row.push(value),
                    Err(_) => {
                        valid = false;
                        break;
                    }
                }
            }
            if valid && !row.is_empty() {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LabelStore) {
        let dir = TempDir::new().unwrap();
        let store = LabelStore::open(dir.path().join("samples")).unwrap();
        (dir, store)
    }

    fn capture() -> Capture {
        Capture {
            rows: vec![
                vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
                vec![-1.5, 0.25, 3.5, 4.0, 5.0, 6.0],
            ],
        }
    }

    #[test]
    fn sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize_label("Walk Fast!"), "WalkFast");
        assert_eq!(sanitize_label("idle_state-2"), "idle_state-2");
        assert_eq!(sanitize_label("  !?  "), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_label("Walk Fast!");
        assert_eq!(sanitize_label(&once), once);
    }

    #[test]
    fn create_label_rejects_empty_and_duplicate() {
        let (_dir, store) = store();
        assert!(matches!(
            store.create_label("!!!"),
            Err(StoreError::EmptyLabel)
        ));
        assert_eq!(store.create_label("Walk Fast!").unwrap(), "WalkFast");
        assert!(matches!(
            store.create_label("Walk Fast!"),
            Err(StoreError::DuplicateLabel(name)) if name == "WalkFast"
        ));
    }

    #[test]
    fn list_labels_sorted_with_counts() {
        let (_dir, store) = store();
        store.create_label("walk").unwrap();
        store.create_label("idle").unwrap();
        store.write_sample("walk", &capture()).unwrap();

        let labels = store.list_labels().unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].name, "idle");
        assert_eq!(labels[0].sample_count, 0);
        assert_eq!(labels[1].name, "walk");
        assert_eq!(labels[1].sample_count, 1);
    }

    #[test]
    fn list_samples_newest_first() {
        let (_dir, store) = store();
        store.create_label("walk").unwrap();
        let dir = store.base().join("walk");
        for name in [
            "walk_20240101_120000.csv",
            "walk_20240301_080000.csv",
            "walk_20240102_090000.csv",
        ] {
            fs::write(dir.join(name), "1,2,3\n").unwrap();
        }
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let samples = store.list_samples("walk").unwrap();
        assert_eq!(
            samples,
            vec![
                "walk_20240301_080000.csv",
                "walk_20240102_090000.csv",
                "walk_20240101_120000.csv",
            ]
        );
    }

    #[test]
    fn write_then_read_round_trips() {
        let (_dir, store) = store();
        store.create_label("walk").unwrap();
        let written = capture();
        let path = store.write_sample("walk", &written).unwrap();
        let filename = path.file_name().unwrap().to_str().unwrap().to_owned();
        assert!(filename.starts_with("walk_"));
        assert!(filename.ends_with(".csv"));

        let rows = store.read_sample("walk", &filename).unwrap();
        assert_eq!(rows, written.rows);
    }

    #[test]
    fn write_rejects_empty_capture_and_leaves_no_file() {
        let (_dir, store) = store();
        store.create_label("walk").unwrap();
        assert!(matches!(
            store.write_sample("walk", &Capture::default()),
            Err(StoreError::EmptyCapture)
        ));
        assert!(store.list_samples("walk").unwrap().is_empty());
    }

    #[test]
    fn delete_missing_sample_reports_not_found() {
        let (_dir, store) = store();
        store.create_label("walk").unwrap();
        assert!(matches!(
            store.delete_sample("walk", "walk_20240101_120000.csv"),
            Err(StoreError::SampleNotFound(_))
        ));
    }

    #[test]
    fn delete_removes_the_file() {
        let (_dir, store) = store();
        store.create_label("walk").unwrap();
        let path = store.write_sample("walk", &capture()).unwrap();
        let filename = path.file_name().unwrap().to_str().unwrap().to_owned();
        store.delete_sample("walk", &filename).unwrap();
        assert!(store.list_samples("walk").unwrap().is_empty());
    }

    #[test]
    fn read_sample_skips_unparseable_rows() {
        let (_dir, store) = store();
        store.create_label("walk").unwrap();
        let path = store.base().join("walk").join("walk_20240101_120000.csv");
        fs::write(&path, "1.0,2.0,3.0\nnot,a,row\n4.0,5.0,6.0\n").unwrap();
        let rows = store
            .read_sample("walk", "walk_20240101_120000.csv")
            .unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }
}
