//! Run logs on disk.
//!
//! A run directory holds the configuration the run was started with
//! (`config.json`, written atomically) and one JSON line per observation
//! (`evaluations.jsonl`, appended under an exclusive file lock).

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "config.json";
pub const EVALUATIONS_FILE: &str = "evaluations.jsonl";

/// One stored observation: the model input and its outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub x: Vec<f64>,
    pub y: f64,
}

/// Writer for a run directory.
pub struct RunLog {
    dir: PathBuf,
    /// Serialise in-process writes so we only hold the file lock briefly.
    write_lock: Mutex<()>,
}

impl RunLog {
    /// Create the directory if needed and store `config` in it.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](Error::Storage) error if the directory or the
    /// config file cannot be written.
    pub fn create(dir: impl AsRef<Path>, config: &impl Serialize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        save_json_atomic(&dir.join(CONFIG_FILE), config)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one observation to the journal.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](Error::Storage) error if the journal cannot be
    /// opened, locked or written.
    pub fn append(&self, x: &[f64], y: f64) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(EVALUATIONS_FILE))?;
        file.lock_exclusive()?;

        let line = serde_json::to_string(&Evaluation { x: x.to_vec(), y })?;
        writeln!(file, "{line}")?;
        file.flush()?;

        file.unlock()?;
        Ok(())
    }
}

/// Write `value` as pretty JSON via a temp file in the same directory and a rename.
///
/// # Errors
///
/// Returns a [`Storage`](Error::Storage) error on any I/O or encoding failure.
pub fn save_json_atomic(path: &Path, value: &impl Serialize) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));
    let file = File::create(&tmp_path)?;
    serde_json::to_writer_pretty(file, value)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read the configuration stored in a run directory.
///
/// # Errors
///
/// Returns a [`Storage`](Error::Storage) error if the file is missing or
/// does not parse as `C`.
pub fn load_config<C: DeserializeOwned>(dir: impl AsRef<Path>) -> Result<C> {
    let path = dir.as_ref().join(CONFIG_FILE);
    let file = File::open(&path)
        .map_err(|e| Error::Storage(format!("cannot open {}: {e}", path.display())))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Read all observations of a run directory. A missing journal yields an empty list.
///
/// # Errors
///
/// Returns a [`Storage`](Error::Storage) error if the journal exists but
/// cannot be read or parsed.
pub fn load_evaluations(dir: impl AsRef<Path>) -> Result<Vec<Evaluation>> {
    let path = dir.as_ref().join(EVALUATIONS_FILE);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut evaluations = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        evaluations.push(serde_json::from_str(line)?);
    }

    file.unlock()?;
    Ok(evaluations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tempdir() -> PathBuf {
        use core::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "contextual_bayesopt_persistence_{}_{id}",
            std::process::id()
        ))
    }

    #[test]
    fn journal_round_trip() {
        let dir = tempdir();
        let log = RunLog::create(&dir, &serde_json::json!({"input_dim": 1})).unwrap();
        log.append(&[0.1, 0.3], 0.5).unwrap();
        log.append(&[0.2, 0.7], -1.0).unwrap();

        let evaluations = load_evaluations(&dir).unwrap();
        assert_eq!(evaluations.len(), 2);
        assert_eq!(evaluations[1].x, vec![0.2, 0.7]);
        assert!((evaluations[1].y + 1.0).abs() < 1e-12);

        let config: serde_json::Value = load_config(&dir).unwrap();
        assert_eq!(config["input_dim"], 1);
        assert!(!dir.join(".config.json.tmp").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn journal_preserves_every_bit() {
        let dir = tempdir();
        let log = RunLog::create(&dir, &serde_json::json!({})).unwrap();
        let x = vec![0.438_201_315_955_454_03, 0.1 + 0.2, 1.0 / 3.0];
        let y = core::f64::consts::PI * 1e-7;
        log.append(&x, y).unwrap();

        let evaluations = load_evaluations(&dir).unwrap();
        let bits = |v: &[f64]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&evaluations[0].x), bits(&x));
        assert_eq!(evaluations[0].y.to_bits(), y.to_bits());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_journal_is_empty() {
        let dir = tempdir();
        std::fs::create_dir_all(&dir).unwrap();
        assert!(load_evaluations(&dir).unwrap().is_empty());
        assert!(matches!(
            load_config::<serde_json::Value>(&dir),
            Err(Error::Storage(_))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn corrupt_journal_is_a_storage_error() {
        let dir = tempdir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(EVALUATIONS_FILE), "{not json}\n").unwrap();
        assert!(matches!(load_evaluations(&dir), Err(Error::Storage(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}
