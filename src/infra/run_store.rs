// ============================================================
// Layer 6 — Run Store
// ============================================================
// Persists the plain-data side of a training run next to its
// metrics CSV:
//
//   <output_dir>/
//     train_config.json   ← hyperparameters the run used
//     report.json         ← final evaluation summary
//     metrics.csv         ← written by MetricsLogger
//
// Model weights are not written anywhere.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::{Path, PathBuf}};

const CONFIG_FILE: &str = "train_config.json";
const REPORT_FILE: &str = "report.json";

/// Reads and writes run artefacts under one directory.
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_config<T: Serialize>(&self, cfg: &T) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config<T: DeserializeOwned>(&self) -> Result<T> {
        self.read_json(CONFIG_FILE)
    }

    pub fn save_report<T: Serialize>(&self, report: &T) -> Result<()> {
        self.write_json(REPORT_FILE, report)
    }

    pub fn load_report<T: DeserializeOwned>(&self) -> Result<T> {
        self.read_json(REPORT_FILE)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not valid JSON for this type", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        epochs: usize,
        lr:     f64,
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path().join("run")).unwrap();
        let cfg = Sample { epochs: 5, lr: 1e-3 };
        store.save_config(&cfg).unwrap();
        assert_eq!(store.load_config::<Sample>().unwrap(), cfg);
    }

    #[test]
    fn test_missing_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path()).unwrap();
        let err = store.load_report::<Sample>().unwrap_err();
        assert!(err.to_string().contains("report.json"));
    }
}
