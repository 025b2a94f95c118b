//! Per-run output location
//!
//! Gantree: L4_Integration → RunContext
//!
//! One directory per benchmark invocation, named
//! `<%Y-%m-%d_%H-%M-%S>_<uuid>` under a results root. Artifacts are written
//! once: persisting a name that already exists is a storage error.

use chrono::Local;
use emqst_core::error::{EmqstError, EmqstResult};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File name of the latest-run plot alias in the results root
pub const LATEST_RUN_PLOT: &str = "latest_run.svg";

/// Output namespace of one run
/// Gantree: RunContext // 실행 컨텍스트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    root: PathBuf,
    run_id: String,
    dir: PathBuf,
    artifacts: Vec<PathBuf>,
}

impl RunContext {
    /// Create a fresh run directory under `parent`
    /// Gantree: create_run(parent) -> Result<Self> // 실행 디렉터리 생성
    pub fn create_run(parent: impl AsRef<Path>) -> EmqstResult<Self> {
        let root = parent.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            EmqstError::Storage(format!("cannot create results root {}: {}", root.display(), e))
        })?;

        let run_id = format!(
            "{}_{}",
            Local::now().format("%Y-%m-%d_%H-%M-%S"),
            Uuid::new_v4().simple()
        );
        let dir = root.join(&run_id);
        // an existing run directory is never reused
        fs::create_dir(&dir).map_err(|e| {
            EmqstError::Storage(format!("cannot create run directory {}: {}", dir.display(), e))
        })?;

        log::info!("Run directory: {}", dir.display());
        Ok(Self {
            root,
            run_id,
            dir,
            artifacts: Vec::new(),
        })
    }

    /// Results root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<timestamp>_<uuid>`
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifacts written so far
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Path for an artifact in the run directory
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Path of the latest-run plot alias
    pub fn latest_plot_path(&self) -> PathBuf {
        self.root.join(LATEST_RUN_PLOT)
    }

    /// Write `<name>.json`
    /// Gantree: persist(name,payload) -> Result<PathBuf> // 결과 저장
    pub fn persist<T: Serialize + ?Sized>(&mut self, name: &str, payload: &T) -> EmqstResult<PathBuf> {
        check_name(name)?;
        let path = self.dir.join(format!("{}.json", name));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| EmqstError::Storage(format!("cannot create {}: {}", path.display(), e)))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, payload)?;
        writer
            .flush()
            .map_err(|e| EmqstError::Storage(format!("cannot write {}: {}", path.display(), e)))?;

        log::debug!("Persisted {}", path.display());
        self.register(path.clone());
        Ok(path)
    }

    /// Record a file written by another writer (e.g. the plot)
    pub fn register(&mut self, path: PathBuf) {
        self.artifacts.push(path);
    }

    /// End of run: report what was written and hand back the paths
    pub fn close(self) -> Vec<PathBuf> {
        log::info!(
            "Run {} closed with {} artifacts",
            self.run_id,
            self.artifacts.len()
        );
        self.artifacts
    }
}

fn check_name(name: &str) -> EmqstResult<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(EmqstError::Storage(format!("invalid artifact name '{}'", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("emqst_run_context_{}_{}", tag, Uuid::new_v4().simple()))
    }

    #[test]
    fn test_create_run_is_unique() {
        let root = temp_root("unique");
        let ids: HashSet<String> = (0..5)
            .map(|_| RunContext::create_run(&root).unwrap().run_id().to_string())
            .collect();
        assert_eq!(ids.len(), 5);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_persist_writes_json_once() {
        let root = temp_root("persist");
        let mut ctx = RunContext::create_run(&root).unwrap();
        let path = ctx.persist("DT_settings", &vec![1, 2, 3]).unwrap();
        assert!(path.ends_with("DT_settings.json"));
        let back: Vec<i32> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, vec![1, 2, 3]);

        ctx.persist("QST_results", "other").unwrap();
        assert!(matches!(
            ctx.persist("DT_settings", &0),
            Err(EmqstError::Storage(_))
        ));
        assert_eq!(ctx.close().len(), 2);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_bad_names_rejected() {
        let root = temp_root("names");
        let mut ctx = RunContext::create_run(&root).unwrap();
        assert!(ctx.persist("", &1).is_err());
        assert!(ctx.persist("../escape", &1).is_err());
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_unusable_root_is_storage_error() {
        let root = temp_root("file");
        fs::create_dir_all(&root).unwrap();
        let blocker = root.join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();
        assert!(matches!(
            RunContext::create_run(&blocker),
            Err(EmqstError::Storage(_))
        ));
        fs::remove_dir_all(&root).ok();
    }
}
