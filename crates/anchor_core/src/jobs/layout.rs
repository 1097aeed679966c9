//! Directory layout under the media root.
//!
//! ```text
//! <root>/jobs/<job_id>.json
//! <root>/uploads/<job_id>/{inhouse,external}/<file>
//! <root>/results/<job_id>/...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

/// Paths of every job artifact under one media root.
#[derive(Debug, Clone)]
pub struct MediaLayout {
    root: PathBuf,
}

impl MediaLayout {
    /// Layout rooted at `root`. Nothing is created until `ensure_dirs`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    pub fn uploads_root(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn results_root(&self) -> PathBuf {
        self.root.join("results")
    }

    /// `jobs/<job_id>.json`
    pub fn job_path(&self, job_id: &str) -> PathBuf {
        self.jobs_dir().join(format!("{}.json", job_id))
    }

    /// `uploads/<job_id>`
    pub fn uploads_dir(&self, job_id: &str) -> PathBuf {
        self.uploads_root().join(job_id)
    }

    /// `uploads/<job_id>/<role>`, role being `inhouse` or `external`.
    pub fn upload_slot(&self, job_id: &str, role: &str) -> PathBuf {
        self.uploads_dir(job_id).join(role)
    }

    /// `results/<job_id>`
    pub fn results_dir(&self, job_id: &str) -> PathBuf {
        self.results_root().join(job_id)
    }

    /// Create `jobs/`, `uploads/` and `results/`.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.jobs_dir())?;
        fs::create_dir_all(self.uploads_root())?;
        fs::create_dir_all(self.results_root())?;
        Ok(())
    }

    /// IDs of every `*.json` record in `jobs/`, sorted. Empty when the
    /// directory does not exist.
    pub fn job_ids(&self) -> std::io::Result<Vec<String>> {
        let jobs_dir = self.jobs_dir();
        if !jobs_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&jobs_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }

        ids.sort();
        Ok(ids)
    }
}
