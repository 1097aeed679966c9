//! Job records on disk.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::analysis::load_mono;
use crate::diagnostics::{
    render_spectrogram, spectrogram_file_name, SpectrogramTrack, SpectrogramView,
};
use crate::logging::{JobLogger, LogConfig};
use crate::models::{AlignmentOutcome, AlignmentParameters, JobRecord, JobStatus};

use super::layout::MediaLayout;
use super::runner::run_alignment;
use super::{JobError, JobResult};

/// Submit, look up and process jobs under one media root.
#[derive(Debug, Clone)]
pub struct JobStore {
    layout: MediaLayout,
    log_config: LogConfig,
}

impl JobStore {
    /// Store over `layout` with default per-job logging.
    pub fn new(layout: MediaLayout) -> Self {
        Self {
            layout,
            log_config: LogConfig::default(),
        }
    }

    /// Use this configuration for per-job loggers.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn layout(&self) -> &MediaLayout {
        &self.layout
    }

    /// Copy both inputs into the uploads layout and queue a job.
    ///
    /// Parameters are validated first so a bad mode never reaches disk.
    pub fn submit(
        &self,
        inhouse: &Path,
        external: &Path,
        params: AlignmentParameters,
    ) -> JobResult<String> {
        params.validate()?;
        for input in [inhouse, external] {
            if !input.is_file() {
                return Err(JobError::InputNotFound(input.to_path_buf()));
            }
        }

        self.layout.ensure_dirs()?;
        let job_id = Uuid::new_v4().to_string();

        let inhouse_path = self.copy_upload(&job_id, "inhouse", inhouse)?;
        let external_path = self.copy_upload(&job_id, "external", external)?;

        let record = JobRecord::queued(job_id.clone(), inhouse_path, external_path, params);
        self.save(&record)?;

        tracing::info!("Queued job {}", job_id);
        Ok(job_id)
    }

    /// Load one record.
    pub fn get(&self, job_id: &str) -> JobResult<JobRecord> {
        check_job_id(job_id)?;
        let path = self.layout.job_path(job_id);
        if !path.is_file() {
            return Err(JobError::NotFound(job_id.to_string()));
        }

        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// All readable records, oldest first. Unreadable files are skipped.
    pub fn list(&self) -> JobResult<Vec<JobRecord>> {
        let mut records = Vec::new();
        for job_id in self.layout.job_ids()? {
            match self.get(&job_id) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping job {}: {}", job_id, e),
            }
        }

        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    /// Write a record atomically (temp file, then rename).
    pub fn save(&self, record: &JobRecord) -> JobResult<()> {
        check_job_id(&record.job_id)?;
        fs::create_dir_all(self.layout.jobs_dir())?;

        let path = self.layout.job_path(&record.job_id);
        let json = serde_json::to_string_pretty(record)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved job '{}' ({})", record.job_id, record.status);
        Ok(())
    }

    /// Run a queued job to completion.
    ///
    /// The record goes queued -> running -> completed/failed and is saved at
    /// each step. Anything that goes wrong once the job is running, including
    /// setting up its log, ends up in `error` with status failed. Only
    /// failures to read or write the record itself are returned.
    pub fn process(&self, job_id: &str) -> JobResult<JobRecord> {
        let mut record = self.get(job_id)?;
        if record.status != JobStatus::Queued {
            return Err(JobError::NotQueued {
                job_id: job_id.to_string(),
                status: record.status,
            });
        }

        record.status = JobStatus::Running;
        self.save(&record)?;

        match self.run_job(&record) {
            Ok(outcome) => {
                record.status = JobStatus::Completed;
                record.result = Some(outcome);
                tracing::info!("Job {} completed", job_id);
            }
            Err(e) => {
                record.status = JobStatus::Failed;
                record.error = Some(e.to_string());
                tracing::warn!("Job {} failed: {}", job_id, e);
            }
        }

        self.save(&record)?;
        Ok(record)
    }

    fn run_job(&self, record: &JobRecord) -> JobResult<AlignmentOutcome> {
        let results_dir = self.layout.results_dir(&record.job_id);
        let logger = JobLogger::create(&results_dir, self.log_config.clone())?;

        let result = run_alignment(
            &record.inhouse_path,
            &record.external_path,
            &record.params,
            &results_dir,
            &logger,
        );
        if let Err(e) = &result {
            logger.error(&e.to_string());
        }
        logger.close();
        result
    }

    /// Process every queued job, oldest first.
    ///
    /// A job whose record cannot be handled is logged and skipped; the rest
    /// of the queue still runs.
    pub fn process_pending(&self) -> JobResult<Vec<JobRecord>> {
        let pending: Vec<String> = self
            .list()?
            .into_iter()
            .filter(|r| r.status == JobStatus::Queued)
            .map(|r| r.job_id)
            .collect();

        tracing::info!("{} queued job(s)", pending.len());

        let mut processed = Vec::with_capacity(pending.len());
        for job_id in pending {
            match self.process(&job_id) {
                Ok(record) => processed.push(record),
                Err(e) => tracing::error!("Could not process job {}: {}", job_id, e),
            }
        }
        Ok(processed)
    }

    /// Spectrogram PNG of one track of a job, rendered if needed.
    ///
    /// The default view is reused when already on disk. Other views are
    /// always recomputed from the audio, which must still exist: uploads for
    /// the in-house and external tracks, the applied output for `aligned`.
    pub fn spectrogram(
        &self,
        job_id: &str,
        track: SpectrogramTrack,
        view: SpectrogramView,
    ) -> JobResult<PathBuf> {
        let record = self.get(job_id)?;
        let path = self
            .layout
            .results_dir(job_id)
            .join(spectrogram_file_name(track, view));

        if view == SpectrogramView::Default && path.is_file() {
            return Ok(path);
        }

        let source = match track {
            SpectrogramTrack::Inhouse => Some(record.inhouse_path.clone()),
            SpectrogramTrack::External => Some(record.external_path.clone()),
            SpectrogramTrack::Aligned => record
                .result
                .as_ref()
                .and_then(|outcome| outcome.aligned_audio_path.clone()),
        }
        .filter(|p| p.is_file())
        .ok_or_else(|| JobError::AudioMissing {
            job_id: job_id.to_string(),
            track,
        })?;

        let signal = load_mono(&source, record.params.sr)?;
        render_spectrogram(&signal, view, &path)?;
        Ok(path)
    }

    /// Pin or unpin a job. Pinned jobs survive retention purges.
    pub fn set_pinned(&self, job_id: &str, pinned: bool) -> JobResult<JobRecord> {
        let mut record = self.get(job_id)?;
        record.pinned = pinned;
        self.save(&record)?;
        Ok(record)
    }

    fn copy_upload(&self, job_id: &str, role: &str, source: &Path) -> JobResult<PathBuf> {
        let slot = self.layout.upload_slot(job_id, role);
        fs::create_dir_all(&slot)?;

        let file_name = source
            .file_name()
            .ok_or_else(|| JobError::InputNotFound(source.to_path_buf()))?;
        let dest = slot.join(file_name);
        fs::copy(source, &dest)?;
        Ok(dest)
    }
}

/// Reject IDs that could point outside the jobs folder.
fn check_job_id(job_id: &str) -> JobResult<()> {
    let valid = !job_id.is_empty()
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(JobError::InvalidId(job_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_inputs() -> (TempDir, JobStore, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let inhouse = temp_dir.path().join("board mix.wav");
        let external = temp_dir.path().join("camera.wav");
        fs::write(&inhouse, b"RIFF").unwrap();
        fs::write(&external, b"RIFF").unwrap();

        let store = JobStore::new(MediaLayout::new(temp_dir.path().join("data")));
        (temp_dir, store, inhouse, external)
    }

    #[test]
    fn submit_copies_uploads_and_queues() {
        let (_dir, store, inhouse, external) = store_with_inputs();

        let job_id = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();
        let record = store.get(&job_id).unwrap();

        assert_eq!(record.status, JobStatus::Queued);
        assert!(record.has_raw_audio);
        assert_eq!(
            record.inhouse_path,
            store
                .layout()
                .upload_slot(&job_id, "inhouse")
                .join("board mix.wav")
        );
        assert!(record.external_path.is_file());
        assert!(!store
            .layout()
            .job_path(&job_id)
            .with_extension("json.tmp")
            .exists());
    }

    #[test]
    fn submit_rejects_bad_mode_and_missing_input() {
        let (dir, store, inhouse, external) = store_with_inputs();

        let params = AlignmentParameters {
            mode: "sideways".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            store.submit(&inhouse, &external, params),
            Err(JobError::Parameters(_))
        ));

        let missing = dir.path().join("nope.wav");
        assert!(matches!(
            store.submit(&inhouse, &missing, AlignmentParameters::default()),
            Err(JobError::InputNotFound(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn get_unknown_job_is_not_found() {
        let (_dir, store, _, _) = store_with_inputs();
        assert!(matches!(store.get("missing"), Err(JobError::NotFound(_))));
    }

    #[test]
    fn list_skips_unreadable_records() {
        let (_dir, store, inhouse, external) = store_with_inputs();
        let job_id = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();
        fs::write(store.layout().job_path("broken"), "{not json").unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].job_id, job_id);
    }

    #[test]
    fn failed_run_is_recorded_on_the_job() {
        let (_dir, store, inhouse, external) = store_with_inputs();
        let job_id = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();

        // Remove the upload so decoding fails regardless of the host tools
        let record = store.get(&job_id).unwrap();
        fs::remove_file(&record.inhouse_path).unwrap();

        let processed = store.process(&job_id).unwrap();
        assert_eq!(processed.status, JobStatus::Failed);
        assert!(processed.error.unwrap().contains("not found"));
        assert_eq!(store.get(&job_id).unwrap().status, JobStatus::Failed);

        assert!(matches!(
            store.process(&job_id),
            Err(JobError::NotQueued { .. })
        ));
        assert!(store.process_pending().unwrap().is_empty());
    }

    #[test]
    fn unwritable_results_dir_fails_the_job() {
        let (_dir, store, inhouse, external) = store_with_inputs();
        let job_id = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();

        // A plain file where the results folder should go
        fs::create_dir_all(store.layout().results_root()).unwrap();
        fs::write(store.layout().results_dir(&job_id), b"in the way").unwrap();

        let processed = store.process(&job_id).unwrap();
        assert_eq!(processed.status, JobStatus::Failed);
        assert!(processed.error.is_some());

        let persisted = store.get(&job_id).unwrap();
        assert_eq!(persisted.status, JobStatus::Failed);
        assert_eq!(persisted.error, processed.error);
    }

    #[test]
    fn pending_queue_runs_past_a_failing_job() {
        let (_dir, store, inhouse, external) = store_with_inputs();
        let blocked = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();
        let other = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();

        fs::create_dir_all(store.layout().results_root()).unwrap();
        fs::write(store.layout().results_dir(&blocked), b"in the way").unwrap();

        let processed = store.process_pending().unwrap();
        let mut ids: Vec<&str> = processed.iter().map(|r| r.job_id.as_str()).collect();
        ids.sort();
        let mut expected = vec![blocked.as_str(), other.as_str()];
        expected.sort();

        assert_eq!(ids, expected);
        assert!(processed.iter().all(|r| r.status != JobStatus::Running));
        assert!(store
            .list()
            .unwrap()
            .iter()
            .all(|r| r.status != JobStatus::Queued && r.status != JobStatus::Running));
    }

    #[test]
    fn path_like_ids_are_rejected() {
        let (dir, store, inhouse, external) = store_with_inputs();
        let job_id = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();

        // A record placed next to the media root, reachable only via `..`
        let outside = dir.path().join("outside.json");
        fs::copy(store.layout().job_path(&job_id), &outside).unwrap();

        for bad in ["../../outside", "../outside", "a/b", "a\\b", "..", ""] {
            assert!(
                matches!(store.get(bad), Err(JobError::InvalidId(_))),
                "{:?} was accepted",
                bad
            );
            assert!(matches!(
                store.set_pinned(bad, true),
                Err(JobError::InvalidId(_))
            ));
        }

        let untouched: JobRecord =
            serde_json::from_str(&fs::read_to_string(&outside).unwrap()).unwrap();
        assert!(!untouched.pinned);
    }

    #[test]
    fn spectrogram_needs_the_audio() {
        let (_dir, store, inhouse, external) = store_with_inputs();
        let job_id = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();

        // No applied output yet
        assert!(matches!(
            store.spectrogram(&job_id, SpectrogramTrack::Aligned, SpectrogramView::Long),
            Err(JobError::AudioMissing { .. })
        ));

        // Uploads purged
        fs::remove_dir_all(store.layout().uploads_dir(&job_id)).unwrap();
        assert!(matches!(
            store.spectrogram(&job_id, SpectrogramTrack::Inhouse, SpectrogramView::HighRes),
            Err(JobError::AudioMissing { .. })
        ));
    }

    #[test]
    fn cached_default_spectrogram_is_reused() {
        let (_dir, store, inhouse, external) = store_with_inputs();
        let job_id = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();
        fs::remove_dir_all(store.layout().uploads_dir(&job_id)).unwrap();

        let cached = store
            .layout()
            .results_dir(&job_id)
            .join(spectrogram_file_name(
                SpectrogramTrack::External,
                SpectrogramView::Default,
            ));
        fs::create_dir_all(cached.parent().unwrap()).unwrap();
        fs::write(&cached, b"png").unwrap();

        let path = store
            .spectrogram(&job_id, SpectrogramTrack::External, SpectrogramView::Default)
            .unwrap();
        assert_eq!(path, cached);
    }

    #[test]
    fn pinning_persists() {
        let (_dir, store, inhouse, external) = store_with_inputs();
        let job_id = store
            .submit(&inhouse, &external, AlignmentParameters::default())
            .unwrap();

        store.set_pinned(&job_id, true).unwrap();
        assert!(store.get(&job_id).unwrap().pinned);
    }
}
