//! Retention purge of old jobs and raw uploads.
//!
//! Two tiers:
//! - jobs created before the job cutoff lose their record, uploads and results
//! - other jobs still holding raw audio lose only their uploads once the raw
//!   deadline (`expires_at`, else `created_at + raw_audio_only_days`) is
//!   before the raw cutoff
//!
//! Pinned jobs are never touched.

use std::fs;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::config::RetentionSettings;

use super::layout::MediaLayout;
use super::JobResult;

/// Retention windows in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub job_retention_days: u32,
    pub raw_audio_only_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionSettings::default().into()
    }
}

impl From<RetentionSettings> for RetentionPolicy {
    fn from(settings: RetentionSettings) -> Self {
        Self {
            job_retention_days: settings.job_retention_days,
            raw_audio_only_days: settings.raw_audio_only_days,
        }
    }
}

/// One thing a purge removes (or would remove, on a dry run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeAction {
    /// Record, uploads and results.
    Job { job_id: String },
    /// Uploads only.
    RawUploads { job_id: String },
}

impl std::fmt::Display for PurgeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurgeAction::Job { job_id } => write!(f, "[JOB] {}", job_id),
            PurgeAction::RawUploads { job_id } => write!(f, "[RAW] {}", job_id),
        }
    }
}

/// Outcome of a purge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Actions decided, in job order.
    pub actions: Vec<PurgeAction>,
    /// Record files removed.
    pub jobs_deleted: usize,
    /// Upload folders removed as part of whole-job purges.
    pub uploads_deleted: usize,
    /// Result folders removed.
    pub results_deleted: usize,
    /// Upload folders removed by the raw-audio tier.
    pub raw_only_purged: usize,
    /// Pinned jobs left alone.
    pub pinned_skipped: usize,
    /// Record files that could not be read.
    pub unreadable: usize,
    /// Nothing was removed.
    pub dry_run: bool,
}

/// The fields retention looks at. Timestamps that do not parse count as absent.
#[derive(Debug, Deserialize)]
struct RetentionView {
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default = "default_true")]
    has_raw_audio: bool,
    #[serde(default)]
    pinned: bool,
}

fn default_true() -> bool {
    true
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Apply `policy` to every job under `layout` as of `now`.
///
/// On a dry run the actions are still listed but no counter moves and no
/// file is touched.
pub fn purge(
    layout: &MediaLayout,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
    dry_run: bool,
) -> JobResult<PurgeReport> {
    let job_cutoff = now - Duration::days(i64::from(policy.job_retention_days));
    let raw_window = Duration::days(i64::from(policy.raw_audio_only_days));
    let raw_cutoff = now - raw_window;

    let mut report = PurgeReport {
        dry_run,
        ..Default::default()
    };

    for job_id in layout.job_ids()? {
        let view = match fs::read_to_string(layout.job_path(&job_id))
            .ok()
            .and_then(|content| serde_json::from_str::<RetentionView>(&content).ok())
        {
            Some(view) => view,
            None => {
                tracing::warn!("Skipping unreadable job record {}", job_id);
                report.unreadable += 1;
                continue;
            }
        };

        if view.pinned {
            report.pinned_skipped += 1;
            continue;
        }

        let created_at = parse_timestamp(view.created_at.as_deref());
        let expires_at = parse_timestamp(view.expires_at.as_deref());

        if created_at.is_some_and(|created| created < job_cutoff) {
            tracing::info!(
                "Purging job {} (older than {} days)",
                job_id,
                policy.job_retention_days
            );
            report.actions.push(PurgeAction::Job {
                job_id: job_id.clone(),
            });
            if !dry_run {
                purge_job(layout, &job_id, &mut report)?;
            }
            continue;
        }

        if !view.has_raw_audio {
            continue;
        }

        let raw_deadline = expires_at.or_else(|| created_at.map(|created| created + raw_window));
        if raw_deadline.is_some_and(|deadline| deadline < raw_cutoff) {
            let uploads = layout.uploads_dir(&job_id);
            if !uploads.is_dir() {
                continue;
            }
            tracing::info!("Purging raw uploads for {}", job_id);
            report.actions.push(PurgeAction::RawUploads {
                job_id: job_id.clone(),
            });
            if !dry_run {
                fs::remove_dir_all(&uploads)?;
                report.raw_only_purged += 1;
            }
        }
    }

    Ok(report)
}

fn purge_job(layout: &MediaLayout, job_id: &str, report: &mut PurgeReport) -> JobResult<()> {
    let record = layout.job_path(job_id);
    if record.is_file() {
        fs::remove_file(&record)?;
        report.jobs_deleted += 1;
    }

    let uploads = layout.uploads_dir(job_id);
    if uploads.is_dir() {
        fs::remove_dir_all(&uploads)?;
        report.uploads_deleted += 1;
    }

    let results = layout.results_dir(job_id);
    if results.is_dir() {
        fs::remove_dir_all(&results)?;
        report.results_deleted += 1;
    }

    Ok(())
}
