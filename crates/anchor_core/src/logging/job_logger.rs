//! Per-job log written next to the job's results.
//!
//! Every message goes to `align.log` in the results folder and is kept in
//! memory for the job record. FFmpeg stderr is held in a bounded tail; in
//! compact mode it only reaches the log when a failed apply dumps the tail.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, LogLevel, MessagePrefix};

/// Log file name inside a job's results folder.
pub const JOB_LOG_NAME: &str = "align.log";

/// Stages of one alignment run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Anchor,
    Command,
    Apply,
    Spectrograms,
}

impl Stage {
    fn title(&self) -> &'static str {
        match self {
            Stage::Decode => "Decoding inputs",
            Stage::Anchor => "Locating first anchor",
            Stage::Command => "Building shift command",
            Stage::Apply => "Applying shift",
            Stage::Spectrograms => "Rendering spectrograms",
        }
    }
}

/// Log of one alignment job.
pub struct JobLogger {
    file_writer: Mutex<Option<BufWriter<File>>>,
    config: LogConfig,
    /// Most recent FFmpeg stderr lines.
    ffmpeg_tail: Mutex<VecDeque<String>>,
    /// Every message logged, without timestamps, in order.
    history: Mutex<Vec<String>>,
}

impl JobLogger {
    /// Open `align.log` in `results_dir`, creating the folder.
    pub fn create(results_dir: &Path, config: LogConfig) -> std::io::Result<Self> {
        fs::create_dir_all(results_dir)?;
        let file = File::create(results_dir.join(JOB_LOG_NAME))?;

        Ok(Self {
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            ffmpeg_tail: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            history: Mutex::new(Vec::new()),
            config,
        })
    }

    fn log(&self, level: LogLevel, message: String) {
        if level < self.config.level {
            return;
        }

        self.write_line(&message);
        self.history.lock().push(message);
    }

    pub fn stage(&self, stage: Stage) {
        self.log(LogLevel::Info, MessagePrefix::Phase.format(stage.title()));
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message.to_string());
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message.to_string());
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, MessagePrefix::Error.format(message));
    }

    /// The FFmpeg command built for this job.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, MessagePrefix::Command.format(command));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, MessagePrefix::Success.format(message));
    }

    /// One line of FFmpeg stderr. Kept in the tail; also written out
    /// unless compact.
    pub fn ffmpeg_line(&self, line: &str) {
        {
            let mut tail = self.ffmpeg_tail.lock();
            if tail.len() >= self.config.error_tail.max(1) {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }

        if !self.config.compact {
            self.write_line(&format!("[ffmpeg] {}", line));
        }
    }

    /// Write the FFmpeg tail into the log file, after a failed apply.
    pub fn dump_ffmpeg_tail(&self) {
        let tail = self.ffmpeg_tail.lock();
        if tail.is_empty() {
            return;
        }

        self.write_line("[ffmpeg/tail]");
        for line in tail.iter() {
            self.write_line(line);
        }
    }

    /// Messages at or above the configured level.
    pub fn lines(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    pub fn flush(&self) {
        if let Some(writer) = self.file_writer.lock().as_mut() {
            let _ = writer.flush();
        }
    }

    /// Flush and close the file. Later messages only reach `lines()`.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn write_line(&self, message: &str) {
        if let Some(writer) = self.file_writer.lock().as_mut() {
            let _ = if self.config.show_timestamps {
                writeln!(writer, "[{}] {}", Local::now().format("%H:%M:%S"), message)
            } else {
                writeln!(writer, "{}", message)
            };
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn plain() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn log_lands_in_results_dir() {
        let dir = tempdir().unwrap();
        let results = dir.path().join("results").join("job-1");
        let logger = JobLogger::create(&results, LogConfig::default()).unwrap();

        logger.stage(Stage::Anchor);
        logger.info("XCORR anchor => offset (delay external to match in-house) = 0.050000 s");
        logger.flush();

        let content = fs::read_to_string(results.join(JOB_LOG_NAME)).unwrap();
        assert!(content.starts_with('['));
        assert!(content.contains("=== Locating first anchor ==="));
        assert!(content.contains("XCORR anchor"));
    }

    #[test]
    fn history_has_prefixes_but_no_timestamps() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::create(dir.path(), LogConfig::default()).unwrap();

        logger.command("ffmpeg -y -i \"ext.wav\"");
        logger.warn("Content anchor not found at threshold 0.780; falling back to xcorr");

        assert_eq!(
            logger.lines(),
            vec![
                "$ ffmpeg -y -i \"ext.wav\"".to_string(),
                "[WARN] Content anchor not found at threshold 0.780; falling back to xcorr"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn below_level_messages_are_dropped() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            level: LogLevel::Warn,
            ..plain()
        };
        let logger = JobLogger::create(dir.path(), config).unwrap();

        logger.debug("window sizes");
        logger.stage(Stage::Decode);
        logger.error("decode failed");

        assert_eq!(logger.lines(), vec!["[ERROR] decode failed".to_string()]);
    }

    #[test]
    fn compact_tail_is_bounded_and_dumped_on_demand() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            error_tail: 3,
            ..plain()
        };
        let logger = JobLogger::create(dir.path(), config).unwrap();

        for i in 0..6 {
            logger.ffmpeg_line(&format!("ffmpeg line {}", i));
        }
        logger.flush();
        let before = fs::read_to_string(dir.path().join(JOB_LOG_NAME)).unwrap();
        assert!(before.is_empty());

        logger.dump_ffmpeg_tail();
        logger.close();
        let after = fs::read_to_string(dir.path().join(JOB_LOG_NAME)).unwrap();
        assert_eq!(
            after,
            "[ffmpeg/tail]\nffmpeg line 3\nffmpeg line 4\nffmpeg line 5\n"
        );
        assert!(logger.lines().is_empty());
    }

    #[test]
    fn verbose_mode_writes_ffmpeg_lines_through() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: false,
            ..plain()
        };
        let logger = JobLogger::create(dir.path(), config).unwrap();

        logger.ffmpeg_line("Invalid data found when processing input");
        logger.close();

        let content = fs::read_to_string(dir.path().join(JOB_LOG_NAME)).unwrap();
        assert_eq!(content, "[ffmpeg] Invalid data found when processing input\n");
    }

    #[test]
    fn closing_keeps_history() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::create(dir.path(), plain()).unwrap();
        logger.close();
        logger.success("Aligned audio: aligned.wav");
        assert_eq!(logger.lines(), vec!["[SUCCESS] Aligned audio: aligned.wav".to_string()]);
    }
}
