//! first-anchor - align two recordings by their first common anchor.
//!
//! `align` is the one-shot tool: analyze, write the FFmpeg command and
//! optionally apply it. The other subcommands drive the file-backed job
//! store under the media root.

mod args;

use std::env;
use std::path::Path;
use std::process;

use anchor_core::analysis::{find_first_anchor, load_mono};
use anchor_core::config::ConfigManager;
use anchor_core::diagnostics::{render_similarity_curve, render_waveform_overlay};
use anchor_core::jobs::{purge, JobStore, MediaLayout, RetentionPolicy};
use anchor_core::logging::init_tracing;
use anchor_core::models::JobRecord;
use anchor_core::shift::{apply_shift, build_shift_plan, write_command_file, ShiftError, ShiftRequest};

use args::{split_config_flag, AlignArgs, SpectrogramArgs, SubmitArgs};

/// Config file picked up when `--config` is not given and it exists.
const DEFAULT_CONFIG_PATH: &str = ".config/first-anchor.toml";

fn print_usage() {
    println!("first-anchor - Align two audio files by the first common anchor");
    println!();
    println!("Usage: first-anchor <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  align       Analyze, write the FFmpeg command, optionally apply it (default)");
    println!("  submit      Queue a job under the media root");
    println!("  run-queue   Process every queued job");
    println!("  status      List jobs, or show one job as JSON");
    println!("  pin/unpin   Exempt a job from retention, or undo that");
    println!("  spectrogram Render a job's spectrogram and print its path");
    println!("  purge       Delete old jobs and raw uploads (--dry-run to preview)");
    println!();
    println!("Alignment options (align, submit):");
    println!("  --inhouse <PATH>          In-house recording (required)");
    println!("  --external <PATH>         External recording (required)");
    println!("  --sr <HZ>                 Analysis/output sample rate (default: 48000)");
    println!("  --mode <MODE>             external_to_inhouse (default) or inhouse_to_external");
    println!("  --prefer-trim             Accepted; trim/pad follows the offset sign");
    println!("  --anchor-mode <MODE>      xcorr (default) or content");
    println!("  --template-sec <S>        Content template length (default: 4.0)");
    println!("  --hop-sec <S>             Content hop (default: 0.1)");
    println!("  --min-sim <X>             Content similarity threshold (default: 0.78)");
    println!("  --threshold-db <DB>       Gate analysis copies below this level (alias: --vad-db)");
    println!("  --max-search <S>          Max +/- lag to search (default: 60; alias: --search-max-sec)");
    println!("  --ref-start-sec <S>       Analysis start of in-house (default: 0)");
    println!("  --search-start-sec <S>    Analysis start of external (default: 0)");
    println!("  --analysis-sec <S>        In-house analysis length (default: 30)");
    println!("  --apply                   Run the FFmpeg command");
    println!();
    println!("align outputs:");
    println!("  --out-cmd <PATH>          Command file (default: aligned_cmd.txt)");
    println!("  --out-audio <PATH>        Aligned WAV path");
    println!("  --waveform-png <PATH>     Raw waveform overlay (alias: --preview-png)");
    println!("  --similarity-png <PATH>   Similarity curve plot");
    println!();
    println!("submit options:");
    println!("  --no-waveform-png         Skip the waveform overlay");
    println!("  --no-similarity-png       Skip the similarity plot");
    println!("  --no-spectrograms         Skip the per-track spectrograms");
    println!("  --run                     Process the job right away");
    println!();
    println!("spectrogram <JOB_ID> options:");
    println!("  --track <TRACK>           inhouse (default), external or aligned");
    println!("  --view <VIEW>             default, long (5 min) or highRes (5 min, finer grid)");
    println!();
    println!("Global options:");
    println!("  --config <PATH>           TOML config (default: {} if present)", DEFAULT_CONFIG_PATH);
    println!("  --help                    Show this help message");
    println!();
    println!("Environment: ALIGN_MEDIA_ROOT, ALIGN_JOB_RETENTION_DAYS, ALIGN_RAW_AUDIO_ONLY_DAYS");
}

fn main() {
    let argv: Vec<String> = env::args().skip(1).collect();

    if argv.is_empty() {
        print_usage();
        process::exit(1);
    }
    if argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        process::exit(0);
    }

    let (config_path, argv) = split_config_flag(&argv).unwrap_or_else(|e| usage_error(&e));

    // Bare flags mean `align`, like the original single-purpose tool
    let (command, rest) = match argv.first().map(String::as_str) {
        Some(first) if !first.starts_with("--") => (first.to_string(), &argv[1..]),
        _ => ("align".to_string(), &argv[..]),
    };

    let config = load_config(config_path.as_deref());
    let logging = &config.settings().logging;
    let log_dir = logging.file_logging.then(|| config.logs_folder());
    let _guard = init_tracing(logging.level, log_dir.as_deref());

    let code = match command.as_str() {
        "align" => cmd_align(rest, &config),
        "submit" => cmd_submit(rest, &config),
        "run-queue" => cmd_run_queue(&config),
        "status" => cmd_status(rest, &config),
        "pin" => cmd_pin(rest, &config, true),
        "unpin" => cmd_pin(rest, &config, false),
        "purge" => cmd_purge(rest, &config),
        "spectrogram" => cmd_spectrogram(rest, &config),
        other => usage_error(&format!("Unknown command: {}", other)),
    };

    process::exit(code);
}

fn usage_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    eprintln!("Run with --help for usage.");
    process::exit(2);
}

fn load_config(path: Option<&Path>) -> ConfigManager {
    let mut manager = ConfigManager::new(path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH)));

    let result = match path {
        Some(_) => manager.load_or_create(),
        None if manager.path().exists() => manager.load(),
        None => Ok(()),
    };
    if let Err(e) = result {
        eprintln!("[ERROR] {}: {}", manager.path().display(), e);
        process::exit(2);
    }

    manager.apply_env_overrides();
    manager
}

fn store(config: &ConfigManager) -> JobStore {
    JobStore::new(MediaLayout::new(config.media_root()))
        .with_log_config(config.settings().logging.to_log_config())
}

fn cmd_align(args: &[String], config: &ConfigManager) -> i32 {
    let args = AlignArgs::parse(args, config.settings().alignment.clone())
        .unwrap_or_else(|e| usage_error(&e));
    let params = &args.params;

    for path in [&args.inhouse, &args.external] {
        if !path.is_file() {
            println!("[ERROR] File not found: {}", path.display());
            return 2;
        }
    }

    for png in [&args.waveform_png, &args.similarity_png].into_iter().flatten() {
        ensure_parent(png);
    }

    let (reference, target) = match (
        load_mono(&args.inhouse, params.sr),
        load_mono(&args.external, params.sr),
    ) {
        (Ok(reference), Ok(target)) => (reference, target),
        (Err(e), _) | (_, Err(e)) => {
            println!("[ERROR] {}", e);
            return 1;
        }
    };

    if let Some(png) = &args.waveform_png {
        match render_waveform_overlay(&reference, &target, png) {
            Ok(()) => println!("[INFO] Saved waveform overlay: {}", png.display()),
            Err(e) => println!("[WARN] Failed to build waveform overlay: {}", e),
        }
    }

    // Both were validated during parsing
    let (anchor_params, direction) = match (params.anchor_params(), params.direction()) {
        (Ok(a), Ok(d)) => (a, d),
        (Err(e), _) | (_, Err(e)) => usage_error(&e.to_string()),
    };

    let report = find_first_anchor(&reference, &target, &anchor_params);
    println!(
        "[INFO] Analysis sizes (samples): in-house={}, external={}, sr={}",
        report.reference_samples, report.target_samples, params.sr
    );
    println!(
        "[INFO] {} anchor => offset (delay external to match in-house) = {}",
        report.source, report.offset
    );

    if let Some(png) = &args.similarity_png {
        match render_similarity_curve(&report.curve, png) {
            Ok(()) => println!("[INFO] Saved similarity curve: {}", png.display()),
            Err(e) => println!("[WARN] Failed to plot similarity curve: {}", e),
        }
    }

    let plan = build_shift_plan(&ShiftRequest {
        inhouse_path: args.inhouse.clone(),
        external_path: args.external.clone(),
        sample_rate: params.sr,
        direction,
        offset: report.offset,
        prefer_trim: params.prefer_trim,
        output_path: args.out_audio.clone(),
    });

    if let Err(e) = write_command_file(&args.out_cmd, &plan.command) {
        println!("[ERROR] {}", e);
        return 1;
    }
    println!("[INFO] Wrote alignment command to: {}", args.out_cmd.display());
    println!("[INFO] Suggested:\n{}", plan.command);

    if params.apply {
        println!("[INFO] Applying alignment with FFmpeg...");
        match apply_shift(&plan.command) {
            Ok(()) => println!("[INFO] Alignment applied successfully."),
            Err(ShiftError::CommandFailed { exit_code, stderr }) => {
                eprint!("{}", stderr);
                println!("[ERROR] FFmpeg returned non-zero exit code: {}", exit_code);
                return exit_code;
            }
            Err(e) => {
                println!("[ERROR] {}", e);
                return 1;
            }
        }
    }

    println!("[DONE]");
    0
}

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Could not create {}: {}", parent.display(), e);
        }
    }
}

fn cmd_submit(args: &[String], config: &ConfigManager) -> i32 {
    let args = SubmitArgs::parse(args, config.settings().alignment.clone())
        .unwrap_or_else(|e| usage_error(&e));
    let store = store(config);

    let job_id = match store.submit(&args.inhouse, &args.external, args.params) {
        Ok(id) => id,
        Err(e) => {
            println!("[ERROR] {}", e);
            return 2;
        }
    };
    println!("{}", job_id);

    if args.run_now {
        return match store.process(&job_id) {
            Ok(record) => {
                print_summary(&record);
                if record.error.is_some() {
                    1
                } else {
                    0
                }
            }
            Err(e) => {
                println!("[ERROR] {}", e);
                1
            }
        };
    }
    0
}

fn cmd_run_queue(config: &ConfigManager) -> i32 {
    match store(config).process_pending() {
        Ok(records) => {
            for record in &records {
                print_summary(record);
            }
            let failed = records.iter().filter(|r| r.error.is_some()).count();
            println!("---");
            println!("Processed: {}  Failed: {}", records.len(), failed);
            if failed > 0 {
                1
            } else {
                0
            }
        }
        Err(e) => {
            println!("[ERROR] {}", e);
            1
        }
    }
}

fn cmd_status(args: &[String], config: &ConfigManager) -> i32 {
    let store = store(config);

    match args.first() {
        Some(job_id) => match store.get(job_id) {
            Ok(record) => match serde_json::to_string_pretty(&record) {
                Ok(json) => {
                    println!("{}", json);
                    0
                }
                Err(e) => {
                    println!("[ERROR] {}", e);
                    1
                }
            },
            Err(e) => {
                println!("[ERROR] {}", e);
                1
            }
        },
        None => match store.list() {
            Ok(records) => {
                for record in &records {
                    print_summary(record);
                }
                0
            }
            Err(e) => {
                println!("[ERROR] {}", e);
                1
            }
        },
    }
}

fn cmd_pin(args: &[String], config: &ConfigManager, pinned: bool) -> i32 {
    let Some(job_id) = args.first() else {
        usage_error("expected a job ID");
    };

    match store(config).set_pinned(job_id, pinned) {
        Ok(record) => {
            print_summary(&record);
            0
        }
        Err(e) => {
            println!("[ERROR] {}", e);
            1
        }
    }
}

fn cmd_spectrogram(args: &[String], config: &ConfigManager) -> i32 {
    let args = SpectrogramArgs::parse(args).unwrap_or_else(|e| usage_error(&e));

    match store(config).spectrogram(&args.job_id, args.track, args.view) {
        Ok(path) => {
            println!("{}", path.display());
            0
        }
        Err(e) => {
            println!("[ERROR] {}", e);
            1
        }
    }
}

fn cmd_purge(args: &[String], config: &ConfigManager) -> i32 {
    let mut dry_run = false;
    for arg in args {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            other => usage_error(&format!("Unknown option: {}", other)),
        }
    }

    let policy = RetentionPolicy::from(config.settings().retention.clone());
    let layout = MediaLayout::new(config.media_root());
    if !layout.jobs_dir().is_dir() {
        println!("No jobs directory found at {}", layout.jobs_dir().display());
        return 0;
    }

    match purge(&layout, &policy, chrono::Utc::now(), dry_run) {
        Ok(report) => {
            for action in &report.actions {
                println!("{}", action);
            }
            println!("---");
            println!("Jobs deleted:       {}", report.jobs_deleted);
            println!("Uploads deleted:    {}", report.uploads_deleted);
            println!("Results deleted:    {}", report.results_deleted);
            println!("Raw-only purged:    {}", report.raw_only_purged);
            println!("Pinned skipped:     {}", report.pinned_skipped);
            if report.dry_run {
                println!("(dry run) No files were actually removed.");
            }
            0
        }
        Err(e) => {
            println!("[ERROR] {}", e);
            1
        }
    }
}

fn print_summary(record: &JobRecord) {
    let detail = match (&record.result, &record.error) {
        (Some(outcome), _) => format!(
            "offset {:.6} s ({})",
            outcome.offset_sec,
            outcome.instruction.label()
        ),
        (None, Some(error)) => error.clone(),
        (None, None) => String::new(),
    };
    let pin = if record.pinned { " [pinned]" } else { "" };

    println!(
        "{}  {:<9}  {}{}  {}",
        record.job_id,
        record.status.to_string(),
        record.created_at.format("%Y-%m-%d %H:%M"),
        pin,
        detail
    );
}
