//! Command-line flag parsing.

use std::path::PathBuf;
use std::str::FromStr;

use anchor_core::diagnostics::{SpectrogramTrack, SpectrogramView};
use anchor_core::models::AlignmentParameters;

/// Flags shared by `align` and `submit`: the alignment parameters.
#[derive(Debug, Clone)]
pub struct ParamFlags {
    pub params: AlignmentParameters,
    vad_db: Option<f64>,
    search_max_sec: Option<f64>,
}

impl ParamFlags {
    pub fn new(defaults: AlignmentParameters) -> Self {
        Self {
            params: defaults,
            vad_db: None,
            search_max_sec: None,
        }
    }

    /// Consume one parameter flag at `args[*i]`. Returns false when the flag
    /// is not a parameter flag.
    pub fn accept(&mut self, args: &[String], i: &mut usize) -> Result<bool, String> {
        let p = &mut self.params;
        match args[*i].as_str() {
            "--sr" => p.sr = parse_value(args, i)?,
            "--mode" => p.mode = take_value(args, i)?,
            "--prefer-trim" => p.prefer_trim = true,
            "--anchor-mode" => p.anchor_mode = take_value(args, i)?,
            "--template-sec" => p.template_sec = parse_value(args, i)?,
            "--hop-sec" => p.hop_sec = parse_value(args, i)?,
            "--min-sim" => p.min_sim = parse_value(args, i)?,
            "--threshold-db" => p.threshold_db = Some(parse_value(args, i)?),
            "--max-search" => p.max_search = parse_value(args, i)?,
            "--ref-start-sec" => p.ref_start_sec = parse_value(args, i)?,
            "--search-start-sec" => p.search_start_sec = parse_value(args, i)?,
            "--analysis-sec" => p.analysis_sec = parse_value(args, i)?,
            "--apply" => p.apply = true,
            "--vad-db" => self.vad_db = Some(parse_value(args, i)?),
            "--search-max-sec" => self.search_max_sec = Some(parse_value(args, i)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Resolve aliases (they win over the primary flags) and validate.
    pub fn finish(mut self) -> Result<AlignmentParameters, String> {
        if let Some(db) = self.vad_db {
            self.params.threshold_db = Some(db);
        }
        if let Some(secs) = self.search_max_sec {
            self.params.max_search = secs;
        }
        self.params.validate().map_err(|e| e.to_string())?;
        Ok(self.params)
    }
}

/// Parsed `align` invocation.
#[derive(Debug, Clone)]
pub struct AlignArgs {
    pub inhouse: PathBuf,
    pub external: PathBuf,
    pub params: AlignmentParameters,
    pub out_cmd: PathBuf,
    pub out_audio: Option<PathBuf>,
    pub waveform_png: Option<PathBuf>,
    pub similarity_png: Option<PathBuf>,
}

impl AlignArgs {
    pub fn parse(args: &[String], defaults: AlignmentParameters) -> Result<Self, String> {
        let mut flags = ParamFlags::new(defaults);
        let mut inhouse = None;
        let mut external = None;
        let mut out_cmd = PathBuf::from("aligned_cmd.txt");
        let mut out_audio = None;
        let mut waveform_png = None;
        let mut preview_png = None;
        let mut similarity_png = None;

        let mut i = 0;
        while i < args.len() {
            if !flags.accept(args, &mut i)? {
                match args[i].as_str() {
                    "--inhouse" => inhouse = Some(PathBuf::from(take_value(args, &mut i)?)),
                    "--external" => external = Some(PathBuf::from(take_value(args, &mut i)?)),
                    "--out-cmd" => out_cmd = PathBuf::from(take_value(args, &mut i)?),
                    "--out-audio" => out_audio = Some(PathBuf::from(take_value(args, &mut i)?)),
                    "--waveform-png" => {
                        waveform_png = Some(PathBuf::from(take_value(args, &mut i)?))
                    }
                    "--preview-png" => preview_png = Some(PathBuf::from(take_value(args, &mut i)?)),
                    "--similarity-png" => {
                        similarity_png = Some(PathBuf::from(take_value(args, &mut i)?))
                    }
                    other => return Err(format!("Unknown option: {}", other)),
                }
            }
            i += 1;
        }

        Ok(Self {
            inhouse: inhouse.ok_or("--inhouse is required")?,
            external: external.ok_or("--external is required")?,
            params: flags.finish()?,
            out_cmd,
            out_audio,
            waveform_png: preview_png.or(waveform_png),
            similarity_png,
        })
    }
}

/// Parsed `submit` invocation.
#[derive(Debug, Clone)]
pub struct SubmitArgs {
    pub inhouse: PathBuf,
    pub external: PathBuf,
    pub params: AlignmentParameters,
    pub run_now: bool,
}

impl SubmitArgs {
    pub fn parse(args: &[String], defaults: AlignmentParameters) -> Result<Self, String> {
        let mut flags = ParamFlags::new(defaults);
        let mut inhouse = None;
        let mut external = None;
        let mut run_now = false;

        let mut i = 0;
        while i < args.len() {
            if !flags.accept(args, &mut i)? {
                match args[i].as_str() {
                    "--inhouse" => inhouse = Some(PathBuf::from(take_value(args, &mut i)?)),
                    "--external" => external = Some(PathBuf::from(take_value(args, &mut i)?)),
                    "--no-waveform-png" => flags.params.generate_waveform_png = false,
                    "--no-similarity-png" => flags.params.generate_similarity_png = false,
                    "--no-spectrograms" => flags.params.generate_spectrograms = false,
                    "--run" => run_now = true,
                    other => return Err(format!("Unknown option: {}", other)),
                }
            }
            i += 1;
        }

        Ok(Self {
            inhouse: inhouse.ok_or("--inhouse is required")?,
            external: external.ok_or("--external is required")?,
            params: flags.finish()?,
            run_now,
        })
    }
}

/// Parsed `spectrogram` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramArgs {
    pub job_id: String,
    pub track: SpectrogramTrack,
    pub view: SpectrogramView,
}

impl SpectrogramArgs {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut job_id = None;
        let mut track = SpectrogramTrack::Inhouse;
        let mut view = SpectrogramView::Default;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--track" => track = take_value(args, &mut i)?.parse()?,
                "--view" => view = take_value(args, &mut i)?.parse()?,
                other if other.starts_with("--") => {
                    return Err(format!("Unknown option: {}", other))
                }
                other if job_id.is_none() => job_id = Some(other.to_string()),
                other => return Err(format!("Unexpected argument: {}", other)),
            }
            i += 1;
        }

        Ok(Self {
            job_id: job_id.ok_or("expected a job ID")?,
            track,
            view,
        })
    }
}

/// Remove `--config <PATH>` from anywhere in `args`.
pub fn split_config_flag(args: &[String]) -> Result<(Option<PathBuf>, Vec<String>), String> {
    let mut config = None;
    let mut rest = Vec::with_capacity(args.len());

    let mut i = 0;
    while i < args.len() {
        if args[i] == "--config" {
            config = Some(PathBuf::from(take_value(args, &mut i)?));
        } else {
            rest.push(args[i].clone());
        }
        i += 1;
    }

    Ok((config, rest))
}

/// Value following the flag at `args[*i]`; advances `i` past it.
fn take_value(args: &[String], i: &mut usize) -> Result<String, String> {
    let flag = &args[*i];
    match args.get(*i + 1) {
        Some(value) => {
            *i += 1;
            Ok(value.clone())
        }
        None => Err(format!("{} expects a value", flag)),
    }
}

fn parse_value<T: FromStr>(args: &[String], i: &mut usize) -> Result<T, String> {
    let flag = args[*i].clone();
    let raw = take_value(args, i)?;
    raw.parse()
        .map_err(|_| format!("Invalid value for {}: {}", flag, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn align_defaults() {
        let args = AlignArgs::parse(
            &argv("--inhouse a.wav --external b.wav"),
            AlignmentParameters::default(),
        )
        .unwrap();

        assert_eq!(args.out_cmd, PathBuf::from("aligned_cmd.txt"));
        assert_eq!(args.params.sr, 48000);
        assert_eq!(args.params.max_search, 60.0);
        assert!(!args.params.apply);
        assert_eq!(args.waveform_png, None);
    }

    #[test]
    fn aliases_override_primary_flags() {
        let args = AlignArgs::parse(
            &argv(
                "--vad-db -40 --inhouse a.wav --external b.wav --threshold-db -20 \
                 --search-max-sec 5 --max-search 30 --waveform-png w.png --preview-png p.png",
            ),
            AlignmentParameters::default(),
        )
        .unwrap();

        assert_eq!(args.params.threshold_db, Some(-40.0));
        assert_eq!(args.params.max_search, 5.0);
        assert_eq!(args.waveform_png, Some(PathBuf::from("p.png")));
    }

    #[test]
    fn align_rejects_bad_input() {
        let defaults = AlignmentParameters::default;
        assert!(AlignArgs::parse(&argv("--inhouse a.wav"), defaults()).is_err());
        assert!(AlignArgs::parse(
            &argv("--inhouse a --external b --mode sideways"),
            defaults()
        )
        .is_err());
        assert!(AlignArgs::parse(&argv("--inhouse a --external b --sr fast"), defaults()).is_err());
        assert!(AlignArgs::parse(&argv("--inhouse a --external b --bogus"), defaults()).is_err());
        assert!(AlignArgs::parse(&argv("--inhouse a --external"), defaults()).is_err());
    }

    #[test]
    fn submit_flags() {
        let args = SubmitArgs::parse(
            &argv(
                "--inhouse a --external b --anchor-mode content --no-waveform-png \
                 --no-spectrograms --run",
            ),
            AlignmentParameters::default(),
        )
        .unwrap();

        assert_eq!(args.params.anchor_mode, "content");
        assert!(!args.params.generate_waveform_png);
        assert!(args.params.generate_similarity_png);
        assert!(!args.params.generate_spectrograms);
        assert!(args.run_now);
    }

    #[test]
    fn spectrogram_flags() {
        let args = SpectrogramArgs::parse(&argv("job-1 --view highRes --track aligned")).unwrap();
        assert_eq!(
            args,
            SpectrogramArgs {
                job_id: "job-1".to_string(),
                track: SpectrogramTrack::Aligned,
                view: SpectrogramView::HighRes,
            }
        );

        let defaults = SpectrogramArgs::parse(&argv("job-1")).unwrap();
        assert_eq!(defaults.track, SpectrogramTrack::Inhouse);
        assert_eq!(defaults.view, SpectrogramView::Default);

        assert!(SpectrogramArgs::parse(&argv("--view long")).is_err());
        assert!(SpectrogramArgs::parse(&argv("job-1 --track mixed")).is_err());
        assert!(SpectrogramArgs::parse(&argv("job-1 job-2")).is_err());
    }

    #[test]
    fn config_flag_is_split_out() {
        let (config, rest) =
            split_config_flag(&argv("--inhouse a --config my.toml --external b")).unwrap();
        assert_eq!(config, Some(PathBuf::from("my.toml")));
        assert_eq!(rest, argv("--inhouse a --external b"));
    }
}
