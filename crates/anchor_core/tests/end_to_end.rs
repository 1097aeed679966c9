//! Offset estimation through to the rendered FFmpeg command.

use std::path::PathBuf;

use anchor_core::analysis::{find_first_anchor, AnchorMode, AnchorParams, AnchorSource, Signal, WindowConfig};
use anchor_core::shift::{build_shift_plan, ShiftDirection, ShiftInstruction, ShiftRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SR: u32 = 48000;

fn noise(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn request(offset: anchor_core::analysis::Offset, direction: ShiftDirection) -> ShiftRequest {
    ShiftRequest {
        inhouse_path: PathBuf::from("inhouse.wav"),
        external_path: PathBuf::from("external.wav"),
        sample_rate: SR,
        direction,
        offset,
        prefer_trim: false,
        output_path: None,
    }
}

fn sine(freq: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / SR as f64).sin())
        .collect()
}

#[test]
fn sine_tone_with_2400_sample_lead_pads_50ms() {
    let a = sine(440.0, SR as usize * 3);
    let mut b = vec![0.0; 2400];
    b.extend_from_slice(&a);

    let params = AnchorParams {
        window: WindowConfig {
            max_search_secs: 1.0,
            ..Default::default()
        },
        ..Default::default()
    };

    let report = find_first_anchor(&Signal::new(a, SR), &Signal::new(b, SR), &params);

    assert_eq!(report.source, AnchorSource::Xcorr);
    assert!((report.offset.seconds() - 0.05).abs() <= 1.0 / SR as f64);

    let plan = build_shift_plan(&request(report.offset, ShiftDirection::ExternalToInhouse));
    assert_eq!(plan.moving_path, PathBuf::from("external.wav"));
    assert_eq!(plan.instruction, ShiftInstruction::Pad { milliseconds: 50 });
}

#[test]
fn external_delayed_by_50ms_is_padded() {
    let a = noise(SR as usize * 3, 42);
    let mut b = vec![0.0; 2400];
    b.extend_from_slice(&a);

    let params = AnchorParams {
        window: WindowConfig {
            max_search_secs: 1.0,
            ..Default::default()
        },
        ..Default::default()
    };

    let report = find_first_anchor(&Signal::new(a, SR), &Signal::new(b, SR), &params);

    assert_eq!(report.source, AnchorSource::Xcorr);
    assert!((report.offset.seconds() - 0.05).abs() <= 1.0 / SR as f64);

    let plan = build_shift_plan(&request(report.offset, ShiftDirection::ExternalToInhouse));
    assert_eq!(plan.instruction, ShiftInstruction::Pad { milliseconds: 50 });
    assert_eq!(
        plan.command.to_string(),
        "ffmpeg -y -i \"external.wav\" -ac 1 -ar 48000 -af \"adelay=50|50\" \
         -c:a pcm_s16le -rf64 always \"external_aligned.wav\""
    );
}

#[test]
fn moving_inhouse_instead_trims_it() {
    let a = noise(SR as usize * 3, 43);
    let mut b = vec![0.0; 2400];
    b.extend_from_slice(&a);

    let params = AnchorParams {
        window: WindowConfig {
            max_search_secs: 1.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let report = find_first_anchor(&Signal::new(a, SR), &Signal::new(b, SR), &params);

    let plan = build_shift_plan(&request(report.offset, ShiftDirection::InhouseToExternal));
    assert_eq!(plan.moving_path, PathBuf::from("inhouse.wav"));
    assert_eq!(
        plan.command.to_string(),
        "ffmpeg -y -i \"inhouse.wav\" -ac 1 -ar 48000 -ss 0.050000 \
         -c:a pcm_s16le -rf64 always \"inhouse_aligned.wav\""
    );
}

#[test]
fn identical_recordings_pass_through() {
    let a = noise(SR as usize * 2, 44);

    let params = AnchorParams {
        window: WindowConfig {
            max_search_secs: 0.5,
            ..Default::default()
        },
        mode: AnchorMode::Xcorr,
        ..Default::default()
    };
    let report = find_first_anchor(&Signal::new(a.clone(), SR), &Signal::new(a, SR), &params);

    assert!(report.offset.is_negligible());
    let plan = build_shift_plan(&request(report.offset, ShiftDirection::ExternalToInhouse));
    assert_eq!(plan.instruction, ShiftInstruction::Passthrough);
}
