/// Integration tests for the hysteresis renderer CLI.
///
/// These drive the binary end to end and check the WAV it writes:
/// 1. `sine` writes a mono 32-bit float file of the requested length
/// 2. `render` keeps channel count, rate, and length
/// 3. A fully dry mix passes the input through untouched
/// 4. Bad arguments fail cleanly
use std::path::{Path, PathBuf};
use std::process::Command;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-q", "-p", "hyst-renderer", "--"]);
    cmd
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hyst_{}_{name}", std::process::id()))
}

fn read_f32(path: &Path) -> (hound::WavSpec, Vec<f32>) {
    let mut reader = hound::WavReader::open(path).expect("invalid WAV file");
    let spec = reader.spec();
    let samples = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

fn write_stereo_i16(path: &Path, frames: usize) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        let t = i as f64 / 44100.0;
        let l = (2.0 * std::f64::consts::PI * 220.0 * t).sin() * 0.5;
        let r = (2.0 * std::f64::consts::PI * 330.0 * t).sin() * 0.25;
        writer.write_sample((l * 32767.0) as i16).unwrap();
        writer.write_sample((r * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_sine_writes_float_wav() {
    let output_path = temp_path("sine.wav");
    let _ = std::fs::remove_file(&output_path);

    let status = cargo_bin()
        .args(["sine", "--freq", "1000", "-d", "0.25", "--mode", "k28", "-o"])
        .arg(&output_path)
        .status()
        .expect("failed to run hyst-renderer");

    assert!(status.success(), "hyst-renderer exited with error");
    let (spec, samples) = read_f32(&output_path);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(samples.len(), 12000);
    assert!(samples.iter().all(|s| s.is_finite()));

    std::fs::remove_file(&output_path).ok();
}

#[test]
fn test_exact_engine_is_audible() {
    let output_path = temp_path("exact.wav");
    let status = cargo_bin()
        .args(["sine", "--engine", "exact", "--mode", "K45", "-d", "0.2", "-o"])
        .arg(&output_path)
        .status()
        .unwrap();
    assert!(status.success());

    let (_, samples) = read_f32(&output_path);
    let peak = samples[samples.len() / 2..]
        .iter()
        .fold(0.0f32, |a, s| a.max(s.abs()));
    assert!(peak > 1e-3, "exact engine output is silent: {peak}");

    std::fs::remove_file(&output_path).ok();
}

#[test]
fn test_render_preserves_layout() {
    let input_path = temp_path("render_in.wav");
    let output_path = temp_path("render_out.wav");
    write_stereo_i16(&input_path, 4410);

    let status = cargo_bin()
        .args(["render"])
        .arg(&input_path)
        .arg(&output_path)
        .args(["--mode", "K63", "--drive", "-6"])
        .status()
        .unwrap();
    assert!(status.success());

    let (spec, samples) = read_f32(&output_path);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(samples.len(), 4410 * 2);
    assert!(samples.iter().all(|s| s.is_finite()));

    std::fs::remove_file(&input_path).ok();
    std::fs::remove_file(&output_path).ok();
}

#[test]
fn test_dry_mix_is_passthrough() {
    let input_path = temp_path("dry_in.wav");
    let output_path = temp_path("dry_out.wav");
    write_stereo_i16(&input_path, 2000);

    let status = cargo_bin()
        .args(["render"])
        .arg(&input_path)
        .arg(&output_path)
        .args(["--mix", "0"])
        .status()
        .unwrap();
    assert!(status.success());

    let mut reader = hound::WavReader::open(&input_path).unwrap();
    let input: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.unwrap() as f32 / 32768.0)
        .collect();
    let (_, output) = read_f32(&output_path);
    assert_eq!(input.len(), output.len());
    for (i, (a, b)) in input.iter().zip(&output).enumerate() {
        assert!((a - b).abs() < 1e-6, "sample {i}: in {a} out {b}");
    }

    std::fs::remove_file(&input_path).ok();
    std::fs::remove_file(&output_path).ok();
}

#[test]
fn test_compare_reports_without_tables() {
    let out = cargo_bin()
        .args(["compare", "--mode", "K28", "-d", "0.05"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("K28"), "unexpected report: {stdout}");
    assert!(stdout.contains("rms diff"), "unexpected report: {stdout}");
}

#[test]
fn test_unknown_mode_fails() {
    let status = cargo_bin()
        .args(["sine", "--mode", "K60", "-d", "0.1"])
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn test_missing_input_fails() {
    let status = cargo_bin()
        .args(["render"])
        .arg(temp_path("does_not_exist.wav"))
        .arg(temp_path("never_written.wav"))
        .status()
        .unwrap();
    assert!(!status.success());
}
