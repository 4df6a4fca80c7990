//! hyst-renderer — offline driver for the tape hysteresis chain.
//!
//! `render` runs a WAV file through one independent channel chain per input
//! channel, `sine` probes the chain with a test tone, and `compare` measures how
//! far the LUT scheduler drifts from exact full-substep integration.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tapebias_dsp::{
    BiasControls, Engine, ExactScheduler, HysteresisChannel, JaScheduler, LutBank, LutTable,
    Mode, PhysicsParams, StageGains,
};

#[derive(Parser)]
#[command(
    name = "hyst-renderer",
    about = "Tape hysteresis renderer — AC-biased Jiles-Atherton on WAV files"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process an input WAV through the tape chain.
    Render {
        /// Input WAV file (integer or float).
        input: PathBuf,
        /// Output WAV file (32-bit float).
        output: PathBuf,
        #[command(flatten)]
        chain: ChainArgs,
    },
    /// Run a sine through one channel and report its level.
    Sine {
        #[command(flatten)]
        tone: ToneArgs,
        #[command(flatten)]
        chain: ChainArgs,
        /// Optional WAV output of the processed tone.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare LUT and exact schedulers on the same sine.
    Compare {
        #[command(flatten)]
        tone: ToneArgs,
        /// Resolution tier (K28 .. K2101).
        #[arg(long, default_value = "K121", value_parser = parse_mode)]
        mode: Mode,
        #[arg(long, default_value_t = BiasControls::DEFAULT_LEVEL)]
        bias_level: f64,
        #[arg(long, default_value_t = BiasControls::DEFAULT_SCALE)]
        bias_scale: f64,
        /// Directory with ja_lut_<mode>_*.f64 tables.
        #[arg(long)]
        lut_dir: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum EngineArg {
    Lut,
    Exact,
}

impl From<EngineArg> for Engine {
    fn from(e: EngineArg) -> Self {
        match e {
            EngineArg::Lut => Engine::Lut,
            EngineArg::Exact => Engine::Exact,
        }
    }
}

#[derive(Args)]
struct ChainArgs {
    /// Resolution tier (K28 .. K2101).
    #[arg(long, default_value = "K121", value_parser = parse_mode)]
    mode: Mode,
    #[arg(long, value_enum, default_value_t = EngineArg::Lut)]
    engine: EngineArg,
    /// Input gain in dB.
    #[arg(long, default_value_t = StageGains::DEFAULT_INPUT_DB, allow_hyphen_values = true)]
    input_gain: f64,
    /// Drive in dB.
    #[arg(long, default_value_t = StageGains::DEFAULT_DRIVE_DB, allow_hyphen_values = true)]
    drive: f64,
    /// Output gain in dB.
    #[arg(long, default_value_t = StageGains::DEFAULT_OUTPUT_DB, allow_hyphen_values = true)]
    output_gain: f64,
    #[arg(long, default_value_t = BiasControls::DEFAULT_LEVEL)]
    bias_level: f64,
    #[arg(long, default_value_t = BiasControls::DEFAULT_SCALE)]
    bias_scale: f64,
    /// Wet fraction, 0..1.
    #[arg(long, default_value_t = 1.0)]
    mix: f64,
    /// Directory with ja_lut_<mode>_*.f64 tables.
    #[arg(long)]
    lut_dir: Option<PathBuf>,
}

impl ChainArgs {
    fn gains(&self) -> StageGains {
        StageGains::from_db(self.input_gain, self.drive, self.output_gain, self.mix)
    }

    fn channel<'a>(&self, sample_rate: f64, bank: &'a LutBank) -> HysteresisChannel<'a> {
        let mut ch = HysteresisChannel::new(sample_rate, self.mode, PhysicsParams::default());
        ch.set_bias_controls(self.bias_level, self.bias_scale);
        ch.set_engine(self.engine.into());
        ch.set_lut(bank.get(self.mode).map(LutTable::binding));
        if let Some(m) = ch.provenance_mismatch() {
            log::warn!(
                "{} LUT was generated for bias {:.2} x {:.1}, running {:.2} x {:.1}",
                self.mode.name(),
                m.table.bias.level(),
                m.table.bias.scale(),
                m.active.bias.level(),
                m.active.bias.scale()
            );
        }
        ch
    }
}

#[derive(Args)]
struct ToneArgs {
    /// Tone frequency in Hz.
    #[arg(long, default_value_t = 440.0)]
    freq: f64,
    /// Peak amplitude of the tone.
    #[arg(long, default_value_t = 0.5)]
    amp: f64,
    /// Duration in seconds.
    #[arg(short, long, default_value_t = 1.0)]
    duration: f64,
    #[arg(long, default_value_t = 48000)]
    sample_rate: u32,
}

impl ToneArgs {
    fn samples(&self) -> Vec<f64> {
        let sr = self.sample_rate as f64;
        let n = (self.duration * sr).round() as usize;
        (0..n)
            .map(|i| self.amp * (2.0 * PI * self.freq * i as f64 / sr).sin())
            .collect()
    }
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = Mode::ALL.iter().map(|m| m.name()).collect();
        format!("unknown mode '{s}' (expected one of {})", names.join(", "))
    })
}

fn load_bank(dir: Option<&Path>, mode: Mode) -> LutBank {
    match dir {
        Some(dir) => LutBank::load_dir(dir, BiasControls::default()),
        None => {
            log::warn!("No --lut-dir given; {} runs substep 0 only", mode.name());
            LutBank::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Render {
            input,
            output,
            chain,
        } => render(&input, &output, &chain),
        Command::Sine {
            tone,
            chain,
            output,
        } => sine(&tone, &chain, output.as_deref()),
        Command::Compare {
            tone,
            mode,
            bias_level,
            bias_scale,
            lut_dir,
        } => compare(&tone, mode, bias_level, bias_scale, lut_dir.as_deref()),
    }
}

fn render(input: &Path, output: &Path, chain: &ChainArgs) -> Result<()> {
    let (channels, sample_rate) = read_wav(input)?;
    let bank = load_bank(chain.lut_dir.as_deref(), chain.mode);
    let gains = chain.gains();

    log::info!(
        "Rendering {} ({} ch, {} Hz, {} samples) with {} / {:?}",
        input.display(),
        channels.len(),
        sample_rate,
        channels.first().map_or(0, Vec::len),
        chain.mode.name(),
        Engine::from(chain.engine)
    );

    let processed: Vec<Vec<f64>> = channels
        .iter()
        .map(|samples| {
            let mut ch = chain.channel(sample_rate as f64, &bank);
            samples.iter().map(|&x| ch.process(x, &gains)).collect()
        })
        .collect();

    write_wav(output, &processed, sample_rate)?;
    let (peak, rms) = levels(processed.iter().flatten().copied());
    eprintln!("  Peak: {peak:.6} ({:.1} dBFS), RMS: {rms:.6}", to_db(peak));
    eprintln!("  Written: {}", output.display());
    Ok(())
}

fn sine(tone: &ToneArgs, chain: &ChainArgs, output: Option<&Path>) -> Result<()> {
    let bank = load_bank(chain.lut_dir.as_deref(), chain.mode);
    let gains = chain.gains();
    let mut ch = chain.channel(tone.sample_rate as f64, &bank);
    let out: Vec<f64> = tone.samples().into_iter().map(|x| ch.process(x, &gains)).collect();

    // Skip the first 10% so the DC blocker has settled
    let (peak, rms) = levels(out.iter().skip(out.len() / 10).copied());
    println!(
        "{} {:?} {:.1} Hz amp {:.3}: peak {peak:.6} ({:.1} dBFS), rms {rms:.6}",
        chain.mode.name(),
        Engine::from(chain.engine),
        tone.freq,
        tone.amp,
        to_db(peak)
    );

    if let Some(path) = output {
        write_wav(path, std::slice::from_ref(&out), tone.sample_rate)?;
        eprintln!("  Written: {}", path.display());
    }
    Ok(())
}

fn compare(
    tone: &ToneArgs,
    mode: Mode,
    bias_level: f64,
    bias_scale: f64,
    lut_dir: Option<&Path>,
) -> Result<()> {
    let bank = load_bank(lut_dir, mode);
    let physics = PhysicsParams::default();

    let mut lut = JaScheduler::new(tone.sample_rate as f64, mode, physics);
    lut.set_bias_controls(bias_level, bias_scale);
    lut.set_lut(bank.get(mode).map(LutTable::binding));
    let mut exact = ExactScheduler::new(mode, physics);
    exact.set_bias_controls(bias_level, bias_scale);

    let input = tone.samples();
    if input.is_empty() {
        bail!("tone is empty: duration {}s at {} Hz", tone.duration, tone.sample_rate);
    }
    let (mut sum_sq_diff, mut sum_sq_ref, mut peak_diff) = (0.0, 0.0, 0.0f64);
    for &h in &input {
        let a = lut.process(h);
        let b = exact.process(h);
        let d = a - b;
        sum_sq_diff += d * d;
        sum_sq_ref += b * b;
        peak_diff = peak_diff.max(d.abs());
    }
    let n = input.len() as f64;
    let rms_diff = (sum_sq_diff / n).sqrt();
    let rms_ref = (sum_sq_ref / n).sqrt();

    println!(
        "{} ({} substeps), {} samples: rms diff {rms_diff:.3e}, peak diff {peak_diff:.3e}, exact rms {rms_ref:.6} ({:.1} dB error)",
        mode.name(),
        mode.tier().total_substeps,
        input.len(),
        to_db(rms_diff / rms_ref.max(1e-30))
    );
    Ok(())
}

fn levels(samples: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut peak, mut sum_sq, mut n) = (0.0f64, 0.0, 0usize);
    for s in samples {
        peak = peak.max(s.abs());
        sum_sq += s * s;
        n += 1;
    }
    (peak, if n > 0 { (sum_sq / n as f64).sqrt() } else { 0.0 })
}

fn to_db(x: f64) -> f64 {
    20.0 * x.max(1e-30).log10()
}

/// Read a WAV into per-channel f64 buffers in [-1, 1].
fn read_wav(path: &Path) -> Result<(Vec<Vec<f64>>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();
    let num_channels = spec.channels as usize;
    if num_channels == 0 {
        bail!("{} has no channels", path.display());
    }

    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mut channels = vec![Vec::with_capacity(interleaved.len() / num_channels); num_channels];
    for frame in interleaved.chunks_exact(num_channels) {
        for (ch, &s) in channels.iter_mut().zip(frame) {
            ch.push(s);
        }
    }
    Ok((channels, spec.sample_rate))
}

/// Write per-channel buffers as interleaved 32-bit float.
fn write_wav(path: &Path, channels: &[Vec<f64>], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let len = channels.first().map_or(0, Vec::len);
    for i in 0..len {
        for ch in channels {
            writer.write_sample(ch[i] as f32)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
