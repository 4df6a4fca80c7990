// tapebias — AC-biased Jiles-Atherton tape saturation plugin (CLAP + VST3).

use nih_plug::prelude::*;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tapebias_dsp::{
    BiasControls, Engine, HysteresisChannel, LutBank, LutPair, LutTable, Mode, PhysicsParams,
    StageGains,
};

mod params;
use params::TapebiasParams;

/// Directory holding `ja_lut_<mode>_*.f64` tables.
const LUT_DIR_ENV: &str = "TAPEBIAS_LUT_DIR";

/// Tables are read once per process and shared by every instance.
static LUT_BANK: OnceLock<LutBank> = OnceLock::new();

fn lut_bank() -> &'static LutBank {
    LUT_BANK.get_or_init(|| match std::env::var_os(LUT_DIR_ENV) {
        Some(dir) => LutBank::load_dir(&PathBuf::from(dir), BiasControls::default()),
        None => {
            nih_warn!("{LUT_DIR_ENV} not set; LUT engine will run without tables");
            LutBank::default()
        }
    })
}

fn lut_for(bank: Option<&'static LutBank>, mode: Mode) -> Option<LutPair<'static>> {
    bank?.get(mode).map(LutTable::binding)
}

struct Tapebias {
    params: Arc<TapebiasParams>,

    // One independent chain per channel
    channels: Vec<HysteresisChannel<'static>>,
    /// Set in `initialize`
    lut_bank: Option<&'static LutBank>,
    active_mode: Mode,
    sample_rate: f64,
}

impl Default for Tapebias {
    fn default() -> Self {
        let sr = 44100.0;
        let mode = Mode::default();
        Self {
            params: Arc::new(TapebiasParams::default()),
            channels: (0..2)
                .map(|_| HysteresisChannel::new(sr, mode, PhysicsParams::default()))
                .collect(),
            lut_bank: None,
            active_mode: mode,
            sample_rate: sr,
        }
    }
}

impl Tapebias {
    /// Push block-rate parameters into every channel. All setters are
    /// idempotent; a tier change also rebinds that tier's tables.
    fn apply_block_params(&mut self) {
        let mode = Mode::from(self.params.bias_resolution.value());
        let engine = Engine::from(self.params.engine.value());
        let level = self.params.bias_level.value() as f64;
        let scale = self.params.bias_scale.value() as f64;

        let rebind = mode != self.active_mode;
        for ch in &mut self.channels {
            if rebind {
                ch.set_mode(mode);
                ch.set_lut(lut_for(self.lut_bank, mode));
            }
            ch.set_engine(engine);
            ch.set_bias_controls(level, scale);
        }
        self.active_mode = mode;
    }
}

impl Plugin for Tapebias {
    const NAME: &'static str = "tapebias";
    const VENDOR: &'static str = "tapebias";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate as f64;
        let bank = lut_bank();
        self.lut_bank = Some(bank);

        let num_channels = audio_io_layout
            .main_output_channels
            .map(NonZeroU32::get)
            .unwrap_or(2) as usize;
        let mode = Mode::from(self.params.bias_resolution.value());

        // Rebuild at the host rate, bound to the current tier's tables
        self.channels = (0..num_channels)
            .map(|_| {
                let mut ch = HysteresisChannel::new(self.sample_rate, mode, PhysicsParams::default());
                ch.set_lut(lut_for(self.lut_bank, mode));
                ch
            })
            .collect();
        self.active_mode = mode;
        self.apply_block_params();

        if lut_for(self.lut_bank, mode).is_none() {
            nih_warn!("No LUT for {}; LUT engine outputs substep 0 only", mode.name());
        }
        if let Some(m) = self.channels.first().and_then(|ch| ch.provenance_mismatch()) {
            nih_warn!(
                "LUT for {} was generated for {} with bias {:.2} x {:.1}; active bias is {:.2} x {:.1}",
                mode.name(),
                m.table.mode.name(),
                m.table.bias.level(),
                m.table.bias.scale(),
                m.active.bias.level(),
                m.active.bias.scale()
            );
        }
        nih_log!(
            "tapebias: {} Hz, {} channel(s), {} ({} substeps), {}/{} LUT tiers loaded",
            self.sample_rate,
            num_channels,
            mode.name(),
            mode.tier().total_substeps,
            bank.loaded_count(),
            Mode::COUNT
        );

        true
    }

    fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.reset();
        }
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.apply_block_params();

        for mut channel_samples in buffer.iter_samples() {
            // Gains are smoothed per sample in the linear domain
            let gains = StageGains::new(
                self.params.input_gain.smoothed.next() as f64,
                self.params.drive.smoothed.next() as f64,
                self.params.output_gain.smoothed.next() as f64,
                self.params.mix.smoothed.next() as f64,
            );
            for (ch, s) in self.channels.iter_mut().zip(channel_samples.iter_mut()) {
                *s = ch.process(*s as f64, &gains) as f32;
            }
        }

        ProcessStatus::Normal
    }
}

impl ClapPlugin for Tapebias {
    const CLAP_ID: &'static str = "com.tapebias.tape-hysteresis";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("AC-biased tape hysteresis — Jiles-Atherton magnetization with LUT substeps");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Distortion,
        ClapFeature::Stereo,
        ClapFeature::Mono,
    ];
}

impl Vst3Plugin for Tapebias {
    const VST3_CLASS_ID: [u8; 16] = *b"TapebiasJAHyster";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Distortion];
}

nih_export_clap!(Tapebias);
nih_export_vst3!(Tapebias);
