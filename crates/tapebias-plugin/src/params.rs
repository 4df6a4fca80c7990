use nih_plug::prelude::*;
use tapebias_dsp::{BiasControls, Engine, Mode, StageGains};

/// Gain/drive/mix smoothing time.
const SMOOTHING_MS: f32 = 20.0;

/// Bias resolution selector, one entry per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum BiasResolution {
    #[name = "K28 (ultra lofi)"]
    K28,
    #[name = "K45 (lofi)"]
    K45,
    #[name = "K63 (vintage)"]
    K63,
    #[name = "K99 (warm)"]
    K99,
    #[name = "K121 (standard)"]
    K121,
    #[name = "K187 (high quality)"]
    K187,
    #[name = "K253 (detailed)"]
    K253,
    #[name = "K495 (ultra)"]
    K495,
    #[name = "K1045 (extreme)"]
    K1045,
    #[name = "K2101 (beyond)"]
    K2101,
}

impl From<BiasResolution> for Mode {
    fn from(r: BiasResolution) -> Self {
        match r {
            BiasResolution::K28 => Mode::K28,
            BiasResolution::K45 => Mode::K45,
            BiasResolution::K63 => Mode::K63,
            BiasResolution::K99 => Mode::K99,
            BiasResolution::K121 => Mode::K121,
            BiasResolution::K187 => Mode::K187,
            BiasResolution::K253 => Mode::K253,
            BiasResolution::K495 => Mode::K495,
            BiasResolution::K1045 => Mode::K1045,
            BiasResolution::K2101 => Mode::K2101,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum EngineParam {
    #[name = "LUT"]
    Lut,
    #[name = "Exact"]
    Exact,
}

impl From<EngineParam> for Engine {
    fn from(e: EngineParam) -> Self {
        match e {
            EngineParam::Lut => Engine::Lut,
            EngineParam::Exact => Engine::Exact,
        }
    }
}

/// Gain parameter shown in dB but stored and smoothed as linear gain.
fn gain_param(name: &str, default_db: f64, min_db: f32, max_db: f32) -> FloatParam {
    FloatParam::new(
        name,
        util::db_to_gain(default_db as f32),
        FloatRange::Skewed {
            min: util::db_to_gain(min_db),
            max: util::db_to_gain(max_db),
            factor: FloatRange::gain_skew_factor(min_db, max_db),
        },
    )
    .with_smoother(SmoothingStyle::Linear(SMOOTHING_MS))
    .with_unit(" dB")
    .with_value_to_string(formatters::v2s_f32_gain_to_db(1))
    .with_string_to_value(formatters::s2v_f32_gain_to_db())
}

#[derive(Params)]
pub struct TapebiasParams {
    /// Pre-hysteresis level.
    #[id = "input_gain"]
    pub input_gain: FloatParam,

    /// Post-hysteresis level. Magnetization is normalized to +/-1, so
    /// this has far more range upward than input gain.
    #[id = "output_gain"]
    pub output_gain: FloatParam,

    /// Drive into the tape, on top of input gain.
    #[id = "drive"]
    pub drive: FloatParam,

    /// AC bias level (0 = no bias).
    #[id = "bias_level"]
    pub bias_level: FloatParam,

    /// Bias field multiplier.
    #[id = "bias_scale"]
    pub bias_scale: FloatParam,

    /// Bias cycles and substeps per sample.
    #[id = "bias_resolution"]
    pub bias_resolution: EnumParam<BiasResolution>,

    #[id = "engine"]
    pub engine: EnumParam<EngineParam>,

    /// Dry/wet.
    #[id = "mix"]
    pub mix: FloatParam,
}

impl Default for TapebiasParams {
    fn default() -> Self {
        Self {
            input_gain: gain_param("Input Gain", StageGains::DEFAULT_INPUT_DB, -24.0, 24.0),
            output_gain: gain_param("Output Gain", StageGains::DEFAULT_OUTPUT_DB, -24.0, 48.0),
            drive: gain_param("Drive", StageGains::DEFAULT_DRIVE_DB, -18.0, 18.0),

            bias_level: FloatParam::new(
                "Bias Level",
                BiasControls::DEFAULT_LEVEL as f32,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_step_size(0.01),

            bias_scale: FloatParam::new(
                "Bias Scale",
                BiasControls::DEFAULT_SCALE as f32,
                FloatRange::Skewed {
                    min: 1.0,
                    max: 100.0,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_step_size(0.1),

            bias_resolution: EnumParam::new("Bias Resolution", BiasResolution::K121),
            engine: EnumParam::new("Engine", EngineParam::Lut),

            mix: FloatParam::new("Mix", 1.0, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_smoother(SmoothingStyle::Linear(SMOOTHING_MS))
                .with_unit(" %")
                .with_value_to_string(formatters::v2s_f32_percentage(0))
                .with_string_to_value(formatters::s2v_f32_percentage()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_covers_every_mode() {
        for (i, mode) in Mode::ALL.into_iter().enumerate() {
            let r = BiasResolution::from_index(i);
            assert_eq!(Mode::from(r), mode);
        }
    }

    fn assert_db(param: &FloatParam, db: f32) {
        let actual = util::gain_to_db(param.value());
        assert!((actual - db).abs() < 1e-3, "{}: {actual} dB", param.name());
    }

    #[test]
    fn test_defaults() {
        let p = TapebiasParams::default();
        assert_db(&p.input_gain, -7.0);
        assert_db(&p.output_gain, 40.0);
        assert_db(&p.drive, -13.0);
        assert_eq!(p.mix.value(), 1.0);
        assert_eq!(Mode::from(p.bias_resolution.value()), Mode::K121);
        assert_eq!(Engine::from(p.engine.value()), Engine::Lut);
    }

    #[test]
    fn test_gain_smooths_in_linear_domain() {
        let p = TapebiasParams::default();
        let from = util::db_to_gain(-12.0);
        let to = util::db_to_gain(12.0);
        p.drive.smoothed.reset(from);
        // 20 ms at 1 kHz is 20 steps; halfway lands on the linear midpoint
        p.drive.smoothed.set_target(1000.0, to);
        let mut v = from;
        for _ in 0..10 {
            v = p.drive.smoothed.next();
        }
        let mid = 0.5 * (from + to);
        assert!((v - mid).abs() < 1e-4 * mid, "{v} vs {mid}");
    }
}
