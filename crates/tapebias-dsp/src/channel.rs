//! One channel of the tape stage: gain staging around the hysteresis engine.
//!
//! Per sample:
//!   wet = dry * input_gain * drive
//!   wet = dc_block(engine(wet)) * output_gain
//!   out = dry * (1 - mix) + wet * mix
//!
//! Stereo uses one fully independent channel per side.

use crate::filters::DcBlocker;
use crate::lut::{LutPair, ProvenanceMismatch};
use crate::mode::Mode;
use crate::physics::PhysicsParams;
use crate::reference::ExactScheduler;
use crate::scheduler::JaScheduler;

/// Which integrator produces the magnetization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// Exact substep 0 plus table lookup for the rest.
    #[default]
    Lut,
    /// Every substep integrated. N times the cost of `Lut`.
    Exact,
}

pub fn db_to_gain(db: f64) -> f64 {
    10.0f64.powf(db / 20.0)
}

/// Linear gains applied around the engine, one value per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageGains {
    pub input_gain: f64,
    pub drive: f64,
    pub output_gain: f64,
    /// Wet fraction in [0, 1]
    pub mix: f64,
}

impl StageGains {
    pub const DEFAULT_INPUT_DB: f64 = -7.0;
    pub const DEFAULT_DRIVE_DB: f64 = -13.0;
    pub const DEFAULT_OUTPUT_DB: f64 = 40.0;

    /// Linear gains; only `mix` is clamped.
    pub fn new(input_gain: f64, drive: f64, output_gain: f64, mix: f64) -> Self {
        Self {
            input_gain,
            drive,
            output_gain,
            mix: mix.clamp(0.0, 1.0),
        }
    }

    pub fn from_db(input_db: f64, drive_db: f64, output_db: f64, mix: f64) -> Self {
        Self::new(
            db_to_gain(input_db),
            db_to_gain(drive_db),
            db_to_gain(output_db),
            mix,
        )
    }
}

impl Default for StageGains {
    fn default() -> Self {
        Self::from_db(
            Self::DEFAULT_INPUT_DB,
            Self::DEFAULT_DRIVE_DB,
            Self::DEFAULT_OUTPUT_DB,
            1.0,
        )
    }
}

pub struct HysteresisChannel<'lut> {
    scheduler: JaScheduler<'lut>,
    exact: ExactScheduler,
    engine: Engine,
    dc_blocker: DcBlocker,
}

impl<'lut> HysteresisChannel<'lut> {
    pub fn new(sample_rate: f64, mode: Mode, physics: PhysicsParams) -> Self {
        Self {
            scheduler: JaScheduler::new(sample_rate, mode, physics),
            exact: ExactScheduler::new(mode, physics),
            engine: Engine::default(),
            dc_blocker: DcBlocker::new(sample_rate),
        }
    }

    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.exact.reset();
        self.dc_blocker.reset();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.scheduler.set_mode(mode);
        self.exact.set_mode(mode);
    }

    pub fn set_physics(&mut self, physics: PhysicsParams) {
        self.scheduler.set_physics(physics);
        self.exact.set_physics(physics);
    }

    pub fn set_bias_controls(&mut self, level: f64, scale: f64) {
        self.scheduler.set_bias_controls(level, scale);
        self.exact.set_bias_controls(level, scale);
    }

    pub fn set_lut(&mut self, lut: Option<LutPair<'lut>>) {
        self.scheduler.set_lut(lut);
    }

    /// Switch integrator. The newly active one starts from rest.
    pub fn set_engine(&mut self, engine: Engine) {
        if self.engine == engine {
            return;
        }
        self.engine = engine;
        match engine {
            Engine::Lut => self.scheduler.reset(),
            Engine::Exact => self.exact.reset(),
        }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn mode(&self) -> Mode {
        self.scheduler.mode()
    }

    pub fn scheduler(&self) -> &JaScheduler<'lut> {
        &self.scheduler
    }

    pub fn exact(&self) -> &ExactScheduler {
        &self.exact
    }

    /// See [`JaScheduler::provenance_mismatch`]. Only meaningful for
    /// [`Engine::Lut`].
    pub fn provenance_mismatch(&self) -> Option<ProvenanceMismatch> {
        match self.engine {
            Engine::Lut => self.scheduler.provenance_mismatch(),
            Engine::Exact => None,
        }
    }

    #[inline]
    pub fn process(&mut self, dry: f64, gains: &StageGains) -> f64 {
        let h_audio = dry * gains.input_gain * gains.drive;
        let m = match self.engine {
            Engine::Lut => self.scheduler.process(h_audio),
            Engine::Exact => self.exact.process(h_audio),
        };
        let wet = self.dc_blocker.process(m) * gains.output_gain;
        dry * (1.0 - gains.mix) + wet * gains.mix
    }
}
