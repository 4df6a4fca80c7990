//! Per-sample hysteresis scheduler: exact substep 0, LUT for the rest.
//!
//! Each audio sample spans `bias_cycles_per_sample` cycles of the bias
//! oscillator, cut into `total_substeps` integration steps. Only substep 0
//! depends on the previous sample's state, so it is integrated exactly; the
//! remaining N-1 substeps are read from two precomputed tables keyed by the
//! substep-0 result and the raw audio field.
//!
//! Per sample:
//!   M1        = substep(M_prev, H_prev, sin(phase + dphi/2), H_audio)
//!   M_end     = LUT_end(M1, H_audio)
//!   sumM_rest = LUT_sum(M1, H_audio)
//!   output    = (M1 + sumM_rest) / N
//!
//! `process` does not allocate, lock, or branch on errors. Configuration
//! setters are meant to be called between samples from the same thread.

use std::f64::consts::TAU;

use crate::lut::{LutPair, LutProvenance, ProvenanceMismatch};
use crate::mode::{Mode, ResolutionTier};
use crate::physics::{BiasControls, NormalizedCoefficients, PhysicsParams};
use crate::substep::{JaState, bias_offset, execute_substep};

pub struct JaScheduler<'lut> {
    sample_rate: f64,
    mode: Mode,
    tier: ResolutionTier,
    physics: PhysicsParams,
    bias: BiasControls,
    coeffs: NormalizedCoefficients,

    // Mode-derived
    inv_total_substeps: f64,
    /// Bias phase per substep
    dphi: f64,
    /// Bias phase per sample
    phase_advance: f64,

    lut: Option<LutPair<'lut>>,

    // Recursive state
    bias_phase: f64,
    state: JaState,
}

impl<'lut> JaScheduler<'lut> {
    /// Create a scheduler with default bias controls and no LUT bound.
    pub fn new(sample_rate: f64, mode: Mode, physics: PhysicsParams) -> Self {
        let bias = BiasControls::default();
        let tier = *mode.tier();
        let mut s = Self {
            sample_rate: sample_rate.max(1.0),
            mode,
            tier,
            physics,
            bias,
            coeffs: NormalizedCoefficients::new(&physics, &bias),
            inv_total_substeps: 0.0,
            dphi: 0.0,
            phase_advance: 0.0,
            lut: None,
            bias_phase: 0.0,
            state: JaState::default(),
        };
        s.update_mode_derived();
        s
    }

    /// Clear the recursive state. Configuration and the LUT binding are kept.
    pub fn reset(&mut self) {
        self.bias_phase = 0.0;
        self.state = JaState::default();
    }

    /// Switch resolution tier. No-op if `mode` is already active.
    ///
    /// The caller must rebind LUT data generated for the new tier.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.tier = *mode.tier();
        self.update_mode_derived();
    }

    pub fn set_physics(&mut self, physics: PhysicsParams) {
        self.physics = physics;
        self.update_derived();
    }

    /// Set bias level (clamped to [0, 1]) and scale (clamped to >= 0).
    pub fn set_bias_controls(&mut self, level: f64, scale: f64) {
        self.bias = BiasControls::new(level, scale);
        self.update_derived();
    }

    /// Bind (or with `None`, unbind) the remainder tables.
    pub fn set_lut(&mut self, lut: Option<LutPair<'lut>>) {
        self.lut = lut;
    }

    /// Process one audio-field sample and return the time-averaged
    /// magnetization over the sample period.
    #[inline]
    pub fn process(&mut self, h_audio: f64) -> f64 {
        let phase_start = self.bias_phase;
        let n = self.tier.total_substeps as f64;

        let m1 = execute_substep(
            &self.coeffs,
            self.state,
            bias_offset(phase_start, self.dphi, 0.0),
            h_audio,
        )
        .m;

        let (m_end, sum_m_rest) = match &self.lut {
            Some(lut) => (lut.m_end(m1, h_audio), lut.sum_m_rest(m1, h_audio)),
            None => (0.0, 0.0),
        };

        // H_prev is the field at the midpoint of the last substep, which is
        // what the next sample's dH is measured against.
        self.state = JaState {
            m: m_end.clamp(-1.0, 1.0),
            h: h_audio
                + self.coeffs.bias_amplitude * bias_offset(phase_start, self.dphi, n - 1.0),
        };

        self.bias_phase = (phase_start + self.phase_advance) % TAU;

        (m1 + sum_m_rest) * self.inv_total_substeps
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tier(&self) -> &ResolutionTier {
        &self.tier
    }

    pub fn total_substeps(&self) -> u32 {
        self.tier.total_substeps
    }

    pub fn bias_cycles_per_sample(&self) -> f64 {
        self.tier.bias_cycles_per_sample
    }

    pub fn inv_total_substeps(&self) -> f64 {
        self.inv_total_substeps
    }

    pub fn physics(&self) -> &PhysicsParams {
        &self.physics
    }

    pub fn bias_controls(&self) -> &BiasControls {
        &self.bias
    }

    pub fn coefficients(&self) -> &NormalizedCoefficients {
        &self.coeffs
    }

    pub fn lut(&self) -> Option<&LutPair<'lut>> {
        self.lut.as_ref()
    }

    pub fn bias_phase(&self) -> f64 {
        self.bias_phase
    }

    /// Persisted `(M_prev, H_prev)`.
    pub fn state(&self) -> JaState {
        self.state
    }

    /// Compare the active mode and bias controls against the bound table's
    /// provenance. `None` when they agree, or when nothing (or a table without
    /// provenance) is bound. Never consulted by `process`.
    pub fn provenance_mismatch(&self) -> Option<ProvenanceMismatch> {
        let table = *self.lut.as_ref()?.provenance()?;
        let active = LutProvenance {
            mode: self.mode,
            bias: self.bias,
        };
        let mismatch = ProvenanceMismatch { table, active };
        (mismatch.mode_differs() || mismatch.bias_differs()).then_some(mismatch)
    }

    fn update_derived(&mut self) {
        self.coeffs = NormalizedCoefficients::new(&self.physics, &self.bias);
    }

    fn update_mode_derived(&mut self) {
        self.inv_total_substeps = self.tier.inv_total_substeps();
        self.dphi = self.tier.phase_increment();
        self.phase_advance = self.tier.phase_span();
    }
}
