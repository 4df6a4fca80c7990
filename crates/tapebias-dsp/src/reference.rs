//! Exact full-substep hysteresis integration.
//!
//! [`ExactScheduler`] integrates every substep of every sample. It is the
//! ground truth the LUT scheduler approximates, and a fallback engine when no
//! table is available for a tier (at N times the per-sample cost).

use std::f64::consts::TAU;

use crate::mode::{Mode, ResolutionTier};
use crate::physics::{BiasControls, NormalizedCoefficients, PhysicsParams};
use crate::substep::{JaState, bias_offset, execute_substep};

/// Substeps 1..N-1 of one sample, starting from substep 0's result `m1`.
///
/// Bias phase starts at 0. Returns `(M_end, sumM_rest)`, the pair the LUT
/// tables store at grid point `(m1, h_audio)`.
pub fn remainder_response(
    coeffs: &NormalizedCoefficients,
    tier: &ResolutionTier,
    m1: f64,
    h_audio: f64,
) -> (f64, f64) {
    let dphi = tier.phase_increment();
    let mut state = JaState {
        m: m1,
        h: h_audio + coeffs.bias_amplitude * bias_offset(0.0, dphi, 0.0),
    };
    let mut sum_m = 0.0;
    for i in 1..tier.total_substeps {
        state = execute_substep(coeffs, state, bias_offset(0.0, dphi, i as f64), h_audio);
        sum_m += state.m;
    }
    (state.m, sum_m)
}

pub struct ExactScheduler {
    mode: Mode,
    tier: ResolutionTier,
    physics: PhysicsParams,
    bias: BiasControls,
    coeffs: NormalizedCoefficients,
    bias_phase: f64,
    state: JaState,
}

impl ExactScheduler {
    pub fn new(mode: Mode, physics: PhysicsParams) -> Self {
        let bias = BiasControls::default();
        Self {
            mode,
            tier: *mode.tier(),
            physics,
            bias,
            coeffs: NormalizedCoefficients::new(&physics, &bias),
            bias_phase: 0.0,
            state: JaState::default(),
        }
    }

    pub fn reset(&mut self) {
        self.bias_phase = 0.0;
        self.state = JaState::default();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            self.tier = *mode.tier();
        }
    }

    pub fn set_physics(&mut self, physics: PhysicsParams) {
        self.physics = physics;
        self.coeffs = NormalizedCoefficients::new(&self.physics, &self.bias);
    }

    pub fn set_bias_controls(&mut self, level: f64, scale: f64) {
        self.bias = BiasControls::new(level, scale);
        self.coeffs = NormalizedCoefficients::new(&self.physics, &self.bias);
    }

    /// Integrate all substeps of one sample; returns their mean magnetization.
    pub fn process(&mut self, h_audio: f64) -> f64 {
        let phase_start = self.bias_phase;
        let dphi = self.tier.phase_increment();

        let mut state = self.state;
        let mut sum_m = 0.0;
        for i in 0..self.tier.total_substeps {
            state = execute_substep(
                &self.coeffs,
                state,
                bias_offset(phase_start, dphi, i as f64),
                h_audio,
            );
            sum_m += state.m;
        }
        self.state = state;
        self.bias_phase = (phase_start + self.tier.phase_span()) % TAU;

        sum_m * self.tier.inv_total_substeps()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn coefficients(&self) -> &NormalizedCoefficients {
        &self.coeffs
    }

    pub fn bias_phase(&self) -> f64 {
        self.bias_phase
    }

    pub fn state(&self) -> JaState {
        self.state
    }
}
