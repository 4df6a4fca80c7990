//! Output-stage filter primitives.
//!
//! All filters: `new(..., sample_rate)`, `process(sample) -> sample`, `reset()`.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Cutoff of the post-hysteresis DC blocker.
pub const DC_BLOCK_HZ: f64 = 10.0;

/// State-variable high-pass, topology-preserving (trapezoidal) form.
///
///   g  = tan(pi * fc / fs),  k = 1 / Q
///   a1 = 1 / (1 + g (g + k)),  a2 = g a1,  a3 = g a2
///   hp = x - k v1 - v2
pub struct SvfHighpass {
    k: f64,
    a1: f64,
    a2: f64,
    a3: f64,
    ic1: f64,
    ic2: f64,
}

impl SvfHighpass {
    pub fn new(cutoff_hz: f64, q: f64, sample_rate: f64) -> Self {
        let mut f = Self {
            k: 0.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            ic1: 0.0,
            ic2: 0.0,
        };
        f.set_cutoff(cutoff_hz, q, sample_rate);
        f
    }

    /// Update coefficients without resetting filter state.
    pub fn set_cutoff(&mut self, cutoff_hz: f64, q: f64, sample_rate: f64) {
        // Keep the prewarp away from tan's pole at Nyquist
        let fc = cutoff_hz.clamp(1e-3, 0.49 * sample_rate);
        let g = (PI * fc / sample_rate).tan();
        self.k = 1.0 / q.max(1e-3);
        self.a1 = 1.0 / (1.0 + g * (g + self.k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let v3 = x - self.ic2;
        let v1 = self.a1 * self.ic1 + self.a2 * v3;
        let v2 = self.ic2 + self.a2 * self.ic1 + self.a3 * v3;
        self.ic1 = 2.0 * v1 - self.ic1;
        self.ic2 = 2.0 * v2 - self.ic2;
        x - self.k * v1 - v2
    }

    pub fn reset(&mut self) {
        self.ic1 = 0.0;
        self.ic2 = 0.0;
    }
}

/// DC blocker: Butterworth SVF high-pass at [`DC_BLOCK_HZ`].
///
/// Hysteresis with asymmetric remanence leaves an offset on the magnetization
/// output; this strips it before the output gain.
pub struct DcBlocker {
    hpf: SvfHighpass,
}

impl DcBlocker {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            hpf: SvfHighpass::new(DC_BLOCK_HZ, FRAC_1_SQRT_2, sample_rate),
        }
    }

    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        self.hpf.process(x)
    }

    pub fn reset(&mut self) {
        self.hpf.reset();
    }
}
