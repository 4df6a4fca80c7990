//! Single Jiles-Atherton integration substep.
//!
//! One explicit Euler step of dM/dH over the field increment since the last
//! persisted state. The step is pure: it reads the previous state and returns
//! the new one, leaving the caller to decide what to persist.
//!
//!   H_new  = H_audio + A_bias * bias
//!   He     = H_new + alpha * M_prev
//!   Man    = tanh~(He / a),  dMan/dH = (1 - Man^2) / a
//!   pin    = dir * k - alpha * (Man - M_prev)
//!   dM/dH  = (c * dMan/dH + (Man - M_prev) / pin) / (1 - c * alpha * dMan/dH)
use crate::anhysteretic::anhysteretic;
use crate::physics::NormalizedCoefficients;

/// Offset added to the pinning term before inversion.
const PIN_EPSILON: f64 = 1e-6;
/// Offset added to the reversible-component denominator before inversion.
const DENOM_EPSILON: f64 = 1e-9;

/// Recursive magnetic state carried between substeps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JaState {
    /// Normalized magnetization, always within [-1, 1].
    pub m: f64,
    /// Total instantaneous field (audio + bias).
    pub h: f64,
}

/// Advance `prev` by one substep with bias sample `bias_offset` in [-1, 1].
///
/// Returns the new state; `M` is clamped to [-1, 1].
#[inline]
pub fn execute_substep(
    coeffs: &NormalizedCoefficients,
    prev: JaState,
    bias_offset: f64,
    h_audio: f64,
) -> JaState {
    let h_new = h_audio + coeffs.bias_amplitude * bias_offset;
    let dh = h_new - prev.h;
    let he = h_new + coeffs.alpha_norm * prev.m;

    let (man_e, dman_dh) = anhysteretic(he, coeffs.inv_a_norm);

    // Loading vs unloading branch
    let dir = if dh >= 0.0 { 1.0 } else { -1.0 };
    let pin = dir * coeffs.k_norm - coeffs.alpha_norm * (man_e - prev.m);
    let inv_pin = 1.0 / (pin + PIN_EPSILON);

    let denom = 1.0 - coeffs.c_norm * coeffs.alpha_norm * dman_dh;
    let inv_denom = 1.0 / (denom + DENOM_EPSILON);

    let dm_dh = (coeffs.c_norm * dman_dh + (man_e - prev.m) * inv_pin) * inv_denom;

    JaState {
        m: (prev.m + dm_dh * dh).clamp(-1.0, 1.0),
        h: h_new,
    }
}

/// Bias oscillator value at the midpoint of substep `index`.
#[inline]
pub fn bias_offset(phase_start: f64, dphi: f64, index: f64) -> f64 {
    (phase_start + dphi * (index + 0.5)).sin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{BiasControls, PhysicsParams};

    fn coeffs() -> NormalizedCoefficients {
        NormalizedCoefficients::default()
    }

    #[test]
    fn test_rest_state_is_fixed_point() {
        // Zero field, zero bias, zero magnetization: Man = 0 and dH = 0.
        let next = execute_substep(&coeffs(), JaState::default(), 0.0, 0.0);
        assert_eq!(next, JaState::default());
    }

    #[test]
    fn test_rising_field_magnetizes_positive() {
        let next = execute_substep(&coeffs(), JaState::default(), 0.0, 0.5);
        assert!(next.m > 0.0, "M should follow a rising field: {}", next.m);
        assert_eq!(next.h, 0.5);
    }

    #[test]
    fn test_falling_field_magnetizes_negative() {
        let next = execute_substep(&coeffs(), JaState::default(), 0.0, -0.5);
        assert!(next.m < 0.0, "M should follow a falling field: {}", next.m);
    }

    #[test]
    fn test_antisymmetric() {
        let c = coeffs();
        let prev = JaState { m: 0.2, h: 0.3 };
        let mirrored = JaState { m: -0.2, h: -0.3 };
        let a = execute_substep(&c, prev, 0.1, 0.7);
        let b = execute_substep(&c, mirrored, -0.1, -0.7);
        assert!(a.m.abs() < 1.0, "should not saturate: {}", a.m);
        assert!((a.m + b.m).abs() < 1e-5, "{} vs {}", a.m, b.m);
        assert_eq!(a.h, -b.h);
    }

    #[test]
    fn test_bias_is_added_to_field() {
        let c = coeffs();
        let next = execute_substep(&c, JaState::default(), 0.5, 0.1);
        assert_eq!(next.h, 0.1 + c.bias_amplitude * 0.5);
    }

    #[test]
    fn test_magnetization_is_clamped() {
        // Huge field step with weak pinning drives dM/dH far past saturation.
        let physics = PhysicsParams {
            k_pinning: 1e-3,
            ..PhysicsParams::default()
        };
        let c = NormalizedCoefficients::new(&physics, &BiasControls::new(1.0, 100.0));
        for (bias, h) in [(1.0, 50.0), (-1.0, -50.0), (1.0, -3.0), (-1.0, 3.0)] {
            let next = execute_substep(&c, JaState { m: 0.9, h: 0.0 }, bias, h);
            assert!(next.m.is_finite());
            assert!((-1.0..=1.0).contains(&next.m), "M out of range: {}", next.m);
        }
    }

    #[test]
    fn test_singular_pinning_stays_finite() {
        // k = 0 and Man == M_prev makes pin exactly zero before the epsilon.
        let physics = PhysicsParams {
            k_pinning: 0.0,
            ..PhysicsParams::default()
        };
        let c = NormalizedCoefficients::new(&physics, &BiasControls::new(0.0, 0.0));
        let next = execute_substep(&c, JaState::default(), 0.0, 0.0);
        assert!(next.m.is_finite());
        assert_eq!(next.m, 0.0);
    }

    #[test]
    fn test_bias_offset_midpoint() {
        use std::f64::consts::PI;
        let dphi = PI / 2.0;
        assert!((bias_offset(0.0, dphi, 0.0) - (PI / 4.0).sin()).abs() < 1e-12);
        assert!((bias_offset(PI, dphi, 1.0) - (PI + 0.75 * PI).sin()).abs() < 1e-12);
    }
}
