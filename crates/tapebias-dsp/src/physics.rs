//! Jiles-Atherton material parameters and their per-sample normalization.
//!
//! The integrator works on magnetization normalized to the saturation scale
//! `Ms`, so every field-like quantity is divided through by `Ms` once here
//! instead of on every substep. The bias oscillator amplitude is folded in
//! at the same time so that all derived values are refreshed together.

/// Raw physical parameters of the tape coating.
///
/// Defaults are the values the shipped LUTs were generated with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    /// Saturation magnetization `Ms`.
    pub ms: f64,
    /// Anhysteretic curve shape `a` (domain density).
    pub a_density: f64,
    /// Pinning coefficient `k` (coercivity, loop width).
    pub k_pinning: f64,
    /// Reversibility ratio `c`.
    pub c_reversibility: f64,
    /// Mean-field coupling `alpha`.
    pub alpha_coupling: f64,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            ms: 320.0,
            a_density: 720.0,
            k_pinning: 280.0,
            c_reversibility: 0.18,
            alpha_coupling: 0.015,
        }
    }
}

/// AC bias oscillator controls.
///
/// `level` is clamped to [0, 1] and `scale` to >= 0. The product is the bias
/// field amplitude added to the audio field on every substep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasControls {
    level: f64,
    scale: f64,
}

impl BiasControls {
    pub const DEFAULT_LEVEL: f64 = 0.41;
    pub const DEFAULT_SCALE: f64 = 11.0;

    pub fn new(level: f64, scale: f64) -> Self {
        Self {
            level: level.clamp(0.0, 1.0),
            scale: scale.max(0.0),
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Peak bias field: `level * scale`.
    pub fn amplitude(&self) -> f64 {
        self.level * self.scale
    }

    /// Equality at `f32` resolution. Host parameters arrive as `f32`, so a
    /// widened `0.41f32` must still match a table tagged with `0.41`.
    pub fn matches(&self, other: &BiasControls) -> bool {
        fn close(a: f64, b: f64) -> bool {
            (a - b).abs() <= f32::EPSILON as f64 * a.abs().max(b.abs()).max(1.0)
        }
        close(self.level, other.level) && close(self.scale, other.scale)
    }
}

impl Default for BiasControls {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEVEL, Self::DEFAULT_SCALE)
    }
}

/// Per-sample coefficients derived from [`PhysicsParams`] and [`BiasControls`].
///
/// Only constructible through [`NormalizedCoefficients::new`], so a set of
/// coefficients is never partially stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedCoefficients {
    pub ms_safe: f64,
    pub alpha_norm: f64,
    pub a_norm: f64,
    pub inv_a_norm: f64,
    pub k_norm: f64,
    pub c_norm: f64,
    pub bias_amplitude: f64,
}

impl NormalizedCoefficients {
    pub fn new(physics: &PhysicsParams, bias: &BiasControls) -> Self {
        let ms_safe = physics.ms.max(1e-6);
        let a_norm = physics.a_density / ms_safe;
        Self {
            ms_safe,
            alpha_norm: physics.alpha_coupling,
            a_norm,
            inv_a_norm: 1.0 / a_norm.max(1e-9),
            k_norm: physics.k_pinning / ms_safe,
            c_norm: physics.c_reversibility,
            bias_amplitude: bias.amplitude(),
        }
    }
}

impl Default for NormalizedCoefficients {
    fn default() -> Self {
        Self::new(&PhysicsParams::default(), &BiasControls::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_normalization() {
        let c = NormalizedCoefficients::default();
        assert_relative_eq!(c.a_norm, 2.25);
        assert_relative_eq!(c.inv_a_norm, 1.0 / 2.25);
        assert_relative_eq!(c.k_norm, 0.875);
        assert_relative_eq!(c.alpha_norm, 0.015);
        assert_relative_eq!(c.c_norm, 0.18);
        assert_relative_eq!(c.bias_amplitude, 0.41 * 11.0);
    }

    #[test]
    fn test_zero_ms_is_guarded() {
        let physics = PhysicsParams {
            ms: 0.0,
            ..PhysicsParams::default()
        };
        let c = NormalizedCoefficients::new(&physics, &BiasControls::default());
        assert_eq!(c.ms_safe, 1e-6);
        assert!(c.a_norm.is_finite());
        assert!(c.k_norm.is_finite());
    }

    #[test]
    fn test_zero_density_is_guarded() {
        let physics = PhysicsParams {
            a_density: 0.0,
            ..PhysicsParams::default()
        };
        let c = NormalizedCoefficients::new(&physics, &BiasControls::default());
        assert_eq!(c.a_norm, 0.0);
        assert_relative_eq!(c.inv_a_norm, 1e9);
    }

    #[test]
    fn test_bias_controls_clamp() {
        let b = BiasControls::new(1.7, -3.0);
        assert_eq!(b.level(), 1.0);
        assert_eq!(b.scale(), 0.0);
        assert_eq!(b.amplitude(), 0.0);

        let b = BiasControls::new(-0.5, 20.0);
        assert_eq!(b.level(), 0.0);
        assert_eq!(b.scale(), 20.0);
    }

    #[test]
    fn test_bias_matches_at_f32_resolution() {
        let table = BiasControls::default();
        let host = BiasControls::new(
            BiasControls::DEFAULT_LEVEL as f32 as f64,
            BiasControls::DEFAULT_SCALE as f32 as f64,
        );
        assert_ne!(table, host);
        assert!(table.matches(&host));
        assert!(host.matches(&table));

        assert!(!table.matches(&BiasControls::new(0.42, 11.0)));
        assert!(!table.matches(&BiasControls::new(0.41, 11.01)));
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let p = PhysicsParams::default();
        let b = BiasControls::default();
        assert_eq!(
            NormalizedCoefficients::new(&p, &b),
            NormalizedCoefficients::new(&p, &b)
        );
    }
}
