//! Anhysteretic magnetization curve.
//!
//! The loss-free curve is tanh-shaped. A (2,2) rational approximant clamped
//! to |x| <= 3 stands in for tanh: bounded cost, no transcendental calls, and
//! exactly +/-1 at the clamp edges.

/// Rational tanh approximation: `x * (27 + x^2) / (27 + 9 x^2)` on [-3, 3].
#[inline]
pub fn approx_tanh(x: f64) -> f64 {
    let x = x.clamp(-3.0, 3.0);
    let x2 = x * x;
    x * (27.0 + x2) / (27.0 + 9.0 * x2)
}

/// Anhysteretic target and its field derivative for effective field `he`.
///
/// Returns `(Man, dMan/dH)` where `dMan/dH = (1 - Man^2) / a`.
#[inline]
pub fn anhysteretic(he: f64, inv_a_norm: f64) -> (f64, f64) {
    let man = approx_tanh(he * inv_a_norm);
    (man, (1.0 - man * man) * inv_a_norm)
}
