//! Analog Low-Pass Prototypes
//!
//! Continuous-time pole/zero/gain models for the three supported families.
//! Every prototype is synthesized at a normalized frequency and then
//! denormalized so that its passband edge lands on the requested frequency.
//!
//! # Design Notes
//! - Poles and zeros are kept in conjugate pairs, so all derived
//!   polynomials have real coefficients
//! - Frequency scaling always adjusts the gain by `factor^(poles - zeros)`,
//!   which keeps the DC gain fixed through denormalization and pre-warping
//! - Nothing here is meant for the audio thread; it allocates freely

use crate::config::{ChebyshevNorm, FilterFamily, FilterSpec};
use crate::dsp::elliptic::{self, EllipticParams};
use crate::dsp::utils::hz_to_rad;
use crate::error::{FilterError, FilterResult};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Pole/zero/gain model of H(s) = gain * Π(s - z) / Π(s - p).
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogTransferFunction {
    poles: Vec<Complex64>,
    zeros: Vec<Complex64>,
    gain: f64,
    /// Frequency (rad/s) the passband edge currently sits at
    edge_rad: f64,
}

impl AnalogTransferFunction {
    pub fn new(poles: Vec<Complex64>, zeros: Vec<Complex64>, gain: f64, edge_rad: f64) -> Self {
        Self {
            poles,
            zeros,
            gain,
            edge_rad,
        }
    }

    pub fn poles(&self) -> &[Complex64] {
        &self.poles
    }

    pub fn zeros(&self) -> &[Complex64] {
        &self.zeros
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn edge_rad(&self) -> f64 {
        self.edge_rad
    }

    pub fn order(&self) -> usize {
        self.poles.len()
    }

    /// Zeros at infinity, which the bilinear transform maps to z = -1.
    pub fn excess_poles(&self) -> usize {
        self.poles.len().saturating_sub(self.zeros.len())
    }

    /// Evaluate H(s) at s = jω.
    pub fn response(&self, omega: f64) -> Complex64 {
        let s = Complex64::new(0.0, omega);
        let num: Complex64 = self.zeros.iter().map(|z| s - z).product();
        let den: Complex64 = self.poles.iter().map(|p| s - p).product();
        self.gain * num / den
    }

    pub fn dc_gain(&self) -> f64 {
        self.response(0.0).re
    }

    /// Multiply every pole and zero by `factor`.
    pub fn scale_frequency(&mut self, factor: f64) {
        for p in &mut self.poles {
            *p *= factor;
        }
        for z in &mut self.zeros {
            *z *= factor;
        }
        self.gain *= factor.powi(self.excess_poles() as i32);
        self.edge_rad *= factor;
    }

    /// Move the passband edge to `edge_rad`.
    pub fn denormalize(&mut self, edge_rad: f64) {
        let factor = edge_rad / self.edge_rad;
        self.scale_frequency(factor);
    }

    /// Pre-warp for the bilinear transform at sample period `dt`.
    ///
    /// The passband edge ω is moved to (2/dt)·tan(ω·dt/2) and the whole
    /// pole/zero set follows it, so after the transform the digital response
    /// hits the design value exactly at the edge.
    pub fn prewarp(&mut self, dt: f64) -> FilterResult<()> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(FilterError::invalid(format!(
                "sample period must be positive, got {dt}"
            )));
        }
        let half_angle = self.edge_rad * dt / 2.0;
        if half_angle >= PI / 2.0 {
            return Err(FilterError::invalid(format!(
                "edge {:.3} rad/s is at or above Nyquist for dt = {dt}",
                self.edge_rad
            )));
        }
        let warped = (2.0 / dt) * half_angle.tan();
        self.scale_frequency(warped / self.edge_rad);
        Ok(())
    }
}

// =============================================================================
// Prototype selection
// =============================================================================

/// Family-specific synthesis parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prototype {
    Butterworth { order: usize },
    Chebyshev {
        order: usize,
        ripple_db: f64,
        norm: ChebyshevNorm,
    },
    Elliptical(EllipticParams),
}

impl Prototype {
    pub fn from_spec(spec: &FilterSpec) -> Self {
        match spec.family {
            FilterFamily::Butterworth => Prototype::Butterworth { order: spec.order },
            FilterFamily::Chebyshev => Prototype::Chebyshev {
                order: spec.order,
                ripple_db: spec.passband_ripple_db,
                norm: spec.chebyshev_norm,
            },
            FilterFamily::Elliptical => Prototype::Elliptical(EllipticParams {
                order: spec.order,
                passband_ripple_db: spec.passband_ripple_db,
                stopband_ripple_db: spec.stopband_ripple_db,
                selectivity: spec.passband_edge_hz / spec.stopband_edge_hz,
                summation_limit: spec.elliptic_summation_limit,
            }),
        }
    }

    /// Normalized prototype, before denormalization.
    pub fn normalized(&self) -> FilterResult<AnalogTransferFunction> {
        match *self {
            Prototype::Butterworth { order } => Ok(butterworth(order)),
            Prototype::Chebyshev {
                order,
                ripple_db,
                norm,
            } => Ok(chebyshev(order, ripple_db, norm)),
            Prototype::Elliptical(params) => elliptic::synthesize(&params),
        }
    }
}

/// Validated, denormalized analog low-pass for `spec`.
///
/// Pre-warping is a separate step; see [`AnalogTransferFunction::prewarp`].
pub fn synthesize(spec: &FilterSpec) -> FilterResult<AnalogTransferFunction> {
    spec.validate()?;
    let mut tf = Prototype::from_spec(spec).normalized()?;
    tf.denormalize(hz_to_rad(spec.passband_edge_hz));
    Ok(tf)
}

// =============================================================================
// Family synthesis
// =============================================================================

/// Butterworth poles on the unit circle, edge at the 3 dB point ω = 1.
pub fn butterworth(order: usize) -> AnalogTransferFunction {
    let n = order as f64;
    let poles = (0..order)
        .map(|k| {
            let theta = PI / 2.0 + (2 * k + 1) as f64 * PI / (2.0 * n);
            Complex64::new(theta.cos(), theta.sin())
        })
        .collect();
    AnalogTransferFunction::new(poles, Vec::new(), 1.0, 1.0)
}

/// Chebyshev type I poles; ripple edge at ω = 1 before normalization.
pub fn chebyshev(order: usize, ripple_db: f64, norm: ChebyshevNorm) -> AnalogTransferFunction {
    let n = order as f64;
    let epsilon = (10.0f64.powf(ripple_db / 10.0) - 1.0).sqrt();
    let beta = (1.0 / epsilon).asinh() / n;

    let poles: Vec<Complex64> = (0..order)
        .map(|k| {
            let theta = (2 * k + 1) as f64 * PI / (2.0 * n);
            Complex64::new(-beta.sinh() * theta.sin(), beta.cosh() * theta.cos())
        })
        .collect();

    let mut gain = poles.iter().map(|p| -p).product::<Complex64>().re;
    if order % 2 == 0 {
        gain /= (1.0 + epsilon * epsilon).sqrt();
    }

    let mut tf = AnalogTransferFunction::new(poles, Vec::new(), gain, 1.0);
    if norm == ChebyshevNorm::ThreeDb {
        // Put the 3 dB point where the ripple edge was.
        tf.scale_frequency(1.0 / chebyshev_3db_frequency(order, epsilon));
        tf.edge_rad = 1.0;
    }
    tf
}

/// Frequency where a ripple-normalized Chebyshev response is 3 dB down.
fn chebyshev_3db_frequency(order: usize, epsilon: f64) -> f64 {
    let n = order as f64;
    let inv = 1.0 / epsilon;
    if inv >= 1.0 {
        (inv.acosh() / n).cosh()
    } else {
        (inv.acos() / n).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::utils::gain_to_db;

    fn mag_db(tf: &AnalogTransferFunction, omega: f64) -> f64 {
        gain_to_db(tf.response(omega).norm())
    }

    #[test]
    fn test_butterworth_poles_left_half_plane() {
        for order in 1..=12 {
            let tf = butterworth(order);
            assert_eq!(tf.order(), order);
            for p in tf.poles() {
                assert!(p.re < 0.0);
                assert!((p.norm() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_butterworth_analog_3db_point() {
        for order in 1..=10 {
            let tf = butterworth(order);
            assert!((tf.dc_gain() - 1.0).abs() < 1e-12);
            assert!((mag_db(&tf, 1.0) + 3.0103).abs() < 1e-3);
        }
    }

    #[test]
    fn test_chebyshev_ripple_edge() {
        let tf = chebyshev(5, 1.0, ChebyshevNorm::Ripple);
        assert!((mag_db(&tf, 1.0) + 1.0).abs() < 1e-9);
        assert!((tf.dc_gain() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_chebyshev_even_order_dc_sits_at_ripple_floor() {
        let tf = chebyshev(4, 0.5, ChebyshevNorm::Ripple);
        assert!((gain_to_db(tf.dc_gain()) + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_chebyshev_three_db_normalization() {
        for ripple in [0.1, 1.0, 2.0, 3.0, 5.0] {
            let tf = chebyshev(4, ripple, ChebyshevNorm::ThreeDb);
            assert!(
                (mag_db(&tf, 1.0) + 3.0103).abs() < 1e-3,
                "ripple {ripple}: {}",
                mag_db(&tf, 1.0)
            );
        }
    }

    #[test]
    fn test_norm_modes_differ_only_by_scale() {
        let a = chebyshev(6, 1.0, ChebyshevNorm::Ripple);
        let b = chebyshev(6, 1.0, ChebyshevNorm::ThreeDb);
        let ratio = b.poles()[0].norm() / a.poles()[0].norm();
        for (pa, pb) in a.poles().iter().zip(b.poles()) {
            assert!((pb - pa * ratio).norm() < 1e-12);
        }
    }

    #[test]
    fn test_denormalize_moves_edge() {
        let mut tf = butterworth(3);
        tf.denormalize(hz_to_rad(60.0));
        assert!((mag_db(&tf, hz_to_rad(60.0)) + 3.0103).abs() < 1e-3);
        assert!((tf.dc_gain() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_prewarp_scales_edge() {
        let dt = 1e-3;
        let mut tf = butterworth(2);
        tf.denormalize(hz_to_rad(100.0));
        tf.prewarp(dt).unwrap();
        let expected = (2.0 / dt) * (hz_to_rad(100.0) * dt / 2.0).tan();
        assert!((tf.edge_rad() - expected).abs() < 1e-9);
        assert!((tf.dc_gain() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_prewarp_rejects_bad_period() {
        let mut tf = butterworth(2);
        assert!(tf.prewarp(0.0).unwrap_err().is_invalid_spec());
        assert!(tf.prewarp(-1.0).is_err());
    }

    #[test]
    fn test_synthesize_rejects_invalid_spec() {
        let spec = FilterSpec::default().with_order(0);
        assert!(synthesize(&spec).unwrap_err().is_invalid_spec());
    }
}
