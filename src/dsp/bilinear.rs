//! Bilinear transform: analog pole/zero model to digital coefficients.
//!
//! s = (2/dt)·(z − 1)/(z + 1), so each analog root r maps to
//! z = (1 + r·dt/2)/(1 − r·dt/2), zeros at infinity map to z = −1, and the
//! gain picks up Π(2/dt − z_i)/Π(2/dt − p_j).
//!
//! High orders at low edge frequencies put every pole close to z = 1, and the
//! expanded polynomials lose the precision needed to represent them. Every
//! result is therefore checked against the analog model (magnitude at DC and
//! at the passband edge) and for stability before it is returned.

use crate::dsp::analog::AnalogTransferFunction;
use crate::dsp::utils::{digital_omega, gain_to_db};
use crate::error::{FilterError, FilterResult};
use num_complex::Complex64;
use std::f64::consts::PI;

/// |1 − r·dt/2| below this is treated as the bilinear singularity.
const SINGULARITY_EPS: f64 = 1e-12;

/// Allowed gap between analog and digital magnitude at the check points.
pub const RESPONSE_TOLERANCE_DB: f64 = 0.1;

/// Digital transfer function H(z) = B(z)/A(z) in powers of z⁻¹.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitalTransferFunction {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    sample_period: f64,
}

impl DigitalTransferFunction {
    /// Build from raw coefficients; the denominator is normalized so a[0] = 1.
    pub fn from_coefficients(
        numerator: Vec<f64>,
        mut denominator: Vec<f64>,
        sample_period: f64,
    ) -> FilterResult<Self> {
        let a0 = denominator.first().copied().unwrap_or(0.0);
        if a0 == 0.0 || !a0.is_finite() {
            return Err(FilterError::build("denominator leading coefficient is zero"));
        }
        let mut numerator = numerator;
        for c in numerator.iter_mut().chain(denominator.iter_mut()) {
            *c /= a0;
        }
        denominator[0] = 1.0;
        if numerator
            .iter()
            .chain(denominator.iter())
            .any(|c| !c.is_finite())
        {
            return Err(FilterError::build("non-finite digital coefficient"));
        }
        Ok(Self {
            numerator,
            denominator,
            sample_period,
        })
    }

    /// Feed-forward coefficients b[0..=N]
    pub fn numerator(&self) -> &[f64] {
        &self.numerator
    }

    /// Feedback coefficients a[0..=N], a[0] == 1
    pub fn denominator(&self) -> &[f64] {
        &self.denominator
    }

    pub fn sample_period(&self) -> f64 {
        self.sample_period
    }

    pub fn order(&self) -> usize {
        self.denominator.len().saturating_sub(1)
    }

    /// H(e^{jωT}) at `freq_hz`.
    pub fn frequency_response(&self, freq_hz: f64) -> Complex64 {
        let w = digital_omega(freq_hz, self.sample_period);
        let z_inv = Complex64::from_polar(1.0, -w);
        horner(&self.numerator, z_inv) / horner(&self.denominator, z_inv)
    }

    pub fn magnitude_db(&self, freq_hz: f64) -> f64 {
        gain_to_db(self.frequency_response(freq_hz).norm())
    }

    /// H(1): steady-state response to a constant input.
    pub fn dc_gain(&self) -> f64 {
        self.numerator.iter().sum::<f64>() / self.denominator.iter().sum::<f64>()
    }

    /// Schur-Cohn step-down: every root of A(z) strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        let mut a = self.denominator.clone();
        while a.len() > 1 {
            let m = a.len() - 1;
            let k = a[m];
            if !(k.abs() < 1.0) {
                return false;
            }
            let norm = 1.0 - k * k;
            a = (0..m).map(|i| (a[i] - k * a[m - i]) / norm).collect();
        }
        true
    }
}

/// Reject coefficient sets that no longer describe the analog design.
fn verify_against_analog(
    digital: &DigitalTransferFunction,
    analog: &AnalogTransferFunction,
    dt: f64,
) -> FilterResult<()> {
    if !digital.is_stable() {
        return Err(FilterError::build(format!(
            "order {} design is unstable after coefficient expansion",
            digital.order()
        )));
    }

    let dc_gap = (gain_to_db(analog.dc_gain().abs()) - gain_to_db(digital.dc_gain().abs())).abs();

    // The bilinear map sends analog ω to digital (2/dt)·atan(ω·dt/2)
    let edge = analog.edge_rad();
    let digital_edge_hz = (2.0 / dt) * (edge * dt / 2.0).atan() / (2.0 * PI);
    let edge_gap = (gain_to_db(analog.response(edge).norm())
        - gain_to_db(digital.frequency_response(digital_edge_hz).norm()))
    .abs();

    if !(dc_gap <= RESPONSE_TOLERANCE_DB && edge_gap <= RESPONSE_TOLERANCE_DB) {
        return Err(FilterError::build(format!(
            "order {} coefficients lost precision: DC off by {dc_gap:.3} dB, edge off by {edge_gap:.3} dB",
            digital.order()
        )));
    }
    Ok(())
}

/// Σ c[i]·x^i
fn horner(coeffs: &[f64], x: Complex64) -> Complex64 {
    coeffs
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * x + c)
}

/// Map one analog root into the z-plane.
fn map_root(r: Complex64, dt: f64) -> FilterResult<Complex64> {
    let half = r * (dt / 2.0);
    let den = Complex64::new(1.0, 0.0) - half;
    if den.norm() < SINGULARITY_EPS {
        return Err(FilterError::build(format!(
            "root {r} lies on the bilinear singularity for dt = {dt}"
        )));
    }
    Ok((Complex64::new(1.0, 0.0) + half) / den)
}

/// Expand Π(1 − r·z⁻¹) into real coefficients of z⁻¹.
///
/// Largest roots go first so the biggest partial products form before the
/// small ones are folded in.
fn expand_roots(roots: &[Complex64]) -> Vec<f64> {
    let mut ordered = roots.to_vec();
    ordered.sort_by(|a, b| b.norm().total_cmp(&a.norm()));

    let mut poly = vec![Complex64::new(0.0, 0.0); ordered.len() + 1];
    poly[0] = Complex64::new(1.0, 0.0);
    for (n, r) in ordered.iter().enumerate() {
        for i in (1..=n + 1).rev() {
            let prev = poly[i - 1];
            poly[i] -= r * prev;
        }
    }
    poly.into_iter().map(|c| c.re).collect()
}

/// Discretize `analog` at sample period `dt`.
pub fn bilinear_transform(
    analog: &AnalogTransferFunction,
    dt: f64,
) -> FilterResult<DigitalTransferFunction> {
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(FilterError::invalid(format!(
            "sample period must be positive, got {dt}"
        )));
    }
    let c = 2.0 / dt;

    let mut gain = Complex64::new(analog.gain(), 0.0);
    let mut digital_zeros = Vec::with_capacity(analog.order());
    for &z in analog.zeros() {
        digital_zeros.push(map_root(z, dt)?);
        gain *= c - z;
    }
    digital_zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(analog.excess_poles()));

    let mut digital_poles = Vec::with_capacity(analog.order());
    for &p in analog.poles() {
        digital_poles.push(map_root(p, dt)?);
        gain /= c - p;
    }

    let numerator: Vec<f64> = expand_roots(&digital_zeros)
        .into_iter()
        .map(|b| b * gain.re)
        .collect();
    let denominator = expand_roots(&digital_poles);

    let digital = DigitalTransferFunction::from_coefficients(numerator, denominator, dt)?;
    verify_against_analog(&digital, analog, dt)?;
    Ok(digital)
}
