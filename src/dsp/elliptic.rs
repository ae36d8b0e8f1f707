//! Elliptic (Cauer) Prototype
//!
//! Jacobi-elliptic rational approximation evaluated through theta-function
//! series. The normalized prototype is centered on ω = 1, with the passband
//! edge at sqrt(k) and the stopband edge at 1/sqrt(k), where k = fp/fs.
//!
//! Each series is truncated after `summation_limit` terms. The first omitted
//! term of every series is evaluated as well and must be at most
//! `SERIES_TOLERANCE` relative to the partial sum, otherwise the build fails.
//! With q below ~0.1 (typical selectivities), five terms leave an error far
//! below that bound.

use crate::dsp::analog::AnalogTransferFunction;
use crate::dsp::utils::db_to_gain;
use crate::error::{FilterError, FilterResult};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Largest acceptable first-omitted-term / partial-sum ratio.
pub const SERIES_TOLERANCE: f64 = 1e-10;

/// Upper bound on series terms; q^(m·(m+1)) has long underflowed by then.
pub const MAX_SUMMATION_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipticParams {
    pub order: usize,
    pub passband_ripple_db: f64,
    pub stopband_ripple_db: f64,
    /// Passband edge over stopband edge, in (0, 1)
    pub selectivity: f64,
    pub summation_limit: usize,
}

/// Modular constant q for selectivity k.
pub fn modular_constant(k: f64) -> f64 {
    let kp = (1.0 - k * k).sqrt();
    let u = 0.5 * (1.0 - kp.sqrt()) / (1.0 + kp.sqrt());
    u + 2.0 * u.powi(5) + 15.0 * u.powi(9) + 150.0 * u.powi(13)
}

/// Smallest order meeting both ripple targets for the given band edges.
pub fn elliptic_minimum_order(
    passband_ripple_db: f64,
    stopband_ripple_db: f64,
    passband_edge_hz: f64,
    stopband_edge_hz: f64,
) -> usize {
    let q = modular_constant(passband_edge_hz / stopband_edge_hz);
    let d = (10.0f64.powf(0.1 * stopband_ripple_db) - 1.0)
        / (10.0f64.powf(0.1 * passband_ripple_db) - 1.0);
    let n = (16.0 * d).log10() / (1.0 / q).log10();
    n.ceil().max(1.0) as usize
}

/// Sum `term(m)` for m in `first..=limit`, then check the first omitted term.
fn truncated_series<F>(first: usize, limit: usize, offset: f64, term: F) -> FilterResult<f64>
where
    F: Fn(usize) -> f64,
{
    let sum: f64 = (first..=limit).map(&term).sum();
    let tail = term(limit.max(first.saturating_sub(1)) + 1).abs();
    let scale = (offset + sum).abs().max(f64::MIN_POSITIVE);
    if !tail.is_finite() || tail > SERIES_TOLERANCE * scale {
        return Err(FilterError::build(format!(
            "elliptic series did not converge within {limit} terms (tail {tail:.3e})"
        )));
    }
    Ok(sum)
}

#[inline]
fn sign(m: usize) -> f64 {
    if m % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Normalized elliptic low-pass. Edge (rad/s) is sqrt(k).
pub fn synthesize(params: &EllipticParams) -> FilterResult<AnalogTransferFunction> {
    let n = params.order;
    let k = params.selectivity;
    let limit = params.summation_limit;
    if n < 1 {
        return Err(FilterError::invalid("order must be at least 1"));
    }
    if limit > MAX_SUMMATION_LIMIT {
        return Err(FilterError::invalid(format!(
            "summation limit must be at most {MAX_SUMMATION_LIMIT}, got {limit}"
        )));
    }
    if !(k > 0.0 && k < 1.0) {
        return Err(FilterError::invalid(format!(
            "selectivity must lie in (0, 1), got {k}"
        )));
    }

    let q = modular_constant(k);
    let q4 = q.powf(0.25);
    let nf = n as f64;

    let passband_gain = db_to_gain(params.passband_ripple_db);
    let v = ((passband_gain + 1.0) / (passband_gain - 1.0)).ln() / (2.0 * nf);

    // Real pole magnitude
    let p0_num = truncated_series(0, limit, 0.0, |m| {
        sign(m) * q.powi((m * (m + 1)) as i32) * ((2 * m + 1) as f64 * v).sinh()
    })?;
    let p0_den = truncated_series(1, limit, 0.5, |m| {
        sign(m) * q.powi((m * m) as i32) * (2.0 * m as f64 * v).cosh()
    })?;
    let p0 = (q4 * p0_num / (0.5 + p0_den)).abs();
    let w = ((1.0 + k * p0 * p0) * (1.0 + p0 * p0 / k)).sqrt();

    let pairs = n / 2;
    let mut poles = Vec::with_capacity(n);
    let mut zeros = Vec::with_capacity(2 * pairs);
    let mut gain = if n % 2 == 1 {
        p0
    } else {
        db_to_gain(-params.passband_ripple_db)
    };

    for i in 1..=pairs {
        let mu = if n % 2 == 1 { i as f64 } else { i as f64 - 0.5 };
        let angle = PI * mu / nf;

        let x_num = truncated_series(0, limit, 0.0, |m| {
            sign(m) * q.powi((m * (m + 1)) as i32) * ((2 * m + 1) as f64 * angle).sin()
        })?;
        let x_den = truncated_series(1, limit, 0.5, |m| {
            sign(m) * q.powi((m * m) as i32) * (2.0 * m as f64 * angle).cos()
        })?;
        let x = (q4 * x_num / (0.5 + x_den)).abs();
        let y = ((1.0 - k * x * x) * (1.0 - x * x / k)).sqrt();

        // Section (s² + a) / (s² + b·s + c)
        let a = 1.0 / (x * x);
        let denom = 1.0 + p0 * p0 * x * x;
        let b = 2.0 * p0 * y / denom;
        let c = ((p0 * y).powi(2) + (x * w).powi(2)) / (denom * denom);

        if !(a.is_finite() && b.is_finite() && c.is_finite()) || c <= b * b / 4.0 {
            return Err(FilterError::build(format!(
                "elliptic section {i} is degenerate (a={a}, b={b}, c={c})"
            )));
        }

        let re = -b / 2.0;
        let im = (c - b * b / 4.0).sqrt();
        poles.push(Complex64::new(re, im));
        poles.push(Complex64::new(re, -im));
        zeros.push(Complex64::new(0.0, a.sqrt()));
        zeros.push(Complex64::new(0.0, -a.sqrt()));
        gain *= c / a;
    }

    if n % 2 == 1 {
        poles.push(Complex64::new(-p0, 0.0));
    }

    if !gain.is_finite() || gain <= 0.0 {
        return Err(FilterError::build(format!(
            "elliptic gain is not a positive finite value ({gain})"
        )));
    }

    Ok(AnalogTransferFunction::new(poles, zeros, gain, k.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::utils::gain_to_db;

    fn params(order: usize, limit: usize) -> EllipticParams {
        EllipticParams {
            order,
            passband_ripple_db: 1.0,
            stopband_ripple_db: 40.0,
            selectivity: 0.5,
            summation_limit: limit,
        }
    }

    fn mag_db(tf: &AnalogTransferFunction, omega: f64) -> f64 {
        gain_to_db(tf.response(omega).norm())
    }

    #[test]
    fn test_minimum_order_known_case() {
        // Ap = 1 dB, As = 40 dB, fs = 2 fp needs four poles
        assert_eq!(elliptic_minimum_order(1.0, 40.0, 50.0, 100.0), 4);
        // Tighter transition band needs more
        assert!(elliptic_minimum_order(1.0, 40.0, 90.0, 100.0) > 4);
    }

    #[test]
    fn test_pole_and_zero_counts() {
        for order in 1..=9 {
            let tf = synthesize(&params(order, 5)).unwrap();
            assert_eq!(tf.poles().len(), order);
            assert_eq!(tf.zeros().len(), 2 * (order / 2));
            assert!(tf.poles().iter().all(|p| p.re < 0.0));
            assert!(tf.zeros().iter().all(|z| z.re == 0.0));
        }
    }

    #[test]
    fn test_dc_gain_by_parity() {
        let odd = synthesize(&params(5, 5)).unwrap();
        assert!((odd.dc_gain() - 1.0).abs() < 1e-9);

        let even = synthesize(&params(4, 5)).unwrap();
        assert!((gain_to_db(even.dc_gain()) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_passband_edge_at_ripple() {
        let tf = synthesize(&params(5, 5)).unwrap();
        let edge = 0.5f64.sqrt();
        assert!((mag_db(&tf, edge) + 1.0).abs() < 1e-6, "{}", mag_db(&tf, edge));
    }

    #[test]
    fn test_passband_stays_within_ripple() {
        let tf = synthesize(&params(5, 5)).unwrap();
        let edge = 0.5f64.sqrt();
        for i in 0..=200 {
            let db = mag_db(&tf, edge * i as f64 / 200.0);
            assert!(db <= 1e-9 && db >= -1.0 - 1e-6, "passband {i}: {db}");
        }
    }

    #[test]
    fn test_stopband_meets_attenuation() {
        let tf = synthesize(&params(5, 5)).unwrap();
        let stop = 1.0 / 0.5f64.sqrt();
        for i in 0..=400 {
            let omega = stop * (1.0 + i as f64 * 0.05);
            assert!(mag_db(&tf, omega) <= -40.0 + 1e-6);
        }
    }

    #[test]
    fn test_truncation_error_bound() {
        // Five terms agree with a much longer series to the series tolerance
        for order in 2..=12 {
            for k in [0.2, 0.5, 0.8] {
                let short = synthesize(&EllipticParams {
                    selectivity: k,
                    ..params(order, 5)
                })
                .unwrap();
                let long = synthesize(&EllipticParams {
                    selectivity: k,
                    ..params(order, 12)
                })
                .unwrap();
                for (a, b) in short.poles().iter().zip(long.poles()) {
                    assert!((a - b).norm() <= 1e-10 * b.norm());
                }
                for (a, b) in short.zeros().iter().zip(long.zeros()) {
                    assert!((a - b).norm() <= 1e-10 * b.norm());
                }
                assert!((short.gain() - long.gain()).abs() <= 1e-10 * long.gain());
            }
        }
    }

    #[test]
    fn test_too_few_terms_is_build_error() {
        let err = synthesize(&params(4, 0)).unwrap_err();
        assert!(matches!(err, FilterError::Build(_)));
    }

    #[test]
    fn test_summation_limit_upper_bound() {
        assert!(synthesize(&params(6, MAX_SUMMATION_LIMIT)).is_ok());
        assert!(synthesize(&params(6, MAX_SUMMATION_LIMIT + 1))
            .unwrap_err()
            .is_invalid_spec());
        assert!(synthesize(&params(6, usize::MAX)).unwrap_err().is_invalid_spec());
    }

    #[test]
    fn test_bad_selectivity_rejected() {
        let mut p = params(4, 5);
        p.selectivity = 1.5;
        assert!(synthesize(&p).unwrap_err().is_invalid_spec());
    }
}
