pub mod analog;
pub mod bilinear;
pub mod direct_form;
pub mod elliptic;
pub mod utils;

pub use analog::{synthesize, AnalogTransferFunction, Prototype};
pub use bilinear::{bilinear_transform, DigitalTransferFunction};
pub use direct_form::{
    FilterImplementation, QuantizedDirectForm, Realization, UnquantizedDirectForm,
};
pub use elliptic::elliptic_minimum_order;

use crate::config::{FilterFamily, FilterSpec};
use crate::error::FilterResult;
use log::{debug, warn};

/// Analog prototype for `spec`, pre-warped when the spec asks for it.
pub fn design_analog(spec: &FilterSpec) -> FilterResult<AnalogTransferFunction> {
    let mut analog = synthesize(spec)?;

    if spec.family == FilterFamily::Elliptical {
        let min_order = elliptic_minimum_order(
            spec.passband_ripple_db,
            spec.stopband_ripple_db,
            spec.passband_edge_hz,
            spec.stopband_edge_hz,
        );
        if spec.order < min_order {
            warn!(
                "elliptic order {} is below the {} needed for {} dB at {} Hz",
                spec.order, min_order, spec.stopband_ripple_db, spec.stopband_edge_hz
            );
        }
    }

    if spec.predistort_enabled {
        analog.prewarp(spec.sample_period_s)?;
    }
    Ok(analog)
}

/// Full pipeline: prototype, optional pre-warp, bilinear transform.
pub fn design_filter(spec: &FilterSpec) -> FilterResult<DigitalTransferFunction> {
    let analog = design_analog(spec)?;
    let digital = bilinear_transform(&analog, spec.sample_period_s)?;
    debug!(
        "designed {} order {}: b = {:?}, a = {:?}",
        spec.family.name(),
        spec.order,
        digital.numerator(),
        digital.denominator()
    );
    Ok(digital)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChebyshevNorm;
    use num_complex::Complex64;

    fn spec(family: FilterFamily, order: usize) -> FilterSpec {
        FilterSpec::default().with_family(family).with_order(order)
    }

    #[test]
    fn test_butterworth_minus_3db_at_edge() {
        for order in 1..=8 {
            for edge in [20.0, 60.0, 150.0, 300.0] {
                let mut s = spec(FilterFamily::Butterworth, order);
                s.passband_edge_hz = edge;
                let d = design_filter(&s).unwrap();
                let db = d.magnitude_db(edge);
                assert!((db + 3.0).abs() < 0.1, "order {order} edge {edge}: {db}");
                assert!((d.dc_gain() - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_without_predistortion_edge_drifts() {
        let mut s = spec(FilterFamily::Butterworth, 4);
        s.passband_edge_hz = 300.0;
        s.predistort_enabled = false;
        let d = design_filter(&s).unwrap();
        // Bilinear warping pulls the analog edge down in digital frequency
        assert!(d.magnitude_db(300.0) < -3.5);
    }

    #[test]
    fn test_chebyshev_ripple_band() {
        for order in [3, 4, 5] {
            for ripple in [0.5, 1.0, 3.0] {
                let mut s = spec(FilterFamily::Chebyshev, order);
                s.passband_ripple_db = ripple;
                s.passband_edge_hz = 100.0;
                s.chebyshev_norm = ChebyshevNorm::Ripple;
                let d = design_filter(&s).unwrap();

                assert!((d.magnitude_db(100.0) + ripple).abs() < 0.01);
                for i in 0..=200 {
                    let db = d.magnitude_db(100.0 * i as f64 / 200.0);
                    assert!(db <= 1e-6 && db >= -ripple - 1e-6, "{order}/{ripple}: {db}");
                }
            }
        }
    }

    #[test]
    fn test_chebyshev_three_db_edge() {
        let mut s = spec(FilterFamily::Chebyshev, 4);
        s.passband_ripple_db = 1.0;
        s.passband_edge_hz = 100.0;
        let d = design_filter(&s).unwrap();
        assert!((d.magnitude_db(100.0) + 3.0).abs() < 0.1);
    }

    #[test]
    fn test_elliptic_meets_band_targets() {
        let mut s = spec(FilterFamily::Elliptical, 5);
        s.passband_ripple_db = 1.0;
        s.stopband_ripple_db = 40.0;
        s.passband_edge_hz = 50.0;
        s.stopband_edge_hz = 100.0;
        let d = design_filter(&s).unwrap();

        assert_eq!(d.numerator().len(), 6);
        assert!((d.magnitude_db(50.0) + 1.0).abs() < 1e-3);
        for i in 0..=100 {
            let db = d.magnitude_db(50.0 * i as f64 / 100.0);
            assert!(db <= 1e-6 && db >= -1.0 - 1e-3, "passband: {db}");
        }
        for i in 0..=100 {
            let f = 100.0 + 3.99 * i as f64;
            assert!(d.magnitude_db(f) <= -40.0 + 0.1, "stopband {f}: {}", d.magnitude_db(f));
        }
    }

    #[test]
    fn test_denominator_shape_for_all_families() {
        for family in [
            FilterFamily::Butterworth,
            FilterFamily::Chebyshev,
            FilterFamily::Elliptical,
        ] {
            for order in 1..=10 {
                let d = design_filter(&spec(family, order)).unwrap();
                assert_eq!(d.denominator().len(), order + 1);
                assert_eq!(d.numerator().len(), order + 1);
                assert_eq!(d.denominator()[0], 1.0);
            }
        }
    }

    #[test]
    fn test_digital_poles_inside_unit_circle() {
        // Characteristic polynomial roots via the analog map; check |z| < 1
        let s = spec(FilterFamily::Chebyshev, 6);
        let analog = design_analog(&s).unwrap();
        let dt = s.sample_period_s;
        for p in analog.poles() {
            let half = p * (dt / 2.0);
            let z = (Complex64::new(1.0, 0.0) + half) / (Complex64::new(1.0, 0.0) - half);
            assert!(z.norm() < 1.0);
        }
    }

    #[test]
    fn test_invalid_spec_propagates() {
        let s = spec(FilterFamily::Butterworth, 0);
        assert!(design_filter(&s).unwrap_err().is_invalid_spec());
    }
}
