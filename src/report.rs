//! Coefficient export for hosts that persist or display a design.
//!
//! The text layout is the long-standing plain format: one description line,
//! then `numer_coeff[i] = …` and `denom_coeff[i] = …` lines. Writing it to a
//! file is left to the host.

use crate::config::{ChebyshevNorm, FilterFamily, FilterSpec};
use crate::dsp::DigitalTransferFunction;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientReport {
    pub description: String,
    pub family: FilterFamily,
    pub order: usize,
    pub sample_period_s: f64,
    pub numerator: Vec<f64>,
    pub denominator: Vec<f64>,
}

impl CoefficientReport {
    pub fn new(spec: &FilterSpec, design: &DigitalTransferFunction) -> Self {
        Self {
            description: describe(spec),
            family: spec.family,
            order: spec.order,
            sample_period_s: design.sample_period(),
            numerator: design.numerator().to_vec(),
            denominator: design.denominator().to_vec(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One-line summary of the parameters that matter for the family.
pub fn describe(spec: &FilterSpec) -> String {
    match spec.family {
        FilterFamily::Butterworth => format!(
            "BUTTERWORTH order={} passband edge={}",
            spec.order, spec.passband_edge_hz
        ),
        FilterFamily::Chebyshev => format!(
            "CHEBYSHEV order={} passband ripple={} passband edge={} with {} normalization",
            spec.order,
            spec.passband_ripple_db,
            spec.passband_edge_hz,
            match spec.chebyshev_norm {
                ChebyshevNorm::ThreeDb => "3 dB bandwidth",
                ChebyshevNorm::Ripple => "ripple bandwidth",
            }
        ),
        FilterFamily::Elliptical => format!(
            "ELLIPTICAL order={} passband ripple={} passband edge={} stopband ripple={} stopband edge={}",
            spec.order,
            spec.passband_ripple_db,
            spec.passband_edge_hz,
            spec.stopband_ripple_db,
            spec.stopband_edge_hz
        ),
    }
}

impl fmt::Display for CoefficientReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ", self.description)?;
        writeln!(f, "Filter numerator coefficients:")?;
        for (i, c) in self.numerator.iter().enumerate() {
            writeln!(f, "numer_coeff[{i}] = {c}")?;
        }
        writeln!(f, "Filter denominator coefficients:")?;
        for (i, c) in self.denominator.iter().enumerate() {
            writeln!(f, "denom_coeff[{i}] = {c}")?;
        }
        Ok(())
    }
}
