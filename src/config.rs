use crate::dsp::elliptic::MAX_SUMMATION_LIMIT;
use crate::error::{FilterError, FilterResult};
use serde::{Deserialize, Serialize};

// =============================================================================
// FILTER FAMILY
// =============================================================================

/// Analog prototype family used for the low-pass design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterFamily {
    #[serde(rename = "Butterworth")]
    Butterworth,
    #[serde(rename = "Chebyshev")]
    Chebyshev,
    #[serde(rename = "Elliptical")]
    Elliptical,
}

impl FilterFamily {
    pub fn name(&self) -> &'static str {
        match self {
            FilterFamily::Butterworth => "Butterworth",
            FilterFamily::Chebyshev => "Chebyshev",
            FilterFamily::Elliptical => "Elliptical",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FilterFamily::Butterworth => "Requires passband edge",
            FilterFamily::Chebyshev => "Requires passband ripple, passband edge, normalization",
            FilterFamily::Elliptical => {
                "Requires passband ripple, stopband ripple, passband edge, stopband edge"
            }
        }
    }
}

impl Default for FilterFamily {
    fn default() -> Self {
        FilterFamily::Butterworth
    }
}

// =============================================================================
// CHEBYSHEV NORMALIZATION
// =============================================================================

/// Where the Chebyshev passband edge sits on the magnitude curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChebyshevNorm {
    /// Band edge is the 3 dB point
    #[serde(rename = "3 dB bandwidth")]
    ThreeDb,
    /// Band edge is the end of the equiripple region
    #[serde(rename = "Ripple bandwidth")]
    Ripple,
}

impl ChebyshevNorm {
    pub fn name(&self) -> &'static str {
        match self {
            ChebyshevNorm::ThreeDb => "3 dB bandwidth",
            ChebyshevNorm::Ripple => "Ripple bandwidth",
        }
    }
}

impl Default for ChebyshevNorm {
    fn default() -> Self {
        ChebyshevNorm::ThreeDb
    }
}

// =============================================================================
// FILTER SPEC
// =============================================================================

/// Quantization above this many bits is finer than an f64 mantissa.
pub const MAX_QUANT_BITS: i32 = 52;

/// Complete parameter snapshot for one filter build.
///
/// Any subset of fields may be given in JSON; the rest keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub family: FilterFamily,
    pub order: usize,
    pub passband_ripple_db: f64,
    pub stopband_ripple_db: f64,
    pub passband_edge_hz: f64,
    pub stopband_edge_hz: f64,
    pub chebyshev_norm: ChebyshevNorm,
    pub predistort_enabled: bool,
    pub quantize_enabled: bool,
    pub input_quant_bits: i32,
    pub coeff_quant_bits: i32,
    pub sample_period_s: f64,
    /// Terms kept in the elliptic theta-function series
    pub elliptic_summation_limit: usize,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            family: FilterFamily::Butterworth,
            order: 10,
            passband_ripple_db: 3.0,
            stopband_ripple_db: 60.0,
            passband_edge_hz: 60.0,
            stopband_edge_hz: 200.0,
            chebyshev_norm: ChebyshevNorm::ThreeDb,
            predistort_enabled: true,
            quantize_enabled: false,
            input_quant_bits: 12,
            coeff_quant_bits: 12,
            sample_period_s: 1e-3,
            elliptic_summation_limit: 5,
        }
    }
}

impl FilterSpec {
    /// Parse a spec from JSON, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> FilterResult<Self> {
        serde_json::from_str(json).map_err(|e| FilterError::invalid(format!("bad JSON: {e}")))
    }

    pub fn to_json_string(&self) -> String {
        // Plain data with string enum tags; serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn with_family(mut self, family: FilterFamily) -> Self {
        self.family = family;
        self
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn with_sample_period(mut self, dt: f64) -> Self {
        self.sample_period_s = dt;
        self
    }

    /// 2^input_quant_bits
    pub fn input_quant_factor(&self) -> f64 {
        quant_factor(self.input_quant_bits)
    }

    /// 2^coeff_quant_bits
    pub fn coeff_quant_factor(&self) -> f64 {
        quant_factor(self.coeff_quant_bits)
    }

    pub fn nyquist_hz(&self) -> f64 {
        0.5 / self.sample_period_s
    }

    /// Check every rule that applies to the selected family.
    pub fn validate(&self) -> FilterResult<()> {
        if self.order < 1 {
            return Err(FilterError::invalid("order must be at least 1"));
        }
        if !(self.sample_period_s > 0.0) || !self.sample_period_s.is_finite() {
            return Err(FilterError::invalid(format!(
                "sample period must be positive, got {}",
                self.sample_period_s
            )));
        }
        require_positive("passband edge", self.passband_edge_hz)?;

        match self.family {
            FilterFamily::Butterworth => {}
            FilterFamily::Chebyshev => {
                require_positive("passband ripple", self.passband_ripple_db)?;
            }
            FilterFamily::Elliptical => {
                require_positive("passband ripple", self.passband_ripple_db)?;
                require_positive("stopband ripple", self.stopband_ripple_db)?;
                require_positive("stopband edge", self.stopband_edge_hz)?;
                if self.stopband_edge_hz <= self.passband_edge_hz {
                    return Err(FilterError::invalid(format!(
                        "stopband edge {} Hz must lie above passband edge {} Hz",
                        self.stopband_edge_hz, self.passband_edge_hz
                    )));
                }
                if self.stopband_ripple_db <= self.passband_ripple_db {
                    return Err(FilterError::invalid(format!(
                        "stopband attenuation {} dB must exceed passband ripple {} dB",
                        self.stopband_ripple_db, self.passband_ripple_db
                    )));
                }
                if !(1..=MAX_SUMMATION_LIMIT).contains(&self.elliptic_summation_limit) {
                    return Err(FilterError::invalid(format!(
                        "elliptic summation limit must be in 1..={MAX_SUMMATION_LIMIT}, got {}",
                        self.elliptic_summation_limit
                    )));
                }
            }
        }

        if self.predistort_enabled && self.passband_edge_hz >= self.nyquist_hz() {
            return Err(FilterError::invalid(format!(
                "passband edge {} Hz is at or above Nyquist ({} Hz)",
                self.passband_edge_hz,
                self.nyquist_hz()
            )));
        }

        if self.quantize_enabled {
            require_bits("input", self.input_quant_bits)?;
            require_bits("coefficient", self.coeff_quant_bits)?;
        }

        Ok(())
    }
}

fn quant_factor(bits: i32) -> f64 {
    2.0f64.powi(bits.clamp(0, MAX_QUANT_BITS))
}

fn require_positive(what: &str, value: f64) -> FilterResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FilterError::invalid(format!(
            "{what} must be positive, got {value}"
        )))
    }
}

fn require_bits(what: &str, bits: i32) -> FilterResult<()> {
    if (0..=MAX_QUANT_BITS).contains(&bits) {
        Ok(())
    } else {
        Err(FilterError::invalid(format!(
            "{what} quantization bits must be in 0..={MAX_QUANT_BITS}, got {bits}"
        )))
    }
}
