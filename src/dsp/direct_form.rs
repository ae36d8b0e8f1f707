//! Direct-Form IIR Realizations
//!
//! Sample-by-sample evaluation of a designed transfer function:
//!
//! ```text
//! y[n] = Σ b[i]·x[n−i]  −  Σ a[j]·y[n−j]
//! ```
//!
//! Two interchangeable variants share the recursion. The quantized one rounds
//! its input and (once, at construction) its coefficients to fixed-point
//! grids, modelling integer hardware.
//!
//! # Design Notes
//! - History lives in fixed rings sized to the filter order at construction
//! - `process_sample` never allocates and is safe for the real-time thread
//! - State is never cleared implicitly; call `reset()` when that is wanted

use crate::config::FilterSpec;
use crate::dsp::bilinear::DigitalTransferFunction;
use crate::dsp::utils::quantize;

/// Per-sample interface shared by both realizations.
pub trait FilterImplementation: Send {
    /// Push one input sample, return one output sample.
    fn process_sample(&mut self, input: f64) -> f64;

    /// Clear all past inputs and outputs.
    fn reset(&mut self);

    /// Coefficients actually used by the recursion.
    fn numerator(&self) -> &[f64];

    /// Feedback coefficients actually used, a[0] == 1.
    fn denominator(&self) -> &[f64];
}

/// Past inputs and outputs, length = order.
#[derive(Debug, Clone)]
struct History {
    inputs: Vec<f64>,
    outputs: Vec<f64>,
    /// Slot the next sample is written to (holds the oldest one)
    pos: usize,
}

impl History {
    fn new(order: usize) -> Self {
        Self {
            inputs: vec![0.0; order],
            outputs: vec![0.0; order],
            pos: 0,
        }
    }

    fn clear(&mut self) {
        self.inputs.iter_mut().for_each(|v| *v = 0.0);
        self.outputs.iter_mut().for_each(|v| *v = 0.0);
        self.pos = 0;
    }

    #[inline]
    fn step(&mut self, numer: &[f64], denom: &[f64], x: f64) -> f64 {
        let n = self.inputs.len();
        let mut acc = numer[0] * x;
        if n == 0 {
            return acc;
        }

        let mut idx = self.pos;
        for i in 1..=n {
            idx = if idx == 0 { n - 1 } else { idx - 1 };
            acc += numer[i] * self.inputs[idx] - denom[i] * self.outputs[idx];
        }

        self.inputs[self.pos] = x;
        self.outputs[self.pos] = acc;
        self.pos = (self.pos + 1) % n;
        acc
    }
}

/// Pad both coefficient vectors to a common length.
fn aligned_coefficients(design: &DigitalTransferFunction) -> (Vec<f64>, Vec<f64>) {
    let len = design.numerator().len().max(design.denominator().len()).max(1);
    let mut numer = design.numerator().to_vec();
    let mut denom = design.denominator().to_vec();
    numer.resize(len, 0.0);
    denom.resize(len, 0.0);
    (numer, denom)
}

// =============================================================================
// Floating point
// =============================================================================

/// Exact (f64) direct-form recursion.
#[derive(Debug, Clone)]
pub struct UnquantizedDirectForm {
    numer: Vec<f64>,
    denom: Vec<f64>,
    history: History,
}

impl UnquantizedDirectForm {
    pub fn new(design: &DigitalTransferFunction) -> Self {
        let (numer, denom) = aligned_coefficients(design);
        let order = numer.len() - 1;
        Self {
            numer,
            denom,
            history: History::new(order),
        }
    }
}

impl FilterImplementation for UnquantizedDirectForm {
    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        self.history.step(&self.numer, &self.denom, input)
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn numerator(&self) -> &[f64] {
        &self.numer
    }

    fn denominator(&self) -> &[f64] {
        &self.denom
    }
}

// =============================================================================
// Fixed point
// =============================================================================

/// Direct-form recursion on quantized input and coefficients.
#[derive(Debug, Clone)]
pub struct QuantizedDirectForm {
    numer: Vec<f64>,
    denom: Vec<f64>,
    input_factor: f64,
    history: History,
}

impl QuantizedDirectForm {
    /// Factors are 2^bits; both must be >= 1.
    pub fn new(design: &DigitalTransferFunction, coeff_factor: f64, input_factor: f64) -> Self {
        let coeff_factor = coeff_factor.max(1.0);
        let (mut numer, mut denom) = aligned_coefficients(design);
        for c in numer.iter_mut().chain(denom.iter_mut()) {
            *c = quantize(*c, coeff_factor);
        }
        let order = numer.len() - 1;
        Self {
            numer,
            denom,
            input_factor: input_factor.max(1.0),
            history: History::new(order),
        }
    }

    pub fn input_factor(&self) -> f64 {
        self.input_factor
    }
}

impl FilterImplementation for QuantizedDirectForm {
    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        let x = quantize(input, self.input_factor);
        self.history.step(&self.numer, &self.denom, x)
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn numerator(&self) -> &[f64] {
        &self.numer
    }

    fn denominator(&self) -> &[f64] {
        &self.denom
    }
}

// =============================================================================
// Selection
// =============================================================================

/// The realization picked for a build; static dispatch on the hot path.
#[derive(Debug, Clone)]
pub enum Realization {
    Exact(UnquantizedDirectForm),
    Quantized(QuantizedDirectForm),
}

impl Realization {
    pub fn for_design(design: &DigitalTransferFunction, spec: &FilterSpec) -> Self {
        if spec.quantize_enabled {
            Realization::Quantized(QuantizedDirectForm::new(
                design,
                spec.coeff_quant_factor(),
                spec.input_quant_factor(),
            ))
        } else {
            Realization::Exact(UnquantizedDirectForm::new(design))
        }
    }

    pub fn is_quantized(&self) -> bool {
        matches!(self, Realization::Quantized(_))
    }
}

impl FilterImplementation for Realization {
    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        match self {
            Realization::Exact(f) => f.process_sample(input),
            Realization::Quantized(f) => f.process_sample(input),
        }
    }

    fn reset(&mut self) {
        match self {
            Realization::Exact(f) => f.reset(),
            Realization::Quantized(f) => f.reset(),
        }
    }

    fn numerator(&self) -> &[f64] {
        match self {
            Realization::Exact(f) => f.numerator(),
            Realization::Quantized(f) => f.numerator(),
        }
    }

    fn denominator(&self) -> &[f64] {
        match self {
            Realization::Exact(f) => f.denominator(),
            Realization::Quantized(f) => f.denominator(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design(b: &[f64], a: &[f64]) -> DigitalTransferFunction {
        DigitalTransferFunction::from_coefficients(b.to_vec(), a.to_vec(), 1e-3).unwrap()
    }

    #[test]
    fn test_zero_initial_state() {
        let d = design(&[0.2, 0.3, 0.1], &[1.0, -0.5, 0.2]);
        let mut exact = UnquantizedDirectForm::new(&d);
        let mut quant = QuantizedDirectForm::new(&d, 4096.0, 4096.0);
        assert_eq!(exact.process_sample(0.0), 0.0);
        assert_eq!(quant.process_sample(0.0), 0.0);
    }

    #[test]
    fn test_impulse_response_first_order() {
        // y[n] = x[n] + 0.5 y[n-1]  ->  h[n] = 0.5^n
        let d = design(&[1.0, 0.0], &[1.0, -0.5]);
        let mut f = UnquantizedDirectForm::new(&d);
        let mut expected = 1.0;
        for n in 0..20 {
            let y = f.process_sample(if n == 0 { 1.0 } else { 0.0 });
            assert!((y - expected).abs() < 1e-15);
            expected *= 0.5;
        }
    }

    #[test]
    fn test_ring_matches_naive_convolution() {
        let b = [0.1, 0.25, -0.05, 0.3];
        let a = [1.0, -0.4, 0.1, -0.02];
        let mut f = UnquantizedDirectForm::new(&design(&b, &a));

        let xs: Vec<f64> = (0..64).map(|n| ((n * 7 % 11) as f64 - 5.0) / 5.0).collect();
        let mut ys: Vec<f64> = Vec::new();
        for (n, &x) in xs.iter().enumerate() {
            let mut y = 0.0;
            for i in 0..=3 {
                if n >= i {
                    y += b[i] * xs[n - i];
                }
            }
            for j in 1..=3 {
                if n >= j {
                    y -= a[j] * ys[n - j];
                }
            }
            ys.push(y);
            assert!((f.process_sample(x) - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let d = design(&[0.5, 0.5], &[1.0, -0.9]);
        let mut f = UnquantizedDirectForm::new(&d);
        let first = f.process_sample(1.0);
        f.process_sample(1.0);
        f.reset();
        assert_eq!(f.process_sample(1.0), first);
    }

    #[test]
    fn test_quantized_coefficients_within_half_step() {
        let d = design(&[0.123456, 0.654321], &[1.0, -0.777777]);
        let factor = 1024.0;
        let q = QuantizedDirectForm::new(&d, factor, 1024.0);
        for (qc, c) in q.numerator().iter().zip(d.numerator()) {
            assert!((qc - c).abs() <= 0.5 / factor);
            assert_eq!((qc * factor).fract(), 0.0);
        }
        for (qc, c) in q.denominator().iter().zip(d.denominator()) {
            assert!((qc - c).abs() <= 0.5 / factor);
        }
        assert_eq!(q.denominator()[0], 1.0);
    }

    #[test]
    fn test_quantized_input_is_rounded() {
        // Pass-through filter exposes the input quantizer
        let d = design(&[1.0, 0.0], &[1.0, 0.0]);
        let mut q = QuantizedDirectForm::new(&d, 16.0, 8.0);
        assert_eq!(q.process_sample(0.30), 0.25);
        assert_eq!(q.process_sample(0.32), 0.375);
        assert_eq!(q.process_sample(-0.07), -0.125);
    }

    #[test]
    fn test_factors_below_one_are_clamped() {
        let d = design(&[1.0, 0.0], &[1.0, 0.0]);
        let q = QuantizedDirectForm::new(&d, 0.25, 0.0);
        assert_eq!(q.input_factor(), 1.0);
        assert_eq!(q.numerator()[0], 1.0);

        let q = QuantizedDirectForm::new(&d, 4096.0, 256.0);
        assert_eq!(q.input_factor(), 256.0);
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let d = design(&[0.5, 0.5], &[1.0, -0.5]);
        let mut a = UnquantizedDirectForm::new(&d);
        let mut b = a.clone();
        a.process_sample(1.0);
        a.process_sample(1.0);
        assert_eq!(b.process_sample(0.0), 0.0);
    }

    #[test]
    fn test_realization_selection() {
        let d = design(&[0.5, 0.5], &[1.0, -0.5]);
        let mut spec = FilterSpec::default();
        assert!(!Realization::for_design(&d, &spec).is_quantized());
        spec.quantize_enabled = true;
        assert!(Realization::for_design(&d, &spec).is_quantized());
    }
}
