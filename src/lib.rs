//! IIR low-pass filter design and real-time execution.
//!
//! Butterworth, Chebyshev type I and elliptic analog prototypes are
//! denormalized, optionally pre-warped, discretized with the bilinear
//! transform and run as direct-form recursions, exact or fixed-point.
//!
//! ```text
//! FilterSpec ─▶ analog prototype ─▶ pre-warp ─▶ bilinear ─▶ Realization
//!                   (control context)                          │
//!                                                   FilterEngine::tick()
//! ```
//!
//! `FilterController` owns the parameters and rebuilds; `FilterEngine` is the
//! allocation-free half that lives on the real-time thread.

mod debug;

pub mod config;
pub mod controller;
pub mod dsp;
pub mod error;
pub mod report;

pub use config::{ChebyshevNorm, FilterFamily, FilterSpec, MAX_QUANT_BITS};
pub use controller::{ActiveFilter, ControllerState, FilterController, FilterEngine};
pub use dsp::{
    design_filter, elliptic_minimum_order, DigitalTransferFunction, FilterImplementation,
    QuantizedDirectForm, Realization, UnquantizedDirectForm,
};
pub use error::{FilterError, FilterResult};
pub use report::CoefficientReport;

// Makes the engine's assert_no_alloc guard abort on any allocation in tests
#[cfg(test)]
#[global_allocator]
static ALLOCATOR: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;
