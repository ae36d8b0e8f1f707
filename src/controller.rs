//! Filter Controller
//!
//! Owns the filter parameters on the control side and hands fully built
//! realizations to the real-time side.
//!
//! ```text
//!   control context                         real-time context
//!   ───────────────                         ─────────────────
//!   FilterController ──Command (SPSC)──▶ FilterEngine::tick()
//!         ▲                                       │
//!         └───────── retired filters (SPSC) ◀─────┘
//! ```
//!
//! # Design Notes
//! - Rebuilds (prototype, pre-warp, bilinear) only ever run in the control
//!   context; the engine receives a finished `Box<ActiveFilter>`
//! - The engine swaps the new filter in at the start of the next tick and
//!   sends the old one back, so nothing is freed on the real-time thread
//! - A failed rebuild sends nothing; the engine keeps its current filter
//! - Pause freezes the realization without resetting it

use crate::config::FilterSpec;
use crate::dsp::{design_filter, DigitalTransferFunction, FilterImplementation, Realization};
use crate::error::{FilterError, FilterResult};
use crate::report::CoefficientReport;
use crate::debug::{rt_log, rt_log_channel, RtLogDrain, RtLogger};
use log::{debug, error, info};
use ringbuf::{Consumer, Producer, RingBuffer};

/// Filter swaps that may be queued or awaiting retirement at once.
pub const MAX_PENDING_SWAPS: usize = 8;

/// Pause/unpause/reset commands need room next to the swaps.
const COMMAND_CAPACITY: usize = 2 * MAX_PENDING_SWAPS;

// =============================================================================
// Active filter
// =============================================================================

/// Everything the engine needs to run one design.
#[derive(Debug, Clone)]
pub struct ActiveFilter {
    spec: FilterSpec,
    realization: Realization,
}

impl ActiveFilter {
    /// Run the full design pipeline for `spec`.
    pub fn build(spec: &FilterSpec) -> FilterResult<(Self, DigitalTransferFunction)> {
        let design = design_filter(spec)?;
        let realization = Realization::for_design(&design, spec);
        Ok((
            Self {
                spec: spec.clone(),
                realization,
            },
            design,
        ))
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn realization(&self) -> &Realization {
        &self.realization
    }

    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        self.realization.process_sample(input)
    }
}

// =============================================================================
// State
// =============================================================================

/// Control-side view of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No filter has been built yet; the engine emits zeros
    Uninitialized,
    /// Samples are routed through the active filter
    Ready,
    /// Output held at zero, filter memory frozen
    Paused,
}

impl ControllerState {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerState::Uninitialized => "Uninitialized",
            ControllerState::Ready => "Ready",
            ControllerState::Paused => "Paused",
        }
    }
}

enum Command {
    Install(Box<ActiveFilter>),
    Pause,
    Unpause,
    Reset,
}

/// What the engine hands back after a swap. `None` when nothing was active.
type Retired = Option<Box<ActiveFilter>>;

// =============================================================================
// Control side
// =============================================================================

/// Control half: validates and builds filters, never touches samples.
pub struct FilterController {
    spec: FilterSpec,
    state: ControllerState,
    design: Option<DigitalTransferFunction>,
    last_error: Option<FilterError>,
    commands: Producer<Command>,
    retired: Consumer<Retired>,
    rt_log: RtLogDrain,
    /// Installs sent whose retirement has not come back yet
    pending_swaps: usize,
}

impl FilterController {
    /// Create a linked controller/engine pair. Nothing is built until `init`.
    pub fn new(spec: FilterSpec) -> (FilterController, FilterEngine) {
        let (cmd_prod, cmd_cons) = RingBuffer::<Command>::new(COMMAND_CAPACITY).split();
        let (ret_prod, ret_cons) = RingBuffer::<Retired>::new(MAX_PENDING_SWAPS).split();
        let (rt_logger, rt_drain) = rt_log_channel();

        let controller = FilterController {
            spec,
            state: ControllerState::Uninitialized,
            design: None,
            last_error: None,
            commands: cmd_prod,
            retired: ret_cons,
            rt_log: rt_drain,
            pending_swaps: 0,
        };
        let engine = FilterEngine {
            commands: cmd_cons,
            retired: ret_prod,
            active: None,
            paused: false,
            rt_log: rt_logger,
        };
        (controller, engine)
    }

    /// Build from the current spec and enter `Ready`.
    pub fn init(&mut self) -> FilterResult<()> {
        let spec = self.spec.clone();
        self.rebuild(spec)
    }

    /// Rebuild with a complete new spec. On failure the running filter stays.
    pub fn parameter_changed(&mut self, spec: FilterSpec) -> FilterResult<()> {
        self.rebuild(spec)
    }

    /// Host notification that the sample period changed.
    pub fn set_sample_period(&mut self, sample_period_s: f64) -> FilterResult<()> {
        let spec = self.spec.clone().with_sample_period(sample_period_s);
        self.rebuild(spec)
    }

    /// Hold the output at zero. Only valid once a filter is running.
    pub fn pause(&mut self) -> FilterResult<()> {
        self.collect_retired();
        match self.state {
            ControllerState::Uninitialized => Err(FilterError::invalid(
                "cannot pause before a filter has been built",
            )),
            ControllerState::Paused => Ok(()),
            ControllerState::Ready => {
                self.send(Command::Pause)?;
                self.set_state(ControllerState::Paused);
                Ok(())
            }
        }
    }

    /// Resume from the frozen state.
    pub fn unpause(&mut self) -> FilterResult<()> {
        self.collect_retired();
        match self.state {
            ControllerState::Uninitialized => Err(FilterError::invalid(
                "cannot unpause before a filter has been built",
            )),
            ControllerState::Ready => Ok(()),
            ControllerState::Paused => {
                self.send(Command::Unpause)?;
                self.set_state(ControllerState::Ready);
                Ok(())
            }
        }
    }

    /// Clear the active realization's history on the next tick.
    pub fn reset_filter(&mut self) -> FilterResult<()> {
        self.collect_retired();
        if self.state == ControllerState::Uninitialized {
            return Err(FilterError::invalid("no filter to reset"));
        }
        self.send(Command::Reset)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Spec of the last successful build (or the initial one before `init`).
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Designed feed-forward coefficients of the active filter.
    pub fn numerator(&self) -> Option<&[f64]> {
        self.design.as_ref().map(|d| d.numerator())
    }

    /// Designed feedback coefficients of the active filter, a[0] == 1.
    pub fn denominator(&self) -> Option<&[f64]> {
        self.design.as_ref().map(|d| d.denominator())
    }

    pub fn design(&self) -> Option<&DigitalTransferFunction> {
        self.design.as_ref()
    }

    /// Error from the most recent rebuild, cleared by the next success.
    pub fn last_error(&self) -> Option<&FilterError> {
        self.last_error.as_ref()
    }

    pub fn report(&self) -> Option<CoefficientReport> {
        self.design
            .as_ref()
            .map(|d| CoefficientReport::new(&self.spec, d))
    }

    /// Installs still queued or not yet returned by the engine.
    pub fn pending_swaps(&mut self) -> usize {
        self.collect_retired();
        self.pending_swaps
    }

    /// Free filters the engine has retired and forward its log lines.
    pub fn collect_retired(&mut self) {
        while let Some(old) = self.retired.pop() {
            self.pending_swaps = self.pending_swaps.saturating_sub(1);
            drop(old);
        }
        self.rt_log.drain();
    }

    fn send(&mut self, cmd: Command) -> FilterResult<()> {
        self.commands.push(cmd).map_err(|_| FilterError::Busy {
            pending: self.commands.len(),
        })
    }

    fn rebuild(&mut self, spec: FilterSpec) -> FilterResult<()> {
        self.collect_retired();
        if self.pending_swaps >= MAX_PENDING_SWAPS {
            let err = FilterError::Busy {
                pending: self.pending_swaps,
            };
            self.last_error = Some(err.clone());
            return Err(err);
        }

        let (filter, design) = match ActiveFilter::build(&spec) {
            Ok(built) => built,
            Err(err) => {
                error!("rebuild failed, keeping previous filter: {err}");
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        if let Err(err) = self.send(Command::Install(Box::new(filter))) {
            self.last_error = Some(err.clone());
            return Err(err);
        }
        self.pending_swaps += 1;

        info!(
            "installed {} order {} (edge {} Hz, dt {} s{})",
            spec.family.name(),
            spec.order,
            spec.passband_edge_hz,
            spec.sample_period_s,
            if spec.quantize_enabled { ", quantized" } else { "" }
        );
        self.spec = spec;
        self.design = Some(design);
        self.last_error = None;
        if self.state == ControllerState::Uninitialized {
            self.set_state(ControllerState::Ready);
        }
        Ok(())
    }

    fn set_state(&mut self, state: ControllerState) {
        debug!("controller {} -> {}", self.state.name(), state.name());
        self.state = state;
    }
}

// =============================================================================
// Real-time side
// =============================================================================

/// Real-time half: one `tick` per sample period.
pub struct FilterEngine {
    commands: Consumer<Command>,
    retired: Producer<Retired>,
    active: Option<Box<ActiveFilter>>,
    paused: bool,
    rt_log: RtLogger,
}

impl FilterEngine {
    /// Process one input sample. Emits 0 while paused or before the first build.
    pub fn tick(&mut self, input: f64) -> f64 {
        #[cfg(debug_assertions)]
        let output = assert_no_alloc::assert_no_alloc(|| self.process_tick(input));
        #[cfg(not(debug_assertions))]
        let output = self.process_tick(input);
        output
    }

    /// Run `tick` over a buffer in place.
    pub fn process_block(&mut self, samples: &mut [f64]) {
        for s in samples.iter_mut() {
            *s = self.tick(*s);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    /// Spec of the filter currently running, if any.
    pub fn active_spec(&self) -> Option<&FilterSpec> {
        self.active.as_ref().map(|f| f.spec())
    }

    #[inline]
    fn process_tick(&mut self, input: f64) -> f64 {
        self.apply_commands();
        if self.paused {
            return 0.0;
        }
        match self.active.as_mut() {
            Some(filter) => filter.process_sample(input),
            None => 0.0,
        }
    }

    fn apply_commands(&mut self) {
        while let Some(cmd) = self.commands.pop() {
            match cmd {
                Command::Install(filter) => {
                    rt_log!(self.rt_log, "engine: install order {}", filter.spec().order);
                    let old = self.active.replace(filter);
                    // The controller caps pending swaps at the retire capacity
                    if let Err(old) = self.retired.push(old) {
                        rt_log!(self.rt_log, "engine: retire queue full");
                        std::mem::forget(old);
                    }
                }
                Command::Pause => self.paused = true,
                Command::Unpause => self.paused = false,
                Command::Reset => {
                    if let Some(filter) = self.active.as_mut() {
                        filter.realization.reset();
                    }
                }
            }
        }
    }
}
