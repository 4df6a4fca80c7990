//! tapebias DSP library — Jiles-Atherton tape hysteresis with AC bias.
//!
//! Pure DSP math with no audio framework dependencies.

// Magnetic model
pub mod anhysteretic;
pub mod physics;
pub mod substep;

// Per-sample scheduling
pub mod lut;
pub mod mode;
pub mod reference;
pub mod scheduler;

// Table storage
pub mod error;
pub mod lut_file;

// Output stage
pub mod channel;
pub mod filters;

pub use channel::{Engine, HysteresisChannel, StageGains};
pub use error::{LutError, LutResult};
pub use lut::{LutGrid, LutPair, LutProvenance, ProvenanceMismatch};
pub use lut_file::{LutBank, LutTable};
pub use mode::{Mode, ResolutionTier};
pub use physics::{BiasControls, NormalizedCoefficients, PhysicsParams};
pub use reference::ExactScheduler;
pub use scheduler::JaScheduler;
