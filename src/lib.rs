//! Growing hard-sphere packings by event-driven molecular dynamics
//! (Lubachevsky-Stillinger compression) in the periodic unit box.

pub mod config;
pub mod core;
pub mod driver;
pub mod error;
pub mod io;

#[cfg(feature = "python")]
mod python;

pub use crate::config::RunConfig;
pub use crate::core::{CycleStats, Outcome, Simulation};
pub use crate::driver::{build_simulation, compress, CompressionTarget};
pub use crate::error::{Error, Result};
