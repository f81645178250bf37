//! Event-driven growing hard-sphere engine.
//!
//! Spheres live in the periodic unit box of dimension `D`, grow at a common rate and
//! move ballistically between events. Each sphere owns exactly one pending event in
//! an indexed heap; a periodic cell grid limits collision searches to neighboring
//! cells.

pub mod cells;
pub mod event;
pub mod heap;
pub mod math;
pub mod sim;
pub mod sphere;

pub use cells::{CellGrid, Neighbor, NeighborCells};
pub use event::{Direction, Event, EventKind};
pub use heap::EventHeap;
pub use sim::{CycleStats, Outcome, Simulation};
pub use sphere::Sphere;
