//! Compression runs: grow the spheres cycle by cycle until a density or pressure
//! target is met.

use crate::config::RunConfig;
use crate::core::{CycleStats, Simulation};
use crate::error::{Error, Result};
use crate::io::read_configuration;
use log::{debug, info};

/// When to stop compressing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionTarget {
    pub max_packing_fraction: f64,
    pub max_pressure: f64,
    /// Events per sphere between synchronizations.
    pub events_per_cycle: usize,
    pub max_cycles: Option<usize>,
}

impl CompressionTarget {
    pub fn from_config(config: &RunConfig, max_packing_fraction: f64) -> Self {
        Self {
            max_packing_fraction,
            max_pressure: config.max_pressure,
            events_per_cycle: config.events_per_cycle,
            max_cycles: config.max_cycles,
        }
    }
}

/// Build and seed a simulation for one target of `config`: random placement, or
/// the saved configuration named by `read_file`.
pub fn build_simulation<const D: usize>(
    config: &RunConfig,
    max_packing_fraction: f64,
) -> Result<Simulation<D>> {
    config.validate()?;
    if D != config.dim {
        return Err(Error::InvalidParam(format!(
            "configuration asks for {} dimensions, engine built for {D}",
            config.dim
        )));
    }
    let mut sim = Simulation::<D>::with_packing_fraction(
        config.n,
        config.initial_packing_fraction,
        config.growth_rate,
        max_packing_fraction,
        config.seed,
    )?;
    sim.set_separation_boost(config.separation_boost)?;
    match &config.read_file {
        Some(path) => {
            info!("reading configuration from {}", path.display());
            let positions = read_configuration::<D>(path)?;
            sim.recreate_spheres(&positions, config.temperature)?;
        }
        None => sim.create_spheres(config.temperature)?,
    }
    Ok(sim)
}

/// Alternate `process(events_per_cycle * N)` and a rescaling synchronization
/// until the packing fraction or the pressure reaches its target.
///
/// `observer` sees the statistics of every cycle. Returns the statistics of the
/// last cycle, or default statistics when the target was already met.
pub fn compress<const D: usize, F>(
    sim: &mut Simulation<D>,
    target: &CompressionTarget,
    mut observer: F,
) -> Result<CycleStats>
where
    F: FnMut(usize, &CycleStats) -> Result<()>,
{
    if target.events_per_cycle == 0 {
        return Err(Error::InvalidParam("events_per_cycle must be > 0".into()));
    }
    let events = target
        .events_per_cycle
        .checked_mul(sim.num_spheres())
        .ok_or_else(|| Error::InvalidParam("events per cycle overflow".into()))?;

    let mut last = CycleStats {
        packing_fraction: sim.packing_fraction(),
        ..CycleStats::default()
    };
    let mut cycles = 0usize;
    while sim.packing_fraction() < target.max_packing_fraction
        && sim.pressure() < target.max_pressure
    {
        if target.max_cycles.is_some_and(|limit| cycles >= limit) {
            return Err(Error::NotConverged {
                cycles,
                packing_fraction: sim.packing_fraction(),
            });
        }
        last = sim.process(events)?;
        sim.synchronize(true)?;
        cycles += 1;
        observer(cycles, &last)?;
    }
    info!(
        "compression finished after {cycles} cycles: pf={:.6} pressure={:.4} events={}",
        sim.packing_fraction(),
        sim.pressure(),
        sim.total_events()
    );
    debug!("final radius {}, total time {}", sim.radius(), sim.total_time());
    Ok(last)
}
