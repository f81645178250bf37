use approx::assert_relative_eq;
use spherepack::core::{Direction, Outcome, Simulation};

fn running(seed: u64) -> spherepack::Result<Simulation<3>> {
    let mut sim = Simulation::<3>::with_packing_fraction(16, 0.1, 0.01, 0.35, Some(seed))?;
    sim.create_spheres(1.0)?;
    sim.process(500)?;
    Ok(sim)
}

#[test]
fn plain_synchronize_is_idempotent() -> spherepack::Result<()> {
    let mut sim = running(1)?;
    let radius = sim.radius();
    let total = sim.total_time();

    sim.synchronize(false)?;
    let positions = sim.positions();
    let velocities = sim.velocities();
    assert_eq!(sim.global_time(), 0.0);
    assert_relative_eq!(sim.radius(), radius, max_relative = 1e-12);
    assert_relative_eq!(sim.total_time(), total, max_relative = 1e-12);

    sim.synchronize(false)?;
    assert_eq!(sim.positions(), positions);
    assert_eq!(sim.velocities(), velocities);
    assert_relative_eq!(sim.radius(), radius, max_relative = 1e-12);
    Ok(())
}

#[test]
fn synchronize_keeps_the_schedule() -> spherepack::Result<()> {
    let mut a = running(2)?;
    let mut b = running(2)?;
    b.synchronize(false)?;
    // Same events follow whether or not the clock was folded.
    for _ in 0..20 {
        let (ea, eb) = (a.step()?, b.step()?);
        assert_eq!(std::mem::discriminant(&ea), std::mem::discriminant(&eb));
    }
    Ok(())
}

#[test]
fn rescale_normalizes_velocities() -> spherepack::Result<()> {
    let mut sim = running(3)?;
    let growth = sim.growth_rate();
    let energy = sim.kinetic_energy();
    sim.synchronize(true)?;
    // 2 M E == 1 after rescaling.
    assert_relative_eq!(2.0 * sim.kinetic_energy(), 1.0, max_relative = 1e-12);
    assert_relative_eq!(sim.growth_rate(), growth / (2.0 * energy).sqrt(), max_relative = 1e-12);
    assert_eq!(sim.pending_events(), 16);
    assert!(sim.max_overlap() < 1e-9);
    Ok(())
}

#[test]
fn transfers_keep_cells_consistent() -> spherepack::Result<()> {
    let mut sim = Simulation::<3>::with_packing_fraction(8, 0.05, 0.0, 0.35, Some(8))?;
    assert_eq!(sim.ngrids(), 2);
    sim.create_spheres(1.0)?;
    let mut wrapped = 0;
    for _ in 0..5000 {
        if let Outcome::Transfer { sphere, axis, direction, .. } = sim.step()? {
            let s = &sim.spheres()[sphere];
            assert!(s.x.iter().all(|&c| (0.0..1.0).contains(&c)), "{:?}", s.x);
            assert_eq!(s.cell, sim.cell_of(&s.x));
            let at_edge = match direction {
                Direction::Upper => s.cell[axis] == 0,
                Direction::Lower => s.cell[axis] == sim.ngrids() - 1,
            };
            if at_edge {
                wrapped += 1;
            }
        }
    }
    assert!(wrapped > 0);
    Ok(())
}

#[test]
fn transfers_keep_cells_consistent_on_uneven_grid() -> spherepack::Result<()> {
    // 49 cells per axis: cell faces are not exact binary fractions.
    let max_pf = 8.0 * std::f64::consts::PI * 0.0101 * 0.0101;
    let mut sim = Simulation::<2>::new(8, 0.001, 0.0, max_pf, Some(3))?;
    assert_eq!(sim.ngrids(), 49);
    sim.create_spheres(1.0)?;
    let mut transfers = 0;
    for _ in 0..20_000 {
        if let Outcome::Transfer { sphere, .. } = sim.step()? {
            let s = &sim.spheres()[sphere];
            assert!(s.x.iter().all(|&c| (0.0..1.0).contains(&c)), "{:?}", s.x);
            assert_eq!(s.cell, sim.cell_of(&s.x), "sphere {sphere} at {:?}", s.x);
            transfers += 1;
        }
    }
    assert!(transfers > 1000);
    Ok(())
}
