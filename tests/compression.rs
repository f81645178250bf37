use spherepack::core::Simulation;
use spherepack::{compress, CompressionTarget};

#[test]
fn eight_spheres_reach_target_without_overlap() -> spherepack::Result<()> {
    let mut sim = Simulation::<3>::with_packing_fraction(8, 0.05, 0.01, 0.35, Some(2718))?;
    sim.create_spheres(1.0)?;
    let target = CompressionTarget {
        max_packing_fraction: 0.3,
        max_pressure: f64::INFINITY,
        events_per_cycle: 20,
        max_cycles: Some(100_000),
    };
    let mut cycles = 0;
    compress(&mut sim, &target, |_, _| {
        cycles += 1;
        Ok(())
    })?;

    assert!(sim.packing_fraction() >= 0.3);
    assert!(cycles > 0);
    let overlap = sim.max_overlap();
    assert!(overlap < 1e-9, "overlap {overlap}");
    assert!(sim.total_events() > 0);
    Ok(())
}

#[test]
fn packing_fraction_grows_across_synchronizations() -> spherepack::Result<()> {
    let mut sim = Simulation::<2>::with_packing_fraction(40, 0.1, 0.005, 0.6, Some(99))?;
    sim.create_spheres(1.0)?;
    let mut last = sim.packing_fraction();
    for _ in 0..20 {
        sim.process(400)?;
        sim.synchronize(true)?;
        let pf = sim.packing_fraction();
        assert!(pf >= last);
        last = pf;
        assert!(sim.max_overlap() < 1e-9);
    }
    assert!(last > 0.1);
    Ok(())
}

#[test]
fn higher_dimensions_compress() -> spherepack::Result<()> {
    let mut sim = Simulation::<4>::with_packing_fraction(32, 0.02, 0.01, 0.2, Some(4))?;
    sim.create_spheres(1.0)?;
    let target = CompressionTarget {
        max_packing_fraction: 0.1,
        max_pressure: f64::INFINITY,
        events_per_cycle: 10,
        max_cycles: Some(100_000),
    };
    compress(&mut sim, &target, |_, _| Ok(()))?;
    assert!(sim.packing_fraction() >= 0.1);
    assert!(sim.max_overlap() < 1e-9);
    Ok(())
}
