use approx::assert_relative_eq;
use spherepack::core::{EventKind, Outcome, Simulation};

/// Two spheres approaching head-on along y = 0.5 and two idle spectators.
fn head_on() -> spherepack::Result<Simulation<2>> {
    let mut sim = Simulation::<2>::new(4, 0.05, 0.0, 0.8, Some(1))?;
    sim.load_configuration(
        &[[0.3, 0.5], [0.7, 0.5], [0.5, 0.15], [0.5, 0.85]],
        &[[1.0, 0.0], [-1.0, 0.0], [0.0, 0.0], [0.0, 0.0]],
    )?;
    Ok(sim)
}

#[test]
fn head_on_collision_at_contact_time() -> spherepack::Result<()> {
    let mut sim = head_on()?;
    let stats = sim.process(1)?;
    assert_eq!(stats.collisions, 1);

    // Gap 0.4 between centers, contact at 0.1, closing speed 2.
    assert_relative_eq!(sim.global_time(), 0.15, epsilon = 1e-12);
    let v = sim.velocities();
    assert_relative_eq!(v[0][0], -1.0, epsilon = 1e-12);
    assert_relative_eq!(v[1][0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(v[0][1], 0.0, epsilon = 1e-12);
    assert_relative_eq!(v[1][1], 0.0, epsilon = 1e-12);
    assert_eq!(v[2], [0.0, 0.0]);
    assert_eq!(v[3], [0.0, 0.0]);

    let x = sim.positions();
    assert_relative_eq!(x[1][0] - x[0][0], 0.1, epsilon = 1e-12);
    Ok(())
}

#[test]
fn step_reports_the_pair() -> spherepack::Result<()> {
    let mut sim = head_on()?;
    match sim.step()? {
        Outcome::Collision { i, j, time } => {
            let mut pair = [i, j];
            pair.sort_unstable();
            assert_eq!(pair, [0, 1]);
            assert_relative_eq!(time, 0.15, epsilon = 1e-12);
        }
        other => panic!("expected a collision, got {other:?}"),
    }
    // The partner's half of the resolved collision is left as a check.
    assert_eq!(sim.pending_events(), 4);
    Ok(())
}

#[test]
fn partner_is_rechecked_lazily() -> spherepack::Result<()> {
    let mut sim = head_on()?;
    let (i, j) = match sim.step()? {
        Outcome::Collision { i, j, .. } => (i, j),
        other => panic!("expected a collision, got {other:?}"),
    };
    let partner = sim.pending_event(j).copied().expect("partner event");
    assert_eq!(partner.kind, EventKind::Check);
    assert_relative_eq!(partner.time_f64(), 0.15, epsilon = 1e-12);
    assert_ne!(sim.pending_event(i).map(|e| e.kind), Some(EventKind::Check));

    // The check fires next, at the collision time.
    assert_eq!(sim.step()?, Outcome::Check { sphere: j });
    Ok(())
}

#[test]
fn momentum_is_conserved_with_growth() -> spherepack::Result<()> {
    let mut sim = Simulation::<3>::with_packing_fraction(32, 0.1, 0.02, 0.4, Some(77))?;
    sim.create_spheres(1.0)?;
    let before = sim.total_momentum();
    let stats = sim.process(5000)?;
    assert!(stats.collisions > 0);
    let after = sim.total_momentum();
    for k in 0..3 {
        assert_relative_eq!(before[k], after[k], epsilon = 1e-9);
    }
    assert!(sim.max_overlap() < 1e-9);
    Ok(())
}

#[test]
fn energy_is_conserved_without_growth() -> spherepack::Result<()> {
    let mut sim = Simulation::<3>::with_packing_fraction(27, 0.2, 0.0, 0.3, Some(5))?;
    sim.create_spheres(1.0)?;
    let stats = sim.process(4000)?;
    assert!(stats.collisions > 0);
    assert!(stats.energy_change.abs() < 1e-9, "energy change {}%", stats.energy_change);
    assert_relative_eq!(stats.packing_fraction, 0.2, max_relative = 1e-12);
    Ok(())
}

#[test]
fn events_fire_in_time_order() -> spherepack::Result<()> {
    let mut sim = Simulation::<2>::with_packing_fraction(50, 0.3, 0.01, 0.5, Some(3))?;
    sim.create_spheres(1.0)?;
    let mut last = sim.global_time();
    for _ in 0..3000 {
        sim.step()?;
        assert!(sim.global_time() >= last);
        last = sim.global_time();
        assert_eq!(sim.pending_events(), 50);
    }
    Ok(())
}
