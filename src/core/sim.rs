use crate::core::cells::CellGrid;
use crate::core::event::{Direction, Event, EventKind};
use crate::core::heap::EventHeap;
use crate::core::math::{
    add_scaled, dot, image_of, norm_squared, periodic_distance_squared,
    radius_for_packing_fraction, sub, unit_ball_volume, MASS, SIZE,
};
use crate::core::sphere::Sphere;
use crate::error::{Error, Result};
use log::{debug, trace, warn};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::path::Path;

/// Random placement attempts per sphere before giving up.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 1000;

/// Default coefficient of the growth-compensating radial kick applied at contact.
pub const DEFAULT_SEPARATION_BOOST: f64 = 2.0;

/// Neighbor search reaches this many cells along each axis.
const NEIGHBOR_RADIUS: usize = 1;

/// Squared-gap slack tolerated before a pair is reported as overlapping.
const OVERLAP_TOLERANCE: f64 = 1e-12;

/// Slack on the contact-distance residual at a processed collision.
const CONTACT_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// What one processed event turned out to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Elastic contact between `i` and `j` at `time`.
    Collision { i: usize, j: usize, time: f64 },
    /// `sphere` moved into the neighboring cell along `axis`.
    Transfer {
        sphere: usize,
        axis: usize,
        direction: Direction,
        time: f64,
    },
    /// `sphere`'s prediction was recomputed.
    Check { sphere: usize },
    /// A collision whose partner had moved on; `sphere` was recomputed instead.
    Stale { sphere: usize, partner: usize },
}

/// Statistics of one `process` batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleStats {
    pub packing_fraction: f64,
    /// Reduced pressure `PV / (N k T)`.
    pub pressure: f64,
    /// Kinetic energy per sphere.
    pub energy: f64,
    /// Percent energy change relative to the previous batch.
    pub energy_change: f64,
    pub collision_rate: f64,
    /// Simulated time covered by the batch.
    pub elapsed: f64,
    pub collisions: usize,
    pub transfers: usize,
    pub checks: usize,
    pub stale: usize,
    pub total_events: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    collisions: usize,
    transfers: usize,
    checks: usize,
    stale: usize,
}

#[derive(Debug, Clone, Copy)]
struct Prediction<const D: usize> {
    time: f64,
    partner: usize,
    image: [i32; D],
}

/// Growing hard-sphere packing in the periodic unit box of dimension `D`.
///
/// The engine keeps one pending event per sphere in an indexed heap and advances
/// one event at a time. Spheres are only brought up to date when an event touches
/// them; `synchronize` brings everyone to the global clock, folds the radius growth
/// into `radius` and resets the clock.
#[derive(Debug)]
pub struct Simulation<const D: usize> {
    n: usize,
    max_packing_fraction: f64,
    growth_rate: f64,
    separation_boost: f64,
    /// Radius at `gtime == 0`.
    radius: f64,
    /// Global clock since the last synchronization.
    gtime: f64,
    /// Time folded away by synchronizations; total time is `rtime + gtime`.
    rtime: f64,
    xmomentum: f64,
    pressure: f64,
    energy: f64,
    energy_change: f64,
    collision_rate: f64,
    counters: Counters,
    total_events: u64,
    cycles: u64,
    spheres: Vec<Sphere<D>>,
    cells: CellGrid<D>,
    heap: EventHeap<D>,
    rng: StdRng,
}

impl<const D: usize> Simulation<D> {
    /// Create an empty engine for `n` spheres of initial `radius`.
    ///
    /// The cell grid is sized so that a cell still holds a whole diameter when the
    /// spheres reach `max_packing_fraction`. Call [`Simulation::create_spheres`] or
    /// [`Simulation::load_configuration`] before processing events.
    pub fn new(
        n: usize,
        radius: f64,
        growth_rate: f64,
        max_packing_fraction: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        if D == 0 {
            return Err(Error::InvalidParam("dimension must be at least 1".into()));
        }
        if n == 0 {
            return Err(Error::InvalidParam("number of spheres must be > 0".into()));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidParam("radius must be finite and > 0".into()));
        }
        if !growth_rate.is_finite() || growth_rate < 0.0 {
            return Err(Error::InvalidParam("growth rate must be finite and >= 0".into()));
        }
        if !max_packing_fraction.is_finite()
            || max_packing_fraction <= 0.0
            || max_packing_fraction >= 1.0
        {
            return Err(Error::InvalidParam(
                "maximum packing fraction must lie in (0, 1)".into(),
            ));
        }
        let initial =
            n as f64 * unit_ball_volume::<D>() * radius.powi(D as i32) / SIZE.powi(D as i32);
        if initial > max_packing_fraction {
            return Err(Error::InvalidParam(format!(
                "initial packing fraction {initial:.4} exceeds the maximum \
                 {max_packing_fraction:.4}"
            )));
        }
        let ngrids = optimal_ngrids::<D>(n, max_packing_fraction);
        if ngrids == 0 {
            return Err(Error::InvalidParam(format!(
                "{n} spheres at packing fraction {max_packing_fraction} are wider than half the box"
            )));
        }

        let rng: StdRng = match seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rng().random()),
        };

        debug!("new {D}D packing: n={n}, radius={radius}, growth={growth_rate}, ngrids={ngrids}");
        Ok(Self {
            n,
            max_packing_fraction,
            growth_rate,
            separation_boost: DEFAULT_SEPARATION_BOOST,
            radius,
            gtime: 0.0,
            rtime: 0.0,
            xmomentum: 0.0,
            pressure: 0.0,
            energy: 0.0,
            energy_change: 0.0,
            collision_rate: 0.0,
            counters: Counters::default(),
            total_events: 0,
            cycles: 0,
            spheres: Vec::with_capacity(n),
            cells: CellGrid::new(n, ngrids)?,
            heap: EventHeap::new(n),
            rng,
        })
    }

    /// Same as [`Simulation::new`] with the radius derived from an initial packing fraction.
    pub fn with_packing_fraction(
        n: usize,
        initial_packing_fraction: f64,
        growth_rate: f64,
        max_packing_fraction: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        if !initial_packing_fraction.is_finite() || initial_packing_fraction <= 0.0 {
            return Err(Error::InvalidParam(
                "initial packing fraction must be finite and > 0".into(),
            ));
        }
        let radius = radius_for_packing_fraction::<D>(n.max(1), initial_packing_fraction);
        Self::new(n, radius, growth_rate, max_packing_fraction, seed)
    }

    /// Coefficient `k` of the radial kick `k * growth_rate` each partner receives at contact.
    pub fn set_separation_boost(&mut self, boost: f64) -> Result<()> {
        if !boost.is_finite() || boost < 0.0 {
            return Err(Error::InvalidParam("separation boost must be finite and >= 0".into()));
        }
        self.separation_boost = boost;
        Ok(())
    }

    // ============ Configuration ============

    /// Place `n` non-overlapping spheres uniformly at random, draw Gaussian
    /// velocities of variance `temperature / M` per component and seed the events.
    pub fn create_spheres(&mut self, temperature: f64) -> Result<()> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(Error::InvalidParam("temperature must be finite and >= 0".into()));
        }
        self.spheres.clear();
        self.cells.clear();
        let contact_sq = (2.0 * self.radius()).powi(2);

        for id in 0..self.n {
            let mut placed = None;
            for _ in 0..MAX_PLACEMENT_ATTEMPTS {
                let mut x = [0.0_f64; D];
                x.iter_mut().for_each(|c| *c = self.rng.random_range(0.0..SIZE));
                let clear = self
                    .spheres
                    .iter()
                    .all(|s| periodic_distance_squared(&s.x, &x) > contact_sq);
                if clear {
                    placed = Some(x);
                    break;
                }
            }
            let x = placed.ok_or(Error::Placement {
                sphere: id,
                attempts: MAX_PLACEMENT_ATTEMPTS,
            })?;
            let cell = self.cells.cell_of(&x);
            self.spheres.push(Sphere::new(id, x, [0.0; D], cell, self.gtime)?);
            self.cells.insert(id, &cell);
        }

        self.give_velocities(temperature)?;
        self.energy = self.kinetic_energy();
        self.seed_events()
    }

    /// Replace the whole configuration. Positions are wrapped into the box and
    /// must not overlap at the current radius.
    pub fn load_configuration(
        &mut self,
        positions: &[[f64; D]],
        velocities: &[[f64; D]],
    ) -> Result<()> {
        if velocities.len() != positions.len() {
            return Err(Error::InvalidParam(format!(
                "got {} positions but {} velocities",
                positions.len(),
                velocities.len()
            )));
        }
        self.install(positions, velocities)?;
        self.energy = self.kinetic_energy();
        self.seed_events()
    }

    /// Place spheres at saved `positions` with fresh Gaussian velocities.
    pub fn recreate_spheres(&mut self, positions: &[[f64; D]], temperature: f64) -> Result<()> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(Error::InvalidParam("temperature must be finite and >= 0".into()));
        }
        let still = vec![[0.0; D]; positions.len()];
        self.install(positions, &still)?;
        self.give_velocities(temperature)?;
        self.energy = self.kinetic_energy();
        self.seed_events()
    }

    fn install(&mut self, positions: &[[f64; D]], velocities: &[[f64; D]]) -> Result<()> {
        if positions.len() != self.n {
            return Err(Error::InvalidParam(format!(
                "expected {} spheres, got {}",
                self.n,
                positions.len()
            )));
        }
        let mut spheres = Vec::with_capacity(self.n);
        for (id, (x, v)) in positions.iter().zip(velocities).enumerate() {
            if !x.iter().all(|c| c.is_finite()) {
                return Err(Error::InvalidParam(format!("sphere {id}: position must be finite")));
            }
            let x = x.map(wrap);
            spheres.push(Sphere::new(id, x, *v, self.cells.cell_of(&x), self.gtime)?);
        }
        let contact_sq = (2.0 * self.radius()).powi(2);
        for i in 0..spheres.len() {
            for j in (i + 1)..spheres.len() {
                let gap = periodic_distance_squared(&spheres[i].x, &spheres[j].x) - contact_sq;
                if gap < -OVERLAP_TOLERANCE {
                    return Err(Error::InvalidParam(format!("spheres {i} and {j} overlap")));
                }
            }
        }

        self.cells.clear();
        for s in &spheres {
            self.cells.insert(s.id, &s.cell);
        }
        self.spheres = spheres;
        Ok(())
    }

    /// Replace every velocity with a fresh Gaussian draw.
    fn give_velocities(&mut self, temperature: f64) -> Result<()> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(Error::InvalidParam("temperature must be finite and >= 0".into()));
        }
        if temperature == 0.0 {
            self.spheres.iter_mut().for_each(|s| s.v = [0.0; D]);
            return Ok(());
        }
        let normal = Normal::new(0.0, (temperature / MASS).sqrt())
            .map_err(|e| Error::InvalidParam(format!("velocity distribution: {e}")))?;
        for s in &mut self.spheres {
            s.v.iter_mut().for_each(|c| *c = normal.sample(&mut self.rng));
        }
        Ok(())
    }

    /// Give every sphere a check at the current clock and resolve those checks so
    /// each sphere holds a real prediction.
    fn seed_events(&mut self) -> Result<()> {
        self.heap.clear();
        for i in 0..self.spheres.len() {
            self.heap.schedule(Event::check(self.gtime, i)?);
        }
        self.settle()
    }

    /// Process checks that are due at the current clock.
    fn settle(&mut self) -> Result<()> {
        while let Some(e) = self.heap.peek() {
            if e.kind != EventKind::Check || e.time_f64() > self.gtime {
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    // ============ Event loop ============

    /// Process `events` events and return the batch statistics.
    ///
    /// Collision, transfer, check and stale counters as well as the exchanged
    /// momentum are reset afterwards; the total event count is cumulative.
    pub fn process(&mut self, events: usize) -> Result<CycleStats> {
        let start = self.gtime;
        for _ in 0..events {
            self.step()?;
        }
        let elapsed = self.gtime - start;

        let previous = self.energy;
        self.energy = self.kinetic_energy();
        self.energy_change = if previous > 0.0 {
            (previous - self.energy) / previous * 100.0
        } else {
            0.0
        };
        if elapsed > 0.0 {
            if self.energy > 0.0 {
                self.pressure =
                    1.0 + self.xmomentum / (2.0 * self.energy * self.n as f64 * elapsed);
            }
            self.collision_rate = self.counters.collisions as f64 / elapsed;
        }

        let stats = CycleStats {
            packing_fraction: self.packing_fraction(),
            pressure: self.pressure,
            energy: self.energy,
            energy_change: self.energy_change,
            collision_rate: self.collision_rate,
            elapsed,
            collisions: self.counters.collisions,
            transfers: self.counters.transfers,
            checks: self.counters.checks,
            stale: self.counters.stale,
            total_events: self.total_events,
        };
        debug!(
            "batch {}: pf={:.6} pressure={:.4} collisions={} transfers={} checks={} stale={}",
            self.cycles,
            stats.packing_fraction,
            stats.pressure,
            stats.collisions,
            stats.transfers,
            stats.checks,
            stats.stale
        );

        self.xmomentum = 0.0;
        self.counters = Counters::default();
        self.cycles += 1;
        Ok(stats)
    }

    /// Pop the earliest event and carry it out.
    pub fn step(&mut self) -> Result<Outcome> {
        let event = self.heap.pop().ok_or(Error::EventQueueExhausted)?;
        self.total_events += 1;
        let i = event.sphere;

        match event.kind {
            EventKind::Check => {
                self.counters.checks += 1;
                self.reschedule(i)?;
                Ok(Outcome::Check { sphere: i })
            }
            EventKind::Collision { partner: j, image } => {
                let symmetric = self
                    .heap
                    .get(j)
                    .is_some_and(|e| e.is_collision_with(i, event.time));
                if !symmetric {
                    trace!("stale collision {i}-{j} at t={}; rechecking {i}", event.time);
                    self.counters.stale += 1;
                    self.reschedule(i)?;
                    return Ok(Outcome::Stale { sphere: i, partner: j });
                }

                self.counters.collisions += 1;
                let time = event.time_f64();
                self.collide(i, j, time, &image)?;
                self.reschedule(i)?;
                // j keeps its half of the resolved collision until it is popped
                // as a check.
                if self.heap.get(j).is_some_and(|e| e.is_collision_with(i, event.time)) {
                    self.heap.invalidate(j);
                }
                Ok(Outcome::Collision { i, j, time })
            }
            EventKind::Transfer { axis, direction } => {
                self.counters.transfers += 1;
                let time = event.time_f64();
                self.transfer(i, time, axis, direction);
                self.reschedule(i)?;
                Ok(Outcome::Transfer {
                    sphere: i,
                    axis,
                    direction,
                    time,
                })
            }
        }
    }

    fn reschedule(&mut self, i: usize) -> Result<()> {
        let next = self.find_next_event(i)?;
        self.heap.schedule(next);
        Ok(())
    }

    /// Earliest of `i`'s next collision and next transfer. A collision that fires
    /// exactly when the transfer does loses to the transfer.
    fn find_next_event(&mut self, i: usize) -> Result<Event<D>> {
        let transfer = self.find_next_transfer(i);
        let transfer_time = transfer.map_or(f64::INFINITY, |(t, ..)| t);

        match self.find_next_collision(i) {
            Some(c) if c.time < transfer_time => {
                let event = Event::collision(c.time, i, c.partner, c.image)?;
                self.claim_partner(&event);
                Ok(event)
            }
            _ => match transfer {
                Some((time, axis, direction)) if time.is_finite() => {
                    Event::transfer(time, i, axis, direction)
                }
                _ => Event::check(f64::INFINITY, i),
            },
        }
    }

    /// Hand the partner its half of a new collision. The partner's previous
    /// collision partner, if any, is marked for recheck.
    fn claim_partner(&mut self, event: &Event<D>) {
        let Some(mirror) = event.mirrored() else {
            return;
        };
        let j = mirror.sphere;
        if let Some(previous) = self.heap.get(j).copied() {
            if !event.precedes(&previous) {
                warn!(
                    "sphere {j} claimed at t={} but already has an event at t={}",
                    event.time, previous.time
                );
            }
            if let Some(k) = previous.partner().filter(|&k| k != event.sphere) {
                trace!("sphere {k} loses its collision with {j}; marked for recheck");
                self.heap.invalidate(k);
            }
        }
        self.heap.schedule(mirror);
    }

    /// Time at which `i`'s center leaves its cell, with the crossed axis and face.
    fn find_next_transfer(&self, i: usize) -> Option<(f64, usize, Direction)> {
        let s = &self.spheres[i];
        let mut best: Option<(f64, usize, Direction)> = None;
        for k in 0..D {
            let (face, direction) = if s.v[k] < 0.0 {
                (self.cells.lower_face(s.cell[k]), Direction::Lower)
            } else if s.v[k] > 0.0 {
                (self.cells.lower_face(s.cell[k] + 1), Direction::Upper)
            } else {
                continue;
            };
            let dt = (face - s.x[k]) / s.v[k];
            if best.is_none_or(|(t, ..)| dt < t) {
                best = Some((dt, k, direction));
            }
        }
        best.map(|(dt, axis, direction)| {
            ((dt.max(0.0) + s.lutime).max(self.gtime), axis, direction)
        })
    }

    /// Earliest collision of `i` with a sphere of a neighboring cell that the
    /// partner would actually live to see.
    fn find_next_collision(&self, i: usize) -> Option<Prediction<D>> {
        let cell = self.spheres[i].cell;
        let mut best: Option<Prediction<D>> = None;
        for neighbor in self.cells.neighbors(&cell, NEIGHBOR_RADIUS) {
            for j in self.cells.occupants(&neighbor.cell) {
                if j == i {
                    continue;
                }
                let time = self.gtime + self.time_to_contact(i, j, &neighbor.image);
                if best.is_none_or(|b| time < b.time) && time < self.heap.time_of(j) {
                    best = Some(Prediction {
                        time,
                        partner: j,
                        image: neighbor.image,
                    });
                }
            }
        }
        best
    }

    /// Time from now until `i` touches the `image` replica of `j`, both radii growing.
    fn time_to_contact(&self, i: usize, j: usize, image: &[i32; D]) -> f64 {
        let (si, sj) = (&self.spheres[i], &self.spheres[j]);
        let xi = si.position_at(self.gtime);
        let xj = image_of(&sj.position_at(self.gtime), image);
        let xij = sub(&xi, &xj);
        let vij = sub(&si.v, &sj.v);
        let r = self.radius();
        let g = self.growth_rate;

        let a = norm_squared(&vij) - 4.0 * g * g;
        let b = dot(&vij, &xij) - 4.0 * r * g;
        let c = norm_squared(&xij) - 4.0 * r * r;
        if c < -OVERLAP_TOLERANCE * SIZE {
            warn!("spheres {i} and {j} overlap at t={}: squared gap {c:e}", self.gtime);
        }
        quadratic_root(a, b, c)
    }

    /// Elastic exchange of the normal velocity components plus the radial kick
    /// that lets the growing pair separate.
    fn collide(&mut self, i: usize, j: usize, time: f64, image: &[i32; D]) -> Result<()> {
        self.gtime = time;
        self.spheres[i].advance_to(time);
        self.spheres[j].advance_to(time);

        let xj = image_of(&self.spheres[j].x, image);
        let d = sub(&self.spheres[i].x, &xj);
        let distance = norm_squared(&d).sqrt();
        if distance <= f64::EPSILON {
            return Err(Error::MathError(format!(
                "degenerate contact normal between spheres {i} and {j}"
            )));
        }
        let contact = 2.0 * self.radius();
        let residual = distance * distance - contact * contact;
        if residual * residual > CONTACT_TOLERANCE {
            warn!("collision {i}-{j} at t={time}: centers {distance} apart, contact at {contact}");
        }

        let dhat = d.map(|c| c / distance);
        let (vi, vj) = (self.spheres[i].v, self.spheres[j].v);
        let exchange = dot(&vj, &dhat) - dot(&vi, &dhat) + self.separation_boost * self.growth_rate;
        self.spheres[i].v = add_scaled(&vi, &dhat, exchange);
        self.spheres[j].v = add_scaled(&vj, &dhat, -exchange);
        self.xmomentum += MASS * exchange * distance;
        Ok(())
    }

    /// Move `i` into the neighboring cell, wrapping across the box edge.
    fn transfer(&mut self, i: usize, time: f64, axis: usize, direction: Direction) {
        self.gtime = time;
        let ngrids = self.cells.ngrids();
        let from = self.spheres[i].cell;
        let raw = from[axis] as i64 + direction.step();
        let entered = raw.rem_euclid(ngrids as i64) as usize;
        let mut to = from;
        to[axis] = entered;
        let floor = self.cells.lower_face(entered);
        let ceiling = self.cells.upper_limit(entered);

        let sphere = &mut self.spheres[i];
        sphere.advance_to(time);
        match direction {
            // Enters through the lower face of the new cell.
            Direction::Upper => sphere.x[axis] = floor,
            Direction::Lower => {
                if raw < 0 {
                    sphere.x[axis] += SIZE;
                }
                sphere.x[axis] = sphere.x[axis].clamp(floor, ceiling);
            }
        }
        sphere.cell = to;

        if !self.cells.relocate(i, &from, &to) {
            warn!("sphere {i} was missing from cell {from:?} during transfer");
        }
    }

    // ============ Synchronization ============

    /// Bring every sphere to the global clock, fold the growth since the last
    /// synchronization into the radius and reset the clock.
    ///
    /// With `rescale`, velocities and growth rate are divided by `sqrt(2 M E)`
    /// (`E` the kinetic energy per sphere) and every prediction is recomputed.
    pub fn synchronize(&mut self, rescale: bool) -> Result<()> {
        let elapsed = self.gtime;
        for s in &mut self.spheres {
            s.advance_to(elapsed);
            s.lutime = 0.0;
        }
        self.heap.shift_times(elapsed);
        self.radius += elapsed * self.growth_rate;
        self.rtime += elapsed;
        self.gtime = 0.0;

        if rescale {
            let energy = self.kinetic_energy();
            if energy > 0.0 {
                let vavg = (2.0 * MASS * energy).sqrt();
                for s in &mut self.spheres {
                    s.v.iter_mut().for_each(|c| *c /= vavg);
                }
                self.growth_rate /= vavg;
                self.energy = self.kinetic_energy();
            } else {
                warn!("kinetic energy is zero; velocity rescale skipped");
            }
            self.seed_events()?;
        }
        debug!(
            "synchronized after {elapsed}: radius={} pf={:.6} growth={}",
            self.radius,
            self.packing_fraction(),
            self.growth_rate
        );
        Ok(())
    }

    // ============ Projections ============

    pub fn num_spheres(&self) -> usize {
        self.n
    }

    pub fn dimension(&self) -> usize {
        D
    }

    pub fn ngrids(&self) -> usize {
        self.cells.ngrids()
    }

    /// Current radius, including growth since the last synchronization.
    pub fn radius(&self) -> f64 {
        self.radius + self.gtime * self.growth_rate
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    pub fn separation_boost(&self) -> f64 {
        self.separation_boost
    }

    pub fn max_packing_fraction(&self) -> f64 {
        self.max_packing_fraction
    }

    /// Clock since the last synchronization.
    pub fn global_time(&self) -> f64 {
        self.gtime
    }

    /// Total simulated time.
    pub fn total_time(&self) -> f64 {
        self.rtime + self.gtime
    }

    pub fn packing_fraction(&self) -> f64 {
        self.n as f64 * unit_ball_volume::<D>() * self.radius().powi(D as i32) / SIZE.powi(D as i32)
    }

    /// Reduced pressure measured over the last batch.
    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    /// Kinetic energy per sphere measured at the end of the last batch.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Percent energy change over the last batch.
    pub fn energy_change(&self) -> f64 {
        self.energy_change
    }

    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Current kinetic energy per sphere.
    pub fn kinetic_energy(&self) -> f64 {
        if self.spheres.is_empty() {
            return 0.0;
        }
        self.spheres.iter().map(Sphere::kinetic_energy).sum::<f64>() / self.spheres.len() as f64
    }

    pub fn total_momentum(&self) -> [f64; D] {
        let mut p = [0.0_f64; D];
        for s in &self.spheres {
            for (pk, vk) in p.iter_mut().zip(s.v.iter()) {
                *pk += MASS * vk;
            }
        }
        p
    }

    pub fn spheres(&self) -> &[Sphere<D>] {
        &self.spheres
    }

    /// Positions at the global clock, wrapped into the box.
    pub fn positions(&self) -> Vec<[f64; D]> {
        self.spheres
            .iter()
            .map(|s| s.position_at(self.gtime).map(wrap))
            .collect()
    }

    pub fn velocities(&self) -> Vec<[f64; D]> {
        self.spheres.iter().map(|s| s.v).collect()
    }

    /// Sphere `i`'s pending event.
    pub fn pending_event(&self, i: usize) -> Option<&Event<D>> {
        self.heap.get(i)
    }

    pub fn pending_events(&self) -> usize {
        self.heap.len()
    }

    /// The event that fires next.
    pub fn next_event(&self) -> Option<&Event<D>> {
        self.heap.peek()
    }

    /// Cell the grid assigns to `position`.
    pub fn cell_of(&self, position: &[f64; D]) -> [usize; D] {
        self.cells.cell_of(position)
    }

    /// Deepest overlap among all pairs at the global clock (minimum image), or
    /// zero when no pair overlaps.
    pub fn max_overlap(&self) -> f64 {
        let contact = 2.0 * self.radius();
        let positions: Vec<[f64; D]> =
            self.spheres.iter().map(|s| s.position_at(self.gtime)).collect();
        let mut worst = 0.0_f64;
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let distance = periodic_distance_squared(&positions[i], &positions[j]).sqrt();
                worst = worst.max(contact - distance);
            }
        }
        worst
    }

    /// Write the configuration record file. See [`crate::io::write_configuration`].
    pub fn write_configuration(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::io::write_configuration(self, path)
    }

    #[cfg(test)]
    pub(crate) fn heap_mut(&mut self) -> &mut EventHeap<D> {
        &mut self.heap
    }
}

/// Cells per axis so that one cell spans a diameter at `max_packing_fraction`.
pub fn optimal_ngrids<const D: usize>(n: usize, max_packing_fraction: f64) -> usize {
    let max_radius = radius_for_packing_fraction::<D>(n, max_packing_fraction);
    (SIZE / (2.0 * max_radius)).floor() as usize
}

/// Smallest non-negative root of `a t^2 + 2 b t + c = 0`, or infinity.
///
/// `c >= 0` for non-overlapping pairs. A touching (`c <= 0`) pair that is still
/// approaching collides immediately.
pub fn quadratic_root(a: f64, b: f64, c: f64) -> f64 {
    if c <= 0.0 {
        return if b < 0.0 { 0.0 } else { f64::INFINITY };
    }
    let det = b * b - a * c;
    if det < -10.0 * f64::EPSILON {
        return f64::INFINITY;
    }
    let det = det.max(0.0);
    let t = if b < 0.0 {
        c / (-b + det.sqrt())
    } else if a < 0.0 {
        -(b + det.sqrt()) / a
    } else {
        f64::INFINITY
    };
    if t.is_nan() || t < 0.0 {
        f64::INFINITY
    } else {
        t
    }
}

/// Wrap a coordinate into `[0, SIZE)`.
#[inline]
fn wrap(x: f64) -> f64 {
    let w = x.rem_euclid(SIZE);
    if w >= SIZE {
        0.0
    } else {
        w
    }
}
