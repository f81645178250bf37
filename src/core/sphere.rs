use crate::core::math::{add_scaled, norm_squared, MASS};
use crate::error::{Error, Result};

/// A hard sphere in the periodic unit box.
///
/// `x` and `v` are valid at `lutime`; in between events the trajectory is
/// `x + v * (t - lutime)`. `cell` is the grid cell that currently owns the
/// sphere and only changes on transfers.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere<const D: usize> {
    /// Stable identifier in `0..N`.
    pub id: usize,
    /// Position at `lutime`.
    pub x: [f64; D],
    /// Velocity.
    pub v: [f64; D],
    /// Owning cell coordinate.
    pub cell: [usize; D],
    /// Local update time: the global clock value at which `x` was last synchronized.
    pub lutime: f64,
}

impl<const D: usize> Sphere<D> {
    /// Create a new sphere after validating that position and velocity are finite.
    pub fn new(id: usize, x: [f64; D], v: [f64; D], cell: [usize; D], lutime: f64) -> Result<Self> {
        if !x.iter().all(|c| c.is_finite()) {
            return Err(Error::InvalidParam(format!("sphere {id}: position must be finite")));
        }
        if !v.iter().all(|c| c.is_finite()) {
            return Err(Error::InvalidParam(format!("sphere {id}: velocity must be finite")));
        }
        Ok(Self { id, x, v, cell, lutime })
    }

    /// Position at global clock `t` along the current free flight.
    #[inline]
    pub fn position_at(&self, t: f64) -> [f64; D] {
        add_scaled(&self.x, &self.v, t - self.lutime)
    }

    /// Consume the free flight up to `t`.
    #[inline]
    pub fn advance_to(&mut self, t: f64) {
        self.x = self.position_at(t);
        self.lutime = t;
    }

    /// Kinetic energy `1/2 M |v|^2`.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * MASS * norm_squared(&self.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_sphere_ok() -> Result<()> {
        let s = Sphere::new(3, [0.1, 0.2], [1.0, -2.0], [0, 1], 0.0)?;
        assert_eq!(s.id, 3);
        assert_eq!(s.cell, [0, 1]);
        Ok(())
    }

    #[test]
    fn non_finite_rejected() {
        let err = Sphere::new(0, [f64::NAN, 0.0], [0.0, 0.0], [0, 0], 0.0).unwrap_err();
        assert!(err.to_string().contains("position"));
        let err = Sphere::new(0, [0.0, 0.0], [f64::INFINITY, 0.0], [0, 0], 0.0).unwrap_err();
        assert!(err.to_string().contains("velocity"));
    }

    #[test]
    fn free_flight() -> Result<()> {
        let mut s = Sphere::new(0, [0.5, 0.5, 0.5], [1.0, 0.0, -0.5], [0, 0, 0], 1.0)?;
        let p = s.position_at(1.2);
        assert_relative_eq!(p[0], 0.7, epsilon = 1e-12);
        assert_relative_eq!(p[2], 0.4, epsilon = 1e-12);

        s.advance_to(1.2);
        assert_eq!(s.lutime, 1.2);
        // Advancing to the same time is a no-op.
        let before = s.x;
        s.advance_to(1.2);
        assert_eq!(s.x, before);
        Ok(())
    }

    #[test]
    fn kinetic_energy_computed() -> Result<()> {
        let s = Sphere::new(7, [0.0; 3], [3.0, 4.0, 0.0], [0; 3], 0.0)?;
        assert_relative_eq!(s.kinetic_energy(), 12.5, epsilon = 1e-12);
        Ok(())
    }
}
