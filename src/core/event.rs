use crate::error::{Error, Result};
use ordered_float::NotNan;

/// Which face of a cell a sphere center is crossing along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Crossing toward decreasing coordinate.
    Lower,
    /// Crossing toward increasing coordinate.
    Upper,
}

impl Direction {
    /// Cell index step along the crossed axis.
    #[inline]
    pub fn step(self) -> i64 {
        match self {
            Direction::Lower => -1,
            Direction::Upper => 1,
        }
    }
}

/// What a pending event does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind<const D: usize> {
    /// Contact with `partner`; `image` is the periodic replica of the partner
    /// (per-axis box-length offset) that takes part.
    Collision { partner: usize, image: [i32; D] },
    /// The sphere center crosses a face of its current cell.
    Transfer { axis: usize, direction: Direction },
    /// The cached prediction is stale and must be recomputed.
    Check,
}

/// A sphere's single pending event.
///
/// Ordering is by `time` alone; equal times are not broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event<const D: usize> {
    pub time: NotNan<f64>,
    pub sphere: usize,
    pub kind: EventKind<D>,
}

impl<const D: usize> Event<D> {
    /// Create a new event. Infinite times are allowed (a check that never fires on
    /// its own); NaN is rejected.
    pub fn new(time: f64, sphere: usize, kind: EventKind<D>) -> Result<Self> {
        let time = NotNan::new(time)
            .map_err(|_| Error::InvalidParam("event time cannot be NaN".into()))?;
        Ok(Self { time, sphere, kind })
    }

    pub fn check(time: f64, sphere: usize) -> Result<Self> {
        Self::new(time, sphere, EventKind::Check)
    }

    pub fn collision(time: f64, sphere: usize, partner: usize, image: [i32; D]) -> Result<Self> {
        Self::new(time, sphere, EventKind::Collision { partner, image })
    }

    pub fn transfer(time: f64, sphere: usize, axis: usize, direction: Direction) -> Result<Self> {
        Self::new(time, sphere, EventKind::Transfer { axis, direction })
    }

    /// Returns the raw f64 event time.
    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }

    /// The collision partner, if this is a collision.
    #[inline]
    pub fn partner(&self) -> Option<usize> {
        match self.kind {
            EventKind::Collision { partner, .. } => Some(partner),
            _ => None,
        }
    }

    /// True when this is the collision with `other` scheduled at `time`.
    #[inline]
    pub fn is_collision_with(&self, other: usize, time: NotNan<f64>) -> bool {
        self.partner() == Some(other) && self.time == time
    }

    /// The partner's view of this collision: same time, roles swapped, image negated.
    pub fn mirrored(&self) -> Option<Self> {
        match self.kind {
            EventKind::Collision { partner, image } => Some(Self {
                time: self.time,
                sphere: partner,
                kind: EventKind::Collision {
                    partner: self.sphere,
                    image: image.map(|m| -m),
                },
            }),
            _ => None,
        }
    }

    /// Strictly earlier than `other`.
    #[inline]
    pub fn precedes(&self, other: &Self) -> bool {
        self.time < other.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_rejects_nan_time() {
        let err = Event::<3>::check(f64::NAN, 1).unwrap_err();
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn infinite_check_is_allowed() -> Result<()> {
        let e = Event::<2>::check(f64::INFINITY, 0)?;
        assert!(e.time_f64().is_infinite());
        Ok(())
    }

    #[test]
    fn ordering_by_time() -> Result<()> {
        let e1 = Event::<3>::collision(1.0, 0, 1, [0, 0, 0])?;
        let e2 = Event::<3>::transfer(2.0, 0, 1, Direction::Upper)?;
        assert!(e1.precedes(&e2));
        assert!(!e2.precedes(&e1));
        Ok(())
    }

    #[test]
    fn equal_times_do_not_precede() -> Result<()> {
        let a = Event::<2>::collision(5.0, 0, 1, [0, 0])?;
        let b = Event::<2>::transfer(5.0, 2, 0, Direction::Lower)?;
        assert!(!a.precedes(&b));
        assert!(!b.precedes(&a));
        Ok(())
    }

    #[test]
    fn mirrored_collision_swaps_roles() -> Result<()> {
        let e = Event::<3>::collision(0.25, 4, 9, [1, 0, -1])?;
        let m = e.mirrored().expect("collision mirrors");
        assert_eq!(m.sphere, 9);
        assert_eq!(m.kind, EventKind::Collision { partner: 4, image: [-1, 0, 1] });
        assert!(m.is_collision_with(4, e.time));
        assert!(Event::<3>::check(1.0, 0)?.mirrored().is_none());
        Ok(())
    }
}
