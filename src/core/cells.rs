//! Periodic cell index.
//!
//! The unit box is cut into `ngrids^D` cells. Each cell keeps a singly linked
//! list of the spheres it owns: `heads[cell]` is the first occupant and
//! `next[id]` the following one. Lists end at `end()`, the reserved slot one past
//! the last sphere id.

use crate::core::math::SIZE;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CellGrid<const D: usize> {
    ngrids: usize,
    heads: Vec<usize>,
    next: Vec<usize>,
}

/// A cell reached from a query cell, with the periodic image of its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor<const D: usize> {
    pub cell: [usize; D],
    /// Box-length offset to add to positions of spheres in `cell`.
    pub image: [i32; D],
}

impl<const D: usize> CellGrid<D> {
    /// Grid of `ngrids` cells per axis for spheres `0..spheres`.
    pub fn new(spheres: usize, ngrids: usize) -> Result<Self> {
        if D == 0 {
            return Err(Error::InvalidParam("dimension must be at least 1".into()));
        }
        if ngrids == 0 {
            return Err(Error::InvalidParam("cell grid needs at least one cell per axis".into()));
        }
        let cells = u32::try_from(D)
            .ok()
            .and_then(|d| ngrids.checked_pow(d))
            .ok_or_else(|| Error::InvalidParam(format!("{ngrids}^{D} cells overflow")))?;
        Ok(Self {
            ngrids,
            heads: vec![spheres; cells],
            next: vec![spheres; spheres + 1],
        })
    }

    /// List terminator.
    #[inline]
    pub fn end(&self) -> usize {
        self.next.len() - 1
    }

    pub fn ngrids(&self) -> usize {
        self.ngrids
    }

    /// Edge length of one cell.
    pub fn width(&self) -> f64 {
        SIZE / self.ngrids as f64
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.iter().all(|&h| h == self.end())
    }

    /// Cell owning `position`, wrapping coordinates into the box.
    pub fn cell_of(&self, position: &[f64; D]) -> [usize; D] {
        let n = self.ngrids as i64;
        let mut cell = [0usize; D];
        for (c, &x) in cell.iter_mut().zip(position.iter()) {
            *c = self.slab(x).rem_euclid(n) as usize;
        }
        cell
    }

    /// Unwrapped slab index of a coordinate along any axis.
    #[inline]
    fn slab(&self, x: f64) -> i64 {
        (x * self.ngrids as f64 / SIZE).floor() as i64
    }

    /// Smallest coordinate that `cell_of` places in slab `k`.
    ///
    /// `k * width()` can round into slab `k - 1` when `ngrids` is not a power
    /// of two, so the product is walked to the exact boundary.
    pub fn lower_face(&self, k: usize) -> f64 {
        let k = k as i64;
        let mut x = k as f64 * self.width();
        if self.slab(x) < k {
            while self.slab(x) < k {
                x = libm::nextafter(x, f64::INFINITY);
            }
        } else {
            loop {
                let below = libm::nextafter(x, f64::NEG_INFINITY);
                if self.slab(below) < k {
                    break;
                }
                x = below;
            }
        }
        x
    }

    /// Largest coordinate that `cell_of` places in slab `k`. For the last slab
    /// this is the largest float below the box length.
    pub fn upper_limit(&self, k: usize) -> f64 {
        libm::nextafter(self.lower_face(k + 1), f64::NEG_INFINITY)
    }

    #[inline]
    fn flat(&self, cell: &[usize; D]) -> usize {
        cell.iter()
            .rev()
            .fold(0usize, |acc, &c| acc * self.ngrids + c)
    }

    /// Push `id` onto the front of `cell`'s list.
    pub fn insert(&mut self, id: usize, cell: &[usize; D]) {
        let flat = self.flat(cell);
        self.next[id] = self.heads[flat];
        self.heads[flat] = id;
    }

    /// Splice `id` out of `cell`'s list. Returns false when it was not there.
    pub fn remove(&mut self, id: usize, cell: &[usize; D]) -> bool {
        let end = self.end();
        let flat = self.flat(cell);
        if self.heads[flat] == id {
            self.heads[flat] = self.next[id];
            self.next[id] = end;
            return true;
        }
        let mut prev = self.heads[flat];
        while prev != end {
            let cur = self.next[prev];
            if cur == id {
                self.next[prev] = self.next[id];
                self.next[id] = end;
                return true;
            }
            prev = cur;
        }
        false
    }

    /// Move `id` between cells.
    pub fn relocate(&mut self, id: usize, from: &[usize; D], to: &[usize; D]) -> bool {
        let removed = self.remove(id, from);
        self.insert(id, to);
        removed
    }

    /// Empty every list.
    pub fn clear(&mut self) {
        let end = self.end();
        self.heads.iter_mut().for_each(|h| *h = end);
        self.next.iter_mut().for_each(|n| *n = end);
    }

    /// Spheres owned by `cell`, in no particular order.
    pub fn occupants(&self, cell: &[usize; D]) -> Occupants<'_> {
        Occupants {
            next: &self.next,
            cur: self.heads[self.flat(cell)],
            end: self.end(),
        }
    }

    /// Every cell within `radius` cells of `center` along each axis, wrapping
    /// around the box, with the image offset of each.
    pub fn neighbors(&self, center: &[usize; D], radius: usize) -> NeighborCells<D> {
        NeighborCells::new(*center, self.ngrids, radius)
    }
}

/// Iterator over one cell's bin list.
#[derive(Debug, Clone)]
pub struct Occupants<'a> {
    next: &'a [usize],
    cur: usize,
    end: usize,
}

impl Iterator for Occupants<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.cur == self.end {
            return None;
        }
        let id = self.cur;
        self.cur = self.next[id];
        Some(id)
    }
}

/// Odometer over the `(2 * radius + 1)^D` hypercube of cells around a center.
///
/// Axis 0 turns fastest. Each yielded cell is wrapped into the grid and tagged
/// with the periodic image it came from.
#[derive(Debug, Clone)]
pub struct NeighborCells<const D: usize> {
    center: [usize; D],
    ngrids: i64,
    radius: i64,
    offset: [i64; D],
    done: bool,
}

impl<const D: usize> NeighborCells<D> {
    pub fn new(center: [usize; D], ngrids: usize, radius: usize) -> Self {
        let radius = radius as i64;
        Self {
            center,
            ngrids: ngrids as i64,
            radius,
            offset: [-radius; D],
            done: D == 0 || ngrids == 0,
        }
    }

    /// Restart from the first cell.
    pub fn reset(&mut self) {
        self.offset = [-self.radius; D];
        self.done = D == 0 || self.ngrids == 0;
    }

    fn advance(&mut self) {
        for k in 0..D {
            self.offset[k] += 1;
            if self.offset[k] <= self.radius {
                return;
            }
            self.offset[k] = -self.radius;
        }
        self.done = true;
    }
}

impl<const D: usize> Iterator for NeighborCells<D> {
    type Item = Neighbor<D>;

    fn next(&mut self) -> Option<Neighbor<D>> {
        if self.done {
            return None;
        }
        let mut cell = [0usize; D];
        let mut image = [0i32; D];
        for k in 0..D {
            let raw = self.center[k] as i64 + self.offset[k];
            cell[k] = raw.rem_euclid(self.ngrids) as usize;
            image[k] = raw.div_euclid(self.ngrids) as i32;
        }
        self.advance();
        Some(Neighbor { cell, image })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let side = (2 * self.radius + 1) as usize;
        // Odometer position, axis 0 least significant.
        let visited = self
            .offset
            .iter()
            .rev()
            .fold(0usize, |acc, &o| acc * side + (o + self.radius) as usize);
        let remaining = side.pow(D as u32) - visited;
        (remaining, Some(remaining))
    }
}

impl<const D: usize> ExactSizeIterator for NeighborCells<D> {}
