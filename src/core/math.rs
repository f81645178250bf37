//! Small fixed-size vector helpers shared by the engine.

use std::f64::consts::PI;

/// Side length of the periodic simulation box.
pub const SIZE: f64 = 1.0;

/// Sphere mass. All spheres are identical.
pub const MASS: f64 = 1.0;

#[inline]
pub fn dot<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn norm_squared<const D: usize>(a: &[f64; D]) -> f64 {
    dot(a, a)
}

#[inline]
pub fn sub<const D: usize>(a: &[f64; D], b: &[f64; D]) -> [f64; D] {
    let mut out = [0.0_f64; D];
    for (k, o) in out.iter_mut().enumerate() {
        *o = a[k] - b[k];
    }
    out
}

/// `a + s * b`
#[inline]
pub fn add_scaled<const D: usize>(a: &[f64; D], b: &[f64; D], s: f64) -> [f64; D] {
    let mut out = [0.0_f64; D];
    for (k, o) in out.iter_mut().enumerate() {
        *o = a[k] + s * b[k];
    }
    out
}

/// Translate `x` by a whole number of box lengths per axis.
#[inline]
pub fn image_of<const D: usize>(x: &[f64; D], image: &[i32; D]) -> [f64; D] {
    let mut out = *x;
    for (o, &m) in out.iter_mut().zip(image.iter()) {
        *o += f64::from(m) * SIZE;
    }
    out
}

/// Squared minimum-image distance between two points of the unit periodic box.
pub fn periodic_distance_squared<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    let mut d2 = 0.0;
    for k in 0..D {
        let mut d = a[k] - b[k];
        d -= SIZE * (d / SIZE).round();
        d2 += d * d;
    }
    d2
}

/// Volume of the unit-radius ball in `D` dimensions, `π^(D/2) / Γ(1 + D/2)`.
pub fn unit_ball_volume<const D: usize>() -> f64 {
    let half = D as f64 / 2.0;
    libm::pow(PI, half) / libm::tgamma(1.0 + half)
}

/// Radius of `n` equal spheres filling `packing_fraction` of the box.
pub fn radius_for_packing_fraction<const D: usize>(n: usize, packing_fraction: f64) -> f64 {
    let volume = SIZE.powi(D as i32);
    libm::pow(
        packing_fraction * volume / (n as f64 * unit_ball_volume::<D>()),
        1.0 / D as f64,
    )
}
