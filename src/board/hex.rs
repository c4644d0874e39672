//! Axial hex coordinates.
//!
//! Uses the axial (q, r) system with an implicit third cube coordinate
//! `s = -q - r`. Distances, neighbors, and straight lines are all computed
//! in cube space.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Cube-space direction offsets, in a fixed clockwise order starting east.
const DIRECTIONS: [Hex; 6] = [
    Hex { q: 1, r: 0 },
    Hex { q: 1, r: -1 },
    Hex { q: 0, r: -1 },
    Hex { q: -1, r: 0 },
    Hex { q: -1, r: 1 },
    Hex { q: 0, r: 1 },
];

/// A cell coordinate on the hex grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hex {
    pub q: i32,
    pub r: i32,
}

impl Hex {
    /// The map center.
    pub const ORIGIN: Hex = Hex { q: 0, r: 0 };

    pub const fn new(q: i32, r: i32) -> Self {
        Hex { q, r }
    }

    /// The implicit third cube coordinate.
    #[inline]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    /// Number of steps between two cells on an open grid.
    #[inline]
    ///
    /// Computed in `i64` so arbitrary coordinates never overflow; saturates
    /// at `u32::MAX`.
    pub fn distance(self, other: Hex) -> u32 {
        let (aq, ar) = (self.q as i64, self.r as i64);
        let (bq, br) = (other.q as i64, other.r as i64);
        let dq = (aq - bq).abs();
        let dr = (ar - br).abs();
        let ds = ((-aq - ar) - (-bq - br)).abs();
        u32::try_from(dq.max(dr).max(ds)).unwrap_or(u32::MAX)
    }

    /// The six adjacent cells, in a fixed order.
    pub fn neighbors(self) -> [Hex; 6] {
        DIRECTIONS.map(|d| self + d)
    }

    /// Returns the cells on the straight line from `self` to `other`,
    /// both endpoints included.
    ///
    /// Endpoints are nudged by a small epsilon so that lines running exactly
    /// along a cell edge resolve consistently to one side.
    pub fn line_to(self, other: Hex) -> Vec<Hex> {
        let n = self.distance(other);
        if n == 0 {
            return vec![self];
        }

        const EPS: f64 = 1e-6;
        let (aq, ar, as_) = (self.q as f64 + EPS, self.r as f64 + EPS, self.s() as f64 - 2.0 * EPS);
        let (bq, br, bs) = (other.q as f64 + EPS, other.r as f64 + EPS, other.s() as f64 - 2.0 * EPS);

        let mut line = Vec::with_capacity(n as usize + 1);
        for i in 0..=n {
            let t = i as f64 / n as f64;
            line.push(cube_round(
                aq + (bq - aq) * t,
                ar + (br - ar) * t,
                as_ + (bs - as_) * t,
            ));
        }
        line
    }
}

/// Rounds fractional cube coordinates to the nearest cell.
fn cube_round(q: f64, r: f64, s: f64) -> Hex {
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let dq = (rq - q).abs();
    let dr = (rr - r).abs();
    let ds = (rs - s).abs();

    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    Hex::new(rq as i32, rr as i32)
}

impl Add for Hex {
    type Output = Hex;

    fn add(self, rhs: Hex) -> Hex {
        Hex::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl Sub for Hex {
    type Output = Hex;

    fn sub(self, rhs: Hex) -> Hex {
        Hex::new(self.q - rhs.q, self.r - rhs.r)
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}
