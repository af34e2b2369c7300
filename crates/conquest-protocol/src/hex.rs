use std::fmt;

use serde::{Deserialize, Serialize};

/// Axial hex coordinates (q, r). The implicit cube coordinate is `s = -q - r`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hex {
    pub q: i32,
    pub r: i32,
}

impl Hex {
    pub const ORIGIN: Hex = Hex { q: 0, r: 0 };

    pub const DIRECTIONS: [Hex; 6] = [
        Hex { q: 1, r: 0 },  // East
        Hex { q: 1, r: -1 }, // Northeast
        Hex { q: 0, r: -1 }, // Northwest
        Hex { q: -1, r: 0 }, // West
        Hex { q: -1, r: 1 }, // Southwest
        Hex { q: 0, r: 1 },  // Southeast
    ];

    #[inline]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    #[inline]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    pub fn neighbors(self) -> impl Iterator<Item = Hex> {
        Self::DIRECTIONS.into_iter().map(move |d| self + d)
    }

    #[inline]
    pub fn distance(self, other: Hex) -> i32 {
        ((self.q - other.q).abs() + (self.r - other.r).abs() + (self.s() - other.s()).abs()) / 2
    }

    #[inline]
    pub fn is_adjacent(self, other: Hex) -> bool {
        self.distance(other) == 1
    }

    /// All hexes with distance `<= radius`, in a deterministic order (column by column).
    pub fn ring_inclusive(self, radius: i32) -> impl Iterator<Item = Hex> {
        SpiralIter::new(self, radius)
    }
}

impl std::ops::Add for Hex {
    type Output = Hex;

    fn add(self, other: Hex) -> Hex {
        Hex {
            q: self.q + other.q,
            r: self.r + other.r,
        }
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

struct SpiralIter {
    center: Hex,
    radius: i32,
    dq: i32,
    dr: i32,
    dr_max: i32,
}

impl SpiralIter {
    fn new(center: Hex, radius: i32) -> Self {
        let radius = radius.max(0);
        let dq = -radius;
        let (dr_min, dr_max) = dr_bounds(dq, radius);
        Self {
            center,
            radius,
            dq,
            dr: dr_min,
            dr_max,
        }
    }
}

impl Iterator for SpiralIter {
    type Item = Hex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.dq > self.radius {
            return None;
        }

        let out = Hex {
            q: self.center.q + self.dq,
            r: self.center.r + self.dr,
        };

        self.dr += 1;
        if self.dr > self.dr_max {
            self.dq += 1;
            let (dr_min, dr_max) = dr_bounds(self.dq, self.radius);
            self.dr = dr_min;
            self.dr_max = dr_max;
        }

        Some(out)
    }
}

#[inline]
fn dr_bounds(dq: i32, radius: i32) -> (i32, i32) {
    // Cube constraint on the axial delta: max(|dq|, |dr|, |dq + dr|) <= radius
    let dr_min = (-radius).max(-dq - radius);
    let dr_max = radius.min(-dq + radius);
    (dr_min, dr_max)
}
