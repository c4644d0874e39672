//! Hexagon-shaped battle map.
//!
//! Cells are stored densely in a `(2 * radius + 1)^2` grid addressed by
//! axial offset; slots outside the hexagon are never handed out. The map is
//! immutable once a match starts and is shared by every search node.

use serde::{Deserialize, Serialize};

use super::hex::Hex;

/// Static contents of a map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    Empty,
    Wall,
}

/// A hexagon of cells centered on the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexMap {
    radius: i32,
    width: usize,
    cells: Vec<Cell>,
    /// Every valid coordinate, ordered by r then q.
    coords: Vec<Hex>,
}

impl HexMap {
    /// Creates an empty (wall-free) map of the given radius.
    pub fn new(radius: u32) -> Self {
        let radius = radius as i32;
        let width = (2 * radius + 1) as usize;
        let mut coords = Vec::new();
        for r in -radius..=radius {
            for q in -radius..=radius {
                let h = Hex::new(q, r);
                if h.distance(Hex::ORIGIN) as i32 <= radius {
                    coords.push(h);
                }
            }
        }
        HexMap {
            radius,
            width,
            cells: vec![Cell::Empty; width * width],
            coords,
        }
    }

    /// Map radius: the distance from the center to the outermost ring.
    pub fn radius(&self) -> u32 {
        self.radius as u32
    }

    /// Size of the dense index space returned by `index_of`.
    pub fn index_len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the coordinate lies on the map.
    #[inline]
    pub fn contains(&self, hex: Hex) -> bool {
        let r = self.radius as i64;
        let (q, s) = (hex.q as i64, hex.r as i64);
        q.abs() <= r && s.abs() <= r && (q + s).abs() <= r
    }

    /// Dense index of an on-map coordinate.
    #[inline]
    pub fn index_of(&self, hex: Hex) -> Option<usize> {
        if !self.contains(hex) {
            return None;
        }
        let col = (hex.q + self.radius) as usize;
        let row = (hex.r + self.radius) as usize;
        Some(row * self.width + col)
    }

    /// Inverse of `index_of`.
    #[inline]
    pub fn hex_at(&self, index: usize) -> Hex {
        let row = (index / self.width) as i32;
        let col = (index % self.width) as i32;
        Hex::new(col - self.radius, row - self.radius)
    }

    /// Cell contents, or `None` off the map.
    pub fn cell(&self, hex: Hex) -> Option<Cell> {
        self.index_of(hex).map(|i| self.cells[i])
    }

    /// Returns true for walls. Off-map coordinates count as walls.
    #[inline]
    pub fn is_wall(&self, hex: Hex) -> bool {
        !matches!(self.cell(hex), Some(Cell::Empty))
    }

    /// Marks a cell as a wall. Returns false if the coordinate is off the map.
    pub fn set_wall(&mut self, hex: Hex) -> bool {
        match self.index_of(hex) {
            Some(i) => {
                self.cells[i] = Cell::Wall;
                true
            }
            None => false,
        }
    }

    /// All on-map coordinates in a fixed order.
    pub fn cells(&self) -> &[Hex] {
        &self.coords
    }

    /// Plain axial distance, ignoring walls and mobs.
    #[inline]
    pub fn axial_distance(&self, a: Hex, b: Hex) -> u32 {
        a.distance(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_count_matches_hexagon_formula() {
        for radius in 0..5u32 {
            let map = HexMap::new(radius);
            let r = radius as usize;
            assert_eq!(map.cells().len(), 3 * r * r + 3 * r + 1);
        }
    }

    #[test]
    fn index_roundtrip() {
        let map = HexMap::new(3);
        for &h in map.cells() {
            let i = map.index_of(h).unwrap();
            assert_eq!(map.hex_at(i), h);
        }
        assert_eq!(map.index_of(Hex::new(4, 0)), None);
        assert_eq!(map.index_of(Hex::new(3, 3)), None);
    }

    #[test]
    fn walls_and_off_map() {
        let mut map = HexMap::new(2);
        assert!(!map.is_wall(Hex::ORIGIN));
        assert!(map.set_wall(Hex::new(1, 0)));
        assert!(map.is_wall(Hex::new(1, 0)));
        assert_eq!(map.cell(Hex::new(1, 0)), Some(Cell::Wall));
        assert!(!map.set_wall(Hex::new(5, 0)));
        assert!(map.is_wall(Hex::new(5, 0)));
        assert_eq!(map.cell(Hex::new(5, 0)), None);
    }

    #[test]
    fn contains_rejects_extreme_coordinates() {
        let map = HexMap::new(3);
        assert!(map.contains(Hex::new(3, -3)));
        assert!(!map.contains(Hex::new(3, 1)));
        for hex in [
            Hex::new(i32::MAX, i32::MAX),
            Hex::new(i32::MIN, i32::MIN),
            Hex::new(i32::MIN, i32::MAX),
            Hex::new(i32::MAX, i32::MIN),
        ] {
            assert!(!map.contains(hex), "{hex}");
            assert_eq!(map.index_of(hex), None);
        }
    }
}
