//! Static tile grid and road band registry
//!
//! Roads are laid out as 2-tile bands spanning the whole map. Each band's
//! index among the sorted band starts of its axis fixes its one-way flow:
//! even vertical bands run down, odd ones up; even horizontal bands run left,
//! odd ones right.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geom::{Direction, Rect};
use crate::consts::{ROAD_WIDTH, TILE_SIZE};
use crate::world_to_tile;

/// Kind of a single map cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Road,
    Grass,
    House,
    Garden,
    Driveway,
    Footpath,
    Water,
}

impl TileKind {
    /// Single character used by debug dumps
    pub fn glyph(self) -> char {
        match self {
            TileKind::Road => '.',
            TileKind::Grass => ',',
            TileKind::House => '#',
            TileKind::Garden => '"',
            TileKind::Driveway => '=',
            TileKind::Footpath => ':',
            TileKind::Water => '~',
        }
    }
}

/// The round's tile grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMap {
    width: usize,
    height: usize,
    tiles: Vec<TileKind>,
    /// Sorted start columns of vertical road bands
    vertical_bands: Vec<usize>,
    /// Sorted start rows of horizontal road bands
    horizontal_bands: Vec<usize>,
}

impl GridMap {
    /// An all-grass map with no roads
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            tiles: vec![TileKind::Grass; width * height],
            vertical_bands: Vec::new(),
            horizontal_bands: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Map extent in world units
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32) * TILE_SIZE
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(Vec2::ZERO, self.world_size())
    }

    pub fn get(&self, tx: usize, ty: usize) -> Option<TileKind> {
        if tx < self.width && ty < self.height {
            Some(self.tiles[ty * self.width + tx])
        } else {
            None
        }
    }

    pub fn is(&self, tx: usize, ty: usize, kind: TileKind) -> bool {
        self.get(tx, ty) == Some(kind)
    }

    /// Overwrite a tile; out-of-range writes are ignored
    pub fn set(&mut self, tx: usize, ty: usize, kind: TileKind) {
        if tx < self.width && ty < self.height {
            self.tiles[ty * self.width + tx] = kind;
        }
    }

    /// Tile coordinate under a world point, if on the map
    pub fn tile_at(&self, p: Vec2) -> Option<(usize, usize)> {
        world_to_tile(p).filter(|&(tx, ty)| tx < self.width && ty < self.height)
    }

    pub fn kind_at(&self, p: Vec2) -> Option<TileKind> {
        self.tile_at(p).and_then(|(tx, ty)| self.get(tx, ty))
    }

    /// Neighbouring tile in `dir`, if on the map
    pub fn neighbor(&self, tx: usize, ty: usize, dir: Direction) -> Option<(usize, usize)> {
        dir.step(tx, ty).filter(|&(x, y)| x < self.width && y < self.height)
    }

    /// Whether the next `count` tiles along `dir` are all road
    pub fn road_ahead(&self, tx: usize, ty: usize, dir: Direction, count: usize) -> bool {
        let mut cur = (tx, ty);
        for _ in 0..count {
            match self.neighbor(cur.0, cur.1, dir) {
                Some(next) if self.is(next.0, next.1, TileKind::Road) => cur = next,
                _ => return false,
            }
        }
        true
    }

    /// Paint a full-height vertical road band starting at column `x`
    pub fn add_vertical_band(&mut self, x: usize) {
        for ty in 0..self.height {
            for tx in x..(x + ROAD_WIDTH).min(self.width) {
                self.set(tx, ty, TileKind::Road);
            }
        }
        if let Err(i) = self.vertical_bands.binary_search(&x) {
            self.vertical_bands.insert(i, x);
        }
    }

    /// Paint a full-width horizontal road band starting at row `y`
    pub fn add_horizontal_band(&mut self, y: usize) {
        for tx in 0..self.width {
            for ty in y..(y + ROAD_WIDTH).min(self.height) {
                self.set(tx, ty, TileKind::Road);
            }
        }
        if let Err(i) = self.horizontal_bands.binary_search(&y) {
            self.horizontal_bands.insert(i, y);
        }
    }

    pub fn vertical_bands(&self) -> &[usize] {
        &self.vertical_bands
    }

    pub fn horizontal_bands(&self) -> &[usize] {
        &self.horizontal_bands
    }

    /// Index of the vertical band covering column `tx`
    pub fn vertical_band_index(&self, tx: usize) -> Option<usize> {
        self.vertical_bands
            .iter()
            .position(|&start| tx >= start && tx < start + ROAD_WIDTH)
    }

    /// Index of the horizontal band covering row `ty`
    pub fn horizontal_band_index(&self, ty: usize) -> Option<usize> {
        self.horizontal_bands
            .iter()
            .position(|&start| ty >= start && ty < start + ROAD_WIDTH)
    }

    /// Allowed traffic headings on a road tile (at most one per axis)
    pub fn flow_options(&self, tx: usize, ty: usize) -> Vec<Direction> {
        let mut options = Vec::with_capacity(2);
        if !self.is(tx, ty, TileKind::Road) {
            return options;
        }
        if let Some(i) = self.vertical_band_index(tx) {
            options.push(if i % 2 == 0 { Direction::Down } else { Direction::Up });
        }
        if let Some(i) = self.horizontal_band_index(ty) {
            options.push(if i % 2 == 0 { Direction::Left } else { Direction::Right });
        }
        options
    }

    /// Coordinates of every tile of `kind`, row-major
    pub fn tiles_of(&self, kind: TileKind) -> Vec<(usize, usize)> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == kind)
            .map(|(i, _)| (i % self.width, i / self.width))
            .collect()
    }

    pub fn count(&self, kind: TileKind) -> usize {
        self.tiles.iter().filter(|k| **k == kind).count()
    }

    /// Number of road tiles connected to `start` (0 if `start` is not road)
    pub fn reachable_roads(&self, start: (usize, usize)) -> usize {
        if !self.is(start.0, start.1, TileKind::Road) {
            return 0;
        }
        let mut seen = vec![false; self.tiles.len()];
        let mut queue = VecDeque::from([start]);
        seen[start.1 * self.width + start.0] = true;
        let mut count = 0;
        while let Some((tx, ty)) = queue.pop_front() {
            count += 1;
            for dir in Direction::ALL {
                if let Some((nx, ny)) = self.neighbor(tx, ty, dir) {
                    let idx = ny * self.width + nx;
                    if !seen[idx] && self.tiles[idx] == TileKind::Road {
                        seen[idx] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }
        }
        count
    }

    /// Text dump, one row per line
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.tiles.chunks(self.width) {
            out.extend(row.iter().map(|k| k.glyph()));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossroads() -> GridMap {
        let mut map = GridMap::new(12, 12);
        map.add_vertical_band(0);
        map.add_vertical_band(5);
        map.add_vertical_band(10);
        map.add_horizontal_band(0);
        map.add_horizontal_band(10);
        map
    }

    #[test]
    fn test_bands_paint_roads_and_stay_sorted() {
        let map = crossroads();
        assert_eq!(map.vertical_bands(), &[0, 5, 10]);
        assert!(map.is(6, 4, TileKind::Road));
        assert!(map.is(3, 4, TileKind::Grass));
        assert_eq!(map.vertical_band_index(6), Some(1));
        assert_eq!(map.vertical_band_index(7), None);
    }

    #[test]
    fn test_flow_follows_band_parity() {
        let map = crossroads();
        assert_eq!(map.flow_options(0, 5), vec![Direction::Down]);
        assert_eq!(map.flow_options(5, 5), vec![Direction::Up]);
        assert_eq!(map.flow_options(3, 11), vec![Direction::Right]);
        // Intersection offers both axes
        assert_eq!(map.flow_options(5, 0), vec![Direction::Up, Direction::Left]);
        assert!(map.flow_options(3, 4).is_empty());
    }

    #[test]
    fn test_road_ahead_and_reachability() {
        let map = crossroads();
        assert!(map.road_ahead(5, 5, Direction::Up, 2));
        assert!(!map.road_ahead(5, 5, Direction::Left, 1));
        assert!(!map.road_ahead(0, 1, Direction::Up, 2));
        assert_eq!(map.reachable_roads((0, 0)), map.count(TileKind::Road));
        assert_eq!(map.reachable_roads((3, 4)), 0);
    }

    #[test]
    fn test_tile_at_respects_bounds() {
        let map = crossroads();
        assert_eq!(map.tile_at(Vec2::new(33.0, 1.0)), Some((1, 0)));
        assert_eq!(map.tile_at(map.world_size() + Vec2::ONE), None);
        assert_eq!(map.to_ascii().lines().count(), 12);
    }
}
