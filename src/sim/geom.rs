//! Axis-aligned boxes and grid directions
//!
//! World space uses screen conventions: +x is right, +y is down.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Inset used when sampling a box's far corners, so a box flush against a
/// tile edge does not count as touching the next tile.
const CORNER_INSET: f32 = 0.001;

/// One of the four grid headings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector for this heading
    #[inline]
    pub fn vec(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    #[inline]
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Dominant axis of `v`; `None` for a zero vector
    pub fn from_vec(v: Vec2) -> Option<Self> {
        if v.x == 0.0 && v.y == 0.0 {
            return None;
        }
        Some(if v.x.abs() >= v.y.abs() {
            if v.x > 0.0 { Direction::Right } else { Direction::Left }
        } else if v.y > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        })
    }

    /// Neighbouring tile coordinate, `None` on underflow
    pub fn step(self, tx: usize, ty: usize) -> Option<(usize, usize)> {
        match self {
            Direction::Up => ty.checked_sub(1).map(|y| (tx, y)),
            Direction::Down => Some((tx, ty + 1)),
            Direction::Left => tx.checked_sub(1).map(|x| (x, ty)),
            Direction::Right => Some((tx + 1, ty)),
        }
    }
}

/// Axis-aligned box: top-left `pos` plus `size`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self { pos, size }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            pos: center - size * 0.5,
            size,
        }
    }

    /// Smallest box containing every point; zero box at origin when empty
    pub fn bounding(points: &[Vec2]) -> Self {
        let Some(first) = points.first() else {
            return Self::new(Vec2::ZERO, Vec2::ZERO);
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        Self::new(min, max - min)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.pos + self.size
    }

    /// Strict overlap; boxes that only share an edge do not overlap
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.pos.x < other.pos.x + other.size.x
            && other.pos.x < self.pos.x + self.size.x
            && self.pos.y < other.pos.y + other.size.y
            && other.pos.y < self.pos.y + self.size.y
    }

    pub fn contains(&self, p: Vec2) -> bool {
        let max = self.max();
        p.x >= self.pos.x && p.y >= self.pos.y && p.x < max.x && p.y < max.y
    }

    /// Four corner sample points (far corners inset by a hair)
    pub fn corners(&self) -> [Vec2; 4] {
        let max = self.max() - Vec2::splat(CORNER_INSET);
        [
            self.pos,
            Vec2::new(max.x, self.pos.y),
            Vec2::new(self.pos.x, max.y),
            max,
        ]
    }

    #[inline]
    pub fn translated(&self, delta: Vec2) -> Rect {
        Rect::new(self.pos + delta, self.size)
    }
}

/// Even-odd point-in-polygon test over a closed outline
pub fn point_in_polygon(p: Vec2, outline: &[Vec2]) -> bool {
    let mut inside = false;
    let mut j = outline.len().wrapping_sub(1);
    for (i, &a) in outline.iter().enumerate() {
        let b = outline[j];
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}
