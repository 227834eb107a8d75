//! Movement and collision resolution
//!
//! Boxes move one axis at a time so they slide along walls, and in sub-steps
//! of at most half a tile so a long frame cannot carry a box through a thin
//! wall.

use glam::Vec2;

use super::geom::Rect;
use super::map::{GridMap, TileKind};
use crate::consts::TILE_SIZE;

/// Tiles the courier may stand on
pub const PLAYER_SURFACE: &[TileKind] = &[TileKind::Road];

/// Longest single sub-step
const MAX_STEP: f32 = TILE_SIZE * 0.5;

/// Outcome of a resolved move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    /// Final box
    pub rect: Rect,
    /// Horizontal motion was cut short
    pub blocked_x: bool,
    /// Vertical motion was cut short
    pub blocked_y: bool,
}

impl MoveResult {
    pub fn blocked(&self) -> bool {
        self.blocked_x || self.blocked_y
    }
}

/// All four corners on an allowed tile kind
pub fn is_walkable(map: &GridMap, rect: &Rect, allowed: &[TileKind]) -> bool {
    rect.corners()
        .iter()
        .all(|&c| map.kind_at(c).is_some_and(|kind| allowed.contains(&kind)))
}

pub fn hits_obstacle(rect: &Rect, obstacles: &[Rect]) -> bool {
    obstacles.iter().any(|o| o.overlaps(rect))
}

/// Walkable and clear of every obstacle
pub fn can_occupy(map: &GridMap, obstacles: &[Rect], rect: &Rect, allowed: &[TileKind]) -> bool {
    is_walkable(map, rect, allowed) && !hits_obstacle(rect, obstacles)
}

/// Move `rect` by `delta`, committing each axis only where the result is legal
pub fn move_box(
    map: &GridMap,
    obstacles: &[Rect],
    rect: Rect,
    delta: Vec2,
    allowed: &[TileKind],
) -> MoveResult {
    let mut result = MoveResult {
        rect,
        blocked_x: false,
        blocked_y: false,
    };
    if !delta.is_finite() || delta == Vec2::ZERO {
        return result;
    }

    let steps = (delta.abs().max_element() / MAX_STEP).ceil().max(1.0) as u32;
    let step = delta / steps as f32;
    for _ in 0..steps {
        if step.x != 0.0 && !result.blocked_x {
            let next = result.rect.translated(Vec2::new(step.x, 0.0));
            if can_occupy(map, obstacles, &next, allowed) {
                result.rect = next;
            } else {
                result.blocked_x = true;
            }
        }
        if step.y != 0.0 && !result.blocked_y {
            let next = result.rect.translated(Vec2::new(0.0, step.y));
            if can_occupy(map, obstacles, &next, allowed) {
                result.rect = next;
            } else {
                result.blocked_y = true;
            }
        }
    }
    result
}
