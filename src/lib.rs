//! Route Rush - a top-down arcade delivery game
//!
//! Core modules:
//! - `sim`: Round simulation (city generation, traffic, hazards, tick loop)
//! - `tuning`: Data-driven game balance and city layout
//! - `settings`: Player preferences (audio, effects quality)
//! - `audio`: Maps simulation events onto sound cues
//! - `highscores`: Session leaderboard

pub mod audio;
pub mod highscores;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use highscores::HighScores;
pub use settings::{QualityPreset, Settings};
pub use tuning::{CityConfig, ConfigError, GameConfig, MovementMode, RoadLayout, Tuning};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Edge length of one map tile in world units
    pub const TILE_SIZE: f32 = 32.0;
    /// Largest frame delta a single tick will simulate (guards against tab stalls)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Default map dimensions (tiles)
    pub const MAP_WIDTH: usize = 40;
    pub const MAP_HEIGHT: usize = 30;
    /// Every road band is exactly this many tiles wide
    pub const ROAD_WIDTH: usize = 2;

    /// Entity footprints (world units)
    pub const PLAYER_SIZE: f32 = 20.0;
    pub const CAR_SIZE: f32 = 24.0;
    pub const POWERUP_SIZE: f32 = 18.0;
    pub const TREE_RADIUS: f32 = 11.0;

    /// Bounded retry count for every placement search
    pub const PLACEMENT_ATTEMPTS: u32 = 64;
}

/// World-space center of tile (tx, ty)
#[inline]
pub fn tile_center(tx: usize, ty: usize) -> Vec2 {
    let t = consts::TILE_SIZE;
    Vec2::new((tx as f32 + 0.5) * t, (ty as f32 + 0.5) * t)
}

/// World-space top-left corner of tile (tx, ty)
#[inline]
pub fn tile_origin(tx: usize, ty: usize) -> Vec2 {
    Vec2::new(tx as f32, ty as f32) * consts::TILE_SIZE
}

/// Tile containing a world point. `None` for negative coordinates; upper
/// bounds are the map's business.
#[inline]
pub fn world_to_tile(p: Vec2) -> Option<(usize, usize)> {
    if p.x < 0.0 || p.y < 0.0 || !p.is_finite() {
        return None;
    }
    let t = consts::TILE_SIZE;
    Some(((p.x / t) as usize, (p.y / t) as usize))
}
