//! Round simulation
//!
//! All gameplay logic lives here. The module is pure:
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod autopilot;
pub mod citygen;
pub mod collision;
pub mod delivery;
pub mod fx;
pub mod geom;
pub mod map;
pub mod pickups;
pub mod state;
pub mod tick;
pub mod traffic;

pub use citygen::{City, generate};
pub use geom::{Direction, Rect};
pub use map::{GridMap, TileKind};
pub use state::{
    BuffTimers, Car, CarState, EndReason, Fx, FxKind, GameEvent, House, HouseShape, HudSnapshot,
    Mobility, Player, PowerUp, PowerUpKind, Puddle, Round, RoundEnd, RoundPhase, Tree,
};
pub use tick::{TickInput, tick};
