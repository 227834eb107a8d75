//! Data-driven game balance
//!
//! Everything a designer might want to tweak lives here instead of in the
//! simulation code. All structs deserialize with `#[serde(default)]`, so a
//! JSON file only needs the fields it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAP_HEIGHT, MAP_WIDTH, ROAD_WIDTH};
use crate::settings::Settings;

/// Errors raised while loading a [`GameConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How road bands are spaced across the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoadLayout {
    /// Band starts every `interval` tiles
    Fixed { interval: usize },
    /// Gap between bands drawn from `min_gap..=max_gap` tiles
    Randomized { min_gap: usize, max_gap: usize },
}

impl Default for RoadLayout {
    fn default() -> Self {
        RoadLayout::Fixed { interval: 8 }
    }
}

/// Player movement modifier flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// Short burst on a cooldown
    Dash,
    /// Longer speed boost paid for with charges
    #[default]
    Boost,
}

/// City generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CityConfig {
    /// Map width in tiles
    pub width: usize,
    /// Map height in tiles
    pub height: usize,
    pub layout: RoadLayout,
    /// Reserve the central block as a park with a pond
    pub park: bool,
    /// Lot footprint (tiles), including front yard and driveway column
    pub lot_width: usize,
    pub lot_depth: usize,
    /// Chance a fitting lot gets a house
    pub house_density: f64,
    /// Chance a house is L-shaped
    pub l_shape_chance: f64,
    /// Chance an L-shaped notch becomes a backyard pool
    pub pool_chance: f64,
    /// Chance a garden tile away from the road grows a tree
    pub tree_chance: f64,
    pub puddle_count: usize,
    /// Chance each house starts with a car in its driveway
    pub car_chance: f64,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
            layout: RoadLayout::default(),
            park: false,
            lot_width: 4,
            lot_depth: 3,
            house_density: 0.7,
            l_shape_chance: 0.35,
            pool_chance: 0.25,
            tree_chance: 0.08,
            puddle_count: 6,
            car_chance: 0.5,
        }
    }
}

impl CityConfig {
    /// Larger town with irregular blocks and a central park
    pub fn sprawl() -> Self {
        Self {
            width: 56,
            height: 42,
            layout: RoadLayout::Randomized {
                min_gap: 5,
                max_gap: 8,
            },
            park: true,
            puddle_count: 9,
            ..Self::default()
        }
    }
}

/// Gameplay balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Round ===
    /// Starting (and maximum) round time in seconds
    pub initial_time: f32,
    pub max_health: u8,
    /// Grace period after taking damage
    pub invulnerability: f32,
    /// Cars wake up faster once the timer drops below this
    pub final_stretch: f32,

    // === Player ===
    pub player_speed: f32,
    pub movement_mode: MovementMode,
    pub boost_multiplier: f32,
    pub boost_duration: f32,
    pub boost_max_charges: u8,
    /// Deliveries needed before boosting is allowed
    pub boost_unlock_deliveries: u32,
    pub dash_speed: f32,
    pub dash_duration: f32,
    pub dash_cooldown: f32,
    /// Stun after being hit by a car
    pub stun_duration: f32,
    /// Seconds of movement between footstep events
    pub step_interval: f32,

    // === Traffic ===
    pub car_speed: f32,
    /// Chance a car keeps going straight at an intersection
    pub car_straight_weight: f64,
    /// Chance per tile decision to pull into a neighbouring driveway
    pub car_return_chance: f64,
    /// Parked-car activations per second
    pub car_activation_rate: f32,
    /// Activation rate during the final stretch
    pub car_activation_rate_final: f32,

    // === Power-ups ===
    /// Spawns per second while under the cap
    pub powerup_spawn_rate: f32,
    pub max_powerups: usize,
    pub powerup_lifetime: f32,
    pub powerup_heal: u8,
    pub clock_bonus: f32,
    pub freeze_duration: f32,
    pub shield_duration: f32,

    // === Deliveries ===
    pub delivery_radius: f32,
    pub delivery_time_bonus: f32,
    /// A delivery within this many seconds of the last extends the combo
    pub combo_window: f32,
    /// Extra seconds per combo step
    pub combo_time_bonus: f32,
    /// Combo steps that still pay extra time
    pub combo_bonus_cap: u32,

    // === Presentation ===
    pub max_particles: usize,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            initial_time: 150.0,
            max_health: 3,
            invulnerability: 2.0,
            final_stretch: 60.0,

            player_speed: 150.0,
            movement_mode: MovementMode::Boost,
            boost_multiplier: 1.8,
            boost_duration: 2.5,
            boost_max_charges: 3,
            boost_unlock_deliveries: 3,
            dash_speed: 420.0,
            dash_duration: 0.18,
            dash_cooldown: 1.5,
            stun_duration: 0.6,
            step_interval: 0.3,

            car_speed: 100.0,
            car_straight_weight: 0.7,
            car_return_chance: 0.05,
            car_activation_rate: 0.15,
            car_activation_rate_final: 0.6,

            powerup_spawn_rate: 0.12,
            max_powerups: 3,
            powerup_lifetime: 10.0,
            powerup_heal: 1,
            clock_bonus: 10.0,
            freeze_duration: 5.0,
            shield_duration: 8.0,

            delivery_radius: 40.0,
            delivery_time_bonus: 6.0,
            combo_window: 12.0,
            combo_time_bonus: 2.0,
            combo_bonus_cap: 4,

            max_particles: 256,
            viewport_width: 640.0,
            viewport_height: 480.0,
        }
    }
}

impl Tuning {
    /// Earlier ruleset: dash on a cooldown, cars keep straight less often
    pub fn classic() -> Self {
        Self {
            movement_mode: MovementMode::Dash,
            car_straight_weight: 0.4,
            ..Self::default()
        }
    }

    /// Activation rate for the given time remaining
    pub fn activation_rate(&self, time_remaining: f32) -> f32 {
        if time_remaining <= self.final_stretch {
            self.car_activation_rate_final
        } else {
            self.car_activation_rate
        }
    }
}

/// Complete configuration for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub city: CityConfig,
    pub tuning: Tuning,
    pub settings: Settings,
}

impl GameConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the simulation cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let city = &self.city;
        let min_extent = ROAD_WIDTH * 2 + 3;
        if city.width < min_extent || city.height < min_extent {
            return Err(ConfigError::Invalid(format!(
                "map must be at least {min_extent}x{min_extent} tiles, got {}x{}",
                city.width, city.height
            )));
        }
        if city.lot_width < 3 || city.lot_depth < 2 {
            return Err(ConfigError::Invalid(
                "lots must be at least 3 wide and 2 deep".into(),
            ));
        }
        match city.layout {
            RoadLayout::Fixed { interval } if interval <= ROAD_WIDTH => {
                return Err(ConfigError::Invalid(format!(
                    "road interval {interval} leaves no room between bands"
                )));
            }
            RoadLayout::Randomized { min_gap, max_gap } if min_gap == 0 || max_gap < min_gap => {
                return Err(ConfigError::Invalid(format!(
                    "bad road gap range {min_gap}..={max_gap}"
                )));
            }
            _ => {}
        }
        for (name, p) in [
            ("house_density", city.house_density),
            ("l_shape_chance", city.l_shape_chance),
            ("pool_chance", city.pool_chance),
            ("tree_chance", city.tree_chance),
            ("car_chance", city.car_chance),
            ("car_straight_weight", self.tuning.car_straight_weight),
            ("car_return_chance", self.tuning.car_return_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 1], got {p}")));
            }
        }
        let t = &self.tuning;
        if t.initial_time <= 0.0 || t.max_health == 0 {
            return Err(ConfigError::Invalid(
                "initial_time and max_health must be positive".into(),
            ));
        }
        if t.player_speed <= 0.0 || t.car_speed <= 0.0 {
            return Err(ConfigError::Invalid("speeds must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json_str(
            r#"{
                "tuning": { "initial_time": 90.0 },
                "city": { "layout": { "kind": "randomized", "min_gap": 4, "max_gap": 6 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.tuning.initial_time, 90.0);
        assert_eq!(config.tuning.max_health, 3);
        assert_eq!(config.city.width, MAP_WIDTH);
        assert_eq!(
            config.city.layout,
            RoadLayout::Randomized {
                min_gap: 4,
                max_gap: 6
            }
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = GameConfig::from_json_str(r#"{ "city": { "house_density": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = GameConfig::from_json_str(r#"{ "city": { "width": 4 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = GameConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_activation_rate_rises_in_final_stretch() {
        let t = Tuning::default();
        assert_eq!(t.activation_rate(120.0), t.car_activation_rate);
        assert_eq!(t.activation_rate(30.0), t.car_activation_rate_final);
    }

    #[test]
    fn test_presets_validate() {
        let config = GameConfig {
            city: CityConfig::sprawl(),
            tuning: Tuning::classic(),
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.tuning.movement_mode, MovementMode::Dash);
    }
}
