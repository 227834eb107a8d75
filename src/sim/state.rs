//! Round state and entity types
//!
//! Everything a round mutates lives in [`Round`]. Renderers and HUDs read
//! its public fields or take a [`HudSnapshot`]; only the tick mutates it.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::citygen::{self, City};
use super::geom::{Direction, Rect};
use super::map::GridMap;
use crate::consts::{CAR_SIZE, PLAYER_SIZE, POWERUP_SIZE, TREE_RADIUS};
use crate::tuning::{GameConfig, MovementMode, Tuning};

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Round timer ran out
    Timeout,
    /// Player lost every heart
    Health,
}

/// Current phase of the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Generated, waiting for the start signal
    NotStarted,
    Playing,
    /// Frozen verbatim until resumed
    Paused,
    GameOver(EndReason),
}

/// Outline of a house footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HouseShape {
    Rectangular,
    /// One back corner tile cut away
    LShaped { notch: (usize, usize) },
}

/// A house lot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct House {
    pub id: u32,
    /// House footprint (world units)
    pub rect: Rect,
    /// Side of the lot the road is on
    pub facing: Direction,
    pub is_target: bool,
    /// Delivery contact point on the road-facing lot edge
    pub door: Vec2,
    pub driveway: Rect,
    pub shape: HouseShape,
    /// Cosmetic colour index
    pub palette: u8,
}

/// Traffic state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarState {
    /// Sitting in a driveway, harmless
    Parked,
    /// Pulling out of the driveway at half speed
    Merging,
    /// Following road flow at full speed
    Driving,
    /// Pulling into a driveway at half speed
    Returning,
}

/// A car entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub id: u32,
    /// Top-left of the car box
    pub pos: Vec2,
    pub vel: Vec2,
    pub speed: f32,
    pub direction: Direction,
    pub state: CarState,
    /// Seconds left during which the car does not move
    pub frozen_timer: f32,
    /// Driveway anchor the car resets to
    pub home_pos: Vec2,
    pub home_direction: Direction,
    /// Tile whose turn decision has already been taken
    #[serde(skip)]
    pub decided_tile: Option<(usize, usize)>,
    pub palette: u8,
}

impl Car {
    /// A parked car centred on `home_center`, facing `facing`
    pub fn parked(id: u32, home_center: Vec2, facing: Direction, speed: f32, palette: u8) -> Self {
        let home_pos = home_center - Vec2::splat(CAR_SIZE * 0.5);
        Self {
            id,
            pos: home_pos,
            vel: Vec2::ZERO,
            speed,
            direction: facing,
            state: CarState::Parked,
            frozen_timer: 0.0,
            home_pos,
            home_direction: facing,
            decided_tile: None,
            palette,
        }
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos, Vec2::splat(CAR_SIZE))
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(CAR_SIZE * 0.5)
    }

    /// Move so the box center sits on `center`
    pub fn set_center(&mut self, center: Vec2) {
        self.pos = center - Vec2::splat(CAR_SIZE * 0.5);
    }

    /// Whether touching this car hurts
    pub fn is_hazard(&self) -> bool {
        self.state != CarState::Parked && self.frozen_timer <= 0.0
    }

    /// Hard reset to the home driveway
    pub fn reset_home(&mut self) {
        self.pos = self.home_pos;
        self.vel = Vec2::ZERO;
        self.direction = self.home_direction;
        self.state = CarState::Parked;
        self.decided_tile = None;
    }
}

/// Mutually exclusive movement modifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mobility {
    Normal,
    Boosting { remaining: f32 },
    Dashing { remaining: f32 },
    Stunned { remaining: f32 },
}

/// The courier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub rect: Rect,
    pub vel: Vec2,
    /// Base speed
    pub speed: f32,
    pub direction: Direction,
    pub mobility: Mobility,
    pub dash_cooldown: f32,
    pub health: u8,
    pub max_health: u8,
    pub invulnerability_timer: f32,
    /// Puddle immunity buff
    pub immunity_timer: f32,
    pub boost_charges: u8,
    pub boost_unlocked: bool,
    /// Time moved since the last footstep event
    pub step_timer: f32,
    /// Action was held last tick (boost/dash fire on the rising edge)
    pub action_latch: bool,
}

impl Player {
    pub fn new(start: Vec2, tuning: &Tuning) -> Self {
        Self {
            rect: Rect::new(start, Vec2::splat(PLAYER_SIZE)),
            vel: Vec2::ZERO,
            speed: tuning.player_speed,
            direction: Direction::Down,
            mobility: Mobility::Normal,
            dash_cooldown: 0.0,
            health: tuning.max_health,
            max_health: tuning.max_health,
            invulnerability_timer: 0.0,
            immunity_timer: 0.0,
            boost_charges: 0,
            boost_unlocked: false,
            step_timer: 0.0,
            action_latch: false,
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.rect.center()
    }

    /// Boosting or dashing; both shrug off cars and puddles
    pub fn is_boosting(&self) -> bool {
        matches!(self.mobility, Mobility::Boosting { .. } | Mobility::Dashing { .. })
    }

    pub fn is_stunned(&self) -> bool {
        matches!(self.mobility, Mobility::Stunned { .. })
    }

    pub fn puddle_immune(&self) -> bool {
        self.is_boosting() || self.immunity_timer > 0.0
    }

    /// Lose one heart unless still invulnerable. Returns whether it landed.
    pub fn take_damage(&mut self, invulnerability: f32) -> bool {
        if self.invulnerability_timer > 0.0 || self.health == 0 {
            return false;
        }
        self.health -= 1;
        self.invulnerability_timer = invulnerability;
        true
    }

    pub fn heal(&mut self, amount: u8) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    /// Count down every player timer
    pub fn tick_timers(&mut self, dt: f32) {
        self.invulnerability_timer = (self.invulnerability_timer - dt).max(0.0);
        self.immunity_timer = (self.immunity_timer - dt).max(0.0);
        self.dash_cooldown = (self.dash_cooldown - dt).max(0.0);
        self.mobility = match self.mobility {
            Mobility::Normal => Mobility::Normal,
            Mobility::Boosting { remaining } if remaining > dt => Mobility::Boosting {
                remaining: remaining - dt,
            },
            Mobility::Dashing { remaining } if remaining > dt => Mobility::Dashing {
                remaining: remaining - dt,
            },
            Mobility::Stunned { remaining } if remaining > dt => Mobility::Stunned {
                remaining: remaining - dt,
            },
            _ => Mobility::Normal,
        };
    }

    /// Remaining boost time, if boosting
    pub fn boost_remaining(&self) -> f32 {
        match self.mobility {
            Mobility::Boosting { remaining } | Mobility::Dashing { remaining } => remaining,
            _ => 0.0,
        }
    }
}

/// An irregular puddle on the road
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puddle {
    pub id: u32,
    /// Closed outline, world units
    pub outline: Vec<Vec2>,
    pub bounds: Rect,
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Boost refill plus a heart
    Boost,
    /// Extra round time
    Clock,
    /// Stops all traffic for a while
    Freeze,
    /// Puddle immunity
    Shield,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::Boost,
        PowerUpKind::Clock,
        PowerUpKind::Freeze,
        PowerUpKind::Shield,
    ];
}

/// A pickup on the road
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    /// Seconds until it despawns
    pub lifetime: f32,
}

impl PowerUp {
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.pos, Vec2::splat(POWERUP_SIZE))
    }
}

/// A tree; decoration that also blocks movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub pos: Vec2,
    pub radius: f32,
}

impl Tree {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            radius: TREE_RADIUS,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.pos, Vec2::splat(self.radius * 2.0))
    }
}

/// Cosmetic effect variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FxKind {
    Spark { color: u32, size: f32 },
    Popup { text: String },
    /// Newspaper thrown toward a door
    Paper { target: Vec2 },
}

/// A transient cosmetic entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fx {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds left
    pub life: f32,
    pub max_life: f32,
    pub kind: FxKind,
}

/// Terminal summary handed to the game-over screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEnd {
    pub final_score: u32,
    pub reason: EndReason,
    pub deliveries: u32,
}

/// Discrete notifications for audio and other fire-and-forget listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    RoundStarted,
    Paused,
    Resumed,
    /// Throttled movement cue
    Step,
    BoostActivated,
    DashActivated,
    BoostUnlocked,
    Delivered {
        house_id: u32,
        score: u32,
        combo: u32,
        time_bonus: f32,
    },
    CarHit { car_id: u32, health: u8 },
    PuddleSplash { puddle_id: u32, health: u8 },
    PowerUpCollected { kind: PowerUpKind },
    PowerUpExpired { kind: PowerUpKind },
    RoundOver(RoundEnd),
}

/// Remaining time on every timed buff
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BuffTimers {
    pub invulnerability: f32,
    pub puddle_immunity: f32,
    pub boost: f32,
    pub traffic_freeze: f32,
    pub dash_cooldown: f32,
}

/// Per-tick HUD view of the round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub score: u32,
    pub time_remaining: f32,
    pub health: u8,
    pub max_health: u8,
    pub buffs: BuffTimers,
    pub boost_charge: u8,
    pub boost_unlocked: bool,
    pub combo: u32,
    pub deliveries: u32,
    pub phase: RoundPhase,
}

/// Complete round state
#[derive(Debug, Clone)]
pub struct Round {
    /// Seed the round was generated from
    pub seed: u64,
    pub tuning: Tuning,
    pub(crate) rng: Pcg32,
    pub phase: RoundPhase,
    pub map: GridMap,
    pub houses: Vec<House>,
    pub cars: Vec<Car>,
    pub puddles: Vec<Puddle>,
    pub trees: Vec<Tree>,
    /// Static movement blockers (tree boxes)
    pub obstacles: Vec<Rect>,
    pub powerups: Vec<PowerUp>,
    pub effects: Vec<Fx>,
    pub player: Player,
    pub score: u32,
    pub time_remaining: f32,
    /// Seconds of play so far
    pub elapsed: f32,
    pub deliveries: u32,
    pub combo: u32,
    pub last_delivery_at: Option<f32>,
    pub traffic_pause_timer: f32,
    /// Top-left of the viewport
    pub camera: Vec2,
    /// Index into `houses` of the delivery target
    pub target: Option<usize>,
    /// House just delivered to; it cannot take another paper until the
    /// player has left its door
    pub delivered_door: Option<usize>,
    pub(crate) events: Vec<GameEvent>,
    next_id: u32,
}

impl Round {
    /// Generate a fresh round
    pub fn new(config: &GameConfig, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let city = citygen::generate(&config.city, &config.tuning, &mut rng);
        let mut tuning = config.tuning.clone();
        tuning.max_particles = tuning.max_particles.min(config.settings.max_particles());
        Self::from_city(city, tuning, seed, rng)
    }

    /// Wrap an already generated city
    pub fn from_city(city: City, tuning: Tuning, seed: u64, rng: Pcg32) -> Self {
        let City {
            map,
            houses,
            cars,
            puddles,
            trees,
            player_start,
            target,
            next_id,
        } = city;
        let obstacles = trees.iter().map(Tree::bounds).collect();
        let player = Player::new(player_start, &tuning);
        let mut round = Self {
            seed,
            rng,
            phase: RoundPhase::NotStarted,
            map,
            houses,
            cars,
            puddles,
            trees,
            obstacles,
            powerups: Vec::new(),
            effects: Vec::new(),
            player,
            score: 0,
            time_remaining: tuning.initial_time,
            elapsed: 0.0,
            deliveries: 0,
            combo: 0,
            last_delivery_at: None,
            traffic_pause_timer: 0.0,
            camera: Vec2::ZERO,
            target: None,
            delivered_door: None,
            events: Vec::new(),
            next_id,
            tuning,
        };
        round.set_target(target);
        round.update_camera();
        round
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Begin play; no-op unless the round has not started yet
    pub fn start(&mut self) {
        if self.phase == RoundPhase::NotStarted {
            self.phase = RoundPhase::Playing;
            self.events.push(GameEvent::RoundStarted);
            log::info!(
                "Round started: seed={} houses={} cars={} puddles={}",
                self.seed,
                self.houses.len(),
                self.cars.len(),
                self.puddles.len()
            );
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, RoundPhase::GameOver(_))
    }

    /// Terminal summary once the round has ended
    pub fn outcome(&self) -> Option<RoundEnd> {
        match self.phase {
            RoundPhase::GameOver(reason) => Some(RoundEnd {
                final_score: self.score,
                reason,
                deliveries: self.deliveries,
            }),
            _ => None,
        }
    }

    /// End the round; the first terminal reason wins
    pub fn finish(&mut self, reason: EndReason) {
        if self.is_over() {
            return;
        }
        self.phase = RoundPhase::GameOver(reason);
        if let Some(end) = self.outcome() {
            log::info!(
                "Round over ({:?}): score={} deliveries={}",
                reason,
                end.final_score,
                end.deliveries
            );
            self.events.push(GameEvent::RoundOver(end));
        }
    }

    /// Move the target flag to `index`, clearing the previous one
    pub fn set_target(&mut self, index: Option<usize>) {
        for house in &mut self.houses {
            house.is_target = false;
        }
        self.target = index.filter(|&i| i < self.houses.len());
        if let Some(i) = self.target {
            self.houses[i].is_target = true;
        }
    }

    pub fn target_house(&self) -> Option<&House> {
        self.target.map(|i| &self.houses[i])
    }

    /// Center the viewport on the player, clamped to the map
    pub fn update_camera(&mut self) {
        let view = Vec2::new(self.tuning.viewport_width, self.tuning.viewport_height);
        let max = (self.map.world_size() - view).max(Vec2::ZERO);
        self.camera = (self.player.center() - view * 0.5).clamp(Vec2::ZERO, max);
    }

    /// Drain pending events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> HudSnapshot {
        let p = &self.player;
        let boost_mode = self.tuning.movement_mode == MovementMode::Boost;
        HudSnapshot {
            score: self.score,
            time_remaining: self.time_remaining,
            health: p.health,
            max_health: p.max_health,
            buffs: BuffTimers {
                invulnerability: p.invulnerability_timer,
                puddle_immunity: p.immunity_timer,
                boost: p.boost_remaining(),
                traffic_freeze: self.traffic_pause_timer,
                dash_cooldown: p.dash_cooldown,
            },
            boost_charge: if boost_mode { p.boost_charges } else { 0 },
            boost_unlocked: boost_mode && p.boost_unlocked,
            combo: self.combo,
            deliveries: self.deliveries,
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_round_matches_tuning() {
        let round = Round::new(&GameConfig::default(), 7);
        let hud = round.snapshot();
        assert_eq!(hud.health, 3);
        assert_eq!(hud.time_remaining, 150.0);
        assert_eq!(hud.score, 0);
        assert_eq!(hud.phase, RoundPhase::NotStarted);
        assert_eq!(round.houses.iter().filter(|h| h.is_target).count(), 1);
    }

    #[test]
    fn test_damage_respects_invulnerability() {
        let mut player = Player::new(Vec2::ZERO, &Tuning::default());
        assert!(player.take_damage(2.0));
        assert!(!player.take_damage(2.0));
        assert_eq!(player.health, 2);
        player.tick_timers(2.0);
        assert!(player.take_damage(2.0));
        assert_eq!(player.health, 1);
        player.heal(5);
        assert_eq!(player.health, player.max_health);
    }

    #[test]
    fn test_mobility_expires_to_normal() {
        let mut player = Player::new(Vec2::ZERO, &Tuning::default());
        player.mobility = Mobility::Boosting { remaining: 0.15 };
        assert!(player.is_boosting());
        assert!(player.puddle_immune());
        player.tick_timers(0.1);
        assert!(player.is_boosting());
        player.tick_timers(0.1);
        assert_eq!(player.mobility, Mobility::Normal);
        assert!(!player.puddle_immune());
    }

    #[test]
    fn test_finish_keeps_first_reason() {
        let mut round = Round::new(&GameConfig::default(), 3);
        round.start();
        round.finish(EndReason::Health);
        round.finish(EndReason::Timeout);
        assert_eq!(round.phase, RoundPhase::GameOver(EndReason::Health));
        let events = round.take_events();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::RoundOver(_)))
                .count(),
            1
        );
        assert!(round.take_events().is_empty());
    }

    #[test]
    fn test_camera_clamped_to_map() {
        let mut round = Round::new(&GameConfig::default(), 11);
        round.player.rect.pos = Vec2::ZERO;
        round.update_camera();
        assert_eq!(round.camera, Vec2::ZERO);
        round.player.rect.pos = round.map.world_size();
        round.update_camera();
        let view = Vec2::new(round.tuning.viewport_width, round.tuning.viewport_height);
        assert_eq!(round.camera, round.map.world_size() - view);
    }
}
