//! Per-frame simulation tick
//!
//! Advances a [`Round`] by one clamped frame delta: timers, spawns, player
//! movement, hazards, delivery, traffic, pickups and effects, in that order.

use glam::Vec2;

use super::collision::{self, PLAYER_SURFACE};
use super::geom::Direction;
use super::state::{EndReason, GameEvent, HudSnapshot, Mobility, Round, RoundPhase};
use super::{autopilot, delivery, fx, pickups, traffic};
use crate::consts::MAX_FRAME_DT;
use crate::tuning::MovementMode;

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Desired heading; longer than 1 is clamped
    pub direction: Vec2,
    /// Boost or dash (fires on press, not hold)
    pub action: bool,
    /// Start a round that has not started yet
    pub start: bool,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - the autopilot drives
    pub idle_mode: bool,
}

impl Round {
    /// Advance the round; see [`tick`]
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> HudSnapshot {
        tick(self, input, dt)
    }
}

/// Advance the round by one frame and return the HUD view
pub fn tick(round: &mut Round, input: &TickInput, dt: f32) -> HudSnapshot {
    // Handle pause toggle
    if input.pause {
        match round.phase {
            RoundPhase::Playing => {
                round.phase = RoundPhase::Paused;
                round.events.push(GameEvent::Paused);
                log::info!("Paused at {:.1}s remaining", round.time_remaining);
                return round.snapshot();
            }
            RoundPhase::Paused => {
                round.phase = RoundPhase::Playing;
                round.events.push(GameEvent::Resumed);
                log::info!("Resumed");
            }
            _ => {}
        }
    }

    if input.start || input.idle_mode {
        round.start();
    }
    if round.phase != RoundPhase::Playing {
        return round.snapshot();
    }

    let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };

    round.elapsed += dt;
    round.time_remaining = (round.time_remaining - dt).max(0.0);
    if round.time_remaining <= 0.0 {
        round.finish(EndReason::Timeout);
        return round.snapshot();
    }

    round.traffic_pause_timer = (round.traffic_pause_timer - dt).max(0.0);
    round.player.tick_timers(dt);
    if round
        .last_delivery_at
        .is_some_and(|at| round.elapsed - at > round.tuning.combo_window)
    {
        round.combo = 0;
    }

    traffic::maybe_activate(round, dt);
    pickups::maybe_spawn(round, dt);

    let mut input = input.clone();
    if input.idle_mode {
        let steering = autopilot::steer(round);
        input.direction = steering.direction;
        input.action = steering.action;
    }
    move_player(round, &input, dt);
    if pickups::check_puddles(round) && round.player.health == 0 {
        round.finish(EndReason::Health);
        return round.snapshot();
    }

    delivery::check_delivery(round);

    traffic::advance_all(round, dt);
    if pickups::check_cars(round) && round.player.health == 0 {
        round.finish(EndReason::Health);
        return round.snapshot();
    }

    pickups::collect_powerups(round);
    pickups::expire_powerups(round, dt);

    let cap = round.tuning.max_particles;
    fx::update(&mut round.effects, dt, cap);
    round.update_camera();
    round.snapshot()
}

/// Fire boost or dash on the rising edge of the action button
fn trigger_action(round: &mut Round) {
    let t = &round.tuning;
    let player = &mut round.player;
    match t.movement_mode {
        MovementMode::Boost => {
            if player.boost_unlocked && player.boost_charges > 0 && !player.is_boosting() {
                player.boost_charges -= 1;
                player.mobility = Mobility::Boosting {
                    remaining: t.boost_duration,
                };
                round.events.push(GameEvent::BoostActivated);
            }
        }
        MovementMode::Dash => {
            if player.dash_cooldown <= 0.0 && !player.is_boosting() {
                player.mobility = Mobility::Dashing {
                    remaining: t.dash_duration,
                };
                player.dash_cooldown = t.dash_cooldown;
                round.events.push(GameEvent::DashActivated);
            }
        }
    }
}

fn move_player(round: &mut Round, input: &TickInput, dt: f32) {
    let direction = if input.direction.is_finite() {
        input.direction.clamp_length_max(1.0)
    } else {
        Vec2::ZERO
    };
    let pressed = input.action && !round.player.action_latch;
    round.player.action_latch = input.action;

    if round.player.is_stunned() {
        round.player.vel = Vec2::ZERO;
        return;
    }
    if pressed {
        trigger_action(round);
    }

    if let Some(facing) = Direction::from_vec(direction) {
        round.player.direction = facing;
    }
    let t = &round.tuning;
    let player = &mut round.player;
    let (heading, speed) = match player.mobility {
        Mobility::Boosting { .. } => (direction, player.speed * t.boost_multiplier),
        // A dash with no input carries on along the facing
        Mobility::Dashing { .. } if direction == Vec2::ZERO => {
            (player.direction.vec(), t.dash_speed)
        }
        Mobility::Dashing { .. } => (direction.normalize_or_zero(), t.dash_speed),
        _ => (direction, player.speed),
    };
    player.vel = heading * speed;

    let before = player.rect.pos;
    let result = collision::move_box(
        &round.map,
        &round.obstacles,
        player.rect,
        player.vel * dt,
        PLAYER_SURFACE,
    );
    player.rect = result.rect;

    if player.rect.pos != before {
        player.step_timer += dt;
        if player.step_timer >= t.step_interval {
            player.step_timer = 0.0;
            round.events.push(GameEvent::Step);
        }
    } else {
        player.step_timer = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use crate::sim::collision::is_walkable;
    use crate::sim::geom::Rect;
    use crate::sim::state::Puddle;
    use crate::tuning::Tuning;

    /// A started round with no traffic, puddles, power-ups or deliveries to
    /// interfere
    fn quiet_round(seed: u64, tuning: Tuning) -> Round {
        let config = GameConfig {
            tuning,
            ..GameConfig::default()
        };
        let mut round = Round::new(&config, seed);
        round.cars.clear();
        round.puddles.clear();
        round.tuning.powerup_spawn_rate = 0.0;
        round.tuning.delivery_radius = 0.0;
        round.start();
        round.take_events();
        round
    }

    fn idle() -> TickInput {
        TickInput::default()
    }

    fn moving(direction: Vec2) -> TickInput {
        TickInput {
            direction,
            ..Default::default()
        }
    }

    #[test]
    fn test_not_started_waits() {
        let mut round = Round::new(&GameConfig::default(), 1);
        let hud = tick(&mut round, &idle(), 0.1);
        assert_eq!(hud.phase, RoundPhase::NotStarted);
        assert_eq!(hud.time_remaining, 150.0);
        assert_eq!(hud.health, 3);
        assert_eq!(hud.score, 0);

        let start = TickInput {
            start: true,
            ..Default::default()
        };
        let hud = round.tick(&start, 0.1);
        assert_eq!(hud.phase, RoundPhase::Playing);
        assert!(hud.time_remaining < 150.0);
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut round = quiet_round(2, Tuning::default());
        let hud = tick(&mut round, &idle(), 5.0);
        assert!((hud.time_remaining - (150.0 - MAX_FRAME_DT)).abs() < 1e-4);
        let hud = tick(&mut round, &idle(), -1.0);
        assert!((hud.time_remaining - (150.0 - MAX_FRAME_DT)).abs() < 1e-4);
    }

    #[test]
    fn test_timeout_freezes_round() {
        let mut round = quiet_round(3, Tuning::default());
        round.time_remaining = 0.016;
        let hud = tick(&mut round, &moving(Vec2::X), 0.1);
        assert_eq!(hud.phase, RoundPhase::GameOver(EndReason::Timeout));
        assert_eq!(hud.time_remaining, 0.0);

        let pos = round.player.rect.pos;
        let after = tick(&mut round, &moving(Vec2::X), 0.1);
        assert_eq!(after, hud);
        assert_eq!(round.player.rect.pos, pos);
    }

    #[test]
    fn test_pause_skips_simulation() {
        let mut round = quiet_round(4, Tuning::default());
        tick(&mut round, &idle(), 0.1);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        let paused = tick(&mut round, &pause, 0.1);
        assert_eq!(paused.phase, RoundPhase::Paused);
        for _ in 0..10 {
            assert_eq!(tick(&mut round, &moving(Vec2::X), 0.1), paused);
        }
        let resumed = tick(&mut round, &pause, 0.1);
        assert_eq!(resumed.phase, RoundPhase::Playing);
        assert!(resumed.time_remaining < paused.time_remaining);
        let events = round.take_events();
        assert!(events.contains(&GameEvent::Paused));
        assert!(events.contains(&GameEvent::Resumed));
    }

    #[test]
    fn test_movement_stays_on_road() {
        let mut round = quiet_round(5, Tuning::default());
        let headings = [Vec2::X, Vec2::Y, Vec2::NEG_X, Vec2::NEG_Y, Vec2::ONE];
        for heading in headings {
            for _ in 0..40 {
                tick(&mut round, &moving(heading * 3.0), 0.1);
                assert!(is_walkable(&round.map, &round.player.rect, PLAYER_SURFACE));
            }
        }
    }

    #[test]
    fn test_puddle_debounced_by_invulnerability() {
        let mut round = quiet_round(6, Tuning::default());
        let c = round.player.center();
        let outline = vec![
            c + Vec2::new(-14.0, -14.0),
            c + Vec2::new(14.0, -14.0),
            c + Vec2::new(14.0, 14.0),
            c + Vec2::new(-14.0, 14.0),
        ];
        let bounds = Rect::bounding(&outline);
        round.puddles.push(Puddle { id: 1, outline, bounds });

        // 2.5s standing still spans two invulnerability windows
        for _ in 0..25 {
            tick(&mut round, &idle(), 0.1);
        }
        assert_eq!(round.player.health, 1);
        let splashes = round
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::PuddleSplash { .. }))
            .count();
        assert_eq!(splashes, 2);
    }

    #[test]
    fn test_last_heart_ends_round() {
        let mut round = quiet_round(7, Tuning::default());
        round.player.health = 1;
        let c = round.player.center();
        let outline = vec![
            c + Vec2::splat(-14.0),
            c + Vec2::new(14.0, -14.0),
            c + Vec2::splat(14.0),
        ];
        let bounds = Rect::bounding(&outline);
        round.puddles.push(Puddle { id: 1, outline, bounds });
        let hud = tick(&mut round, &idle(), 0.1);
        assert_eq!(hud.health, 0);
        assert_eq!(hud.phase, RoundPhase::GameOver(EndReason::Health));
        assert!(hud.time_remaining > 0.0);
    }

    #[test]
    fn test_boost_fires_on_press_only() {
        let mut round = quiet_round(8, Tuning::default());
        round.player.boost_unlocked = true;
        round.player.boost_charges = 2;
        let hold = TickInput {
            action: true,
            direction: Vec2::X,
            ..Default::default()
        };
        tick(&mut round, &hold, 0.1);
        tick(&mut round, &hold, 0.1);
        assert_eq!(round.player.boost_charges, 1);
        assert!(round.player.is_boosting());
        let events = round.take_events();
        assert_eq!(events.iter().filter(|e| **e == GameEvent::BoostActivated).count(), 1);
    }

    #[test]
    fn test_locked_boost_does_nothing() {
        let mut round = quiet_round(9, Tuning::default());
        round.player.boost_charges = 3;
        let press = TickInput {
            action: true,
            ..Default::default()
        };
        tick(&mut round, &press, 0.1);
        assert!(!round.player.is_boosting());
        assert_eq!(round.snapshot().boost_charge, 3);
    }

    #[test]
    fn test_dash_sets_cooldown() {
        let mut round = quiet_round(10, Tuning::classic());
        let press = TickInput {
            action: true,
            ..Default::default()
        };
        let before = round.player.rect.pos;
        tick(&mut round, &press, 0.05);
        assert!(matches!(round.player.mobility, Mobility::Dashing { .. }));
        assert_eq!(round.player.dash_cooldown, round.tuning.dash_cooldown);
        // No input: dashes along the facing
        assert_ne!(round.player.rect.pos, before);
        assert!(round.take_events().contains(&GameEvent::DashActivated));
        let hud = round.snapshot();
        assert_eq!(hud.boost_charge, 0);
        assert!(!hud.boost_unlocked);
    }

    #[test]
    fn test_stun_ignores_input() {
        let mut round = quiet_round(11, Tuning::default());
        round.player.mobility = Mobility::Stunned { remaining: 0.5 };
        let pos = round.player.rect.pos;
        tick(&mut round, &moving(Vec2::X), 0.1);
        assert_eq!(round.player.rect.pos, pos);
        assert_eq!(round.player.vel, Vec2::ZERO);
    }

    #[test]
    fn test_footsteps_are_throttled() {
        let mut round = quiet_round(12, Tuning::default());
        for _ in 0..10 {
            tick(&mut round, &moving(Vec2::X), 0.05);
        }
        let steps = round
            .take_events()
            .into_iter()
            .filter(|e| *e == GameEvent::Step)
            .count();
        assert!((1..=2).contains(&steps), "{steps} steps");
    }
}
