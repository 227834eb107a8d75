//! Power-ups and hazard contacts
//!
//! Spawning, lifetime and pickup effects of power-ups, plus the two ways the
//! courier gets hurt: splashing through a puddle and being clipped by a car.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::collision::{PLAYER_SURFACE, is_walkable};
use super::fx;
use super::geom::{Rect, point_in_polygon};
use super::map::TileKind;
use super::state::{GameEvent, Mobility, PowerUp, PowerUpKind, Puddle, Round};
use crate::consts::{PLACEMENT_ATTEMPTS, POWERUP_SIZE};
use crate::tile_center;
use crate::tuning::MovementMode;

/// Per-tick spawn roll
pub fn maybe_spawn(round: &mut Round, dt: f32) {
    if round.powerups.len() >= round.tuning.max_powerups {
        return;
    }
    let chance = (round.tuning.powerup_spawn_rate * dt).clamp(0.0, 1.0);
    if !round.rng.random_bool(chance as f64) {
        return;
    }
    let Some(&kind) = PowerUpKind::ALL.choose(&mut round.rng) else {
        return;
    };
    match find_spawn_spot(round) {
        Some(pos) => {
            let id = round.next_entity_id();
            log::debug!("Spawned {kind:?} power-up {id} at {pos}");
            round.powerups.push(PowerUp {
                id,
                kind,
                pos,
                lifetime: round.tuning.powerup_lifetime,
            });
        }
        None => log::debug!("No free road spot for a power-up"),
    }
}

/// Random road tile center whose power-up box is clear of puddles, other
/// power-ups and the player
fn find_spawn_spot(round: &mut Round) -> Option<Vec2> {
    let roads = round.map.tiles_of(TileKind::Road);
    for _ in 0..PLACEMENT_ATTEMPTS {
        let &(tx, ty) = roads.choose(&mut round.rng)?;
        let pos = tile_center(tx, ty);
        let rect = Rect::from_center(pos, Vec2::splat(POWERUP_SIZE));
        let clear = is_walkable(&round.map, &rect, PLAYER_SURFACE)
            && !rect.overlaps(&round.player.rect)
            && round.puddles.iter().all(|p| !p.bounds.overlaps(&rect))
            && round.powerups.iter().all(|p| !p.rect().overlaps(&rect));
        if clear {
            return Some(pos);
        }
    }
    None
}

/// Apply a collected power-up
pub fn apply(round: &mut Round, kind: PowerUpKind) {
    let t = &round.tuning;
    match kind {
        PowerUpKind::Boost => {
            match t.movement_mode {
                MovementMode::Boost => round.player.boost_charges = t.boost_max_charges,
                MovementMode::Dash => round.player.dash_cooldown = 0.0,
            }
            round.player.heal(t.powerup_heal);
        }
        PowerUpKind::Clock => {
            round.time_remaining = (round.time_remaining + t.clock_bonus).min(t.initial_time);
        }
        PowerUpKind::Freeze => {
            for car in &mut round.cars {
                car.frozen_timer = t.freeze_duration;
            }
            round.traffic_pause_timer = t.freeze_duration;
        }
        PowerUpKind::Shield => round.player.immunity_timer = t.shield_duration,
    }
}

/// Consume every power-up the player touches
pub fn collect_powerups(round: &mut Round) {
    let player = round.player.rect;
    let (taken, kept): (Vec<PowerUp>, Vec<PowerUp>) = std::mem::take(&mut round.powerups)
        .into_iter()
        .partition(|p| p.rect().overlaps(&player));
    round.powerups = kept;
    for powerup in taken {
        log::debug!("Collected {:?} power-up {}", powerup.kind, powerup.id);
        apply(round, powerup.kind);
        fx::burst(round, powerup.pos, 8, fx::SPARK_PICKUP);
        round.events.push(GameEvent::PowerUpCollected { kind: powerup.kind });
    }
}

/// Age power-ups and drop the unclaimed ones
pub fn expire_powerups(round: &mut Round, dt: f32) {
    for powerup in &mut round.powerups {
        powerup.lifetime -= dt;
    }
    let events = &mut round.events;
    round.powerups.retain(|p| {
        if p.lifetime > 0.0 {
            true
        } else {
            events.push(GameEvent::PowerUpExpired { kind: p.kind });
            false
        }
    });
}

/// Whether a box touches the puddle's outline
pub fn puddle_touches(puddle: &Puddle, rect: &Rect) -> bool {
    puddle.bounds.overlaps(rect)
        && (puddle.outline.iter().any(|&p| rect.contains(p))
            || rect
                .corners()
                .iter()
                .chain(std::iter::once(&rect.center()))
                .any(|&c| point_in_polygon(c, &puddle.outline)))
}

/// Puddle contact. Returns whether a heart was lost.
pub fn check_puddles(round: &mut Round) -> bool {
    let player = &round.player;
    if player.puddle_immune() || player.invulnerability_timer > 0.0 {
        return false;
    }
    let Some(puddle_id) = round
        .puddles
        .iter()
        .find(|p| puddle_touches(p, &player.rect))
        .map(|p| p.id)
    else {
        return false;
    };
    if !round.player.take_damage(round.tuning.invulnerability) {
        return false;
    }
    let health = round.player.health;
    log::debug!("Splashed through puddle {puddle_id}, health {health}");
    round.events.push(GameEvent::PuddleSplash { puddle_id, health });
    let at = round.player.center();
    fx::burst(round, at, 10, fx::SPARK_SPLASH);
    true
}

/// Car contact. Returns whether a heart was lost.
pub fn check_cars(round: &mut Round) -> bool {
    let player = &round.player;
    if player.is_boosting() || player.invulnerability_timer > 0.0 {
        return false;
    }
    let Some(car_id) = round
        .cars
        .iter()
        .find(|c| c.is_hazard() && c.rect().overlaps(&player.rect))
        .map(|c| c.id)
    else {
        return false;
    };
    if !round.player.take_damage(round.tuning.invulnerability) {
        return false;
    }
    if round.tuning.stun_duration > 0.0 {
        round.player.mobility = Mobility::Stunned {
            remaining: round.tuning.stun_duration,
        };
        round.player.vel = Vec2::ZERO;
    }
    let health = round.player.health;
    log::debug!("Hit by car {car_id}, health {health}");
    round.events.push(GameEvent::CarHit { car_id, health });
    let at = round.player.center();
    fx::burst(round, at, 14, fx::SPARK_CRASH);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use crate::sim::geom::Direction;
    use crate::sim::state::{Car, CarState};

    fn playing_round(seed: u64) -> Round {
        let mut round = Round::new(&GameConfig::default(), seed);
        round.start();
        round.take_events();
        round
    }

    fn drop_on_player(round: &mut Round, kind: PowerUpKind) {
        let id = round.next_entity_id();
        round.powerups.push(PowerUp {
            id,
            kind,
            pos: round.player.center(),
            lifetime: 5.0,
        });
    }

    #[test]
    fn test_spawn_respects_cap() {
        let mut round = playing_round(4);
        round.tuning.powerup_spawn_rate = 1000.0;
        for _ in 0..20 {
            maybe_spawn(&mut round, 0.1);
        }
        assert_eq!(round.powerups.len(), round.tuning.max_powerups);
        for p in &round.powerups {
            assert!(is_walkable(&round.map, &p.rect(), PLAYER_SURFACE));
            assert!(round.puddles.iter().all(|q| !q.bounds.overlaps(&p.rect())));
        }
    }

    #[test]
    fn test_clock_is_capped() {
        let mut round = playing_round(5);
        round.time_remaining = round.tuning.initial_time - 3.0;
        drop_on_player(&mut round, PowerUpKind::Clock);
        collect_powerups(&mut round);
        assert!(round.powerups.is_empty());
        assert_eq!(round.time_remaining, round.tuning.initial_time);
        assert_eq!(
            round.take_events(),
            vec![GameEvent::PowerUpCollected {
                kind: PowerUpKind::Clock
            }]
        );
    }

    #[test]
    fn test_freeze_stops_every_car() {
        let mut round = playing_round(6);
        drop_on_player(&mut round, PowerUpKind::Freeze);
        collect_powerups(&mut round);
        assert_eq!(round.traffic_pause_timer, round.tuning.freeze_duration);
        assert!(round.cars.iter().all(|c| c.frozen_timer > 0.0 && !c.is_hazard()));
    }

    #[test]
    fn test_boost_pickup_refills_and_heals() {
        let mut round = playing_round(7);
        round.player.health = 1;
        drop_on_player(&mut round, PowerUpKind::Boost);
        collect_powerups(&mut round);
        assert_eq!(round.player.boost_charges, round.tuning.boost_max_charges);
        assert_eq!(round.player.health, 2);
    }

    #[test]
    fn test_unclaimed_powerups_expire() {
        let mut round = playing_round(8);
        round.powerups.push(PowerUp {
            id: 900,
            kind: PowerUpKind::Shield,
            pos: Vec2::ZERO,
            lifetime: 0.15,
        });
        expire_powerups(&mut round, 0.1);
        assert_eq!(round.powerups.len(), 1);
        expire_powerups(&mut round, 0.1);
        assert!(round.powerups.is_empty());
        assert_eq!(
            round.take_events(),
            vec![GameEvent::PowerUpExpired {
                kind: PowerUpKind::Shield
            }]
        );
    }

    #[test]
    fn test_shield_blocks_puddles() {
        let mut round = playing_round(9);
        let c = round.player.center();
        let outline = vec![
            c + Vec2::new(-15.0, -15.0),
            c + Vec2::new(15.0, -15.0),
            c + Vec2::new(15.0, 15.0),
            c + Vec2::new(-15.0, 15.0),
        ];
        let bounds = Rect::bounding(&outline);
        round.puddles = vec![Puddle { id: 1, outline, bounds }];
        round.player.immunity_timer = 1.0;
        assert!(!check_puddles(&mut round));
        round.player.immunity_timer = 0.0;
        assert!(check_puddles(&mut round));
        assert_eq!(round.player.health, 2);
        assert!(!check_puddles(&mut round));
    }

    #[test]
    fn test_car_hit_stuns() {
        let mut round = playing_round(10);
        let mut car = Car::parked(99, round.player.center(), Direction::Up, 100.0, 0);
        car.state = CarState::Driving;
        round.cars = vec![car];
        assert!(round.cars[0].is_hazard());
        assert!(check_cars(&mut round));
        assert!(round.player.is_stunned());
        assert_eq!(round.player.health, 2);
        // Boosting shrugs cars off
        round.player.invulnerability_timer = 0.0;
        round.player.mobility = Mobility::Boosting { remaining: 1.0 };
        assert!(!check_cars(&mut round));
    }
}
