//! Transient effects: spark bursts, text popups and thrown newspapers
//!
//! Purely cosmetic. Nothing in the simulation reads them back.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::state::{Fx, FxKind, Round};

pub const SPARK_DELIVERY: u32 = 0xffd23f;
pub const SPARK_SPLASH: u32 = 0x4fa3ff;
pub const SPARK_CRASH: u32 = 0xff5a36;
pub const SPARK_PICKUP: u32 = 0x7dff8a;

const SPARK_DRAG: f32 = 0.9;
const POPUP_RISE: f32 = 30.0;
const POPUP_LIFE: f32 = 1.0;
/// Seconds a thrown paper is in the air
const PAPER_FLIGHT: f32 = 0.35;

/// Add effects, dropping the oldest ones past the cap
fn push(round: &mut Round, batch: impl IntoIterator<Item = Fx>) {
    let cap = round.tuning.max_particles;
    if cap == 0 {
        return;
    }
    round.effects.extend(batch);
    trim_oldest(&mut round.effects, cap);
}

fn trim_oldest(effects: &mut Vec<Fx>, cap: usize) {
    if effects.len() > cap {
        let excess = effects.len() - cap;
        effects.drain(..excess);
    }
}

/// Radial spark burst
pub fn burst(round: &mut Round, pos: Vec2, count: usize, color: u32) {
    let rng = &mut round.rng;
    let sparks: Vec<Fx> = (0..count)
        .map(|_| {
            let angle: f32 = rng.random_range(0.0..TAU);
            let speed: f32 = rng.random_range(40.0..140.0);
            let life: f32 = rng.random_range(0.3..0.7);
            let size: f32 = rng.random_range(1.5..3.5);
            Fx {
                pos,
                vel: Vec2::from_angle(angle) * speed,
                life,
                max_life: life,
                kind: FxKind::Spark { color, size },
            }
        })
        .collect();
    push(round, sparks);
}

/// Floating text
pub fn popup(round: &mut Round, pos: Vec2, text: impl Into<String>) {
    push(
        round,
        [Fx {
            pos,
            vel: Vec2::new(0.0, -POPUP_RISE),
            life: POPUP_LIFE,
            max_life: POPUP_LIFE,
            kind: FxKind::Popup { text: text.into() },
        }],
    );
}

/// Newspaper flying from `from` to land on `target`
pub fn paper(round: &mut Round, from: Vec2, target: Vec2) {
    push(
        round,
        [Fx {
            pos: from,
            vel: (target - from) / PAPER_FLIGHT,
            life: PAPER_FLIGHT,
            max_life: PAPER_FLIGHT,
            kind: FxKind::Paper { target },
        }],
    );
}

/// Move and age every effect, then drop the dead ones
pub fn update(effects: &mut Vec<Fx>, dt: f32, cap: usize) {
    for fx in effects.iter_mut() {
        fx.pos += fx.vel * dt;
        match fx.kind {
            FxKind::Spark { .. } => fx.vel *= SPARK_DRAG,
            FxKind::Paper { target } if fx.life <= dt => fx.pos = target,
            _ => {}
        }
        fx.life -= dt;
    }
    effects.retain(|fx| fx.life > 0.0);
    trim_oldest(effects, cap);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;

    #[test]
    fn test_effects_expire() {
        let mut round = Round::new(&GameConfig::default(), 1);
        popup(&mut round, Vec2::ZERO, "+1");
        burst(&mut round, Vec2::ZERO, 5, SPARK_DELIVERY);
        assert_eq!(round.effects.len(), 6);
        update(&mut round.effects, 0.5, 256);
        assert!(round.effects.iter().any(|fx| matches!(fx.kind, FxKind::Popup { .. })));
        update(&mut round.effects, 0.6, 256);
        assert!(round.effects.is_empty());
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut round = Round::new(&GameConfig::default(), 2);
        round.tuning.max_particles = 4;
        popup(&mut round, Vec2::ZERO, "first");
        burst(&mut round, Vec2::ZERO, 4, SPARK_CRASH);
        assert_eq!(round.effects.len(), 4);
        assert!(round.effects.iter().all(|fx| matches!(fx.kind, FxKind::Spark { .. })));
    }

    #[test]
    fn test_burst_past_cap_keeps_newest() {
        let mut round = Round::new(&GameConfig::default(), 4);
        round.tuning.max_particles = 8;
        burst(&mut round, Vec2::ZERO, 8, SPARK_SPLASH);
        burst(&mut round, Vec2::ONE, 20, SPARK_CRASH);
        assert_eq!(round.effects.len(), 8);
        assert!(round.effects.iter().all(|fx| fx.pos == Vec2::ONE));
        popup(&mut round, Vec2::ZERO, "+1");
        assert_eq!(round.effects.len(), 8);
        assert!(matches!(round.effects.last().map(|fx| &fx.kind), Some(FxKind::Popup { .. })));
    }

    #[test]
    fn test_paper_lands_on_target() {
        let mut round = Round::new(&GameConfig::default(), 3);
        let target = Vec2::new(100.0, 50.0);
        paper(&mut round, Vec2::ZERO, target);
        let mut effects = round.effects.clone();
        update(&mut effects, 0.2, 16);
        assert_eq!(effects.len(), 1);
        assert!(effects[0].pos.distance(target) > 1.0);
        update(&mut effects, 0.2, 16);
        assert!(effects.is_empty());
    }
}
