//! Idle/demo driver
//!
//! Breadth-first search over road tiles toward the target door. Produces the
//! same direction/action pair a human would, so the tick treats both alike.

use std::collections::VecDeque;

use glam::Vec2;

use super::geom::Direction;
use super::map::{GridMap, TileKind};
use super::state::{Mobility, Round};
use crate::tile_center;
use crate::tuning::MovementMode;

/// Paths at least this many tiles long are worth a boost
const BOOST_PATH_LEN: usize = 8;

/// Steering decision for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Steering {
    pub direction: Vec2,
    pub action: bool,
}

/// Shortest road path from `start` to the first tile accepted by `goal`,
/// both ends included
pub fn route(
    map: &GridMap,
    start: (usize, usize),
    goal: impl Fn(usize, usize) -> bool,
) -> Option<Vec<(usize, usize)>> {
    if !map.is(start.0, start.1, TileKind::Road) {
        return None;
    }
    let width = map.width();
    let index = |(x, y): (usize, usize)| y * width + x;
    let mut parent: Vec<Option<(usize, usize)>> = vec![None; width * map.height()];
    let mut seen = vec![false; width * map.height()];
    let mut queue = VecDeque::from([start]);
    seen[index(start)] = true;

    while let Some(tile) = queue.pop_front() {
        if goal(tile.0, tile.1) {
            let mut path = vec![tile];
            let mut cur = tile;
            while let Some(prev) = parent[index(cur)] {
                path.push(prev);
                cur = prev;
            }
            path.reverse();
            return Some(path);
        }
        for dir in Direction::ALL {
            let Some(next) = map.neighbor(tile.0, tile.1, dir) else {
                continue;
            };
            if !seen[index(next)] && map.is(next.0, next.1, TileKind::Road) {
                seen[index(next)] = true;
                parent[index(next)] = Some(tile);
                queue.push_back(next);
            }
        }
    }
    None
}

fn boost_ready(round: &Round) -> bool {
    let p = &round.player;
    if p.mobility != Mobility::Normal {
        return false;
    }
    match round.tuning.movement_mode {
        MovementMode::Boost => p.boost_unlocked && p.boost_charges > 0,
        MovementMode::Dash => p.dash_cooldown <= 0.0,
    }
}

/// Steer toward the current target
pub fn steer(round: &Round) -> Steering {
    let Some(door) = round.target_house().map(|h| h.door) else {
        return Steering::default();
    };
    let here = round.player.center();
    let Some(start) = round.map.tile_at(here) else {
        return Steering::default();
    };
    let reach = round.tuning.delivery_radius * 0.75;
    let near_door = |tx, ty| tile_center(tx, ty).distance(door) <= reach;
    let Some(path) = route(&round.map, start, near_door) else {
        return Steering::default();
    };

    // Aim one tile ahead; on the last tile, straight at the door
    let waypoint = match path.get(1) {
        Some(&(tx, ty)) => tile_center(tx, ty),
        None => door,
    };
    Steering {
        direction: (waypoint - here).normalize_or_zero(),
        action: path.len() >= BOOST_PATH_LEN && boost_ready(round),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use crate::sim::state::RoundPhase;
    use crate::sim::tick::{TickInput, tick};

    #[test]
    fn test_route_follows_roads() {
        let mut map = GridMap::new(8, 8);
        map.add_vertical_band(0);
        map.add_horizontal_band(6);
        let path = route(&map, (0, 0), |tx, ty| (tx, ty) == (7, 7)).unwrap();
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(7, 7)));
        assert_eq!(path.len(), 15);
        assert!(path.iter().all(|&(x, y)| map.is(x, y, TileKind::Road)));
        assert!(route(&map, (4, 2), |_, _| true).is_none());
    }

    #[test]
    fn test_autopilot_makes_deliveries() {
        let mut round = Round::new(&GameConfig::default(), 31);
        round.cars.clear();
        round.puddles.clear();
        round.tuning.powerup_spawn_rate = 0.0;
        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        for _ in 0..1200 {
            tick(&mut round, &input, 0.05);
        }
        assert_eq!(round.phase, RoundPhase::Playing);
        assert!(round.deliveries >= 2, "only {} deliveries", round.deliveries);
    }
}
