//! Traffic AI
//!
//! Each car runs a small state machine: parked in its driveway, merging onto
//! the road, driving with the one-way flow of the bands, and returning into a
//! driveway. Anything that leaves the road network is sent straight home.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::geom::Direction;
use super::map::{GridMap, TileKind};
use super::state::{Car, CarState, Round};
use crate::tile_center;
use crate::tuning::Tuning;

/// Tiles a car may occupy outside `Parked`
pub const CAR_SURFACE: &[TileKind] = &[TileKind::Road, TileKind::Driveway];

/// Road tiles a car wants to see ahead before committing to a heading
const LOOKAHEAD: usize = 2;

/// Pull a parked car out. Returns false if it was not parked.
pub fn activate(car: &mut Car, map: &GridMap) -> bool {
    if car.state != CarState::Parked {
        return false;
    }
    if let Some((tx, ty)) = map.tile_at(car.center()) {
        let toward_road = std::iter::once(car.direction)
            .chain(Direction::ALL)
            .find(|&dir| {
                map.neighbor(tx, ty, dir)
                    .is_some_and(|(x, y)| map.is(x, y, TileKind::Road))
            });
        if let Some(dir) = toward_road {
            car.direction = dir;
        }
    }
    car.state = CarState::Merging;
    car.decided_tile = None;
    true
}

/// Activate one random parked car
pub fn activate_random(round: &mut Round) -> Option<u32> {
    let parked: Vec<usize> = round
        .cars
        .iter()
        .enumerate()
        .filter(|(_, c)| c.state == CarState::Parked)
        .map(|(i, _)| i)
        .collect();
    let &i = parked.choose(&mut round.rng)?;
    let car = &mut round.cars[i];
    activate(car, &round.map);
    log::debug!("Car {} pulling out", car.id);
    Some(car.id)
}

/// Per-tick activation roll; never fires while traffic is frozen
pub fn maybe_activate(round: &mut Round, dt: f32) {
    if round.traffic_pause_timer > 0.0 {
        return;
    }
    let chance = (round.tuning.activation_rate(round.time_remaining) * dt).clamp(0.0, 1.0);
    if round.rng.random_bool(chance as f64) {
        activate_random(round);
    }
}

/// Advance one car by `dt`
pub fn advance_car(car: &mut Car, map: &GridMap, tuning: &Tuning, dt: f32, rng: &mut impl Rng) {
    if car.frozen_timer > 0.0 {
        car.frozen_timer = (car.frozen_timer - dt).max(0.0);
        car.vel = Vec2::ZERO;
        return;
    }
    match car.state {
        CarState::Parked => car.vel = Vec2::ZERO,
        CarState::Merging => merge(car, map, dt, rng),
        CarState::Driving => drive(car, map, tuning, dt, rng),
        CarState::Returning => pull_in(car, map, dt),
    }
}

fn send_home(car: &mut Car, why: &str) {
    log::debug!("Car {} reset home: {why}", car.id);
    car.reset_home();
}

/// Move along the current heading; false if the car left its surface
fn roll(car: &mut Car, map: &GridMap, speed: f32, dt: f32) -> bool {
    car.vel = car.direction.vec() * speed;
    car.pos += car.vel * dt;
    map.kind_at(car.center()).is_some_and(|kind| CAR_SURFACE.contains(&kind))
}

fn merge(car: &mut Car, map: &GridMap, dt: f32, rng: &mut impl Rng) {
    if !roll(car, map, car.speed * 0.5, dt) {
        send_home(car, "merged off the road");
        return;
    }
    let Some((tx, ty)) = map.tile_at(car.center()) else {
        return;
    };
    if !map.is(tx, ty, TileKind::Road) {
        return;
    }

    car.set_center(tile_center(tx, ty));
    match merge_heading(map, tx, ty, car.direction, rng) {
        Some(dir) => {
            car.direction = dir;
            car.state = CarState::Driving;
            car.decided_tile = Some((tx, ty));
        }
        None => send_home(car, "no lane to merge into"),
    }
}

/// Heading for a car that just reached the road. Reversing back into the
/// driveway is only taken when nothing else is offered.
pub fn merge_heading(
    map: &GridMap,
    tx: usize,
    ty: usize,
    merge_dir: Direction,
    rng: &mut impl Rng,
) -> Option<Direction> {
    let options = map.flow_options(tx, ty);
    let clear: Vec<Direction> = options
        .iter()
        .copied()
        .filter(|&d| map.road_ahead(tx, ty, d, LOOKAHEAD))
        .collect();
    let candidates = if clear.is_empty() { options } else { clear };
    let forward: Vec<Direction> = candidates
        .iter()
        .copied()
        .filter(|&d| d != merge_dir.opposite())
        .collect();
    if forward.is_empty() {
        candidates.first().copied()
    } else {
        forward.choose(rng).copied()
    }
}

/// Heading at an intersection while driving; `None` is a dead end
pub fn choose_heading(
    map: &GridMap,
    tx: usize,
    ty: usize,
    current: Direction,
    straight_weight: f64,
    rng: &mut impl Rng,
) -> Option<Direction> {
    let options: Vec<Direction> = map
        .flow_options(tx, ty)
        .into_iter()
        .filter(|&d| d != current.opposite() && map.road_ahead(tx, ty, d, LOOKAHEAD))
        .collect();
    let turns: Vec<Direction> = options.iter().copied().filter(|&d| d != current).collect();
    let can_continue = options.contains(&current);
    if can_continue && (turns.is_empty() || rng.random_bool(straight_weight.clamp(0.0, 1.0))) {
        Some(current)
    } else {
        turns.choose(rng).copied()
    }
}

fn driveway_beside(map: &GridMap, tx: usize, ty: usize) -> Option<Direction> {
    Direction::ALL
        .into_iter()
        .find(|&dir| {
            map.neighbor(tx, ty, dir)
                .is_some_and(|(x, y)| map.is(x, y, TileKind::Driveway))
        })
}

fn drive(car: &mut Car, map: &GridMap, tuning: &Tuning, dt: f32, rng: &mut impl Rng) {
    let Some((tx, ty)) = map.tile_at(car.center()) else {
        send_home(car, "off the map");
        return;
    };
    if !map.is(tx, ty, TileKind::Road) {
        send_home(car, "off the road");
        return;
    }

    let step = car.speed * dt;
    let center = tile_center(tx, ty);
    if car.decided_tile != Some((tx, ty)) && car.center().distance(center) <= step {
        car.decided_tile = Some((tx, ty));

        if rng.random_bool(tuning.car_return_chance.clamp(0.0, 1.0)) {
            if let Some(dir) = driveway_beside(map, tx, ty) {
                car.set_center(center);
                car.direction = dir;
                car.state = CarState::Returning;
                pull_in(car, map, dt);
                return;
            }
        }

        match choose_heading(map, tx, ty, car.direction, tuning.car_straight_weight, rng) {
            Some(dir) if dir != car.direction => {
                car.set_center(center);
                car.direction = dir;
            }
            Some(_) => {}
            None => {
                send_home(car, "dead end");
                return;
            }
        }
    }

    roll(car, map, car.speed, dt);
    if map.kind_at(car.center()) != Some(TileKind::Road) {
        send_home(car, "drove off the road");
    }
}

fn pull_in(car: &mut Car, map: &GridMap, dt: f32) {
    let step = car.speed * 0.5 * dt;
    let Some((tx, ty)) = map.tile_at(car.center()) else {
        send_home(car, "off the map");
        return;
    };

    let last_tile = map.is(tx, ty, TileKind::Driveway)
        && !map
            .neighbor(tx, ty, car.direction)
            .is_some_and(|(x, y)| map.is(x, y, TileKind::Driveway));
    if last_tile {
        let center = tile_center(tx, ty);
        let to_center = (center - car.center()).dot(car.direction.vec());
        if to_center <= step {
            car.set_center(center);
            car.vel = Vec2::ZERO;
            car.direction = car.direction.opposite();
            car.state = CarState::Parked;
            car.decided_tile = None;
            return;
        }
    }

    if !roll(car, map, car.speed * 0.5, dt) {
        send_home(car, "missed the driveway");
    }
}

/// Advance every car in ID order
pub fn advance_all(round: &mut Round, dt: f32) {
    for car in &mut round.cars {
        advance_car(car, &round.map, &round.tuning, dt, &mut round.rng);
    }
}
