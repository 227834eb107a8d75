//! Procedural city generation
//!
//! `generate` is a pure function of its config and RNG. Every placement search
//! is bounded; an exhausted search falls back to a fixed road coordinate so a
//! round always gets a playable (if plain) city.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::geom::{Direction, Rect};
use super::map::{GridMap, TileKind};
use super::state::{Car, House, HouseShape, Puddle, Tree};
use crate::consts::{PLACEMENT_ATTEMPTS, PLAYER_SIZE, ROAD_WIDTH, TILE_SIZE};
use crate::tuning::{CityConfig, RoadLayout, Tuning};
use crate::{tile_center, tile_origin};

/// Smallest block a fixed-interval layout leaves between bands
const MIN_BLOCK: usize = 3;
/// Radial samples per puddle outline
const PUDDLE_POINTS: usize = 10;
const PUDDLE_RADIUS_MIN: f32 = 10.0;
const PUDDLE_RADIUS_MAX: f32 = 15.0;
/// Chance a park tile off the pond grows a tree
const PARK_TREE_CHANCE: f64 = 0.3;
const HOUSE_PALETTES: u8 = 8;
const CAR_PALETTES: u8 = 6;

/// Everything generation produces for one round
#[derive(Debug, Clone)]
pub struct City {
    pub map: GridMap,
    pub houses: Vec<House>,
    pub cars: Vec<Car>,
    pub puddles: Vec<Puddle>,
    pub trees: Vec<Tree>,
    /// Top-left of the player box
    pub player_start: Vec2,
    /// Index into `houses`
    pub target: Option<usize>,
    /// First unused entity ID
    pub next_id: u32,
}

/// Build a complete city
pub fn generate(config: &CityConfig, tuning: &Tuning, rng: &mut impl Rng) -> City {
    let mut map = GridMap::new(config.width, config.height);
    let mut next_id = 1;

    for x in band_starts(config.width, config.layout, rng) {
        map.add_vertical_band(x);
    }
    for y in band_starts(config.height, config.layout, rng) {
        map.add_horizontal_band(y);
    }

    let mut trees = Vec::new();
    if config.park {
        match reserve_park(&mut map, rng) {
            Some(park_trees) => trees.extend(park_trees),
            None => log::warn!("No block large enough for a park"),
        }
    }

    let mut houses = place_houses(&mut map, config, config.house_density, rng, &mut next_id);
    if houses.is_empty() {
        log::warn!("House pass placed nothing, retrying at full density");
        houses = place_houses(&mut map, config, 1.0, rng, &mut next_id);
    }

    fill_gardens(&mut map);
    let scattered = scatter_trees(&map, &trees, config.tree_chance, rng);
    trees.extend(scattered);

    let player_start = spawn_point(&map);
    let keep_clear = Rect::from_center(
        player_start + Vec2::splat(PLAYER_SIZE * 0.5),
        Vec2::splat(TILE_SIZE * ROAD_WIDTH as f32),
    );
    let puddles = seed_puddles(&map, config.puddle_count, &keep_clear, rng, &mut next_id);
    let cars = seed_cars(&houses, config.car_chance, tuning.car_speed, rng, &mut next_id);
    let target = (!houses.is_empty()).then(|| rng.random_range(0..houses.len()));

    log::info!(
        "Generated {}x{} city: {} houses, {} cars, {} puddles, {} trees",
        map.width(),
        map.height(),
        houses.len(),
        cars.len(),
        puddles.len(),
        trees.len()
    );

    City {
        map,
        houses,
        cars,
        puddles,
        trees,
        player_start,
        target,
        next_id,
    }
}

fn bump(next_id: &mut u32) -> u32 {
    let id = *next_id;
    *next_id += 1;
    id
}

/// Start coordinates of the road bands along one axis. Always includes both
/// perimeter bands.
pub fn band_starts(extent: usize, layout: RoadLayout, rng: &mut impl Rng) -> Vec<usize> {
    let last = extent.saturating_sub(ROAD_WIDTH);
    let mut starts = vec![0];
    match layout {
        RoadLayout::Fixed { interval } => {
            let interval = interval.max(ROAD_WIDTH + 1);
            let mut x = interval;
            while x + ROAD_WIDTH + MIN_BLOCK <= last {
                starts.push(x);
                x += interval;
            }
        }
        RoadLayout::Randomized { min_gap, max_gap } => {
            let min_gap = min_gap.max(1);
            let max_gap = max_gap.max(min_gap);
            let mut x = 0;
            for _ in 0..extent {
                let next = x + ROAD_WIDTH + rng.random_range(min_gap..=max_gap);
                if next + ROAD_WIDTH + min_gap > last {
                    break;
                }
                starts.push(next);
                x = next;
            }
        }
    }
    if last > 0 {
        starts.push(last);
    }
    starts
}

/// The open span between consecutive bands whose middle is closest to `mid`
fn nearest_span(bands: &[usize], mid: usize) -> Option<(usize, usize)> {
    bands
        .windows(2)
        .map(|w| (w[0] + ROAD_WIDTH, w[1]))
        .filter(|&(lo, hi)| hi > lo)
        .min_by_key(|&(lo, hi)| ((lo + hi) / 2).abs_diff(mid))
}

/// Turn the central block into a park: pond in the middle, trees around it.
/// Runs before house placement so no lot can claim it.
fn reserve_park(map: &mut GridMap, rng: &mut impl Rng) -> Option<Vec<Tree>> {
    let (x0, x1) = nearest_span(map.vertical_bands(), map.width() / 2)?;
    let (y0, y1) = nearest_span(map.horizontal_bands(), map.height() / 2)?;
    if x1 - x0 < 3 || y1 - y0 < 3 {
        return None;
    }

    let center = Vec2::new((x0 + x1) as f32, (y0 + y1) as f32) * 0.5;
    let span = Vec2::new((x1 - x0) as f32, (y1 - y0) as f32);
    let radii = (span * 0.5 - Vec2::ONE).max(Vec2::splat(0.5));
    let mut trees = Vec::new();
    for ty in y0..y1 {
        for tx in x0..x1 {
            let edge = tx == x0 || ty == y0 || tx == x1 - 1 || ty == y1 - 1;
            let offset = (Vec2::new(tx as f32 + 0.5, ty as f32 + 0.5) - center) / radii;
            if !edge && offset.length() < 0.8 {
                map.set(tx, ty, TileKind::Water);
            } else {
                map.set(tx, ty, TileKind::Garden);
                if !edge && rng.random_bool(PARK_TREE_CHANCE) {
                    trees.push(Tree::new(tile_center(tx, ty)));
                }
            }
        }
    }
    log::debug!("Park reserved at tiles {x0}..{x1} x {y0}..{y1}");
    Some(trees)
}

/// A lot that fits, worked out before anything is painted
#[derive(Debug, Clone, Copy)]
struct LotPlan {
    x: usize,
    y: usize,
    facing: Direction,
    driveway_col: usize,
    /// House columns, half-open
    cols: (usize, usize),
    /// House rows, half-open
    rows: (usize, usize),
}

fn plan_lot(
    map: &GridMap,
    x: usize,
    y: usize,
    facing: Direction,
    config: &CityConfig,
    rng: &mut impl Rng,
) -> Option<LotPlan> {
    let (w, d) = (config.lot_width, config.lot_depth);
    if x + w > map.width() || y + d > map.height() {
        return None;
    }
    let footprint_free = (y..y + d).all(|ty| (x..x + w).all(|tx| map.is(tx, ty, TileKind::Grass)));
    if !footprint_free {
        return None;
    }

    let road_row = match facing {
        Direction::Up => y.checked_sub(1)?,
        Direction::Down => y + d,
        _ => return None,
    };
    if !(x..x + w).all(|tx| map.is(tx, road_row, TileKind::Road)) {
        return None;
    }

    let side_road = |col: Option<usize>| {
        col.is_some_and(|tx| (y..y + d).any(|ty| map.is(tx, ty, TileKind::Road)))
    };
    let left_road = side_road(x.checked_sub(1));
    let right_road = side_road(Some(x + w));
    // Driveway goes on the side away from any side road
    let driveway_left = match (left_road, right_road) {
        (true, false) => false,
        (false, true) => true,
        _ => rng.random_bool(0.5),
    };

    let (driveway_col, mut lo, mut hi) = if driveway_left {
        (x, x + 1, x + w)
    } else {
        (x + w - 1, x, x + w - 1)
    };
    if left_road && !driveway_left {
        lo += 1;
    }
    if right_road && driveway_left {
        hi -= 1;
    }
    if hi < lo + 2 {
        return None;
    }

    // Front row is the yard
    let rows = match facing {
        Direction::Up => (y + 1, y + d),
        _ => (y, y + d - 1),
    };
    if rows.1 <= rows.0 {
        return None;
    }

    Some(LotPlan {
        x,
        y,
        facing,
        driveway_col,
        cols: (lo, hi),
        rows,
    })
}

fn build_house(
    map: &mut GridMap,
    plan: &LotPlan,
    config: &CityConfig,
    rng: &mut impl Rng,
    id: u32,
) -> House {
    let (w, d) = (config.lot_width, config.lot_depth);
    for ty in plan.y..plan.y + d {
        for tx in plan.x..plan.x + w {
            map.set(tx, ty, TileKind::Garden);
        }
        map.set(plan.driveway_col, ty, TileKind::Driveway);
    }

    let (lo, hi) = plan.cols;
    let (top, bottom) = plan.rows;
    let deep_enough = bottom - top >= 2;
    let shape = if deep_enough && rng.random_bool(config.l_shape_chance.clamp(0.0, 1.0)) {
        let back_row = if plan.facing == Direction::Up { bottom - 1 } else { top };
        let col = if rng.random_bool(0.5) { lo } else { hi - 1 };
        HouseShape::LShaped { notch: (col, back_row) }
    } else {
        HouseShape::Rectangular
    };

    for ty in top..bottom {
        for tx in lo..hi {
            if shape != (HouseShape::LShaped { notch: (tx, ty) }) {
                map.set(tx, ty, TileKind::House);
            }
        }
    }
    if let HouseShape::LShaped { notch: (nx, ny) } = shape {
        if rng.random_bool(config.pool_chance.clamp(0.0, 1.0)) {
            map.set(nx, ny, TileKind::Water);
        }
    }

    let door_y = match plan.facing {
        Direction::Up => plan.y,
        _ => plan.y + d,
    };
    House {
        id,
        rect: Rect::new(
            tile_origin(lo, top),
            Vec2::new((hi - lo) as f32, (bottom - top) as f32) * TILE_SIZE,
        ),
        facing: plan.facing,
        is_target: false,
        door: Vec2::new((lo + hi) as f32 * 0.5, door_y as f32) * TILE_SIZE,
        driveway: Rect::new(
            tile_origin(plan.driveway_col, plan.y),
            Vec2::new(TILE_SIZE, d as f32 * TILE_SIZE),
        ),
        shape,
        palette: rng.random_range(0..HOUSE_PALETTES),
    }
}

fn place_houses(
    map: &mut GridMap,
    config: &CityConfig,
    density: f64,
    rng: &mut impl Rng,
    next_id: &mut u32,
) -> Vec<House> {
    let density = density.clamp(0.0, 1.0);
    let mut houses = Vec::new();
    for y in 0..map.height() {
        for x in 0..map.width() {
            let plan = [Direction::Up, Direction::Down]
                .into_iter()
                .find_map(|facing| plan_lot(map, x, y, facing, config, rng));
            if let Some(plan) = plan {
                if rng.random_bool(density) {
                    let id = bump(next_id);
                    houses.push(build_house(map, &plan, config, rng, id));
                }
            }
        }
    }
    houses
}

fn touches(map: &GridMap, tx: usize, ty: usize, kind: TileKind) -> bool {
    Direction::ALL
        .iter()
        .any(|&dir| map.neighbor(tx, ty, dir).is_some_and(|(x, y)| map.is(x, y, kind)))
}

/// Leftover grass becomes garden; garden beside a road becomes sidewalk
fn fill_gardens(map: &mut GridMap) {
    for (tx, ty) in map.tiles_of(TileKind::Grass) {
        map.set(tx, ty, TileKind::Garden);
    }
    let sidewalk: Vec<_> = map
        .tiles_of(TileKind::Garden)
        .into_iter()
        .filter(|&(tx, ty)| touches(map, tx, ty, TileKind::Road))
        .collect();
    for (tx, ty) in sidewalk {
        map.set(tx, ty, TileKind::Footpath);
    }
}

fn scatter_trees(map: &GridMap, existing: &[Tree], chance: f64, rng: &mut impl Rng) -> Vec<Tree> {
    let chance = chance.clamp(0.0, 1.0);
    map.tiles_of(TileKind::Garden)
        .into_iter()
        .filter(|&(tx, ty)| {
            !touches(map, tx, ty, TileKind::Road) && !touches(map, tx, ty, TileKind::Driveway)
        })
        .map(|(tx, ty)| tile_center(tx, ty))
        .filter(|pos| existing.iter().all(|t| t.pos != *pos))
        .filter(|_| rng.random_bool(chance))
        .map(Tree::new)
        .collect()
}

/// Player start: middle of the central intersection
pub fn spawn_point(map: &GridMap) -> Vec2 {
    let middle = |bands: &[usize]| bands.get(bands.len() / 2).copied().unwrap_or(0);
    let tx = middle(map.vertical_bands());
    let ty = middle(map.horizontal_bands());
    let center = tile_origin(tx, ty) + Vec2::splat(TILE_SIZE * ROAD_WIDTH as f32 * 0.5);
    center - Vec2::splat(PLAYER_SIZE * 0.5)
}

/// Organic puddle: a ring of radially jittered points
pub fn irregular_puddle(id: u32, center: Vec2, radius: f32, rng: &mut impl Rng) -> Puddle {
    let outline: Vec<Vec2> = (0..PUDDLE_POINTS)
        .map(|i| {
            let angle = i as f32 / PUDDLE_POINTS as f32 * TAU + rng.random_range(-0.2..0.2);
            let r = radius * rng.random_range(0.65..1.15);
            center + Vec2::new(angle.cos(), angle.sin()) * r
        })
        .collect();
    let bounds = Rect::bounding(&outline);
    Puddle { id, outline, bounds }
}

fn find_puddle_spot(
    map: &GridMap,
    roads: &[(usize, usize)],
    placed: &[Puddle],
    keep_clear: &Rect,
    id: u32,
    rng: &mut impl Rng,
) -> Option<Puddle> {
    for _ in 0..PLACEMENT_ATTEMPTS {
        let &(tx, ty) = roads.choose(rng)?;
        let jitter = Vec2::new(rng.random_range(-8.0..8.0), rng.random_range(-8.0..8.0));
        let radius = rng.random_range(PUDDLE_RADIUS_MIN..PUDDLE_RADIUS_MAX);
        let puddle = irregular_puddle(id, tile_center(tx, ty) + jitter, radius, rng);
        let on_road = puddle
            .bounds
            .corners()
            .iter()
            .all(|&c| map.kind_at(c) == Some(TileKind::Road));
        if on_road
            && !puddle.bounds.overlaps(keep_clear)
            && placed.iter().all(|p| !p.bounds.overlaps(&puddle.bounds))
        {
            return Some(puddle);
        }
    }
    None
}

fn seed_puddles(
    map: &GridMap,
    count: usize,
    keep_clear: &Rect,
    rng: &mut impl Rng,
    next_id: &mut u32,
) -> Vec<Puddle> {
    let roads = map.tiles_of(TileKind::Road);
    let fallback = tile_center(map.width().saturating_sub(1), map.height().saturating_sub(1));
    let mut puddles = Vec::with_capacity(count);
    for _ in 0..count {
        let id = bump(next_id);
        let puddle = match find_puddle_spot(map, &roads, &puddles, keep_clear, id, rng) {
            Some(puddle) => puddle,
            None => {
                log::warn!("Puddle {id} placement exhausted, using fallback corner");
                irregular_puddle(id, fallback, PUDDLE_RADIUS_MIN, rng)
            }
        };
        puddles.push(puddle);
    }
    puddles
}

/// Center of the driveway tile that touches the road
pub fn driveway_mouth(house: &House) -> Vec2 {
    let half = Vec2::splat(TILE_SIZE * 0.5);
    match house.facing {
        Direction::Up => house.driveway.pos + half,
        _ => house.driveway.max() - half,
    }
}

fn seed_cars(
    houses: &[House],
    chance: f64,
    speed: f32,
    rng: &mut impl Rng,
    next_id: &mut u32,
) -> Vec<Car> {
    let mut cars = Vec::new();
    for house in houses {
        if rng.random_bool(chance.clamp(0.0, 1.0)) {
            let id = bump(next_id);
            let palette = rng.random_range(0..CAR_PALETTES);
            cars.push(Car::parked(id, driveway_mouth(house), house.facing, speed, palette));
        }
    }
    cars
}
