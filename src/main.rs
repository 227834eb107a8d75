//! Route Rush headless runner
//!
//! Plays rounds on autopilot and prints a HUD line per simulated second.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use serde_json::json;

use route_rush::audio::{AudioManager, LogSink, SoundEffect};
use route_rush::sim::{CarState, HudSnapshot, Round, RoundEnd, TickInput};
use route_rush::{CityConfig, GameConfig, HighScores, MovementMode};

#[derive(Parser, Debug)]
#[command(name = "route-rush")]
#[command(about = "Play Route Rush rounds headless on autopilot")]
struct Cli {
    /// Seed for the first round (random if omitted); later rounds add 1
    #[arg(long)]
    seed: Option<u64>,

    /// Number of rounds to play
    #[arg(long, default_value = "1")]
    rounds: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.05")]
    delta: f32,

    /// Give up on a round after this many ticks
    #[arg(long, default_value = "20000")]
    max_ticks: u32,

    /// JSON game config (partial files are fine)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the sprawl city preset (random gaps and a park)
    #[arg(long)]
    sprawl: bool,

    /// Dash with a cooldown instead of boost charges
    #[arg(long)]
    dash: bool,

    /// Print HUD lines as JSON
    #[arg(long)]
    json: bool,

    /// Draw the city before and after each round
    #[arg(long)]
    map: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    anyhow::ensure!(
        cli.delta.is_finite() && cli.delta > 0.0,
        "--delta must be a positive number of seconds"
    );

    let config = build_config(&cli)?;
    let base_seed = cli.seed.unwrap_or_else(rand::random);
    let mut audio = AudioManager::new(LogSink, config.settings.clone());
    let mut scores = HighScores::new();

    for n in 1..=cli.rounds {
        let seed = base_seed.wrapping_add(u64::from(n - 1));
        match play_round(&cli, &config, seed, &mut audio)? {
            Some(end) => {
                if scores.record(&end, n) == Some(1) {
                    audio.play(SoundEffect::HighScore);
                }
            }
            None => log::warn!("Round {n} (seed {seed}) hit the tick limit"),
        }
        audio.back_to_menu();
    }

    println!("=== High Scores ===");
    for (i, entry) in scores.entries.iter().enumerate() {
        println!(
            "{:>2}. {:>4} pts  {:>3} deliveries  {:?}  (round {})",
            i + 1,
            entry.score,
            entry.deliveries,
            entry.reason,
            entry.round
        );
    }
    if scores.is_empty() {
        println!("(no scoring rounds)");
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<GameConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            GameConfig::load(path).with_context(|| format!("loading config {}", path.display()))?
        }
        None => GameConfig::default(),
    };
    if cli.sprawl {
        config.city = CityConfig::sprawl();
    }
    if cli.dash {
        config.tuning.movement_mode = MovementMode::Dash;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn play_round(
    cli: &Cli,
    config: &GameConfig,
    seed: u64,
    audio: &mut AudioManager<LogSink>,
) -> Result<Option<RoundEnd>> {
    let mut round = Round::new(config, seed);
    println!(
        "=== Round seed {seed}: {} houses, {} cars, {} puddles ===",
        round.houses.len(),
        round.cars.len(),
        round.puddles.len()
    );
    if cli.map {
        println!("{}", draw_map(&round));
    }

    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };
    let ticks_per_second = ((1.0 / cli.delta).ceil() as u32).max(1);
    for tick in 1..=cli.max_ticks {
        let hud = round.tick(&input, cli.delta);
        audio.handle_all(&round.take_events());
        if tick % ticks_per_second == 0 || round.is_over() {
            report(cli, seed, tick, &hud)?;
        }
        if round.is_over() {
            break;
        }
    }

    if cli.map {
        println!("{}", draw_map(&round));
    }
    Ok(round.outcome())
}

fn report(cli: &Cli, seed: u64, tick: u32, hud: &HudSnapshot) -> Result<()> {
    let simulated = tick as f32 * cli.delta;
    if cli.json {
        let line = json!({ "seed": seed, "tick": tick, "simulated": simulated, "hud": hud });
        println!("{}", serde_json::to_string(&line).context("serializing HUD")?);
    } else {
        println!(
            "[{simulated:>6.1}s] score={:<3} time={:>5.1} health={}/{} combo={} boost={}{} phase={:?}",
            hud.score,
            hud.time_remaining,
            hud.health,
            hud.max_health,
            hud.combo,
            hud.boost_charge,
            if hud.boost_unlocked { "" } else { " (locked)" },
            hud.phase
        );
    }
    Ok(())
}

/// Tile map with entities overlaid
fn draw_map(round: &Round) -> String {
    let mut rows: Vec<Vec<char>> = round
        .map
        .to_ascii()
        .lines()
        .map(|line| line.chars().collect())
        .collect();
    let mut mark = |p: Vec2, glyph: char| {
        if let Some((tx, ty)) = round.map.tile_at(p) {
            rows[ty][tx] = glyph;
        }
    };

    for puddle in &round.puddles {
        mark(puddle.bounds.center(), 'o');
    }
    for tree in &round.trees {
        mark(tree.pos, 'T');
    }
    for powerup in &round.powerups {
        mark(powerup.pos, '*');
    }
    for car in &round.cars {
        mark(car.center(), if car.state == CarState::Parked { 'c' } else { 'C' });
    }
    if let Some(house) = round.target_house() {
        mark(house.rect.center(), 'X');
    }
    mark(round.player.center(), '@');

    rows.into_iter()
        .map(|row| row.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
