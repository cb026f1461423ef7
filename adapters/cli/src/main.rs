#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Dungeon Warden session.

use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use dungeon_warden_cli::session::{GameSession, SessionConfig};
use dungeon_warden_core::{FloorId, GridPos};
use dungeon_warden_system_builder::{monster_palette, trap_palette, treasure_palette};
use dungeon_warden_world::query;

/// Command-line options for the headless runner.
#[derive(Debug, Parser)]
#[command(name = "dungeon-warden", about = "Runs a headless Dungeon Warden session")]
struct Args {
    /// Number of 100ms simulation ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Seed shared by the spawning and decision randomness.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Spawn chance rolled once per tenth of simulated second.
    #[arg(long, default_value_t = 0.001)]
    spawn_chance: f64,
    /// Save string to restore before the run starts.
    #[arg(long)]
    load: Option<String>,
    /// Print a save string when the run finishes.
    #[arg(long)]
    save: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut session = GameSession::new(SessionConfig {
        seed: args.seed,
        spawn_chance: args.spawn_chance,
    });
    if let Some(value) = &args.load {
        session
            .load(value)
            .context("could not restore the provided save string")?;
    } else {
        furnish(&mut session);
    }

    println!("{}", query::welcome_banner(session.dungeon()));
    for _ in 0..args.ticks {
        let _ = session.tick(Duration::from_millis(100));
        if session.is_over() {
            println!("An adventurer reached the dungeon core. The run is over.");
            break;
        }
    }

    report(&session);
    if args.save {
        println!("{}", session.save());
    }
    Ok(())
}

/// Stocks the starting room with one of each palette's cheapest entry.
fn furnish(session: &mut GameSession) {
    let floor = FloorId::new(1);
    let placements = [
        (monster_palette().remove(0), GridPos::new(4, 4)),
        (trap_palette().remove(0), GridPos::new(6, 3)),
        (treasure_palette().remove(0), GridPos::new(3, 6)),
    ];
    for (blueprint, at) in placements {
        if session.select_blueprint(&blueprint) {
            let outcome = session.click(floor, at);
            log::debug!("furnished {at:?}: {outcome:?}");
        }
    }
}

fn report(session: &GameSession) {
    let agents = query::agent_view(session.dungeon());
    println!(
        "floors: {}  points: {}  reputation: {}  adventurers inside: {}",
        query::floor_count(session.dungeon()),
        session.dungeon_points(),
        session.reputation(),
        agents.len(),
    );
    if let Some(core) = query::core(session.dungeon()) {
        println!("core: {}/{} hp at {:?}", core.hp, core.max_hp, core.position);
    }
}
