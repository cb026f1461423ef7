//! Outer game loop tying the world, the pure systems, and the economy.

use std::time::Duration;

use dungeon_warden_core::{AgentClass, Command, Event, FloorId, GridPos};
use dungeon_warden_system_agents::AgentBehavior;
use dungeon_warden_system_builder::{Blueprint, Builder, ClickOutcome, TileInfo};
use dungeon_warden_system_spawning::{Config as SpawnConfig, Spawning};
use dungeon_warden_world::{self as world, query, snapshot, Dungeon};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::save_transfer::{self, SaveTransferError};

/// Dungeon points the player starts a fresh session with.
pub const STARTING_POINTS: u32 = 1000;

/// Dungeon points earned per level of a fallen adventurer.
const DEATH_REWARD_PER_LEVEL: u32 = 50;
/// Loot value converted into one reputation point on escape.
const LOOT_PER_REPUTATION: u32 = 50;
/// Reputation earned when an adventurer leaves empty-handed.
const CLEAN_ESCAPE_REPUTATION: u32 = 2;

/// Tunable knobs for a new session.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Seed shared by the spawning and decision randomness.
    pub seed: u64,
    /// Spawn chance rolled once per tenth of simulated second.
    pub spawn_chance: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            spawn_chance: 0.001,
        }
    }
}

/// A running game: the authoritative dungeon plus every pure system and the
/// player-facing economy.
#[derive(Debug)]
pub struct GameSession {
    dungeon: Dungeon,
    builder: Builder,
    behavior: AgentBehavior,
    spawning: Spawning,
    rng: ChaCha8Rng,
    dungeon_points: u32,
    reputation: u32,
    core_breached: bool,
}

impl GameSession {
    /// Creates a fresh session over a newly generated dungeon.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            dungeon: Dungeon::new(),
            builder: Builder::new(),
            behavior: AgentBehavior::new(config.seed),
            spawning: Spawning::new(SpawnConfig::new(config.spawn_chance, config.seed)),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            dungeon_points: STARTING_POINTS,
            reputation: 0,
            core_breached: false,
        }
    }

    /// The authoritative dungeon, for read-only queries.
    #[must_use]
    pub fn dungeon(&self) -> &Dungeon {
        &self.dungeon
    }

    /// Dungeon points currently available to spend.
    #[must_use]
    pub const fn dungeon_points(&self) -> u32 {
        self.dungeon_points
    }

    /// Reputation accumulated from departed adventurers.
    #[must_use]
    pub const fn reputation(&self) -> u32 {
        self.reputation
    }

    /// Whether an adventurer has reached the core, ending the session.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.core_breached
    }

    /// Price of raising or demolishing the next wall.
    #[must_use]
    pub const fn wall_price(&self) -> u32 {
        self.builder.wall_build_cost()
    }

    /// Advances simulated time by `dt` and pumps the systems until they go
    /// quiet, returning every event broadcast along the way.
    pub fn tick(&mut self, dt: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.dungeon, Command::Tick { dt }, &mut events);
        let mut collected = events.clone();

        // Systems only react to events, so the pump settles once a round
        // emits no commands. Spawning triggers exclusively on the initial
        // TimeAdvanced, which keeps the loop finite.
        loop {
            let mut commands = Vec::new();
            self.spawning.handle(&events, &mut commands);
            {
                let agents = query::agent_view(&self.dungeon);
                let view = query::dungeon_view(&self.dungeon);
                self.behavior.handle(&events, &agents, view, &mut commands);
            }
            if commands.is_empty() {
                break;
            }
            events.clear();
            for command in commands {
                world::apply(&mut self.dungeon, command, &mut events);
            }
            collected.extend(events.iter().cloned());
        }

        for event in &collected {
            self.settle(event);
        }
        collected
    }

    /// Selects a palette blueprint, paying its price up front.
    pub fn select_blueprint(&mut self, blueprint: &Blueprint) -> bool {
        let points = &mut self.dungeon_points;
        self.builder
            .select_blueprint(blueprint, |cost| debit(points, cost))
    }

    /// Switches to wall-building mode.
    pub fn begin_wall_building(&mut self) {
        self.builder.begin_wall_building();
    }

    /// Switches to wall-destroying mode.
    pub fn begin_wall_demolition(&mut self) {
        self.builder.begin_wall_demolition();
    }

    /// Drops the active tool and any pending move.
    pub fn cancel_tool(&mut self) {
        self.builder.cancel();
    }

    /// Appends a new floor below the deepest one, when affordable.
    pub fn add_floor(&mut self) -> bool {
        let mut commands = Vec::new();
        let points = &mut self.dungeon_points;
        if !self.builder.add_floor(|cost| debit(points, cost), &mut commands) {
            return false;
        }
        self.run(commands);
        true
    }

    /// Carves a randomly sampled room expansion into the floor.
    pub fn expand_room(&mut self, floor: FloorId) -> bool {
        let mut commands = Vec::new();
        let points = &mut self.dungeon_points;
        let accepted =
            self.builder
                .expand_room(floor, &mut self.rng, |cost| debit(points, cost), &mut commands);
        if accepted {
            self.run(commands);
        }
        accepted
    }

    /// Routes a click on the given cell through the active builder tool.
    pub fn click(&mut self, floor: FloorId, at: GridPos) -> ClickOutcome {
        let mut commands = Vec::new();
        let dungeon = &self.dungeon;
        let points = &mut self.dungeon_points;
        let outcome = self.builder.handle_click(
            floor,
            at,
            |floor, at| {
                let tile = query::floor(dungeon, floor)?.tile(at)?;
                Some(TileInfo {
                    kind: tile.kind(),
                    occupied: tile.occupant().is_some(),
                })
            },
            |cost| debit(points, cost),
            &mut commands,
        );
        self.run(commands);
        outcome
    }

    /// Translates a pixel click into a grid click.
    pub fn click_at_pixel(
        &mut self,
        floor: FloorId,
        x: f32,
        y: f32,
        tile_size: f32,
    ) -> ClickOutcome {
        if tile_size <= 0.0 || x < 0.0 || y < 0.0 {
            return ClickOutcome::Ignored;
        }
        let at = GridPos::new((x / tile_size) as u32, (y / tile_size) as u32);
        self.click(floor, at)
    }

    /// Admits a specific adventurer at the floor-1 entrance.
    pub fn spawn_adventurer(&mut self, class: AgentClass, name: impl Into<String>, level: u32) {
        self.run(vec![Command::SpawnAgent {
            class,
            name: name.into(),
            level,
        }]);
    }

    /// Encodes the dungeon into a single-line save string. Adventurers are
    /// transient and never saved.
    #[must_use]
    pub fn save(&self) -> String {
        save_transfer::encode(&snapshot::capture(&self.dungeon))
    }

    /// Replaces the dungeon with one restored from a save string.
    ///
    /// # Errors
    ///
    /// Returns the decode failure when the save string is malformed; the
    /// running dungeon is left untouched in that case.
    pub fn load(&mut self, value: &str) -> Result<(), SaveTransferError> {
        let decoded = save_transfer::decode(value)?;
        self.dungeon = snapshot::restore(decoded);
        self.builder.cancel();
        Ok(())
    }

    fn run(&mut self, commands: Vec<Command>) {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.dungeon, command, &mut events);
        }
        for event in &events {
            self.settle(event);
        }
    }

    fn settle(&mut self, event: &Event) {
        match event {
            Event::AgentSpawned {
                name, class, level, ..
            } => {
                log::info!("{name} (level {level} {}) entered the dungeon", class.label());
            }
            Event::TrapSprung { agent, damage, .. } => {
                log::debug!("trap sprang under {agent:?} for {damage}");
            }
            Event::TreasureLooted { agent, value, .. } => {
                log::info!("{agent:?} pocketed treasure worth {value}");
            }
            Event::AgentDied { agent, level } => {
                self.dungeon_points = self
                    .dungeon_points
                    .saturating_add(level * DEATH_REWARD_PER_LEVEL);
                self.reputation += 1;
                log::info!("{agent:?} fell; the dungeon grows richer");
            }
            Event::AgentEscaped { agent, loot } => {
                self.reputation += if *loot > 0 {
                    loot / LOOT_PER_REPUTATION
                } else {
                    CLEAN_ESCAPE_REPUTATION
                };
                log::info!("{agent:?} escaped carrying {loot}");
            }
            Event::AgentDescended { agent, floor } => {
                log::info!("{agent:?} descended to floor {}", floor.get());
            }
            Event::CoreReached { agent } => {
                self.core_breached = true;
                log::warn!("{agent:?} reached the dungeon core");
            }
            _ => {}
        }
    }
}

fn debit(points: &mut u32, cost: u32) -> bool {
    if *points >= cost {
        *points -= cost;
        true
    } else {
        false
    }
}
