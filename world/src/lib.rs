#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative dungeon state for Dungeon Warden.
//!
//! The world owns every floor grid, the core record, and the live
//! adventurers. All mutation flows through [`apply`], which executes one
//! [`Command`] deterministically and broadcasts the resulting [`Event`]s.
//! Read access goes through the [`query`] module and the snapshot types in
//! [`snapshot`].

use std::time::Duration;

use dungeon_warden_core::{
    combat, AgentClass, AgentId, AgentStats, Command, Direction, DungeonCore, Event, FloorId,
    GridPos, MoveError, Occupant, OccupantKind, PlacementError, TileKind, BuildError,
    TRAP_REARM_DELAY, WELCOME_BANNER,
};

mod floor;
pub mod snapshot;

pub use floor::{Floor, Tile, ENTRANCE_CELL, FLOOR_HEIGHT, FLOOR_WIDTH, STAIRS_CELL};

/// Cell the dungeon core starts on when a dungeon is created.
pub const CORE_CELL: GridPos = GridPos::new(5, 5);
/// Starting and maximum hit points of the dungeon core.
pub const CORE_MAX_HP: u32 = 100;

/// Adventurers within this distance of the core cell have reached it.
const CORE_PROXIMITY: f32 = 0.5;
/// Positions within this distance of the target snap onto it.
const SNAP_EPSILON: f32 = 0.1;
/// Axis deltas below this threshold are treated as already aligned.
const AXIS_EPSILON: f32 = 0.01;

/// Represents the authoritative Dungeon Warden state.
#[derive(Debug)]
pub struct Dungeon {
    banner: &'static str,
    floors: Vec<Floor>,
    core: Option<DungeonCore>,
    agents: Vec<Agent>,
    next_agent_id: u32,
}

impl Dungeon {
    /// Creates a dungeon with a single generated floor and the core anchored
    /// at its starting cell.
    #[must_use]
    pub fn new() -> Self {
        let mut dungeon = Self {
            banner: WELCOME_BANNER,
            floors: vec![Floor::new(FloorId::new(1))],
            core: None,
            agents: Vec::new(),
            next_agent_id: 0,
        };
        dungeon.initialize_core();
        dungeon
    }

    pub(crate) fn from_parts(floors: Vec<Floor>, core: Option<DungeonCore>) -> Self {
        let mut dungeon = Self {
            banner: WELCOME_BANNER,
            floors,
            core,
            agents: Vec::new(),
            next_agent_id: 0,
        };
        if dungeon.floors.is_empty() {
            dungeon.floors.push(Floor::new(FloorId::new(1)));
        }
        if dungeon.core.is_none() {
            dungeon.initialize_core();
        }
        dungeon
    }

    pub(crate) fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub(crate) fn core_record(&self) -> Option<DungeonCore> {
        self.core
    }

    /// Anchors the core record to the first floor, stamping the marker onto
    /// its starting cell when no core tile exists yet.
    fn initialize_core(&mut self) {
        let Some(first) = self.floors.first_mut() else {
            return;
        };
        let position = match first.find_tile(TileKind::Core) {
            Some(position) => position,
            None => {
                if let Some(tile) = first.tile_mut(CORE_CELL) {
                    tile.overlay_special(TileKind::Core);
                }
                CORE_CELL
            }
        };
        self.core = Some(DungeonCore {
            position,
            hp: CORE_MAX_HP,
            max_hp: CORE_MAX_HP,
        });
    }

    fn agent_index(&self, agent: AgentId) -> Option<usize> {
        self.agents.iter().position(|state| state.id == agent)
    }

    fn rearm_traps(&mut self, dt: Duration) {
        for floor in &mut self.floors {
            floor.tick_traps(dt);
        }
    }

    fn advance_agents(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let dt_secs = dt.as_secs_f32();
        for index in 0..self.agents.len() {
            let agent = &mut self.agents[index];
            if agent.phase != AgentPhase::Active {
                continue;
            }
            agent.advance(dt_secs);
            if agent.is_at_target() {
                arrival_effects(&mut self.floors, agent, out_events);
            }
            if let Some(core) = &self.core {
                report_core_proximity(core, agent, out_events);
            }
        }
    }

    fn reap_agents(&mut self) {
        self.agents.retain(|agent| agent.phase == AgentPhase::Active);
    }
}

impl Default for Dungeon {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of a live adventurer; terminal phases are reaped after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AgentPhase {
    Active,
    Dead,
    Escaped,
}

/// An adventurer inhabiting the dungeon.
#[derive(Clone, Debug)]
struct Agent {
    id: AgentId,
    class: AgentClass,
    name: String,
    level: u32,
    hp: u32,
    max_hp: u32,
    attack: u32,
    defense: u32,
    speed: f32,
    x: f32,
    y: f32,
    target: GridPos,
    direction: Direction,
    floor: FloorId,
    escape_mode: bool,
    loot: u32,
    last_move: Option<GridPos>,
    needs_decision: bool,
    core_reported: bool,
    phase: AgentPhase,
}

impl Agent {
    fn spawn(id: AgentId, class: AgentClass, name: String, level: u32, at: GridPos) -> Self {
        let stats = AgentStats::for_level(level);
        Self {
            id,
            class,
            name,
            level,
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            attack: stats.attack,
            defense: stats.defense,
            speed: stats.speed,
            x: at.x() as f32,
            y: at.y() as f32,
            target: at,
            direction: Direction::South,
            floor: FloorId::new(1),
            escape_mode: false,
            loot: 0,
            last_move: None,
            needs_decision: true,
            core_reported: false,
            phase: AgentPhase::Active,
        }
    }

    /// Grid cell the adventurer currently stands in.
    fn cell(&self) -> GridPos {
        GridPos::new(self.x as u32, self.y as u32)
    }

    fn is_at_target(&self) -> bool {
        self.x == self.target.x() as f32 && self.y == self.target.y() as f32
    }

    /// Interpolates one tick of motion toward the target, each axis clamped
    /// independently, snapping once both axes land within epsilon.
    fn advance(&mut self, dt_secs: f32) {
        let target_x = self.target.x() as f32;
        let target_y = self.target.y() as f32;
        let step = self.speed * dt_secs;

        let dx = target_x - self.x;
        if dx.abs() > AXIS_EPSILON {
            self.x += dx.signum() * step.min(dx.abs());
        }
        let dy = target_y - self.y;
        if dy.abs() > AXIS_EPSILON {
            self.y += dy.signum() * step.min(dy.abs());
        }

        if (self.x - target_x).abs() < SNAP_EPSILON && (self.y - target_y).abs() < SNAP_EPSILON {
            self.x = target_x;
            self.y = target_y;
        }
    }

    /// Flags the adventurer as waiting for a decision. Returns `true` only on
    /// the transition so the event fires once.
    fn mark_decision_needed(&mut self) -> bool {
        if self.needs_decision {
            false
        } else {
            self.needs_decision = true;
            true
        }
    }

    /// An adventurer escapes through the entrance when wounded to half
    /// health or carrying any loot.
    fn wants_to_escape(&self) -> bool {
        self.hp * 2 <= self.max_hp || self.loot > 0
    }
}

/// Applies a command to the dungeon, mutating it and emitting events.
pub fn apply(dungeon: &mut Dungeon, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            dungeon.rearm_traps(dt);
            dungeon.advance_agents(dt, out_events);
            dungeon.reap_agents();
        }
        Command::AddFloor => {
            let floor = FloorId::new(dungeon.floors.len() as u32 + 1);
            dungeon.floors.push(Floor::new(floor));
            out_events.push(Event::FloorAdded { floor });
        }
        Command::CarveRoom { floor, rect } => {
            if let Some(state) = floor_mut(&mut dungeon.floors, floor) {
                state.carve_room(rect);
                out_events.push(Event::RoomCarved { floor, rect });
            }
        }
        Command::PlaceOccupant {
            floor,
            at,
            occupant,
        } => {
            let kind = occupant.kind();
            let outcome = match floor_mut(&mut dungeon.floors, floor) {
                Some(state) => state.place_occupant(occupant, at),
                None => Err(PlacementError::MissingFloor),
            };
            match outcome {
                Ok(()) => out_events.push(Event::OccupantPlaced { floor, at, kind }),
                Err(reason) => out_events.push(Event::PlacementRejected { floor, at, reason }),
            }
        }
        Command::RemoveOccupant { floor, at } => {
            let removed = floor_mut(&mut dungeon.floors, floor)
                .and_then(|state| state.remove_occupant(at));
            if removed.is_some() {
                out_events.push(Event::OccupantRemoved { floor, at });
            }
        }
        Command::BuildWall { floor, at } => match validate_build(&dungeon.floors, floor, at) {
            Ok(()) => {
                if let Some(tile) = tile_mut(&mut dungeon.floors, floor, at) {
                    tile.set_kind(TileKind::Wall);
                    out_events.push(Event::WallBuilt { floor, at });
                }
            }
            Err(reason) => out_events.push(Event::BuildRejected { floor, at, reason }),
        },
        Command::DemolishWall { floor, at } => {
            match validate_demolish(&dungeon.floors, floor, at) {
                Ok(()) => {
                    if let Some(tile) = tile_mut(&mut dungeon.floors, floor, at) {
                        tile.set_kind(TileKind::Floor);
                        out_events.push(Event::WallDemolished { floor, at });
                    }
                }
                Err(reason) => out_events.push(Event::BuildRejected { floor, at, reason }),
            }
        }
        Command::MoveOccupant {
            floor_from,
            from,
            floor_to,
            to,
        } => {
            match validate_occupant_move(&dungeon.floors, floor_from, from, floor_to, to) {
                Ok(()) => {
                    let occupant = floor_mut(&mut dungeon.floors, floor_from)
                        .and_then(|state| state.remove_occupant(from));
                    if let Some(occupant) = occupant {
                        if let Some(tile) = tile_mut(&mut dungeon.floors, floor_to, to) {
                            tile.set_occupant(occupant);
                            out_events.push(Event::OccupantMoved {
                                floor_from,
                                from,
                                floor_to,
                                to,
                            });
                        }
                    }
                }
                Err(reason) => out_events.push(Event::MoveRejected {
                    floor_to,
                    to,
                    reason,
                }),
            }
        }
        Command::MoveSpecialTile {
            floor_from,
            from,
            floor_to,
            to,
        } => {
            match validate_special_move(&dungeon.floors, floor_from, from, floor_to, to) {
                Ok(kind) => {
                    if let Some(tile) = tile_mut(&mut dungeon.floors, floor_from, from) {
                        tile.restore_underlay();
                    }
                    if let Some(tile) = tile_mut(&mut dungeon.floors, floor_to, to) {
                        tile.overlay_special(kind);
                    }
                    // The core record only tracks the marker on the first
                    // floor; deeper copies would leave it unreachable.
                    if kind == TileKind::Core && floor_to == FloorId::new(1) {
                        if let Some(core) = &mut dungeon.core {
                            core.position = to;
                        }
                    }
                    out_events.push(Event::SpecialTileMoved {
                        kind,
                        floor_from,
                        from,
                        floor_to,
                        to,
                    });
                }
                Err(reason) => out_events.push(Event::MoveRejected {
                    floor_to,
                    to,
                    reason,
                }),
            }
        }
        Command::SpawnAgent { class, name, level } => {
            let entrance = floor_at(&dungeon.floors, FloorId::new(1))
                .and_then(|state| state.find_tile(TileKind::Entrance));
            let Some(at) = entrance else {
                return;
            };
            let id = AgentId::new(dungeon.next_agent_id);
            dungeon.next_agent_id += 1;
            dungeon
                .agents
                .push(Agent::spawn(id, class, name.clone(), level, at));
            out_events.push(Event::AgentSpawned {
                agent: id,
                class,
                name,
                level,
                at,
            });
            out_events.push(Event::DecisionNeeded { agent: id });
        }
        Command::SetAgentTarget { agent, to } => {
            let Some(index) = dungeon.agent_index(agent) else {
                return;
            };
            let floor = dungeon.agents[index].floor;
            // Walls and monsters are never valid targets; treasures and
            // traps are stepped onto deliberately. An invalid target leaves
            // the decision flag raised so the policy may try again.
            let valid = floor_at(&dungeon.floors, floor)
                .and_then(|state| state.tile(to))
                .is_some_and(|tile| {
                    tile.kind().is_walkable()
                        && !matches!(
                            tile.occupant().map(Occupant::kind),
                            Some(OccupantKind::Monster)
                        )
                });
            if !valid {
                return;
            }
            let state = &mut dungeon.agents[index];
            let current = state.cell();
            if to != current {
                state.last_move = Some(current);
                if let Some(direction) = direction_toward(current, to) {
                    state.direction = direction;
                }
            }
            state.target = to;
            state.needs_decision = false;
        }
        Command::Strike { agent } => {
            let Some(index) = dungeon.agent_index(agent) else {
                return;
            };
            let state = &mut dungeon.agents[index];
            if state.phase != AgentPhase::Active {
                return;
            }
            let Some(at) = state.cell().step(state.direction) else {
                return;
            };
            let floor = state.floor;
            let Some(tile) = tile_mut(&mut dungeon.floors, floor, at) else {
                return;
            };
            let Some(Occupant::Monster(monster)) = tile.occupant_mut() else {
                return;
            };

            let damage = combat::damage(state.attack, monster.defense);
            monster.hp = monster.hp.saturating_sub(damage);
            let remaining_hp = monster.hp;
            out_events.push(Event::MonsterStruck {
                agent,
                floor,
                at,
                damage,
                remaining_hp,
            });
            if remaining_hp == 0 {
                let _ = tile.take_occupant();
                out_events.push(Event::MonsterSlain { floor, at });
                return;
            }

            // The survivor counterattacks in the same exchange.
            let counter = combat::damage(monster.attack, state.defense);
            state.hp = state.hp.saturating_sub(counter);
            out_events.push(Event::AgentStruck {
                agent,
                damage: counter,
                remaining_hp: state.hp,
            });
            if state.hp == 0 {
                state.phase = AgentPhase::Dead;
                out_events.push(Event::AgentDied {
                    agent,
                    level: state.level,
                });
            }
        }
    }
}

/// Tile-arrival effects in fixed order: trap, treasure, entrance escape,
/// stairs descent, then the decision flag. Runs every tick the adventurer
/// rests on its target cell, so rearmed traps spring again.
fn arrival_effects(floors: &mut [Floor], agent: &mut Agent, out_events: &mut Vec<Event>) {
    let at = agent.target;
    let floor_count = floors.len() as u32;
    let Some(floor) = floor_mut(floors, agent.floor) else {
        return;
    };

    if let Some(Occupant::Trap(trap)) = floor.tile_mut(at).and_then(Tile::occupant_mut) {
        if trap.is_armed() {
            trap.cooldown = TRAP_REARM_DELAY;
            let damage = trap.damage;
            agent.hp = agent.hp.saturating_sub(damage);
            out_events.push(Event::TrapSprung {
                floor: agent.floor,
                at,
                agent: agent.id,
                damage,
            });
            if agent.hp == 0 {
                agent.phase = AgentPhase::Dead;
                out_events.push(Event::AgentDied {
                    agent: agent.id,
                    level: agent.level,
                });
                return;
            }
        }
    }

    let holds_treasure = matches!(
        floor.tile(at).and_then(Tile::occupant),
        Some(Occupant::Treasure(_))
    );
    if holds_treasure {
        if let Some(Occupant::Treasure(treasure)) = floor.remove_occupant(at) {
            agent.loot += treasure.value;
            out_events.push(Event::TreasureLooted {
                floor: agent.floor,
                at,
                agent: agent.id,
                value: treasure.value,
            });
            if !agent.class.is_hero() {
                agent.escape_mode = true;
            }
        }
    }

    let kind = floor.tile(at).map(Tile::kind);

    if kind == Some(TileKind::Entrance)
        && agent.floor == FloorId::new(1)
        && agent.wants_to_escape()
    {
        agent.phase = AgentPhase::Escaped;
        out_events.push(Event::AgentEscaped {
            agent: agent.id,
            loot: agent.loot,
        });
        return;
    }

    if kind == Some(TileKind::Stairs) && agent.class.is_hero() && agent.floor.get() < floor_count {
        let next = agent.floor.below();
        let entrance =
            floor_at(floors, next).and_then(|state| state.find_tile(TileKind::Entrance));
        if let Some(entrance) = entrance {
            agent.floor = next;
            agent.x = entrance.x() as f32;
            agent.y = entrance.y() as f32;
            agent.target = entrance;
            agent.last_move = None;
            out_events.push(Event::AgentDescended {
                agent: agent.id,
                floor: next,
            });
            return;
        }
    }

    if agent.mark_decision_needed() {
        out_events.push(Event::DecisionNeeded { agent: agent.id });
    }
}

fn report_core_proximity(core: &DungeonCore, agent: &mut Agent, out_events: &mut Vec<Event>) {
    if agent.floor != FloorId::new(1) || agent.core_reported {
        return;
    }
    let dx = agent.x - core.position.x() as f32;
    let dy = agent.y - core.position.y() as f32;
    if (dx * dx + dy * dy).sqrt() < CORE_PROXIMITY {
        agent.core_reported = true;
        out_events.push(Event::CoreReached { agent: agent.id });
    }
}

fn validate_build(floors: &[Floor], floor: FloorId, at: GridPos) -> Result<(), BuildError> {
    let Some(state) = floor_at(floors, floor) else {
        return Err(BuildError::MissingFloor);
    };
    let Some(tile) = state.tile(at) else {
        return Err(BuildError::OutOfBounds);
    };
    if tile.kind() != TileKind::Floor {
        return Err(BuildError::NotFloor);
    }
    if tile.is_occupied() {
        return Err(BuildError::Occupied);
    }
    Ok(())
}

fn validate_demolish(floors: &[Floor], floor: FloorId, at: GridPos) -> Result<(), BuildError> {
    let Some(state) = floor_at(floors, floor) else {
        return Err(BuildError::MissingFloor);
    };
    let Some(tile) = state.tile(at) else {
        return Err(BuildError::OutOfBounds);
    };
    if tile.kind() != TileKind::Wall {
        return Err(BuildError::NotWall);
    }
    Ok(())
}

fn validate_occupant_move(
    floors: &[Floor],
    floor_from: FloorId,
    from: GridPos,
    floor_to: FloorId,
    to: GridPos,
) -> Result<(), MoveError> {
    let Some(source_floor) = floor_at(floors, floor_from) else {
        return Err(MoveError::MissingFloor);
    };
    if !source_floor.tile(from).is_some_and(Tile::is_occupied) {
        return Err(MoveError::MissingSource);
    }
    validate_destination(floors, floor_to, to, false)
}

fn validate_special_move(
    floors: &[Floor],
    floor_from: FloorId,
    from: GridPos,
    floor_to: FloorId,
    to: GridPos,
) -> Result<TileKind, MoveError> {
    let Some(source_floor) = floor_at(floors, floor_from) else {
        return Err(MoveError::MissingFloor);
    };
    let kind = source_floor.tile(from).map(Tile::kind);
    let Some(kind) = kind.filter(|kind| kind.is_special()) else {
        return Err(MoveError::MissingSource);
    };
    validate_destination(floors, floor_to, to, true)?;
    Ok(kind)
}

/// Shared destination rules: in bounds, unoccupied, never onto another
/// special tile. Only special tiles may land on walls.
fn validate_destination(
    floors: &[Floor],
    floor_to: FloorId,
    to: GridPos,
    allow_wall: bool,
) -> Result<(), MoveError> {
    let Some(dest_floor) = floor_at(floors, floor_to) else {
        return Err(MoveError::MissingFloor);
    };
    let Some(tile) = dest_floor.tile(to) else {
        return Err(MoveError::OutOfBounds);
    };
    if tile.is_occupied() {
        return Err(MoveError::DestinationOccupied);
    }
    if tile.kind().is_special() {
        return Err(MoveError::DestinationSpecial);
    }
    if !allow_wall && tile.kind() == TileKind::Wall {
        return Err(MoveError::WallDestination);
    }
    Ok(())
}

/// Sign-based facing update; handles multi-cell targets, column first.
fn direction_toward(from: GridPos, to: GridPos) -> Option<Direction> {
    if to.x() > from.x() {
        Some(Direction::East)
    } else if to.x() < from.x() {
        Some(Direction::West)
    } else if to.y() > from.y() {
        Some(Direction::South)
    } else if to.y() < from.y() {
        Some(Direction::North)
    } else {
        None
    }
}

fn floor_at(floors: &[Floor], floor: FloorId) -> Option<&Floor> {
    floor
        .get()
        .checked_sub(1)
        .and_then(|index| floors.get(index as usize))
}

fn floor_mut(floors: &mut [Floor], floor: FloorId) -> Option<&mut Floor> {
    floor
        .get()
        .checked_sub(1)
        .and_then(move |index| floors.get_mut(index as usize))
}

fn tile_mut(floors: &mut [Floor], floor: FloorId, at: GridPos) -> Option<&mut Tile> {
    floor_mut(floors, floor).and_then(move |state| state.tile_mut(at))
}

/// Read-only access into the dungeon for systems and adapters.
pub mod query {
    use super::{floor_at, Agent, AgentPhase, Dungeon, Floor};
    use dungeon_warden_core::{AgentClass, AgentId, Direction, DungeonCore, FloorId, GridPos};

    /// Retrieves the welcome banner configured for the dungeon.
    #[must_use]
    pub fn welcome_banner(dungeon: &Dungeon) -> &str {
        dungeon.banner
    }

    /// Number of floors currently in the dungeon.
    #[must_use]
    pub fn floor_count(dungeon: &Dungeon) -> u32 {
        dungeon.floors.len() as u32
    }

    /// Retrieves a floor by identifier.
    #[must_use]
    pub fn floor(dungeon: &Dungeon, id: FloorId) -> Option<&Floor> {
        floor_at(&dungeon.floors, id)
    }

    /// Current core record, if one is anchored.
    #[must_use]
    pub fn core(dungeon: &Dungeon) -> Option<DungeonCore> {
        dungeon.core
    }

    /// Captures an immutable view over every floor grid.
    #[must_use]
    pub fn dungeon_view(dungeon: &Dungeon) -> DungeonView<'_> {
        DungeonView {
            floors: &dungeon.floors,
        }
    }

    /// Captures snapshots of every live adventurer, ordered by identifier.
    #[must_use]
    pub fn agent_view(dungeon: &Dungeon) -> AgentView {
        let mut snapshots: Vec<AgentSnapshot> = dungeon
            .agents
            .iter()
            .filter(|agent| agent.phase == AgentPhase::Active)
            .map(AgentSnapshot::from_agent)
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.id);
        AgentView { snapshots }
    }

    /// Immutable view over the dungeon's floor grids.
    #[derive(Clone, Copy, Debug)]
    pub struct DungeonView<'world> {
        floors: &'world [Floor],
    }

    impl<'world> DungeonView<'world> {
        /// Retrieves a floor by identifier.
        #[must_use]
        pub fn floor(&self, id: FloorId) -> Option<&'world Floor> {
            floor_at(self.floors, id)
        }

        /// Number of floors in the view.
        #[must_use]
        pub fn floor_count(&self) -> u32 {
            self.floors.len() as u32
        }
    }

    /// Immutable per-tick snapshot of a live adventurer.
    #[derive(Clone, Debug)]
    pub struct AgentSnapshot {
        /// Identifier of the adventurer.
        pub id: AgentId,
        /// Profession of the adventurer.
        pub class: AgentClass,
        /// Display name of the adventurer.
        pub name: String,
        /// Level the stat block was derived from.
        pub level: u32,
        /// Remaining hit points.
        pub hp: u32,
        /// Maximum hit points.
        pub max_hp: u32,
        /// Attack rating.
        pub attack: u32,
        /// Defense rating.
        pub defense: u32,
        /// Floor the adventurer currently walks.
        pub floor: FloorId,
        /// Grid cell the adventurer currently stands in.
        pub cell: GridPos,
        /// Continuous position within the grid.
        pub position: (f32, f32),
        /// Cell the adventurer is walking toward.
        pub target: GridPos,
        /// Direction the adventurer is facing.
        pub direction: Direction,
        /// Whether the adventurer is fleeing toward the entrance.
        pub escape_mode: bool,
        /// Total loot value carried.
        pub loot: u32,
        /// Cell vacated by the previous corridor move.
        pub last_move: Option<GridPos>,
        /// Whether the adventurer is waiting for a movement decision.
        pub needs_decision: bool,
    }

    impl AgentSnapshot {
        fn from_agent(agent: &Agent) -> Self {
            Self {
                id: agent.id,
                class: agent.class,
                name: agent.name.clone(),
                level: agent.level,
                hp: agent.hp,
                max_hp: agent.max_hp,
                attack: agent.attack,
                defense: agent.defense,
                floor: agent.floor,
                cell: agent.cell(),
                position: (agent.x, agent.y),
                target: agent.target,
                direction: agent.direction,
                escape_mode: agent.escape_mode,
                loot: agent.loot,
                last_move: agent.last_move,
                needs_decision: agent.needs_decision,
            }
        }
    }

    /// Ordered collection of adventurer snapshots.
    #[derive(Clone, Debug, Default)]
    pub struct AgentView {
        snapshots: Vec<AgentSnapshot>,
    }

    impl AgentView {
        /// Iterates over the snapshots in identifier order.
        pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
            self.snapshots.iter()
        }

        /// Looks up a snapshot by identifier.
        #[must_use]
        pub fn get(&self, id: AgentId) -> Option<&AgentSnapshot> {
            self.snapshots.iter().find(|snapshot| snapshot.id == id)
        }

        /// Number of live adventurers captured in the view.
        #[must_use]
        pub fn len(&self) -> usize {
            self.snapshots.len()
        }

        /// Reports whether the view holds no adventurers.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.snapshots.is_empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_warden_core::{Monster, RectSize, TileRect, Trap, Treasure};

    fn fresh() -> Dungeon {
        Dungeon::new()
    }

    fn tick(dungeon: &mut Dungeon, millis: u64) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            dungeon,
            Command::Tick {
                dt: Duration::from_millis(millis),
            },
            &mut events,
        );
        events
    }

    fn spawn(dungeon: &mut Dungeon, class: AgentClass, level: u32) -> AgentId {
        let mut events = Vec::new();
        apply(
            dungeon,
            Command::SpawnAgent {
                class,
                name: format!("{} 1", class.label()),
                level,
            },
            &mut events,
        );
        match events.first() {
            Some(Event::AgentSpawned { agent, .. }) => *agent,
            other => panic!("expected spawn event, got {other:?}"),
        }
    }

    #[test]
    fn new_dungeon_anchors_core_on_first_floor() {
        let dungeon = fresh();
        let core = query::core(&dungeon).expect("core record");
        assert_eq!(core.position, CORE_CELL);
        assert_eq!(core.hp, CORE_MAX_HP);
        let first = query::floor(&dungeon, FloorId::new(1)).expect("first floor");
        assert_eq!(
            first.tile(CORE_CELL).map(Tile::kind),
            Some(TileKind::Core)
        );
    }

    #[test]
    fn add_floor_appends_generated_layout() {
        let mut dungeon = fresh();
        let mut events = Vec::new();
        apply(&mut dungeon, Command::AddFloor, &mut events);
        assert_eq!(
            events,
            vec![Event::FloorAdded {
                floor: FloorId::new(2)
            }]
        );
        let second = query::floor(&dungeon, FloorId::new(2)).expect("second floor");
        assert_eq!(
            second.tile(ENTRANCE_CELL).map(Tile::kind),
            Some(TileKind::Entrance)
        );
        // Only the first floor hosts a core marker.
        assert_eq!(second.find_tile(TileKind::Core), None);
    }

    #[test]
    fn placement_rejections_name_the_reason() {
        let mut dungeon = fresh();
        let mut events = Vec::new();
        apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(1),
                at: GridPos::new(0, 0),
                occupant: Occupant::Monster(Monster::from_level("Goblin", 1)),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::PlacementRejected {
                floor: FloorId::new(1),
                at: GridPos::new(0, 0),
                reason: PlacementError::NotFloor,
            }]
        );

        events.clear();
        apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(7),
                at: GridPos::new(3, 3),
                occupant: Occupant::Monster(Monster::from_level("Goblin", 1)),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::PlacementRejected {
                floor: FloorId::new(7),
                at: GridPos::new(3, 3),
                reason: PlacementError::MissingFloor,
            }]
        );
    }

    #[test]
    fn special_tile_move_restores_underlay_and_records_displacement() {
        let mut dungeon = fresh();
        let mut events = Vec::new();
        let wall_cell = GridPos::new(0, 0);
        apply(
            &mut dungeon,
            Command::MoveSpecialTile {
                floor_from: FloorId::new(1),
                from: ENTRANCE_CELL,
                floor_to: FloorId::new(1),
                to: wall_cell,
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::SpecialTileMoved {
                kind: TileKind::Entrance,
                ..
            }]
        ));

        let floor = query::floor(&dungeon, FloorId::new(1)).unwrap();
        // The entrance displaced a wall when the floor was generated, so the
        // vacated cell becomes wall again.
        assert_eq!(
            floor.tile(ENTRANCE_CELL).map(Tile::kind),
            Some(TileKind::Wall)
        );
        assert_eq!(floor.tile(wall_cell).map(Tile::kind), Some(TileKind::Entrance));
        assert_eq!(
            floor.tile(wall_cell).and_then(Tile::underlay),
            Some(TileKind::Wall)
        );

        // Move it back: the displaced wall is restored at the temporary cell.
        events.clear();
        apply(
            &mut dungeon,
            Command::MoveSpecialTile {
                floor_from: FloorId::new(1),
                from: wall_cell,
                floor_to: FloorId::new(1),
                to: ENTRANCE_CELL,
            },
            &mut events,
        );
        let floor = query::floor(&dungeon, FloorId::new(1)).unwrap();
        assert_eq!(floor.tile(wall_cell).map(Tile::kind), Some(TileKind::Wall));
        assert_eq!(
            floor.tile(ENTRANCE_CELL).map(Tile::kind),
            Some(TileKind::Entrance)
        );
    }

    #[test]
    fn special_tile_never_lands_on_another_special() {
        let mut dungeon = fresh();
        let mut events = Vec::new();
        apply(
            &mut dungeon,
            Command::MoveSpecialTile {
                floor_from: FloorId::new(1),
                from: ENTRANCE_CELL,
                floor_to: FloorId::new(1),
                to: STAIRS_CELL,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::MoveRejected {
                floor_to: FloorId::new(1),
                to: STAIRS_CELL,
                reason: MoveError::DestinationSpecial,
            }]
        );
    }

    #[test]
    fn entity_moves_reject_wall_destinations() {
        let mut dungeon = fresh();
        let mut events = Vec::new();
        apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(1),
                at: GridPos::new(3, 3),
                occupant: Occupant::Treasure(Treasure::new("Chest", 100)),
            },
            &mut events,
        );
        events.clear();
        apply(
            &mut dungeon,
            Command::MoveOccupant {
                floor_from: FloorId::new(1),
                from: GridPos::new(3, 3),
                floor_to: FloorId::new(1),
                to: GridPos::new(0, 0),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::MoveRejected {
                floor_to: FloorId::new(1),
                to: GridPos::new(0, 0),
                reason: MoveError::WallDestination,
            }]
        );
    }

    #[test]
    fn occupants_move_across_floors() {
        let mut dungeon = fresh();
        let mut events = Vec::new();
        apply(&mut dungeon, Command::AddFloor, &mut events);
        apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(1),
                at: GridPos::new(3, 3),
                occupant: Occupant::Monster(Monster::from_level("Goblin", 2)),
            },
            &mut events,
        );
        events.clear();
        apply(
            &mut dungeon,
            Command::MoveOccupant {
                floor_from: FloorId::new(1),
                from: GridPos::new(3, 3),
                floor_to: FloorId::new(2),
                to: GridPos::new(4, 4),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::OccupantMoved {
                floor_from: FloorId::new(1),
                from: GridPos::new(3, 3),
                floor_to: FloorId::new(2),
                to: GridPos::new(4, 4),
            }]
        );
        let second = query::floor(&dungeon, FloorId::new(2)).unwrap();
        assert!(second.tile(GridPos::new(4, 4)).is_some_and(Tile::is_occupied));
    }

    #[test]
    fn spawned_agent_waits_at_entrance_for_a_decision() {
        let mut dungeon = fresh();
        let id = spawn(&mut dungeon, AgentClass::Warrior, 2);
        let view = query::agent_view(&dungeon);
        let snapshot = view.get(id).expect("agent snapshot");
        assert_eq!(snapshot.cell, ENTRANCE_CELL);
        assert_eq!(snapshot.hp, 30);
        assert_eq!(snapshot.attack, 8);
        assert_eq!(snapshot.defense, 4);
        assert!(snapshot.needs_decision);
    }

    #[test]
    fn agent_walks_to_target_and_requests_next_decision() {
        let mut dungeon = fresh();
        let id = spawn(&mut dungeon, AgentClass::Warrior, 1);
        let mut events = Vec::new();
        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: GridPos::new(5, 2),
            },
            &mut events,
        );
        assert!(!query::agent_view(&dungeon).get(id).unwrap().needs_decision);

        // Speed 2 covers one cell in half a second.
        let events = tick(&mut dungeon, 500);
        assert!(
            events.contains(&Event::DecisionNeeded { agent: id }),
            "agent should arrive and ask for the next move, got {events:?}"
        );
        let snapshot = query::agent_view(&dungeon);
        let snapshot = snapshot.get(id).unwrap();
        assert_eq!(snapshot.cell, GridPos::new(5, 2));
        assert_eq!(snapshot.last_move, Some(ENTRANCE_CELL));
        assert_eq!(snapshot.direction, Direction::South);
    }

    #[test]
    fn targets_on_walls_or_monsters_are_ignored() {
        let mut dungeon = fresh();
        let id = spawn(&mut dungeon, AgentClass::Warrior, 1);
        let mut events = Vec::new();
        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: GridPos::new(0, 0),
            },
            &mut events,
        );
        let snapshot = query::agent_view(&dungeon);
        let snapshot = snapshot.get(id).unwrap();
        assert_eq!(snapshot.target, ENTRANCE_CELL, "wall target must not stick");
        assert!(snapshot.needs_decision, "rejection keeps the decision flag");
    }

    #[test]
    fn trap_springs_once_then_rearms_after_five_seconds() {
        let mut dungeon = fresh();
        let trap_cell = GridPos::new(5, 2);
        let mut events = Vec::new();
        apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(1),
                at: trap_cell,
                occupant: Occupant::Trap(Trap::new("Spikes", 5)),
            },
            &mut events,
        );
        let id = spawn(&mut dungeon, AgentClass::Warrior, 2);
        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: trap_cell,
            },
            &mut events,
        );

        let events = tick(&mut dungeon, 500);
        assert!(events.iter().any(|event| matches!(
            event,
            Event::TrapSprung { damage: 5, .. }
        )));
        let hp_after = query::agent_view(&dungeon).get(id).unwrap().hp;
        assert_eq!(hp_after, 25);

        // Camping on the trap: nothing happens until the rearm delay runs out.
        let events = tick(&mut dungeon, 4400);
        assert!(!events.iter().any(|event| matches!(event, Event::TrapSprung { .. })));
        let events = tick(&mut dungeon, 1000);
        assert!(events.iter().any(|event| matches!(event, Event::TrapSprung { .. })));
    }

    #[test]
    fn lethal_trap_kills_and_reaps_the_agent() {
        let mut dungeon = fresh();
        let trap_cell = GridPos::new(5, 2);
        let mut events = Vec::new();
        apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(1),
                at: trap_cell,
                occupant: Occupant::Trap(Trap::new("Pit", 60)),
            },
            &mut events,
        );
        let id = spawn(&mut dungeon, AgentClass::Warrior, 1);
        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: trap_cell,
            },
            &mut events,
        );

        let events = tick(&mut dungeon, 500);
        assert!(events.contains(&Event::AgentDied { agent: id, level: 1 }));
        assert!(query::agent_view(&dungeon).get(id).is_none(), "dead agents are reaped");
    }

    #[test]
    fn looting_flips_non_heroes_into_escape_mode() {
        let mut dungeon = fresh();
        let chest_cell = GridPos::new(5, 2);
        let mut events = Vec::new();
        apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(1),
                at: chest_cell,
                occupant: Occupant::Treasure(Treasure::new("Chest", 120)),
            },
            &mut events,
        );
        let id = spawn(&mut dungeon, AgentClass::Thief, 1);
        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: chest_cell,
            },
            &mut events,
        );

        let events = tick(&mut dungeon, 500);
        assert!(events.iter().any(|event| matches!(
            event,
            Event::TreasureLooted { value: 120, .. }
        )));
        let snapshot = query::agent_view(&dungeon);
        let snapshot = snapshot.get(id).unwrap();
        assert!(snapshot.escape_mode);
        assert_eq!(snapshot.loot, 120);
        let floor = query::floor(&dungeon, FloorId::new(1)).unwrap();
        assert!(!floor.tile(chest_cell).is_some_and(Tile::is_occupied));
    }

    #[test]
    fn loot_carrier_escapes_through_the_entrance() {
        let mut dungeon = fresh();
        let chest_cell = GridPos::new(5, 2);
        let mut events = Vec::new();
        apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(1),
                at: chest_cell,
                occupant: Occupant::Treasure(Treasure::new("Chest", 120)),
            },
            &mut events,
        );
        let id = spawn(&mut dungeon, AgentClass::Thief, 1);
        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: chest_cell,
            },
            &mut events,
        );
        let _ = tick(&mut dungeon, 500);

        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: ENTRANCE_CELL,
            },
            &mut events,
        );
        let events = tick(&mut dungeon, 500);
        assert!(events.contains(&Event::AgentEscaped {
            agent: id,
            loot: 120
        }));
        assert!(query::agent_view(&dungeon).is_empty());
    }

    #[test]
    fn healthy_empty_handed_agent_does_not_escape() {
        let mut dungeon = fresh();
        let id = spawn(&mut dungeon, AgentClass::Warrior, 2);
        // Spawned on the entrance at full health with no loot: the agent
        // stays and asks for a decision instead of leaving.
        let events = tick(&mut dungeon, 100);
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::AgentEscaped { .. })));
        assert!(query::agent_view(&dungeon).get(id).is_some());
    }

    #[test]
    fn hero_descends_stairs_when_a_deeper_floor_exists() {
        let mut dungeon = fresh();
        let mut events = Vec::new();
        apply(&mut dungeon, Command::AddFloor, &mut events);
        let id = spawn(&mut dungeon, AgentClass::Hero, 3);
        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: STAIRS_CELL,
            },
            &mut events,
        );
        // Entrance (5,1) to stairs (5,8) is seven cells; at speed 2 that is
        // 3.5 seconds of simulated time.
        for _ in 0..8 {
            let events = tick(&mut dungeon, 500);
            if events.contains(&Event::AgentDescended {
                agent: id,
                floor: FloorId::new(2),
            }) {
                let snapshot = query::agent_view(&dungeon);
                let snapshot = snapshot.get(id).unwrap();
                assert_eq!(snapshot.floor, FloorId::new(2));
                assert_eq!(snapshot.cell, ENTRANCE_CELL);
                return;
            }
        }
        panic!("hero never descended the stairs");
    }

    #[test]
    fn non_hero_ignores_stairs() {
        let mut dungeon = fresh();
        let mut events = Vec::new();
        apply(&mut dungeon, Command::AddFloor, &mut events);
        let id = spawn(&mut dungeon, AgentClass::Warrior, 3);
        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: STAIRS_CELL,
            },
            &mut events,
        );
        for _ in 0..8 {
            let _ = tick(&mut dungeon, 500);
        }
        let snapshot = query::agent_view(&dungeon);
        let snapshot = snapshot.get(id).unwrap();
        assert_eq!(snapshot.floor, FloorId::new(1));
    }

    #[test]
    fn strike_exchanges_blows_until_one_side_falls() {
        let mut dungeon = fresh();
        let id = spawn(&mut dungeon, AgentClass::Warrior, 1);
        let mut events = Vec::new();
        // Face south toward a goblin one cell below the entrance.
        apply(
            &mut dungeon,
            Command::PlaceOccupant {
                floor: FloorId::new(1),
                at: GridPos::new(5, 2),
                occupant: Occupant::Monster(Monster::from_level("Goblin", 1)),
            },
            &mut events,
        );

        // Level 1 warrior: attack 4 against defense 2 deals 2; the goblin
        // has 10 hp, so five strikes fell it. The goblin's counter of
        // max(1, 3-2) = 1 lands four times.
        for _ in 0..5 {
            events.clear();
            apply(&mut dungeon, Command::Strike { agent: id }, &mut events);
        }
        assert!(events.contains(&Event::MonsterSlain {
            floor: FloorId::new(1),
            at: GridPos::new(5, 2),
        }));
        let snapshot = query::agent_view(&dungeon);
        let snapshot = snapshot.get(id).unwrap();
        assert_eq!(snapshot.hp, 11);
        let floor = query::floor(&dungeon, FloorId::new(1)).unwrap();
        assert!(!floor.tile(GridPos::new(5, 2)).is_some_and(Tile::is_occupied));
    }

    #[test]
    fn strike_without_a_facing_monster_is_a_noop() {
        let mut dungeon = fresh();
        let id = spawn(&mut dungeon, AgentClass::Warrior, 1);
        let mut events = Vec::new();
        apply(&mut dungeon, Command::Strike { agent: id }, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn core_proximity_is_reported_once() {
        let mut dungeon = fresh();
        let id = spawn(&mut dungeon, AgentClass::Hero, 1);
        let mut events = Vec::new();
        // Special tiles are walkable, so the core cell itself is a legal
        // target.
        apply(
            &mut dungeon,
            Command::SetAgentTarget {
                agent: id,
                to: CORE_CELL,
            },
            &mut events,
        );
        let mut reached = 0;
        for _ in 0..10 {
            let events = tick(&mut dungeon, 500);
            reached += events
                .iter()
                .filter(|event| matches!(event, Event::CoreReached { .. }))
                .count();
        }
        assert_eq!(reached, 1);
    }
}
