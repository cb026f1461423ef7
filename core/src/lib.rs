#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Dungeon Warden engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Dungeon Warden.";

/// Delay before a sprung trap rearms itself.
pub const TRAP_REARM_DELAY: Duration = Duration::from_secs(5);

/// Location of a single grid cell expressed as x and y coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    x: u32,
    y: u32,
}

impl GridPos {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two grid positions.
    #[must_use]
    pub fn manhattan_distance(self, other: GridPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Returns the neighboring cell in the given direction, if it does not
    /// underflow the grid origin. Upper bounds are the floor's concern.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<GridPos> {
        match direction {
            Direction::North => self.y.checked_sub(1).map(|y| GridPos::new(self.x, y)),
            Direction::East => Some(GridPos::new(self.x + 1, self.y)),
            Direction::South => Some(GridPos::new(self.x, self.y + 1)),
            Direction::West => self.x.checked_sub(1).map(|x| GridPos::new(x, self.y)),
        }
    }
}

/// Cardinal movement directions available to adventurers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All four cardinal directions in scan order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// The two directions perpendicular to this one.
    #[must_use]
    pub const fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::North | Direction::South => [Direction::West, Direction::East],
            Direction::East | Direction::West => [Direction::North, Direction::South],
        }
    }

    /// Derives the direction of a single-cell step between two positions.
    ///
    /// Returns `None` when the positions are not cardinal neighbors.
    #[must_use]
    pub fn between(from: GridPos, to: GridPos) -> Option<Direction> {
        let x_diff = from.x().abs_diff(to.x());
        let y_diff = from.y().abs_diff(to.y());
        if x_diff + y_diff != 1 {
            return None;
        }

        if x_diff == 1 {
            if to.x() > from.x() {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if to.y() > from.y() {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// One-based floor number, matching the floor's position in the dungeon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FloorId(u32);

impl FloorId {
    /// Creates a new floor identifier with the provided one-based number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the one-based floor number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Identifier of the floor directly below this one.
    #[must_use]
    pub const fn below(&self) -> FloorId {
        FloorId::new(self.0 + 1)
    }
}

/// Unique identifier assigned to an adventurer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Axis-aligned rectangle expressed in grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    origin: GridPos,
    size: RectSize,
}

impl TileRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: GridPos, size: RectSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> GridPos {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> RectSize {
        self.size
    }

    /// Reports whether the rectangle contains the provided cell.
    #[must_use]
    pub fn contains(&self, cell: GridPos) -> bool {
        cell.x() >= self.origin.x()
            && cell.y() >= self.origin.y()
            && cell.x() < self.origin.x() + self.size.width()
            && cell.y() < self.origin.y() + self.size.height()
    }
}

/// Size of a [`TileRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RectSize {
    width: u32,
    height: u32,
}

impl RectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Type of a single dungeon tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Impassable rock. Every cell starts as wall.
    Wall,
    /// Plain walkable floor; the only kind that accepts placed occupants.
    Floor,
    /// The dungeon mouth adventurers enter and escape through.
    Entrance,
    /// Stairwell connecting a floor to the one below it.
    Stairs,
    /// The protected objective tile; reaching it ends the session.
    Core,
}

impl TileKind {
    /// Reports whether this kind is one of the singleton special markers.
    #[must_use]
    pub const fn is_special(self) -> bool {
        matches!(self, TileKind::Entrance | TileKind::Stairs | TileKind::Core)
    }

    /// Reports whether agents may stand on this kind of tile.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, TileKind::Wall)
    }
}

/// A monster defending the dungeon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    /// Display name of the monster.
    pub name: String,
    /// Level the stat block was derived from.
    pub level: u32,
    /// Remaining hit points.
    pub hp: u32,
    /// Attack rating applied in melee exchanges.
    pub attack: u32,
    /// Defense rating subtracted from incoming damage.
    pub defense: u32,
}

impl Monster {
    /// Creates a monster with the stat block derived from its level.
    #[must_use]
    pub fn from_level(name: impl Into<String>, level: u32) -> Self {
        Self {
            name: name.into(),
            level,
            hp: level * 10,
            attack: level * 3,
            defense: level * 2,
        }
    }
}

/// A trap that damages adventurers stepping onto it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trap {
    /// Display name of the trap.
    pub name: String,
    /// Damage dealt when the trap springs.
    pub damage: u32,
    /// Time remaining until the trap rearms; zero means armed.
    pub cooldown: Duration,
}

impl Trap {
    /// Creates an armed trap dealing the provided damage.
    #[must_use]
    pub fn new(name: impl Into<String>, damage: u32) -> Self {
        Self {
            name: name.into(),
            damage,
            cooldown: Duration::ZERO,
        }
    }

    /// Reports whether the trap is ready to spring.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.cooldown.is_zero()
    }
}

/// A treasure that adventurers carry off when they step onto it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasure {
    /// Display name of the treasure.
    pub name: String,
    /// Loot value credited to the collecting adventurer.
    pub value: u32,
}

impl Treasure {
    /// Creates a treasure worth the provided value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: u32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Entity occupying a single dungeon tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupant {
    /// A placed monster.
    Monster(Monster),
    /// A placed trap.
    Trap(Trap),
    /// A placed treasure.
    Treasure(Treasure),
}

impl Occupant {
    /// Classifies the occupant without exposing its payload.
    #[must_use]
    pub const fn kind(&self) -> OccupantKind {
        match self {
            Occupant::Monster(_) => OccupantKind::Monster,
            Occupant::Trap(_) => OccupantKind::Trap,
            Occupant::Treasure(_) => OccupantKind::Treasure,
        }
    }

    /// Display name of the occupant.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Occupant::Monster(monster) => &monster.name,
            Occupant::Trap(trap) => &trap.name,
            Occupant::Treasure(treasure) => &treasure.name,
        }
    }
}

/// Discriminant carried by events that describe occupant mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupantKind {
    /// The occupant is a monster.
    Monster,
    /// The occupant is a trap.
    Trap,
    /// The occupant is a treasure.
    Treasure,
}

/// The protected dungeon core record anchored to floor 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonCore {
    /// Cell the core currently occupies.
    pub position: GridPos,
    /// Remaining core hit points.
    pub hp: u32,
    /// Maximum core hit points.
    pub max_hp: u32,
}

/// Profession of an adventurer; only heroes descend stairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentClass {
    /// Heroes ignore treasure and push toward deeper floors.
    Hero,
    /// Front-line fighter.
    Warrior,
    /// Spell caster.
    Mage,
    /// Treasure-focused skulker.
    Thief,
    /// Support caster.
    Cleric,
    /// Ranged attacker.
    Archer,
    /// Duelist.
    Swordsman,
}

impl AgentClass {
    /// Every class in spawn-roster order.
    pub const ALL: [AgentClass; 7] = [
        AgentClass::Hero,
        AgentClass::Warrior,
        AgentClass::Mage,
        AgentClass::Thief,
        AgentClass::Cleric,
        AgentClass::Archer,
        AgentClass::Swordsman,
    ];

    /// Reports whether the class follows the hero behavior variant.
    #[must_use]
    pub const fn is_hero(self) -> bool {
        matches!(self, AgentClass::Hero)
    }

    /// Human-readable class label used when composing adventurer names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            AgentClass::Hero => "Hero",
            AgentClass::Warrior => "Warrior",
            AgentClass::Mage => "Mage",
            AgentClass::Thief => "Thief",
            AgentClass::Cleric => "Cleric",
            AgentClass::Archer => "Archer",
            AgentClass::Swordsman => "Swordsman",
        }
    }
}

/// Stat block derived from an adventurer's level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentStats {
    /// Maximum (and starting) hit points.
    pub max_hp: u32,
    /// Attack rating applied in melee exchanges.
    pub attack: u32,
    /// Defense rating subtracted from incoming damage.
    pub defense: u32,
    /// Movement speed in cells per second.
    pub speed: f32,
}

impl AgentStats {
    /// Derives the stat block for the provided level.
    #[must_use]
    pub const fn for_level(level: u32) -> Self {
        Self {
            max_hp: level * 15,
            attack: level * 4,
            defense: level * 2,
            speed: 2.0,
        }
    }
}

/// Stateless combat arithmetic shared by adventurers and monsters.
pub mod combat {
    /// Damage dealt by an attacker against a defender.
    ///
    /// Never drops below one, even when defense exceeds attack.
    #[must_use]
    pub fn damage(attack: u32, defense: u32) -> u32 {
        attack.saturating_sub(defense).max(1)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Appends a new floor below the current deepest one.
    AddFloor,
    /// Carves the provided rectangle into floor tiles, leaving non-wall
    /// cells untouched.
    CarveRoom {
        /// Floor the room is carved into.
        floor: FloorId,
        /// Rectangle of cells to convert from wall to floor.
        rect: TileRect,
    },
    /// Requests placement of an occupant on a plain floor tile.
    PlaceOccupant {
        /// Floor receiving the occupant.
        floor: FloorId,
        /// Cell the occupant should be placed on.
        at: GridPos,
        /// Entity to place.
        occupant: Occupant,
    },
    /// Clears the occupant from a tile, if any.
    RemoveOccupant {
        /// Floor holding the occupant.
        floor: FloorId,
        /// Cell to clear.
        at: GridPos,
    },
    /// Converts an unoccupied floor tile into a wall.
    BuildWall {
        /// Floor the wall is raised on.
        floor: FloorId,
        /// Cell to convert.
        at: GridPos,
    },
    /// Converts a wall tile back into floor.
    DemolishWall {
        /// Floor the wall is removed from.
        floor: FloorId,
        /// Cell to convert.
        at: GridPos,
    },
    /// Relocates a placed occupant, possibly across floors.
    MoveOccupant {
        /// Floor the occupant currently sits on.
        floor_from: FloorId,
        /// Cell the occupant currently sits on.
        from: GridPos,
        /// Floor the occupant should land on.
        floor_to: FloorId,
        /// Cell the occupant should land on.
        to: GridPos,
    },
    /// Relocates a special tile (entrance, stairs, or core), restoring the
    /// displaced tile kind at the source.
    MoveSpecialTile {
        /// Floor the special tile currently sits on.
        floor_from: FloorId,
        /// Cell the special tile currently sits on.
        from: GridPos,
        /// Floor the special tile should land on.
        floor_to: FloorId,
        /// Cell the special tile should land on.
        to: GridPos,
    },
    /// Spawns a new adventurer at the floor-1 entrance.
    SpawnAgent {
        /// Profession assigned to the adventurer.
        class: AgentClass,
        /// Display name assigned to the adventurer.
        name: String,
        /// Level the stat block is derived from.
        level: u32,
    },
    /// Assigns a new grid-aligned movement target to an adventurer.
    SetAgentTarget {
        /// Identifier of the adventurer to redirect.
        agent: AgentId,
        /// Cell the adventurer should walk to.
        to: GridPos,
    },
    /// Resolves one melee exchange between an adventurer and the monster on
    /// its facing-adjacent cell. No movement occurs this tick.
    Strike {
        /// Identifier of the attacking adventurer.
        agent: AgentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a new floor was appended to the dungeon.
    FloorAdded {
        /// Identifier assigned to the new floor.
        floor: FloorId,
    },
    /// Confirms that a room rectangle was carved into a floor.
    RoomCarved {
        /// Floor the room was carved into.
        floor: FloorId,
        /// Rectangle that was carved.
        rect: TileRect,
    },
    /// Confirms that an occupant was placed.
    OccupantPlaced {
        /// Floor that received the occupant.
        floor: FloorId,
        /// Cell the occupant landed on.
        at: GridPos,
        /// Classification of the placed occupant.
        kind: OccupantKind,
    },
    /// Reports that an occupant placement request was rejected.
    PlacementRejected {
        /// Floor named in the placement request.
        floor: FloorId,
        /// Cell named in the placement request.
        at: GridPos,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a tile's occupant was cleared.
    OccupantRemoved {
        /// Floor the occupant was removed from.
        floor: FloorId,
        /// Cell that was cleared.
        at: GridPos,
    },
    /// Confirms that a wall was raised on a floor tile.
    WallBuilt {
        /// Floor the wall was raised on.
        floor: FloorId,
        /// Cell that became a wall.
        at: GridPos,
    },
    /// Confirms that a wall was converted back to floor.
    WallDemolished {
        /// Floor the wall was removed from.
        floor: FloorId,
        /// Cell that became floor.
        at: GridPos,
    },
    /// Reports that a wall build or demolish request was rejected.
    BuildRejected {
        /// Floor named in the request.
        floor: FloorId,
        /// Cell named in the request.
        at: GridPos,
        /// Specific reason the mutation failed.
        reason: BuildError,
    },
    /// Confirms that an occupant was relocated.
    OccupantMoved {
        /// Floor the occupant left.
        floor_from: FloorId,
        /// Cell the occupant left.
        from: GridPos,
        /// Floor the occupant landed on.
        floor_to: FloorId,
        /// Cell the occupant landed on.
        to: GridPos,
    },
    /// Confirms that a special tile was relocated.
    SpecialTileMoved {
        /// Kind of special tile that moved.
        kind: TileKind,
        /// Floor the special tile left.
        floor_from: FloorId,
        /// Cell the special tile left.
        from: GridPos,
        /// Floor the special tile landed on.
        floor_to: FloorId,
        /// Cell the special tile landed on.
        to: GridPos,
    },
    /// Reports that a move request was rejected.
    MoveRejected {
        /// Destination floor named in the request.
        floor_to: FloorId,
        /// Destination cell named in the request.
        to: GridPos,
        /// Specific reason the move failed.
        reason: MoveError,
    },
    /// Confirms that an adventurer entered the dungeon.
    AgentSpawned {
        /// Identifier assigned to the adventurer.
        agent: AgentId,
        /// Profession of the adventurer.
        class: AgentClass,
        /// Display name of the adventurer.
        name: String,
        /// Level the stat block was derived from.
        level: u32,
        /// Cell the adventurer starts on.
        at: GridPos,
    },
    /// Announces that an adventurer is waiting for its next movement target.
    DecisionNeeded {
        /// Identifier of the waiting adventurer.
        agent: AgentId,
    },
    /// Reports that a trap sprang under an adventurer.
    TrapSprung {
        /// Floor holding the trap.
        floor: FloorId,
        /// Cell holding the trap.
        at: GridPos,
        /// Adventurer that triggered the trap.
        agent: AgentId,
        /// Damage dealt by the trap.
        damage: u32,
    },
    /// Reports that an adventurer collected a treasure.
    TreasureLooted {
        /// Floor the treasure sat on.
        floor: FloorId,
        /// Cell the treasure sat on.
        at: GridPos,
        /// Adventurer that collected the treasure.
        agent: AgentId,
        /// Loot value credited to the adventurer.
        value: u32,
    },
    /// Reports damage dealt by an adventurer to a monster.
    MonsterStruck {
        /// Attacking adventurer.
        agent: AgentId,
        /// Floor holding the monster.
        floor: FloorId,
        /// Cell holding the monster.
        at: GridPos,
        /// Damage dealt to the monster.
        damage: u32,
        /// Monster hit points remaining after the strike.
        remaining_hp: u32,
    },
    /// Reports that a monster was slain and removed from its tile.
    MonsterSlain {
        /// Floor the monster defended.
        floor: FloorId,
        /// Cell the monster defended.
        at: GridPos,
    },
    /// Reports counterattack damage dealt to an adventurer.
    AgentStruck {
        /// Adventurer that took the hit.
        agent: AgentId,
        /// Damage dealt to the adventurer.
        damage: u32,
        /// Adventurer hit points remaining after the strike.
        remaining_hp: u32,
    },
    /// Announces that an adventurer died inside the dungeon.
    AgentDied {
        /// Identifier of the fallen adventurer.
        agent: AgentId,
        /// Level of the fallen adventurer, for reward accounting.
        level: u32,
    },
    /// Announces that an adventurer escaped through the entrance.
    AgentEscaped {
        /// Identifier of the escaped adventurer.
        agent: AgentId,
        /// Loot the adventurer carried out.
        loot: u32,
    },
    /// Announces that a hero descended to the next floor.
    AgentDescended {
        /// Identifier of the descending adventurer.
        agent: AgentId,
        /// Floor the adventurer arrived on.
        floor: FloorId,
    },
    /// Announces that an adventurer reached the dungeon core. Terminal for
    /// the whole session; reported upward, never handled inside the world.
    CoreReached {
        /// Identifier of the adventurer that reached the core.
        agent: AgentId,
    },
}

/// Reasons an occupant placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies beyond the floor bounds.
    OutOfBounds,
    /// The requested cell is not a plain floor tile.
    NotFloor,
    /// The requested cell already holds an occupant.
    Occupied,
    /// No floor with the provided identifier exists.
    MissingFloor,
}

/// Reasons a wall build or demolish request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildError {
    /// The requested cell lies beyond the floor bounds.
    OutOfBounds,
    /// Building requires an unoccupied plain floor tile.
    NotFloor,
    /// Demolishing requires a wall tile.
    NotWall,
    /// The requested cell holds an occupant.
    Occupied,
    /// No floor with the provided identifier exists.
    MissingFloor,
}

/// Reasons a move request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveError {
    /// The destination cell lies beyond the floor bounds.
    OutOfBounds,
    /// The source cell holds nothing movable.
    MissingSource,
    /// No floor with the provided identifier exists.
    MissingFloor,
    /// The destination cell already holds an occupant.
    DestinationOccupied,
    /// The destination cell is itself a special tile.
    DestinationSpecial,
    /// Plain occupants cannot be dropped onto wall tiles.
    WallDestination,
}
