#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure builder-mode system that turns player clicks into dungeon commands.
//!
//! The builder validates each click against an injected tile view and gates
//! every paid operation through an injected `spend` closure, so commands are
//! only emitted when the world will accept them and the treasury covered the
//! price. It never touches world state directly.

use dungeon_warden_core::{
    Command, FloorId, GridPos, Monster, Occupant, RectSize, TileKind, TileRect, Trap, Treasure,
};
use rand::Rng;

/// Dungeon points charged for appending a new floor.
pub const ADD_FLOOR_COST: u32 = 1000;

const WALL_COST_START: u32 = 10;
const WALL_COST_STEP: u32 = 10;

/// Facts about a single tile the builder needs to validate a click.
///
/// Adapters derive these from the world's `query` views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileInfo {
    /// Current kind of the tile.
    pub kind: TileKind,
    /// Whether the tile holds an occupant entity.
    pub occupied: bool,
}

/// Priced blueprint offered on the build palette.
#[derive(Clone, Debug, PartialEq)]
pub struct Blueprint {
    /// Entity produced when the blueprint is placed.
    pub occupant: Occupant,
    /// Dungeon points charged when the blueprint is selected.
    pub cost: u32,
}

impl Blueprint {
    fn monster(name: &str, level: u32, cost: u32) -> Self {
        Self {
            occupant: Occupant::Monster(Monster::from_level(name, level)),
            cost,
        }
    }

    fn trap(name: &str, damage: u32, cost: u32) -> Self {
        Self {
            occupant: Occupant::Trap(Trap::new(name, damage)),
            cost,
        }
    }

    fn treasure(name: &str, value: u32, cost: u32) -> Self {
        Self {
            occupant: Occupant::Treasure(Treasure::new(name, value)),
            cost,
        }
    }
}

/// Stock monster palette, cheapest first.
#[must_use]
pub fn monster_palette() -> Vec<Blueprint> {
    vec![
        Blueprint::monster("Slime", 1, 50),
        Blueprint::monster("Goblin", 2, 100),
        Blueprint::monster("Orc", 3, 200),
        Blueprint::monster("Troll", 4, 400),
        Blueprint::monster("Dragon", 5, 800),
    ]
}

/// Stock trap palette, cheapest first.
#[must_use]
pub fn trap_palette() -> Vec<Blueprint> {
    vec![
        Blueprint::trap("Pitfall", 10, 30),
        Blueprint::trap("Arrow Trap", 15, 50),
        Blueprint::trap("Spike Trap", 20, 80),
        Blueprint::trap("Flame Trap", 25, 100),
        Blueprint::trap("Poison Gas Trap", 30, 150),
    ]
}

/// Stock treasure palette, cheapest first.
#[must_use]
pub fn treasure_palette() -> Vec<Blueprint> {
    vec![
        Blueprint::treasure("Small Chest", 50, 20),
        Blueprint::treasure("Chest", 100, 40),
        Blueprint::treasure("Large Chest", 200, 80),
        Blueprint::treasure("Luxurious Chest", 500, 200),
        Blueprint::treasure("Legendary Chest", 1000, 400),
    ]
}

/// Exclusive editing mode the builder currently operates in.
#[derive(Clone, Debug, PartialEq)]
pub enum BuilderMode {
    /// No tool selected; clicking an occupant or special tile starts a move.
    Idle,
    /// A blueprint is selected and awaits a placement click.
    Placing {
        /// Entity that will be placed by the next valid click.
        occupant: Occupant,
    },
    /// Clicks convert unoccupied floor tiles into walls.
    WallBuilding,
    /// Clicks convert wall tiles back into floor.
    WallDestroying,
    /// A source was picked up and awaits a destination click.
    Moving {
        /// Whether the source is a special tile rather than an occupant.
        special: bool,
        /// Floor the source sits on.
        floor: FloorId,
        /// Cell the source sits on.
        from: GridPos,
    },
}

/// Result of a single click, for adapter feedback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click matched nothing actionable.
    Ignored,
    /// A placement command was emitted and the selection consumed.
    EntityPlaced,
    /// A wall build command was emitted.
    WallRaised,
    /// A wall demolish command was emitted.
    WallRemoved,
    /// An occupant or special tile was picked up for moving.
    MoveStarted,
    /// A move command was emitted and the move mode left.
    MoveCompleted,
    /// The active mode rejected the clicked tile; the mode is kept.
    InvalidTile,
    /// The treasury could not cover the price; the mode is kept.
    InsufficientFunds,
}

/// Builder-mode system translating clicks into validated commands.
#[derive(Clone, Debug)]
pub struct Builder {
    mode: BuilderMode,
    wall_cost: u32,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a builder in idle mode with the starting wall price.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: BuilderMode::Idle,
            wall_cost: WALL_COST_START,
        }
    }

    /// Mode the builder currently operates in.
    #[must_use]
    pub fn mode(&self) -> &BuilderMode {
        &self.mode
    }

    /// Price of raising the next wall.
    #[must_use]
    pub const fn wall_build_cost(&self) -> u32 {
        self.wall_cost
    }

    /// Price of demolishing the next wall. Shares the sliding wall price:
    /// building lowers it, demolishing raises it.
    #[must_use]
    pub const fn wall_demolish_cost(&self) -> u32 {
        self.wall_cost
    }

    /// Price of expanding a room, pinned to the current wall price.
    #[must_use]
    pub const fn expand_room_cost(&self) -> u32 {
        self.wall_cost
    }

    /// Selects a blueprint for placement, paying its price up front.
    ///
    /// Returns `false` without changing mode when the treasury cannot cover
    /// the cost.
    pub fn select_blueprint<S>(&mut self, blueprint: &Blueprint, mut spend: S) -> bool
    where
        S: FnMut(u32) -> bool,
    {
        if !spend(blueprint.cost) {
            return false;
        }
        self.mode = BuilderMode::Placing {
            occupant: blueprint.occupant.clone(),
        };
        true
    }

    /// Switches to wall-building mode, cancelling any other tool.
    pub fn begin_wall_building(&mut self) {
        self.mode = BuilderMode::WallBuilding;
    }

    /// Switches to wall-destroying mode, cancelling any other tool.
    pub fn begin_wall_demolition(&mut self) {
        self.mode = BuilderMode::WallDestroying;
    }

    /// Drops the active tool and any pending move.
    pub fn cancel(&mut self) {
        self.mode = BuilderMode::Idle;
    }

    /// Emits a floor-append command when the treasury covers the price.
    pub fn add_floor<S>(&mut self, mut spend: S, out: &mut Vec<Command>) -> bool
    where
        S: FnMut(u32) -> bool,
    {
        if !spend(ADD_FLOOR_COST) {
            return false;
        }
        out.push(Command::AddFloor);
        true
    }

    /// Emits a room-carve command with a randomly sampled rectangle.
    ///
    /// The rectangle's origin lands in the upper-left quarter of the grid
    /// and its sides span three to five cells, so the carve always overlaps
    /// fresh wall.
    pub fn expand_room<R, S>(
        &mut self,
        floor: FloorId,
        rng: &mut R,
        mut spend: S,
        out: &mut Vec<Command>,
    ) -> bool
    where
        R: Rng,
        S: FnMut(u32) -> bool,
    {
        if !spend(self.wall_cost) {
            return false;
        }
        let origin = GridPos::new(rng.gen_range(0..5), rng.gen_range(0..5));
        let size = RectSize::new(rng.gen_range(3..=5), rng.gen_range(3..=5));
        out.push(Command::CarveRoom {
            floor,
            rect: TileRect::from_origin_and_size(origin, size),
        });
        true
    }

    /// Routes a click on the provided cell through the active mode.
    ///
    /// `tile_info` mirrors the world's tile data and `spend` debits the
    /// treasury, returning whether the price was covered. Commands are only
    /// emitted for clicks the world will accept, so paid operations are
    /// never half-applied.
    pub fn handle_click<T, S>(
        &mut self,
        floor: FloorId,
        at: GridPos,
        mut tile_info: T,
        mut spend: S,
        out: &mut Vec<Command>,
    ) -> ClickOutcome
    where
        T: FnMut(FloorId, GridPos) -> Option<TileInfo>,
        S: FnMut(u32) -> bool,
    {
        let Some(tile) = tile_info(floor, at) else {
            return ClickOutcome::Ignored;
        };

        match self.mode.clone() {
            BuilderMode::WallBuilding => {
                if tile.kind != TileKind::Floor || tile.occupied {
                    return ClickOutcome::InvalidTile;
                }
                if !spend(self.wall_cost) {
                    return ClickOutcome::InsufficientFunds;
                }
                self.wall_cost = self.wall_cost.saturating_sub(WALL_COST_STEP);
                out.push(Command::BuildWall { floor, at });
                ClickOutcome::WallRaised
            }
            BuilderMode::WallDestroying => {
                if tile.kind != TileKind::Wall {
                    return ClickOutcome::InvalidTile;
                }
                if !spend(self.wall_cost) {
                    return ClickOutcome::InsufficientFunds;
                }
                self.wall_cost += WALL_COST_STEP;
                out.push(Command::DemolishWall { floor, at });
                ClickOutcome::WallRemoved
            }
            BuilderMode::Moving {
                special,
                floor: floor_from,
                from,
            } => {
                let blocked = tile.occupied
                    || tile.kind.is_special()
                    || (!special && tile.kind == TileKind::Wall);
                if blocked {
                    return ClickOutcome::InvalidTile;
                }
                out.push(if special {
                    Command::MoveSpecialTile {
                        floor_from,
                        from,
                        floor_to: floor,
                        to: at,
                    }
                } else {
                    Command::MoveOccupant {
                        floor_from,
                        from,
                        floor_to: floor,
                        to: at,
                    }
                });
                self.mode = BuilderMode::Idle;
                ClickOutcome::MoveCompleted
            }
            BuilderMode::Placing { occupant } => {
                if tile.kind != TileKind::Floor || tile.occupied {
                    return ClickOutcome::InvalidTile;
                }
                out.push(Command::PlaceOccupant {
                    floor,
                    at,
                    occupant,
                });
                self.mode = BuilderMode::Idle;
                ClickOutcome::EntityPlaced
            }
            BuilderMode::Idle => {
                if tile.occupied || tile.kind.is_special() {
                    self.mode = BuilderMode::Moving {
                        special: !tile.occupied,
                        floor,
                        from: at,
                    };
                    ClickOutcome::MoveStarted
                } else {
                    ClickOutcome::Ignored
                }
            }
        }
    }
}
