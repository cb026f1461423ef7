#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Adventurer decision policy.
//!
//! The world flags adventurers waiting at their target cell; this system
//! answers with movement targets and strikes. Decisions follow a strict
//! priority: flee toward the entrance when wounded or carrying loot, chase
//! treasure spotted in a straight line, fight the monster directly ahead,
//! and otherwise follow the corridor with an occasional randomized branch.
//! All randomness lives here, behind a seedable generator, so a fixed seed
//! replays identical runs.

use dungeon_warden_core::{Command, Direction, Event, GridPos, Occupant, TileKind};
use dungeon_warden_world::{query, Floor};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

mod path;

/// Chance of taking a random branch at a junction instead of following the
/// corridor.
const BRANCH_CHANCE: f64 = 0.3;

/// Sight rays stop after this many cells.
const SIGHT_RANGE: u32 = 9;

/// Pure system that decides where waiting adventurers move next.
#[derive(Clone, Debug)]
pub struct AgentBehavior {
    rng: ChaCha8Rng,
}

impl AgentBehavior {
    /// Creates the policy with a deterministic branching seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Consumes world events and answers every waiting adventurer with a
    /// target or strike command.
    pub fn handle(
        &mut self,
        events: &[Event],
        agents: &query::AgentView,
        dungeon: query::DungeonView<'_>,
        out: &mut Vec<Command>,
    ) {
        let triggered = events.iter().any(|event| {
            matches!(
                event,
                Event::TimeAdvanced { .. } | Event::DecisionNeeded { .. }
            )
        });
        if !triggered {
            return;
        }

        for agent in agents.iter().filter(|agent| agent.needs_decision) {
            let Some(floor) = dungeon.floor(agent.floor) else {
                continue;
            };
            self.decide(agent, floor, out);
        }
    }

    fn decide(&mut self, agent: &query::AgentSnapshot, floor: &Floor, out: &mut Vec<Command>) {
        let at = agent.cell;

        // Wounded or loot-laden adventurers head for the entrance. When the
        // pathfinder exhausts its frontier the corridor fallback keeps them
        // wandering; a fully boxed-in adventurer simply holds.
        if agent.escape_mode || agent.hp * 2 <= agent.max_hp {
            if let Some(entrance) = floor.find_tile(TileKind::Entrance) {
                let step = path::first_step_toward(floor, at, entrance)
                    .or_else(|| corridor_step(floor, agent));
                if let Some(to) = step {
                    out.push(Command::SetAgentTarget {
                        agent: agent.id,
                        to,
                    });
                }
            }
            return;
        }

        // Heroes ignore treasure entirely.
        if !agent.class.is_hero() {
            if let Some(to) = treasure_in_sight(floor, at) {
                out.push(Command::SetAgentTarget {
                    agent: agent.id,
                    to,
                });
                return;
            }
        }

        if monster_ahead(floor, agent) {
            out.push(Command::Strike { agent: agent.id });
            return;
        }

        let exits = available_exits(floor, at);
        if exits.len() >= 2 && self.rng.gen_bool(BRANCH_CHANCE) {
            let candidates: Vec<GridPos> = exits
                .iter()
                .copied()
                .filter(|cell| Some(*cell) != agent.last_move)
                .collect();
            if !candidates.is_empty() {
                let to = candidates[self.rng.gen_range(0..candidates.len())];
                out.push(Command::SetAgentTarget {
                    agent: agent.id,
                    to,
                });
                return;
            }
        }

        if let Some(to) = corridor_step(floor, agent) {
            out.push(Command::SetAgentTarget {
                agent: agent.id,
                to,
            });
        } else if let Some(to) = agent.last_move {
            // Dead end: retreat to the cell just vacated.
            out.push(Command::SetAgentTarget {
                agent: agent.id,
                to,
            });
        }
    }
}

/// Corridor-following order: straight ahead, then the perpendicular sides,
/// then reverse. The vacated cell is avoided except when reversing.
fn corridor_step(floor: &Floor, agent: &query::AgentSnapshot) -> Option<GridPos> {
    let at = agent.cell;

    if let Some(cell) = at.step(agent.direction) {
        if floor.is_passable(cell) && Some(cell) != agent.last_move {
            return Some(cell);
        }
    }

    for side in agent.direction.perpendicular() {
        if let Some(cell) = at.step(side) {
            if floor.is_passable(cell) && Some(cell) != agent.last_move {
                return Some(cell);
            }
        }
    }

    at.step(agent.direction.opposite())
        .filter(|cell| floor.is_passable(*cell))
}

/// Scans four straight rays for the nearest visible treasure. Walls block
/// sight; other occupants do not.
fn treasure_in_sight(floor: &Floor, from: GridPos) -> Option<GridPos> {
    for direction in Direction::ALL {
        let mut cell = from;
        for _ in 0..SIGHT_RANGE {
            let Some(next) = cell.step(direction) else {
                break;
            };
            let Some(tile) = floor.tile(next) else {
                break;
            };
            if tile.kind() == TileKind::Wall {
                break;
            }
            if matches!(tile.occupant(), Some(Occupant::Treasure(_))) {
                return Some(next);
            }
            cell = next;
        }
    }
    None
}

fn monster_ahead(floor: &Floor, agent: &query::AgentSnapshot) -> bool {
    agent
        .cell
        .step(agent.direction)
        .and_then(|cell| floor.tile(cell))
        .is_some_and(|tile| matches!(tile.occupant(), Some(Occupant::Monster(_))))
}

fn available_exits(floor: &Floor, at: GridPos) -> Vec<GridPos> {
    Direction::ALL
        .iter()
        .filter_map(|direction| at.step(*direction))
        .filter(|cell| floor.is_passable(*cell))
        .collect()
}
