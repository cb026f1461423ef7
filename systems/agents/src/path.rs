//! Escape pathfinding toward a goal cell.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use dungeon_warden_core::{Direction, GridPos};
use dungeon_warden_world::Floor;

/// Finds the first step of a cheapest path from `start` to `goal`.
///
/// Uniform-cost best-first search guided by the Manhattan distance to the
/// goal, with frontier ties broken by insertion order. Only the first step
/// is returned; the caller replans from each cell, so corridors that close
/// mid-walk are handled naturally.
pub(crate) fn first_step_toward(floor: &Floor, start: GridPos, goal: GridPos) -> Option<GridPos> {
    if start == goal {
        return None;
    }

    let width = floor.width();
    let cells = (width * floor.height()) as usize;
    let index = |pos: GridPos| (pos.y() * width + pos.x()) as usize;

    let mut visited = vec![false; cells];
    let mut parents: Vec<Option<GridPos>> = vec![None; cells];
    let mut frontier: BinaryHeap<Reverse<(u32, u64, GridPos, u32)>> = BinaryHeap::new();
    let mut sequence: u64 = 0;

    visited[index(start)] = true;
    frontier.push(Reverse((
        start.manhattan_distance(goal),
        sequence,
        start,
        0,
    )));

    while let Some(Reverse((_, _, pos, cost))) = frontier.pop() {
        if pos == goal {
            let mut step = pos;
            while let Some(parent) = parents[index(step)] {
                if parent == start {
                    return Some(step);
                }
                step = parent;
            }
            return None;
        }

        for direction in Direction::ALL {
            let Some(next) = pos.step(direction) else {
                continue;
            };
            if !floor.is_valid_position(next) || visited[index(next)] || !floor.is_passable(next) {
                continue;
            }
            visited[index(next)] = true;
            parents[index(next)] = Some(pos);
            sequence += 1;
            frontier.push(Reverse((
                cost + 1 + next.manhattan_distance(goal),
                sequence,
                next,
                cost + 1,
            )));
        }
    }

    None
}
