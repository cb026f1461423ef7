//! Serializable snapshots of the dungeon for save and restore.
//!
//! Snapshots capture floors, tile underlays, occupants, and the core record.
//! Live adventurers are transient and never persisted. Restoring tolerates
//! sparse data: a special tile without a recorded underlay falls back to
//! plain floor, and a malformed floor grid is regenerated from scratch.

use dungeon_warden_core::{DungeonCore, FloorId, Occupant, TileKind, TileRect};
use serde::{Deserialize, Serialize};

use crate::floor::{Floor, Tile};
use crate::Dungeon;

/// Complete persisted state of a dungeon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DungeonSnapshot {
    /// Floors ordered top to bottom.
    pub floors: Vec<FloorSnapshot>,
    /// Core record, when one was anchored at save time.
    #[serde(default)]
    pub core: Option<DungeonCore>,
}

/// Persisted state of a single floor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloorSnapshot {
    /// One-based floor number.
    pub number: u32,
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    /// Row-major tile grid.
    pub tiles: Vec<TileSnapshot>,
    /// Rooms carved into the floor, in carve order.
    #[serde(default)]
    pub rooms: Vec<TileRect>,
}

/// Persisted state of a single tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileSnapshot {
    /// Current tile kind.
    pub kind: TileKind,
    /// Kind hidden beneath a special marker, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlay: Option<TileKind>,
    /// Occupant entity, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupant: Option<Occupant>,
}

/// Captures the persistable state of the dungeon.
#[must_use]
pub fn capture(dungeon: &Dungeon) -> DungeonSnapshot {
    let floors = dungeon
        .floors()
        .iter()
        .map(|floor| FloorSnapshot {
            number: floor.number().get(),
            width: floor.width(),
            height: floor.height(),
            tiles: floor
                .tiles()
                .iter()
                .map(|tile| TileSnapshot {
                    kind: tile.kind(),
                    underlay: tile.underlay(),
                    occupant: tile.occupant().cloned(),
                })
                .collect(),
            rooms: floor.rooms().to_vec(),
        })
        .collect();
    DungeonSnapshot {
        floors,
        core: dungeon.core_record(),
    }
}

/// Reconstructs a dungeon from a snapshot.
///
/// Floor numbers are reassigned from position so gaps in saved data cannot
/// desynchronize stair traversal. Grids whose tile count disagrees with
/// their dimensions are replaced with freshly generated floors.
#[must_use]
pub fn restore(snapshot: DungeonSnapshot) -> Dungeon {
    let mut floors = Vec::with_capacity(snapshot.floors.len());
    for (index, floor) in snapshot.floors.into_iter().enumerate() {
        let number = FloorId::new(index as u32 + 1);
        let expected = (floor.width as usize).saturating_mul(floor.height as usize);
        if floor.width == 0 || floor.height == 0 || floor.tiles.len() != expected {
            floors.push(Floor::new(number));
            continue;
        }
        let tiles = floor
            .tiles
            .into_iter()
            .map(|tile| {
                let underlay = if tile.kind.is_special() {
                    Some(tile.underlay.unwrap_or(TileKind::Floor))
                } else {
                    tile.underlay
                };
                Tile::restore(tile.kind, underlay, tile.occupant)
            })
            .collect();
        floors.push(Floor::from_parts(
            number,
            floor.width,
            floor.height,
            tiles,
            floor.rooms,
        ));
    }
    Dungeon::from_parts(floors, snapshot.core)
}
