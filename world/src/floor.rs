//! Tile grid owned by a single dungeon floor.

use std::time::Duration;

use dungeon_warden_core::{
    FloorId, GridPos, Occupant, OccupantKind, PlacementError, RectSize, TileKind, TileRect,
};

/// Width of every floor measured in tiles.
pub const FLOOR_WIDTH: u32 = 10;
/// Height of every floor measured in tiles.
pub const FLOOR_HEIGHT: u32 = 10;

/// Cell the entrance marker starts on when a floor is generated.
pub const ENTRANCE_CELL: GridPos = GridPos::new(5, 1);
/// Cell the stairs marker starts on when a floor is generated.
pub const STAIRS_CELL: GridPos = GridPos::new(5, 8);

const INITIAL_ROOM: TileRect =
    TileRect::from_origin_and_size(GridPos::new(2, 2), RectSize::new(6, 6));

/// A single dungeon cell: its kind, the kind hidden beneath a special
/// marker, and at most one occupant entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    kind: TileKind,
    underlay: Option<TileKind>,
    occupant: Option<Occupant>,
}

impl Tile {
    const fn wall() -> Self {
        Self {
            kind: TileKind::Wall,
            underlay: None,
            occupant: None,
        }
    }

    /// Current kind of the tile.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        self.kind
    }

    /// Kind hidden beneath a special marker, if one was recorded.
    #[must_use]
    pub const fn underlay(&self) -> Option<TileKind> {
        self.underlay
    }

    /// Occupant entity currently sitting on the tile, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<&Occupant> {
        self.occupant.as_ref()
    }

    /// Reports whether the tile currently holds an occupant.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Stamps a special marker onto the tile, recording the displaced kind
    /// strictly before it is overwritten.
    pub(crate) fn overlay_special(&mut self, kind: TileKind) {
        self.underlay = Some(self.kind);
        self.kind = kind;
    }

    /// Removes a special marker, restoring the recorded underlay. Tiles with
    /// no record default to plain floor so the dungeon stays walkable.
    pub(crate) fn restore_underlay(&mut self) {
        self.kind = self.underlay.take().unwrap_or(TileKind::Floor);
        self.occupant = None;
    }

    pub(crate) fn set_kind(&mut self, kind: TileKind) {
        self.kind = kind;
    }

    pub(crate) fn occupant_mut(&mut self) -> Option<&mut Occupant> {
        self.occupant.as_mut()
    }

    pub(crate) fn take_occupant(&mut self) -> Option<Occupant> {
        self.occupant.take()
    }

    pub(crate) fn set_occupant(&mut self, occupant: Occupant) {
        self.occupant = Some(occupant);
    }

    pub(crate) fn restore(
        kind: TileKind,
        underlay: Option<TileKind>,
        occupant: Option<Occupant>,
    ) -> Self {
        Self {
            kind,
            underlay,
            occupant,
        }
    }
}

/// One floor of the dungeon: a fixed-size tile grid plus the rectangles of
/// every room carved into it.
#[derive(Clone, Debug, PartialEq)]
pub struct Floor {
    number: FloorId,
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    rooms: Vec<TileRect>,
}

impl Floor {
    /// Creates a floor with the basic layout: one carved room, the entrance
    /// marker, and the stairs marker at their fixed cells.
    #[must_use]
    pub(crate) fn new(number: FloorId) -> Self {
        let mut floor = Self {
            number,
            width: FLOOR_WIDTH,
            height: FLOOR_HEIGHT,
            tiles: vec![Tile::wall(); (FLOOR_WIDTH * FLOOR_HEIGHT) as usize],
            rooms: Vec::new(),
        };
        floor.carve_room(INITIAL_ROOM);
        if let Some(tile) = floor.tile_mut(ENTRANCE_CELL) {
            tile.overlay_special(TileKind::Entrance);
        }
        if let Some(tile) = floor.tile_mut(STAIRS_CELL) {
            tile.overlay_special(TileKind::Stairs);
        }
        floor
    }

    pub(crate) fn from_parts(
        number: FloorId,
        width: u32,
        height: u32,
        tiles: Vec<Tile>,
        rooms: Vec<TileRect>,
    ) -> Self {
        Self {
            number,
            width,
            height,
            tiles,
            rooms,
        }
    }

    /// One-based number of the floor.
    #[must_use]
    pub const fn number(&self) -> FloorId {
        self.number
    }

    /// Width of the floor in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the floor in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Rectangles of every room carved into the floor, in carve order.
    #[must_use]
    pub fn rooms(&self) -> &[TileRect] {
        &self.rooms
    }

    /// Single source of truth for placement and movement bounds.
    #[must_use]
    pub fn is_valid_position(&self, pos: GridPos) -> bool {
        pos.x() < self.width && pos.y() < self.height
    }

    /// Tile at the provided position, if it lies within bounds.
    #[must_use]
    pub fn tile(&self, pos: GridPos) -> Option<&Tile> {
        self.index(pos).map(|index| &self.tiles[index])
    }

    pub(crate) fn tile_mut(&mut self, pos: GridPos) -> Option<&mut Tile> {
        self.index(pos).map(move |index| &mut self.tiles[index])
    }

    /// Attempts to place an occupant. Succeeds only on an in-bounds,
    /// unoccupied, plain floor tile.
    pub(crate) fn place_occupant(
        &mut self,
        occupant: Occupant,
        at: GridPos,
    ) -> Result<(), PlacementError> {
        let Some(tile) = self.tile_mut(at) else {
            return Err(PlacementError::OutOfBounds);
        };
        if tile.kind() != TileKind::Floor {
            return Err(PlacementError::NotFloor);
        }
        if tile.is_occupied() {
            return Err(PlacementError::Occupied);
        }
        tile.set_occupant(occupant);
        Ok(())
    }

    /// Clears the occupant at the provided position. In-bounds positions
    /// always succeed; out-of-bounds positions are a no-op.
    pub(crate) fn remove_occupant(&mut self, at: GridPos) -> Option<Occupant> {
        self.tile_mut(at).and_then(Tile::take_occupant)
    }

    /// Converts every wall cell inside the rectangle to floor, clamped to
    /// the grid bounds, and records the rectangle for provenance.
    pub(crate) fn carve_room(&mut self, rect: TileRect) {
        let x_end = (rect.origin().x() + rect.size().width()).min(self.width);
        let y_end = (rect.origin().y() + rect.size().height()).min(self.height);
        for y in rect.origin().y()..y_end {
            for x in rect.origin().x()..x_end {
                if let Some(tile) = self.tile_mut(GridPos::new(x, y)) {
                    if tile.kind() == TileKind::Wall {
                        tile.set_kind(TileKind::Floor);
                    }
                }
            }
        }
        self.rooms.push(rect);
    }

    /// Locates the first tile of the provided kind in row-major order.
    #[must_use]
    pub fn find_tile(&self, kind: TileKind) -> Option<GridPos> {
        for y in 0..self.height {
            for x in 0..self.width {
                let pos = GridPos::new(x, y);
                if self.tile(pos).map(Tile::kind) == Some(kind) {
                    return Some(pos);
                }
            }
        }
        None
    }

    /// Reports whether an agent may step onto the tile. Walls block, as do
    /// monsters and treasures; traps are concealed and do not block.
    #[must_use]
    pub fn is_passable(&self, pos: GridPos) -> bool {
        self.tile(pos).is_some_and(|tile| {
            tile.kind().is_walkable()
                && !matches!(
                    tile.occupant().map(Occupant::kind),
                    Some(OccupantKind::Monster | OccupantKind::Treasure)
                )
        })
    }

    pub(crate) fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Counts down every trap's rearm timer by the elapsed tick.
    pub(crate) fn tick_traps(&mut self, dt: Duration) {
        for tile in &mut self.tiles {
            if let Some(Occupant::Trap(trap)) = tile.occupant_mut() {
                trap.cooldown = trap.cooldown.saturating_sub(dt);
            }
        }
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if self.is_valid_position(pos) {
            let x = usize::try_from(pos.x()).ok()?;
            let y = usize::try_from(pos.y()).ok()?;
            let width = usize::try_from(self.width).ok()?;
            Some(y * width + x)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_warden_core::Treasure;

    #[test]
    fn fresh_floor_has_fixed_layout() {
        let floor = Floor::new(FloorId::new(1));

        assert_eq!(
            floor.tile(ENTRANCE_CELL).map(Tile::kind),
            Some(TileKind::Entrance)
        );
        assert_eq!(
            floor.tile(STAIRS_CELL).map(Tile::kind),
            Some(TileKind::Stairs)
        );
        assert_eq!(floor.rooms().len(), 1);

        // The carved room is plain floor, everything else wall.
        for y in 0..floor.height() {
            for x in 0..floor.width() {
                let pos = GridPos::new(x, y);
                if pos == ENTRANCE_CELL || pos == STAIRS_CELL {
                    continue;
                }
                let expected = if INITIAL_ROOM.contains(pos) {
                    TileKind::Floor
                } else {
                    TileKind::Wall
                };
                assert_eq!(floor.tile(pos).map(Tile::kind), Some(expected), "{pos:?}");
            }
        }
    }

    #[test]
    fn special_markers_record_displaced_kind() {
        let floor = Floor::new(FloorId::new(1));
        // Both fixed cells sit outside the carved room, so the displaced
        // kind is wall.
        assert_eq!(
            floor.tile(ENTRANCE_CELL).and_then(Tile::underlay),
            Some(TileKind::Wall)
        );
        assert_eq!(
            floor.tile(STAIRS_CELL).and_then(Tile::underlay),
            Some(TileKind::Wall)
        );
    }

    #[test]
    fn is_valid_position_matches_bounds_exactly() {
        let floor = Floor::new(FloorId::new(1));
        for y in 0..FLOOR_HEIGHT {
            for x in 0..FLOOR_WIDTH {
                assert!(floor.is_valid_position(GridPos::new(x, y)));
            }
        }
        assert!(!floor.is_valid_position(GridPos::new(FLOOR_WIDTH, 0)));
        assert!(!floor.is_valid_position(GridPos::new(0, FLOOR_HEIGHT)));
    }

    #[test]
    fn placement_requires_plain_floor() {
        let mut floor = Floor::new(FloorId::new(1));
        let chest = || Occupant::Treasure(Treasure::new("Chest", 100));

        assert_eq!(
            floor.place_occupant(chest(), GridPos::new(0, 0)),
            Err(PlacementError::NotFloor),
            "wall cells must reject placement"
        );
        assert_eq!(
            floor.place_occupant(chest(), ENTRANCE_CELL),
            Err(PlacementError::NotFloor),
            "special cells must reject placement"
        );
        assert_eq!(
            floor.place_occupant(chest(), GridPos::new(20, 0)),
            Err(PlacementError::OutOfBounds)
        );
        assert_eq!(floor.place_occupant(chest(), GridPos::new(3, 3)), Ok(()));
        assert_eq!(
            floor.place_occupant(chest(), GridPos::new(3, 3)),
            Err(PlacementError::Occupied),
            "a tile holds at most one occupant"
        );
    }

    #[test]
    fn remove_occupant_is_noop_out_of_bounds() {
        let mut floor = Floor::new(FloorId::new(1));
        assert!(floor.remove_occupant(GridPos::new(99, 99)).is_none());
    }

    #[test]
    fn carve_room_leaves_non_wall_cells_untouched() {
        let mut floor = Floor::new(FloorId::new(1));
        let rect = TileRect::from_origin_and_size(GridPos::new(4, 0), RectSize::new(3, 4));
        floor.carve_room(rect);

        assert_eq!(
            floor.tile(ENTRANCE_CELL).map(Tile::kind),
            Some(TileKind::Entrance),
            "carving must not overwrite special markers"
        );
        assert_eq!(
            floor.tile(GridPos::new(4, 0)).map(Tile::kind),
            Some(TileKind::Floor)
        );
        assert_eq!(floor.rooms().len(), 2);
    }

    #[test]
    fn carve_room_clamps_to_grid_bounds() {
        let mut floor = Floor::new(FloorId::new(1));
        let rect = TileRect::from_origin_and_size(GridPos::new(8, 8), RectSize::new(5, 5));
        floor.carve_room(rect);
        assert_eq!(
            floor.tile(GridPos::new(9, 9)).map(Tile::kind),
            Some(TileKind::Floor)
        );
    }
}
