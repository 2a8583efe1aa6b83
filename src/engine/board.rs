use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Width and height of the square grid.
pub const GRID_SIZE: usize = 4;

/// Cell coordinate on the grid, `x` is the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// True if the position lies on the grid.
    ///
    /// ```
    /// use mint_2048::engine::Position;
    /// assert!(Position::new(3, 3).in_bounds());
    /// assert!(!Position::new(4, 0).in_bounds());
    /// ```
    #[inline]
    pub const fn in_bounds(self) -> bool {
        self.x < GRID_SIZE && self.y < GRID_SIZE
    }
}

/// Stable identity of a live tile. Never reused within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A numbered tile. `value` is a power of two, at least 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub value: u32,
    pub position: Position,
}

/// True for the values a tile may carry: powers of two from 2 up.
#[inline]
pub fn is_tile_value(value: u32) -> bool {
    value >= 2 && value.is_power_of_two()
}

/// A tile that has not been placed yet: the spawner's request to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTile {
    pub position: Position,
    pub value: u32,
}

/// Live tiles keyed by id.
///
/// Iteration follows insertion order so a renderer can use ids as stable
/// animation keys. Ids come from a monotonically increasing counter owned by
/// the registry, which keeps id allocation deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileRegistry {
    tiles: HashMap<TileId, Tile>,
    order: Vec<TileId>,
    next_id: u32,
}

impl TileRegistry {
    /// An empty registry whose first id is `#0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh id.
    #[inline]
    pub fn allocate_id(&mut self) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a tile with a fresh id and register it.
    pub fn create(&mut self, value: u32, position: Position) -> Tile {
        let tile = Tile { id: self.allocate_id(), value, position };
        self.insert(tile);
        tile
    }

    /// Register a tile, replacing any tile with the same id in place.
    pub fn insert(&mut self, tile: Tile) {
        if self.tiles.insert(tile.id, tile).is_none() {
            self.order.push(tile.id);
        }
        if tile.id.0 >= self.next_id {
            self.next_id = tile.id.0 + 1;
        }
    }

    /// Look up a live tile.
    #[inline]
    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    /// Move a registered tile, keeping its id and its place in iteration
    /// order. Returns false if the id is unknown.
    pub fn relocate(&mut self, id: TileId, position: Position) -> bool {
        match self.tiles.get_mut(&id) {
            Some(tile) => {
                tile.position = position;
                true
            }
            None => false,
        }
    }

    /// Unregister a tile, returning it if it was live.
    pub fn remove(&mut self, id: TileId) -> Option<Tile> {
        let removed = self.tiles.remove(&id)?;
        self.order.retain(|&other| other != id);
        Some(removed)
    }

    /// Keep only the tiles for which `keep` returns true, preserving order.
    ///
    /// ```
    /// use mint_2048::engine::{Position, TileRegistry};
    /// let mut tiles = TileRegistry::new();
    /// tiles.create(2, Position::new(0, 0));
    /// let kept = tiles.create(4, Position::new(1, 0));
    /// tiles.create(8, Position::new(2, 0));
    /// tiles.retain(|t| t.value != 2);
    /// assert_eq!(tiles.ids()[0], kept.id);
    /// assert_eq!(tiles.len(), 2);
    /// ```
    pub fn retain<F: FnMut(&Tile) -> bool>(&mut self, mut keep: F) {
        let tiles = &mut self.tiles;
        self.order.retain(|id| match tiles.get(id) {
            Some(tile) if keep(tile) => true,
            _ => {
                tiles.remove(id);
                false
            }
        });
    }

    /// Number of live tiles.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// True if `id` refers to a live tile.
    #[inline]
    pub fn contains(&self, id: TileId) -> bool {
        self.tiles.contains_key(&id)
    }

    /// Tiles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.order.iter().filter_map(move |id| self.tiles.get(id))
    }

    /// Live ids in insertion order; the rendering key order.
    pub fn ids(&self) -> &[TileId] {
        &self.order
    }
}

/// The `GRID_SIZE x GRID_SIZE` grid of tile references.
///
/// Cells only hold ids; values and identities live in a [`TileRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [[Option<TileId>; GRID_SIZE]; GRID_SIZE],
}

impl Board {
    /// A board with no tiles.
    pub const EMPTY: Board = Board { cells: [[None; GRID_SIZE]; GRID_SIZE] };

    /// Build a board and registry from a value grid indexed `[y][x]`; 0 means empty.
    ///
    /// Ids are assigned in row-major order starting at 0.
    ///
    /// ```
    /// use mint_2048::engine::{Board, Position};
    /// let (board, tiles) = Board::from_values([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]);
    /// assert_eq!(tiles.len(), 2);
    /// assert!(board.get(Position::new(3, 3)).is_some());
    /// ```
    pub fn from_values(values: [[u32; GRID_SIZE]; GRID_SIZE]) -> (Board, TileRegistry) {
        let mut board = Board::EMPTY;
        let mut tiles = TileRegistry::new();
        for (y, row) in values.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                if value != 0 {
                    let tile = tiles.create(value, Position::new(x, y));
                    board.set(tile.position, Some(tile.id));
                }
            }
        }
        (board, tiles)
    }

    /// Tile id at `pos`; `None` for an empty cell or a position off the grid.
    ///
    /// ```
    /// use mint_2048::engine::{Board, Position};
    /// let (board, _) = Board::from_values([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
    /// assert!(board.get(Position::new(0, 0)).is_some());
    /// assert!(board.get(Position::new(1, 0)).is_none());
    /// assert!(board.get(Position::new(4, 0)).is_none());
    /// ```
    #[inline]
    pub fn get(&self, pos: Position) -> Option<TileId> {
        self.cells.get(pos.y).and_then(|row| row.get(pos.x)).copied().flatten()
    }

    /// Point the cell at `pos` to `id`. Off-grid positions are ignored.
    #[inline]
    pub fn set(&mut self, pos: Position, id: Option<TileId>) {
        if let Some(cell) = self.cells.get_mut(pos.y).and_then(|row| row.get_mut(pos.x)) {
            *cell = id;
        }
    }

    /// Every empty cell in row-major order.
    pub fn empty_cells(&self) -> Vec<Position> {
        all_positions().filter(|&pos| self.get(pos).is_none()).collect()
    }

    /// Occupied cells with their tile ids, row-major.
    pub fn occupied(&self) -> impl Iterator<Item = (Position, TileId)> + '_ {
        all_positions().filter_map(move |pos| self.get(pos).map(|id| (pos, id)))
    }

    /// Number of cells without a tile.
    #[inline]
    pub fn count_empty(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| cell.is_none()).count()
    }

    /// True when no cell is empty.
    ///
    /// ```
    /// use mint_2048::engine::Board;
    /// assert!(!Board::EMPTY.is_full());
    /// let (full, _) = Board::from_values([[2; 4]; 4]);
    /// assert!(full.is_full());
    /// ```
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count_empty() == 0
    }

    /// Resolve the grid to tile values (0 for empty) using `tiles`.
    pub fn values(&self, tiles: &TileRegistry) -> [[u32; GRID_SIZE]; GRID_SIZE] {
        let mut out = [[0; GRID_SIZE]; GRID_SIZE];
        for (pos, id) in self.occupied() {
            out[pos.y][pos.x] = tiles.get(id).map_or(0, |t| t.value);
        }
        out
    }

    /// True when every occupied cell points to a registered tile located at that cell.
    pub fn is_consistent_with(&self, tiles: &TileRegistry) -> bool {
        self.occupied().all(|(pos, id)| tiles.get(id).is_some_and(|t| t.position == pos))
    }
}

/// All cells in row-major order.
pub fn all_positions() -> impl Iterator<Item = Position> {
    (0..GRID_SIZE).flat_map(|y| (0..GRID_SIZE).map(move |x| Position::new(x, y)))
}

/// Boxed text rendering of a value grid, one row per line.
pub fn render_values(values: &[[u32; GRID_SIZE]; GRID_SIZE], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let divider = "-".repeat(GRID_SIZE * 8);
    writeln!(f)?;
    for (y, row) in values.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(format_val).collect();
        writeln!(f, "{}", cells.join("|"))?;
        if y + 1 < GRID_SIZE {
            writeln!(f, "{divider}")?;
        }
    }
    Ok(())
}

fn format_val(val: &u32) -> String {
    match val {
        0 => " ".repeat(7),
        x => format!("{:^7}", x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_lists_empty_cells_row_major() {
        let (board, _) = Board::from_values([[2, 0, 2, 2], [2, 2, 2, 0], [2; 4], [2; 4]]);
        assert_eq!(board.empty_cells(), vec![Position::new(1, 0), Position::new(3, 1)]);
        assert_eq!(board.count_empty(), 2);
        assert!(!board.is_full());
    }

    #[test]
    fn it_detects_full_board() {
        let (board, tiles) = Board::from_values([[2; 4]; 4]);
        assert!(board.is_full());
        assert!(board.empty_cells().is_empty());
        assert_eq!(tiles.len(), 16);
        assert!(Board::EMPTY.empty_cells().len() == GRID_SIZE * GRID_SIZE);
    }

    #[test]
    fn it_keeps_board_and_registry_in_sync() {
        let values = [[0, 4, 0, 0], [2, 0, 0, 8], [0; 4], [0, 0, 16, 0]];
        let (board, tiles) = Board::from_values(values);
        assert!(board.is_consistent_with(&tiles));
        assert_eq!(board.occupied().count(), tiles.len());
        assert_eq!(board.values(&tiles), values);
    }

    #[test]
    fn test_registry_preserves_insertion_order() {
        let mut tiles = TileRegistry::new();
        let a = tiles.create(2, Position::new(0, 0));
        let b = tiles.create(4, Position::new(1, 0));
        let c = tiles.create(8, Position::new(2, 0));
        tiles.remove(b.id);
        let d = tiles.create(16, Position::new(3, 0));
        let ids: Vec<_> = tiles.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a.id, c.id, d.id]);
        // ids are never reused
        assert_eq!(d.id, TileId(3));
    }

    #[test]
    fn test_registry_retain() {
        let mut tiles = TileRegistry::new();
        for x in 0..4 {
            tiles.create(2 << x, Position::new(x, 0));
        }
        tiles.retain(|t| t.value >= 8);
        let values: Vec<_> = tiles.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![8, 16]);
        assert_eq!(tiles.len(), 2);
        assert!(!tiles.contains(TileId(0)));
    }
}
