//! Tile grid storage, room records, and the canonical encoding used for fingerprints.

use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

use crate::types::{Pos, Rect, RoomKind, TileType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Room {
    pub rect: Rect,
    pub kind: RoomKind,
}

impl Room {
    pub fn new(x: i32, y: i32, width: i32, height: i32, kind: RoomKind) -> Self {
        Self { rect: Rect::new(x, y, width, height), kind }
    }

    pub fn center(&self) -> Pos {
        self.rect.center()
    }

    pub fn overlaps(&self, other: &Room) -> bool {
        self.rect.intersects(other.rect)
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.rect.contains(pos)
    }
}

/// A generated level. Dimensions are fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Terrain {
    width: usize,
    height: usize,
    tiles: Vec<TileType>,
    rooms: Vec<Room>,
    seed: i64,
}

impl Terrain {
    pub fn new(width: usize, height: usize, seed: i64) -> Self {
        Self { width, height, tiles: vec![TileType::Wall; width * height], rooms: Vec::new(), seed }
    }

    pub fn filled(width: usize, height: usize, seed: i64, tile: TileType) -> Self {
        Self { width, height, tiles: vec![tile; width * height], rooms: Vec::new(), seed }
    }

    /// Builds a terrain from glyph rows; unknown glyphs map to Wall.
    pub fn from_ascii(rows: &[&str], seed: i64) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let mut terrain = Terrain::new(width, height, seed);
        for (y, row) in rows.iter().enumerate() {
            for (x, glyph) in row.chars().enumerate() {
                let tile = TileType::from_glyph(glyph).unwrap_or(TileType::Wall);
                terrain.set(Pos { y: y as i32, x: x as i32 }, tile);
            }
        }
        terrain
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn tiles(&self) -> &[TileType] {
        &self.tiles
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// True for tiles not on the outermost ring.
    pub fn is_interior(&self, pos: Pos) -> bool {
        pos.x >= 1
            && pos.y >= 1
            && (pos.x as usize) + 1 < self.width
            && (pos.y as usize) + 1 < self.height
    }

    pub fn index(&self, pos: Pos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y as usize) * self.width + (pos.x as usize))
        } else {
            None
        }
    }

    pub fn get_tile(&self, x: i32, y: i32) -> TileType {
        self.get(Pos { y, x })
    }

    pub fn set_tile(&mut self, x: i32, y: i32, tile: TileType) {
        self.set(Pos { y, x }, tile);
    }

    /// Out-of-bounds reads are Wall.
    pub fn get(&self, pos: Pos) -> TileType {
        self.index(pos).map_or(TileType::Wall, |index| self.tiles[index])
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: Pos, tile: TileType) {
        if let Some(index) = self.index(pos) {
            self.tiles[index] = tile;
        }
    }

    pub fn is_walkable(&self, pos: Pos) -> bool {
        self.get(pos).is_walkable()
    }

    pub fn add_room(&mut self, room: Room) {
        self.rooms.push(room);
    }

    pub fn positions(&self) -> impl Iterator<Item = Pos> + use<> {
        let width = self.width as i32;
        let height = self.height as i32;
        (0..height).flat_map(move |y| (0..width).map(move |x| Pos { y, x }))
    }

    pub fn walkable_positions(&self) -> Vec<Pos> {
        self.positions().filter(|&pos| self.is_walkable(pos)).collect()
    }

    pub fn count(&self, tile: TileType) -> usize {
        self.tiles.iter().filter(|&&candidate| candidate == tile).count()
    }

    pub fn walkable_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_walkable()).count()
    }

    pub fn walkable_ratio(&self) -> f64 {
        if self.tiles.is_empty() {
            return 0.0;
        }
        self.walkable_count() as f64 / self.tiles.len() as f64
    }

    pub fn find(&self, tile: TileType) -> Option<Pos> {
        self.positions().find(|&pos| self.get(pos) == tile)
    }

    pub fn walkable_neighbor_count(&self, pos: Pos) -> usize {
        pos.neighbors4().into_iter().filter(|&next| self.is_walkable(next)).count()
    }

    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.tiles.chunks(self.width.max(1)) {
            out.extend(row.iter().map(|tile| tile.glyph()));
            out.push('\n');
        }
        out
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.tiles.len() + 32 + self.rooms.len() * 17);
        bytes.extend((self.width as u32).to_le_bytes());
        bytes.extend((self.height as u32).to_le_bytes());
        bytes.extend(self.seed.to_le_bytes());
        bytes.extend(self.tiles.iter().map(|tile| tile.code()));
        bytes.extend((self.rooms.len() as u32).to_le_bytes());
        for room in &self.rooms {
            bytes.extend(room.rect.x.to_le_bytes());
            bytes.extend(room.rect.y.to_le_bytes());
            bytes.extend(room.rect.width.to_le_bytes());
            bytes.extend(room.rect.height.to_le_bytes());
            bytes.push(match room.kind {
                RoomKind::Normal => 0,
                RoomKind::Boss => 1,
                RoomKind::Junction => 2,
            });
        }
        bytes
    }

    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii())
    }
}
