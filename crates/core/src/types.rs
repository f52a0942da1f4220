use serde::{Deserialize, Serialize};

/// Integer grid coordinate. Ordering is row-major (`y` first) so sorted
/// collections of positions iterate in scan order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub y: i32,
    pub x: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { y, x }
    }

    pub fn manhattan(self, other: Pos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Pos {
        Pos { y: self.y + dy, x: self.x + dx }
    }

    /// North, east, south, west.
    pub fn neighbors4(self) -> [Pos; 4] {
        [
            Pos { y: self.y - 1, x: self.x },
            Pos { y: self.y, x: self.x + 1 },
            Pos { y: self.y + 1, x: self.x },
            Pos { y: self.y, x: self.x - 1 },
        ]
    }

    /// Moore neighbourhood, row by row from the top-left corner.
    pub fn neighbors8(self) -> [Pos; 8] {
        [
            Pos { y: self.y - 1, x: self.x - 1 },
            Pos { y: self.y - 1, x: self.x },
            Pos { y: self.y - 1, x: self.x + 1 },
            Pos { y: self.y, x: self.x - 1 },
            Pos { y: self.y, x: self.x + 1 },
            Pos { y: self.y + 1, x: self.x - 1 },
            Pos { y: self.y + 1, x: self.x },
            Pos { y: self.y + 1, x: self.x + 1 },
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TileType {
    Wall,
    Floor,
    Door,
    Corridor,
    WaterShallow,
    WaterDeep,
    Bridge,
    StairsUp,
    StairsDown,
    Tree,
    Structure,
}

impl TileType {
    pub const ALL: [TileType; 11] = [
        TileType::Wall,
        TileType::Floor,
        TileType::Door,
        TileType::Corridor,
        TileType::WaterShallow,
        TileType::WaterDeep,
        TileType::Bridge,
        TileType::StairsUp,
        TileType::StairsDown,
        TileType::Tree,
        TileType::Structure,
    ];

    pub fn is_walkable(self) -> bool {
        matches!(
            self,
            TileType::Floor
                | TileType::Door
                | TileType::Corridor
                | TileType::WaterShallow
                | TileType::Bridge
        )
    }

    pub fn is_water(self) -> bool {
        matches!(self, TileType::WaterShallow | TileType::WaterDeep)
    }

    pub fn is_stairs(self) -> bool {
        matches!(self, TileType::StairsUp | TileType::StairsDown)
    }

    pub fn glyph(self) -> char {
        match self {
            TileType::Wall => '#',
            TileType::Floor => '.',
            TileType::Door => '+',
            TileType::Corridor => ':',
            TileType::WaterShallow => 'W',
            TileType::WaterDeep => '~',
            TileType::Bridge => '=',
            TileType::StairsUp => '^',
            TileType::StairsDown => 'v',
            TileType::Tree => 'T',
            TileType::Structure => '@',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        TileType::ALL.into_iter().find(|tile| tile.glyph() == glyph)
    }

    /// Stable byte code used by the canonical terrain encoding.
    pub fn code(self) -> u8 {
        match self {
            TileType::Wall => 0,
            TileType::Floor => 1,
            TileType::Door => 2,
            TileType::Corridor => 3,
            TileType::WaterShallow => 4,
            TileType::WaterDeep => 5,
            TileType::Bridge => 6,
            TileType::StairsUp => 7,
            TileType::StairsDown => 8,
            TileType::Tree => 9,
            TileType::Structure => 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Normal,
    Boss,
    Junction,
}

/// Integer rectangle, inclusive of `x`/`y` and exclusive of `x + width`/`y + height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(self) -> i32 {
        self.x + self.width - 1
    }

    pub fn bottom(self) -> i32 {
        self.y + self.height - 1
    }

    pub fn center(self) -> Pos {
        Pos { y: self.y + self.height / 2, x: self.x + self.width / 2 }
    }

    pub fn area(self) -> i64 {
        i64::from(self.width.max(0)) * i64::from(self.height.max(0))
    }

    pub fn contains(self, pos: Pos) -> bool {
        pos.x >= self.x && pos.x <= self.right() && pos.y >= self.y && pos.y <= self.bottom()
    }

    pub fn intersects(self, other: Rect) -> bool {
        self.x <= other.right()
            && self.right() >= other.x
            && self.y <= other.bottom()
            && self.bottom() >= other.y
    }

    pub fn expanded(self, margin: i32) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2 * margin,
            height: self.height + 2 * margin,
        }
    }

    /// Chebyshev distance from `pos` to the closest tile of the rectangle; 0 inside.
    pub fn ring_distance(self, pos: Pos) -> i32 {
        let dx = (self.x - pos.x).max(pos.x - self.right()).max(0);
        let dy = (self.y - pos.y).max(pos.y - self.bottom()).max(0);
        dx.max(dy)
    }

    pub fn positions(self) -> impl Iterator<Item = Pos> {
        let Rect { x, y, width, height } = self;
        (y..y + height).flat_map(move |row| (x..x + width).map(move |col| Pos { y: row, x: col }))
    }
}
