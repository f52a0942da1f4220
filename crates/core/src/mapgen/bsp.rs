//! Binary space partition dungeon: rooms in leaves, corridors at every merge.

use tracing::debug;

use crate::config::BspSettings;
use crate::error::{GenerationError, GenerationResult, ValidationFailure};
use crate::terrain::{Room, Terrain};
use crate::types::{Pos, Rect, RoomKind, TileType};

use super::grid::{carve_l_corridor, horizontal_first, is_safe_stair_site, unify_regions};
use super::seed::{GenRng, STREAM_BSP};
use super::stairs::{StairPair, farthest_site, place_pair};
use super::water::{carve_moat, place_bridges};

/// Smallest map that still has an interior.
const MIN_SIDE: usize = 3;

/// Smallest map on which a single room fits.
pub(crate) fn min_size(settings: &BspSettings) -> (usize, usize) {
    let side = (settings.min_room_size.max(1) + 4) as usize;
    (side, side)
}

struct Partition {
    rect: Rect,
    children: Option<[usize; 2]>,
    room: Option<usize>,
}

struct BspContext<'a> {
    settings: &'a BspSettings,
    rng: GenRng,
    nodes: Vec<Partition>,
    rooms: Vec<Rect>,
    corridors: Vec<Vec<Pos>>,
}

impl BspContext<'_> {
    fn split(&mut self, rect: Rect, depth: u32) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Partition { rect, children: None, room: None });

        let min_leaf = self.settings.min_room_size + 2;
        let cut_across_x = rect.width >= rect.height;
        let length = if cut_across_x { rect.width } else { rect.height };
        if length < 2 * min_leaf {
            return index;
        }
        if depth >= self.settings.stop_min_depth && self.rng.chance(self.settings.stop_probability) {
            return index;
        }

        let cut = self.rng.range_i32(min_leaf, length - min_leaf);
        let (first, second) = if cut_across_x {
            (
                Rect::new(rect.x, rect.y, cut, rect.height),
                Rect::new(rect.x + cut, rect.y, rect.width - cut, rect.height),
            )
        } else {
            (
                Rect::new(rect.x, rect.y, rect.width, cut),
                Rect::new(rect.x, rect.y + cut, rect.width, rect.height - cut),
            )
        };
        let left = self.split(first, depth + 1);
        let right = self.split(second, depth + 1);
        self.nodes[index].children = Some([left, right]);
        index
    }

    /// One room per leaf, kept one tile inside the leaf so neighbouring rooms never touch.
    fn place_rooms(&mut self, terrain: &mut Terrain) {
        for index in 0..self.nodes.len() {
            if self.nodes[index].children.is_some() {
                continue;
            }
            let Some(room) = self.room_in(self.nodes[index].rect) else { continue };
            for pos in room.positions() {
                terrain.set(pos, TileType::Floor);
            }
            self.nodes[index].room = Some(self.rooms.len());
            self.rooms.push(room);
        }
    }

    fn room_in(&mut self, leaf: Rect) -> Option<Rect> {
        let settings = self.settings;
        let (avail_width, avail_height) = (leaf.width - 2, leaf.height - 2);
        if avail_width < settings.min_room_size || avail_height < settings.min_room_size {
            return None;
        }
        let width = self
            .rng
            .range_i32(settings.min_room_size, settings.max_room_size.min(avail_width));
        let height = self
            .rng
            .range_i32(settings.min_room_size, settings.max_room_size.min(avail_height));
        let x = self.jittered(leaf.x + 1, avail_width - width);
        let y = self.jittered(leaf.y + 1, avail_height - height);
        Some(Rect::new(x, y, width, height))
    }

    /// Centred within `slack`, nudged randomly, clamped back into the leaf.
    fn jittered(&mut self, origin: i32, slack: i32) -> i32 {
        let half = slack / 2;
        let nudge = self.rng.range_i32(-half, half);
        (origin + half + nudge).clamp(origin, origin + slack)
    }

    /// Joins the closest pair of rooms across every split, deepest splits first.
    fn connect(&mut self, terrain: &mut Terrain, node: usize) -> Vec<usize> {
        let Some([left, right]) = self.nodes[node].children else {
            return self.nodes[node].room.into_iter().collect();
        };
        let mut rooms = self.connect(terrain, left);
        let other = self.connect(terrain, right);

        if let Some((from, to)) = closest_pair(&self.rooms, &rooms, &other) {
            let start = self.rooms[from].center();
            let end = self.rooms[to].center();
            let path =
                carve_l_corridor(terrain, start, end, horizontal_first(start, end), TileType::Corridor);
            self.corridors.push(path);
        }
        rooms.extend(other);
        rooms
    }
}

fn closest_pair(rooms: &[Rect], left: &[usize], right: &[usize]) -> Option<(usize, usize)> {
    let mut best: Option<(u32, usize, usize)> = None;
    for &a in left {
        for &b in right {
            let distance = rooms[a].center().manhattan(rooms[b].center());
            if best.is_none_or(|(current, _, _)| distance < current) {
                best = Some((distance, a, b));
            }
        }
    }
    best.map(|(_, a, b)| (a, b))
}

/// Corridor tiles on a room's outer ring, flanked by wall along the ring.
fn place_doors(terrain: &mut Terrain, rooms: &[Rect]) -> usize {
    let mut doors = 0;
    for &room in rooms {
        let ring = room.expanded(1);
        for pos in ring.positions().filter(|&pos| room.ring_distance(pos) == 1) {
            let on_row = pos.y == ring.y || pos.y == ring.bottom();
            let on_column = pos.x == ring.x || pos.x == ring.right();
            if (on_row && on_column) || terrain.get(pos) != TileType::Corridor {
                continue;
            }
            let (a, b) = if on_row {
                (pos.offset(-1, 0), pos.offset(1, 0))
            } else {
                (pos.offset(0, -1), pos.offset(0, 1))
            };
            if terrain.get(a) == TileType::Wall && terrain.get(b) == TileType::Wall {
                terrain.set(pos, TileType::Door);
                doors += 1;
            }
        }
    }
    doors
}

fn farthest_room(rooms: &[Rect]) -> usize {
    let origin = rooms[0].center();
    let mut best = 0;
    for (index, room) in rooms.iter().enumerate().skip(1) {
        if room.center().manhattan(origin) > rooms[best].center().manhattan(origin) {
            best = index;
        }
    }
    best
}

fn moat_fits(terrain: &Terrain, room: Rect, width: i32) -> bool {
    let band = room.expanded(width);
    band.x >= 1
        && band.y >= 1
        && band.right() <= terrain.width() as i32 - 2
        && band.bottom() <= terrain.height() as i32 - 2
}

pub(crate) fn generate(
    seed: i64,
    width: usize,
    height: usize,
    difficulty: f64,
    settings: &BspSettings,
) -> GenerationResult<Terrain> {
    if width < MIN_SIDE || height < MIN_SIDE {
        return Err(GenerationError::dimensions(
            width as i64,
            height as i64,
            "bsp dungeon needs at least a 3x3 map",
        ));
    }

    let mut terrain = Terrain::new(width, height, seed);
    let mut context = BspContext {
        settings,
        rng: GenRng::for_stream(seed, STREAM_BSP),
        nodes: Vec::new(),
        rooms: Vec::new(),
        corridors: Vec::new(),
    };

    let interior = Rect::new(1, 1, width as i32 - 2, height as i32 - 2);
    let root = context.split(interior, 0);
    context.place_rooms(&mut terrain);
    if context.rooms.is_empty() {
        return Err(ValidationFailure::ZeroRooms.into());
    }
    context.connect(&mut terrain, root);
    let doors = place_doors(&mut terrain, &context.rooms);

    let rooms = context.rooms;
    let mut kinds = vec![RoomKind::Normal; rooms.len()];
    let down_room = farthest_room(&rooms);
    if down_room != 0 && difficulty >= settings.boss_difficulty {
        kinds[down_room] = RoomKind::Boss;
        if difficulty >= settings.moat_difficulty
            && moat_fits(&terrain, rooms[down_room], settings.moat_width)
        {
            let boss = Room { rect: rooms[down_room], kind: RoomKind::Boss };
            let mut moat = carve_moat(&mut terrain, &boss, settings.moat_width);
            let bridged: usize = context
                .corridors
                .iter()
                .map(|path| place_bridges(&mut terrain, &mut moat, path))
                .sum();
            let report = unify_regions(&mut terrain, 1, TileType::Wall, TileType::Corridor);
            debug!(seed, water = moat.tiles.len(), bridged, tunnels = report.tunnels, "moat dug");
        }
    }

    let up = rooms[0].center();
    let down = if down_room == 0 {
        terrain.set(up, TileType::StairsUp);
        let sites: Vec<Pos> =
            rooms[0].positions().filter(|&pos| is_safe_stair_site(&terrain, pos)).collect();
        farthest_site(&terrain, up, &sites).ok_or(ValidationFailure::MissingStairs("stairs down"))?
    } else {
        rooms[down_room].center()
    };
    place_pair(&mut terrain, StairPair { up, down })?;

    for (rect, kind) in rooms.iter().zip(kinds) {
        terrain.add_room(Room { rect: *rect, kind });
    }
    debug!(
        seed,
        rooms = rooms.len(),
        corridors = context.corridors.len(),
        doors,
        "bsp dungeon generated"
    );
    Ok(terrain)
}
