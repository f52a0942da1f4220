//! Water features carved into an existing terrain: lakes, rivers, moats, flood-filled
//! pools, and the bridges that keep paths across them walkable.
//!
//! Nothing here tracks global connectivity. A caller that carves water across a path
//! which must stay connected calls [`place_bridges`] with that path right afterwards.
//! Only `sqrt` and basic arithmetic are used so results do not depend on the
//! platform's trigonometry.

use crate::terrain::{Room, Terrain};
use crate::types::{Pos, TileType};

use super::seed::GenRng;

const STREAM_WATER: u64 = 0x3A7E_2000;
const LAKE_SECTORS: usize = 16;
const LAKE_DEEP_RADIUS: f64 = 0.6;
const RIVER_MEANDER: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WaterKind {
    Lake,
    River,
    Moat,
}

/// Descriptor of carved water. The terrain itself is mutated in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaterFeature {
    pub kind: WaterKind,
    pub tiles: Vec<Pos>,
    pub bridges: Vec<Pos>,
}

impl WaterFeature {
    fn new(kind: WaterKind) -> Self {
        Self { kind, tiles: Vec::new(), bridges: Vec::new() }
    }

    fn finish(mut self) -> Self {
        self.tiles.sort();
        self.tiles.dedup();
        self
    }
}

/// Writes water without touching stairs or the outer ring; deep water is never made shallow.
fn paint(terrain: &mut Terrain, feature: &mut WaterFeature, pos: Pos, tile: TileType) {
    if !terrain.is_interior(pos) {
        return;
    }
    let current = terrain.get(pos);
    if current.is_stairs() || (current == TileType::WaterDeep && tile == TileType::WaterShallow) {
        return;
    }
    terrain.set(pos, tile);
    feature.tiles.push(pos);
}

/// Monotonic stand-in for the polar angle, in `[0, 4)`.
fn diamond_angle(dx: f64, dy: f64) -> f64 {
    if dy >= 0.0 {
        if dx >= 0.0 { dy / (dx + dy) } else { 1.0 - dx / (-dx + dy) }
    } else if dx < 0.0 {
        2.0 - dy / (-dx - dy)
    } else {
        3.0 + dx / (dx - dy)
    }
}

/// Organic lake: each angular sector's radius is jittered by 10 to 30 percent.
pub fn carve_lake(terrain: &mut Terrain, center: Pos, radius: i32, seed: i64) -> WaterFeature {
    let mut rng = GenRng::for_stream(seed, STREAM_WATER);
    let mut feature = WaterFeature::new(WaterKind::Lake);
    let radius = f64::from(radius.max(1));

    let mut sector_radii = [radius; LAKE_SECTORS];
    for sector_radius in &mut sector_radii {
        let magnitude = 0.10 + rng.unit() * 0.20;
        let sign = if rng.chance(0.5) { 1.0 } else { -1.0 };
        *sector_radius = radius * (1.0 + sign * magnitude);
    }

    let reach = (radius * 1.3).ceil() as i32 + 1;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let pos = center.offset(dx, dy);
            let (fx, fy) = (f64::from(dx), f64::from(dy));
            let distance = (fx * fx + fy * fy).sqrt();
            let normalized = if dx == 0 && dy == 0 {
                0.0
            } else {
                let sector = diamond_angle(fx, fy) / 4.0 * LAKE_SECTORS as f64;
                let low = (sector.floor() as usize) % LAKE_SECTORS;
                let high = (low + 1) % LAKE_SECTORS;
                let blend = sector - sector.floor();
                let edge = sector_radii[low] * (1.0 - blend) + sector_radii[high] * blend;
                distance / edge
            };
            if normalized <= LAKE_DEEP_RADIUS {
                paint(terrain, &mut feature, pos, TileType::WaterDeep);
            } else if normalized <= 1.0 {
                paint(terrain, &mut feature, pos, TileType::WaterShallow);
            }
        }
    }
    feature.finish()
}

/// Meandering river from `start` to `end`. Width is clamped to 1..=5; rivers at
/// least three wide get a deep channel with shallow banks.
pub fn carve_river(
    terrain: &mut Terrain,
    start: Pos,
    end: Pos,
    width: i32,
    seed: i64,
) -> WaterFeature {
    let mut rng = GenRng::for_stream(seed, STREAM_WATER ^ 0x52);
    let mut feature = WaterFeature::new(WaterKind::River);
    let width = width.clamp(1, 5);
    let half_width = f64::from(width) / 2.0 + 0.25;
    let deep_width = if width >= 3 { half_width - 1.0 } else { -1.0 };

    let (dx, dy) = (f64::from(end.x - start.x), f64::from(end.y - start.y));
    let length = (dx * dx + dy * dy).sqrt();
    let steps = start.x.abs_diff(end.x).max(start.y.abs_diff(end.y)).max(1);
    let step_length = length / f64::from(steps);
    let (perp_x, perp_y) = if length > 0.0 { (-dy / length, dx / length) } else { (0.0, 0.0) };
    let max_offset = (length * 0.25).max(1.0);

    let mut offset = 0.0_f64;
    for step in 0..=steps {
        let t = f64::from(step) / f64::from(steps);
        if step > 0 && step < steps {
            offset += (rng.unit() * 2.0 - 1.0) * RIVER_MEANDER * step_length;
            offset = offset.clamp(-max_offset, max_offset);
        }
        let taper = if step == 0 || step == steps { 0.0 } else { offset };
        let cx = f64::from(start.x) + dx * t + perp_x * taper;
        let cy = f64::from(start.y) + dy * t + perp_y * taper;

        let reach = half_width.ceil() as i32;
        let (base_x, base_y) = (cx.round() as i32, cy.round() as i32);
        for oy in -reach..=reach {
            for ox in -reach..=reach {
                let pos = Pos { y: base_y + oy, x: base_x + ox };
                let (ddx, ddy) = (f64::from(pos.x) - cx, f64::from(pos.y) - cy);
                let distance = (ddx * ddx + ddy * ddy).sqrt();
                if distance <= deep_width {
                    paint(terrain, &mut feature, pos, TileType::WaterDeep);
                } else if distance <= half_width {
                    paint(terrain, &mut feature, pos, TileType::WaterShallow);
                }
            }
        }
    }
    feature.finish()
}

/// Band of water `width` tiles wide around `room`. Tiles within `width / 2` of the
/// room edge are deep. The room interior is never touched.
pub fn carve_moat(terrain: &mut Terrain, room: &Room, width: i32) -> WaterFeature {
    let mut feature = WaterFeature::new(WaterKind::Moat);
    let width = width.max(1);
    for pos in room.rect.expanded(width).positions() {
        let distance = room.rect.ring_distance(pos);
        if distance == 0 {
            continue;
        }
        let tile = if distance <= width / 2 { TileType::WaterDeep } else { TileType::WaterShallow };
        paint(terrain, &mut feature, pos, tile);
    }
    feature.finish()
}

/// Breadth-first set of walkable tiles reachable from `start`, at most `max_tiles`.
pub fn flood_fill(terrain: &Terrain, start: Pos, max_tiles: usize) -> Vec<Pos> {
    super::grid::flood_fill(terrain, start, max_tiles)
}

/// Turns `tiles` into a pool. The first `deep_ratio` share, in the given order, is deep.
pub fn flood_fill_water(terrain: &mut Terrain, tiles: &[Pos], deep_ratio: f64) -> WaterFeature {
    let mut feature = WaterFeature::new(WaterKind::Lake);
    let deep_count = (tiles.len() as f64 * deep_ratio.clamp(0.0, 1.0)).round() as usize;
    for (index, &pos) in tiles.iter().enumerate() {
        let tile = if index < deep_count { TileType::WaterDeep } else { TileType::WaterShallow };
        paint(terrain, &mut feature, pos, tile);
    }
    feature.finish()
}

fn wet(terrain: &Terrain, pos: Pos) -> bool {
    let tile = terrain.get(pos);
    tile.is_water() || tile == TileType::Bridge
}

/// Retags water on `path` as Bridge where both transverse sides are water, and any
/// path tile still deep afterwards as well, so every path tile stays walkable.
/// Returns the number of bridge tiles added.
pub fn place_bridges(terrain: &mut Terrain, feature: &mut WaterFeature, path: &[Pos]) -> usize {
    let mut added = 0;
    for (index, &pos) in path.iter().enumerate() {
        let tile = terrain.get(pos);
        if !tile.is_water() {
            continue;
        }

        let previous = index.checked_sub(1).and_then(|before| path.get(before)).copied();
        let next = path.get(index + 1).copied();
        let mut horizontal = false;
        let mut vertical = false;
        for neighbour in [previous, next].into_iter().flatten() {
            horizontal |= neighbour.x != pos.x;
            vertical |= neighbour.y != pos.y;
        }
        if !horizontal && !vertical {
            horizontal = true;
            vertical = true;
        }

        let spans_horizontal =
            horizontal && wet(terrain, pos.offset(0, -1)) && wet(terrain, pos.offset(0, 1));
        let spans_vertical =
            vertical && wet(terrain, pos.offset(-1, 0)) && wet(terrain, pos.offset(1, 0));
        if spans_horizontal || spans_vertical || tile == TileType::WaterDeep {
            terrain.set(pos, TileType::Bridge);
            feature.bridges.push(pos);
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoomKind;

    fn open_field(width: usize, height: usize) -> Terrain {
        let mut terrain = Terrain::filled(width, height, 0, TileType::Floor);
        for pos in terrain.positions().collect::<Vec<_>>() {
            if !terrain.is_interior(pos) {
                terrain.set(pos, TileType::Wall);
            }
        }
        terrain
    }

    #[test]
    fn diamond_angle_is_monotonic_around_the_circle() {
        let samples = [(1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (-1.0, 1.0), (-1.0, 0.0), (-1.0, -1.0)];
        let angles: Vec<f64> = samples.iter().map(|&(dx, dy)| diamond_angle(dx, dy)).collect();
        assert!(angles.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(diamond_angle(1.0, -0.01) < 4.0);
    }

    #[test]
    fn lake_has_deep_core_and_shallow_rim() {
        let mut terrain = open_field(40, 40);
        let center = Pos::new(20, 20);
        let lake = carve_lake(&mut terrain, center, 8, 77);
        assert_eq!(lake.kind, WaterKind::Lake);
        assert_eq!(terrain.get(center), TileType::WaterDeep);
        assert!(terrain.count(TileType::WaterShallow) > 0);
        for &pos in &lake.tiles {
            assert!(pos.manhattan(center) <= 2 * 11 + 2, "lake tile {pos:?} strayed too far");
            assert!(terrain.get(pos).is_water());
        }
        assert!(lake.tiles.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn lake_is_deterministic_per_seed() {
        let mut left = open_field(30, 30);
        let mut right = open_field(30, 30);
        carve_lake(&mut left, Pos::new(15, 15), 6, 5);
        carve_lake(&mut right, Pos::new(15, 15), 6, 5);
        assert_eq!(left, right);
    }

    #[test]
    fn wide_river_has_deep_channel_and_spans_the_map() {
        let mut terrain = open_field(60, 20);
        let river = carve_river(&mut terrain, Pos::new(1, 10), Pos::new(58, 10), 3, 9);
        assert_eq!(river.kind, WaterKind::River);
        assert!(terrain.count(TileType::WaterDeep) > 0);
        for x in 1..59 {
            assert!(
                (1..19).any(|y| terrain.get_tile(x, y).is_water()),
                "river should cross column {x}"
            );
        }
    }

    #[test]
    fn narrow_river_is_shallow_only() {
        let mut terrain = open_field(30, 30);
        carve_river(&mut terrain, Pos::new(15, 1), Pos::new(15, 28), 2, 4);
        assert_eq!(terrain.count(TileType::WaterDeep), 0);
        assert!(terrain.count(TileType::WaterShallow) > 0);
    }

    #[test]
    fn moat_surrounds_room_without_touching_interior() {
        let mut terrain = open_field(30, 30);
        let room = Room::new(10, 10, 6, 5, RoomKind::Boss);
        let moat = carve_moat(&mut terrain, &room, 2);
        assert_eq!(moat.kind, WaterKind::Moat);
        for pos in room.rect.positions() {
            assert_eq!(terrain.get(pos), TileType::Floor);
        }
        assert_eq!(terrain.get_tile(9, 12), TileType::WaterDeep);
        assert_eq!(terrain.get_tile(8, 12), TileType::WaterShallow);
        assert_eq!(terrain.get_tile(7, 12), TileType::Floor);
        assert_eq!(moat.tiles.len(), (10 * 9 - 6 * 5) as usize);
    }

    #[test]
    fn flood_fill_water_makes_the_core_deep() {
        let mut terrain = open_field(12, 12);
        let tiles = flood_fill(&terrain, Pos::new(5, 5), 20);
        assert_eq!(tiles.len(), 20);
        let pool = flood_fill_water(&mut terrain, &tiles, 0.25);
        assert_eq!(pool.tiles.len(), 20);
        assert_eq!(terrain.count(TileType::WaterDeep), 5);
        assert_eq!(terrain.count(TileType::WaterShallow), 15);
        assert_eq!(terrain.get_tile(5, 5), TileType::WaterDeep);
    }

    #[test]
    fn stairs_survive_water() {
        let mut terrain = open_field(20, 20);
        terrain.set_tile(10, 10, TileType::StairsDown);
        carve_lake(&mut terrain, Pos::new(10, 10), 5, 1);
        assert_eq!(terrain.get_tile(10, 10), TileType::StairsDown);
    }

    #[test]
    fn bridges_keep_a_crossing_path_walkable() {
        let mut terrain = open_field(40, 30);
        let path: Vec<Pos> = (1..29).map(|y| Pos::new(20, y)).collect();
        let mut river = carve_river(&mut terrain, Pos::new(1, 15), Pos::new(38, 15), 5, 21);
        let added = place_bridges(&mut terrain, &mut river, &path);
        assert!(added > 0);
        assert_eq!(river.bridges.len(), added);
        for &pos in &path {
            assert!(terrain.is_walkable(pos), "path tile {pos:?} became {:?}", terrain.get(pos));
        }
        assert!(river.bridges.iter().all(|&pos| terrain.get(pos) == TileType::Bridge));
    }
}
