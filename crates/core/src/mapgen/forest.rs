//! Open woodland: smoothed groves, small ruins, and optional lake and river.

use tracing::debug;

use crate::config::ForestSettings;
use crate::error::{GenerationError, GenerationResult, ValidationFailure};
use crate::terrain::Terrain;
use crate::types::{Pos, Rect, TileType};

use super::grid::{carve_passage, smooth_step, unify_regions};
use super::seed::{GenRng, STREAM_FOREST};
use super::stairs::place_far_apart;
use super::water::{carve_lake, carve_river, place_bridges};

pub(crate) const MIN_WIDTH: usize = 16;
pub(crate) const MIN_HEIGHT: usize = 12;
const RUIN_SIDE: i32 = 2;

#[derive(Default)]
struct ForestReport {
    ruins: u32,
    lake_tiles: usize,
    river_tiles: usize,
    bridges: usize,
}

pub(crate) fn generate(
    seed: i64,
    width: usize,
    height: usize,
    settings: &ForestSettings,
) -> GenerationResult<Terrain> {
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return Err(GenerationError::dimensions(
            width as i64,
            height as i64,
            format!("forests need at least {MIN_WIDTH}x{MIN_HEIGHT}"),
        ));
    }

    let mut rng = GenRng::for_stream(seed, STREAM_FOREST);
    let mut terrain = Terrain::filled(width, height, seed, TileType::Floor);
    for pos in terrain.positions() {
        if !terrain.is_interior(pos) || rng.chance(settings.tree_density) {
            terrain.set(pos, TileType::Tree);
        }
    }
    for _ in 0..settings.iterations {
        terrain = smooth_step(
            &terrain,
            TileType::Tree,
            TileType::Floor,
            settings.birth_limit,
            settings.death_limit,
        );
    }

    let mut report = ForestReport::default();
    if settings.max_ruins > 0 {
        report.ruins = rng.range_usize(1, settings.max_ruins as usize) as u32;
        for _ in 0..report.ruins {
            place_ruin(&mut terrain, &mut rng);
        }
    }

    let (w, h) = (width as i32, height as i32);
    if rng.chance(settings.lake_chance) {
        let radius = rng.range_i32(2, (w.min(h) / 6).max(2));
        let center = Pos::new(
            rng.range_i32(1 + radius, w - 2 - radius),
            rng.range_i32(1 + radius, h - 2 - radius),
        );
        report.lake_tiles = carve_lake(&mut terrain, center, radius, rng.next_u64() as i64).tiles.len();
    }

    if rng.chance(settings.river_chance) {
        let river_width = rng.range_i32(1, 3);
        let horizontal = rng.chance(0.5);
        let (start, end, trail) = if horizontal {
            let crossing = rng.range_i32(w / 4, 3 * w / 4);
            (
                Pos::new(1, rng.range_i32(h / 4, 3 * h / 4)),
                Pos::new(w - 2, rng.range_i32(h / 4, 3 * h / 4)),
                (1..h - 1).map(|y| Pos::new(crossing, y)).collect::<Vec<_>>(),
            )
        } else {
            let crossing = rng.range_i32(h / 4, 3 * h / 4);
            (
                Pos::new(rng.range_i32(w / 4, 3 * w / 4), 1),
                Pos::new(rng.range_i32(w / 4, 3 * w / 4), h - 2),
                (1..w - 1).map(|x| Pos::new(x, crossing)).collect::<Vec<_>>(),
            )
        };
        for &pos in &trail {
            carve_passage(&mut terrain, pos, TileType::Floor);
        }
        let mut river =
            carve_river(&mut terrain, start, end, river_width, rng.next_u64() as i64);
        report.bridges = place_bridges(&mut terrain, &mut river, &trail);
        report.river_tiles = river.tiles.len();
    }

    let regions =
        unify_regions(&mut terrain, settings.min_region_size, TileType::Tree, TileType::Floor);

    let ratio = terrain.walkable_ratio();
    if ratio < settings.min_walkable_ratio {
        return Err(ValidationFailure::WalkableRatio {
            ratio,
            minimum: settings.min_walkable_ratio,
        }
        .into());
    }
    place_far_apart(&mut terrain, &mut rng)?;

    debug!(
        seed,
        ratio,
        ruins = report.ruins,
        lake_tiles = report.lake_tiles,
        river_tiles = report.river_tiles,
        bridges = report.bridges,
        tunnels = regions.tunnels,
        "forest generated"
    );
    Ok(terrain)
}

/// A 2x2 block of Structure in a one-tile clearing.
fn place_ruin(terrain: &mut Terrain, rng: &mut GenRng) {
    let (w, h) = (terrain.width() as i32, terrain.height() as i32);
    let x = rng.range_i32(2, w - 2 - RUIN_SIDE);
    let y = rng.range_i32(2, h - 2 - RUIN_SIDE);
    let ruin = Rect::new(x, y, RUIN_SIDE, RUIN_SIDE);
    for pos in ruin.expanded(1).positions() {
        if !terrain.is_interior(pos) {
            continue;
        }
        let tile = if ruin.contains(pos) { TileType::Structure } else { TileType::Floor };
        if terrain.get(pos) != TileType::Structure || tile == TileType::Structure {
            terrain.set(pos, tile);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapgen::grid::reachable_from_first;

    fn dry(settings: ForestSettings) -> ForestSettings {
        ForestSettings { lake_chance: 0.0, river_chance: 0.0, ..settings }
    }

    #[test]
    fn forests_are_connected_with_tree_borders() {
        for seed in [1, 5, 12_345, -3] {
            let terrain = generate(seed, 80, 50, &ForestSettings::default()).expect("forest");
            let (reached, total) = reachable_from_first(&terrain);
            assert_eq!(reached, total, "seed {seed}");
            assert!(terrain.walkable_ratio() >= 0.30);
            for pos in terrain.positions().filter(|&pos| !terrain.is_interior(pos)) {
                assert_eq!(terrain.get(pos), TileType::Tree, "seed {seed}: border at {pos:?}");
            }
        }
    }

    #[test]
    fn ruins_survive_in_dry_forests() {
        let settings = dry(ForestSettings::default());
        for seed in [2, 9, 30] {
            let terrain = generate(seed, 60, 40, &settings).expect("forest");
            assert!(terrain.count(TileType::Structure) >= 4, "seed {seed}");
            assert_eq!(terrain.count(TileType::WaterShallow), 0);
        }
    }

    #[test]
    fn forced_river_keeps_the_forest_connected() {
        let settings = ForestSettings { river_chance: 1.0, lake_chance: 1.0, ..ForestSettings::default() };
        for seed in [4, 44, 444] {
            let terrain = generate(seed, 80, 50, &settings).expect("forest");
            assert!(terrain.count(TileType::WaterShallow) > 0, "seed {seed}");
            let (reached, total) = reachable_from_first(&terrain);
            assert_eq!(reached, total, "seed {seed}");
        }
    }

    #[test]
    fn no_ruins_when_disabled() {
        let settings = dry(ForestSettings { max_ruins: 0, ..ForestSettings::default() });
        let terrain = generate(6, 40, 30, &settings).expect("forest");
        assert_eq!(terrain.count(TileType::Structure), 0);
    }
}
