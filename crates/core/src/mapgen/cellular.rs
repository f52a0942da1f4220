//! Cellular automata caves with an optional underground pool.

use tracing::debug;

use crate::config::CaveSettings;
use crate::error::{GenerationError, GenerationResult, ValidationFailure};
use crate::terrain::Terrain;
use crate::types::TileType;

use super::grid::{random_walkable, smooth_step, unify_regions};
use super::seed::{GenRng, STREAM_CAVE};
use super::stairs::place_far_apart;
use super::water::{flood_fill, flood_fill_water};

pub(crate) const MIN_WIDTH: usize = 16;
pub(crate) const MIN_HEIGHT: usize = 12;
const MIN_POOL_TILES: usize = 4;

pub(crate) fn generate(
    seed: i64,
    width: usize,
    height: usize,
    settings: &CaveSettings,
) -> GenerationResult<Terrain> {
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return Err(GenerationError::dimensions(
            width as i64,
            height as i64,
            format!("caves need at least {MIN_WIDTH}x{MIN_HEIGHT}"),
        ));
    }

    let mut rng = GenRng::for_stream(seed, STREAM_CAVE);
    let mut terrain = Terrain::new(width, height, seed);
    for pos in terrain.positions() {
        if terrain.is_interior(pos) && !rng.chance(settings.fill_probability) {
            terrain.set(pos, TileType::Floor);
        }
    }
    for _ in 0..settings.iterations {
        terrain = smooth_step(
            &terrain,
            TileType::Wall,
            TileType::Floor,
            settings.birth_limit,
            settings.death_limit,
        );
    }
    let mut report =
        unify_regions(&mut terrain, settings.min_region_size, TileType::Wall, TileType::Floor);

    let mut pool_tiles = 0;
    if rng.chance(settings.pool_chance) {
        let budget =
            (terrain.count(TileType::Floor) as f64 * settings.pool_fraction).round() as usize;
        if let Some(start) = random_walkable(&terrain, &mut rng)
            && budget >= MIN_POOL_TILES
        {
            let tiles = flood_fill(&terrain, start, budget);
            pool_tiles = flood_fill_water(&mut terrain, &tiles, settings.pool_deep_ratio).tiles.len();
            let again =
                unify_regions(&mut terrain, settings.min_region_size, TileType::Wall, TileType::Floor);
            report.reverted_tiles += again.reverted_tiles;
            report.tunnels += again.tunnels;
        }
    }

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
        reverted = report.reverted_tiles,
        tunnels = report.tunnels,
        pool_tiles,
        "cave generated"
    );
    Ok(terrain)
}
