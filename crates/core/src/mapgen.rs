//! Procedural terrain generation split into coherent submodules.

pub mod blend;
pub mod composite;
pub mod voronoi;
pub mod water;

mod bsp;
mod cellular;
mod forest;
mod grid;
mod maze;
mod seed;
mod stairs;
mod validate;

use tracing::{debug, info};

use crate::config::{ConfigError, GeneratorConfig, MazeSettings};
use crate::error::{GenerationError, GenerationResult};
use crate::params::{
    Algorithm, GenerationParams, GeneratorKind, KEY_CORRIDOR_WIDTH, KEY_ROOM_CHANCE,
};
use crate::terrain::Terrain;

pub use composite::CompositeGenerator;
pub use grid::{connectivity_ratio, flood_fill, reachable_from_first};
pub use maze::lattice_dimension;
pub use stairs::{StairPair, check_stairs};
pub use validate::validate;
pub use voronoi::BiomeAssignment;

/// Largest accepted width or height.
pub const MAX_DIMENSION: i64 = 4096;

/// Maze settings with the `roomChance` and `corridorWidth` keys applied.
fn maze_settings(params: &GenerationParams, base: &MazeSettings) -> GenerationResult<MazeSettings> {
    let room_chance = params.probability_or(KEY_ROOM_CHANCE, base.room_chance)?;
    let corridor_width = params.int_or(KEY_CORRIDOR_WIDTH, i64::from(base.corridor_width))?;
    if !(1..=3).contains(&corridor_width) {
        return Err(GenerationError::parameter(
            KEY_CORRIDOR_WIDTH,
            format!("{corridor_width} is outside 1..=3"),
        ));
    }
    Ok(MazeSettings { room_chance, corridor_width: corridor_width as i32, ..base.clone() })
}

/// Smallest `(width, height)` a kind accepts.
pub(crate) fn kind_min_size(
    kind: GeneratorKind,
    params: &GenerationParams,
    config: &GeneratorConfig,
) -> GenerationResult<(usize, usize)> {
    Ok(match kind {
        GeneratorKind::Bsp => bsp::min_size(&config.bsp),
        GeneratorKind::Cellular => (cellular::MIN_WIDTH, cellular::MIN_HEIGHT),
        GeneratorKind::Maze => maze::min_size(&maze_settings(params, &config.maze)?),
        GeneratorKind::Forest => (forest::MIN_WIDTH, forest::MIN_HEIGHT),
    })
}

pub(crate) fn generate_kind(
    kind: GeneratorKind,
    seed: i64,
    width: usize,
    height: usize,
    params: &GenerationParams,
    config: &GeneratorConfig,
) -> GenerationResult<Terrain> {
    match kind {
        GeneratorKind::Bsp => bsp::generate(seed, width, height, params.difficulty, &config.bsp),
        GeneratorKind::Cellular => cellular::generate(seed, width, height, &config.cave),
        GeneratorKind::Maze => {
            maze::generate(seed, width, height, &maze_settings(params, &config.maze)?)
        }
        GeneratorKind::Forest => forest::generate(seed, width, height, &config.forest),
    }
}

/// Entry point holding the injected configuration.
#[derive(Clone, Debug, Default)]
pub struct TerrainGenerator {
    config: GeneratorConfig,
}

impl TerrainGenerator {
    /// Rejects configurations that fail [`GeneratorConfig::validate`].
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates and validates one level. Identical inputs give identical terrain.
    pub fn generate(&self, seed: i64, params: &GenerationParams) -> GenerationResult<Terrain> {
        let algorithm = self.check(params)?;
        let terrain = match algorithm {
            Algorithm::Single(kind) => {
                let (width, height) =
                    params.dimensions(self.config.default_width, self.config.default_height)?;
                debug!(seed, %algorithm, width, height, depth = params.depth, "generating");
                generate_kind(kind, seed, width as usize, height as usize, params, &self.config)?
            }
            Algorithm::Composite => CompositeGenerator::new(&self.config).generate(seed, params)?,
        };
        validate(&terrain, algorithm, &self.config)?;
        info!(
            seed,
            %algorithm,
            width = terrain.width(),
            height = terrain.height(),
            walkable = terrain.walkable_count(),
            "terrain generated"
        );
        Ok(terrain)
    }

    /// Composite generation that also hands back the biome assignment.
    pub fn generate_composite(
        &self,
        seed: i64,
        params: &GenerationParams,
    ) -> GenerationResult<(Terrain, BiomeAssignment)> {
        self.check(params)?;
        let (terrain, assignment) =
            CompositeGenerator::new(&self.config).generate_with_assignment(seed, params)?;
        validate(&terrain, Algorithm::Composite, &self.config)?;
        Ok((terrain, assignment))
    }

    fn check(&self, params: &GenerationParams) -> GenerationResult<Algorithm> {
        params.validate()?;
        let algorithm = params.algorithm()?;
        let (width, height) =
            params.dimensions(self.config.default_width, self.config.default_height)?;
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(GenerationError::dimensions(
                width,
                height,
                format!("dimensions above {MAX_DIMENSION} are not supported"),
            ));
        }
        Ok(algorithm)
    }
}

/// Generates with the default configuration.
pub fn generate(seed: i64, params: &GenerationParams) -> GenerationResult<Terrain> {
    TerrainGenerator::default().generate(seed, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::KEY_BIOME_COUNT;

    #[test]
    fn free_function_matches_default_generator() {
        let params = GenerationParams::default().with_size(48, 32).with_algorithm("cave");
        let from_helper = generate(31, &params).expect("helper");
        let from_generator = TerrainGenerator::new(GeneratorConfig::default())
            .expect("default config")
            .generate(31, &params)
            .expect("generator");
        assert_eq!(from_helper, from_generator);
    }

    #[test]
    fn maze_keys_override_settings() {
        let params = GenerationParams::default().with(KEY_CORRIDOR_WIDTH, 2).with(KEY_ROOM_CHANCE, 50);
        let settings = maze_settings(&params, &MazeSettings::default()).expect("settings");
        assert_eq!(settings.corridor_width, 2);
        assert_eq!(settings.room_chance, 0.5);

        let params = GenerationParams::default().with(KEY_CORRIDOR_WIDTH, 4);
        assert!(matches!(
            maze_settings(&params, &MazeSettings::default()),
            Err(GenerationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn oversized_and_invalid_requests_fail_before_generation() {
        let generator = TerrainGenerator::default();
        let huge = GenerationParams::default().with_size(MAX_DIMENSION + 1, 10);
        assert!(matches!(generator.generate(1, &huge), Err(GenerationError::InvalidDimensions { .. })));
        let deep = GenerationParams::default().with_depth(-3);
        assert!(matches!(generator.generate(1, &deep), Err(GenerationError::InvalidParameter { .. })));
    }

    #[test]
    fn biome_count_alone_selects_the_composite() {
        let params = GenerationParams::new("postapoc").with_size(80, 60).with(KEY_BIOME_COUNT, 2);
        let (terrain, assignment) =
            TerrainGenerator::default().generate_composite(4, &params).expect("composite");
        let direct = generate(4, &params).expect("dispatch");
        assert_eq!(terrain, direct);
        assert_eq!(assignment.distinct_regions().len(), 2);
    }
}
