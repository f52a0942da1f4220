//! Immutable generator configuration: per-generator tuning and the genre table.
//!
//! A `GeneratorConfig` is built once (defaults or a TOML file) and handed to
//! `TerrainGenerator::new`; nothing in the crate reads configuration from
//! global state.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::GeneratorKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is not within [0, 1]")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BspSettings {
    pub min_room_size: i32,
    pub max_room_size: i32,
    /// Chance that a splittable partition stops early once `stop_min_depth` is reached.
    pub stop_probability: f64,
    pub stop_min_depth: u32,
    pub boss_difficulty: f64,
    pub moat_difficulty: f64,
    pub moat_width: i32,
}

impl Default for BspSettings {
    fn default() -> Self {
        Self {
            min_room_size: 6,
            max_room_size: 15,
            stop_probability: 0.2,
            stop_min_depth: 2,
            boss_difficulty: 0.5,
            moat_difficulty: 0.75,
            moat_width: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaveSettings {
    /// Probability that a tile starts as Wall.
    pub fill_probability: f64,
    pub iterations: u32,
    pub birth_limit: u32,
    pub death_limit: u32,
    pub min_region_size: usize,
    pub min_walkable_ratio: f64,
    pub pool_chance: f64,
    /// Pool size as a share of the cave's floor tiles.
    pub pool_fraction: f64,
    pub pool_deep_ratio: f64,
}

impl Default for CaveSettings {
    fn default() -> Self {
        Self {
            fill_probability: 0.40,
            iterations: 5,
            birth_limit: 4,
            death_limit: 3,
            min_region_size: 12,
            min_walkable_ratio: 0.30,
            pool_chance: 0.5,
            pool_fraction: 0.04,
            pool_deep_ratio: 0.35,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeSettings {
    pub room_chance: f64,
    pub corridor_width: i32,
    pub min_room_size: i32,
    pub max_room_size: i32,
}

impl Default for MazeSettings {
    fn default() -> Self {
        Self { room_chance: 0.10, corridor_width: 1, min_room_size: 3, max_room_size: 7 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestSettings {
    pub tree_density: f64,
    pub iterations: u32,
    pub birth_limit: u32,
    pub death_limit: u32,
    pub min_region_size: usize,
    pub min_walkable_ratio: f64,
    pub max_ruins: u32,
    pub lake_chance: f64,
    pub river_chance: f64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            tree_density: 0.45,
            iterations: 3,
            birth_limit: 5,
            death_limit: 3,
            min_region_size: 12,
            min_walkable_ratio: 0.30,
            max_ruins: 3,
            lake_chance: 0.5,
            river_chance: 0.6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoronoiSettings {
    pub min_spacing: u32,
    /// Rejection-sampling draws per seed point before the best candidate is taken.
    pub max_attempts: u32,
    /// Seed points are drawn at least this far from the map edge.
    pub margin: i32,
    pub zone_min_width: u32,
    pub zone_max_width: u32,
}

impl Default for VoronoiSettings {
    fn default() -> Self {
        Self { min_spacing: 15, max_attempts: 200, margin: 2, zone_min_width: 3, zone_max_width: 5 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeSettings {
    pub min_width: i64,
    pub min_height: i64,
    pub default_biome_count: i64,
    pub connectivity_threshold: f64,
    pub repair_attempts: u32,
    /// Disconnected walkable pockets up to this size are filled after blending.
    pub pocket_size: usize,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            min_width: 60,
            min_height: 40,
            default_biome_count: 3,
            connectivity_threshold: 0.90,
            repair_attempts: 24,
            pocket_size: 4,
        }
    }
}

const FALLBACK_KINDS: &[GeneratorKind] = &[GeneratorKind::Bsp];

/// Genre id to the generator kinds its composite regions cycle through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenreTable {
    pub default_genre: String,
    pub genres: BTreeMap<String, Vec<GeneratorKind>>,
}

impl Default for GenreTable {
    fn default() -> Self {
        use GeneratorKind::{Bsp, Cellular, Forest, Maze};

        let genres = BTreeMap::from([
            ("fantasy".to_string(), vec![Bsp, Cellular, Forest]),
            ("scifi".to_string(), vec![Bsp, Maze, Cellular]),
            ("horror".to_string(), vec![Maze, Cellular, Bsp]),
            ("cyberpunk".to_string(), vec![Bsp, Maze]),
            ("postapoc".to_string(), vec![Cellular, Forest, Bsp]),
        ]);
        Self { default_genre: "fantasy".to_string(), genres }
    }
}

impl GenreTable {
    /// Unknown genres resolve to the default genre's kinds. Never empty.
    pub fn kinds_for(&self, genre_id: &str) -> &[GeneratorKind] {
        let listed = |genre: &str| self.genres.get(genre).filter(|kinds| !kinds.is_empty());
        listed(genre_id).or_else(|| listed(&self.default_genre)).map_or(FALLBACK_KINDS, Vec::as_slice)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub default_width: i64,
    pub default_height: i64,
    pub bsp: BspSettings,
    pub cave: CaveSettings,
    pub maze: MazeSettings,
    pub forest: ForestSettings,
    pub voronoi: VoronoiSettings,
    pub composite: CompositeSettings,
    pub genres: GenreTable,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_width: 80,
            default_height: 50,
            bsp: BspSettings::default(),
            cave: CaveSettings::default(),
            maze: MazeSettings::default(),
            forest: ForestSettings::default(),
            voronoi: VoronoiSettings::default(),
            composite: CompositeSettings::default(),
            genres: GenreTable::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_width <= 0 || self.default_height <= 0 {
            return Err(invalid("default_width", "default dimensions must be positive"));
        }

        let bsp = &self.bsp;
        if bsp.min_room_size < 3 || bsp.min_room_size > bsp.max_room_size {
            return Err(invalid(
                "bsp.min_room_size",
                format!("need 3 <= min ({}) <= max ({})", bsp.min_room_size, bsp.max_room_size),
            ));
        }
        check_probability("bsp.stop_probability", bsp.stop_probability)?;
        check_probability("bsp.boss_difficulty", bsp.boss_difficulty)?;
        check_probability("bsp.moat_difficulty", bsp.moat_difficulty)?;
        if !(1..=5).contains(&bsp.moat_width) {
            return Err(invalid("bsp.moat_width", "must be within 1..=5"));
        }

        check_probability("cave.fill_probability", self.cave.fill_probability)?;
        check_probability("cave.min_walkable_ratio", self.cave.min_walkable_ratio)?;
        check_probability("cave.pool_chance", self.cave.pool_chance)?;
        check_probability("cave.pool_fraction", self.cave.pool_fraction)?;
        check_probability("cave.pool_deep_ratio", self.cave.pool_deep_ratio)?;

        let maze = &self.maze;
        check_probability("maze.room_chance", maze.room_chance)?;
        if !(1..=3).contains(&maze.corridor_width) {
            return Err(invalid("maze.corridor_width", "must be within 1..=3"));
        }
        if maze.min_room_size < 1 || maze.min_room_size > maze.max_room_size {
            return Err(invalid("maze.min_room_size", "must be positive and <= max_room_size"));
        }

        check_probability("forest.tree_density", self.forest.tree_density)?;
        check_probability("forest.min_walkable_ratio", self.forest.min_walkable_ratio)?;
        check_probability("forest.lake_chance", self.forest.lake_chance)?;
        check_probability("forest.river_chance", self.forest.river_chance)?;

        let voronoi = &self.voronoi;
        if voronoi.max_attempts == 0 {
            return Err(invalid("voronoi.max_attempts", "must be at least 1"));
        }
        if voronoi.zone_min_width == 0 || voronoi.zone_min_width > voronoi.zone_max_width {
            return Err(invalid("voronoi.zone_min_width", "need 1 <= min <= max"));
        }

        let composite = &self.composite;
        if !(composite.connectivity_threshold > 0.0 && composite.connectivity_threshold <= 1.0) {
            return Err(invalid("composite.connectivity_threshold", "must be within (0, 1]"));
        }
        if !(2..=4).contains(&composite.default_biome_count) {
            return Err(invalid("composite.default_biome_count", "must be within 2..=4"));
        }

        if !self.genres.genres.contains_key(&self.genres.default_genre) {
            return Err(invalid(
                "genres.default_genre",
                format!("`{}` is not in the genre table", self.genres.default_genre),
            ));
        }
        if let Some((genre, _)) = self.genres.genres.iter().find(|(_, kinds)| kinds.is_empty()) {
            return Err(invalid("genres.genres", format!("genre `{genre}` lists no kinds")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_width, 80);
        assert_eq!(config.genres.kinds_for("fantasy"), &[
            GeneratorKind::Bsp,
            GeneratorKind::Cellular,
            GeneratorKind::Forest
        ]);
    }

    #[test]
    fn unknown_genre_uses_default_kinds() {
        let table = GenreTable::default();
        assert_eq!(table.kinds_for("western"), table.kinds_for("fantasy"));
    }

    #[test]
    fn empty_kind_lists_never_reach_the_cycle() {
        let mut table = GenreTable::default();
        table.genres.insert("horror".to_string(), Vec::new());
        assert_eq!(table.kinds_for("horror"), table.kinds_for("fantasy"));

        table.genres.insert("fantasy".to_string(), Vec::new());
        assert_eq!(table.kinds_for("horror"), FALLBACK_KINDS);
        assert_eq!(table.kinds_for("western"), FALLBACK_KINDS);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let raw = r#"
            [cave]
            fill_probability = 0.45

            [genres.genres]
            fantasy = ["maze", "forest"]
        "#;
        let config = GeneratorConfig::from_toml_str(raw).expect("parse");
        assert_eq!(config.cave.fill_probability, 0.45);
        assert_eq!(config.cave.iterations, 5);
        assert_eq!(config.bsp, BspSettings::default());
        assert_eq!(config.genres.kinds_for("fantasy"), &[GeneratorKind::Maze, GeneratorKind::Forest]);
        assert!(config.genres.genres.get("scifi").is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let raw = "[maze]\ncorridor_width = 9\n";
        assert!(matches!(
            GeneratorConfig::from_toml_str(raw),
            Err(ConfigError::Invalid { field: "maze.corridor_width", .. })
        ));
        assert!(matches!(
            GeneratorConfig::from_toml_str("[cave]\nfill_probability = \"lots\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn config_loads_from_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("terragen.toml");
        fs::write(&path, "default_width = 120\n[composite]\nrepair_attempts = 4\n").expect("write");
        let config = GeneratorConfig::load(&path).expect("load");
        assert_eq!(config.default_width, 120);
        assert_eq!(config.default_height, 50);
        assert_eq!(config.composite.repair_attempts, 4);

        let missing = GeneratorConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
