//! Caller-facing generation parameters and the string-keyed custom map.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GenerationError, GenerationResult};

pub const KEY_WIDTH: &str = "width";
pub const KEY_HEIGHT: &str = "height";
pub const KEY_ALGORITHM: &str = "algorithm";
pub const KEY_ROOM_CHANCE: &str = "roomChance";
pub const KEY_CORRIDOR_WIDTH: &str = "corridorWidth";
pub const KEY_BIOME_COUNT: &str = "biomeCount";

/// Single-biome generator kinds. Closed set, dispatched with `match`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    Bsp,
    Cellular,
    Maze,
    Forest,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 4] =
        [GeneratorKind::Bsp, GeneratorKind::Cellular, GeneratorKind::Maze, GeneratorKind::Forest];

    pub fn name(self) -> &'static str {
        match self {
            GeneratorKind::Bsp => "bsp",
            GeneratorKind::Cellular => "cellular",
            GeneratorKind::Maze => "maze",
            GeneratorKind::Forest => "forest",
        }
    }
}

/// What a top-level `generate` call produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Single(GeneratorKind),
    Composite,
}

impl Algorithm {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bsp" | "dungeon" => Some(Algorithm::Single(GeneratorKind::Bsp)),
            "cellular" | "cave" => Some(Algorithm::Single(GeneratorKind::Cellular)),
            "maze" => Some(Algorithm::Single(GeneratorKind::Maze)),
            "forest" => Some(Algorithm::Single(GeneratorKind::Forest)),
            "composite" | "biomes" => Some(Algorithm::Composite),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Single(kind) => f.write_str(kind.name()),
            Algorithm::Composite => f.write_str("composite"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationParams {
    pub difficulty: f64,
    pub depth: i32,
    #[serde(rename = "genreID", alias = "genre")]
    pub genre_id: String,
    pub custom: BTreeMap<String, Value>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { difficulty: 0.5, depth: 0, genre_id: "fantasy".to_string(), custom: BTreeMap::new() }
    }
}

impl GenerationParams {
    pub fn new(genre_id: impl Into<String>) -> Self {
        Self { genre_id: genre_id.into(), ..Self::default() }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.custom.insert(key.to_string(), value.into());
        self
    }

    pub fn with_size(self, width: i64, height: i64) -> Self {
        self.with(KEY_WIDTH, width).with(KEY_HEIGHT, height)
    }

    pub fn with_algorithm(self, algorithm: &str) -> Self {
        self.with(KEY_ALGORITHM, algorithm)
    }

    pub fn with_difficulty(mut self, difficulty: f64) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn validate(&self) -> GenerationResult<()> {
        if !self.difficulty.is_finite() || !(0.0..=1.0).contains(&self.difficulty) {
            return Err(GenerationError::parameter(
                "difficulty",
                format!("{} is outside [0, 1]", self.difficulty),
            ));
        }
        if self.depth < 0 {
            return Err(GenerationError::parameter(
                "depth",
                format!("{} must not be negative", self.depth),
            ));
        }
        Ok(())
    }

    /// Explicit `algorithm` key wins; otherwise `biomeCount` selects the composite.
    pub fn algorithm(&self) -> GenerationResult<Algorithm> {
        match self.custom.get(KEY_ALGORITHM) {
            Some(Value::String(raw)) => Algorithm::parse(raw).ok_or_else(|| {
                GenerationError::parameter(KEY_ALGORITHM, format!("unknown algorithm `{raw}`"))
            }),
            Some(other) => Err(GenerationError::parameter(
                KEY_ALGORITHM,
                format!("expected a string, got {other}"),
            )),
            None if self.custom.contains_key(KEY_BIOME_COUNT) => Ok(Algorithm::Composite),
            None => Ok(Algorithm::Single(GeneratorKind::Bsp)),
        }
    }

    /// Width and height from the custom map. Non-positive values are dimension errors.
    pub fn dimensions(&self, default_width: i64, default_height: i64) -> GenerationResult<(i64, i64)> {
        let width = self.int_or(KEY_WIDTH, default_width)?;
        let height = self.int_or(KEY_HEIGHT, default_height)?;
        if width <= 0 || height <= 0 {
            return Err(GenerationError::dimensions(
                width,
                height,
                "width and height must be positive",
            ));
        }
        Ok((width, height))
    }

    pub fn int_or(&self, key: &str, default: i64) -> GenerationResult<i64> {
        match self.custom.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value
                .as_i64()
                .or_else(|| value.as_f64().filter(|raw| raw.fract() == 0.0).map(|raw| raw as i64))
                .ok_or_else(|| {
                    GenerationError::parameter(key, format!("expected an integer, got {value}"))
                }),
        }
    }

    pub fn float_or(&self, key: &str, default: f64) -> GenerationResult<f64> {
        match self.custom.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => value.as_f64().filter(|raw| raw.is_finite()).ok_or_else(|| {
                GenerationError::parameter(key, format!("expected a number, got {value}"))
            }),
        }
    }

    /// Probability-valued keys accept either a fraction or a percentage above 1.
    pub fn probability_or(&self, key: &str, default: f64) -> GenerationResult<f64> {
        let raw = self.float_or(key, default)?;
        let value = if raw > 1.0 { raw / 100.0 } else { raw };
        if !(0.0..=1.0).contains(&value) {
            return Err(GenerationError::parameter(key, format!("{raw} is not a probability")));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let params = GenerationParams::default();
        assert_eq!(params.dimensions(80, 50), Ok((80, 50)));
        assert_eq!(params.algorithm(), Ok(Algorithm::Single(GeneratorKind::Bsp)));
        assert_eq!(params.probability_or(KEY_ROOM_CHANCE, 0.1), Ok(0.1));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let params = GenerationParams::default().with("lootTable", "rare").with_size(30, 20);
        assert_eq!(params.dimensions(80, 50), Ok((30, 20)));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn biome_count_implies_composite() {
        let params = GenerationParams::default().with(KEY_BIOME_COUNT, 3);
        assert_eq!(params.algorithm(), Ok(Algorithm::Composite));
        let params = params.with_algorithm("maze");
        assert_eq!(params.algorithm(), Ok(Algorithm::Single(GeneratorKind::Maze)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_difficulty = GenerationParams::default().with_difficulty(1.5);
        assert!(matches!(
            bad_difficulty.validate(),
            Err(GenerationError::InvalidParameter { name, .. }) if name == "difficulty"
        ));
        let nan_difficulty = GenerationParams::default().with_difficulty(f64::NAN);
        assert!(nan_difficulty.validate().is_err());
        let bad_depth = GenerationParams::default().with_depth(-1);
        assert!(matches!(
            bad_depth.validate(),
            Err(GenerationError::InvalidParameter { name, .. }) if name == "depth"
        ));
        let bad_width = GenerationParams::default().with_size(0, 10);
        assert!(matches!(
            bad_width.dimensions(80, 50),
            Err(GenerationError::InvalidDimensions { width: 0, height: 10, .. })
        ));
        let wrong_type = GenerationParams::default().with(KEY_WIDTH, "wide");
        assert!(matches!(
            wrong_type.dimensions(80, 50),
            Err(GenerationError::InvalidParameter { .. })
        ));
        let unknown = GenerationParams::default().with_algorithm("voxel");
        assert!(unknown.algorithm().is_err());
    }

    #[test]
    fn room_chance_accepts_percentages() {
        let params = GenerationParams::default().with(KEY_ROOM_CHANCE, 25);
        assert_eq!(params.probability_or(KEY_ROOM_CHANCE, 0.1), Ok(0.25));
    }

    #[test]
    fn params_deserialize_from_json() {
        let json = r#"{"difficulty":0.25,"depth":3,"genreID":"scifi","custom":{"width":64,"algorithm":"cave"}}"#;
        let params: GenerationParams = serde_json::from_str(json).expect("deserialize");
        assert_eq!(params.depth, 3);
        assert_eq!(params.genre_id, "scifi");
        assert_eq!(params.dimensions(80, 50), Ok((64, 50)));
        assert_eq!(params.algorithm(), Ok(Algorithm::Single(GeneratorKind::Cellular)));
    }
}
