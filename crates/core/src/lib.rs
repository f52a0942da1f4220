//! Deterministic, seed-driven generation of tile terrain for game levels.

pub mod config;
pub mod error;
pub mod mapgen;
pub mod params;
pub mod terrain;
pub mod types;

pub use config::{ConfigError, GeneratorConfig};
pub use error::{GenerationError, GenerationResult, ValidationFailure};
pub use mapgen::{BiomeAssignment, TerrainGenerator, generate, validate};
pub use params::{Algorithm, GenerationParams, GeneratorKind};
pub use terrain::{Room, Terrain};
pub use types::*;
