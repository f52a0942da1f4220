//! Structural checks on a finished terrain, independent of how it was generated.

use crate::config::GeneratorConfig;
use crate::error::{GenerationResult, ValidationFailure};
use crate::params::{Algorithm, GeneratorKind};
use crate::terrain::Terrain;

use super::grid::{connectivity_ratio, reachable_from_first};
use super::stairs::check_stairs;

fn mismatch(algorithm: Algorithm, reason: impl Into<String>) -> ValidationFailure {
    ValidationFailure::TypeMismatch { expected: algorithm.to_string(), reason: reason.into() }
}

fn fully_connected(terrain: &Terrain) -> Result<(), ValidationFailure> {
    let (reached, total) = reachable_from_first(terrain);
    if reached == total {
        Ok(())
    } else {
        Err(ValidationFailure::Disconnected { reached, total })
    }
}

fn walkable_ratio_at_least(terrain: &Terrain, minimum: f64) -> Result<(), ValidationFailure> {
    let ratio = terrain.walkable_ratio();
    if ratio >= minimum { Ok(()) } else { Err(ValidationFailure::WalkableRatio { ratio, minimum }) }
}

/// Re-checks the guarantees `algorithm` makes about its output.
pub fn validate(
    terrain: &Terrain,
    algorithm: Algorithm,
    config: &GeneratorConfig,
) -> GenerationResult<()> {
    let (width, height) = (terrain.width(), terrain.height());
    if width == 0 || height == 0 || terrain.tiles().len() != width * height {
        let reason = format!("{width}x{height} grid has {} tiles", terrain.tiles().len());
        return Err(mismatch(algorithm, reason).into());
    }

    match algorithm {
        Algorithm::Single(GeneratorKind::Bsp) => {
            if terrain.rooms().is_empty() {
                return Err(ValidationFailure::ZeroRooms.into());
            }
            fully_connected(terrain)?;
        }
        Algorithm::Single(GeneratorKind::Maze) => {
            let on_lattice =
                (2..=4).any(|period| (width - 1) % period == 0 && (height - 1) % period == 0);
            if !on_lattice {
                let reason = format!("{width}x{height} does not fit a maze lattice");
                return Err(mismatch(algorithm, reason).into());
            }
            fully_connected(terrain)?;
        }
        Algorithm::Single(GeneratorKind::Cellular) => {
            walkable_ratio_at_least(terrain, config.cave.min_walkable_ratio)?;
            fully_connected(terrain)?;
        }
        Algorithm::Single(GeneratorKind::Forest) => {
            walkable_ratio_at_least(terrain, config.forest.min_walkable_ratio)?;
            fully_connected(terrain)?;
        }
        Algorithm::Composite => {
            let ratio = connectivity_ratio(terrain);
            let threshold = config.composite.connectivity_threshold;
            if ratio < threshold {
                return Err(ValidationFailure::Connectivity { ratio, threshold, attempts: 0 }.into());
            }
        }
    }
    check_stairs(terrain)?;
    Ok(())
}
