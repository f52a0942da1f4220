//! Transition blending: re-rolls every transition-zone tile from a style
//! chosen by the pair of generator kinds meeting there.

use std::collections::BTreeMap;

use tracing::debug;

use crate::params::GeneratorKind;
use crate::terrain::Terrain;
use crate::types::TileType::{Corridor, Floor, Tree, Wall, WaterShallow};
use crate::types::{Pos, TileType};

use super::seed::{GenRng, STREAM_BLEND, derive_seed};
use super::voronoi::BiomeAssignment;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlendStyle {
    pub name: &'static str,
    pub weights: &'static [(TileType, u32)],
}

pub const FALLBACK_STYLE: BlendStyle =
    BlendStyle { name: "broken ground", weights: &[(Floor, 50), (Wall, 50)] };

/// Style for an unordered pair of kinds.
pub fn style_for(a: GeneratorKind, b: GeneratorKind) -> BlendStyle {
    use GeneratorKind::{Bsp, Cellular, Forest, Maze};
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    let (name, weights): (&'static str, &'static [(TileType, u32)]) = match (low, high) {
        (Bsp, Bsp) => ("collapsed hall", &[(Floor, 60), (Corridor, 15), (Wall, 25)]),
        (Bsp, Cellular) => ("rocky passage", &[(Floor, 60), (Wall, 20), (Corridor, 20)]),
        (Bsp, Maze) => ("ruined corridors", &[(Corridor, 45), (Floor, 25), (Wall, 30)]),
        (Bsp, Forest) => ("overgrown courtyard", &[(Floor, 60), (Tree, 25), (Wall, 15)]),
        (Cellular, Cellular) => ("rubble field", &[(Floor, 65), (Wall, 35)]),
        (Cellular, Maze) => ("crumbling tunnels", &[(Floor, 45), (Corridor, 20), (Wall, 35)]),
        (Cellular, Forest) => {
            ("mossy grotto", &[(Floor, 50), (WaterShallow, 15), (Wall, 20), (Tree, 15)])
        }
        (Maze, Maze) => ("twisting passages", &[(Corridor, 65), (Wall, 35)]),
        (Maze, Forest) => ("hedge rows", &[(Floor, 45), (Corridor, 20), (Tree, 35)]),
        (Forest, Forest) => ("thicket", &[(Floor, 60), (WaterShallow, 5), (Tree, 35)]),
        _ => return FALLBACK_STYLE,
    };
    BlendStyle { name, weights }
}

/// `None` marks a region filled with the default biome; those pairs use the fallback.
fn style_for_regions(kinds: &[Option<GeneratorKind>], low: u8, high: u8) -> BlendStyle {
    let kind = |region: u8| kinds.get(usize::from(region)).copied().flatten();
    match (kind(low), kind(high)) {
        (Some(a), Some(b)) => style_for(a, b),
        _ => FALLBACK_STYLE,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlendReport {
    pub zones: usize,
    pub tiles: usize,
    pub eroded: usize,
}

/// Blends every transition zone. Pairs are visited in sorted order and each pair
/// draws from its own stream, so the output does not depend on visit order.
pub fn blend(
    terrain: &mut Terrain,
    assignment: &BiomeAssignment,
    kinds: &[Option<GeneratorKind>],
    seed: i64,
) -> BlendReport {
    let mut zones: BTreeMap<(u8, u8), Vec<Pos>> = BTreeMap::new();
    for pos in assignment.positions() {
        if let Some(pair) = assignment.zone_pair(pos) {
            zones.entry(pair).or_default().push(pos);
        }
    }

    let mut report = BlendReport { zones: zones.len(), ..BlendReport::default() };
    for (&(low, high), tiles) in &zones {
        let style = style_for_regions(kinds, low, high);
        let key = (u64::from(low) << 8) | u64::from(high);
        let mut rng = GenRng::for_stream(derive_seed(seed, STREAM_BLEND, key), STREAM_BLEND);
        let weights: Vec<u32> = style.weights.iter().map(|&(_, weight)| weight).collect();
        for &pos in tiles {
            let tile = style.weights[rng.weighted_index(&weights)].0;
            if !terrain.is_interior(pos) || terrain.get(pos).is_stairs() {
                continue;
            }
            terrain.set(pos, tile);
            report.tiles += 1;
        }
        report.eroded += erode(terrain, tiles);
        debug!(low, high, style = style.name, tiles = tiles.len(), "zone blended");
    }
    report
}

/// Solid zone tiles with at most two solid Moore neighbours open up to Floor.
fn erode(terrain: &mut Terrain, tiles: &[Pos]) -> usize {
    let snapshot = terrain.clone();
    let mut eroded = 0;
    for &pos in tiles {
        let tile = snapshot.get(pos);
        if tile.is_walkable() || tile.is_stairs() || !snapshot.is_interior(pos) {
            continue;
        }
        let solid = pos
            .neighbors8()
            .into_iter()
            .filter(|&next| {
                let neighbour = snapshot.get(next);
                !neighbour.is_walkable() && !neighbour.is_stairs()
            })
            .count();
        if solid <= 2 {
            terrain.set(pos, Floor);
            eroded += 1;
        }
    }
    eroded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoronoiSettings;
    use crate::mapgen::voronoi::partition;

    #[test]
    fn ten_distinct_styles_cover_every_pair() {
        let mut names = Vec::new();
        for (index, &a) in GeneratorKind::ALL.iter().enumerate() {
            for &b in &GeneratorKind::ALL[index..] {
                assert_eq!(style_for(a, b), style_for(b, a));
                names.push(style_for(a, b).name);
            }
        }
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 10);
        assert!(!names.contains(&FALLBACK_STYLE.name));
        assert_eq!(
            style_for(GeneratorKind::Cellular, GeneratorKind::Bsp).weights,
            &[(Floor, 60), (Wall, 20), (Corridor, 20)]
        );
    }

    #[test]
    fn default_biome_pairs_fall_back() {
        let kinds = [Some(GeneratorKind::Bsp), None];
        assert_eq!(style_for_regions(&kinds, 0, 1), FALLBACK_STYLE);
        assert_eq!(style_for_regions(&kinds, 0, 7), FALLBACK_STYLE);
    }

    #[test]
    fn blending_is_bit_exact_and_only_touches_zones() {
        let assignment = partition(80, 60, 3, 21, &VoronoiSettings::default()).expect("partition");
        let kinds =
            [Some(GeneratorKind::Bsp), Some(GeneratorKind::Cellular), Some(GeneratorKind::Forest)];
        let mut base = Terrain::filled(80, 60, 21, Floor);
        base.set_tile(40, 30, TileType::StairsUp);

        let mut first = base.clone();
        let mut second = base.clone();
        let report = blend(&mut first, &assignment, &kinds, 21);
        blend(&mut second, &assignment, &kinds, 21);
        assert_eq!(first, second);
        assert!(report.zones >= 2);
        assert_eq!(first.get_tile(40, 30), TileType::StairsUp);

        for pos in first.positions() {
            if assignment.zone_pair(pos).is_none() || !first.is_interior(pos) {
                assert_eq!(first.get(pos), base.get(pos), "{pos:?} is outside every zone");
            }
        }
    }
}
