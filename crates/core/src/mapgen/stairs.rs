//! Stair placement rules shared by the generators.

use crate::error::ValidationFailure;
use crate::terrain::Terrain;
use crate::types::{Pos, TileType};

use super::grid::{Components, is_safe_stair_site, walk_distances};
use super::seed::GenRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StairPair {
    pub up: Pos,
    pub down: Pos,
}

/// Safe stair sites inside the dominant walkable component, in scan order.
pub(crate) fn safe_sites_in_main(terrain: &Terrain) -> Vec<Pos> {
    let components = Components::label(terrain);
    let Some(main) = components.largest() else { return Vec::new() };
    let mut sites: Vec<Pos> = components.members[main]
        .iter()
        .copied()
        .filter(|&pos| is_safe_stair_site(terrain, pos))
        .collect();
    sites.sort();
    sites
}

/// Safe site in `sites` with the longest walk from `from`; ties go to the earliest site.
pub(crate) fn farthest_site(terrain: &Terrain, from: Pos, sites: &[Pos]) -> Option<Pos> {
    let distances = walk_distances(terrain, from);
    let mut best: Option<(u32, Pos)> = None;
    for &site in sites {
        if site == from {
            continue;
        }
        let Some(distance) = terrain.index(site).and_then(|index| distances[index]) else {
            continue;
        };
        if best.is_none_or(|(best_distance, _)| distance > best_distance) {
            best = Some((distance, site));
        }
    }
    best.map(|(_, site)| site)
}

/// StairsUp on a random safe site, StairsDown on the safe site farthest from it.
pub(crate) fn place_far_apart(
    terrain: &mut Terrain,
    rng: &mut GenRng,
) -> Result<StairPair, ValidationFailure> {
    let sites = safe_sites_in_main(terrain);
    let up = rng.pick(&sites).ok_or(ValidationFailure::MissingStairs("stairs up"))?;
    terrain.set(up, TileType::StairsUp);
    let remaining = still_safe(terrain, &sites);
    let down = farthest_site(terrain, up, &remaining)
        .ok_or(ValidationFailure::MissingStairs("stairs down"))?;
    place_pair(terrain, StairPair { up, down })
}

/// Sites that are still safe with StairsUp in place.
pub(crate) fn still_safe(terrain: &Terrain, sites: &[Pos]) -> Vec<Pos> {
    sites.iter().copied().filter(|&site| is_safe_stair_site(terrain, site)).collect()
}

pub(crate) fn place_pair(
    terrain: &mut Terrain,
    pair: StairPair,
) -> Result<StairPair, ValidationFailure> {
    terrain.set(pair.up, TileType::StairsUp);
    terrain.set(pair.down, TileType::StairsDown);
    check_stairs(terrain)?;
    Ok(pair)
}

/// Both stairs exist and each touches at least one walkable tile.
pub fn check_stairs(terrain: &Terrain) -> Result<(), ValidationFailure> {
    for (tile, label) in [(TileType::StairsUp, "stairs up"), (TileType::StairsDown, "stairs down")] {
        let pos = terrain.find(tile).ok_or(ValidationFailure::MissingStairs(label))?;
        if terrain.walkable_neighbor_count(pos) == 0 {
            return Err(ValidationFailure::StairsBlocked(label, pos.x, pos.y));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapgen::seed::STREAM_CAVE;

    #[test]
    fn far_apart_stairs_land_at_opposite_ends_of_a_corridor() {
        let mut terrain = Terrain::from_ascii(&["#########", "#.......#", "#########"], 5);
        let mut rng = GenRng::for_stream(5, STREAM_CAVE);
        let pair = place_far_apart(&mut terrain, &mut rng).expect("stairs");
        let mut ends = [pair.up, pair.down];
        ends.sort();
        assert_eq!(ends, [Pos::new(1, 1), Pos::new(7, 1)]);
        assert!(check_stairs(&terrain).is_ok());
    }

    #[test]
    fn missing_or_walled_in_stairs_are_reported() {
        let terrain = Terrain::from_ascii(&["#####", "#.^.#", "#####"], 0);
        assert_eq!(check_stairs(&terrain), Err(ValidationFailure::MissingStairs("stairs down")));

        let terrain = Terrain::from_ascii(&["#####", "#^#v#", "#####"], 0);
        assert_eq!(check_stairs(&terrain), Err(ValidationFailure::StairsBlocked("stairs up", 1, 1)));
    }

    #[test]
    fn no_walkable_tiles_means_no_stairs() {
        let mut terrain = Terrain::new(6, 6, 0);
        let mut rng = GenRng::for_stream(0, STREAM_CAVE);
        assert_eq!(
            place_far_apart(&mut terrain, &mut rng),
            Err(ValidationFailure::MissingStairs("stairs up"))
        );
    }
}
