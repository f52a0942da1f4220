//! Flood fills, component labelling and corridor carving shared by every generator.

use std::collections::VecDeque;

use crate::terrain::Terrain;
use crate::types::{Pos, TileType};

use super::seed::GenRng;

/// Breadth-first walk over walkable tiles from `start`, stopping after `max_tiles`.
/// Returns tiles in visit order; empty when `start` is not walkable.
pub fn flood_fill(terrain: &Terrain, start: Pos, max_tiles: usize) -> Vec<Pos> {
    let mut visited = Vec::new();
    if !terrain.is_walkable(start) || max_tiles == 0 {
        return visited;
    }

    let mut seen = vec![false; terrain.tiles().len()];
    let mut open = VecDeque::from([start]);
    if let Some(index) = terrain.index(start) {
        seen[index] = true;
    }
    while let Some(pos) = open.pop_front() {
        visited.push(pos);
        if visited.len() >= max_tiles {
            break;
        }
        for next in pos.neighbors4() {
            let Some(index) = terrain.index(next) else { continue };
            if seen[index] || !terrain.is_walkable(next) {
                continue;
            }
            seen[index] = true;
            open.push_back(next);
        }
    }
    visited
}

/// Walkable components labelled in scan order.
pub(crate) struct Components {
    pub(crate) labels: Vec<Option<usize>>,
    pub(crate) members: Vec<Vec<Pos>>,
}

impl Components {
    pub(crate) fn label(terrain: &Terrain) -> Self {
        let mut labels = vec![None; terrain.tiles().len()];
        let mut members = Vec::new();
        let mut open = VecDeque::new();
        for pos in terrain.positions() {
            let Some(index) = terrain.index(pos) else { continue };
            if labels[index].is_some() || !terrain.is_walkable(pos) {
                continue;
            }
            let label = members.len();
            let mut component = Vec::new();
            labels[index] = Some(label);
            open.push_back(pos);
            while let Some(current) = open.pop_front() {
                component.push(current);
                for next in current.neighbors4() {
                    let Some(next_index) = terrain.index(next) else { continue };
                    if labels[next_index].is_some() || !terrain.is_walkable(next) {
                        continue;
                    }
                    labels[next_index] = Some(label);
                    open.push_back(next);
                }
            }
            members.push(component);
        }
        Self { labels, members }
    }

    /// Largest component; ties go to the one found first in scan order.
    pub(crate) fn largest(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (label, component) in self.members.iter().enumerate() {
            if best.is_none_or(|current| component.len() > self.members[current].len()) {
                best = Some(label);
            }
        }
        best
    }

    pub(crate) fn total(&self) -> usize {
        self.members.iter().map(Vec::len).sum()
    }
}

/// Share of walkable tiles inside the largest walkable component. 1.0 with no walkable tiles.
pub fn connectivity_ratio(terrain: &Terrain) -> f64 {
    let components = Components::label(terrain);
    let total = components.total();
    match components.largest() {
        Some(label) if total > 0 => components.members[label].len() as f64 / total as f64,
        _ => 1.0,
    }
}

/// `(reached, total)` for a flood fill started at the first walkable tile.
pub fn reachable_from_first(terrain: &Terrain) -> (usize, usize) {
    let total = terrain.walkable_count();
    let Some(start) = terrain.positions().find(|&pos| terrain.is_walkable(pos)) else {
        return (0, 0);
    };
    (flood_fill(terrain, start, usize::MAX).len(), total)
}

/// Breadth-first step counts over walkable tiles; `None` for unreachable tiles.
pub(crate) fn walk_distances(terrain: &Terrain, start: Pos) -> Vec<Option<u32>> {
    let mut distances = vec![None; terrain.tiles().len()];
    let Some(start_index) = terrain.index(start) else { return distances };
    distances[start_index] = Some(0);
    let mut open = VecDeque::from([start]);
    while let Some(pos) = open.pop_front() {
        let Some(current) = terrain.index(pos).and_then(|index| distances[index]) else {
            continue;
        };
        for next in pos.neighbors4() {
            let Some(index) = terrain.index(next) else { continue };
            if distances[index].is_some() || !terrain.is_walkable(next) {
                continue;
            }
            distances[index] = Some(current + 1);
            open.push_back(next);
        }
    }
    distances
}

/// Makes `pos` passable: solid tiles become `tile`, water becomes Bridge.
/// Walkable tiles, stairs and the outer ring are left alone.
pub(crate) fn carve_passage(terrain: &mut Terrain, pos: Pos, tile: TileType) {
    if !terrain.is_interior(pos) {
        return;
    }
    match terrain.get(pos) {
        TileType::Wall | TileType::Tree | TileType::Structure => terrain.set(pos, tile),
        TileType::WaterDeep => terrain.set(pos, TileType::Bridge),
        _ => {}
    }
}

/// Tiles of an L-shaped route from `start` to `end`, in walking order.
pub(crate) fn l_path(start: Pos, end: Pos, horizontal_first: bool) -> Vec<Pos> {
    let corner =
        if horizontal_first { Pos { y: start.y, x: end.x } } else { Pos { y: end.y, x: start.x } };
    let mut path = straight_segment(start, corner);
    let tail = straight_segment(corner, end);
    path.extend(tail.into_iter().skip(1));
    path
}

fn straight_segment(from: Pos, to: Pos) -> Vec<Pos> {
    let dx = (to.x - from.x).signum();
    let dy = (to.y - from.y).signum();
    let steps = from.manhattan(to) as usize;
    let mut segment = Vec::with_capacity(steps + 1);
    let mut pos = from;
    segment.push(pos);
    for _ in 0..steps {
        pos = pos.offset(dx, dy);
        segment.push(pos);
    }
    segment
}

/// Carves an L-shaped corridor and returns its tiles in walking order.
pub(crate) fn carve_l_corridor(
    terrain: &mut Terrain,
    start: Pos,
    end: Pos,
    horizontal_first: bool,
    tile: TileType,
) -> Vec<Pos> {
    let path = l_path(start, end, horizontal_first);
    for &pos in &path {
        carve_passage(terrain, pos, tile);
    }
    path
}

/// Horizontal leg first when the horizontal offset dominates.
pub(crate) fn horizontal_first(start: Pos, end: Pos) -> bool {
    start.x.abs_diff(end.x) >= start.y.abs_diff(end.y)
}

/// Closest pair `(from, to)` between two labelled components, found by a
/// multi-source breadth-first search from `from_label` across every tile.
pub(crate) fn nearest_pair(
    terrain: &Terrain,
    components: &Components,
    from_label: usize,
    to_label: usize,
) -> Option<(Pos, Pos)> {
    let mut origin: Vec<Option<Pos>> = vec![None; terrain.tiles().len()];
    let mut open = VecDeque::new();
    for &pos in components.members.get(from_label)? {
        if let Some(index) = terrain.index(pos) {
            origin[index] = Some(pos);
            open.push_back(pos);
        }
    }
    while let Some(pos) = open.pop_front() {
        let source = terrain.index(pos).and_then(|index| origin[index])?;
        for next in pos.neighbors4() {
            let Some(index) = terrain.index(next) else { continue };
            if origin[index].is_some() {
                continue;
            }
            if components.labels[index] == Some(to_label) {
                return Some((source, next));
            }
            origin[index] = Some(source);
            open.push_back(next);
        }
    }
    None
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct RegionReport {
    pub(crate) reverted_tiles: usize,
    pub(crate) tunnels: usize,
}

/// Keeps the dominant walkable region, fills regions smaller than `min_region_size`
/// with `fill`, and tunnels every larger region to the dominant one.
pub(crate) fn unify_regions(
    terrain: &mut Terrain,
    min_region_size: usize,
    fill: TileType,
    tunnel: TileType,
) -> RegionReport {
    let mut report = RegionReport::default();
    let initial = Components::label(terrain).members.len();
    for _ in 0..=initial {
        let components = Components::label(terrain);
        let Some(main) = components.largest() else { break };
        if components.members.len() <= 1 {
            break;
        }

        let mut target = None;
        for (label, component) in components.members.iter().enumerate() {
            if label == main {
                continue;
            }
            if component.len() < min_region_size {
                for &pos in component {
                    terrain.set(pos, fill);
                }
                report.reverted_tiles += component.len();
            } else if target.is_none_or(|current: usize| {
                component.len() > components.members[current].len()
            }) {
                target = Some(label);
            }
        }

        let Some(target) = target else { continue };
        let Some((from, to)) = nearest_pair(terrain, &components, main, target) else { break };
        carve_l_corridor(terrain, from, to, horizontal_first(from, to), tunnel);
        report.tunnels += 1;
    }
    report
}

/// A blocking tile placed here cannot split the walkable graph: every walkable
/// orthogonal neighbour lies on one unbroken walkable run of the Moore ring.
/// Dead ends and open floor both qualify; corridor interiors do not.
pub(crate) fn is_safe_stair_site(terrain: &Terrain, pos: Pos) -> bool {
    if !terrain.is_walkable(pos) || !terrain.is_interior(pos) {
        return false;
    }
    // Clockwise from north; even slots are the orthogonal neighbours.
    let ring = [
        pos.offset(0, -1),
        pos.offset(1, -1),
        pos.offset(1, 0),
        pos.offset(1, 1),
        pos.offset(0, 1),
        pos.offset(-1, 1),
        pos.offset(-1, 0),
        pos.offset(-1, -1),
    ]
    .map(|next| terrain.is_walkable(next));
    if ring.iter().all(|&walkable| walkable) {
        return true;
    }
    let Some(gap) = ring.iter().position(|&walkable| !walkable) else { return true };

    let mut runs_with_orthogonal = 0;
    let mut in_run = false;
    let mut run_has_orthogonal = false;
    for step in 1..=ring.len() {
        let slot = (gap + step) % ring.len();
        if ring[slot] {
            in_run = true;
            run_has_orthogonal |= slot % 2 == 0;
        } else if in_run {
            runs_with_orthogonal += usize::from(run_has_orthogonal);
            in_run = false;
            run_has_orthogonal = false;
        }
    }
    runs_with_orthogonal == 1
}

/// Cellular smoothing pass shared by caves and forests: `solid` when at least
/// `birth_limit` of the eight neighbours are solid, `open` at or below `death_limit`.
/// Out-of-bounds neighbours count as solid. The outer ring stays solid.
pub(crate) fn smooth_step(
    terrain: &Terrain,
    solid: TileType,
    open: TileType,
    birth_limit: u32,
    death_limit: u32,
) -> Terrain {
    let mut next = terrain.clone();
    for pos in terrain.positions() {
        if !terrain.is_interior(pos) {
            next.set(pos, solid);
            continue;
        }
        let solid_neighbours = pos
            .neighbors8()
            .into_iter()
            .filter(|&neighbour| !terrain.in_bounds(neighbour) || terrain.get(neighbour) == solid)
            .count() as u32;
        if solid_neighbours >= birth_limit {
            next.set(pos, solid);
        } else if solid_neighbours <= death_limit {
            next.set(pos, open);
        }
    }
    next
}

/// Random interior walkable tile, if any.
pub(crate) fn random_walkable(terrain: &Terrain, rng: &mut GenRng) -> Option<Pos> {
    let candidates: Vec<Pos> =
        terrain.positions().filter(|&pos| terrain.is_interior(pos) && terrain.is_walkable(pos)).collect();
    rng.pick(&candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_fill_respects_budget_and_walls() {
        let terrain = Terrain::from_ascii(&["#######", "#...#.#", "#...#.#", "#######"], 0);
        let all = flood_fill(&terrain, Pos::new(1, 1), usize::MAX);
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], Pos::new(1, 1));
        assert_eq!(flood_fill(&terrain, Pos::new(1, 1), 4).len(), 4);
        assert!(flood_fill(&terrain, Pos::new(0, 0), 10).is_empty());
    }

    #[test]
    fn components_and_connectivity_ratio() {
        let terrain = Terrain::from_ascii(&["#######", "#...#.#", "#...#.#", "#######"], 0);
        let components = Components::label(&terrain);
        assert_eq!(components.members.len(), 2);
        assert_eq!(components.largest(), Some(0));
        assert!((connectivity_ratio(&terrain) - 0.75).abs() < 1e-9);
        assert_eq!(reachable_from_first(&terrain), (6, 8));
    }

    #[test]
    fn labelling_many_isolated_tiles_touches_each_tile_once() {
        let mut terrain = Terrain::new(601, 601, 0);
        for pos in terrain.positions().filter(|pos| pos.x % 2 == 1 && pos.y % 2 == 1) {
            terrain.set(pos, TileType::Floor);
        }
        let components = Components::label(&terrain);
        assert_eq!(components.members.len(), 300 * 300);
        assert!(components.members.iter().all(|component| component.len() == 1));
        for (label, component) in components.members.iter().enumerate() {
            let index = terrain.index(component[0]).expect("in bounds");
            assert_eq!(components.labels[index], Some(label));
        }
        assert_eq!(components.labels.iter().flatten().count(), components.total());
    }

    #[test]
    fn l_path_walks_horizontal_then_vertical() {
        let path = l_path(Pos::new(1, 1), Pos::new(3, 3), true);
        assert_eq!(
            path,
            vec![Pos::new(1, 1), Pos::new(2, 1), Pos::new(3, 1), Pos::new(3, 2), Pos::new(3, 3)]
        );
        let vertical = l_path(Pos::new(1, 1), Pos::new(3, 3), false);
        assert_eq!(vertical[1], Pos::new(1, 2));
        assert_eq!(l_path(Pos::new(2, 2), Pos::new(2, 2), true), vec![Pos::new(2, 2)]);
    }

    #[test]
    fn carving_bridges_water_and_spares_the_border() {
        let mut terrain = Terrain::from_ascii(&["#####", "#.~T#", "#####"], 0);
        carve_l_corridor(&mut terrain, Pos::new(0, 1), Pos::new(4, 1), true, TileType::Corridor);
        assert_eq!(terrain.to_ascii(), "#####\n#.=:#\n#####\n");
    }

    #[test]
    fn unify_regions_tunnels_large_and_fills_small() {
        let mut terrain = Terrain::from_ascii(
            &[
                "############",
                "#....##....#",
                "#....##....#",
                "############",
                "#.##########",
                "############",
            ],
            0,
        );
        let report = unify_regions(&mut terrain, 3, TileType::Wall, TileType::Floor);
        assert_eq!(report.reverted_tiles, 1);
        assert_eq!(report.tunnels, 1);
        assert_eq!(terrain.get_tile(1, 4), TileType::Wall);
        let (reached, total) = reachable_from_first(&terrain);
        assert_eq!(reached, total);
    }

    #[test]
    fn safe_stair_sites_never_split_a_corridor() {
        let terrain = Terrain::from_ascii(
            &["#######", "#.....#", "#.....#", "#.....#", "###.###", "###.###", "#######"],
            0,
        );
        assert!(is_safe_stair_site(&terrain, Pos::new(3, 2)));
        assert!(is_safe_stair_site(&terrain, Pos::new(3, 5)));
        assert!(is_safe_stair_site(&terrain, Pos::new(1, 1)));
        assert!(!is_safe_stair_site(&terrain, Pos::new(3, 4)));
        assert!(!is_safe_stair_site(&terrain, Pos::new(3, 3)));
        assert!(!is_safe_stair_site(&terrain, Pos::new(0, 0)));
    }

    #[test]
    fn smoothing_fills_isolated_open_tiles() {
        let terrain = Terrain::from_ascii(&["#####", "#####", "##.##", "#####", "#####"], 0);
        let smoothed = smooth_step(&terrain, TileType::Wall, TileType::Floor, 4, 3);
        assert_eq!(smoothed.count(TileType::Floor), 0);
    }
}
