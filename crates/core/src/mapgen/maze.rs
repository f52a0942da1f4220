//! Recursive-backtracking maze on a lattice of `cw x cw` cells separated by
//! one-tile walls, with optional rooms punched at dead ends.

use tracing::debug;

use crate::config::MazeSettings;
use crate::error::{GenerationError, GenerationResult, ValidationFailure};
use crate::terrain::{Room, Terrain};
use crate::types::{Pos, RoomKind, TileType};

use super::grid::is_safe_stair_site;
use super::seed::{GenRng, STREAM_MAZE};
use super::stairs::{StairPair, place_far_apart, place_pair, still_safe};

const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

fn period(settings: &MazeSettings) -> usize {
    settings.corridor_width.clamp(1, 3) as usize + 1
}

/// Smallest dimension that fits two cells per axis.
pub(crate) fn min_size(settings: &MazeSettings) -> (usize, usize) {
    let side = 1 + 2 * period(settings);
    (side, side)
}

/// Rounds `dim` up until the lattice tiles it exactly; odd for single-width corridors.
pub fn lattice_dimension(dim: usize, corridor_width: i32) -> usize {
    let period = corridor_width.clamp(1, 3) as usize + 1;
    let mut dim = dim.max(1);
    while (dim - 1) % period != 0 {
        dim += 1;
    }
    dim
}

struct Lattice {
    corridor_width: i32,
    period: i32,
    columns: i32,
    rows: i32,
}

impl Lattice {
    fn index(&self, cx: i32, cy: i32) -> usize {
        (cy * self.columns + cx) as usize
    }

    fn contains(&self, cx: i32, cy: i32) -> bool {
        cx >= 0 && cy >= 0 && cx < self.columns && cy < self.rows
    }

    fn origin(&self, cx: i32, cy: i32) -> Pos {
        Pos::new(1 + cx * self.period, 1 + cy * self.period)
    }

    fn carve_cell(&self, terrain: &mut Terrain, cx: i32, cy: i32) {
        let origin = self.origin(cx, cy);
        for dy in 0..self.corridor_width {
            for dx in 0..self.corridor_width {
                terrain.set(origin.offset(dx, dy), TileType::Floor);
            }
        }
    }

    /// Opens the wall segment between a cell and its neighbour in direction `(dx, dy)`.
    fn carve_between(&self, terrain: &mut Terrain, cx: i32, cy: i32, (dx, dy): (i32, i32)) {
        let origin = self.origin(cx, cy);
        for step in 0..self.corridor_width {
            let pos = match (dx, dy) {
                (1, _) => origin.offset(self.corridor_width, step),
                (-1, _) => origin.offset(-1, step),
                (_, 1) => origin.offset(step, self.corridor_width),
                _ => origin.offset(step, -1),
            };
            terrain.set(pos, TileType::Floor);
        }
    }

    fn center(&self, cx: i32, cy: i32) -> Pos {
        self.origin(cx, cy).offset(self.corridor_width / 2, self.corridor_width / 2)
    }

    /// Carved cells and opened east/south wall segments, read off the tiles.
    fn survey(&self, terrain: &Terrain) -> TreeSurvey {
        let mut survey = TreeSurvey::default();
        for cy in 0..self.rows {
            for cx in 0..self.columns {
                let origin = self.origin(cx, cy);
                survey.cells += usize::from(terrain.get(origin) == TileType::Floor);
                if cx + 1 < self.columns {
                    let wall = origin.offset(self.corridor_width, 0);
                    survey.passages += usize::from(terrain.get(wall) == TileType::Floor);
                }
                if cy + 1 < self.rows {
                    let wall = origin.offset(0, self.corridor_width);
                    survey.passages += usize::from(terrain.get(wall) == TileType::Floor);
                }
            }
        }
        survey
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TreeSurvey {
    cells: usize,
    passages: usize,
}

pub(crate) fn generate(
    seed: i64,
    width: usize,
    height: usize,
    settings: &MazeSettings,
) -> GenerationResult<Terrain> {
    build(seed, width, height, settings).map(|(terrain, _)| terrain)
}

/// Generates the maze along with a survey of the lattice taken before rooms are punched.
fn build(
    seed: i64,
    width: usize,
    height: usize,
    settings: &MazeSettings,
) -> GenerationResult<(Terrain, TreeSurvey)> {
    let (min_width, min_height) = min_size(settings);
    if width < min_width || height < min_height {
        return Err(GenerationError::dimensions(
            width as i64,
            height as i64,
            format!("mazes need at least {min_width}x{min_height}"),
        ));
    }
    let corridor_width = settings.corridor_width.clamp(1, 3);
    let width = lattice_dimension(width, corridor_width);
    let height = lattice_dimension(height, corridor_width);
    let period = corridor_width + 1;
    let lattice = Lattice {
        corridor_width,
        period,
        columns: (width as i32 - 1) / period,
        rows: (height as i32 - 1) / period,
    };

    let mut rng = GenRng::for_stream(seed, STREAM_MAZE);
    let mut terrain = Terrain::new(width, height, seed);
    let mut visited = vec![false; (lattice.columns * lattice.rows) as usize];
    let mut openings = vec![0_u8; visited.len()];

    let start = (rng.range_i32(0, lattice.columns - 1), rng.range_i32(0, lattice.rows - 1));
    visited[lattice.index(start.0, start.1)] = true;
    lattice.carve_cell(&mut terrain, start.0, start.1);
    let mut stack = vec![start];
    while let Some(&(cx, cy)) = stack.last() {
        let mut directions = DIRECTIONS;
        rng.shuffle(&mut directions);
        let next = directions.into_iter().find(|&(dx, dy)| {
            lattice.contains(cx + dx, cy + dy) && !visited[lattice.index(cx + dx, cy + dy)]
        });
        match next {
            Some((dx, dy)) => {
                let (nx, ny) = (cx + dx, cy + dy);
                lattice.carve_between(&mut terrain, cx, cy, (dx, dy));
                lattice.carve_cell(&mut terrain, nx, ny);
                visited[lattice.index(nx, ny)] = true;
                openings[lattice.index(cx, cy)] += 1;
                openings[lattice.index(nx, ny)] += 1;
                stack.push((nx, ny));
            }
            None => {
                stack.pop();
            }
        }
    }

    let tree = lattice.survey(&terrain);
    let mut dead_ends = Vec::new();
    for cy in 0..lattice.rows {
        for cx in 0..lattice.columns {
            if openings[lattice.index(cx, cy)] == 1 {
                dead_ends.push(lattice.center(cx, cy));
            }
        }
    }

    let max_room_width = (width as i32 - 2).max(1);
    let max_room_height = (height as i32 - 2).max(1);
    for &dead_end in &dead_ends {
        if !rng.chance(settings.room_chance) {
            continue;
        }
        let room_width = rng
            .range_i32(settings.min_room_size, settings.max_room_size)
            .clamp(1, max_room_width);
        let room_height = rng
            .range_i32(settings.min_room_size, settings.max_room_size)
            .clamp(1, max_room_height);
        let x = (dead_end.x - room_width / 2).clamp(1, width as i32 - 1 - room_width);
        let y = (dead_end.y - room_height / 2).clamp(1, height as i32 - 1 - room_height);
        let room = Room::new(x, y, room_width, room_height, RoomKind::Normal);
        for pos in room.rect.positions() {
            terrain.set(pos, TileType::Floor);
        }
        terrain.add_room(room);
    }

    place_quadrant_stairs(&mut terrain, &mut rng)?;
    debug!(
        seed,
        width,
        height,
        corridor_width,
        cells = tree.cells,
        passages = tree.passages,
        dead_ends = dead_ends.len(),
        rooms = terrain.rooms().len(),
        "maze generated"
    );
    Ok((terrain, tree))
}

fn quadrant(terrain: &Terrain, pos: Pos) -> usize {
    let right = pos.x as usize >= terrain.width() / 2;
    let bottom = pos.y as usize >= terrain.height() / 2;
    usize::from(right) + 2 * usize::from(bottom)
}

/// StairsUp in a random quadrant, StairsDown in the diagonally opposite one.
fn place_quadrant_stairs(
    terrain: &mut Terrain,
    rng: &mut GenRng,
) -> Result<StairPair, ValidationFailure> {
    let mut sites: [Vec<Pos>; 4] = Default::default();
    for pos in terrain.positions() {
        if is_safe_stair_site(terrain, pos) {
            sites[quadrant(terrain, pos)].push(pos);
        }
    }
    let usable: Vec<usize> = (0..4)
        .filter(|&index| !sites[index].is_empty() && !sites[3 - index].is_empty())
        .collect();
    let Some(up_quadrant) = rng.pick(&usable) else {
        return place_far_apart(terrain, rng);
    };
    let Some(up) = rng.pick(&sites[up_quadrant]) else {
        return place_far_apart(terrain, rng);
    };
    terrain.set(up, TileType::StairsUp);
    match rng.pick(&still_safe(terrain, &sites[3 - up_quadrant])) {
        Some(down) => place_pair(terrain, StairPair { up, down }),
        None => {
            terrain.set(up, TileType::Floor);
            place_far_apart(terrain, rng)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapgen::grid::reachable_from_first;

    fn open(tile: TileType) -> bool {
        tile.is_walkable() || tile.is_stairs()
    }

    fn settings(room_chance: f64, corridor_width: i32) -> MazeSettings {
        MazeSettings { room_chance, corridor_width, ..MazeSettings::default() }
    }

    #[test]
    fn even_dimensions_round_up_to_the_lattice() {
        assert_eq!(lattice_dimension(80, 1), 81);
        assert_eq!(lattice_dimension(51, 1), 51);
        assert_eq!(lattice_dimension(80, 2), 82);
        assert_eq!(lattice_dimension(40, 3), 41);
        let terrain = generate(5, 80, 50, &settings(0.1, 1)).expect("maze");
        assert_eq!((terrain.width(), terrain.height()), (81, 51));
    }

    #[test]
    fn pure_maze_is_a_spanning_tree() {
        for seed in [1, 99_999, 2024] {
            let terrain = generate(seed, 41, 31, &settings(0.0, 1)).expect("maze");
            let mut cells = 0;
            let mut passages = 0;
            for pos in terrain.positions().filter(|&pos| terrain.is_interior(pos)) {
                if !open(terrain.get(pos)) {
                    continue;
                }
                match (pos.x % 2, pos.y % 2) {
                    (1, 1) => cells += 1,
                    (0, 0) => panic!("lattice corner {pos:?} was carved"),
                    _ => passages += 1,
                }
            }
            assert_eq!(cells, 20 * 15, "seed {seed}: every cell is visited");
            assert_eq!(cells - 1, passages, "seed {seed}: tree has cells - 1 edges");
            assert!(terrain.rooms().is_empty());
        }
    }

    #[test]
    fn lattice_is_a_spanning_tree_before_rooms() {
        for (seed, corridor_width) in [(1, 1), (99_999, 1), (7, 2), (2024, 3)] {
            let (terrain, tree) = build(seed, 61, 41, &settings(0.5, corridor_width)).expect("maze");
            let period = corridor_width as usize + 1;
            let columns = (terrain.width() - 1) / period;
            let rows = (terrain.height() - 1) / period;
            assert_eq!(tree.cells, columns * rows, "seed {seed}: every cell is visited");
            assert_eq!(tree.passages, tree.cells - 1, "seed {seed}: tree has cells - 1 edges");
            assert!(!terrain.rooms().is_empty(), "seed {seed}");
        }
    }

    #[test]
    fn stairs_land_in_opposite_quadrants() {
        for seed in [3, 17, 99_999] {
            let terrain = generate(seed, 81, 51, &settings(0.1, 1)).expect("maze");
            let up = terrain.find(TileType::StairsUp).expect("stairs up");
            let down = terrain.find(TileType::StairsDown).expect("stairs down");
            assert_eq!(quadrant(&terrain, up) + quadrant(&terrain, down), 3, "seed {seed}");
            let (reached, total) = reachable_from_first(&terrain);
            assert_eq!(reached, total, "seed {seed}");
        }
    }

    #[test]
    fn dead_end_rooms_stay_inside_the_border() {
        let terrain = generate(8, 61, 41, &settings(1.0, 1)).expect("maze");
        assert!(!terrain.rooms().is_empty());
        for room in terrain.rooms() {
            assert!(room.rect.x >= 1 && room.rect.y >= 1);
            assert!(room.rect.right() <= 59 && room.rect.bottom() <= 39);
            assert!((3..=7).contains(&room.rect.width));
        }
        let (reached, total) = reachable_from_first(&terrain);
        assert_eq!(reached, total);
    }

    #[test]
    fn wide_corridors_stay_connected() {
        for corridor_width in [2, 3] {
            let terrain = generate(11, 60, 40, &settings(0.1, corridor_width)).expect("maze");
            assert_eq!((terrain.width() - 1) % (corridor_width as usize + 1), 0);
            let (reached, total) = reachable_from_first(&terrain);
            assert_eq!(reached, total, "corridor width {corridor_width}");
            assert!(terrain.find(TileType::StairsUp).is_some());
        }
    }

    #[test]
    fn tiny_maze_is_rejected() {
        assert!(matches!(
            generate(1, 3, 9, &settings(0.1, 1)),
            Err(GenerationError::InvalidDimensions { .. })
        ));
    }
}
