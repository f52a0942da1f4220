//! Manhattan Voronoi partition of the map into biome regions, plus the
//! transition zones along region boundaries.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::config::VoronoiSettings;
use crate::error::{GenerationError, GenerationResult};
use crate::params::KEY_BIOME_COUNT;
use crate::types::{Pos, Rect};

use super::seed::{GenRng, STREAM_VORONOI};

pub const MIN_REGIONS: usize = 2;
pub const MAX_REGIONS: usize = 4;

/// Which sampling branch produced a seed point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedPlacement {
    /// At least the minimum spacing from every earlier point.
    Spaced,
    /// Attempts ran out; the candidate farthest from earlier points was taken.
    BudgetExhausted { spacing: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedPoint {
    pub pos: Pos,
    pub placement: SeedPlacement,
}

/// Region id per tile for one composite call. Not part of the resulting terrain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BiomeAssignment {
    width: usize,
    height: usize,
    region_ids: Vec<u8>,
    seeds: Vec<SeedPoint>,
    zone: Vec<Option<(u8, u8)>>,
    zone_width: u32,
}

impl BiomeAssignment {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn seeds(&self) -> &[SeedPoint] {
        &self.seeds
    }

    pub fn region_count(&self) -> usize {
        self.seeds.len()
    }

    pub fn zone_width(&self) -> u32 {
        self.zone_width
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        let inside = pos.x >= 0
            && pos.y >= 0
            && (pos.x as usize) < self.width
            && (pos.y as usize) < self.height;
        inside.then(|| pos.y as usize * self.width + pos.x as usize)
    }

    pub fn region_at(&self, pos: Pos) -> Option<u8> {
        self.index(pos).map(|index| self.region_ids[index])
    }

    /// Region pair a transition-zone tile blends, smaller id first.
    pub fn zone_pair(&self, pos: Pos) -> Option<(u8, u8)> {
        self.index(pos).and_then(|index| self.zone[index])
    }

    pub fn distinct_regions(&self) -> BTreeSet<u8> {
        self.region_ids.iter().copied().collect()
    }

    pub fn positions(&self) -> impl Iterator<Item = Pos> + use<> {
        let (width, height) = (self.width as i32, self.height as i32);
        (0..height).flat_map(move |y| (0..width).map(move |x| Pos { y, x }))
    }

    pub fn region_tiles(&self, region: u8) -> Vec<Pos> {
        self.positions().filter(|&pos| self.region_at(pos) == Some(region)).collect()
    }

    /// Bounding box of every tile assigned to `region`.
    pub fn region_bounds(&self, region: u8) -> Option<Rect> {
        let mut bounds: Option<(Pos, Pos)> = None;
        for pos in self.positions().filter(|&pos| self.region_at(pos) == Some(region)) {
            bounds = Some(match bounds {
                None => (pos, pos),
                Some((low, high)) => (
                    Pos { y: low.y.min(pos.y), x: low.x.min(pos.x) },
                    Pos { y: high.y.max(pos.y), x: high.x.max(pos.x) },
                ),
            });
        }
        bounds.map(|(low, high)| Rect::new(low.x, low.y, high.x - low.x + 1, high.y - low.y + 1))
    }

    /// A tile with a 4-neighbour in a different region.
    pub fn is_boundary(&self, pos: Pos) -> bool {
        let Some(region) = self.region_at(pos) else { return false };
        pos.neighbors4()
            .into_iter()
            .filter_map(|next| self.region_at(next))
            .any(|other| other != region)
    }
}

fn draw_seeds(
    rng: &mut GenRng,
    width: usize,
    height: usize,
    count: usize,
    settings: &VoronoiSettings,
) -> Vec<SeedPoint> {
    let margin = settings.margin.max(0);
    let (max_x, max_y) = (width as i32 - 1 - margin, height as i32 - 1 - margin);
    let mut seeds: Vec<SeedPoint> = Vec::with_capacity(count);
    for _ in 0..count {
        let mut best: Option<(u32, Pos)> = None;
        let mut accepted = None;
        for _ in 0..settings.max_attempts {
            let candidate = Pos::new(rng.range_i32(margin, max_x), rng.range_i32(margin, max_y));
            let spacing =
                seeds.iter().map(|seed| seed.pos.manhattan(candidate)).min().unwrap_or(u32::MAX);
            if spacing >= settings.min_spacing {
                accepted = Some(SeedPoint { pos: candidate, placement: SeedPlacement::Spaced });
                break;
            }
            if best.is_none_or(|(current, _)| spacing > current) {
                best = Some((spacing, candidate));
            }
        }
        let seed = accepted.or_else(|| {
            best.map(|(spacing, pos)| SeedPoint {
                pos,
                placement: SeedPlacement::BudgetExhausted { spacing },
            })
        });
        if let Some(seed) = seed {
            seeds.push(seed);
        }
    }
    seeds
}

/// Splits a `width x height` map into `region_count` Manhattan Voronoi cells.
pub fn partition(
    width: usize,
    height: usize,
    region_count: usize,
    seed: i64,
    settings: &VoronoiSettings,
) -> GenerationResult<BiomeAssignment> {
    if !(MIN_REGIONS..=MAX_REGIONS).contains(&region_count) {
        return Err(GenerationError::parameter(
            KEY_BIOME_COUNT,
            format!("{region_count} is outside {MIN_REGIONS}..={MAX_REGIONS}"),
        ));
    }
    let margin = settings.margin.max(0) as usize;
    if width <= 2 * margin || height <= 2 * margin {
        return Err(GenerationError::dimensions(
            width as i64,
            height as i64,
            "no room for seed points inside the margin",
        ));
    }

    let mut rng = GenRng::for_stream(seed, STREAM_VORONOI);
    let seeds = draw_seeds(&mut rng, width, height, region_count, settings);

    let mut region_ids = Vec::with_capacity(width * height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let pos = Pos::new(x, y);
            let mut nearest = 0;
            for (id, candidate) in seeds.iter().enumerate().skip(1) {
                if candidate.pos.manhattan(pos) < seeds[nearest].pos.manhattan(pos) {
                    nearest = id;
                }
            }
            region_ids.push(nearest as u8);
        }
    }

    let zone_width = rng.range_usize(
        settings.zone_min_width as usize,
        settings.zone_max_width.max(settings.zone_min_width) as usize,
    ) as u32;
    let mut assignment = BiomeAssignment {
        width,
        height,
        region_ids,
        seeds,
        zone: vec![None; width * height],
        zone_width,
    };
    expand_zones(&mut assignment);

    debug!(
        seed,
        regions = assignment.seeds.len(),
        zone_width,
        exhausted = assignment
            .seeds
            .iter()
            .filter(|seed| seed.placement != SeedPlacement::Spaced)
            .count(),
        "biomes partitioned"
    );
    Ok(assignment)
}

/// Multi-source BFS from every boundary tile out to `zone_width`, carrying the
/// region pair of the boundary tile it started from.
fn expand_zones(assignment: &mut BiomeAssignment) {
    let mut distance = vec![u32::MAX; assignment.zone.len()];
    let mut open = VecDeque::new();
    for pos in assignment.positions() {
        let Some(region) = assignment.region_at(pos) else { continue };
        let other = pos
            .neighbors4()
            .into_iter()
            .filter_map(|next| assignment.region_at(next))
            .find(|&other| other != region);
        let (Some(other), Some(index)) = (other, assignment.index(pos)) else { continue };
        assignment.zone[index] = Some((region.min(other), region.max(other)));
        distance[index] = 0;
        open.push_back(pos);
    }

    while let Some(pos) = open.pop_front() {
        let Some(index) = assignment.index(pos) else { continue };
        if distance[index] >= assignment.zone_width {
            continue;
        }
        let pair = assignment.zone[index];
        for next in pos.neighbors4() {
            let Some(next_index) = assignment.index(next) else { continue };
            if distance[next_index] != u32::MAX {
                continue;
            }
            distance[next_index] = distance[index] + 1;
            assignment.zone[next_index] = pair;
            open.push_back(next);
        }
    }
}
