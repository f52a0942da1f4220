//! Multi-biome levels: Voronoi regions filled by single-biome generators,
//! blended at their borders and stitched back into one connected map.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::error::{GenerationError, GenerationResult, ValidationFailure};
use crate::params::{GenerationParams, GeneratorKind, KEY_BIOME_COUNT};
use crate::terrain::{Room, Terrain};
use crate::types::{Pos, Rect, RoomKind, TileType};

use super::blend::blend;
use super::grid::{
    Components, carve_l_corridor, connectivity_ratio, horizontal_first, is_safe_stair_site,
    nearest_pair,
};
use super::seed::{STREAM_REGION, derive_seed};
use super::stairs::{StairPair, farthest_site, place_pair, still_safe};
use super::voronoi::{BiomeAssignment, partition};
use super::{generate_kind, kind_min_size};

/// Tile used for regions that get no sub-generator.
pub const DEFAULT_BIOME: TileType = TileType::Floor;
const JUNCTION_SIDE: i32 = 3;

enum Stage {
    Partition,
    Regions(BiomeAssignment),
    Blend(BiomeAssignment),
    Repair(BiomeAssignment),
    Stairs(BiomeAssignment),
    Done(BiomeAssignment),
}

pub struct CompositeGenerator<'a> {
    config: &'a GeneratorConfig,
}

struct CompositeRun<'a> {
    config: &'a GeneratorConfig,
    params: &'a GenerationParams,
    seed: i64,
    region_count: usize,
    terrain: Terrain,
    kinds: Vec<Option<GeneratorKind>>,
    junctions: BTreeSet<u8>,
    repairs: u32,
}

impl<'a> CompositeGenerator<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, seed: i64, params: &GenerationParams) -> GenerationResult<Terrain> {
        self.generate_with_assignment(seed, params).map(|(terrain, _)| terrain)
    }

    /// Like [`CompositeGenerator::generate`], also returning the region grid.
    pub fn generate_with_assignment(
        &self,
        seed: i64,
        params: &GenerationParams,
    ) -> GenerationResult<(Terrain, BiomeAssignment)> {
        let settings = &self.config.composite;
        let (width, height) =
            params.dimensions(self.config.default_width, self.config.default_height)?;
        if width < settings.min_width || height < settings.min_height {
            return Err(GenerationError::dimensions(
                width,
                height,
                format!(
                    "composite levels need at least {}x{}",
                    settings.min_width, settings.min_height
                ),
            ));
        }
        let region_count = params.int_or(KEY_BIOME_COUNT, settings.default_biome_count)?;
        let region_count = usize::try_from(region_count).map_err(|_| {
            GenerationError::parameter(KEY_BIOME_COUNT, format!("{region_count} is negative"))
        })?;

        let mut run = CompositeRun {
            config: self.config,
            params,
            seed,
            region_count,
            terrain: Terrain::new(width as usize, height as usize, seed),
            kinds: Vec::new(),
            junctions: BTreeSet::new(),
            repairs: 0,
        };

        let mut stage = Stage::Partition;
        loop {
            stage = match stage {
                Stage::Partition => Stage::Regions(run.partition()?),
                Stage::Regions(assignment) => {
                    run.fill_regions(&assignment)?;
                    Stage::Blend(assignment)
                }
                Stage::Blend(assignment) => {
                    let report = blend(&mut run.terrain, &assignment, &run.kinds, seed);
                    debug!(seed, zones = report.zones, tiles = report.tiles, "biomes blended");
                    Stage::Repair(assignment)
                }
                Stage::Repair(assignment) => {
                    run.repair(&assignment)?;
                    Stage::Stairs(assignment)
                }
                Stage::Stairs(assignment) => {
                    run.place_stairs(&assignment)?;
                    Stage::Done(assignment)
                }
                Stage::Done(assignment) => {
                    info!(
                        seed,
                        regions = assignment.region_count(),
                        repairs = run.repairs,
                        rooms = run.terrain.rooms().len(),
                        "composite generated"
                    );
                    return Ok((run.terrain, assignment));
                }
            };
        }
    }
}

impl CompositeRun<'_> {
    fn partition(&self) -> GenerationResult<BiomeAssignment> {
        partition(
            self.terrain.width(),
            self.terrain.height(),
            self.region_count,
            self.seed,
            &self.config.voronoi,
        )
    }

    fn fill_regions(&mut self, assignment: &BiomeAssignment) -> GenerationResult<()> {
        let config = self.config;
        let cycle = config.genres.kinds_for(&self.params.genre_id);
        for region in 0..assignment.region_count() {
            let id = region as u8;
            let tiles = assignment.region_tiles(id);
            let Some(bounds) = assignment.region_bounds(id) else {
                self.kinds.push(None);
                continue;
            };
            let kind = cycle[region % cycle.len()];
            let sub_terrain = self.generate_region(kind, id, bounds)?;
            self.kinds.push(sub_terrain.as_ref().map(|_| kind));

            for &pos in &tiles {
                if !self.terrain.is_interior(pos) {
                    continue;
                }
                let tile = match &sub_terrain {
                    Some(sub) => match sub.get(pos.offset(-bounds.x, -bounds.y)) {
                        TileType::StairsUp | TileType::StairsDown => TileType::Floor,
                        tile => tile,
                    },
                    None => DEFAULT_BIOME,
                };
                self.terrain.set(pos, tile);
            }

            let Some(sub) = sub_terrain else { continue };
            for room in sub.rooms() {
                let rect = Rect { x: room.rect.x + bounds.x, y: room.rect.y + bounds.y, ..room.rect };
                if assignment.region_at(rect.center()) == Some(id) {
                    self.terrain.add_room(Room { rect, kind: room.kind });
                }
            }
        }
        Ok(())
    }

    /// `Ok(None)` means the region is too small for `kind` and gets the default biome.
    fn generate_region(
        &self,
        kind: GeneratorKind,
        id: u8,
        bounds: Rect,
    ) -> GenerationResult<Option<Terrain>> {
        let region_params =
            self.params.clone().with_size(i64::from(bounds.width), i64::from(bounds.height));
        let (width, height) =
            region_params.dimensions(i64::from(bounds.width), i64::from(bounds.height))?;
        let (min_width, min_height) = kind_min_size(kind, &region_params, self.config)?;
        if (width as usize) < min_width || (height as usize) < min_height {
            debug!(region = id, kind = kind.name(), width, height, "region too small for its kind");
            return Ok(None);
        }

        let region_seed = derive_seed(self.seed, STREAM_REGION, u64::from(id));
        match generate_kind(
            kind,
            region_seed,
            width as usize,
            height as usize,
            &region_params,
            self.config,
        ) {
            Ok(terrain) => Ok(Some(terrain)),
            Err(error @ GenerationError::InvalidDimensions { .. }) => {
                warn!(region = id, kind = kind.name(), %error, "region fell back to the default biome");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Fills disconnected pockets of at most `pocket_size` tiles.
    fn prune_pockets(&mut self) -> usize {
        let components = Components::label(&self.terrain);
        let main = components.largest();
        let mut pruned = 0;
        for (label, component) in components.members.iter().enumerate() {
            if Some(label) == main || component.len() > self.config.composite.pocket_size {
                continue;
            }
            for &pos in component {
                self.terrain.set(pos, TileType::Wall);
            }
            pruned += component.len();
        }
        pruned
    }

    fn carve_junction(&mut self, region: u8, center: Pos) {
        if !self.junctions.insert(region) {
            return;
        }
        let half = JUNCTION_SIDE / 2;
        let rect = Rect::new(center.x - half, center.y - half, JUNCTION_SIDE, JUNCTION_SIDE);
        for pos in rect.positions() {
            if self.terrain.is_interior(pos) && !self.terrain.get(pos).is_stairs() {
                self.terrain.set(pos, TileType::Floor);
            }
        }
        self.terrain.add_room(Room { rect, kind: RoomKind::Junction });
    }

    /// Regions owning at least one tile of the main walkable component.
    fn reached_regions(&self, assignment: &BiomeAssignment, components: &Components) -> BTreeSet<u8> {
        let Some(main) = components.largest() else { return BTreeSet::new() };
        components.members[main]
            .iter()
            .filter_map(|&pos| assignment.region_at(pos))
            .collect()
    }

    fn repair(&mut self, assignment: &BiomeAssignment) -> GenerationResult<()> {
        let config = self.config;
        let settings = &config.composite;
        let pruned = self.prune_pockets();
        let mut carved_pairs: BTreeSet<(u8, u8)> = BTreeSet::new();

        loop {
            let ratio = connectivity_ratio(&self.terrain);
            if ratio >= settings.connectivity_threshold {
                break;
            }
            if self.repairs >= settings.repair_attempts {
                return Err(ValidationFailure::Connectivity {
                    ratio,
                    threshold: settings.connectivity_threshold,
                    attempts: self.repairs,
                }
                .into());
            }
            self.repairs += 1;

            let components = Components::label(&self.terrain);
            let reached = self.reached_regions(assignment, &components);
            let seeds = assignment.seeds();
            let mut best: Option<(u32, u8, u8)> = None;
            for from in reached.iter().copied() {
                for to in (0..seeds.len() as u8).filter(|to| !reached.contains(to)) {
                    if carved_pairs.contains(&(from, to)) {
                        continue;
                    }
                    let distance =
                        seeds[usize::from(from)].pos.manhattan(seeds[usize::from(to)].pos);
                    if best.is_none_or(|(current, _, _)| distance < current) {
                        best = Some((distance, from, to));
                    }
                }
            }

            if let Some((_, from, to)) = best {
                carved_pairs.insert((from, to));
                let (start, end) = (seeds[usize::from(from)].pos, seeds[usize::from(to)].pos);
                self.carve_junction(from, start);
                self.carve_junction(to, end);
                carve_l_corridor(
                    &mut self.terrain,
                    start,
                    end,
                    horizontal_first(start, end),
                    TileType::Corridor,
                );
                debug!(attempt = self.repairs, from, to, ratio, "joined region seed points");
                continue;
            }

            let Some(main) = components.largest() else { break };
            let stray = (0..components.members.len())
                .filter(|&label| label != main)
                .max_by_key(|&label| (components.members[label].len(), usize::MAX - label));
            let Some(stray) = stray else { break };
            let Some((from, to)) = nearest_pair(&self.terrain, &components, main, stray) else {
                break;
            };
            carve_l_corridor(
                &mut self.terrain,
                from,
                to,
                horizontal_first(from, to),
                TileType::Corridor,
            );
            let size = components.members[stray].len();
            debug!(attempt = self.repairs, size, ratio, "joined stray component");
        }

        let pruned_after = self.prune_pockets();
        let ratio = connectivity_ratio(&self.terrain);
        if ratio < settings.connectivity_threshold {
            return Err(ValidationFailure::Connectivity {
                ratio,
                threshold: settings.connectivity_threshold,
                attempts: self.repairs,
            }
            .into());
        }
        debug!(repairs = self.repairs, pruned = pruned + pruned_after, ratio, "connectivity repaired");
        Ok(())
    }

    /// StairsUp on the safe site nearest the main component's centroid, StairsDown
    /// on the transition-zone site farthest from it.
    fn place_stairs(&mut self, assignment: &BiomeAssignment) -> GenerationResult<StairPair> {
        let components = Components::label(&self.terrain);
        let main = components.largest().ok_or(ValidationFailure::MissingStairs("stairs up"))?;
        let members = &components.members[main];
        let (sum_x, sum_y) = members
            .iter()
            .fold((0_i64, 0_i64), |(x, y), pos| (x + i64::from(pos.x), y + i64::from(pos.y)));
        let count = members.len() as i64;
        let centroid = Pos::new((sum_x / count) as i32, (sum_y / count) as i32);

        let mut sites: Vec<Pos> =
            members.iter().copied().filter(|&pos| is_safe_stair_site(&self.terrain, pos)).collect();
        sites.sort();
        let up = sites
            .iter()
            .copied()
            .min_by_key(|&pos| (pos.manhattan(centroid), pos))
            .ok_or(ValidationFailure::MissingStairs("stairs up"))?;

        self.terrain.set(up, TileType::StairsUp);
        let remaining = still_safe(&self.terrain, &sites);
        let zone_sites: Vec<Pos> =
            remaining.iter().copied().filter(|&pos| assignment.zone_pair(pos).is_some()).collect();
        let down = farthest_site(&self.terrain, up, &zone_sites)
            .or_else(|| farthest_site(&self.terrain, up, &remaining))
            .ok_or(ValidationFailure::MissingStairs("stairs down"))?;
        Ok(place_pair(&mut self.terrain, StairPair { up, down })?)
    }
}
