use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use terragen::{GenerationParams, GeneratorConfig, TerrainGenerator};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about = "Generate a tile terrain and print it as ASCII", long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42, allow_negative_numbers = true)]
    seed: i64,
    /// bsp, cave, maze, forest or composite
    #[arg(short, long)]
    algorithm: Option<String>,
    #[arg(long)]
    width: Option<i64>,
    #[arg(long)]
    height: Option<i64>,
    #[arg(short, long)]
    genre: Option<String>,
    #[arg(long)]
    difficulty: Option<f64>,
    #[arg(long)]
    depth: Option<i32>,
    #[arg(long)]
    biome_count: Option<i64>,
    #[arg(long)]
    room_chance: Option<f64>,
    #[arg(long)]
    corridor_width: Option<i64>,
    /// TOML generator configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON `GenerationParams`; flags given alongside override its fields
    #[arg(long)]
    params: Option<PathBuf>,
    #[arg(long)]
    fingerprint_only: bool,
}

impl Args {
    fn generation_params(&self) -> Result<GenerationParams> {
        let mut params = match &self.params {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read params file: {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse params JSON: {}", path.display()))?
            }
            None => GenerationParams::default(),
        };

        if let Some(genre) = &self.genre {
            params.genre_id.clone_from(genre);
        }
        if let Some(difficulty) = self.difficulty {
            params.difficulty = difficulty;
        }
        if let Some(depth) = self.depth {
            params.depth = depth;
        }
        let overrides: [(&str, Option<Value>); 6] = [
            ("algorithm", self.algorithm.clone().map(Into::into)),
            ("width", self.width.map(Into::into)),
            ("height", self.height.map(Into::into)),
            ("biomeCount", self.biome_count.map(Into::into)),
            ("roomChance", self.room_chance.map(Into::into)),
            ("corridorWidth", self.corridor_width.map(Into::into)),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                params.custom.insert(key.to_string(), value);
            }
        }
        Ok(params)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    let params = args.generation_params()?;
    let algorithm = params.algorithm().context("invalid algorithm")?;

    let terrain = TerrainGenerator::new(config)
        .context("invalid generator config")?
        .generate(args.seed, &params)
        .with_context(|| format!("{algorithm} generation failed for seed {}", args.seed))?;

    if !args.fingerprint_only {
        println!("{terrain}");
        println!("Algorithm: {algorithm}");
        println!("Size: {}x{}", terrain.width(), terrain.height());
        println!("Walkable: {:.1}%", terrain.walkable_ratio() * 100.0);
        println!("Rooms: {}", terrain.rooms().len());
        for room in terrain.rooms() {
            let rect = room.rect;
            println!("  {:?} at ({}, {}) {}x{}", room.kind, rect.x, rect.y, rect.width, rect.height);
        }
    }
    println!("Fingerprint: {:016x}", terrain.fingerprint());

    Ok(())
}
