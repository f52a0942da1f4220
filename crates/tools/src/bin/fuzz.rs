use anyhow::{Result, bail};
use clap::Parser;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use terragen::mapgen::{check_stairs, connectivity_ratio, reachable_from_first};
use terragen::{Algorithm, GenerationError, GenerationParams, TerrainGenerator, validate};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 200)]
    runs: u32,
}

const ALGORITHMS: [&str; 5] = ["bsp", "cave", "maze", "forest", "composite"];
const GENRES: [&str; 6] = ["fantasy", "scifi", "horror", "cyberpunk", "postapoc", "western"];

fn choose<T: Copy>(rng: &mut ChaCha8Rng, slice: &[T]) -> T {
    let p = rng.next_u64() as usize % slice.len();
    slice[p]
}

fn between(rng: &mut ChaCha8Rng, low: i64, high: i64) -> i64 {
    low + (rng.next_u64() % (high - low + 1) as u64) as i64
}

fn random_params(rng: &mut ChaCha8Rng) -> GenerationParams {
    let algorithm = choose(rng, &ALGORITHMS);
    let (min_width, min_height) = if algorithm == "composite" { (60, 40) } else { (20, 16) };
    let mut params = GenerationParams::new(choose(rng, &GENRES))
        .with_algorithm(algorithm)
        .with_size(between(rng, min_width, 140), between(rng, min_height, 100))
        .with_difficulty((rng.next_u64() % 101) as f64 / 100.0)
        .with_depth(between(rng, 0, 20) as i32);
    match algorithm {
        "composite" => params = params.with("biomeCount", between(rng, 2, 4)),
        "maze" => {
            params = params
                .with("corridorWidth", between(rng, 1, 3))
                .with("roomChance", (rng.next_u64() % 31) as f64 / 100.0);
        }
        _ => {}
    }
    params
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    println!("Starting fuzz harness on seed {} for {} runs...", args.seed, args.runs);
    let generator = TerrainGenerator::default();
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut rejected = 0;

    for run in 0..args.runs {
        let seed = rng.next_u64() as i64;
        let params = random_params(&mut rng);
        let algorithm = params.algorithm()?;

        let terrain = match generator.generate(seed, &params) {
            Ok(terrain) => terrain,
            Err(GenerationError::ValidationFailure(failure)) => {
                warn!(run, seed, %algorithm, %failure, "generation rejected");
                rejected += 1;
                continue;
            }
            Err(error) => bail!("run {run}: {algorithm} seed {seed} returned {error}"),
        };

        validate(&terrain, algorithm, generator.config())?;
        check_stairs(&terrain)?;
        let again = generator.generate(seed, &params)?;
        if again != terrain {
            bail!("run {run}: {algorithm} seed {seed} is not deterministic");
        }

        match algorithm {
            Algorithm::Composite => {
                let ratio = connectivity_ratio(&terrain);
                if ratio < generator.config().composite.connectivity_threshold {
                    bail!("run {run}: composite seed {seed} connectivity {ratio:.3}");
                }
            }
            Algorithm::Single(_) => {
                let (reached, total) = reachable_from_first(&terrain);
                if reached != total {
                    bail!("run {run}: {algorithm} seed {seed} reached {reached}/{total}");
                }
            }
        }
    }

    info!(runs = args.runs, rejected, "fuzzing finished");
    println!("Fuzzing completed successfully ({rejected} rejected by validation).");
    Ok(())
}
