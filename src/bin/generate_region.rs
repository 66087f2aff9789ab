//! LOD generator binary: fills regions around the origin from noise terrain.
//!
//! Usage: cargo run --release --bin generate_region -- [OPTIONS]
//!
//! Options:
//!   --seed <SEED>       Random seed (default: 12345)
//!   --out <DIR>         Output directory (default: "lod_data")
//!   --chunks <N>        Render distance in chunks (default: 32)
//!   --scale <SCALE>     Terrain noise scale (default: 150.0)
//!   --height <H>        Terrain height scale (default: 80.0)
//!   --rounds <N>        Generation rounds (default: 64)
//!   --batch <N>         Positions per round (default: 64)
//!   --jobs <N>          Parallel column builds (default: 4)
//!
//! Output structure:
//!   <out>/
//!     config.json
//!     medium/detail-<d>/r.<x>.<z>.lod

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use glam::DVec2;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;

use lodtree::core::LodConfig;
use lodtree::lod::data_point::{pack_argb, DataPoint, MAX_VERTICAL};
use lodtree::lod::Dimension;
use lodtree::math::CellRect;
use lodtree::streaming::{GenPos, RegionFileStore};

/// Height field sampled from fractal noise
struct Terrain {
    noise: Fbm<Perlin>,
    scale: f64,
    height_scale: f64,
    sea_level: f64,
}

impl Terrain {
    fn new(seed: u32, scale: f64, height_scale: f64) -> Self {
        let noise = Fbm::<Perlin>::new(seed)
            .set_octaves(5)
            .set_persistence(0.5)
            .set_lacunarity(2.0);
        Self { noise, scale, height_scale, sea_level: height_scale * 0.25 }
    }

    fn height_at(&self, x: f64, z: f64) -> f64 {
        let value = self.noise.get([x / self.scale, z / self.scale]);
        (value + 1.0) / 2.0 * self.height_scale
    }

    /// One column covering the terrain spread inside a cell
    fn column(&self, pos: &GenPos, min_y: i32, mode: u8) -> Vec<DataPoint> {
        let rect = CellRect::from_cell(pos.detail, pos.x, pos.z);
        let center = rect.center();
        let samples = [
            self.height_at(rect.min.x, rect.min.y),
            self.height_at(rect.max.x, rect.min.y),
            self.height_at(rect.min.x, rect.max.y),
            self.height_at(rect.max.x, rect.max.y),
            self.height_at(center.x, center.y),
        ];
        let top = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bottom = samples.iter().copied().fold(f64::INFINITY, f64::min);

        let to_vertical = |y: f64| (y.round() as i32 - min_y).clamp(0, MAX_VERTICAL as i32) as u16;
        let height = to_vertical(top.max(self.sea_level)) + 1;
        let depth = to_vertical(bottom.min(self.sea_level) - 4.0);

        let color = if top < self.sea_level {
            pack_argb(255, 40, 70, 160)
        } else if top > self.height_scale * 0.75 {
            pack_argb(255, 130, 130, 125)
        } else {
            pack_argb(255, 70, 140, 50)
        };
        vec![DataPoint::new(height.min(MAX_VERTICAL), depth, color, 15, 0, mode)]
    }
}

fn main() {
    lodtree::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let seed = parse_arg::<u32>(&args, "--seed").unwrap_or(12345);
    let out = parse_arg::<String>(&args, "--out").unwrap_or_else(|| "lod_data".to_string());
    let chunks = parse_arg::<u32>(&args, "--chunks").unwrap_or(32);
    let scale = parse_arg::<f64>(&args, "--scale").unwrap_or(150.0);
    let height_scale = parse_arg::<f64>(&args, "--height").unwrap_or(80.0);
    let rounds = parse_arg::<usize>(&args, "--rounds").unwrap_or(64);
    let batch = parse_arg::<usize>(&args, "--batch");
    let jobs = parse_arg::<usize>(&args, "--jobs").unwrap_or(4);

    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
        .expect("Failed to configure thread pool");

    let output_dir = PathBuf::from(out);
    let defaults = LodConfig::default();
    let config = LodConfig {
        render_distance_chunks: chunks,
        max_generation_requests: batch.unwrap_or(defaults.max_generation_requests),
        save_dir: output_dir.clone(),
        ..defaults
    };
    config
        .save_sync(&output_dir.join("config.json"))
        .expect("Failed to write config");

    println!("=== LOD Region Generator ===");
    println!("Seed:   {}", seed);
    println!("Range:  {} chunks", chunks);
    println!("Output: {}", output_dir.display());
    println!();

    let store = Arc::new(RegionFileStore::new(&output_dir));
    let dimension = Dimension::new(config.clone(), store).expect("Failed to create dimension");
    let terrain = Terrain::new(seed, scale, height_scale);
    let player = DVec2::ZERO;
    dimension.update_player(player);

    let start = Instant::now();
    let written = AtomicUsize::new(0);
    for round in 0..rounds {
        dimension.cut_regions(player);
        dimension.expand_or_load_regions(player);

        let positions = dimension.positions_to_generate(
            player,
            config.max_generation_requests,
            config.generation_mode,
            config.generation_priority,
        );
        if positions.is_empty() {
            log::info!("Nothing left to generate after {} rounds", round);
            break;
        }

        let batch: Vec<GenPos> = positions.iter().copied().collect();
        batch.par_iter().for_each(|pos| {
            let column = terrain.column(pos, config.world_min_y, config.generation_mode.complexity());
            if dimension.write_column(pos.detail, pos.x, pos.z, &column, false) {
                written.fetch_add(1, Ordering::Relaxed);
            }
        });

        let saved = dimension.save_dirty(true);
        eprintln!(
            "  [round {}] {} positions, {} regions saved, {:.1} MB loaded",
            round + 1,
            batch.len(),
            saved,
            dimension.loaded_bytes() as f64 / (1024.0 * 1024.0)
        );
    }

    let drained = dimension.shutdown(Duration::from_secs(30));
    if !drained {
        log::warn!("Maintenance work still pending at exit");
    }

    println!();
    println!("=== Generation Complete ===");
    println!(
        "Columns: {} written in {:.1}s",
        written.load(Ordering::Relaxed),
        start.elapsed().as_secs_f64()
    );
    println!("Regions: {}", dimension.region_count());
    println!("Output:  {}", output_dir.display());
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
