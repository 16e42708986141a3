use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use voxlog_edit::{MergeReport, World};
use voxlog_gen::{ContentProducer, FlatHeight, Floor, Rocks, Trees, populate};
use voxlog_record::{BlockType, ChunkPos, Compression, WorldLayout, WorldPos};
use voxlog_storage::{ChunkLog, StoreConfig};

#[derive(Parser)]
#[command(name = "voxlog", about = "Chunk log store for large voxel worlds with single-pass edit merging")]
pub struct Args {
    /// Directory holding world.region and world.json
    #[arg(short, long, env = "VOXLOG_DIR", default_value = "save")]
    pub dir: PathBuf,

    /// Record compression: "zlib" or "none"
    #[arg(long, env = "VOXLOG_COMPRESSION", default_value = "zlib")]
    pub compression: String,

    /// Print the benchmark report when done
    #[arg(long)]
    pub report: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a blank world
    Generate {
        #[arg(long, default_value = "16")]
        chunk_size: u32,
        /// World dimensions in chunks
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], default_values_t = [20, 5, 20])]
        dim: Vec<u32>,
        /// Wipe an existing world first
        #[arg(long)]
        force: bool,
    },
    /// Run content producers, one merge pass each
    Populate {
        #[arg(long, default_value = "0")]
        floor_y: i64,
        #[arg(long, default_value = "1000")]
        rocks: usize,
        #[arg(long, default_value = "100")]
        trees: usize,
        #[arg(short, long, default_value = "0")]
        seed: u64,
    },
    /// Apply edits from a JSON file: [{"pos": [x, y, z], "block": n}, ...]
    Apply { file: PathBuf },
    /// Show world metadata, or one chunk
    Inspect {
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        chunk: Option<Vec<i32>>,
    },
    /// Check record order, sizes and count
    Verify,
}

#[derive(Deserialize)]
struct EditEntry {
    pos: [i64; 3],
    block: BlockType,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = StoreConfig {
        compression: args.compression.parse::<Compression>()?,
        ..StoreConfig::new(&args.dir)
    };

    match args.command {
        Command::Generate { chunk_size, dim, force } => {
            let layout = WorldLayout::cubic(chunk_size, [dim[0], dim[1], dim[2]])?;
            if force {
                ChunkLog::wipe(&config)?;
            }
            println!(
                "Generating {} chunks ({:?} x {}^3) in {}...",
                layout.chunk_count(),
                layout.dim(),
                chunk_size,
                config.dir.display()
            );
            let world = World::create(config, layout)?;
            println!("Done.");
            finish(&world, args.report);
        }
        Command::Populate { floor_y, rocks, trees, seed } => {
            let mut world = World::open(config)?;
            let floor = Floor { y: floor_y, block: BlockType::GRASS };
            let rocks = Rocks {
                count: rocks,
                seed,
                block: BlockType::STONE,
                height: FlatHeight(floor_y + 1),
            };
            let trees = Trees {
                count: trees,
                seed: seed.wrapping_add(1),
                height: FlatHeight(floor_y + 1),
            };
            let producers: [&dyn ContentProducer; 3] = [&floor, &rocks, &trees];
            for outcome in populate(&mut world, &producers) {
                println!(
                    "{:>6}: {} edits {}",
                    outcome.producer,
                    outcome.accepted,
                    if outcome.committed { "committed" } else { "not committed" }
                );
            }
            finish(&world, args.report);
        }
        Command::Apply { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let entries: Vec<EditEntry> = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", file.display()))?;

            let mut world = World::open(config)?;
            match apply_edits(&mut world, &entries)? {
                Some(report) => println!(
                    "Applied {} edits to {} chunks in {:.2?}",
                    report.edits_applied, report.records_modified, report.elapsed
                ),
                None => println!("Nothing to apply"),
            }
            finish(&world, args.report);
        }
        Command::Inspect { chunk } => {
            let log = ChunkLog::open(config)?;
            match chunk {
                None => {
                    let meta = log.meta();
                    println!("{}", serde_json::to_string_pretty(meta)?);
                }
                Some(c) => {
                    let pos = ChunkPos::new(c[0], c[1], c[2]);
                    let Some(record) = log.find(pos)? else {
                        bail!("chunk {} not in store", pos);
                    };
                    println!("chunk {}", record.pos);
                    println!("  size:   {:?}", record.size());
                    println!("  biome:  {:?}", record.biome);
                    println!("  blocks: {} non-air", record.non_air_count());
                }
            }
        }
        Command::Verify => {
            let log = ChunkLog::open(config)?;
            let report = log.verify()?;
            println!(
                "{} of {} records, {} with content",
                report.records, report.expected, report.modified
            );
            if !report.is_ok() {
                for problem in &report.problems {
                    println!("  - {}", problem);
                }
                return Ok(ExitCode::FAILURE);
            }
            println!("OK");
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Buffer `entries` and run one merge pass. `None` when no edit was in bounds.
fn apply_edits(world: &mut World, entries: &[EditEntry]) -> Result<Option<MergeReport>> {
    let mut rejected = 0;
    for entry in entries {
        if !world.add_edit(WorldPos::from(entry.pos), entry.block) {
            rejected += 1;
        }
    }
    if rejected > 0 {
        println!("Skipped {} out-of-bounds edits", rejected);
    }
    match world.try_evaluate() {
        Ok(report) => Ok(Some(report)),
        Err(e) if e.is_noop() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn finish(world: &World, report: bool) {
    if report {
        println!("\n{}", world.metrics().generate_report());
    }
}
