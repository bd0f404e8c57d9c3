use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use steam_warehouse::util::env;

#[derive(Parser, Debug)]
#[command(name = "warehouse", version, about = "Steam games data warehouse admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Normalize a raw catalog export and write it as JSON or CSV
    Clean {
        /// Raw export (e.g. dataset/games.json)
        #[arg(long)]
        input: PathBuf,
        /// Output file; extension selects the format (.json or .csv)
        #[arg(long, default_value = "cleaned_games.json")]
        output: PathBuf,
    },
    /// Load a cleaned JSON file into the star schema
    Load {
        /// Cleaned JSON written by `clean`
        #[arg(long, default_value = "cleaned_games.json")]
        input: PathBuf,
        /// Optional override for the warehouse file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Drop and recreate the star schema before loading
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
    /// Normalize a raw export and load it in one pass
    Etl {
        #[arg(long)]
        input: PathBuf,
        /// Optional override for the warehouse file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Drop and recreate the star schema before loading
        #[arg(long, default_value_t = false)]
        reset: bool,
        /// Also write the normalized batch here (.json or .csv)
        #[arg(long)]
        cleaned_out: Option<PathBuf>,
    },
    /// Print row counts for the star-schema tables
    Counts {
        /// Optional override for the warehouse file
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Time the dashboard queries and write a plain-text report
    Bench {
        /// Optional override for the warehouse file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Repetitions per query (defaults to env BENCH_RUNS or 3)
        #[arg(long)]
        runs: Option<usize>,
        #[arg(long, default_value = "test_results.txt")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env::init_env();
    steam_warehouse::tracing::init_tracing("info")?;
    env::preflight_check(
        "warehouse",
        &[],
        &["WAREHOUSE_DB", "DATABASE_URL", "FAST_INGEST", "BENCH_RUNS"],
    )?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean { input, output } => {
            use steam_warehouse::cli::clean::{run, CleanConfig};
            run(CleanConfig { input, output })?;
        }
        Commands::Load { input, db, reset } => {
            use steam_warehouse::cli::load::{run, LoadConfig};
            run(LoadConfig { input, db, reset })?;
        }
        Commands::Etl {
            input,
            db,
            reset,
            cleaned_out,
        } => {
            use steam_warehouse::cli::etl::{run, EtlConfig};
            run(EtlConfig {
                input,
                db,
                reset,
                cleaned_out,
            })?;
        }
        Commands::Counts { db } => {
            use steam_warehouse::cli::counts::{run, CountsConfig};
            run(CountsConfig { db })?;
        }
        Commands::Bench { db, runs, output } => {
            use steam_warehouse::cli::bench::{run, BenchConfig};
            run(BenchConfig { db, runs, output })?;
        }
    }

    info!("done");
    Ok(())
}
