//! MMA feature synthesis CLI
//!
//! Imports raw bout exports and builds point-in-time matchup features.

use clap::{Parser, Subcommand};
use mma::{Config, Result};

#[derive(Parser)]
#[command(name = "mma")]
#[command(about = "Point-in-time feature synthesis for MMA bout prediction", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Feature table commands
    Features {
        #[command(subcommand)]
        action: FeatureCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import the raw CSV exports
    Import {
        /// Directory containing the exports (defaults to data.raw_dir)
        #[arg(long)]
        dir: Option<String>,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum FeatureCommands {
    /// Build the training table, two rows per historical bout
    Build {
        /// Output CSV path (defaults to data.features_path)
        #[arg(long)]
        output: Option<String>,
        /// Only include bouts on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Disable parallel assembly
        #[arg(long)]
        sequential: bool,
    },
    /// Build the feature row for a hypothetical pairing
    Matchup {
        /// Fighter name
        fighter: String,
        /// Opponent name
        opponent: String,
        /// As-of date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { dir } => commands::data_import(&config, dir),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features { action } => match action {
            FeatureCommands::Build {
                output,
                since,
                sequential,
            } => commands::features_build(&config, output, since, sequential),
            FeatureCommands::Matchup {
                fighter,
                opponent,
                date,
                format,
            } => commands::features_matchup(&config, &fighter, &opponent, date, format),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use mma::data::{import_dir, Database};
    use mma::features::{write_csv, write_csv_file, FeatureAssembler};
    use mma::predict::MatchupPredictor;
    use mma::MmaError;
    use std::path::Path;

    fn parse_date_arg(s: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| MmaError::Parse(format!("Invalid date '{}': {}", s, e)))
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.raw_dir)?;
        println!("Created {}/", config.data.raw_dir);

        println!("\nNext steps:");
        println!("  1. Copy the raw CSV exports into {}", config.data.raw_dir);
        println!("  2. Run 'mma data import' to load them");
        println!("  3. Run 'mma features build' to write the training table");
        println!("  4. Run 'mma features matchup \"Fighter A\" \"Fighter B\"' for a single pairing");

        Ok(())
    }

    pub fn data_import(config: &Config, dir: Option<String>) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let dir = dir.unwrap_or_else(|| config.data.raw_dir.clone());

        println!("Importing exports from {}...", dir);
        let summary = import_dir(&db, Path::new(&dir))?;

        println!("  Fighters:      {}", summary.fighters);
        println!("  Events:        {}", summary.events);
        println!("  Bouts:         {}", summary.bouts);
        println!("  Measurements:  {}", summary.measurements);
        println!(
            "  Skipped:       {} results, {} stat rows",
            summary.skipped_results, summary.skipped_stats
        );

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:          {}", config.data.database_path);
        println!("  Fighters:      {}", stats.competitor_count);
        println!("  Bouts:         {}", stats.bout_count);
        println!("  Measurements:  {}", stats.measurement_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_bout, stats.latest_bout) {
            println!("  Range:         {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn features_build(
        config: &Config,
        output: Option<String>,
        since: Option<String>,
        sequential: bool,
    ) -> Result<()> {
        let since = match since {
            Some(s) => Some(parse_date_arg(&s)?),
            None => config.assembly.since,
        };
        let output = output.unwrap_or_else(|| config.data.features_path.clone());

        let db = Database::open(&config.data.database_path)?;
        let index = db.load_index()?;

        let rows = FeatureAssembler::new(&index)
            .parallel(config.assembly.parallel && !sequential)
            .since(since)
            .training_rows()?;

        write_csv_file(&rows, Path::new(&output))?;
        println!("Wrote {} rows to {}", rows.len(), output);

        Ok(())
    }

    pub fn features_matchup(
        config: &Config,
        fighter: &str,
        opponent: &str,
        date: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let date = match date {
            Some(s) => parse_date_arg(&s)?,
            None => Utc::now().date_naive(),
        };

        let db = Database::open(&config.data.database_path)?;
        let matchup = MatchupPredictor::new(&db).predict(fighter, opponent, date)?;

        match format {
            OutputFormat::Table => {
                println!(
                    "{} vs {} (history before {})",
                    matchup.fighter.name, matchup.opponent.name, date
                );
                println!("───────────────────────────────────────────────────────────");
                println!(
                    "  {:<40} {:>10} {:>10}",
                    "feature", "fighter", "opponent"
                );
                for (name, own, theirs) in matchup.highlights() {
                    println!("  {:<40} {:>10.3} {:>10.3}", name, own, theirs);
                }
                println!("\n  {} features in total", matchup.row.features.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&matchup)?);
            }
            OutputFormat::Csv => {
                write_csv(std::slice::from_ref(&matchup.row), std::io::stdout().lock())?;
            }
        }

        Ok(())
    }
}
