//! Command-line probe for the pantry core.
//!
//! # Responsibility
//! - Verify `pantry_core` linkage without the Flutter runtime.
//! - Offer parser, conversion and search checks against a database file.

use clap::{Parser, Subcommand};
use pantry_core::repo::ingredient_repo::SqliteIngredientRepository;
use pantry_core::repo::measure_repo::{MeasureRepository, SqliteMeasureRepository};
use pantry_core::service::catalog_service::CatalogService;
use pantry_core::{convert_by_label, open_db, parse_quantity, search_all, CoreConfig, SearchQuery};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "pantry", version, about = "Pantry core command-line probe")]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, env = "PANTRY_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints `pong`.
    Ping,
    /// Prints the core version.
    Version,
    /// Parses free text such as `20kg potatoes`.
    Parse { text: String },
    /// Converts an amount between two measures.
    Convert { amount: f64, from: String, to: String },
    /// Adds a measure.
    AddMeasure { name: String, abbreviation: String },
    /// Stores a conversion rate between two measure labels.
    SetRate {
        from: String,
        to: String,
        rate: f64,
        /// Also store the reciprocal rate.
        #[arg(long)]
        inverse: bool,
    },
    /// Keyword search over recipes and ingredients.
    Search {
        text: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let db_path = cli.db.unwrap_or_else(|| CoreConfig::from_env().db_path);
    match cli.command {
        Command::Ping => println!("pantry_core ping={}", pantry_core::ping()),
        Command::Version => println!("pantry_core version={}", pantry_core::core_version()),
        Command::Parse { text } => {
            let parsed = parse_quantity(&text).map_err(|err| err.to_string())?;
            println!(
                "quantity={} unit={} name={}",
                parsed.quantity, parsed.unit, parsed.name
            );
        }
        Command::Convert { amount, from, to } => {
            let conn = open_db(&db_path).map_err(|err| err.to_string())?;
            let measures = SqliteMeasureRepository::try_new(&conn).map_err(|err| err.to_string())?;
            let (converted, measure) =
                convert_by_label(&measures, amount, &from, &to).map_err(|err| err.to_string())?;
            println!("{converted} {}", measure.abbreviation);
        }
        Command::AddMeasure { name, abbreviation } => {
            let conn = open_db(&db_path).map_err(|err| err.to_string())?;
            let catalog = CatalogService::new(
                SqliteIngredientRepository::try_new(&conn).map_err(|err| err.to_string())?,
                SqliteMeasureRepository::try_new(&conn).map_err(|err| err.to_string())?,
            );
            let measure = catalog
                .create_measure(&name, &abbreviation)
                .map_err(|err| err.to_string())?;
            println!("{} {} ({})", measure.id, measure.name, measure.abbreviation);
        }
        Command::SetRate {
            from,
            to,
            rate,
            inverse,
        } => {
            let conn = open_db(&db_path).map_err(|err| err.to_string())?;
            let measures = SqliteMeasureRepository::try_new(&conn).map_err(|err| err.to_string())?;
            let lookup = |label: &str| {
                measures
                    .find_measure_by_label(label)
                    .map_err(|err| err.to_string())?
                    .ok_or_else(|| format!("unknown measure: `{label}`"))
            };
            let from = lookup(&from)?;
            let to = lookup(&to)?;
            let catalog = CatalogService::new(
                SqliteIngredientRepository::try_new(&conn).map_err(|err| err.to_string())?,
                measures,
            );
            catalog
                .set_conversion(from.id, to.id, rate, inverse)
                .map_err(|err| err.to_string())?;
            println!("1 {} = {rate} {}", from.abbreviation, to.abbreviation);
        }
        Command::Search { text, limit } => {
            let conn = open_db(&db_path).map_err(|err| err.to_string())?;
            let query = SearchQuery {
                limit,
                ..SearchQuery::new(text)
            };
            for hit in search_all(&conn, &query).map_err(|err| err.to_string())? {
                println!("{} {} {}", hit.kind.as_str(), hit.id, hit.name);
            }
        }
    }
    Ok(())
}
