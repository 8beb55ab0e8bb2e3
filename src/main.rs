use clap::Parser;
use human_panic::setup_panic;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use std::{
    fs,
    panic::resume_unwind,
    path::Path,
    process::ExitCode,
    sync::Arc,
    time::{Duration, Instant},
};

use stellaris_stat_viewer::{
    loader::{GalaxySlot, LoadError, LoadSource, Loader},
    save_file::{
        parser::{format_date, types::CancellationToken},
        Galaxy, LoadOptions,
    },
    views::{
        economy_rows, fleets_rows, military_rows, overview_rows, research_rows,
        strategic_resources_rows, technologies_rows,
    },
};

/// A submodule for the command line arguments.
mod args;
use args::{Args, View};

/// A submodule that prints and exports the tables.
mod display;
use display::{write_csv, Table, TableRow};

/// Exit code for unusable arguments and unreadable files
const FILE_ERROR: u8 = 1;
const PARSE_ERROR: u8 = 2;
const GALAXY_ERROR: u8 = 3;
const CANCELLED: u8 = 4;

fn exit_code(err: &LoadError) -> u8 {
    match err {
        LoadError::File(_) => FILE_ERROR,
        LoadError::Parse { .. } => PARSE_ERROR,
        LoadError::GalaxyCreation(_) => GALAXY_ERROR,
        LoadError::Cancelled => CANCELLED,
    }
}

/// Logs to stderr. `RUST_LOG` takes precedence over the verbosity flag.
fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints a table and exports it, if a CSV directory was given.
fn show<R: TableRow>(
    title: &str,
    file: &str,
    rows: &[R],
    csv: Option<&Path>,
) -> Result<(), csv::Error> {
    println!("{}", Table::new(title, rows));
    if let Some(dir) = csv {
        let path = dir.join(file);
        write_csv(&path, rows)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

fn show_all(galaxy: &Galaxy, args: &Args) -> Result<(), csv::Error> {
    let csv = args.csv.as_deref();
    if args.view.shows(View::Overview) {
        show("Overview", "overview.csv", &overview_rows(galaxy), csv)?;
    }
    if args.view.shows(View::Economy) {
        show("Economy", "economy.csv", &economy_rows(galaxy), csv)?;
    }
    if args.view.shows(View::StrategicResources) {
        let rows = strategic_resources_rows(galaxy);
        show("Strategic Resources", "strategic_resources.csv", &rows, csv)?;
    }
    if args.view.shows(View::Research) {
        show("Research", "research.csv", &research_rows(galaxy), csv)?;
    }
    if args.view.shows(View::Technologies) {
        show("Technologies", "technologies.csv", &technologies_rows(galaxy), csv)?;
    }
    if args.view.shows(View::Fleets) {
        show("Fleets", "fleets.csv", &fleets_rows(galaxy), csv)?;
    }
    if args.view.shows(View::Military) {
        let rows = military_rows(galaxy, args.include_stations);
        show("Military", "military.csv", &rows, csv)?;
    }
    Ok(())
}

/// Main function. This is the entry point of the program.
///
/// # Process
///
/// 1. Parses the arguments, a usage error exits with 1
/// 2. Loads the galaxy on a worker thread, showing each stage on a spinner
/// 3. Prints the requested tables, exporting them to CSV if asked to
/// 4. Dumps the galaxy to JSON if asked to
///
/// A failed load exits with 1 for file errors, 2 for parse errors,
/// 3 for galaxy creation errors and 4 if the load was cancelled.
fn main() -> ExitCode {
    setup_panic!();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(FILE_ERROR)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    setup_logging(args.verbose);
    let start = Instant::now();
    let loader = Loader::new(LoadOptions {
        encoding: args.encoding.into(),
    });
    let slot = Arc::new(GalaxySlot::new());
    let (stages, handle) = slot.spawn_load(
        loader,
        LoadSource::Path(args.filename.clone()),
        CancellationToken::new(),
    );
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("[{elapsed_precise}] {spinner} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    for stage in stages {
        spinner.set_message(stage.to_string());
    }
    let galaxy = match handle.join() {
        Ok(Ok(galaxy)) => galaxy,
        Ok(Err(err)) => {
            spinner.abandon_with_message(err.title());
            eprintln!("{}: {}", err.title(), err);
            return ExitCode::from(exit_code(&err));
        }
        Err(panic) => resume_unwind(panic),
    };
    spinner.finish_with_message(format!(
        "Galaxy loaded in {:.2}s",
        start.elapsed().as_secs_f64()
    ));
    if let Some(name) = galaxy.get_name() {
        print!("{}", name);
        if let Some(date) = galaxy.get_date() {
            print!(", {}", format_date(date));
        }
        if let Some(version) = galaxy.get_version() {
            print!(" ({})", version);
        }
        println!("\n");
    }
    if let Err(err) = show_all(&galaxy, &args) {
        eprintln!("CSV Error: {}", err);
        return ExitCode::from(FILE_ERROR);
    }
    if let Some(dump) = &args.dump {
        let written = serde_json::to_string_pretty(galaxy.as_ref())
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(dump, json).map_err(|e| e.to_string()));
        if let Err(err) = written {
            eprintln!("Dump Error: {}", err);
            return ExitCode::from(FILE_ERROR);
        }
        info!("dumped the galaxy to {}", dump.display());
    }
    ExitCode::SUCCESS
}
