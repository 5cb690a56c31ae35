use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_perf_report::analysis::analyze_records;
use api_perf_report::config::Config;
use api_perf_report::db::{self, Database, MongoStore, RecordStore};
use api_perf_report::pipeline::{self, RunOptions};
use api_perf_report::report;

#[derive(Parser)]
#[command(name = "perf-report")]
#[command(about = "Enrichment API performance report: CSV export and email delivery")]
struct Cli {
    /// Where call records are read from
    #[arg(long, value_enum, default_value_t = StoreKind::Mongo, global = true)]
    store: StoreKind,

    /// SQLite database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Size of the reporting window in hours (overrides REPORT_WINDOW_HOURS)
    #[arg(long, global = true)]
    hours: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Mongo,
    Sqlite,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the window, write the CSV report and email it
    Run {
        /// Directory for the CSV file (overrides REPORT_OUTPUT_DIR)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write the CSV but do not send email
        #[arg(long)]
        no_email: bool,

        /// Also print the report to stdout
        #[arg(long)]
        print: bool,
    },
    /// Print the report for the window without writing or sending anything
    Report,
    /// List records in the window whose phone number is still not found
    NotFound,
    /// Load a JSON array of call records into the SQLite store
    Import {
        /// JSON file to import
        file: PathBuf,
    },
}

/// Initialize tracing with output to stderr (when stdout carries the report) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "api_perf_report=info,perf_report=info".into()),
    );

    if use_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = matches!(
        cli.command,
        Some(Commands::Report | Commands::NotFound | Commands::Run { print: true, .. })
    );
    init_tracing(use_stderr);

    let config = Config::from_env()?;
    let window_hours = cli.hours.unwrap_or(config.report.window_hours);
    if window_hours == 0 {
        anyhow::bail!("--hours must be greater than zero");
    }

    match &cli.command {
        Some(Commands::Import { file }) => {
            let db = open_sqlite(cli.db_path.as_deref())?;
            import_records(&db, file)?;
        }
        Some(Commands::Report) => {
            let store = open_store(&cli, &config).await?;
            let records = pipeline::fetch_window(&store, window_hours).await?;
            report::print_report(&analyze_records(&records), window_hours);
        }
        Some(Commands::NotFound) => {
            let store = open_store(&cli, &config).await?;
            let cutoff = db::window_start(Utc::now(), window_hours)?;
            let records = store.fetch_not_found(cutoff).await?;
            tracing::info!("{} record(s) with phone still not found", records.len());
            print!("{}", report::render_not_found(&records));
        }
        Some(Commands::Run {
            out,
            no_email,
            print,
        }) => {
            let store = open_store(&cli, &config).await?;
            let options = RunOptions {
                window_hours,
                out_dir: out
                    .clone()
                    .unwrap_or_else(|| config.report.output_dir.clone()),
                send_email: !*no_email,
                print: *print,
            };
            pipeline::run_report(&store, &config.smtp, &options).await?;
        }
        None => {
            let store = open_store(&cli, &config).await?;
            let options = RunOptions {
                window_hours,
                out_dir: config.report.output_dir.clone(),
                send_email: true,
                print: false,
            };
            pipeline::run_report(&store, &config.smtp, &options).await?;
        }
    }

    Ok(())
}

async fn open_store(cli: &Cli, config: &Config) -> anyhow::Result<RecordStore> {
    let store = match cli.store {
        StoreKind::Mongo => {
            let mongo = config.mongo.clone()?;
            RecordStore::Mongo(MongoStore::connect(&mongo).await?)
        }
        StoreKind::Sqlite => RecordStore::Sqlite(open_sqlite(cli.db_path.as_deref())?),
    };
    tracing::debug!("Using {} record store", store.backend());
    Ok(store)
}

fn open_sqlite(path: Option<&Path>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path.to_path_buf())?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn import_records(db: &Database, file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let count = db.import_json(&content)?;
    tracing::info!("Imported {} record(s) from {}", count, file.display());
    Ok(())
}
