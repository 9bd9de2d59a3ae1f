pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod io_utils;
pub mod loader;
pub mod schema;
pub mod table;
pub mod views;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cache::SnapshotCache,
    cli::{Cli, Commands, OutputFormat},
    config::ReportConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_report", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = ReportConfig::from_args(&cli.source)?;
    debug!("Resolved configuration: {config:?}");

    let mut cache = SnapshotCache::new();
    let table = cache
        .get_or_load(&config.source, &config.load)
        .context("data unavailable")?;

    let page = match &cli.command {
        Commands::Overview(args) => views::overview(&table, args.rows)?,
        Commands::Sales => views::sales(&table)?,
        Commands::Products(args) => views::products(&table, args.top)?,
        Commands::Group(args) => {
            views::group(&table, &args.by, &args.measure, args.top, args.sort)?
        }
    };

    match config.format {
        OutputFormat::Table => print!("{}", page.render_text()),
        OutputFormat::Json => println!("{}", page.render_json()?),
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
