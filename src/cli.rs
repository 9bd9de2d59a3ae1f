use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_SOURCE;

#[derive(Debug, Parser)]
#[command(author, version, about = "Sales report over a cleaned transactions CSV", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Key metrics, cleaning summary, and the cleaned rows
    Overview(OverviewArgs),
    /// Net revenue over time, by category, and by city
    Sales,
    /// Top products by revenue and by units, and revenue by manufacturer
    Products(ProductsArgs),
    /// Sum any numeric column grouped by any column
    Group(GroupArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Sales CSV to report on
    #[arg(short = 'i', long = "input", global = true, default_value = DEFAULT_SOURCE)]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, global = true, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding", global = true)]
    pub input_encoding: Option<String>,
    /// Output style
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct OverviewArgs {
    /// Show at most this many cleaned rows (all rows if omitted)
    #[arg(long)]
    pub rows: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ProductsArgs {
    /// Number of products in each ranking
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    /// Column to group by (any column, or `month_year`)
    #[arg(long = "by")]
    pub by: String,
    /// Numeric column to sum
    #[arg(long, default_value = "ingreso_neto_item")]
    pub measure: String,
    /// Keep only the largest N groups (implies --sort)
    #[arg(long)]
    pub top: Option<usize>,
    /// Order groups by the summed value, largest first
    #[arg(long)]
    pub sort: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
