//! Resolved run configuration.

use std::path::PathBuf;

use anyhow::Result;

use crate::{
    cli::{OutputFormat, SourceArgs},
    io_utils,
    loader::LoadOptions,
};

/// Where the report reads from when `--input` is not given.
pub const DEFAULT_SOURCE: &str = "data/reporte_ventas_final.csv";

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub source: PathBuf,
    pub load: LoadOptions,
    pub format: OutputFormat,
}

impl ReportConfig {
    pub fn from_args(args: &SourceArgs) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
        let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
        Ok(Self {
            source: args.input.clone(),
            load: LoadOptions {
                delimiter,
                encoding,
            },
            format: args.format,
        })
    }
}
