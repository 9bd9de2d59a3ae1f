//! Builds the cleaned sales table from a delimited source.
//!
//! Cleaning runs as a fixed sequence of whole-table passes:
//!
//! 1. read every row under a header row;
//! 2. trim header names;
//! 3. trim free-text cells (blank becomes missing);
//! 4. parse `order_date`, then forward-fill missing dates in source order;
//! 5. parse `quantity`, `unit_price_cop` and `ingreso_neto_item` leniently;
//! 6. drop rows without `ingreso_neto_item`;
//! 7. zero-fill missing quantities and require whole, non-negative counts.
//!
//! Unparseable cells become missing values and never fail the load. Missing
//! files, missing columns, malformed CSV structure and fractional quantities
//! do.

use std::{io::Read, path::Path};

use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, trace};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;

use crate::{
    data::{SalesRecord, clean_text, forward_fill, parse_decimal, parse_naive_date},
    error::{ReportError, Result},
    io_utils,
    schema::{ColumnLayout, SalesColumn, normalize_header},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
        }
    }
}

/// Counts of what cleaning did to the source, for display next to the data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_read: usize,
    pub unparsed_dates: usize,
    pub filled_dates: usize,
    pub undated_rows: usize,
    pub dropped_missing_revenue: usize,
    pub zero_filled_quantities: usize,
    pub unparsed_unit_prices: usize,
}

impl CleaningReport {
    pub fn rows_kept(&self) -> usize {
        self.rows_read - self.dropped_missing_revenue
    }
}

/// The cleaned, read-only table every view aggregates over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesTable {
    extra_columns: Vec<String>,
    records: Vec<SalesRecord>,
    report: CleaningReport,
}

impl SalesTable {
    /// Wraps records that are already clean. Each record's `extra` must line up
    /// with `extra_columns`.
    pub fn from_records(extra_columns: Vec<String>, records: Vec<SalesRecord>) -> Self {
        let report = CleaningReport {
            rows_read: records.len(),
            ..CleaningReport::default()
        };
        Self {
            extra_columns,
            records,
            report,
        }
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn extra_columns(&self) -> &[String] {
        &self.extra_columns
    }

    pub fn extra_index(&self, name: &str) -> Option<usize> {
        self.extra_columns.iter().position(|column| column == name)
    }

    pub fn report(&self) -> &CleaningReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header row for a full-table listing: required columns, then extras.
    pub fn headers(&self) -> Vec<String> {
        SalesColumn::ALL
            .iter()
            .map(|column| column.name().to_string())
            .chain(self.extra_columns.iter().cloned())
            .collect()
    }
}

struct StagedRow {
    line: usize,
    order_id: Option<String>,
    order_date: Option<NaiveDate>,
    product_name: Option<String>,
    category: Option<String>,
    manufacturer: Option<String>,
    ciudad_cliente: Option<String>,
    quantity: Option<Decimal>,
    unit_price_cop: Option<Decimal>,
    ingreso_neto_item: Option<Decimal>,
    extra: Vec<Option<String>>,
}

pub fn load(path: &Path, options: &LoadOptions) -> Result<SalesTable> {
    info!(
        "Loading sales from '{}' with delimiter '{}' ({})",
        path.display(),
        crate::printable_delimiter(options.delimiter),
        options.encoding.name()
    );
    let reader = io_utils::open_csv_reader_from_path(path, options.delimiter)?;
    let table = clean(reader, options.encoding)?;
    info!(
        "Loaded {} row(s) from {:?}; kept {}, dropped {} without net revenue",
        table.report.rows_read,
        path,
        table.report.rows_kept(),
        table.report.dropped_missing_revenue
    );
    Ok(table)
}

pub fn load_from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<SalesTable> {
    clean(
        io_utils::open_csv_reader(reader, options.delimiter),
        options.encoding,
    )
}

fn clean<R: Read>(mut reader: csv::Reader<R>, encoding: &'static Encoding) -> Result<SalesTable> {
    let headers = io_utils::reader_headers(&mut reader, encoding)?
        .iter()
        .map(|name| normalize_header(name))
        .collect::<Vec<_>>();
    let layout = ColumnLayout::resolve(&headers)?;
    debug!("Resolved column layout: {layout:?}");

    let mut report = CleaningReport::default();
    let mut staged = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let line = row_idx + 2;
        let record = record?;
        let cells = io_utils::decode_record(&record, encoding, line)?;
        staged.push(stage_row(&layout, &cells, line, &mut report));
    }
    report.rows_read = staged.len();

    let mut dates = staged.iter().map(|row| row.order_date).collect::<Vec<_>>();
    report.filled_dates = forward_fill(&mut dates);
    for (row, date) in staged.iter_mut().zip(dates) {
        row.order_date = date;
    }

    let kept = staged
        .into_iter()
        .filter_map(|row| match row.ingreso_neto_item {
            Some(revenue) => Some((row, revenue)),
            None => {
                trace!("Dropping row {} without net revenue", row.line);
                None
            }
        })
        .collect::<Vec<_>>();
    report.dropped_missing_revenue = report.rows_read - kept.len();
    report.undated_rows = kept.iter().filter(|(row, _)| row.order_date.is_none()).count();

    let mut records = Vec::with_capacity(kept.len());
    for (row, ingreso_neto_item) in kept {
        let quantity = match row.quantity {
            Some(value) => whole_quantity(value, row.line)?,
            None => {
                report.zero_filled_quantities += 1;
                0
            }
        };
        records.push(SalesRecord {
            order_id: row.order_id,
            order_date: row.order_date,
            product_name: row.product_name,
            category: row.category,
            manufacturer: row.manufacturer,
            ciudad_cliente: row.ciudad_cliente,
            quantity,
            unit_price_cop: row.unit_price_cop,
            ingreso_neto_item,
            extra: row.extra,
        });
    }

    debug!(
        "Cleaning summary: {} unparsed date(s), {} forward-filled, {} undated, {} zero-filled quantit(ies), {} unparsed unit price(s)",
        report.unparsed_dates,
        report.filled_dates,
        report.undated_rows,
        report.zero_filled_quantities,
        report.unparsed_unit_prices
    );

    Ok(SalesTable {
        extra_columns: layout.extra_names(),
        records,
        report,
    })
}

fn stage_row(
    layout: &ColumnLayout,
    cells: &[String],
    line: usize,
    report: &mut CleaningReport,
) -> StagedRow {
    let cell = |column: SalesColumn| {
        cells
            .get(layout.index_of(column))
            .map(String::as_str)
            .unwrap_or("")
    };
    let text = |column: SalesColumn| clean_text(cell(column));
    let number = |column: SalesColumn| match parse_decimal(cell(column), column.name()) {
        Ok(value) => Some(value),
        Err(err) => {
            trace!("Row {line}: {err}");
            None
        }
    };

    let order_date = match parse_naive_date(cell(SalesColumn::OrderDate)) {
        Ok(date) => Some(date),
        Err(err) => {
            trace!("Row {line}: {err}");
            report.unparsed_dates += 1;
            None
        }
    };
    let unit_price_cop = number(SalesColumn::UnitPriceCop);
    if unit_price_cop.is_none() {
        report.unparsed_unit_prices += 1;
    }

    StagedRow {
        line,
        order_id: text(SalesColumn::OrderId),
        order_date,
        product_name: text(SalesColumn::ProductName),
        category: text(SalesColumn::Category),
        manufacturer: text(SalesColumn::Manufacturer),
        ciudad_cliente: text(SalesColumn::CiudadCliente),
        quantity: number(SalesColumn::Quantity),
        unit_price_cop,
        ingreso_neto_item: number(SalesColumn::IngresoNetoItem),
        extra: layout
            .extras()
            .iter()
            .map(|(idx, _)| cells.get(*idx).and_then(|value| clean_text(value)))
            .collect(),
    }
}

fn whole_quantity(value: Decimal, line: usize) -> Result<u64> {
    if !value.fract().is_zero() {
        return Err(ReportError::FractionalQuantity {
            row: line,
            value: value.to_string(),
        });
    }
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ReportError::NegativeQuantity {
            row: line,
            value: value.to_string(),
        });
    }
    value.to_u64().ok_or_else(|| ReportError::QuantityOutOfRange {
        row: line,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "order_id,order_date,product_name,category,manufacturer,ciudad_cliente,quantity,unit_price_cop,ingreso_neto_item";

    fn load_str(body: &str) -> Result<SalesTable> {
        let data = format!("{HEADER}\n{body}");
        load_from_reader(data.as_bytes(), &LoadOptions::default())
    }

    #[test]
    fn whole_quantity_rejects_fractions_and_negatives() {
        assert_eq!(whole_quantity(Decimal::new(30, 1), 2).unwrap(), 3);
        assert!(matches!(
            whole_quantity(Decimal::new(25, 1), 4),
            Err(ReportError::FractionalQuantity { row: 4, .. })
        ));
        assert!(matches!(
            whole_quantity(Decimal::from(-1), 5),
            Err(ReportError::NegativeQuantity { row: 5, .. })
        ));
        assert!(matches!(
            whole_quantity(Decimal::from(u64::MAX) + Decimal::ONE, 6),
            Err(ReportError::QuantityOutOfRange { row: 6, .. })
        ));
    }

    #[test]
    fn forward_fill_runs_before_dropping_rows() {
        let table = load_str(
            "1,2024-03-01,Mouse,Accesorios,Logi,Cali,1,10,10\n\
             2,2024-04-15,Teclado,Accesorios,Logi,Cali,1,20,\n\
             3,,Monitor,Pantallas,Acme,Cali,1,30,30\n",
        )
        .expect("load");
        let dates = table
            .records()
            .iter()
            .map(|record| record.order_date)
            .collect::<Vec<_>>();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 1),
                NaiveDate::from_ymd_opt(2024, 4, 15),
            ]
        );
        assert_eq!(table.report().dropped_missing_revenue, 1);
        assert_eq!(table.report().filled_dates, 1);
    }

    #[test]
    fn stage_row_counts_unparsed_cells() {
        let table = load_str(" 7 ,someday, Mouse ,,Logi,Cali,,n/a,5\n").expect("load");
        let record = &table.records()[0];
        assert_eq!(record.order_id.as_deref(), Some("7"));
        assert_eq!(record.product_name.as_deref(), Some("Mouse"));
        assert_eq!(record.category, None);
        assert_eq!(record.quantity, 0);
        assert_eq!(record.unit_price_cop, None);
        let report = table.report();
        assert_eq!(report.unparsed_dates, 1);
        assert_eq!(report.undated_rows, 1);
        assert_eq!(report.zero_filled_quantities, 1);
        assert_eq!(report.unparsed_unit_prices, 1);
    }
}
