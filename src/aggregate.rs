//! Group-and-sum queries over the cleaned sales table.
//!
//! Every query returns a new [`DerivedTable`]; the source table is never
//! touched. Groups come out in the order their key was first seen, so sorting
//! and ranking are stable with respect to source order. Sums are checked and
//! fail with [`ReportError::MeasureOverflow`] instead of wrapping.

use std::{cmp::Ordering, collections::HashMap};

use itertools::Itertools;
use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    data::{SalesRecord, format_date, month_label},
    error::{ReportError, Result},
    loader::SalesTable,
    schema::{ColumnKind, MONTH_YEAR, SalesColumn},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedRow {
    pub key: Option<String>,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedTable {
    pub key_column: String,
    pub measure_column: String,
    pub rows: Vec<DerivedRow>,
}

impl DerivedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> Result<Decimal> {
        checked_sum(self.rows.iter().map(|row| row.value), &self.measure_column)
    }

    /// Value of the group whose key equals `key` (`None` for the null group).
    pub fn get(&self, key: Option<&str>) -> Option<Decimal> {
        self.rows
            .iter()
            .find(|row| row.key.as_deref() == key)
            .map(|row| row.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryMetrics {
    pub total_revenue: Decimal,
    pub total_units: u64,
    pub total_orders: usize,
}

#[derive(Debug, Clone, Copy)]
enum GroupKey {
    Column(SalesColumn),
    MonthYear,
    Extra(usize),
}

impl GroupKey {
    fn resolve(table: &SalesTable, name: &str) -> Result<Self> {
        if name == MONTH_YEAR {
            return Ok(GroupKey::MonthYear);
        }
        if let Some(column) = SalesColumn::from_name(name) {
            return Ok(GroupKey::Column(column));
        }
        table
            .extra_index(name)
            .map(GroupKey::Extra)
            .ok_or_else(|| ReportError::UnknownColumn(name.to_string()))
    }

    fn value(self, record: &SalesRecord) -> Option<String> {
        match self {
            GroupKey::MonthYear => record.order_date.map(month_label),
            GroupKey::Extra(idx) => record.extra.get(idx).cloned().flatten(),
            GroupKey::Column(column) => match column {
                SalesColumn::OrderId => record.order_id.clone(),
                SalesColumn::OrderDate => record.order_date.map(format_date),
                SalesColumn::ProductName => record.product_name.clone(),
                SalesColumn::Category => record.category.clone(),
                SalesColumn::Manufacturer => record.manufacturer.clone(),
                SalesColumn::CiudadCliente => record.ciudad_cliente.clone(),
                SalesColumn::Quantity => Some(record.quantity.to_string()),
                SalesColumn::UnitPriceCop => {
                    record.unit_price_cop.map(|price| price.normalize().to_string())
                }
                SalesColumn::IngresoNetoItem => {
                    Some(record.ingreso_neto_item.normalize().to_string())
                }
            },
        }
    }
}

/// A numeric column that can be summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measure(SalesColumn);

impl Measure {
    pub const REVENUE: Measure = Measure(SalesColumn::IngresoNetoItem);
    pub const QUANTITY: Measure = Measure(SalesColumn::Quantity);

    pub fn resolve(table: &SalesTable, name: &str) -> Result<Self> {
        match SalesColumn::from_name(name) {
            Some(column) if column.kind() == ColumnKind::Numeric => Ok(Measure(column)),
            Some(_) => Err(ReportError::NonNumericMeasure(name.to_string())),
            None if name == MONTH_YEAR || table.extra_index(name).is_some() => {
                Err(ReportError::NonNumericMeasure(name.to_string()))
            }
            None => Err(ReportError::UnknownColumn(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Missing unit prices count as zero.
    pub fn value(self, record: &SalesRecord) -> Decimal {
        match self.0 {
            SalesColumn::Quantity => Decimal::from(record.quantity),
            SalesColumn::UnitPriceCop => record.unit_price_cop.unwrap_or_default(),
            _ => record.ingreso_neto_item,
        }
    }

    pub fn column_total(self, table: &SalesTable) -> Result<Decimal> {
        checked_sum(
            table.records().iter().map(|record| self.value(record)),
            self.name(),
        )
    }
}

/// Sums `measure` per distinct value of `key`. Missing keys form one group.
pub fn sum_by(table: &SalesTable, key: &str, measure: &str) -> Result<DerivedTable> {
    let group_key = GroupKey::resolve(table, key)?;
    let measure = Measure::resolve(table, measure)?;
    accumulate(table, key, group_key, measure)
}

/// Orders groups by value, largest first. Equal values keep their order.
pub fn sort_desc(mut derived: DerivedTable) -> DerivedTable {
    derived.rows.sort_by(|a, b| b.value.cmp(&a.value));
    derived
}

/// The `n` largest groups of `sum_by`, largest first.
pub fn top_n(table: &SalesTable, key: &str, measure: &str, n: usize) -> Result<DerivedTable> {
    let mut ranked = sort_desc(sum_by(table, key, measure)?);
    ranked.rows.truncate(n);
    Ok(ranked)
}

/// Net revenue per calendar month in chronological order. Rows without a
/// date are reported last under a missing key.
pub fn sales_over_time(table: &SalesTable) -> Result<DerivedTable> {
    let mut derived = accumulate(table, MONTH_YEAR, GroupKey::MonthYear, Measure::REVENUE)?;
    derived.rows.sort_by(|a, b| match (&a.key, &b.key) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(derived)
}

pub fn summarize(table: &SalesTable) -> Result<SummaryMetrics> {
    let records = table.records();
    let total_units = records
        .iter()
        .try_fold(0u64, |total, record| total.checked_add(record.quantity))
        .ok_or_else(|| ReportError::MeasureOverflow(Measure::QUANTITY.name().to_string()))?;
    Ok(SummaryMetrics {
        total_revenue: Measure::REVENUE.column_total(table)?,
        total_units,
        total_orders: records
            .iter()
            .filter_map(|record| record.order_id.as_deref())
            .unique()
            .count(),
    })
}

fn checked_sum(values: impl IntoIterator<Item = Decimal>, measure: &str) -> Result<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or_else(|| ReportError::MeasureOverflow(measure.to_string()))
}

fn accumulate(
    table: &SalesTable,
    key_name: &str,
    key: GroupKey,
    measure: Measure,
) -> Result<DerivedTable> {
    let mut positions: HashMap<Option<String>, usize> = HashMap::new();
    let mut rows: Vec<DerivedRow> = Vec::new();
    for record in table.records() {
        let group = key.value(record);
        let value = measure.value(record);
        match positions.get(&group) {
            Some(&idx) => {
                let row = &mut rows[idx];
                row.value = row
                    .value
                    .checked_add(value)
                    .ok_or_else(|| ReportError::MeasureOverflow(measure.name().to_string()))?;
            }
            None => {
                positions.insert(group.clone(), rows.len());
                rows.push(DerivedRow { key: group, value });
            }
        }
    }
    debug!(
        "Grouped {} row(s) by '{}' into {} group(s) summing '{}'",
        table.len(),
        key_name,
        rows.len(),
        measure.name()
    );
    Ok(DerivedTable {
        key_column: key_name.to_string(),
        measure_column: measure.name().to_string(),
        rows,
    })
}
