//! Column layout of the sales source.
//!
//! The source must carry nine named columns (exact match after trimming the
//! header). Anything else in the header is kept as an extra text column.

use std::fmt;

use crate::error::{ReportError, Result};

/// Name of the derived month bucket usable as a grouping key.
pub const MONTH_YEAR: &str = "month_year";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SalesColumn {
    OrderId,
    OrderDate,
    ProductName,
    Category,
    Manufacturer,
    CiudadCliente,
    Quantity,
    UnitPriceCop,
    IngresoNetoItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Date,
    Numeric,
}

impl SalesColumn {
    pub const ALL: [SalesColumn; 9] = [
        SalesColumn::OrderId,
        SalesColumn::OrderDate,
        SalesColumn::ProductName,
        SalesColumn::Category,
        SalesColumn::Manufacturer,
        SalesColumn::CiudadCliente,
        SalesColumn::Quantity,
        SalesColumn::UnitPriceCop,
        SalesColumn::IngresoNetoItem,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SalesColumn::OrderId => "order_id",
            SalesColumn::OrderDate => "order_date",
            SalesColumn::ProductName => "product_name",
            SalesColumn::Category => "category",
            SalesColumn::Manufacturer => "manufacturer",
            SalesColumn::CiudadCliente => "ciudad_cliente",
            SalesColumn::Quantity => "quantity",
            SalesColumn::UnitPriceCop => "unit_price_cop",
            SalesColumn::IngresoNetoItem => "ingreso_neto_item",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            SalesColumn::OrderDate => ColumnKind::Date,
            SalesColumn::Quantity | SalesColumn::UnitPriceCop | SalesColumn::IngresoNetoItem => {
                ColumnKind::Numeric
            }
            _ => ColumnKind::Text,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.name() == name)
    }
}

impl fmt::Display for SalesColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trims surrounding whitespace from a header cell. Names are otherwise
/// compared verbatim, so `Quantity` does not match `quantity`.
pub fn normalize_header(name: &str) -> String {
    name.trim().to_string()
}

/// Positions of the required columns within a header row, plus the extras.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    required: [usize; 9],
    extras: Vec<(usize, String)>,
}

impl ColumnLayout {
    /// Resolves column positions from normalized header names. When a name
    /// occurs twice the first occurrence wins and the second becomes an extra.
    pub fn resolve(headers: &[String]) -> Result<Self> {
        let mut required = [usize::MAX; 9];
        let mut extras = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            match SalesColumn::from_name(header) {
                Some(column) if required[column as usize] == usize::MAX => {
                    required[column as usize] = idx;
                }
                _ => extras.push((idx, header.clone())),
            }
        }
        let missing = SalesColumn::ALL
            .iter()
            .filter(|column| required[**column as usize] == usize::MAX)
            .map(|column| column.name().to_string())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ReportError::SchemaMismatch { missing });
        }
        Ok(Self { required, extras })
    }

    pub fn index_of(&self, column: SalesColumn) -> usize {
        self.required[column as usize]
    }

    pub fn extras(&self) -> &[(usize, String)] {
        &self.extras
    }

    pub fn extra_names(&self) -> Vec<String> {
        self.extras.iter().map(|(_, name)| name.clone()).collect()
    }
}
