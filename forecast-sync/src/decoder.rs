//! Typed decoding of raw query rows.
//!
//! Athena hands every value back as an optional string. [`COLUMN_COERCIONS`] declares which
//! columns are numeric; everything else stays text. Adding a typed column is one line in that
//! table.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::analytics::{QueryResult, RawRow};
use crate::bail;
use crate::error::{ErrorKind, SyncResult};
use crate::sync_error;
use crate::types::{DateBounds, ForecastRecord};

/// A decoded cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    I64(i64),
    F64(f64),
    String(String),
}

/// Parses a non-empty cell. Errors are reported without context and wrapped by the caller.
pub type CoerceFn = fn(&str) -> Result<Cell, String>;

/// Column name to coercion function. Columns not listed are kept as text.
pub const COLUMN_COERCIONS: &[(&str, CoerceFn)] = &[
    ("restaurant_id", coerce_integer),
    ("inventory_item_id", coerce_integer),
    ("dc_id", coerce_integer),
    ("y_05", coerce_float),
    ("y_50", coerce_float),
    ("y_95", coerce_float),
];

fn coerce_integer(raw: &str) -> Result<Cell, String> {
    raw.trim()
        .parse::<i64>()
        .map(Cell::I64)
        .map_err(|err| err.to_string())
}

fn coerce_float(raw: &str) -> Result<Cell, String> {
    raw.trim()
        .parse::<f64>()
        .map(Cell::F64)
        .map_err(|err| err.to_string())
}

fn coerce_text(raw: &str) -> Result<Cell, String> {
    Ok(Cell::String(raw.to_owned()))
}

fn coercion_for(column: &str) -> CoerceFn {
    COLUMN_COERCIONS
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, coerce)| *coerce)
        .unwrap_or(coerce_text)
}

/// Decodes one cell of `column`. Missing and empty cells are null.
pub fn decode_cell(column: &str, raw: Option<&str>) -> SyncResult<Cell> {
    match raw {
        None | Some("") => Ok(Cell::Null),
        Some(value) => coercion_for(column)(value).map_err(|reason| {
            sync_error!(
                ErrorKind::DecodeFailed,
                "Malformed cell value",
                format!("column `{column}` has value `{value}`: {reason}")
            )
        }),
    }
}

/// A row decoded against the query header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRow {
    cells: HashMap<String, Cell>,
}

impl DecodedRow {
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }

    fn take(&mut self, column: &str) -> Cell {
        self.cells.remove(column).unwrap_or(Cell::Null)
    }

    fn required_i64(&mut self, column: &'static str) -> SyncResult<i64> {
        match self.take(column) {
            Cell::I64(value) => Ok(value),
            Cell::Null => bail!(ErrorKind::DecodeFailed, "Missing required column", column),
            other => bail!(
                ErrorKind::DecodeFailed,
                "Unexpected cell type",
                format!("column `{column}` decoded as {other:?}")
            ),
        }
    }

    fn optional_i64(&mut self, column: &'static str) -> SyncResult<Option<i64>> {
        match self.take(column) {
            Cell::I64(value) => Ok(Some(value)),
            Cell::Null => Ok(None),
            other => bail!(
                ErrorKind::DecodeFailed,
                "Unexpected cell type",
                format!("column `{column}` decoded as {other:?}")
            ),
        }
    }

    fn required_f64(&mut self, column: &'static str) -> SyncResult<f64> {
        self.optional_f64(column)?.ok_or_else(|| {
            sync_error!(ErrorKind::DecodeFailed, "Missing required column", column)
        })
    }

    fn optional_f64(&mut self, column: &'static str) -> SyncResult<Option<f64>> {
        match self.take(column) {
            Cell::F64(value) => Ok(Some(value)),
            Cell::Null => Ok(None),
            other => bail!(
                ErrorKind::DecodeFailed,
                "Unexpected cell type",
                format!("column `{column}` decoded as {other:?}")
            ),
        }
    }

    fn optional_string(&mut self, column: &'static str) -> SyncResult<Option<String>> {
        match self.take(column) {
            Cell::String(value) => Ok(Some(value)),
            Cell::Null => Ok(None),
            other => bail!(
                ErrorKind::DecodeFailed,
                "Unexpected cell type",
                format!("column `{column}` decoded as {other:?}")
            ),
        }
    }

    fn required_string(&mut self, column: &'static str) -> SyncResult<String> {
        self.optional_string(column)?.ok_or_else(|| {
            sync_error!(ErrorKind::DecodeFailed, "Missing required column", column)
        })
    }

    fn optional_date(&mut self, column: &'static str) -> SyncResult<Option<NaiveDate>> {
        let Some(raw) = self.optional_string(column)? else {
            return Ok(None);
        };

        // Athena renders `date` columns as `YYYY-MM-DD`, timestamps may trail a time part.
        let date_part = raw.get(..10).unwrap_or(&raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map(Some)
            .map_err(|err| {
                sync_error!(
                    ErrorKind::DecodeFailed,
                    "Malformed cell value",
                    format!("column `{column}` has value `{raw}`: {err}")
                )
            })
    }

    fn required_date(&mut self, column: &'static str) -> SyncResult<NaiveDate> {
        self.optional_date(column)?.ok_or_else(|| {
            sync_error!(ErrorKind::DecodeFailed, "Missing required column", column)
        })
    }
}

impl TryFrom<DecodedRow> for ForecastRecord {
    type Error = crate::error::SyncError;

    fn try_from(mut row: DecodedRow) -> Result<Self, Self::Error> {
        Ok(ForecastRecord {
            restaurant_id: row.required_i64("restaurant_id")?,
            inventory_item_id: row.required_i64("inventory_item_id")?,
            business_date: row.required_date("business_date")?,
            dma_id: row.optional_string("dma_id")?,
            dc_id: row.optional_i64("dc_id")?,
            state: row.required_string("state")?,
            y_05: row.optional_f64("y_05")?,
            y_50: row.required_f64("y_50")?,
            y_95: row.optional_f64("y_95")?,
        })
    }
}

/// Decodes rows of a query result against its header.
#[derive(Debug, Clone)]
pub struct ResultDecoder<'a> {
    columns: &'a [String],
}

impl<'a> ResultDecoder<'a> {
    pub fn new(columns: &'a [String]) -> Self {
        Self { columns }
    }

    /// Decodes one raw row. Cells beyond the header are ignored, missing trailing cells are null.
    pub fn decode_row(&self, raw: &RawRow) -> SyncResult<DecodedRow> {
        let mut cells = HashMap::with_capacity(self.columns.len());
        for (index, column) in self.columns.iter().enumerate() {
            let value = raw.get(index).and_then(|cell| cell.as_deref());
            cells.insert(column.clone(), decode_cell(column, value)?);
        }

        Ok(DecodedRow { cells })
    }
}

/// Decodes every row of `result` into forecast records, failing on the first malformed row.
pub fn decode_records(result: &QueryResult) -> SyncResult<Vec<ForecastRecord>> {
    let decoder = ResultDecoder::new(&result.columns);
    result
        .rows
        .iter()
        .map(|raw| ForecastRecord::try_from(decoder.decode_row(raw)?))
        .collect()
}

/// Decodes the `min_date`/`max_date` row of a bounds query. An empty source yields `None`.
pub fn decode_bounds(result: &QueryResult) -> SyncResult<Option<DateBounds>> {
    let Some(raw) = result.rows.first() else {
        return Ok(None);
    };

    let mut row = ResultDecoder::new(&result.columns).decode_row(raw)?;
    match (row.optional_date("min_date")?, row.optional_date("max_date")?) {
        (Some(min_date), Some(max_date)) => Ok(Some(DateBounds { min_date, max_date })),
        _ => Ok(None),
    }
}
