use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Natural key of a forecast row in the target store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForecastKey {
    pub restaurant_id: i64,
    pub inventory_item_id: i64,
    pub business_date: NaiveDate,
}

/// One forecast row: the demand quantiles of an inventory item at a restaurant on a day.
///
/// `y_05 <= y_50 <= y_95` is expected from upstream but not checked here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub restaurant_id: i64,
    pub inventory_item_id: i64,
    pub business_date: NaiveDate,
    pub dma_id: Option<String>,
    pub dc_id: Option<i64>,
    pub state: String,
    pub y_05: Option<f64>,
    pub y_50: f64,
    pub y_95: Option<f64>,
}

impl ForecastRecord {
    pub fn key(&self) -> ForecastKey {
        ForecastKey {
            restaurant_id: self.restaurant_id,
            inventory_item_id: self.inventory_item_id,
            business_date: self.business_date,
        }
    }
}

/// Inclusive range of business dates present in the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
}
