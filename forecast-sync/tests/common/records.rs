use chrono::NaiveDate;
use forecast_sync::types::ForecastRecord;

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

/// A forecast row for item 456 with fixed quantiles around `y_50`.
pub fn forecast(restaurant_id: i64, business_date: &str, y_50: f64) -> ForecastRecord {
    ForecastRecord {
        restaurant_id,
        inventory_item_id: 456,
        business_date: date(business_date),
        dma_id: Some("501".to_owned()),
        dc_id: Some(12),
        state: "CA".to_owned(),
        y_05: Some(y_50 * 0.5),
        y_50,
        y_95: Some(y_50 * 1.5),
    }
}

/// One row per restaurant in `restaurants` for each date in `dates`.
pub fn grid(restaurants: &[i64], dates: &[&str], y_50: f64) -> Vec<ForecastRecord> {
    dates
        .iter()
        .flat_map(|business_date| {
            restaurants
                .iter()
                .map(move |restaurant_id| forecast(*restaurant_id, business_date, y_50))
        })
        .collect()
}
