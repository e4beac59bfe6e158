use super::types::{ForecastItem, ForecastResponse};

/// Time-of-day marker of the step used as a day's representative reading.
pub const MIDDAY_MARKER: &str = "12:00:00";
pub const FORECAST_DAYS: usize = 5;

/// Picks the midday step of each day, in upstream order, up to five days.
pub fn select_daily(forecast: &ForecastResponse) -> Vec<&ForecastItem> {
    forecast
        .list
        .iter()
        .filter(|item| item.dt_txt.contains(MIDDAY_MARKER))
        .take(FORECAST_DAYS)
        .collect()
}
