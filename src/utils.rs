use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::settings::{TempUnit, TimeFormat};

const WEEKDAY_LABELS: [&str; 7] = ["SU", "M", "T", "W", "TH", "F", "S"];

/// Rounds half-up, the way the dashboard has always displayed readings
/// (`-2.5` shows as `-2`).
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// "21°C"
pub fn format_temperature(temp: f64, unit: TempUnit) -> String {
    format!("{}°{}", round_half_up(temp), unit.as_str())
}

pub fn format_wind(speed: f64) -> String {
    format!("{} m/s", round_half_up(speed))
}

pub fn format_humidity(humidity: f64) -> String {
    format!("{}%", round_half_up(humidity))
}

/// Wall-clock time at a location `offset_seconds` east of UTC.
pub fn format_local_time(now: DateTime<Utc>, offset_seconds: i32, format: TimeFormat) -> String {
    let local = now + Duration::seconds(offset_seconds as i64);
    let (hours, minutes) = (local.hour(), local.minute());

    match format {
        TimeFormat::Twelve => {
            let suffix = if hours >= 12 { "PM" } else { "AM" };
            let hours = match hours % 12 {
                0 => 12,
                h => h,
            };
            format!("{}:{:02} {}", hours, minutes, suffix)
        }
        TimeFormat::TwentyFour => format!("{:02}:{:02}", hours, minutes),
    }
}

/// Night icons render with their daytime variant.
pub fn day_icon(icon: &str) -> String {
    icon.replacen('n', "d", 1)
}

pub fn icon_url(icon: &str) -> String {
    format!("https://openweathermap.org/img/wn/{}@2x.png", day_icon(icon))
}

/// Short weekday label for a unix timestamp.
pub fn weekday_label(timestamp: i64) -> &'static str {
    let day = DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .weekday()
        .num_days_from_sunday();
    WEEKDAY_LABELS[day as usize]
}

/// Milliseconds since the epoch to a UTC timestamp.
pub fn datetime_from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
