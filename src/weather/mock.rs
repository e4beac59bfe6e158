// Canned OpenWeather payloads for tests
use chrono::DateTime;
use serde_json::{json, Value};

pub fn weather_json(name: &str, timezone: i32, temp: f64) -> Value {
    json!({
        "coord": {"lon": 0.0, "lat": 0.0},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01n"}],
        "main": {"temp": temp, "feels_like": temp - 1.0, "humidity": 64},
        "wind": {"speed": 4.4, "deg": 200},
        "timezone": timezone,
        "name": name,
        "cod": 200
    })
}

/// Five days of 3-hourly steps starting at `start` (unix seconds, expected to
/// sit on a 3-hour boundary).
pub fn forecast_json(start: i64, base_temp: f64) -> Value {
    let list: Vec<Value> = (0..40)
        .map(|step| {
            let dt = start + step * 3 * 3600;
            let dt_txt = DateTime::from_timestamp(dt, 0)
                .unwrap_or_default()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string();
            let temp = base_temp + 5.0 * (step as f64 * 0.26).sin(); // Diurnal swing
            let icon = if step % 8 < 2 || step % 8 > 5 { "02n" } else { "10d" };

            json!({
                "dt": dt,
                "main": {"temp": temp, "humidity": 70},
                "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": icon}],
                "dt_txt": dt_txt
            })
        })
        .collect();

    json!({"cod": "200", "message": 0, "cnt": 40, "list": list})
}

pub fn geocode_json(names: &[&str]) -> Value {
    Value::Array(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                json!({
                    "name": name,
                    "lat": 51.5 + i as f64,
                    "lon": -0.12,
                    "country": "GB",
                    "state": "England"
                })
            })
            .collect(),
    )
}
