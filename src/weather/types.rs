use serde::{Deserialize, Serialize};

/// `GET /weather` response, trimmed to the fields the dashboard reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub name: String,
    /// Shift from UTC in seconds.
    pub timezone: i32,
    pub weather: Vec<WeatherCondition>,
    pub main: WeatherMain,
    pub wind: Wind,
}

impl WeatherResponse {
    pub fn icon(&self) -> Option<&str> {
        self.weather.first().map(|w| w.icon.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

/// `GET /forecast` response: 3-hourly steps over five days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub list: Vec<ForecastItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    pub dt: i64,
    pub dt_txt: String,
    pub weather: Vec<WeatherCondition>,
    pub main: ForecastMain,
}

impl ForecastItem {
    pub fn icon(&self) -> Option<&str> {
        self.weather.first().map(|w| w.icon.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMain {
    pub temp: f64,
}

/// One geocoding candidate from `GET /direct`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl GeocodeResponse {
    /// "State, Country" or just the country.
    pub fn region(&self) -> String {
        match &self.state {
            Some(state) if !state.is_empty() => format!("{}, {}", state, self.country),
            _ => self.country.clone(),
        }
    }
}
