use super::types::*;
use crate::config::Config;
use crate::settings::{Language, UnitSystem};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const GEOCODE_LIMIT: usize = 5;

#[derive(Error, Debug)]
pub enum OpenWeatherError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },
}

impl OpenWeatherError {
    /// The message worth showing a user: upstream's own text when it sent
    /// one.
    pub fn user_message(&self) -> String {
        match self {
            Self::ApiError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// Error bodies look like {"cod": "401", "message": "Invalid API key ..."}
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    weather_base_url: String,
    geo_base_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &Config) -> Result<Self, OpenWeatherError> {
        let client = Client::builder()
            .user_agent("CityWeatherDashboard/1.0")
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            // Requests without a key still go out and fail upstream
            api_key: config.openweather_api_key.clone().unwrap_or_default(),
            weather_base_url: config.openweather_base_url.trim_end_matches('/').to_string(),
            geo_base_url: config.openweather_geo_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get_current_weather(
        &self,
        lat: &str,
        lon: &str,
        units: UnitSystem,
        language: Language,
    ) -> Result<WeatherResponse, OpenWeatherError> {
        let url = format!("{}/weather", self.weather_base_url);
        self.make_request(&url, &[
            ("lat", lat),
            ("lon", lon),
            ("units", units.as_str()),
            ("lang", language.as_str()),
            ("appid", &self.api_key),
        ])
        .await
    }

    pub async fn get_forecast(
        &self,
        lat: &str,
        lon: &str,
        units: UnitSystem,
        language: Language,
    ) -> Result<ForecastResponse, OpenWeatherError> {
        let url = format!("{}/forecast", self.weather_base_url);
        self.make_request(&url, &[
            ("lat", lat),
            ("lon", lon),
            ("units", units.as_str()),
            ("lang", language.as_str()),
            ("appid", &self.api_key),
        ])
        .await
    }

    pub async fn geocode_direct(&self, query: &str) -> Result<Vec<GeocodeResponse>, OpenWeatherError> {
        let url = format!("{}/direct", self.geo_base_url);
        let limit = GEOCODE_LIMIT.to_string();
        let mut candidates: Vec<GeocodeResponse> = self
            .make_request(&url, &[("q", query), ("limit", &limit), ("appid", &self.api_key)])
            .await?;
        candidates.truncate(GEOCODE_LIMIT);
        Ok(candidates)
    }

    // Single attempt; callers decide whether to try again
    async fn make_request<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, OpenWeatherError> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(OpenWeatherError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::mock;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        let config = Config::for_base_url(&server.uri(), Some("test-key"));
        OpenWeatherClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_weather_request_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "41.01"))
            .and(query_param("lon", "28.97"))
            .and(query_param("units", "imperial"))
            .and(query_param("lang", "tr"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock::weather_json("İstanbul", 10800, 60.0)))
            .expect(1)
            .mount(&server)
            .await;

        let weather = client_for(&server)
            .get_current_weather("41.01", "28.97", UnitSystem::Imperial, Language::Tr)
            .await
            .unwrap();

        assert_eq!(weather.name, "İstanbul");
        assert_eq!(weather.timezone, 10800);
    }

    #[tokio::test]
    async fn test_geocode_request_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/direct"))
            .and(query_param("q", "london"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock::geocode_json(&[
                "London", "London", "Londonderry", "London Colney", "Londrina", "Extra",
            ])))
            .mount(&server)
            .await;

        let candidates = client_for(&server).geocode_direct("london").await.unwrap();
        assert_eq!(candidates.len(), GEOCODE_LIMIT);
        assert_eq!(candidates[2].name, "Londonderry");
    }

    #[tokio::test]
    async fn test_api_error_carries_upstream_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "cod": 401,
                "message": "Invalid API key."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_forecast("1", "2", UnitSystem::Metric, Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, OpenWeatherError::ApiError { status: 401, .. }));
        assert_eq!(err.user_message(), "Invalid API key.");
    }

    #[tokio::test]
    async fn test_api_error_without_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_current_weather("1", "2", UnitSystem::Metric, Language::En)
            .await
            .unwrap_err();

        assert!(err.user_message().contains("503"));
    }
}
