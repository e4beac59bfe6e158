pub mod daily;
#[cfg(test)]
pub mod mock;
pub mod openweather;
pub mod types;

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::future::Future;
use thiserror::Error;

use crate::cache::{CacheKey, CacheManager};
use crate::settings::{Language, UnitSystem};
use crate::store::KeyValueStore;
use openweather::{OpenWeatherClient, OpenWeatherError};
use types::{ForecastResponse, GeocodeResponse, WeatherResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    Weather,
    Forecast,
    Geocode,
}

impl FetchKind {
    /// Translation key of the user-facing notice for this kind.
    pub fn notice_key(&self) -> &'static str {
        match self {
            Self::Weather => "weatherError",
            Self::Forecast => "forecastError",
            Self::Geocode => "geocodeError",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Weather => "weather",
            Self::Forecast => "forecast",
            Self::Geocode => "geocode",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind} fetch failed: {message}")]
pub struct FetchError {
    pub kind: FetchKind,
    pub message: String,
}

impl FetchError {
    fn from_upstream(kind: FetchKind, err: OpenWeatherError) -> Self {
        tracing::error!("{} fetch failed: {}", kind, err);
        Self {
            kind,
            message: err.user_message(),
        }
    }
}

pub struct WeatherGateway<S> {
    client: OpenWeatherClient,
    cache: CacheManager<S>,
}

impl<S: KeyValueStore> WeatherGateway<S> {
    pub fn new(client: OpenWeatherClient, cache: CacheManager<S>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &CacheManager<S> {
        &self.cache
    }

    pub async fn fetch_weather(
        &self,
        lat: &str,
        lon: &str,
        units: UnitSystem,
        language: Language,
    ) -> Result<WeatherResponse, FetchError> {
        let key = CacheKey::weather(lat, lon, units, language);
        self.cached(&key, FetchKind::Weather, || {
            self.client.get_current_weather(lat, lon, units, language)
        })
        .await
    }

    pub async fn fetch_forecast(
        &self,
        lat: &str,
        lon: &str,
        units: UnitSystem,
        language: Language,
    ) -> Result<ForecastResponse, FetchError> {
        let key = CacheKey::forecast(lat, lon, units, language);
        self.cached(&key, FetchKind::Forecast, || {
            self.client.get_forecast(lat, lon, units, language)
        })
        .await
    }

    /// Up to five candidates for a free-text query, in upstream order.
    /// The trimmed query is sent as typed; the cache entry is shared by every
    /// casing of it. An empty query never hits the network.
    pub async fn search_cities(&self, query: &str, language: Language) -> Result<Vec<GeocodeResponse>, FetchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let key = CacheKey::geo(&normalize_query(query), language);
        self.cached(&key, FetchKind::Geocode, || self.client.geocode_direct(query))
            .await
    }

    // Cache problems are logged and treated as a miss; only the upstream
    // call can fail the request. Failures are never cached.
    async fn cached<T, F, Fut>(&self, key: &CacheKey, kind: FetchKind, fetch: F) -> Result<T, FetchError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, OpenWeatherError>>,
    {
        match self.cache.get_as::<T>(key).await {
            Ok(Some(payload)) => {
                tracing::debug!("Cache hit: {}", key.render());
                return Ok(payload);
            }
            Ok(None) => tracing::debug!("Cache miss: {}", key.render()),
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key.render(), e),
        }

        let payload = fetch()
            .await
            .map_err(|e| FetchError::from_upstream(kind, e))?;

        if let Err(e) = self.cache.put(key, &payload).await {
            tracing::warn!("Cache write failed for {}: {}", key.render(), e);
        }
        Ok(payload)
    }
}

pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> (WeatherGateway<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let config = Config::for_base_url(&server.uri(), Some("k"));
        let client = OpenWeatherClient::new(&config).unwrap();
        (WeatherGateway::new(client, CacheManager::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock::weather_json("Paris", 3600, 12.0)))
            .expect(1)
            .mount(&server)
            .await;

        let (gateway, store) = gateway(&server);
        let first = gateway
            .fetch_weather("48.85", "2.35", UnitSystem::Metric, Language::En)
            .await
            .unwrap();
        let second = gateway
            .fetch_weather("48.85", "2.35", UnitSystem::Metric, Language::En)
            .await
            .unwrap();

        assert_eq!(first, second);
        let key = CacheKey::weather("48.85", "2.35", UnitSystem::Metric, Language::En);
        assert!(store.get(&key.render()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_units_and_language_select_distinct_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock::forecast_json(1_700_006_400, 8.0)))
            .expect(3)
            .mount(&server)
            .await;

        let (gateway, _) = gateway(&server);
        for (units, language) in [
            (UnitSystem::Metric, Language::En),
            (UnitSystem::Imperial, Language::En),
            (UnitSystem::Metric, Language::Tr),
            (UnitSystem::Metric, Language::En),
        ] {
            gateway.fetch_forecast("1", "2", units, language).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404",
                "message": "city not found"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let (gateway, store) = gateway(&server);
        for _ in 0..2 {
            let err = gateway
                .fetch_weather("0", "0", UnitSystem::Metric, Language::En)
                .await
                .unwrap_err();
            assert_eq!(err.kind, FetchKind::Weather);
            assert_eq!(err.message, "city not found");
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_search_normalizes_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/direct"))
            .and(query_param("q", "Berlin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock::geocode_json(&["Berlin"])))
            .expect(1)
            .mount(&server)
            .await;

        let (gateway, _) = gateway(&server);
        let first = gateway.search_cities("  Berlin ", Language::En).await.unwrap();
        let second = gateway.search_cities("berlin", Language::En).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert!(gateway.search_cities("   ", Language::En).await.unwrap().is_empty());
    }
}
