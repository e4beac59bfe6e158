use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::settings::{Language, UnitSystem};
use crate::store::{KeyValueStore, StoreError, StoreOp};

pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

pub const WEATHER_CACHE_PREFIX: &str = "weather_cache_";
pub const GEO_CACHE_PREFIX: &str = "geo_cache_";
pub const CACHE_PREFIXES: [&str; 2] = [WEATHER_CACHE_PREFIX, GEO_CACHE_PREFIX];

/// Wall-clock source in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Weather,
    Forecast,
    Geo,
}

impl CacheKind {
    fn namespace(&self) -> &'static str {
        match self {
            Self::Weather => "weather_cache_weather_",
            Self::Forecast => "weather_cache_forecast_",
            Self::Geo => GEO_CACHE_PREFIX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: CacheKind,
    pub location: String,
    pub units: Option<UnitSystem>,
    pub language: Language,
}

impl CacheKey {
    pub fn weather(lat: &str, lon: &str, units: UnitSystem, language: Language) -> Self {
        Self {
            kind: CacheKind::Weather,
            location: format!("{}_{}", lat, lon),
            units: Some(units),
            language,
        }
    }

    pub fn forecast(lat: &str, lon: &str, units: UnitSystem, language: Language) -> Self {
        Self {
            kind: CacheKind::Forecast,
            location: format!("{}_{}", lat, lon),
            units: Some(units),
            language,
        }
    }

    pub fn geo(query: &str, language: Language) -> Self {
        Self {
            kind: CacheKind::Geo,
            location: query.to_string(),
            units: None,
            language,
        }
    }

    /// Store key for this tuple.
    ///
    /// The unit and language tokens never contain `_`, so the location is
    /// whatever sits between the namespace and the last two segments. That
    /// keeps the mapping injective even for free-text locations.
    pub fn render(&self) -> String {
        let units = self.units.map(|u| u.as_str()).unwrap_or("any");
        format!(
            "{}{}_{}_{}",
            self.kind.namespace(),
            self.location,
            units,
            self.language.as_str()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    pub timestamp: i64,
}

#[derive(Error, Debug)]
#[error("corrupt cache entry {key}: {source}")]
pub struct CacheCorruption {
    pub key: String,
    #[source]
    pub source: serde_json::Error,
}

fn parse_entry(key: &str, raw: &str) -> Result<CacheEntry, CacheCorruption> {
    serde_json::from_str(raw).map_err(|source| CacheCorruption {
        key: key.to_string(),
        source,
    })
}

pub fn is_cache_key(key: &str) -> bool {
    CACHE_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

#[derive(Clone)]
pub struct CacheManager<S> {
    store: S,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
}

impl<S: KeyValueStore> CacheManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl_ms: CACHE_TTL.as_millis() as i64,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    fn is_expired(&self, entry: &CacheEntry, now: i64) -> bool {
        now - entry.timestamp >= self.ttl_ms
    }

    /// Returns the cached payload, deleting the entry when it has expired or
    /// cannot be parsed.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Value>, StoreError> {
        let key = key.render();
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let entry = match parse_entry(&key, &raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("{}", e);
                self.store.remove(&key).await?;
                return Ok(None);
            }
        };

        if self.is_expired(&entry, self.clock.now_ms()) {
            tracing::debug!("Cache entry {} expired", key);
            self.store.remove(&key).await?;
            return Ok(None);
        }

        Ok(Some(entry.data))
    }

    /// Typed variant of [`get`](Self::get). A payload that no longer matches
    /// `T` is treated as corrupt and removed.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, StoreError> {
        let Some(data) = self.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_value(data) {
            Ok(payload) => Ok(Some(payload)),
            Err(source) => {
                let corruption = CacheCorruption {
                    key: key.render(),
                    source,
                };
                tracing::debug!("{}", corruption);
                self.store.remove(&corruption.key).await?;
                Ok(None)
            }
        }
    }

    pub async fn put<T: Serialize>(&self, key: &CacheKey, payload: &T) -> Result<(), StoreError> {
        let entry = CacheEntry {
            data: serde_json::to_value(payload)?,
            timestamp: self.clock.now_ms(),
        };
        self.store.set(&key.render(), &serde_json::to_string(&entry)?).await
    }

    /// Drops every expired or unreadable cache entry. Preference keys are
    /// never touched. Returns the number of entries removed.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let now = self.clock.now_ms();
        let mut stale = Vec::new();

        for key in self.store.keys().await?.into_iter().filter(|k| is_cache_key(k)) {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match parse_entry(&key, &raw) {
                Ok(entry) if !self.is_expired(&entry, now) => {}
                Ok(_) => stale.push(StoreOp::remove(key)),
                Err(e) => {
                    tracing::debug!("{}", e);
                    stale.push(StoreOp::remove(key));
                }
            }
        }

        let removed = stale.len();
        if removed > 0 {
            self.store.apply_batch(stale).await?;
        }
        tracing::debug!("Cache sweep removed {} entries", removed);
        Ok(removed)
    }

    pub async fn invalidate_by_prefix(&self, prefixes: &[&str]) -> Result<usize, StoreError> {
        let doomed: Vec<StoreOp> = self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|key| prefixes.iter().any(|prefix| key.starts_with(prefix)))
            .map(StoreOp::remove)
            .collect();

        let removed = doomed.len();
        if removed > 0 {
            self.store.apply_batch(doomed).await?;
        }
        Ok(removed)
    }
}
