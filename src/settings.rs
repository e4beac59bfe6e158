use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::store::{KeyValueStore, StoreError, StoreOp};

pub mod keys {
    pub const THEME: &str = "theme";
    pub const TIME_FORMAT: &str = "timeFormat";
    pub const TEMP_UNIT: &str = "tempUnit";
    pub const LANGUAGE: &str = "language";
    pub const CITIES: &str = "cities";
    pub const MAIN_CITY: &str = "mainCity";

    pub const ALL: [&str; 6] = [THEME, TIME_FORMAT, TEMP_UNIT, LANGUAGE, CITIES, MAIN_CITY];
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognised {field} value: {value:?}")]
pub struct InvalidSetting {
    pub field: &'static str,
    pub value: String,
}

impl InvalidSetting {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeFormat {
    #[serde(rename = "12")]
    Twelve,
    #[default]
    #[serde(rename = "24")]
    TwentyFour,
}

impl TimeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twelve => "12",
            Self::TwentyFour => "24",
        }
    }
}

impl FromStr for TimeFormat {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "12" => Ok(Self::Twelve),
            "24" => Ok(Self::TwentyFour),
            other => Err(InvalidSetting::new(keys::TIME_FORMAT, other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TempUnit {
    #[default]
    C,
    F,
}

impl TempUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C => "C",
            Self::F => "F",
        }
    }

    /// Unit system requested from the weather API for this display unit.
    pub fn units(&self) -> UnitSystem {
        match self {
            Self::C => UnitSystem::Metric,
            Self::F => UnitSystem::Imperial,
        }
    }
}

impl FromStr for TempUnit {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" => Ok(Self::C),
            "F" => Ok(Self::F),
            other => Err(InvalidSetting::new(keys::TEMP_UNIT, other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

impl FromStr for Theme {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(InvalidSetting::new(keys::THEME, other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Tr,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Tr => "tr",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "tr" => Ok(Self::Tr),
            other => Err(InvalidSetting::new(keys::LANGUAGE, other)),
        }
    }
}

/// A tracked location. Identity is the exact `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub lat: String,
    pub lon: String,
    /// Filled in after the first successful weather fetch; never persisted.
    #[serde(skip)]
    pub timezone_offset_seconds: Option<i32>,
}

impl City {
    pub fn new(name: impl Into<String>, lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lat: lat.into(),
            lon: lon.into(),
            timezone_offset_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub time_format: TimeFormat,
    pub temp_unit: TempUnit,
    pub theme: Theme,
    pub language: Language,
    pub main_city: Option<City>,
    pub cities: Vec<City>,
    pub is_first_visit: bool,
    #[serde(skip)]
    system_theme: Theme,
}

impl Settings {
    /// Fresh settings for a store that has never been written.
    pub fn with_defaults(system_theme: Theme) -> Self {
        Self {
            time_format: TimeFormat::default(),
            temp_unit: TempUnit::default(),
            theme: system_theme,
            language: Language::default(),
            main_city: None,
            cities: Vec::new(),
            is_first_visit: true,
            system_theme,
        }
    }

    /// Hydrates settings from the store. Unreadable values fall back to their
    /// defaults instead of failing startup.
    pub async fn load<S: KeyValueStore>(store: &S, system_theme: Theme) -> Result<Self, StoreError> {
        let mut settings = Self::with_defaults(system_theme);

        if let Some(value) = store.get(keys::TIME_FORMAT).await? {
            settings.time_format = parse_or_default(&value);
        }
        if let Some(value) = store.get(keys::TEMP_UNIT).await? {
            settings.temp_unit = parse_or_default(&value);
        }
        if let Some(value) = store.get(keys::LANGUAGE).await? {
            settings.language = parse_or_default(&value);
        }
        if let Some(value) = store.get(keys::THEME).await? {
            settings.theme = value.parse().unwrap_or_else(|e: InvalidSetting| {
                tracing::warn!("{}, following system theme", e);
                system_theme
            });
        }

        if let Some(raw) = store.get(keys::CITIES).await? {
            settings.cities = serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable cities list: {}", e);
                Vec::new()
            });
        }

        match store.get(keys::MAIN_CITY).await? {
            Some(raw) => {
                settings.is_first_visit = false;
                settings.main_city = serde_json::from_str(&raw).unwrap_or_else(|e| {
                    tracing::warn!("Discarding unreadable main city: {}", e);
                    None
                });
            }
            None => settings.is_first_visit = true,
        }

        if settings.repair_cities() {
            tracing::warn!(
                "Stored city list broke its limits, repaired to main={:?} and {} secondary cities",
                settings.main_city.as_ref().map(|c| c.name.as_str()),
                settings.cities.len()
            );
        }

        tracing::debug!(
            "Loaded settings: language={}, unit={}, cities={}, first_visit={}",
            settings.language,
            settings.temp_unit.as_str(),
            settings.cities.len(),
            settings.is_first_visit
        );

        Ok(settings)
    }

    /// The OS-derived theme used when no explicit override is stored.
    pub fn system_theme(&self) -> Theme {
        self.system_theme
    }

    pub fn units(&self) -> UnitSystem {
        self.temp_unit.units()
    }

    /// Applies `theme`. The override is only stored when it differs from the
    /// system theme, so later OS changes are followed automatically.
    pub async fn set_theme<S: KeyValueStore>(&mut self, store: &S, theme: Theme) -> Result<(), StoreError> {
        if theme == self.system_theme {
            store.remove(keys::THEME).await?;
        } else {
            store.set(keys::THEME, theme.as_str()).await?;
        }
        self.theme = theme;
        Ok(())
    }

    /// Records a new OS preference. Returns `true` when the active theme
    /// followed it, which happens only when no override is stored.
    pub async fn follow_system_theme<S: KeyValueStore>(
        &mut self,
        store: &S,
        system_theme: Theme,
    ) -> Result<bool, StoreError> {
        self.system_theme = system_theme;
        if store.get(keys::THEME).await?.is_some() {
            return Ok(false);
        }
        let changed = self.theme != system_theme;
        self.theme = system_theme;
        Ok(changed)
    }

    pub async fn set_time_format<S: KeyValueStore>(
        &mut self,
        store: &S,
        time_format: TimeFormat,
    ) -> Result<(), StoreError> {
        store.set(keys::TIME_FORMAT, time_format.as_str()).await?;
        self.time_format = time_format;
        Ok(())
    }

    pub async fn set_temp_unit<S: KeyValueStore>(&mut self, store: &S, unit: TempUnit) -> Result<(), StoreError> {
        store.set(keys::TEMP_UNIT, unit.as_str()).await?;
        self.temp_unit = unit;
        Ok(())
    }

    pub async fn set_language<S: KeyValueStore>(&mut self, store: &S, language: Language) -> Result<(), StoreError> {
        store.set(keys::LANGUAGE, language.as_str()).await?;
        self.language = language;
        Ok(())
    }

    /// Writes `cities` and `mainCity` in a single atomic batch.
    pub async fn save_cities<S: KeyValueStore>(&self, store: &S) -> Result<(), StoreError> {
        let mut ops = vec![StoreOp::set(keys::CITIES, serde_json::to_string(&self.cities)?)];
        match &self.main_city {
            Some(main) => ops.push(StoreOp::set(keys::MAIN_CITY, serde_json::to_string(main)?)),
            None => ops.push(StoreOp::remove(keys::MAIN_CITY)),
        }
        store.apply_batch(ops).await
    }
}

fn parse_or_default<T>(value: &str) -> T
where
    T: FromStr<Err = InvalidSetting> + Default,
{
    value.parse().unwrap_or_else(|e: InvalidSetting| {
        tracing::warn!("{}, using default", e);
        T::default()
    })
}
