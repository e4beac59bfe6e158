use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cities::CityTracking;
use crate::settings::{Settings, TempUnit, Theme, TimeFormat};
use crate::utils;
use crate::weather::daily::select_daily;
use crate::weather::types::{ForecastResponse, GeocodeResponse, WeatherResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSlot {
    Main,
    Left,
    Right,
}

impl CardSlot {
    pub const ALL: [CardSlot; 3] = [CardSlot::Main, CardSlot::Left, CardSlot::Right];

    /// Slot of the secondary city at `index`.
    pub fn secondary(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDayView {
    pub day: String,
    pub icon_url: String,
    pub temperature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub slot: CardSlot,
    pub city_name: String,
    pub local_time: String,
    pub icon_url: Option<String>,
    pub temperature: String,
    pub wind: String,
    pub humidity: String,
    pub forecast: Vec<ForecastDayView>,
}

impl CardView {
    pub fn build(
        slot: CardSlot,
        city_name: &str,
        weather: &WeatherResponse,
        forecast: &ForecastResponse,
        unit: TempUnit,
        time_format: TimeFormat,
        now: DateTime<Utc>,
    ) -> Self {
        let forecast = select_daily(forecast)
            .into_iter()
            .map(|item| ForecastDayView {
                day: utils::weekday_label(item.dt).to_string(),
                icon_url: item.icon().map(utils::icon_url).unwrap_or_default(),
                temperature: utils::format_temperature(item.main.temp, unit),
            })
            .collect();

        Self {
            slot,
            city_name: city_name.to_string(),
            local_time: utils::format_local_time(now, weather.timezone, time_format),
            icon_url: weather.icon().map(utils::icon_url),
            temperature: utils::format_temperature(weather.main.temp, unit),
            wind: utils::format_wind(weather.wind.speed),
            humidity: utils::format_humidity(weather.main.humidity),
            forecast,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CardState {
    /// Empty slot. `clickable` is false once no more cities can be added.
    Placeholder { clickable: bool },
    Loaded(CardView),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CityListView {
    pub main: Option<String>,
    pub secondary: Vec<String>,
    pub can_add: bool,
    pub tracking: CityTracking,
}

impl CityListView {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            main: settings.main_city.as_ref().map(|c| c.name.clone()),
            secondary: settings.cities.iter().map(|c| c.name.clone()).collect(),
            can_add: settings.can_add_city(),
            tracking: settings.tracking(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionView {
    pub name: String,
    pub region: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<&GeocodeResponse> for SuggestionView {
    fn from(candidate: &GeocodeResponse) -> Self {
        Self {
            name: candidate.name.clone(),
            region: candidate.region(),
            lat: candidate.lat,
            lon: candidate.lon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPurpose {
    Main,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Sink for everything the dashboard wants on screen.
pub trait Renderer: Send {
    fn render_theme(&mut self, theme: Theme);
    fn render_texts(&mut self, texts: BTreeMap<String, String>);
    fn render_city_list(&mut self, list: CityListView);
    fn render_card(&mut self, card: CardView);
    fn render_placeholder(&mut self, slot: CardSlot, clickable: bool);
    fn render_clock(&mut self, slot: CardSlot, time: String);
    fn open_city_search(&mut self, purpose: SearchPurpose);
    fn notify(&mut self, notice: Notice);
}

const MAX_NOTICES: usize = 20;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewState {
    pub theme: Option<Theme>,
    pub texts: BTreeMap<String, String>,
    pub city_list: CityListView,
    pub cards: BTreeMap<CardSlot, CardState>,
    pub search: Option<SearchPurpose>,
    pub notices: Vec<Notice>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card(&self, slot: CardSlot) -> Option<&CardView> {
        match self.cards.get(&slot) {
            Some(CardState::Loaded(card)) => Some(card),
            _ => None,
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

impl Renderer for ViewState {
    fn render_theme(&mut self, theme: Theme) {
        self.theme = Some(theme);
    }

    fn render_texts(&mut self, texts: BTreeMap<String, String>) {
        self.texts = texts;
    }

    fn render_city_list(&mut self, list: CityListView) {
        self.city_list = list;
    }

    fn render_card(&mut self, card: CardView) {
        self.cards.insert(card.slot, CardState::Loaded(card));
    }

    fn render_placeholder(&mut self, slot: CardSlot, clickable: bool) {
        self.cards.insert(slot, CardState::Placeholder { clickable });
    }

    fn render_clock(&mut self, slot: CardSlot, time: String) {
        if let Some(CardState::Loaded(card)) = self.cards.get_mut(&slot) {
            card.local_time = time;
        }
    }

    fn open_city_search(&mut self, purpose: SearchPurpose) {
        self.search = Some(purpose);
    }

    fn notify(&mut self, notice: Notice) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.remove(0);
        }
        self.notices.push(notice);
    }
}
