//! One dashboard session: owns the settings, drives the gateways and pushes
//! view-models to a [`Renderer`].
//!
//! Every operation takes `&mut self` and runs to completion; callers that
//! share a dashboard (HTTP handlers, timers) serialise access through a
//! mutex.

use std::sync::Arc;
use thiserror::Error;

use crate::cache::{Clock, CACHE_PREFIXES};
use crate::cities::{Placement, ValidationError};
use crate::i18n;
use crate::settings::{City, Language, Settings, TempUnit, Theme, TimeFormat};
use crate::store::{KeyValueStore, StoreError};
use crate::utils;
use crate::view::{CardSlot, CardView, CityListView, Notice, Renderer, SearchPurpose};
use crate::weather::{FetchError, WeatherGateway};

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Dashboard<S, R> {
    settings: Settings,
    store: S,
    gateway: Arc<WeatherGateway<S>>,
    renderer: R,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore, R: Renderer> Dashboard<S, R> {
    /// Hydrates settings from the gateway's backing store.
    pub async fn load(gateway: Arc<WeatherGateway<S>>, renderer: R, system_theme: Theme) -> Result<Self, StoreError> {
        let store = gateway.cache().store().clone();
        let settings = Settings::load(&store, system_theme).await?;
        Ok(Self::new(settings, gateway, renderer))
    }

    pub fn new(settings: Settings, gateway: Arc<WeatherGateway<S>>, renderer: R) -> Self {
        Self {
            settings,
            store: gateway.cache().store().clone(),
            clock: gateway.cache().clock(),
            gateway,
            renderer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn gateway(&self) -> &Arc<WeatherGateway<S>> {
        &self.gateway
    }

    /// Initial paint. A first visit opens the main-city search instead of
    /// loading cards.
    pub async fn start(&mut self) -> Result<(), DashboardError> {
        if let Err(e) = self.gateway.cache().sweep().await {
            tracing::warn!("Startup cache sweep failed: {}", e);
        }

        self.renderer.render_texts(i18n::texts(self.settings.language));
        self.renderer.render_theme(self.settings.theme);
        self.render_city_list();

        if self.settings.is_first_visit || self.settings.main_city.is_none() {
            tracing::info!("First visit, asking for a main city");
            self.renderer.render_placeholder(CardSlot::Main, true);
            self.render_empty_slots();
            self.renderer.open_city_search(SearchPurpose::Main);
            return Ok(());
        }

        self.refresh_all_cards().await;
        Ok(())
    }

    /// Placeholder click. The secondary search only opens while there is room
    /// for another city.
    pub fn open_city_search(&mut self, purpose: SearchPurpose) -> bool {
        if purpose == SearchPurpose::Secondary && !self.settings.can_add_city() {
            return false;
        }
        self.renderer.open_city_search(purpose);
        true
    }

    pub async fn add_city(&mut self, city: City) -> Result<(), DashboardError> {
        let placement = match self.settings.try_add_city(city) {
            Ok(placement) => placement,
            Err(e) => {
                tracing::debug!("Rejected city: {}", e);
                self.notify_key(e.notice_key());
                return Err(e.into());
            }
        };

        self.settings.save_cities(&self.store).await?;
        self.render_city_list();

        match placement {
            Placement::Main => self.refresh_all_cards().await,
            Placement::Secondary(index) => {
                if let Some(slot) = CardSlot::secondary(index) {
                    self.refresh_slot(slot).await;
                }
                self.render_empty_slots();
            }
        }
        Ok(())
    }

    /// Removing an untracked name is a no-op.
    pub async fn remove_city(&mut self, name: &str) -> Result<(), DashboardError> {
        if !self.settings.remove_secondary(name) {
            return Ok(());
        }

        self.settings.save_cities(&self.store).await?;
        self.render_city_list();
        self.refresh_all_cards().await;
        Ok(())
    }

    pub async fn set_main_city(&mut self, city: City) -> Result<(), DashboardError> {
        self.settings.replace_main(city);
        self.persist_and_refresh().await
    }

    pub async fn promote_to_main(&mut self, name: &str) -> Result<(), DashboardError> {
        if !self.settings.promote_to_main(name) {
            tracing::debug!("Cannot promote untracked city {}", name);
            return Ok(());
        }
        self.persist_and_refresh().await
    }

    pub async fn choose_main_from_search(&mut self, city: City) -> Result<(), DashboardError> {
        self.settings.choose_main(city);
        self.persist_and_refresh().await
    }

    /// Switches the UI language. Cached responses carry localized names, so
    /// every cache entry is dropped and tracked cities are renamed from fresh
    /// responses.
    pub async fn change_language(&mut self, language: Language) -> Result<(), DashboardError> {
        if language == self.settings.language {
            self.renderer.render_texts(i18n::texts(language));
            return Ok(());
        }

        self.settings.set_language(&self.store, language).await?;
        let removed = self.gateway.cache().invalidate_by_prefix(&CACHE_PREFIXES).await?;
        tracing::info!("Language set to {}, dropped {} cache entries", language, removed);

        let units = self.settings.units();
        let targets: Vec<(String, String, String)> = self
            .tracked_cities()
            .map(|c| (c.name.clone(), c.lat.clone(), c.lon.clone()))
            .collect();

        for (name, lat, lon) in targets {
            match self.gateway.fetch_weather(&lat, &lon, units, language).await {
                Ok(weather) => self.rename_city(&name, &weather.name, weather.timezone),
                Err(e) => self.notify_fetch(&e),
            }
        }

        self.settings.save_cities(&self.store).await?;
        self.renderer.render_texts(i18n::texts(language));
        self.render_city_list();
        self.refresh_all_cards().await;
        Ok(())
    }

    pub async fn set_theme(&mut self, theme: Theme) -> Result<(), DashboardError> {
        self.settings.set_theme(&self.store, theme).await?;
        self.renderer.render_theme(theme);
        Ok(())
    }

    pub async fn on_system_theme_changed(&mut self, system_theme: Theme) -> Result<(), DashboardError> {
        if self.settings.follow_system_theme(&self.store, system_theme).await? {
            self.renderer.render_theme(self.settings.theme);
        }
        Ok(())
    }

    /// Only the clocks depend on the time format.
    pub async fn set_time_format(&mut self, time_format: TimeFormat) -> Result<(), DashboardError> {
        self.settings.set_time_format(&self.store, time_format).await?;
        self.tick_clocks();
        Ok(())
    }

    pub async fn set_temp_unit(&mut self, unit: TempUnit) -> Result<(), DashboardError> {
        self.settings.set_temp_unit(&self.store, unit).await?;
        self.refresh_all_cards().await;
        Ok(())
    }

    /// Re-renders the main card, then the secondary slots. A card is only
    /// replaced when both its weather and forecast fetches succeed.
    pub async fn refresh_all_cards(&mut self) {
        for slot in CardSlot::ALL {
            self.refresh_slot(slot).await;
        }
    }

    /// Recomputes every loaded card's local time from its stored offset.
    pub fn tick_clocks(&mut self) {
        let now = utils::datetime_from_ms(self.clock.now_ms());
        let time_format = self.settings.time_format;

        for slot in CardSlot::ALL {
            let offset = self.city_in(slot).and_then(|c| c.timezone_offset_seconds);
            if let Some(offset) = offset {
                self.renderer
                    .render_clock(slot, utils::format_local_time(now, offset, time_format));
            }
        }
    }

    async fn persist_and_refresh(&mut self) -> Result<(), DashboardError> {
        self.settings.save_cities(&self.store).await?;
        self.render_city_list();
        self.refresh_all_cards().await;
        Ok(())
    }

    async fn refresh_slot(&mut self, slot: CardSlot) {
        let Some(city) = self.city_in(slot).cloned() else {
            let clickable = slot == CardSlot::Main || self.settings.can_add_city();
            self.renderer.render_placeholder(slot, clickable);
            return;
        };

        let units = self.settings.units();
        let language = self.settings.language;
        let (weather, forecast) = tokio::join!(
            self.gateway.fetch_weather(&city.lat, &city.lon, units, language),
            self.gateway.fetch_forecast(&city.lat, &city.lon, units, language),
        );

        match (weather, forecast) {
            (Ok(weather), Ok(forecast)) => {
                if let Some(tracked) = self.settings.find_city_mut(&city.name) {
                    tracked.timezone_offset_seconds = Some(weather.timezone);
                }
                let card = CardView::build(
                    slot,
                    &city.name,
                    &weather,
                    &forecast,
                    self.settings.temp_unit,
                    self.settings.time_format,
                    utils::datetime_from_ms(self.clock.now_ms()),
                );
                self.renderer.render_card(card);
            }
            (weather, forecast) => {
                for e in [weather.err(), forecast.err()].into_iter().flatten() {
                    self.notify_fetch(&e);
                }
            }
        }
    }

    fn city_in(&self, slot: CardSlot) -> Option<&City> {
        match slot {
            CardSlot::Main => self.settings.main_city.as_ref(),
            CardSlot::Left => self.settings.cities.first(),
            CardSlot::Right => self.settings.cities.get(1),
        }
    }

    fn tracked_cities(&self) -> impl Iterator<Item = &City> {
        self.settings.main_city.iter().chain(self.settings.cities.iter())
    }

    // A localized name that collides with another tracked city is not applied.
    fn rename_city(&mut self, name: &str, localized: &str, timezone: i32) {
        let changed = !localized.is_empty() && localized != name;
        let collides = changed && self.settings.is_tracked(localized);
        if collides {
            tracing::warn!("Keeping {}: localized name {} is already tracked", name, localized);
        }

        if let Some(city) = self.settings.find_city_mut(name) {
            if changed && !collides {
                city.name = localized.to_string();
            }
            city.timezone_offset_seconds = Some(timezone);
        }
    }

    fn render_city_list(&mut self) {
        self.renderer.render_city_list(CityListView::from_settings(&self.settings));
    }

    fn render_empty_slots(&mut self) {
        let clickable = self.settings.can_add_city();
        for (index, slot) in [CardSlot::Left, CardSlot::Right].into_iter().enumerate() {
            if index >= self.settings.cities.len() {
                self.renderer.render_placeholder(slot, clickable);
            }
        }
    }

    fn notify_key(&mut self, key: &str) {
        let message = i18n::translate(self.settings.language, key).to_string();
        self.renderer.notify(Notice::new(message));
    }

    fn notify_fetch(&mut self, error: &FetchError) {
        let prefix = i18n::translate(self.settings.language, error.kind.notice_key());
        self.renderer
            .notify(Notice::new(format!("{}. {}", prefix, error.message)));
    }
}
