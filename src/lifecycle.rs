use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cache::CACHE_TTL;
use crate::dashboard::Dashboard;
use crate::store::KeyValueStore;
use crate::view::Renderer;

pub const CLOCK_TICK: Duration = Duration::from_secs(1);

pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn start<S, R>(dashboard: Arc<Mutex<Dashboard<S, R>>>) -> Self
    where
        S: KeyValueStore,
        R: Renderer + 'static,
    {
        Self::with_periods(dashboard, CLOCK_TICK, CACHE_TTL)
    }

    pub fn with_periods<S, R>(dashboard: Arc<Mutex<Dashboard<S, R>>>, tick: Duration, sweep: Duration) -> Self
    where
        S: KeyValueStore,
        R: Renderer + 'static,
    {
        let clock_task = {
            let dashboard = dashboard.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    // A handler holding the dashboard means this tick is dropped
                    match dashboard.try_lock() {
                        Ok(mut dashboard) => dashboard.tick_clocks(),
                        Err(_) => tracing::trace!("Dashboard busy, skipping clock tick"),
                    }
                }
            })
        };

        let sweep_task = tokio::spawn(async move {
            // Startup already swept once
            let mut interval = tokio::time::interval_at(Instant::now() + sweep, sweep);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let gateway = dashboard.lock().await.gateway().clone();
                match gateway.cache().sweep().await {
                    Ok(removed) => tracing::info!("Hourly cache sweep removed {} entries", removed),
                    Err(e) => tracing::warn!("Cache sweep failed: {}", e),
                }
            }
        });

        tracing::info!("Background tasks started");
        Self {
            handles: vec![clock_task, sweep_task],
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        tracing::info!("Background tasks stopped");
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::ManualClock;
    use crate::cache::{CacheKey, CacheManager};
    use crate::config::Config;
    use crate::settings::{City, Language, Settings, TempUnit, Theme, TimeFormat, UnitSystem};
    use crate::store::MemoryStore;
    use crate::view::{CardSlot, CardView, ViewState};
    use crate::weather::openweather::OpenWeatherClient;
    use crate::weather::WeatherGateway;

    const T0: i64 = 1_700_000_000_000; // 22:13:20 UTC

    fn loaded_card() -> CardView {
        CardView {
            slot: CardSlot::Main,
            city_name: "Reykjavik".to_string(),
            local_time: "22:13".to_string(),
            icon_url: None,
            temperature: "2°C".to_string(),
            wind: "7 m/s".to_string(),
            humidity: "80%".to_string(),
            forecast: Vec::new(),
        }
    }

    fn session(store: &MemoryStore, clock: &ManualClock) -> Arc<Mutex<Dashboard<MemoryStore, ViewState>>> {
        // Never contacted
        let config = Config::for_base_url("http://127.0.0.1:9", Some("k"));
        let client = OpenWeatherClient::new(&config).unwrap();
        let cache = CacheManager::with_clock(store.clone(), Arc::new(clock.clone()));
        let gateway = Arc::new(WeatherGateway::new(client, cache));

        let mut settings = Settings::with_defaults(Theme::Dark);
        let mut city = City::new("Reykjavik", "64.14", "-21.94");
        city.timezone_offset_seconds = Some(0);
        settings.main_city = Some(city);
        settings.is_first_visit = false;

        let mut view = ViewState::new();
        view.render_card(loaded_card());
        Arc::new(Mutex::new(Dashboard::new(settings, gateway, view)))
    }

    async fn main_time(dashboard: &Arc<Mutex<Dashboard<MemoryStore, ViewState>>>) -> String {
        let dashboard = dashboard.lock().await;
        dashboard.renderer().card(CardSlot::Main).unwrap().local_time.clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_tick_updates_loaded_cards() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(T0);
        let dashboard = session(&store, &clock);
        let _tasks = BackgroundTasks::start(dashboard.clone());

        clock.advance(5 * 60 * 1000);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(main_time(&dashboard).await, "22:18");
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_dashboard_skips_tick() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(T0);
        let dashboard = session(&store, &clock);
        let _tasks = BackgroundTasks::start(dashboard.clone());

        let guard = dashboard.lock().await;
        clock.advance(60 * 1000);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(guard.renderer().card(CardSlot::Main).unwrap().local_time, "22:13");
        drop(guard);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(main_time(&dashboard).await, "22:14");
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep_drops_expired_entries() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(T0);
        let dashboard = session(&store, &clock);
        let cache = CacheManager::with_clock(store.clone(), Arc::new(clock.clone()));
        let key = CacheKey::weather("64.14", "-21.94", UnitSystem::Metric, Language::En);
        cache.put(&key, &serde_json::json!({"name": "Reykjavik"})).await.unwrap();

        let _tasks = BackgroundTasks::with_periods(dashboard, CLOCK_TICK, Duration::from_secs(10));
        clock.advance(CACHE_TTL.as_millis() as i64 + 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.get(&key.render()).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(store.get(&key.render()).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticks() {
        let store = MemoryStore::new();
        let clock = ManualClock::at(T0);
        let dashboard = session(&store, &clock);
        let mut tasks = BackgroundTasks::start(dashboard.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        tasks.stop();
        assert!(!tasks.is_running());

        clock.advance(10 * 60 * 1000);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(main_time(&dashboard).await, "22:13");

        // Time format is read on every tick
        let mut guard = dashboard.lock().await;
        guard
            .set_time_format(TimeFormat::Twelve)
            .await
            .unwrap();
        assert_eq!(guard.renderer().card(CardSlot::Main).unwrap().local_time, "10:23 PM");
        assert_eq!(guard.settings().temp_unit, TempUnit::C);
    }
}
