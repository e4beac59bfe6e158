use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::i18n;
use crate::settings::Language;
use crate::store::KeyValueStore;
use crate::view::SuggestionView;
use crate::weather::WeatherGateway;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Latest suggestion list published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Suggestions {
    pub query: String,
    pub candidates: Vec<SuggestionView>,
    pub error: Option<String>,
}

pub struct SearchDebouncer<S> {
    gateway: Arc<WeatherGateway<S>>,
    quiet_period: Duration,
    pending: Option<JoinHandle<()>>,
    results: watch::Sender<Suggestions>,
}

impl<S: KeyValueStore> SearchDebouncer<S> {
    pub fn new(gateway: Arc<WeatherGateway<S>>) -> Self {
        Self::with_quiet_period(gateway, SEARCH_DEBOUNCE)
    }

    pub fn with_quiet_period(gateway: Arc<WeatherGateway<S>>, quiet_period: Duration) -> Self {
        let (results, _) = watch::channel(Suggestions::default());
        Self {
            gateway,
            quiet_period,
            pending: None,
            results,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Suggestions> {
        self.results.subscribe()
    }

    pub fn latest(&self) -> Suggestions {
        self.results.borrow().clone()
    }

    /// Restarts the quiet period for `query`. Blank input cancels the pending
    /// search and clears the suggestions.
    pub fn input(&mut self, query: &str, language: Language) {
        self.cancel();

        let query = query.trim().to_string();
        if query.is_empty() {
            self.results.send_replace(Suggestions::default());
            return;
        }

        let gateway = self.gateway.clone();
        let results = self.results.clone();
        let quiet_period = self.quiet_period;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;

            // Only the timer is cancellable; a request already on the wire
            // runs to completion and the last response to land wins.
            tokio::spawn(async move {
                let suggestions = match gateway.search_cities(&query, language).await {
                    Ok(candidates) => Suggestions {
                        candidates: candidates.iter().map(SuggestionView::from).collect(),
                        query,
                        error: None,
                    },
                    Err(e) => Suggestions {
                        query,
                        candidates: Vec::new(),
                        error: Some(format!(
                            "{}. {}",
                            i18n::translate(language, e.kind.notice_key()),
                            e.message
                        )),
                    },
                };
                results.send_replace(suggestions);
            });
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<S> Drop for SearchDebouncer<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
