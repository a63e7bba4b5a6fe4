//! Product search session with persisted query history.

use std::sync::Arc;

use serde::Serialize;
use shared::{
    domain::Product,
    error::{FailureContext, SessionFailure},
};
use storage::{KeyValueStore, MockRepository};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::{
    error::SessionError,
    events::{SessionEvent, SessionPhase},
    history::SearchHistory,
    SessionConfig,
};

/// Suggestions offered before the user has typed anything.
pub const QUICK_SEARCHES: &[&str] = &[
    "bluetooth headphones",
    "smartwatch",
    "phone case",
    "running shoes",
    "mechanical keyboard",
    "yoga mat",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank query; results and active query were cleared.
    Cleared,
    Completed { result_count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchView {
    pub phase: SessionPhase,
    pub query: Option<String>,
    pub results: Vec<Product>,
    pub history: Vec<String>,
    pub loading: bool,
    pub error: Option<SessionFailure>,
}

struct SearchState {
    phase: SessionPhase,
    generation: u64,
    query: Option<String>,
    results: Vec<Product>,
    history: SearchHistory,
    error: Option<SessionFailure>,
}

pub struct SearchSession {
    catalog: Arc<MockRepository<Product>>,
    store: Arc<dyn KeyValueStore>,
    config: SessionConfig,
    inner: Mutex<SearchState>,
    /// Held from the history change until its store write finishes.
    writes: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SearchSession {
    /// Builds the session and restores history from `store`.
    pub fn new(
        catalog: Arc<MockRepository<Product>>,
        store: Arc<dyn KeyValueStore>,
        config: SessionConfig,
    ) -> Self {
        let history = load_history(store.as_ref(), &config);
        let (events, _) = broadcast::channel(256);
        Self {
            catalog,
            store,
            config,
            inner: Mutex::new(SearchState {
                phase: SessionPhase::Idle,
                generation: 0,
                query: None,
                results: Vec::new(),
                history,
                error: None,
            }),
            writes: Mutex::new(()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SearchView {
        let state = self.inner.lock().await;
        SearchView {
            phase: state.phase,
            query: state.query.clone(),
            results: state.results.clone(),
            history: state.history.entries().to_vec(),
            loading: state.phase == SessionPhase::Loading,
            error: state.error.clone(),
        }
    }

    pub async fn history(&self) -> Vec<String> {
        self.inner.lock().await.history.entries().to_vec()
    }

    /// Runs `query` against the catalog. A blank query clears the results
    /// without touching the catalog.
    ///
    /// Searches may finish out of order; only the most recently issued one
    /// is applied, older ones resolve to [`SessionError::Superseded`]. On
    /// failure the previous results stay visible.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            let mut state = self.inner.lock().await;
            state.generation += 1;
            state.query = None;
            state.results.clear();
            state.error = None;
            self.transition(&mut state, SessionPhase::Idle);
            self.emit(SessionEvent::SearchCleared);
            return Ok(SearchOutcome::Cleared);
        }

        let generation = {
            let mut state = self.inner.lock().await;
            state.generation += 1;
            state.query = Some(query.to_string());
            state.error = None;
            self.transition(&mut state, SessionPhase::Loading);
            state.generation
        };
        debug!(query, generation, "searching products");

        let found = self.catalog.search(query, self.config.search_limit).await;

        let mut state = self.inner.lock().await;
        if state.generation != generation {
            info!(query, generation, "discarding result of superseded search");
            self.emit(SessionEvent::StaleResultDiscarded {
                operation: "search",
                generation,
            });
            return Err(SessionError::Superseded);
        }
        match found {
            Ok(products) => {
                let result_count = products.len();
                state.results = products;
                self.transition(&mut state, SessionPhase::Ready);
                self.emit(SessionEvent::SearchCompleted {
                    query: query.to_string(),
                    result_count,
                });
                Ok(SearchOutcome::Completed { result_count })
            }
            Err(err) => {
                let error = SessionError::from(err);
                warn!(query, error = %error, "product search failed");
                let failure = error.to_failure(FailureContext::Search);
                state.error = Some(failure.clone());
                self.transition(&mut state, SessionPhase::Error);
                self.emit(SessionEvent::Failure(failure));
                Err(error)
            }
        }
    }

    /// Records `query` in history, then searches for it.
    pub async fn submit(&self, query: &str) -> Result<SearchOutcome, SessionError> {
        if let Err(err) = self.record_history(query).await {
            warn!(error = %err, "continuing search without saving history");
        }
        self.search(query).await
    }

    /// Re-runs the active query after a failed search.
    pub async fn retry(&self) -> Result<SearchOutcome, SessionError> {
        let query = {
            let state = self.inner.lock().await;
            match (&state.phase, &state.query) {
                (SessionPhase::Error, Some(query)) => query.clone(),
                _ => return Err(SessionError::NothingToRetry),
            }
        };
        self.search(&query).await
    }

    /// Moves `query` to the front of the history and writes the list to the
    /// store. Returns `false` for a blank query.
    pub async fn record_history(&self, query: &str) -> Result<bool, SessionError> {
        let (encoded, write) = {
            let mut state = self.inner.lock().await;
            if !state.history.record(query) {
                return Ok(false);
            }
            let entries = state.history.entries().to_vec();
            self.emit(SessionEvent::HistoryUpdated(entries));

            let encoded = state
                .history
                .to_json()
                .map_err(|err| SessionError::Store(err.into()))?;
            (encoded, self.writes.lock().await)
        };

        let key = self.config.history_key.clone();
        self.persist(write, move |store| store.set(&key, &encoded)).await?;
        Ok(true)
    }

    pub async fn clear_history(&self) -> Result<(), SessionError> {
        let write = {
            let mut state = self.inner.lock().await;
            state.history.clear();
            self.emit(SessionEvent::HistoryUpdated(Vec::new()));
            self.writes.lock().await
        };

        let key = self.config.history_key.clone();
        self.persist(write, move |store| store.remove(&key)).await
    }

    /// Highest-rated products, for the landing page.
    pub async fn popular_products(&self, limit: usize) -> Result<Vec<Product>, SessionError> {
        Ok(self.catalog.popular(limit).await?)
    }

    pub async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, SessionError> {
        Ok(self.catalog.by_category(category).await?)
    }

    /// Runs a store write on the blocking pool. `write` is taken while the
    /// state lock is still held, so writes reach the store in the order the
    /// history changed.
    async fn persist<F>(&self, write: MutexGuard<'_, ()>, op: F) -> Result<(), SessionError>
    where
        F: FnOnce(&dyn KeyValueStore) -> anyhow::Result<()> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let written = tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|written| written);
        drop(write);

        match written {
            Ok(()) => Ok(()),
            Err(err) => {
                let mut state = self.inner.lock().await;
                Err(self.history_failure(&mut state, err))
            }
        }
    }

    fn history_failure(&self, state: &mut SearchState, err: anyhow::Error) -> SessionError {
        warn!(key = %self.config.history_key, error = %err, "persisting search history failed");
        let error = SessionError::Store(err);
        let failure = error.to_failure(FailureContext::History);
        state.error = Some(failure.clone());
        self.emit(SessionEvent::Failure(failure));
        error
    }

    fn transition(&self, state: &mut SearchState, phase: SessionPhase) {
        if state.phase != phase {
            state.phase = phase;
            self.emit(SessionEvent::PhaseChanged(phase));
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

fn load_history(store: &dyn KeyValueStore, config: &SessionConfig) -> SearchHistory {
    let raw = match store.get(&config.history_key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return SearchHistory::new(config.history_limit),
        Err(err) => {
            warn!(key = %config.history_key, error = %err, "reading search history failed");
            return SearchHistory::new(config.history_limit);
        }
    };
    SearchHistory::from_json(&raw, config.history_limit).unwrap_or_else(|err| {
        warn!(key = %config.history_key, error = %err, "ignoring corrupt search history");
        SearchHistory::new(config.history_limit)
    })
}

#[cfg(test)]
#[path = "tests/search_tests.rs"]
mod tests;
