use std::{
    fmt,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
    time::Duration,
};

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

mod entities;
pub mod kv;
mod seed;
mod settings;

pub use entities::{
    ConversationPatch, NewConversation, NewTemplate, TemplatePatch, SEARCH_RESULT_LIMIT,
};
pub use kv::{JsonFileStore, KeyValueStore, MemoryKeyValueStore};
pub use seed::{Repositories, SeedSnapshot};
pub use settings::SettingsStore;

/// A record kind a [`MockRepository`] can own.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + fmt::Display + From<i64> + Into<i64> + Send + Sync;
    type Draft: Send;
    type Patch: Send;

    const NAME: &'static str;

    fn id(&self) -> Self::Id;
    fn from_draft(id: Self::Id, draft: Self::Draft, now: DateTime<Utc>) -> Self;
    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    fn default_latency() -> LatencyProfile {
        LatencyProfile::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetAll,
    GetById,
    Create,
    Update,
    Delete,
    Append,
    Search,
    Query,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GetAll => "get_all",
            Operation::GetById => "get_by_id",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Append => "append",
            Operation::Search => "search",
            Operation::Query => "query",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} service unavailable during {operation}")]
    Unavailable {
        entity: &'static str,
        operation: Operation,
    },
}

/// Simulated round-trip time per operation, plus optional random jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyProfile {
    pub get_all: Duration,
    pub get_by_id: Duration,
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
    pub append: Duration,
    pub search: Duration,
    pub query: Duration,
    pub jitter: Duration,
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            get_all: Duration::from_millis(200),
            get_by_id: Duration::from_millis(150),
            create: Duration::from_millis(300),
            update: Duration::from_millis(250),
            delete: Duration::from_millis(200),
            append: Duration::from_millis(300),
            search: Duration::from_millis(400),
            query: Duration::from_millis(200),
            jitter: Duration::ZERO,
        }
    }
}

impl LatencyProfile {
    pub fn instant() -> Self {
        Self::uniform(Duration::ZERO)
    }

    pub fn uniform(delay: Duration) -> Self {
        Self {
            get_all: delay,
            get_by_id: delay,
            create: delay,
            update: delay,
            delete: delay,
            append: delay,
            search: delay,
            query: delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn conversations() -> Self {
        Self {
            get_all: Duration::from_millis(300),
            get_by_id: Duration::from_millis(200),
            create: Duration::from_millis(400),
            update: Duration::from_millis(350),
            delete: Duration::from_millis(250),
            append: Duration::from_millis(300),
            ..Self::default()
        }
    }

    pub fn products() -> Self {
        Self {
            get_all: Duration::from_millis(300),
            get_by_id: Duration::from_millis(200),
            search: Duration::from_millis(800),
            query: Duration::from_millis(400),
            ..Self::default()
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Multiplies every delay by `factor`; `0.0` turns the profile instant.
    pub fn scaled(self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        let scale = |d: Duration| d.mul_f64(factor);
        Self {
            get_all: scale(self.get_all),
            get_by_id: scale(self.get_by_id),
            create: scale(self.create),
            update: scale(self.update),
            delete: scale(self.delete),
            append: scale(self.append),
            search: scale(self.search),
            query: scale(self.query),
            jitter: scale(self.jitter),
        }
    }

    pub fn delay(&self, operation: Operation) -> Duration {
        let base = match operation {
            Operation::GetAll => self.get_all,
            Operation::GetById => self.get_by_id,
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
            Operation::Append => self.append,
            Operation::Search => self.search,
            Operation::Query => self.query,
        };
        if self.jitter.is_zero() {
            return base;
        }
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Makes the simulated backend fail on demand.
#[derive(Debug, Default)]
pub struct FaultInjector {
    remaining: AtomicU32,
    always: AtomicBool,
}

impl FaultInjector {
    /// The next `count` operations fail, whatever they are.
    pub fn fail_next(&self, count: u32) {
        self.remaining.store(count, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.always.store(failing, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.remaining.store(0, Ordering::SeqCst);
        self.always.store(false, Ordering::SeqCst);
    }

    pub(crate) fn check(
        &self,
        entity: &'static str,
        operation: Operation,
    ) -> Result<(), RepositoryError> {
        let triggered = self.always.load(Ordering::SeqCst)
            || self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if triggered {
            warn!(entity, %operation, "injected backend failure");
            return Err(RepositoryError::Unavailable { entity, operation });
        }
        Ok(())
    }
}

pub(crate) async fn simulate(
    latency: &LatencyProfile,
    faults: &FaultInjector,
    entity: &'static str,
    operation: Operation,
) -> Result<(), RepositoryError> {
    let delay = latency.delay(operation);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    faults.check(entity, operation)
}

/// In-memory CRUD store over a seeded collection.
///
/// Every call waits out its simulated latency before touching the
/// collection, and every record handed out is a copy. Id allocation happens
/// under the write lock, so overlapping creates never share an id.
pub struct MockRepository<T: Entity> {
    records: RwLock<Vec<T>>,
    latency: LatencyProfile,
    faults: FaultInjector,
}

impl<T: Entity> MockRepository<T> {
    pub fn new(seed: Vec<T>, latency: LatencyProfile) -> Self {
        Self {
            records: RwLock::new(seed),
            latency,
            faults: FaultInjector::default(),
        }
    }

    pub fn seeded(seed: Vec<T>) -> Self {
        Self::new(seed, T::default_latency())
    }

    pub fn empty(latency: LatencyProfile) -> Self {
        Self::new(Vec::new(), latency)
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Number of stored records, without simulated latency.
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn get_all(&self) -> Result<Vec<T>, RepositoryError> {
        self.simulate(Operation::GetAll).await?;
        Ok(self.records.read().await.clone())
    }

    pub async fn get_by_id(&self, id: T::Id) -> Result<Option<T>, RepositoryError> {
        self.simulate(Operation::GetById).await?;
        let records = self.records.read().await;
        Ok(records.iter().find(|record| record.id() == id).cloned())
    }

    pub async fn create(&self, draft: T::Draft) -> Result<T, RepositoryError> {
        self.simulate(Operation::Create).await?;

        let mut records = self.records.write().await;
        let next = records
            .iter()
            .map(|record| -> i64 { record.id().into() })
            .fold(0, i64::max)
            + 1;
        let record = T::from_draft(T::Id::from(next), draft, Utc::now());
        records.push(record.clone());
        debug!(entity = T::NAME, id = next, "created record");
        Ok(record)
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<Option<T>, RepositoryError> {
        self.simulate(Operation::Update).await?;

        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|record| record.id() == id) else {
            return Ok(None);
        };
        record.apply_patch(patch, Utc::now());
        Ok(Some(record.clone()))
    }

    pub async fn delete(&self, id: T::Id) -> Result<bool, RepositoryError> {
        self.simulate(Operation::Delete).await?;

        let mut records = self.records.write().await;
        let Some(index) = records.iter().position(|record| record.id() == id) else {
            return Ok(false);
        };
        records.remove(index);
        debug!(entity = T::NAME, %id, "deleted record");
        Ok(true)
    }

    async fn simulate(&self, operation: Operation) -> Result<(), RepositoryError> {
        simulate(&self.latency, &self.faults, T::NAME, operation).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
