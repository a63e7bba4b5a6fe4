use std::time::Duration;

use shared::domain::{Settings, SettingsPatch};
use tokio::sync::RwLock;

use crate::{simulate, FaultInjector, LatencyProfile, Operation, RepositoryError};

/// Single settings document with get / update / reset-to-seed.
pub struct SettingsStore {
    current: RwLock<Settings>,
    seed: Settings,
    latency: LatencyProfile,
    faults: FaultInjector,
}

impl SettingsStore {
    pub fn new(seed: Settings) -> Self {
        Self::with_latency(seed, Self::default_latency())
    }

    pub fn default_latency() -> LatencyProfile {
        LatencyProfile {
            get_by_id: Duration::from_millis(150),
            update: Duration::from_millis(200),
            ..LatencyProfile::default()
        }
    }

    pub fn with_latency(seed: Settings, latency: LatencyProfile) -> Self {
        Self {
            current: RwLock::new(seed.clone()),
            seed,
            latency,
            faults: FaultInjector::default(),
        }
    }

    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    pub async fn get(&self) -> Result<Settings, RepositoryError> {
        simulate(&self.latency, &self.faults, "settings", Operation::GetById).await?;
        Ok(self.current.read().await.clone())
    }

    pub async fn update(&self, patch: SettingsPatch) -> Result<Settings, RepositoryError> {
        simulate(&self.latency, &self.faults, "settings", Operation::Update).await?;
        let mut current = self.current.write().await;
        current.apply(patch);
        Ok(current.clone())
    }

    pub async fn reset(&self) -> Result<Settings, RepositoryError> {
        simulate(&self.latency, &self.faults, "settings", Operation::Update).await?;
        let mut current = self.current.write().await;
        *current = self.seed.clone();
        Ok(current.clone())
    }
}
