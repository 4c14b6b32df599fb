//! KV persistence for the last synchronized snapshot
//!
//! The whole snapshot lives under one key, so a successful sync replaces
//! portfolio, stats, taxes and transactions together.

use worker::Env;
use worker::kv::KvStore;

use crate::error::{PortfolioError, Result};
use crate::types::PortfolioSnapshot;

/// KV namespace binding
pub const KV_BINDING: &str = "STATE";

const SNAPSHOT_KEY: &str = "portfolio_snapshot";

/// Snapshot storage backed by Workers KV
pub struct SnapshotStore {
    kv: KvStore,
}

impl SnapshotStore {
    pub fn from_env(env: &Env) -> Result<Self> {
        let kv = env
            .kv(KV_BINDING)
            .map_err(|e| PortfolioError::Storage(format!("KV binding {KV_BINDING}: {e}")))?;
        Ok(Self { kv })
    }

    /// Last snapshot, `None` before the first sync
    pub async fn load(&self) -> Result<Option<PortfolioSnapshot>> {
        self.kv
            .get(SNAPSHOT_KEY)
            .json::<PortfolioSnapshot>()
            .await
            .map_err(|e| PortfolioError::Storage(e.to_string()))
    }

    /// Last snapshot, or `NotSynced`
    pub async fn require(&self) -> Result<PortfolioSnapshot> {
        self.load().await?.ok_or(PortfolioError::NotSynced)
    }

    pub async fn save(&self, snapshot: &PortfolioSnapshot) -> Result<()> {
        self.kv
            .put(SNAPSHOT_KEY, snapshot)
            .map_err(|e| PortfolioError::Storage(e.to_string()))?
            .execute()
            .await
            .map_err(|e| PortfolioError::Storage(e.to_string()))
    }
}
