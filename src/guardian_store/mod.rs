//! GuardianStore - Single Source of Truth for the alert contact
//!
//! ## Responsibilities
//!
//! - Persist the single guardian phone number (SQLite)
//! - Validate numbers before they are stored
//! - Serve cached reads to the frame loop (one read per frame otherwise)
//!
//! No other module stores the guardian number locally.

mod repository;
mod types;

pub use repository::GuardianRepository;
pub use types::{normalize_number, Guardian, SetGuardianRequest};

use crate::error::Result;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

/// GuardianStore instance
pub struct GuardianStore {
    repo: GuardianRepository,
    /// In-memory cache for frequent reads from the detection pipeline
    cache: RwLock<Option<Guardian>>,
}

impl GuardianStore {
    /// Create new GuardianStore, initializing the schema and cache
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let repo = GuardianRepository::new(pool);
        repo.init_schema().await?;

        let cached = repo.get().await?;
        tracing::info!(
            configured = cached.is_some(),
            "GuardianStore initialized"
        );

        Ok(Self {
            repo,
            cache: RwLock::new(cached),
        })
    }

    /// Get the guardian record
    pub async fn get(&self) -> Option<Guardian> {
        self.cache.read().await.clone()
    }

    /// Set the guardian number. The number is normalized and validated first.
    pub async fn set(&self, raw_number: &str) -> Result<Guardian> {
        let number = normalize_number(raw_number)?;
        let guardian = self.repo.set(&number).await?;

        {
            let mut cache = self.cache.write().await;
            *cache = Some(guardian.clone());
        }

        tracing::info!(number = %guardian.number, "Guardian number updated");
        Ok(guardian)
    }

    /// Remove the guardian record
    pub async fn clear(&self) -> Result<()> {
        self.repo.clear().await?;

        {
            let mut cache = self.cache.write().await;
            *cache = None;
        }

        tracing::info!("Guardian number cleared");
        Ok(())
    }

    /// True when a guardian number is stored
    pub async fn is_configured(&self) -> bool {
        self.cache.read().await.is_some()
    }
}
