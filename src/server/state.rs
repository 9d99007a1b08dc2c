use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::providers::JenkinsProvider;

use super::postgres::PgStore;
use super::store::{MemoryStore, Store};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jenkins: JenkinsProvider,
    pub jobs: Vec<String>,
    started_at: Instant,
    requests: AtomicU64,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, jenkins: JenkinsProvider, jobs: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            store,
            jenkins,
            jobs,
            started_at: Instant::now(),
            requests: AtomicU64::new(0),
        })
    }

    /// Builds the store and Jenkins provider described by `config`.
    pub async fn from_config(config: &Config) -> Result<Arc<Self>> {
        let store: Arc<dyn Store> = match &config.server.database_url {
            Some(url) => Arc::new(PgStore::connect(url).await?),
            None if config.server.seed_demo_data => {
                warn!("No database URL configured, serving seeded in-memory data");
                Arc::new(MemoryStore::seeded())
            }
            None => {
                warn!("No database URL configured, serving an empty in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let jenkins = JenkinsProvider::new(
            &config.jenkins.url,
            config.jenkins.credentials(),
            config.jenkins.timeout(),
        )?;

        if config.jenkins.jobs.is_empty() {
            warn!("No Jenkins jobs configured; the pipeline status endpoint will report none");
        } else {
            info!("Monitoring Jenkins jobs: {}", config.jenkins.jobs.join(", "));
        }

        Ok(Self::new(store, jenkins, config.jenkins.jobs.clone()))
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_served(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
