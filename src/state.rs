use crate::config::AppConfig;
use crate::ledger::repo::{LedgerStore, SqliteLedgerStore};
use anyhow::Context;
use std::sync::Arc;
use time::{Date, PrimitiveDateTime};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let ledger = Arc::new(
            SqliteLedgerStore::connect(&config)
                .await
                .context("open ledger store")?,
        ) as Arc<dyn LedgerStore>;

        Ok(Self { ledger, config })
    }

    #[cfg(test)]
    pub fn from_parts(ledger: Arc<dyn LedgerStore>, config: Arc<AppConfig>) -> Self {
        Self { ledger, config }
    }

    pub fn now(&self) -> PrimitiveDateTime {
        self.config.local_now()
    }

    pub fn today(&self) -> Date {
        self.now().date()
    }

    #[cfg(test)]
    pub async fn in_memory() -> Self {
        use crate::config::StoreConfig;
        use std::time::Duration;

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            store: StoreConfig {
                max_connections: 1,
                timeout: Duration::from_secs(5),
            },
            utc_offset: time::UtcOffset::UTC,
        });
        let ledger = Arc::new(crate::ledger::repo::in_memory_store().await) as Arc<dyn LedgerStore>;
        Self::from_parts(ledger, config)
    }
}
