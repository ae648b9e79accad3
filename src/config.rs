use std::time::Duration;

use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub max_connections: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub store: StoreConfig,
    /// Offset used to decide which calendar day "today" is.
    pub utc_offset: UtcOffset,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://caltrack.db".into());
        let store = StoreConfig {
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(5),
            timeout: Duration::from_millis(
                std::env::var("STORE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(2000),
            ),
        };
        let offset_minutes = std::env::var("LEDGER_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(0);
        let utc_offset = UtcOffset::from_whole_seconds(offset_minutes * 60)?;
        Ok(Self {
            database_url,
            store,
            utc_offset,
        })
    }

    /// Wall-clock time in the ledger's timezone, without the offset attached.
    pub fn local_now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc().to_offset(self.utc_offset);
        PrimitiveDateTime::new(now.date(), now.time())
    }
}
