use std::{future::Future, str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use time::Date;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::ledger::repo_types::{Direction, FoodLog, FoodLogEdit, NewFoodLog, User};

/// Durable CRUD and aggregate reads over users and food logs.
///
/// Writes report rows affected so callers can tell "not found" apart from a
/// failure; absent rows and empty aggregates are never errors.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn upsert_user(&self, user_id: &str, daily_calories: i64) -> Result<(), StoreError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    async fn insert_food_log(&self, log: &NewFoodLog) -> Result<i64, StoreError>;
    async fn replace_food_log(&self, edit: &FoodLogEdit) -> Result<u64, StoreError>;
    /// Decrement only applies while quantity > 1; the guard lives in the UPDATE itself.
    async fn adjust_quantity(
        &self,
        user_id: &str,
        log_id: i64,
        direction: Direction,
    ) -> Result<u64, StoreError>;
    async fn delete_food_log(&self, user_id: &str, log_id: i64) -> Result<u64, StoreError>;
    async fn list_food_logs_for_date(
        &self,
        user_id: &str,
        date: Date,
    ) -> Result<Vec<FoodLog>, StoreError>;

    async fn sum_calories_for_date(&self, user_id: &str, date: Date) -> Result<i64, StoreError>;
    async fn sum_calories_for_date_range(
        &self,
        user_id: &str,
        start: Date,
        end: Date,
    ) -> Result<i64, StoreError>;
    /// Mean of per-day sums over days in `[since, until]` that have at least one log.
    async fn average_daily_sum(
        &self,
        user_id: &str,
        since: Date,
        until: Date,
    ) -> Result<f64, StoreError>;
    async fn count_distinct_logged_dates(&self, user_id: &str) -> Result<i64, StoreError>;

    /// Moves the streak forward to `date` in one conditional UPDATE.
    /// Returns 0 when the streak was already advanced for `date` (or the user is absent).
    async fn advance_streak(&self, user_id: &str, date: Date) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteLedgerStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Open (creating if missing) the database and apply embedded migrations.
    pub async fn connect(config: &AppConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.store.timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.store.max_connections)
            .acquire_timeout(config.store.timeout)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!(url = %config.database_url, "ledger store ready");

        Ok(Self::new(pool, config.store.timeout))
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(StoreError::Timeout {
                op,
                timeout: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn upsert_user(&self, user_id: &str, daily_calories: i64) -> Result<(), StoreError> {
        self.bounded(
            "upsert_user",
            sqlx::query(
                r#"
                INSERT INTO users (id, daily_calories)
                VALUES (?, ?)
                ON CONFLICT (id) DO UPDATE SET daily_calories = excluded.daily_calories
                "#,
            )
            .bind(user_id)
            .bind(daily_calories)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        self.bounded(
            "get_user",
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, daily_calories, streak_count, last_logged_date
                FROM users
                WHERE id = ?
                "#,
            )
            .bind(user_id)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert_food_log(&self, log: &NewFoodLog) -> Result<i64, StoreError> {
        let res = self
            .bounded(
                "insert_food_log",
                sqlx::query(
                    r#"
                    INSERT INTO food_logs (user_id, food_item, calories_per_unit, quantity, logged_at)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&log.user_id)
                .bind(&log.food_item)
                .bind(log.calories_per_unit)
                .bind(log.quantity)
                .bind(log.logged_at)
                .execute(&self.pool),
            )
            .await?;
        Ok(res.last_insert_rowid())
    }

    async fn replace_food_log(&self, edit: &FoodLogEdit) -> Result<u64, StoreError> {
        let res = self
            .bounded(
                "replace_food_log",
                sqlx::query(
                    r#"
                    UPDATE food_logs
                    SET food_item = ?, calories_per_unit = ?, quantity = ?
                    WHERE id = ? AND user_id = ?
                    "#,
                )
                .bind(&edit.food_item)
                .bind(edit.calories_per_unit)
                .bind(edit.quantity)
                .bind(edit.id)
                .bind(&edit.user_id)
                .execute(&self.pool),
            )
            .await?;
        Ok(res.rows_affected())
    }

    async fn adjust_quantity(
        &self,
        user_id: &str,
        log_id: i64,
        direction: Direction,
    ) -> Result<u64, StoreError> {
        let sql = match direction {
            Direction::Increment => {
                "UPDATE food_logs SET quantity = quantity + 1 WHERE id = ? AND user_id = ?"
            }
            Direction::Decrement => {
                "UPDATE food_logs SET quantity = quantity - 1 WHERE id = ? AND user_id = ? AND quantity > 1"
            }
        };
        let res = self
            .bounded(
                "adjust_quantity",
                sqlx::query(sql)
                    .bind(log_id)
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete_food_log(&self, user_id: &str, log_id: i64) -> Result<u64, StoreError> {
        let res = self
            .bounded(
                "delete_food_log",
                sqlx::query("DELETE FROM food_logs WHERE id = ? AND user_id = ?")
                    .bind(log_id)
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(res.rows_affected())
    }

    async fn list_food_logs_for_date(
        &self,
        user_id: &str,
        date: Date,
    ) -> Result<Vec<FoodLog>, StoreError> {
        self.bounded(
            "list_food_logs_for_date",
            sqlx::query_as::<_, FoodLog>(
                r#"
                SELECT id, user_id, food_item, calories_per_unit, quantity, logged_at
                FROM food_logs
                WHERE user_id = ? AND DATE(logged_at) = ?
                ORDER BY logged_at ASC, id ASC
                "#,
            )
            .bind(user_id)
            .bind(date)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn sum_calories_for_date(&self, user_id: &str, date: Date) -> Result<i64, StoreError> {
        self.bounded(
            "sum_calories_for_date",
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COALESCE(SUM(calories_per_unit * quantity), 0)
                FROM food_logs
                WHERE user_id = ? AND DATE(logged_at) = ?
                "#,
            )
            .bind(user_id)
            .bind(date)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn sum_calories_for_date_range(
        &self,
        user_id: &str,
        start: Date,
        end: Date,
    ) -> Result<i64, StoreError> {
        self.bounded(
            "sum_calories_for_date_range",
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COALESCE(SUM(calories_per_unit * quantity), 0)
                FROM food_logs
                WHERE user_id = ? AND DATE(logged_at) BETWEEN ? AND ?
                "#,
            )
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn average_daily_sum(
        &self,
        user_id: &str,
        since: Date,
        until: Date,
    ) -> Result<f64, StoreError> {
        let avg = self
            .bounded(
                "average_daily_sum",
                sqlx::query_scalar::<_, Option<f64>>(
                    r#"
                    SELECT AVG(daily_sum)
                    FROM (
                        SELECT SUM(calories_per_unit * quantity) AS daily_sum
                        FROM food_logs
                        WHERE user_id = ? AND DATE(logged_at) BETWEEN ? AND ?
                        GROUP BY DATE(logged_at)
                    )
                    "#,
                )
                .bind(user_id)
                .bind(since)
                .bind(until)
                .fetch_one(&self.pool),
            )
            .await?;
        Ok(avg.unwrap_or(0.0))
    }

    async fn count_distinct_logged_dates(&self, user_id: &str) -> Result<i64, StoreError> {
        self.bounded(
            "count_distinct_logged_dates",
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(DISTINCT DATE(logged_at)) FROM food_logs WHERE user_id = ?",
            )
            .bind(user_id)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn advance_streak(&self, user_id: &str, date: Date) -> Result<u64, StoreError> {
        // yesterday continues the streak, any older date restarts it
        let res = self
            .bounded(
                "advance_streak",
                sqlx::query(
                    r#"
                    UPDATE users
                    SET streak_count = CASE
                            WHEN last_logged_date = DATE(?, '-1 day') THEN streak_count + 1
                            ELSE 1
                        END,
                        last_logged_date = ?
                    WHERE id = ?
                      AND (last_logged_date IS NULL OR last_logged_date < ?)
                    "#,
                )
                .bind(date)
                .bind(date)
                .bind(user_id)
                .bind(date)
                .execute(&self.pool),
            )
            .await?;
        Ok(res.rows_affected())
    }
}

#[cfg(test)]
pub(crate) async fn in_memory_store() -> SqliteLedgerStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations apply");
    SqliteLedgerStore::new(pool, Duration::from_secs(5))
}

/// A store whose only pooled connection is checked out, so every call runs
/// into its deadline while the returned connection is held.
#[cfg(test)]
pub(crate) async fn stalled_store() -> (SqliteLedgerStore, sqlx::pool::PoolConnection<sqlx::Sqlite>) {
    let store = in_memory_store().await;
    let held = store.pool.acquire().await.expect("the only connection");
    (SqliteLedgerStore::new(store.pool, Duration::from_millis(50)), held)
}
