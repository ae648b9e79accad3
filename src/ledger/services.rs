use time::{Date, Duration};
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::ledger::repo::LedgerStore;
use crate::ledger::repo_types::{week_start, FoodLog, NewFoodLog, User};

/// Cumulative balance against the budget accrued since the start of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyBalance {
    pub remaining: i64,
}

impl WeeklyBalance {
    pub fn is_over(&self) -> bool {
        self.remaining < 0
    }

    pub fn magnitude(&self) -> i64 {
        self.remaining.abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedLog {
    pub id: i64,
    pub streak_advanced: bool,
}

/// Everything the food log view shows for one user and day.
#[derive(Debug, Clone)]
pub struct DaySummary {
    pub user: User,
    pub date: Date,
    pub logs: Vec<FoodLog>,
    pub consumed: i64,
    pub remaining: i64,
    pub weekly: WeeklyBalance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub per_unit: f64,
    pub total: f64,
}

async fn require_user(store: &dyn LedgerStore, user_id: &str) -> Result<User, LedgerError> {
    store
        .get_user(user_id)
        .await?
        .ok_or(LedgerError::NotConfigured)
}

/// Budget minus what was eaten on `date`. Negative when over budget.
pub async fn remaining_for_date(
    store: &dyn LedgerStore,
    user_id: &str,
    date: Date,
) -> Result<i64, LedgerError> {
    let user = require_user(store, user_id).await?;
    let consumed = store.sum_calories_for_date(user_id, date).await?;
    Ok(user.daily_calories - consumed)
}

/// Budget accrues per calendar day from `week_start` through `as_of` inclusive.
pub async fn weekly_remaining(
    store: &dyn LedgerStore,
    user_id: &str,
    week_start: Date,
    as_of: Date,
) -> Result<WeeklyBalance, LedgerError> {
    let user = require_user(store, user_id).await?;
    let days = (as_of - week_start).whole_days() + 1;
    let consumed = store
        .sum_calories_for_date_range(user_id, week_start, as_of)
        .await?;
    Ok(WeeklyBalance {
        remaining: user.daily_calories * days - consumed,
    })
}

/// Average daily intake, only when the user has exactly `requested_days` days of data.
pub async fn average_over_window(
    store: &dyn LedgerStore,
    user_id: &str,
    requested_days: i64,
    today: Date,
) -> Result<f64, LedgerError> {
    let available = store.count_distinct_logged_dates(user_id).await?;
    if available != requested_days {
        debug!(%user_id, available, requested_days, "average window not covered");
        return Err(LedgerError::InsufficientData {
            available,
            requested: requested_days,
        });
    }
    let start = today - Duration::days(requested_days);
    Ok(store.average_daily_sum(user_id, start, today).await?)
}

/// Insert a log for a configured user and advance the streak on the first log of its day.
pub async fn record_log(
    store: &dyn LedgerStore,
    log: &NewFoodLog,
) -> Result<RecordedLog, LedgerError> {
    require_user(store, &log.user_id).await?;
    let id = store.insert_food_log(log).await?;
    let streak_advanced = store
        .advance_streak(&log.user_id, log.logged_at.date())
        .await?
        > 0;
    info!(user_id = %log.user_id, log_id = id, streak_advanced, "food log recorded");
    Ok(RecordedLog {
        id,
        streak_advanced,
    })
}

pub async fn day_summary(
    store: &dyn LedgerStore,
    user_id: &str,
    date: Date,
) -> Result<DaySummary, LedgerError> {
    let user = require_user(store, user_id).await?;
    let logs = store.list_food_logs_for_date(user_id, date).await?;
    let consumed = store.sum_calories_for_date(user_id, date).await?;
    let weekly = weekly_remaining(store, user_id, week_start(date), date).await?;
    Ok(DaySummary {
        remaining: user.daily_calories - consumed,
        user,
        date,
        logs,
        consumed,
        weekly,
    })
}

/// Scale a "calories per `units`" label to the eaten `weight`. Total is rounded up.
pub fn convert_per_unit(units: f64, calories: f64, weight: f64) -> Result<Conversion, LedgerError> {
    if !(units > 0.0) || !(weight > 0.0) {
        return Err(LedgerError::Validation(
            "Units and weight must both be greater than zero.".into(),
        ));
    }
    if !(1.0..=5000.0).contains(&calories) {
        return Err(LedgerError::Validation(
            "Calories must be between 1 and 5000.".into(),
        ));
    }
    let per_unit = calories / units;
    Ok(Conversion {
        per_unit,
        total: (per_unit * weight).ceil(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::repo::in_memory_store;
    use crate::ledger::repo_types::Direction;
    use time::macros::{date, datetime};
    use time::PrimitiveDateTime;

    fn log(item: &str, cal: i64, qty: i64, at: PrimitiveDateTime) -> NewFoodLog {
        NewFoodLog {
            user_id: "42".into(),
            food_item: item.into(),
            calories_per_unit: cal,
            quantity: qty,
            logged_at: at,
        }
    }

    #[tokio::test]
    async fn remaining_follows_the_daily_scenario() {
        let store = in_memory_store().await;
        let today = date!(2026 - 10 - 16);
        store.upsert_user("42", 2000).await.unwrap();

        let banana = record_log(&store, &log("Banana", 100, 1, datetime!(2026-10-16 08:00)))
            .await
            .unwrap();
        assert_eq!(remaining_for_date(&store, "42", today).await.unwrap(), 1900);

        record_log(&store, &log("Nuts", 50, 3, datetime!(2026-10-16 10:00)))
            .await
            .unwrap();
        assert_eq!(remaining_for_date(&store, "42", today).await.unwrap(), 1750);

        let n = store
            .adjust_quantity("42", banana.id, Direction::Decrement)
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(remaining_for_date(&store, "42", today).await.unwrap(), 1750);
    }

    #[tokio::test]
    async fn remaining_is_not_clamped() {
        let store = in_memory_store().await;
        store.upsert_user("42", 500).await.unwrap();
        record_log(&store, &log("Pizza", 800, 1, datetime!(2026-10-16 19:00)))
            .await
            .unwrap();
        assert_eq!(
            remaining_for_date(&store, "42", date!(2026 - 10 - 16)).await.unwrap(),
            -300
        );
    }

    #[tokio::test]
    async fn unconfigured_user_is_not_a_number() {
        let store = in_memory_store().await;
        let err = remaining_for_date(&store, "42", date!(2026 - 10 - 16))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotConfigured));

        let err = record_log(&store, &log("Banana", 100, 1, datetime!(2026-10-16 08:00)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotConfigured));
        assert_eq!(store.count_distinct_logged_dates("42").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn streak_counts_days_not_logs() {
        let store = in_memory_store().await;
        store.upsert_user("42", 2000).await.unwrap();

        let first = record_log(&store, &log("A", 100, 1, datetime!(2026-10-15 08:00))).await.unwrap();
        let second = record_log(&store, &log("B", 100, 1, datetime!(2026-10-15 12:00))).await.unwrap();
        let third = record_log(&store, &log("C", 100, 1, datetime!(2026-10-16 08:00))).await.unwrap();
        assert!(first.streak_advanced);
        assert!(!second.streak_advanced);
        assert!(third.streak_advanced);

        let user = store.get_user("42").await.unwrap().unwrap();
        assert_eq!(user.streak_count, 2);
        assert_eq!(user.last_logged_date, Some(date!(2026 - 10 - 16)));
    }

    #[tokio::test]
    async fn weekly_budget_accrues_per_elapsed_day() {
        let store = in_memory_store().await;
        store.upsert_user("42", 2000).await.unwrap();
        // Sunday through Tuesday: 3 days, 6000 accrued
        record_log(&store, &log("A", 2500, 1, datetime!(2026-10-11 12:00))).await.unwrap();
        record_log(&store, &log("B", 1000, 2, datetime!(2026-10-13 12:00))).await.unwrap();
        record_log(&store, &log("Old", 4000, 1, datetime!(2026-10-10 12:00))).await.unwrap();

        let wk = weekly_remaining(&store, "42", date!(2026 - 10 - 11), date!(2026 - 10 - 13))
            .await
            .unwrap();
        assert_eq!(wk.remaining, 1500);
        assert!(!wk.is_over());

        record_log(&store, &log("C", 2000, 1, datetime!(2026-10-13 20:00))).await.unwrap();
        let wk = weekly_remaining(&store, "42", date!(2026 - 10 - 11), date!(2026 - 10 - 13))
            .await
            .unwrap();
        assert_eq!(wk.remaining, -500);
        assert!(wk.is_over());
        assert_eq!(wk.magnitude(), 500);
    }

    #[tokio::test]
    async fn average_requires_exact_coverage() {
        let store = in_memory_store().await;
        store.upsert_user("42", 2000).await.unwrap();
        record_log(&store, &log("A", 1000, 1, datetime!(2026-10-14 08:00))).await.unwrap();
        record_log(&store, &log("B", 2000, 1, datetime!(2026-10-15 08:00))).await.unwrap();
        record_log(&store, &log("C", 1500, 2, datetime!(2026-10-16 08:00))).await.unwrap();
        let today = date!(2026 - 10 - 16);

        let err = average_over_window(&store, "42", 5, today).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientData { available: 3, requested: 5 }
        ));
        let err = average_over_window(&store, "42", 2, today).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientData { available: 3, .. }));

        let avg = average_over_window(&store, "42", 3, today).await.unwrap();
        assert!((avg - 2000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn day_summary_collects_view_figures() {
        let store = in_memory_store().await;
        store.upsert_user("42", 2000).await.unwrap();
        record_log(&store, &log("Banana", 100, 1, datetime!(2026-10-16 08:00))).await.unwrap();
        record_log(&store, &log("Nuts", 50, 3, datetime!(2026-10-16 09:00))).await.unwrap();

        let summary = day_summary(&store, "42", date!(2026 - 10 - 16)).await.unwrap();
        assert_eq!(summary.logs.len(), 2);
        assert_eq!(summary.consumed, 250);
        assert_eq!(summary.remaining, 1750);
        // Sunday 11th through Friday 16th
        assert_eq!(summary.weekly.remaining, 6 * 2000 - 250);
        assert_eq!(summary.user.streak_count, 1);
    }

    #[test]
    fn conversion_scales_and_rounds_up() {
        let c = convert_per_unit(100.0, 250.0, 30.0).unwrap();
        assert!((c.per_unit - 2.5).abs() < 1e-9);
        assert_eq!(c.total, 75.0);

        let c = convert_per_unit(100.0, 333.0, 10.0).unwrap();
        assert_eq!(c.total, 34.0);

        assert!(convert_per_unit(0.0, 250.0, 30.0).is_err());
        assert!(convert_per_unit(100.0, 250.0, -1.0).is_err());
        assert!(convert_per_unit(100.0, 0.0, 30.0).is_err());
    }
}
