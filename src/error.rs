use std::time::Duration;

use crate::interactions::token::TokenError;

/// Failures coming out of the persistence layer. "No matching row" is never one of these.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("daily calorie budget has not been set")]
    NotConfigured,
    #[error("food log {0} not found")]
    NotFound(i64),
    #[error("quantity of food log {0} was not changed")]
    QuantityUnchanged(i64),
    #[error("{available} days of data available, {requested} requested")]
    InsufficientData { available: i64, requested: i64 },
    #[error("control belongs to another user")]
    Forbidden,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl LedgerError {
    /// Text shown to the invoking user. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            LedgerError::Validation(msg) => msg.clone(),
            LedgerError::NotConfigured => {
                "Set your daily calories first using the /set command.".into()
            }
            LedgerError::NotFound(id) => format!("Could not find a food log with ID {id}."),
            LedgerError::QuantityUnchanged(id) => {
                format!("Failed to update the quantity for food log with ID {id}.")
            }
            LedgerError::InsufficientData { available, .. } => format!(
                "You only have enough data to request an average over {available} days."
            ),
            LedgerError::Forbidden => "You can only change your own food logs.".into(),
            LedgerError::Store(_) | LedgerError::Token(_) => {
                "There was an error, please try again...".into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_do_not_leak_details() {
        let err = LedgerError::Store(StoreError::Timeout {
            op: "sum_calories_for_date",
            timeout: Duration::from_millis(5),
        });
        let msg = err.user_message();
        assert!(!msg.contains("sum_calories_for_date"));
        assert!(msg.contains("try again"));
    }

    #[test]
    fn insufficient_data_reports_available_days() {
        let err = LedgerError::InsufficientData {
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.user_message(),
            "You only have enough data to request an average over 3 days."
        );
    }

    #[test]
    fn not_found_names_the_id() {
        assert!(LedgerError::NotFound(999).user_message().contains("999"));
    }
}
