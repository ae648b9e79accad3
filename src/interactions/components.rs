use time::Date;
use tracing::{info, instrument};

use crate::error::LedgerError;
use crate::interactions::commands::{log_controls, show_day};
use crate::interactions::dispatch::Invoker;
use crate::interactions::dto::Reply;
use crate::ledger::repo_types::Direction;
use crate::state::AppState;

/// Mutating controls act on the log owner named in the token; nobody else may press them.
fn ensure_owner(invoker: &Invoker, token_user_id: &str) -> Result<(), LedgerError> {
    if invoker.id != token_user_id {
        return Err(LedgerError::Forbidden);
    }
    Ok(())
}

#[instrument(skip(state, invoker), fields(invoker_id = %invoker.id))]
pub async fn adjust_quantity(
    state: &AppState,
    invoker: &Invoker,
    direction: Direction,
    user_id: &str,
    log_id: i64,
    food_item: &str,
) -> Result<Reply, LedgerError> {
    ensure_owner(invoker, user_id)?;
    if state.ledger.adjust_quantity(user_id, log_id, direction).await? == 0 {
        return Err(LedgerError::QuantityUnchanged(log_id));
    }
    info!(log_id, direction = direction.as_str(), "food log quantity changed");

    let buttons = log_controls(user_id, log_id, food_item, true);
    show_day(state, user_id, &invoker.display_name, state.today(), buttons, true).await
}

#[instrument(skip(state, invoker), fields(invoker_id = %invoker.id))]
pub async fn delete_log(
    state: &AppState,
    invoker: &Invoker,
    user_id: &str,
    log_id: i64,
) -> Result<Reply, LedgerError> {
    ensure_owner(invoker, user_id)?;
    if state.ledger.delete_food_log(user_id, log_id).await? == 0 {
        return Err(LedgerError::NotFound(log_id));
    }
    info!(log_id, "food log deleted");
    show_day(state, user_id, &invoker.display_name, state.today(), vec![], true).await
}

/// Read-only, so any member may refresh anyone's list.
#[instrument(skip(state))]
pub async fn refresh_list(
    state: &AppState,
    user_id: &str,
    display_name: &str,
    date: Date,
) -> Result<Reply, LedgerError> {
    show_day(state, user_id, display_name, date, vec![], true).await
}
