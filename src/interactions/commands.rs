use time::Date;
use tracing::{info, instrument, warn};

use crate::error::LedgerError;
use crate::interactions::dispatch::Invoker;
use crate::interactions::dto::{Button, CommandOptions, Reply};
use crate::interactions::render::{self, format_date};
use crate::interactions::token::{sanitize_free_text, DATE_FORMAT};
use crate::ledger::repo_types::{FoodLogEdit, NewFoodLog, MAX_CALORIES, MAX_FOOD_ITEM_LEN, MIN_CALORIES};
use crate::ledger::services;
use crate::state::AppState;

const MIN_AVERAGE_DAYS: i64 = 2;
const MAX_AVERAGE_DAYS: i64 = 7;

fn calories(value: i64) -> Result<i64, LedgerError> {
    if !(MIN_CALORIES..=MAX_CALORIES).contains(&value) {
        return Err(LedgerError::Validation(format!(
            "Calories must be between {MIN_CALORIES} and {MAX_CALORIES}."
        )));
    }
    Ok(value)
}

fn quantity(value: Option<i64>) -> Result<i64, LedgerError> {
    match value {
        None => Ok(1),
        Some(q) if q >= 1 => Ok(q),
        Some(_) => Err(LedgerError::Validation("Quantity must be at least 1.".into())),
    }
}

/// Food names end up inside control tokens, so they are sanitised on the way in.
fn food_item(raw: &str) -> Result<String, LedgerError> {
    let item = sanitize_free_text(raw);
    if item.is_empty() {
        return Err(LedgerError::Validation("Food item can't be empty.".into()));
    }
    if item.chars().count() > MAX_FOOD_ITEM_LEN {
        return Err(LedgerError::Validation(format!(
            "Food item must be {MAX_FOOD_ITEM_LEN} characters or fewer."
        )));
    }
    Ok(item)
}

/// Per-log controls, built after the write has committed. A token that can't be
/// encoded drops the controls, not the reply.
pub(super) fn log_controls(
    user_id: &str,
    log_id: i64,
    food_item: &str,
    with_decrement: bool,
) -> Vec<Button> {
    render::log_buttons(user_id, log_id, food_item, with_decrement).unwrap_or_else(|e| {
        warn!(error = %e, log_id, "log controls not encodable, replying without them");
        Vec::new()
    })
}

/// Food log view for `user_id` on `date`.
pub(super) async fn show_day(
    state: &AppState,
    user_id: &str,
    display_name: &str,
    date: Date,
    buttons: Vec<Button>,
    ephemeral: bool,
) -> Result<Reply, LedgerError> {
    let summary = services::day_summary(state.ledger.as_ref(), user_id, date).await?;
    Ok(render::food_log_view(
        &summary,
        display_name,
        buttons,
        ephemeral,
        state.today(),
    )?)
}

#[instrument(skip(state, options), fields(user_id = %invoker.id))]
pub async fn set_budget(
    state: &AppState,
    invoker: &Invoker,
    options: &CommandOptions,
) -> Result<Reply, LedgerError> {
    let budget = calories(options.required_int("calories")?)?;
    state.ledger.upsert_user(&invoker.id, budget).await?;
    info!(budget, "daily calorie budget set");
    Ok(Reply::private_text(format!(
        "Your daily calorie intake has successfully been set to {budget}."
    )))
}

#[instrument(skip(state, options), fields(user_id = %invoker.id))]
pub async fn add_log(
    state: &AppState,
    invoker: &Invoker,
    options: &CommandOptions,
) -> Result<Reply, LedgerError> {
    let log = NewFoodLog {
        user_id: invoker.id.clone(),
        food_item: food_item(options.required_string("fooditem")?)?,
        calories_per_unit: calories(options.required_int("calories")?)?,
        quantity: quantity(options.int("quantity")?)?,
        logged_at: state.now(),
    };

    let recorded = services::record_log(state.ledger.as_ref(), &log).await?;
    let buttons = log_controls(&invoker.id, recorded.id, &log.food_item, log.quantity > 1);
    show_day(
        state,
        &invoker.id,
        &invoker.display_name,
        log.logged_at.date(),
        buttons,
        true,
    )
    .await
}

#[instrument(skip(state, options), fields(user_id = %invoker.id))]
pub async fn update_log(
    state: &AppState,
    invoker: &Invoker,
    options: &CommandOptions,
) -> Result<Reply, LedgerError> {
    let edit = FoodLogEdit {
        id: options.required_int("logid")?,
        user_id: invoker.id.clone(),
        food_item: food_item(options.required_string("fooditem")?)?,
        calories_per_unit: calories(options.required_int("calories")?)?,
        quantity: quantity(options.int("quantity")?)?,
    };

    if state.ledger.replace_food_log(&edit).await? == 0 {
        return Err(LedgerError::NotFound(edit.id));
    }
    info!(log_id = edit.id, "food log updated");
    show_day(state, &invoker.id, &invoker.display_name, state.today(), vec![], true).await
}

#[instrument(skip(state, options), fields(user_id = %invoker.id))]
pub async fn delete_log(
    state: &AppState,
    invoker: &Invoker,
    options: &CommandOptions,
) -> Result<Reply, LedgerError> {
    let log_id = options.required_int("logid")?;
    if state.ledger.delete_food_log(&invoker.id, log_id).await? == 0 {
        return Err(LedgerError::NotFound(log_id));
    }
    info!(log_id, "food log deleted");
    show_day(state, &invoker.id, &invoker.display_name, state.today(), vec![], true).await
}

#[instrument(skip(state, options), fields(user_id = %invoker.id))]
pub async fn list_logs(
    state: &AppState,
    invoker: &Invoker,
    options: &CommandOptions,
) -> Result<Reply, LedgerError> {
    let (user_id, display_name) = match options.user("user")? {
        Some(user) if user.bot => {
            return Err(LedgerError::Validation(
                "That is a bot, please select a user.".into(),
            ))
        }
        Some(user) => (user.id.clone(), user.token_name()),
        None => (invoker.id.clone(), invoker.display_name.clone()),
    };

    let date = match options.string("date")? {
        Some(raw) => Date::parse(raw.trim(), DATE_FORMAT).map_err(|_| {
            LedgerError::Validation(format!(
                "Error parsing date, please try again with format like {}.",
                format_date(state.today())
            ))
        })?,
        None => state.today(),
    };

    match show_day(state, &user_id, &display_name, date, vec![], false).await {
        Err(LedgerError::NotConfigured) if user_id != invoker.id => Err(LedgerError::Validation(
            format!("{display_name} hasn't set their daily calories yet."),
        )),
        other => other,
    }
}

#[instrument(skip(state, _options), fields(user_id = %invoker.id))]
pub async fn remaining_today(
    state: &AppState,
    invoker: &Invoker,
    _options: &CommandOptions,
) -> Result<Reply, LedgerError> {
    let remaining =
        services::remaining_for_date(state.ledger.as_ref(), &invoker.id, state.today()).await?;
    let text = if remaining >= 0 {
        format!("You have {remaining} calories remaining today.")
    } else {
        format!(
            "You are {} calories over your daily budget today.",
            remaining.abs()
        )
    };
    Ok(Reply::private_text(text))
}

#[instrument(skip(state, options), fields(user_id = %invoker.id))]
pub async fn average_over_days(
    state: &AppState,
    invoker: &Invoker,
    options: &CommandOptions,
) -> Result<Reply, LedgerError> {
    let days = options.required_int("days")?;
    if !(MIN_AVERAGE_DAYS..=MAX_AVERAGE_DAYS).contains(&days) {
        return Err(LedgerError::Validation(format!(
            "Days must be between {MIN_AVERAGE_DAYS} and {MAX_AVERAGE_DAYS}."
        )));
    }
    let average =
        services::average_over_window(state.ledger.as_ref(), &invoker.id, days, state.today())
            .await?;
    Ok(Reply::private_text(format!(
        "You have consumed an average of {average:.0} calories over {days} days."
    )))
}

#[instrument(skip(_state, options), fields(user_id = %invoker.id))]
pub async fn convert_per_unit(
    _state: &AppState,
    invoker: &Invoker,
    options: &CommandOptions,
) -> Result<Reply, LedgerError> {
    let conversion = services::convert_per_unit(
        options.required_float("units")?,
        options.required_float("calories")?,
        options.required_float("weight")?,
    )?;
    let body = format!(
        "{:.2} calories per unit \nTotal amount of calories is {:.0}",
        conversion.per_unit, conversion.total
    );
    let text = match options.string("fooditem")? {
        Some(item) => format!("{}\n{body}", sanitize_free_text(item)),
        None => body,
    };
    Ok(Reply::public_text(text))
}
