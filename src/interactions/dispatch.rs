//! Routes an inbound event to its handler.
//!
//! Commands are looked up by exact name, controls by the action prefix of
//! their token. Anything unknown is dropped without a reply, since it most
//! likely comes from an older or newer revision of the bot. The tables are
//! fixed at compile time and the router holds no state.

use tracing::{debug, error, info, warn};

use crate::error::LedgerError;
use crate::interactions::dto::{
    CommandOptions, Interaction, Reply, INTERACTION_COMMAND, INTERACTION_COMPONENT,
};
use crate::interactions::token::{
    action_prefix, ControlToken, DELETE_PREFIX, QUANTITY_PREFIX, REFRESH_PREFIX,
};
use crate::interactions::{commands, components};
use crate::state::AppState;

const CONTROL_PREFIXES: [&str; 3] = [QUANTITY_PREFIX, DELETE_PREFIX, REFRESH_PREFIX];

/// The member who triggered the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug)]
pub enum Event {
    Command {
        invoker: Invoker,
        name: String,
        options: CommandOptions,
    },
    Control {
        invoker: Invoker,
        custom_id: String,
    },
}

impl Event {
    /// `None` for interaction kinds we do not handle or payloads missing their key fields.
    pub fn from_interaction(interaction: Interaction) -> Option<Self> {
        let user = interaction.member.map(|m| m.user).or(interaction.user)?;
        let invoker = Invoker {
            display_name: user.token_name(),
            id: user.id,
        };
        let data = interaction.data?;

        match interaction.kind {
            INTERACTION_COMMAND => Some(Event::Command {
                invoker,
                name: data.name?,
                options: CommandOptions::new(data.options, data.resolved),
            }),
            INTERACTION_COMPONENT => Some(Event::Control {
                invoker,
                custom_id: data.custom_id?,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetBudget,
    AddLog,
    UpdateLog,
    DeleteLog,
    ListLogs,
    RemainingToday,
    AverageOverDays,
    ConvertPerUnit,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::SetBudget,
        Command::AddLog,
        Command::UpdateLog,
        Command::DeleteLog,
        Command::ListLogs,
        Command::RemainingToday,
        Command::AverageOverDays,
        Command::ConvertPerUnit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Command::SetBudget => "set",
            Command::AddLog => "add",
            Command::UpdateLog => "update",
            Command::DeleteLog => "del",
            Command::ListLogs => "list",
            Command::RemainingToday => "rem",
            Command::AverageOverDays => "avg",
            Command::ConvertPerUnit => "conv",
        }
    }

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// Run one event to completion. `None` means the event is dropped silently.
pub async fn dispatch(state: &AppState, event: Event) -> Option<Reply> {
    match event {
        Event::Command {
            invoker,
            name,
            options,
        } => {
            let Some(command) = Command::lookup(&name) else {
                debug!(command = %name, "unknown command, dropping");
                return None;
            };
            debug!(command = command.name(), user_id = %invoker.id, "handling command");

            let result = match command {
                Command::SetBudget => commands::set_budget(state, &invoker, &options).await,
                Command::AddLog => commands::add_log(state, &invoker, &options).await,
                Command::UpdateLog => commands::update_log(state, &invoker, &options).await,
                Command::DeleteLog => commands::delete_log(state, &invoker, &options).await,
                Command::ListLogs => commands::list_logs(state, &invoker, &options).await,
                Command::RemainingToday => {
                    commands::remaining_today(state, &invoker, &options).await
                }
                Command::AverageOverDays => {
                    commands::average_over_days(state, &invoker, &options).await
                }
                Command::ConvertPerUnit => {
                    commands::convert_per_unit(state, &invoker, &options).await
                }
            };
            Some(result.unwrap_or_else(|e| failure_reply(command.name(), &invoker, e)))
        }

        Event::Control { invoker, custom_id } => {
            let prefix = action_prefix(&custom_id);
            if !CONTROL_PREFIXES.contains(&prefix) {
                debug!(%prefix, "unknown control prefix, dropping");
                return None;
            }

            let token = match ControlToken::decode(&custom_id) {
                Ok(token) => token,
                Err(e) => {
                    warn!(error = %e, %custom_id, user_id = %invoker.id, "malformed control token, dropping");
                    return None;
                }
            };
            debug!(prefix = token.prefix(), user_id = %invoker.id, "handling control");

            let result = match &token {
                ControlToken::AdjustQuantity {
                    direction,
                    user_id,
                    log_id,
                    food_item,
                } => {
                    components::adjust_quantity(
                        state, &invoker, *direction, user_id, *log_id, food_item,
                    )
                    .await
                }
                ControlToken::DeleteLog {
                    user_id, log_id, ..
                } => components::delete_log(state, &invoker, user_id, *log_id).await,
                ControlToken::RefreshList {
                    user_id,
                    display_name,
                    date,
                } => components::refresh_list(state, user_id, display_name, *date).await,
            };
            Some(result.unwrap_or_else(|e| failure_reply(token.prefix(), &invoker, e)))
        }
    }
}

/// The single place where an error turns into a user-facing (private) reply.
fn failure_reply(route: &str, invoker: &Invoker, err: LedgerError) -> Reply {
    match &err {
        LedgerError::Store(_) | LedgerError::Token(_) => {
            error!(error = %err, route, user_id = %invoker.id, "handler failed")
        }
        _ => info!(error = %err, route, user_id = %invoker.id, "request rejected"),
    }
    Reply::private_text(err.user_message())
}
