use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LedgerError;
use crate::interactions::token::sanitize_free_text;

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_COMMAND: u8 = 2;
pub const INTERACTION_COMPONENT: u8 = 3;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
const FLAG_EPHEMERAL: u64 = 1 << 6;

// ---- inbound ----

/// Interaction as posted by the chat gateway. Only the fields we read are modelled.
#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: Option<InteractionData>,
    pub member: Option<Member>, // present in guilds
    pub user: Option<DiscordUser>, // present in DMs
}

#[derive(Debug, Default, Deserialize)]
pub struct InteractionData {
    pub name: Option<String>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    pub custom_id: Option<String>,
    pub resolved: Option<Resolved>,
}

#[derive(Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub value: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub users: HashMap<String, DiscordUser>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    pub user: DiscordUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl DiscordUser {
    pub fn display_name(&self) -> &str {
        self.global_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }

    /// Display name that is safe to carry in a control token; falls back to the id.
    pub fn token_name(&self) -> String {
        match sanitize_free_text(self.display_name()) {
            name if name.is_empty() => self.id.clone(),
            name => name,
        }
    }
}

/// Option values of a command, keyed by option name, read with typed accessors.
#[derive(Debug, Default)]
pub struct CommandOptions {
    values: HashMap<String, Value>,
    users: HashMap<String, DiscordUser>,
}

impl CommandOptions {
    pub fn new(options: Vec<CommandOption>, resolved: Option<Resolved>) -> Self {
        let values = options
            .into_iter()
            .filter_map(|o| o.value.map(|v| (o.name, v)))
            .collect();
        Self {
            values,
            users: resolved.map(|r| r.users).unwrap_or_default(),
        }
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, LedgerError> {
        self.values
            .get(name)
            .map(|v| v.as_i64().ok_or_else(|| wrong_type(name, "a whole number")))
            .transpose()
    }

    pub fn float(&self, name: &str) -> Result<Option<f64>, LedgerError> {
        self.values
            .get(name)
            .map(|v| v.as_f64().ok_or_else(|| wrong_type(name, "a number")))
            .transpose()
    }

    pub fn string(&self, name: &str) -> Result<Option<&str>, LedgerError> {
        self.values
            .get(name)
            .map(|v| v.as_str().ok_or_else(|| wrong_type(name, "text")))
            .transpose()
    }

    /// A user option carries the id; the gateway resolves the account alongside.
    pub fn user(&self, name: &str) -> Result<Option<&DiscordUser>, LedgerError> {
        let Some(id) = self.string(name)? else {
            return Ok(None);
        };
        self.users
            .get(id)
            .map(Some)
            .ok_or_else(|| LedgerError::Validation(format!("Could not find the user for `{name}`.")))
    }

    pub fn required_int(&self, name: &str) -> Result<i64, LedgerError> {
        self.int(name)?.ok_or_else(|| missing(name))
    }

    pub fn required_float(&self, name: &str) -> Result<f64, LedgerError> {
        self.float(name)?.ok_or_else(|| missing(name))
    }

    pub fn required_string(&self, name: &str) -> Result<&str, LedgerError> {
        self.string(name)?.ok_or_else(|| missing(name))
    }
}

fn wrong_type(name: &str, expected: &str) -> LedgerError {
    LedgerError::Validation(format!("The `{name}` option must be {expected}."))
}

fn missing(name: &str) -> LedgerError {
    LedgerError::Validation(format!("The `{name}` option is required."))
}

// ---- outbound ----

/// What a handler answers with, before it is shaped into the gateway's response format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    pub buttons: Vec<Button>,
    /// Visible only to the invoking user.
    pub ephemeral: bool,
}

impl Reply {
    pub fn private_text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ephemeral: true,
            ..Self::default()
        }
    }

    pub fn public_text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(into = "u8")]
pub enum ButtonStyle {
    Secondary,
    Danger,
}

impl From<ButtonStyle> for u8 {
    fn from(style: ButtonStyle) -> u8 {
        match style {
            ButtonStyle::Secondary => 2,
            ButtonStyle::Danger => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Button {
    #[serde(rename = "type")]
    kind: u8,
    pub style: ButtonStyle,
    pub label: String,
    pub custom_id: String,
    pub emoji: Emoji,
}

impl Button {
    pub fn new(style: ButtonStyle, emoji: &str, label: String, custom_id: String) -> Self {
        Self {
            kind: 2,
            style,
            label,
            custom_id,
            emoji: Emoji { name: emoji.into() },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Emoji {
    pub name: String,
}

#[derive(Debug, Serialize)]
struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    components: Vec<Button>,
}

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<ResponseData>,
}

#[derive(Debug, Serialize)]
struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<ActionRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<u64>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    pub fn message(reply: Reply) -> Self {
        let components = if reply.buttons.is_empty() {
            Vec::new()
        } else {
            vec![ActionRow {
                kind: 1,
                components: reply.buttons,
            }]
        };
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(ResponseData {
                content: reply.content,
                embeds: reply.embed.into_iter().collect(),
                components,
                flags: reply.ephemeral.then_some(FLAG_EPHEMERAL),
            }),
        }
    }
}
