//! Control tokens ("custom ids").
//!
//! A token carries everything needed to replay a button press later, with no
//! session kept on our side. Tokens come back from the client, so decoding
//! treats them as untrusted input: every field is counted, parsed and checked.

use lazy_static::lazy_static;
use regex::Regex;
use time::{format_description::FormatItem, macros::format_description, Date};

use crate::ledger::repo_types::Direction;

pub const DELIMITER: char = '_';
/// Platform limit on a control's custom id.
pub const MAX_TOKEN_LEN: usize = 100;
/// Dates as users type them and as tokens carry them.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[day]/[month]/[year]");

pub const QUANTITY_PREFIX: &str = "flquantity";
pub const DELETE_PREFIX: &str = "fldel";
pub const REFRESH_PREFIX: &str = "fllist";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("unknown action prefix {0:?}")]
    UnknownPrefix(String),
    #[error("{prefix} token has {actual} fields, expected {expected}")]
    FieldCount {
        prefix: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("field {0} is empty")]
    EmptyField(&'static str),
    #[error("field {field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid quantity direction {0:?}")]
    InvalidDirection(String),
    #[error("invalid date {0:?}")]
    InvalidDate(String),
    #[error("field {0} contains the token delimiter")]
    DelimiterInField(&'static str),
    #[error("token is {0} characters long")]
    TooLong(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlToken {
    AdjustQuantity {
        direction: Direction,
        user_id: String,
        log_id: i64,
        food_item: String,
    },
    DeleteLog {
        user_id: String,
        log_id: i64,
        food_item: String,
    },
    RefreshList {
        user_id: String,
        display_name: String,
        date: Date,
    },
}

impl ControlToken {
    pub fn prefix(&self) -> &'static str {
        match self {
            ControlToken::AdjustQuantity { .. } => QUANTITY_PREFIX,
            ControlToken::DeleteLog { .. } => DELETE_PREFIX,
            ControlToken::RefreshList { .. } => REFRESH_PREFIX,
        }
    }

    pub fn encode(&self) -> Result<String, TokenError> {
        let fields: Vec<(&'static str, String)> = match self {
            ControlToken::AdjustQuantity {
                direction,
                user_id,
                log_id,
                food_item,
            } => vec![
                ("direction", direction.as_str().to_string()),
                ("user_id", user_id.clone()),
                ("log_id", log_id.to_string()),
                ("food_item", food_item.clone()),
            ],
            ControlToken::DeleteLog {
                user_id,
                log_id,
                food_item,
            } => vec![
                ("user_id", user_id.clone()),
                ("log_id", log_id.to_string()),
                ("food_item", food_item.clone()),
            ],
            ControlToken::RefreshList {
                user_id,
                display_name,
                date,
            } => vec![
                ("user_id", user_id.clone()),
                ("display_name", display_name.clone()),
                (
                    "date",
                    date.format(DATE_FORMAT)
                        .map_err(|_| TokenError::InvalidDate(date.to_string()))?,
                ),
            ],
        };

        let mut out = String::from(self.prefix());
        for (name, value) in fields {
            if value.is_empty() {
                return Err(TokenError::EmptyField(name));
            }
            if value.contains(DELIMITER) {
                return Err(TokenError::DelimiterInField(name));
            }
            out.push(DELIMITER);
            out.push_str(&value);
        }

        let len = out.chars().count();
        if len > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong(len));
        }
        Ok(out)
    }

    pub fn decode(raw: &str) -> Result<Self, TokenError> {
        let len = raw.chars().count();
        if len > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong(len));
        }

        let parts: Vec<&str> = raw.split(DELIMITER).collect();
        match parts[0] {
            QUANTITY_PREFIX => {
                let [_, direction, user_id, log_id, food_item] =
                    fields::<5>(QUANTITY_PREFIX, &parts)?;
                Ok(ControlToken::AdjustQuantity {
                    direction: Direction::parse(direction)
                        .ok_or_else(|| TokenError::InvalidDirection(direction.to_string()))?,
                    user_id: non_empty("user_id", user_id)?,
                    log_id: parse_id("log_id", log_id)?,
                    food_item: non_empty("food_item", food_item)?,
                })
            }
            DELETE_PREFIX => {
                let [_, user_id, log_id, food_item] = fields::<4>(DELETE_PREFIX, &parts)?;
                Ok(ControlToken::DeleteLog {
                    user_id: non_empty("user_id", user_id)?,
                    log_id: parse_id("log_id", log_id)?,
                    food_item: non_empty("food_item", food_item)?,
                })
            }
            REFRESH_PREFIX => {
                let [_, user_id, display_name, date] = fields::<4>(REFRESH_PREFIX, &parts)?;
                Ok(ControlToken::RefreshList {
                    user_id: non_empty("user_id", user_id)?,
                    display_name: non_empty("display_name", display_name)?,
                    date: Date::parse(date, DATE_FORMAT)
                        .map_err(|_| TokenError::InvalidDate(date.to_string()))?,
                })
            }
            other => Err(TokenError::UnknownPrefix(other.to_string())),
        }
    }
}

/// Routing key of a raw token: everything before the first delimiter.
pub fn action_prefix(raw: &str) -> &str {
    raw.split(DELIMITER).next().unwrap_or_default()
}

/// Normalise user-supplied text before it can end up inside a token:
/// the delimiter becomes a space and whitespace runs collapse.
pub fn sanitize_free_text(raw: &str) -> String {
    lazy_static! {
        static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    }
    let replaced = raw.replace(DELIMITER, " ");
    WHITESPACE_RE.replace_all(replaced.trim(), " ").into_owned()
}

fn fields<'a, const N: usize>(
    prefix: &'static str,
    parts: &[&'a str],
) -> Result<[&'a str; N], TokenError> {
    <[&'a str; N]>::try_from(parts).map_err(|_| TokenError::FieldCount {
        prefix,
        expected: N,
        actual: parts.len(),
    })
}

fn non_empty(field: &'static str, value: &str) -> Result<String, TokenError> {
    if value.is_empty() {
        return Err(TokenError::EmptyField(field));
    }
    Ok(value.to_string())
}

fn parse_id(field: &'static str, value: &str) -> Result<i64, TokenError> {
    value.parse::<i64>().map_err(|_| TokenError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn quantity_token_uses_positional_fields() {
        let token = ControlToken::AdjustQuantity {
            direction: Direction::Increment,
            user_id: "123456789012345678".into(),
            log_id: 17,
            food_item: "Peanut Butter".into(),
        };
        let raw = token.encode().unwrap();
        assert_eq!(raw, "flquantity_inc_123456789012345678_17_Peanut Butter");
        assert_eq!(ControlToken::decode(&raw).unwrap(), token);
        assert_eq!(action_prefix(&raw), QUANTITY_PREFIX);
    }

    #[test]
    fn delete_and_refresh_tokens_round_trip() {
        let delete = ControlToken::DeleteLog {
            user_id: "99".into(),
            log_id: 5,
            food_item: "Banana".into(),
        };
        assert_eq!(delete.encode().unwrap(), "fldel_99_5_Banana");
        assert_eq!(ControlToken::decode("fldel_99_5_Banana").unwrap(), delete);

        let refresh = ControlToken::RefreshList {
            user_id: "99".into(),
            display_name: "Sam".into(),
            date: date!(2026 - 10 - 06),
        };
        assert_eq!(refresh.encode().unwrap(), "fllist_99_Sam_06/10/2026");
        assert_eq!(ControlToken::decode("fllist_99_Sam_06/10/2026").unwrap(), refresh);
    }

    #[test]
    fn encode_refuses_delimiter_in_free_text() {
        let token = ControlToken::DeleteLog {
            user_id: "99".into(),
            log_id: 5,
            food_item: "mac_and_cheese".into(),
        };
        assert_eq!(token.encode(), Err(TokenError::DelimiterInField("food_item")));
    }

    #[test]
    fn delimiter_in_free_text_misaligns_decoding() {
        let err = ControlToken::decode("fldel_99_5_mac_and_cheese").unwrap_err();
        assert_eq!(
            err,
            TokenError::FieldCount {
                prefix: DELETE_PREFIX,
                expected: 4,
                actual: 6
            }
        );
    }

    #[test]
    fn numeric_fields_must_parse() {
        let err = ControlToken::decode("fldel_99_five_Banana").unwrap_err();
        assert!(matches!(err, TokenError::InvalidNumber { field: "log_id", .. }));

        let err = ControlToken::decode("flquantity_up_99_5_Banana").unwrap_err();
        assert_eq!(err, TokenError::InvalidDirection("up".into()));

        let err = ControlToken::decode("fllist_99_Sam_2026-10-06").unwrap_err();
        assert!(matches!(err, TokenError::InvalidDate(_)));
    }

    #[test]
    fn empty_and_unknown_tokens_are_rejected() {
        assert!(matches!(
            ControlToken::decode("fldel_99__Banana"),
            Err(TokenError::InvalidNumber { .. })
        ));
        assert_eq!(
            ControlToken::decode("fldel__5_Banana"),
            Err(TokenError::EmptyField("user_id"))
        );
        assert_eq!(
            ControlToken::decode("flnew_1_2"),
            Err(TokenError::UnknownPrefix("flnew".into()))
        );
        assert_eq!(action_prefix(""), "");
    }

    #[test]
    fn oversized_tokens_are_rejected() {
        let token = ControlToken::DeleteLog {
            user_id: "9".repeat(60),
            log_id: 1,
            food_item: "x".repeat(50),
        };
        assert!(matches!(token.encode(), Err(TokenError::TooLong(_))));
        assert!(matches!(
            ControlToken::decode(&"a".repeat(101)),
            Err(TokenError::TooLong(101))
        ));
    }

    #[test]
    fn sanitize_strips_delimiter_and_collapses_space() {
        assert_eq!(sanitize_free_text("  mac_and__cheese \t bowl "), "mac and cheese bowl");
        assert_eq!(sanitize_free_text("___"), "");
    }
}
