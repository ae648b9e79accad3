use std::fmt::Write as _;

use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime,
};

use crate::interactions::dto::{Button, ButtonStyle, Embed, EmbedField, EmbedFooter, Reply};
use crate::interactions::token::{ControlToken, TokenError, DATE_FORMAT};
use crate::ledger::repo_types::Direction;
use crate::ledger::services::DaySummary;

const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const EMBED_COLOR: u32 = 0x89CFF0;
const BLANK: &str = "\u{200b}";

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Increment / decrement / delete controls for one log.
pub fn log_buttons(
    user_id: &str,
    log_id: i64,
    food_item: &str,
    with_decrement: bool,
) -> Result<Vec<Button>, TokenError> {
    let adjust = |direction| ControlToken::AdjustQuantity {
        direction,
        user_id: user_id.to_string(),
        log_id,
        food_item: food_item.to_string(),
    };

    let mut buttons = vec![Button::new(
        ButtonStyle::Secondary,
        "⬆️",
        format!("Add a {food_item}"),
        adjust(Direction::Increment).encode()?,
    )];
    if with_decrement {
        buttons.push(Button::new(
            ButtonStyle::Secondary,
            "⬇️",
            format!("Remove a {food_item}"),
            adjust(Direction::Decrement).encode()?,
        ));
    }
    buttons.push(Button::new(
        ButtonStyle::Danger,
        "🚮",
        format!("Delete {food_item}"),
        ControlToken::DeleteLog {
            user_id: user_id.to_string(),
            log_id,
            food_item: food_item.to_string(),
        }
        .encode()?,
    ));
    Ok(buttons)
}

/// The food log view for one user and day. Public views get a refresh control.
pub fn food_log_view(
    summary: &DaySummary,
    display_name: &str,
    mut buttons: Vec<Button>,
    ephemeral: bool,
    today: Date,
) -> Result<Reply, TokenError> {
    let date = format_date(summary.date);
    if summary.logs.is_empty() {
        return Ok(Reply::private_text(format!(
            "No logs found for {display_name} on {date}."
        )));
    }

    if !ephemeral {
        let refresh = ControlToken::RefreshList {
            user_id: summary.user.id.clone(),
            display_name: display_name.to_string(),
            date: summary.date,
        };
        buttons.push(Button::new(
            ButtonStyle::Secondary,
            "♻️",
            "Update".into(),
            refresh.encode()?,
        ));
    }

    let mut times = String::new();
    let mut names = String::new();
    let mut calories = String::new();
    for log in &summary.logs {
        if log.quantity > 1 {
            let _ = writeln!(names, "({}) x{} {}", log.id, log.quantity, log.food_item);
        } else {
            let _ = writeln!(names, "({}) {}", log.id, log.food_item);
        }
        let _ = writeln!(calories, "{}", log.effective_calories());
        let _ = writeln!(
            times,
            "{}",
            log.logged_at.format(TIME_FORMAT).unwrap_or_default()
        );
    }

    let goal = if summary.weekly.is_over() { "Over" } else { "Under" };
    let stats = format!(
        "**Total Consumed**: {}\n**Remaining On Day**: {}\n**Calories {} Weekly Goal**: {}\n",
        summary.consumed,
        summary.remaining,
        goal,
        summary.weekly.magnitude()
    );

    let field = |name: &str, value: String, inline: bool| EmbedField {
        name: name.to_string(),
        value,
        inline,
    };
    let embed = Embed {
        title: format!("Food Log - {display_name} ({date})"),
        color: EMBED_COLOR,
        fields: vec![
            field(
                BLANK,
                format!("**Daily Calories**: {}\n", summary.user.daily_calories),
                false,
            ),
            field(BLANK, BLANK.into(), false),
            field("Time", times, true),
            field("Name", names, true),
            field("Calories", calories, true),
            field(BLANK, BLANK.into(), false),
            field(BLANK, stats, false),
        ],
        timestamp: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
        footer: Some(EmbedFooter {
            text: format!("{} day streak", summary.user.current_streak(today)),
        }),
    };

    Ok(Reply {
        content: None,
        embed: Some(embed),
        buttons,
        ephemeral,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::repo_types::{FoodLog, User};
    use crate::ledger::services::WeeklyBalance;
    use time::macros::{date, datetime};

    fn summary(logs: Vec<FoodLog>, weekly: i64) -> DaySummary {
        DaySummary {
            user: User {
                id: "42".into(),
                daily_calories: 2000,
                streak_count: 3,
                last_logged_date: Some(date!(2026 - 10 - 16)),
            },
            date: date!(2026 - 10 - 16),
            logs,
            consumed: 250,
            remaining: 1750,
            weekly: WeeklyBalance { remaining: weekly },
        }
    }

    fn log(id: i64, item: &str, cal: i64, qty: i64) -> FoodLog {
        FoodLog {
            id,
            user_id: "42".into(),
            food_item: item.into(),
            calories_per_unit: cal,
            quantity: qty,
            logged_at: datetime!(2026-10-16 08:05),
        }
    }

    #[test]
    fn empty_day_is_a_private_notice() {
        let reply = food_log_view(&summary(vec![], 0), "Sam", vec![], false, date!(2026 - 10 - 16))
            .unwrap();
        assert_eq!(reply.content.as_deref(), Some("No logs found for Sam on 16/10/2026."));
        assert!(reply.ephemeral);
        assert!(reply.buttons.is_empty());
    }

    #[test]
    fn public_view_lists_logs_and_adds_refresh() {
        let logs = vec![log(1, "Banana", 100, 1), log(2, "Nuts", 50, 3)];
        let reply =
            food_log_view(&summary(logs, -300), "Sam", vec![], false, date!(2026 - 10 - 16)).unwrap();
        let embed = reply.embed.unwrap();

        assert_eq!(embed.title, "Food Log - Sam (16/10/2026)");
        assert_eq!(embed.fields[2].value, "08:05\n08:05\n");
        assert_eq!(embed.fields[3].value, "(1) Banana\n(2) x3 Nuts\n");
        assert_eq!(embed.fields[4].value, "100\n150\n");
        assert!(embed.fields[6].value.contains("**Remaining On Day**: 1750"));
        assert!(embed.fields[6].value.contains("**Calories Over Weekly Goal**: 300"));
        assert_eq!(embed.footer.unwrap().text, "3 day streak");

        assert!(!reply.ephemeral);
        assert_eq!(reply.buttons.len(), 1);
        assert_eq!(reply.buttons[0].custom_id, "fllist_42_Sam_16/10/2026");
    }

    #[test]
    fn private_view_keeps_given_controls_only() {
        let buttons = log_buttons("42", 7, "Banana", false).unwrap();
        let reply = food_log_view(
            &summary(vec![log(7, "Banana", 100, 1)], 10),
            "Sam",
            buttons,
            true,
            date!(2026 - 10 - 16),
        )
        .unwrap();
        let ids: Vec<_> = reply.buttons.iter().map(|b| b.custom_id.as_str()).collect();
        assert_eq!(ids, ["flquantity_inc_42_7_Banana", "fldel_42_7_Banana"]);
        assert!(reply.embed.unwrap().fields[6].value.contains("Under Weekly Goal**: 10"));
    }

    #[test]
    fn decrement_control_is_optional() {
        let buttons = log_buttons("42", 7, "Nuts", true).unwrap();
        let labels: Vec<_> = buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Add a Nuts", "Remove a Nuts", "Delete Nuts"]);
        assert_eq!(buttons[1].custom_id, "flquantity_dec_42_7_Nuts");
    }
}
