use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, Duration, PrimitiveDateTime};

pub const MIN_CALORIES: i64 = 1;
pub const MAX_CALORIES: i64 = 5000;
pub const MAX_FOOD_ITEM_LEN: usize = 50;

/// Budget row. A user without one is "not configured".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct User {
    pub id: String,                      // chat platform account id
    pub daily_calories: i64,             // [1, 5000]
    pub streak_count: i64,               // consecutive days with a log
    pub last_logged_date: Option<Date>,  // date of the last streak update
}

impl User {
    /// Streak as of `today`: a streak whose last day is older than yesterday is broken.
    pub fn current_streak(&self, today: Date) -> i64 {
        match self.last_logged_date {
            Some(last) if last == today || Some(last) == today.previous_day() => self.streak_count,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct FoodLog {
    pub id: i64,
    pub user_id: String,
    pub food_item: String,
    pub calories_per_unit: i64,
    pub quantity: i64,
    pub logged_at: PrimitiveDateTime,
}

impl FoodLog {
    pub fn effective_calories(&self) -> i64 {
        self.calories_per_unit * self.quantity
    }
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewFoodLog {
    pub user_id: String,
    pub food_item: String,
    pub calories_per_unit: i64,
    pub quantity: i64,
    pub logged_at: PrimitiveDateTime,
}

/// Full replacement of an existing log's editable fields, scoped by id and owner.
#[derive(Debug, Clone)]
pub struct FoodLogEdit {
    pub id: i64,
    pub user_id: String,
    pub food_item: String,
    pub calories_per_unit: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increment,
    Decrement,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Increment => "inc",
            Direction::Decrement => "dec",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inc" => Some(Direction::Increment),
            "dec" => Some(Direction::Decrement),
            _ => None,
        }
    }
}

/// Sunday on or before `date`.
pub fn week_start(date: Date) -> Date {
    let days_since_sunday = date.weekday().number_days_from_sunday();
    date - Duration::days(days_since_sunday as i64)
}
