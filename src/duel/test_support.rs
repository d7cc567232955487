//! Shared fixtures for unit tests.

use super::settings::{Settings, TimeLimits};
use super::types::{Question, Round};
use chrono::{DateTime, Utc};

/// Fixed start instant.
pub fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Two players, one round, one question worth 100 ("Paris").
pub fn paris_settings() -> Settings {
    Settings::resolve(
        vec!["alice".into(), "bob".into()],
        vec![Round::new(1, vec![Question::new(1, 100, "Paris")])],
        TimeLimits::default(),
    )
    .unwrap()
}

/// Three players, two rounds.
pub fn three_player_settings() -> Settings {
    Settings::resolve(
        vec!["alice".into(), "bob".into(), "carol".into()],
        vec![
            Round::new(
                1,
                vec![Question::new(11, 100, "two"), Question::new(12, 200, "four")],
            ),
            Round::new(2, vec![Question::new(21, 300, "six")]),
        ],
        TimeLimits::default(),
    )
    .unwrap()
}
