use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Relative time window used to narrow the displayed event list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "kebab-case")]
pub enum DateFilterCriterion {
    #[default]
    All,
    Today,
    CurrentWeek,
    LastWeek,
    CurrentMonth,
    LastMonth,
}

impl DateFilterCriterion {
    pub const ALL: [DateFilterCriterion; 6] = [
        DateFilterCriterion::All,
        DateFilterCriterion::Today,
        DateFilterCriterion::CurrentWeek,
        DateFilterCriterion::LastWeek,
        DateFilterCriterion::CurrentMonth,
        DateFilterCriterion::LastMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateFilterCriterion::All => "all",
            DateFilterCriterion::Today => "today",
            DateFilterCriterion::CurrentWeek => "current-week",
            DateFilterCriterion::LastWeek => "last-week",
            DateFilterCriterion::CurrentMonth => "current-month",
            DateFilterCriterion::LastMonth => "last-month",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateFilterCriterion::All => "All Events",
            DateFilterCriterion::Today => "Today",
            DateFilterCriterion::CurrentWeek => "Current Week",
            DateFilterCriterion::LastWeek => "Last Week",
            DateFilterCriterion::CurrentMonth => "Current Month",
            DateFilterCriterion::LastMonth => "Last Month",
        }
    }
}

impl fmt::Display for DateFilterCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown date filter `{0}`, expected one of all, today, current-week, last-week, current-month, last-month")]
pub struct ParseDateFilterError(pub String);

impl FromStr for DateFilterCriterion {
    type Err = ParseDateFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|criterion| criterion.as_str() == s)
            .ok_or_else(|| ParseDateFilterError(s.to_string()))
    }
}
