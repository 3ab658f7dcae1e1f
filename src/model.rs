use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

pub const GOAL_TITLE_MAX: usize = 35;
pub const TASK_TITLE_MAX: usize = 100;
pub const LADDER_TASK_LIMIT: usize = 50;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalUnit {
    Dollars,
    Leads,
    Tasks,
    Calls,
    Meetings,
    Hours,
    Custom,
}

impl GoalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dollars => "dollars",
            Self::Leads => "leads",
            Self::Tasks => "tasks",
            Self::Calls => "calls",
            Self::Meetings => "meetings",
            Self::Hours => "hours",
            Self::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dollars" => Some(Self::Dollars),
            "leads" => Some(Self::Leads),
            "tasks" => Some(Self::Tasks),
            "calls" => Some(Self::Calls),
            "meetings" => Some(Self::Meetings),
            "hours" => Some(Self::Hours),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPeriod {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl GoalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    // Month arithmetic clamps to the last day of the target month.
    pub fn date_range(&self, start: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = match self {
            Self::Weekly => start.checked_add_signed(Duration::days(7)),
            Self::Monthly => start.checked_add_months(Months::new(1)),
            Self::Quarterly => start.checked_add_months(Months::new(3)),
            Self::Yearly => start.checked_add_months(Months::new(12)),
        };
        (start, end.unwrap_or(NaiveDate::MAX))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Failed,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewGoal {
    pub title: String,
    pub target_value: f64,
    pub unit: GoalUnit,
    pub custom_unit: Option<String>,
    pub period: GoalPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_ladder: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub status: TaskStatus,
    pub position: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalPatch {
    pub is_ladder: Option<bool>,
    pub status: Option<GoalStatus>,
    pub current_value: Option<f64>,
}

impl GoalPatch {
    pub fn ladder() -> Self {
        Self {
            is_ladder: Some(true),
            ..Default::default()
        }
    }
}

pub fn title_len(value: &str) -> usize {
    value.trim().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn period_ranges_end_after_start() {
        let start = date(2026, 1, 31);
        assert_eq!(GoalPeriod::Weekly.date_range(start).1, date(2026, 2, 7));
        assert_eq!(GoalPeriod::Monthly.date_range(start).1, date(2026, 2, 28));
        assert_eq!(GoalPeriod::Quarterly.date_range(start).1, date(2026, 4, 30));
        assert_eq!(GoalPeriod::Yearly.date_range(start).1, date(2027, 1, 31));
        for period in [
            GoalPeriod::Weekly,
            GoalPeriod::Monthly,
            GoalPeriod::Quarterly,
            GoalPeriod::Yearly,
        ] {
            let (from, to) = period.date_range(start);
            assert!(to > from);
        }
    }

    #[test]
    fn enum_names_parse_back() {
        for unit in ["dollars", "leads", "tasks", "calls", "meetings", "hours", "custom"] {
            assert_eq!(GoalUnit::parse(unit).map(|u| u.as_str()), Some(unit));
        }
        assert_eq!(
            TaskStatus::parse("in_progress"),
            Some(TaskStatus::InProgress)
        );
        assert_eq!(GoalStatus::parse("paused"), None);
    }

    #[test]
    fn title_len_counts_chars() {
        assert_eq!(title_len("  café  "), 4);
    }
}
