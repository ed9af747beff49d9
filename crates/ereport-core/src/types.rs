use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Cadence of a report schedule.
///
/// Persisted as the integer code the schedule table has always used
/// (0 = daily … 5 = yearly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    Daily,
    Weekly,
    Fortnightly,
    Monthly,
    Quarterly,
    Yearly,
}

impl IntervalKind {
    pub const ALL: [IntervalKind; 6] = [
        IntervalKind::Daily,
        IntervalKind::Weekly,
        IntervalKind::Fortnightly,
        IntervalKind::Monthly,
        IntervalKind::Quarterly,
        IntervalKind::Yearly,
    ];

    pub fn code(self) -> i64 {
        match self {
            IntervalKind::Daily => 0,
            IntervalKind::Weekly => 1,
            IntervalKind::Fortnightly => 2,
            IntervalKind::Monthly => 3,
            IntervalKind::Quarterly => 4,
            IntervalKind::Yearly => 5,
        }
    }

    /// Unknown codes fall back to daily.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => IntervalKind::Weekly,
            2 => IntervalKind::Fortnightly,
            3 => IntervalKind::Monthly,
            4 => IntervalKind::Quarterly,
            5 => IntervalKind::Yearly,
            _ => IntervalKind::Daily,
        }
    }
}

impl fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntervalKind::Daily => "daily",
            IntervalKind::Weekly => "weekly",
            IntervalKind::Fortnightly => "fortnightly",
            IntervalKind::Monthly => "monthly",
            IntervalKind::Quarterly => "quarterly",
            IntervalKind::Yearly => "yearly",
        };
        write!(f, "{s}")
    }
}

/// Accepts the lowercase name (`weekly`) or the stored integer code (`1`).
impl FromStr for IntervalKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return match code {
                0..=5 => Ok(IntervalKind::from_code(code)),
                _ => Err(CoreError::UnknownInterval(s.to_string())),
            };
        }
        IntervalKind::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownInterval(s.to_string()))
    }
}

/// A recurrence rule plus the metadata needed to build and send one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub interval: IntervalKind,
    /// Weekday index (0 = Sunday) for weekly schedules, day of month otherwise.
    pub day: i64,
    /// Time of day, `HH:MM`.
    pub time: String,
    /// Unix seconds of the next run.
    pub next_report_time: i64,
    /// Query window length in seconds, counted back from the run time.
    pub lookback: i64,
    pub name: String,
    pub description: String,
    #[serde(rename = "reportGroupID")]
    pub report_group_id: String,
    /// strftime pattern attached to the report file name. Empty disables it.
    #[serde(default)]
    pub date_format: String,
    /// `prefix` or `suffix`; anything else leaves the name untouched.
    #[serde(default)]
    pub date_position: String,
}

/// One panel of a schedule: stored SQL plus the variable selections made for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelQuery {
    #[serde(rename = "scheduleID", default)]
    pub schedule_id: String,
    #[serde(rename = "panelID")]
    pub panel_id: i64,
    #[serde(rename = "dashboardID")]
    pub dashboard_id: String,
    /// Sheet title of the rendered panel.
    pub title: String,
    pub raw_sql: String,
    /// JSON object mapping variable name to its selected options.
    #[serde(default)]
    pub variables: String,
}

/// Dashboard template variable and the text used when nothing is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub name: String,
    pub definition: String,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// Parse the per-panel selection JSON (`{"var": ["a", "b"]}`).
///
/// Returns `None` when the payload is not a name → list-of-strings object.
pub fn parse_selections(json: &str) -> Option<HashMap<String, Vec<String>>> {
    serde_json::from_str(json).ok()
}

/// Query time window in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: i64,
    pub to: i64,
}

impl TimeWindow {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// Window of `lookback_secs` ending at `to`.
    pub fn ending_at(to: i64, lookback_secs: i64) -> Self {
        Self {
            from: to - lookback_secs.max(0),
            to,
        }
    }
}

/// A single value of a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Nested arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Scalar::Null,
            serde_json::Value::Bool(b) => Scalar::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Scalar::Null, Scalar::Number),
            serde_json::Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Tabular payload of one panel; becomes one sheet of the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl ResultSet {
    pub fn new(title: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        Self {
            title: title.into(),
            columns,
            rows,
        }
    }
}
