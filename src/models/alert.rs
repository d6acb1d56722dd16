use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Above,
    Below,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Above => "above",
            Condition::Below => "below",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Once,
    PerMinute,
    PerHour,
    PerDay,
}

impl Frequency {
    /// Minimum minutes between two notifications. `None` for one-shot alerts.
    pub fn cooldown_minutes(&self) -> Option<f64> {
        match self {
            Frequency::Once => None,
            Frequency::PerMinute => Some(1.0),
            Frequency::PerHour => Some(60.0),
            Frequency::PerDay => Some(1440.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::PerMinute => "per_minute",
            Frequency::PerHour => "per_hour",
            Frequency::PerDay => "per_day",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub symbol: String,

    #[serde(default)]
    pub company_name: Option<String>,

    pub condition: Condition,
    pub target_price: f64,

    #[serde(default)]
    pub frequency: Frequency,

    pub is_active: bool,
    pub is_triggered: bool,

    // unix seconds
    #[serde(default)]
    pub last_triggered_at: Option<i64>,
    pub created_at: i64,
}

impl Alert {
    /// Name shown in notifications; falls back to the ticker.
    pub fn display_name(&self) -> &str {
        self.company_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.symbol)
    }
}

/// Post-fire state change, guarded by the `last_triggered_at` and
/// `frequency` the engine observed when it evaluated the alert.
#[derive(Debug, Clone, PartialEq)]
pub struct FirePatch {
    pub expected_last_triggered_at: Option<i64>,
    pub expected_frequency: Frequency,
    pub is_triggered: bool,
    pub last_triggered_at: i64,
    pub is_active: bool,
}

impl FirePatch {
    pub fn for_alert(alert: &Alert, now: i64) -> Self {
        Self {
            expected_last_triggered_at: alert.last_triggered_at,
            expected_frequency: alert.frequency,
            is_triggered: true,
            last_triggered_at: now,
            is_active: alert.frequency != Frequency::Once,
        }
    }
}
