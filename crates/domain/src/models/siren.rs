//! Siren models. Physical siren state lives in the realtime store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SirenType {
    Typhoon,
    Flood,
    Earthquake,
}

impl SirenType {
    pub const ALL: [SirenType; 3] = [SirenType::Typhoon, SirenType::Flood, SirenType::Earthquake];

    pub fn as_str(&self) -> &'static str {
        match self {
            SirenType::Typhoon => "typhoon",
            SirenType::Flood => "flood",
            SirenType::Earthquake => "earthquake",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            SirenType::Typhoon => "Typhoon",
            SirenType::Flood => "Flood",
            SirenType::Earthquake => "Earthquake",
        }
    }

    /// Realtime store path holding this siren's boolean state.
    pub fn realtime_path(&self) -> String {
        format!("emergency_siren_{}", self.as_str())
    }
}

impl FromStr for SirenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "typhoon" => Ok(SirenType::Typhoon),
            "flood" => Ok(SirenType::Flood),
            "earthquake" => Ok(SirenType::Earthquake),
            _ => Err(format!(
                "Invalid siren type: {}. Must be one of: typhoon, flood, earthquake",
                s
            )),
        }
    }
}

impl fmt::Display for SirenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a siren state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SirenAction {
    Activated,
    Deactivated,
}

impl SirenAction {
    pub fn for_state(active: bool) -> Self {
        if active {
            SirenAction::Activated
        } else {
            SirenAction::Deactivated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SirenAction::Activated => "activated",
            SirenAction::Deactivated => "deactivated",
        }
    }

    /// Collection receiving log entries for this action.
    pub fn log_collection(&self) -> &'static str {
        match self {
            SirenAction::Activated => "siren_activations",
            SirenAction::Deactivated => "siren_deactivations",
        }
    }
}

/// Current state of all sirens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SirenStates {
    pub typhoon: bool,
    pub flood: bool,
    pub earthquake: bool,
}

impl SirenStates {
    pub fn get(&self, siren: SirenType) -> bool {
        match siren {
            SirenType::Typhoon => self.typhoon,
            SirenType::Flood => self.flood,
            SirenType::Earthquake => self.earthquake,
        }
    }

    pub fn set(&mut self, siren: SirenType, active: bool) {
        match siren {
            SirenType::Typhoon => self.typhoon = active,
            SirenType::Flood => self.flood = active,
            SirenType::Earthquake => self.earthquake = active,
        }
    }
}

/// Result of a toggle request.
#[derive(Debug, Clone, Serialize)]
pub struct SirenChange {
    pub success: bool,
    pub siren_type: String,
    pub previous_status: bool,
    pub new_status: bool,
    pub action: SirenAction,
}

impl SirenChange {
    pub fn new(siren: SirenType, previous: bool, current: bool) -> Self {
        Self {
            success: true,
            siren_type: siren.as_str().to_uppercase(),
            previous_status: previous,
            new_status: current,
            action: SirenAction::for_state(current),
        }
    }

    pub fn message(&self, siren: SirenType) -> String {
        format!(
            "{} siren has been {}",
            siren.display_label(),
            self.action.as_str()
        )
    }
}

/// Entry of `siren_activations` / `siren_deactivations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SirenLog {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub siren_type: String,
    #[serde(default, with = "lenient::timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub triggered_by: String,
}
