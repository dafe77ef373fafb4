//! Preference data models.

use serde::{Deserialize, Serialize};

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

/// The persisted part of the preferences state. Never carries the
/// hydration flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesSnapshot {
    pub theme: Theme,
    pub metric_units: bool,
}

impl Default for PreferencesSnapshot {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            metric_units: true,
        }
    }
}

/// Versioned wrapper written under the preferences key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEnvelope<T> {
    pub state: T,
    #[serde(default)]
    pub version: u32,
}

/// What consumers observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesState {
    pub theme: Theme,
    pub metric_units: bool,
    /// False until the persisted snapshot (or its absence) has been read.
    #[serde(rename = "_hasHydrated")]
    pub has_hydrated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parse_and_display() {
        for theme in [Theme::Light, Theme::Dark, Theme::System] {
            let parsed: Theme = theme.to_string().parse().unwrap();
            assert_eq!(parsed, theme);
            assert_eq!(
                serde_json::to_string(&theme).unwrap(),
                format!("\"{theme}\"")
            );
        }
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn envelope_shape() {
        let envelope = PersistedEnvelope {
            state: PreferencesSnapshot {
                theme: Theme::Dark,
                metric_units: false,
            },
            version: 0,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": {"theme": "dark", "metricUnits": false}, "version": 0})
        );
    }

    #[test]
    fn state_serializes_hydration_flag_name() {
        let state = PreferencesState {
            theme: Theme::Light,
            metric_units: true,
            has_hydrated: true,
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["_hasHydrated"], true);
        assert_eq!(json["metricUnits"], true);
    }
}
