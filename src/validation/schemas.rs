//! Onboarding record schemas and the typed records they produce.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{FieldRule, FieldSpec, Schema};
use crate::error::{FieldErrors, ValidationError};
use crate::preferences::Theme;

static REMINDER_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("valid reminder regex"));

static PERSONAL_INFO: LazyLock<Schema> = LazyLock::new(|| Schema {
    name: "personalInfo",
    fields: vec![
        FieldSpec::required("name", FieldRule::Text { min: 1, max: 50 }),
        FieldSpec::required("age", FieldRule::Integer { min: 13, max: 120 }),
        FieldSpec::required(
            "gender",
            FieldRule::OneOf(&["male", "female", "other", "prefer_not_to_say"]),
        ),
        FieldSpec::required("heightCm", FieldRule::Number { min: 50.0, max: 300.0 }),
        FieldSpec::required("weightKg", FieldRule::Number { min: 20.0, max: 500.0 }),
        FieldSpec::required(
            "activityLevel",
            FieldRule::OneOf(&["sedentary", "light", "moderate", "active", "very_active"]),
        ),
    ],
});

static GOALS: LazyLock<Schema> = LazyLock::new(|| Schema {
    name: "goals",
    fields: vec![
        FieldSpec::required(
            "primaryGoal",
            FieldRule::OneOf(&[
                "lose_weight",
                "maintain_weight",
                "gain_muscle",
                "improve_fitness",
                "reduce_stress",
            ]),
        ),
        FieldSpec::optional("targetWeightKg", FieldRule::Number { min: 20.0, max: 500.0 }),
        FieldSpec::required("dailyWaterGoal", FieldRule::Integer { min: 1, max: 20 }),
        FieldSpec::optional("dailyStepGoal", FieldRule::Integer { min: 1_000, max: 100_000 }),
        FieldSpec::required("weeklyWorkouts", FieldRule::Integer { min: 0, max: 14 }),
        FieldSpec::optional("dailyCalorieGoal", FieldRule::Integer { min: 800, max: 10_000 }),
    ],
});

static PREFERENCES: LazyLock<Schema> = LazyLock::new(|| Schema {
    name: "preferences",
    fields: vec![
        FieldSpec::required("theme", FieldRule::OneOf(&["light", "dark", "system"])),
        FieldSpec::required("metricUnits", FieldRule::Boolean),
        FieldSpec::required("notificationsEnabled", FieldRule::Boolean),
        FieldSpec::optional(
            "reminderTime",
            FieldRule::Pattern {
                regex: LazyLock::force(&REMINDER_TIME),
                hint: "HH:MM (24-hour)",
            },
        ),
        FieldSpec::optional(
            "dietaryRestrictions",
            FieldRule::TextList {
                max_items: 10,
                min_len: 1,
                max_len: 40,
            },
        ),
    ],
});

pub fn personal_info_schema() -> &'static Schema {
    &PERSONAL_INFO
}

pub fn goals_schema() -> &'static Schema {
    &GOALS
}

pub fn preferences_schema() -> &'static Schema {
    &PREFERENCES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    LoseWeight,
    MaintainWeight,
    GainMuscle,
    ImproveFitness,
    ReduceStress,
}

/// Validated personal-info step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
}

/// Validated goals step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goals {
    pub primary_goal: PrimaryGoal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight_kg: Option<f64>,
    /// Glasses per day.
    pub daily_water_goal: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_step_goal: Option<u32>,
    pub weekly_workouts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_calorie_goal: Option<u32>,
}

/// Validated preferences step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub metric_units: bool,
    pub notifications_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
}

/// The full onboarding record accepted at completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOnboarding {
    pub personal_info: PersonalInfo,
    pub goals: Goals,
    pub preferences: Preferences,
}

/// Validate the three accumulated drafts as one composite record. Error paths
/// are prefixed with the section name, e.g. `goals.dailyWaterGoal`.
pub fn validate_complete(
    personal_info: &Map<String, Value>,
    goals: &Map<String, Value>,
    preferences: &Map<String, Value>,
) -> Result<CompleteOnboarding, ValidationError> {
    let mut errors = FieldErrors::new();

    let personal_info = collect(personal_info_schema(), personal_info, &mut errors);
    let goals = collect(goals_schema(), goals, &mut errors);
    let preferences = collect(preferences_schema(), preferences, &mut errors);

    match (personal_info, goals, preferences) {
        (Some(personal_info), Some(goals), Some(preferences)) if errors.is_empty() => {
            Ok(CompleteOnboarding {
                personal_info,
                goals,
                preferences,
            })
        }
        _ => Err(ValidationError::new(errors)),
    }
}

fn collect<T: serde::de::DeserializeOwned>(
    schema: &Schema,
    record: &Map<String, Value>,
    errors: &mut FieldErrors,
) -> Option<T> {
    match schema.validate(record) {
        Ok(value) => Some(value),
        Err(field_errors) => {
            for (field, message) in field_errors {
                let path = if field == schema.name {
                    field
                } else {
                    format!("{}.{}", schema.name, field)
                };
                errors.insert(path, message);
            }
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn valid_personal_info() -> Map<String, Value> {
        json!({
            "name": "Sam",
            "age": 31,
            "gender": "prefer_not_to_say",
            "heightCm": 172.5,
            "weightKg": 70,
            "activityLevel": "moderate"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    pub(crate) fn valid_goals() -> Map<String, Value> {
        json!({
            "primaryGoal": "improve_fitness",
            "dailyWaterGoal": 8,
            "dailyStepGoal": 10000,
            "weeklyWorkouts": 3
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    pub(crate) fn valid_preferences() -> Map<String, Value> {
        json!({
            "theme": "dark",
            "metricUnits": true,
            "notificationsEnabled": true,
            "reminderTime": "07:30",
            "dietaryRestrictions": ["vegetarian"]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn complete_record_validates() {
        let record =
            validate_complete(&valid_personal_info(), &valid_goals(), &valid_preferences())
                .unwrap();

        assert_eq!(record.personal_info.name, "Sam");
        assert_eq!(record.personal_info.gender, Gender::PreferNotToSay);
        assert_eq!(record.personal_info.weight_kg, 70.0);
        assert_eq!(record.goals.primary_goal, PrimaryGoal::ImproveFitness);
        assert_eq!(record.goals.daily_step_goal, Some(10_000));
        assert!(record.goals.target_weight_kg.is_none());
        assert_eq!(record.preferences.theme, Theme::Dark);
        assert_eq!(record.preferences.dietary_restrictions, vec!["vegetarian"]);
    }

    #[test]
    fn negative_water_goal_is_reported_with_path() {
        let mut goals = valid_goals();
        goals.insert("dailyWaterGoal".into(), json!(-1));

        let err = validate_complete(&valid_personal_info(), &goals, &valid_preferences())
            .unwrap_err();
        assert_eq!(
            err.field_errors.get("goals.dailyWaterGoal").map(String::as_str),
            Some("must be at least 1")
        );
        assert_eq!(err.field_errors.len(), 1);
    }

    #[test]
    fn empty_drafts_list_every_required_field() {
        let empty = Map::new();
        let err = validate_complete(&empty, &empty, &empty).unwrap_err();

        assert!(err.field_errors.contains_key("personalInfo.name"));
        assert!(err.field_errors.contains_key("goals.primaryGoal"));
        assert!(err.field_errors.contains_key("preferences.theme"));
        assert!(!err.field_errors.contains_key("goals.targetWeightKg"));
        assert!(err.summary.contains("is required"));
    }

    #[test]
    fn reminder_time_pattern() {
        let schema = preferences_schema();
        assert!(schema.validate_field("reminderTime", &json!("23:59")).is_ok());
        assert!(schema.validate_field("reminderTime", &json!("24:00")).is_err());
        assert!(schema.validate_field("reminderTime", &json!("7:30")).is_err());
    }

    #[test]
    fn age_bounds() {
        let schema = personal_info_schema();
        assert!(schema.validate_field("age", &json!(13)).is_ok());
        assert!(schema.validate_field("age", &json!(12)).is_err());
        assert!(schema.validate_field("age", &json!(121)).is_err());
    }
}
