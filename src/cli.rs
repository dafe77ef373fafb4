//! CLI: stdin/stdout REPL over the action handlers, for local testing.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error;
use crate::onboarding::{MergeOutcome, OnboardingManager, SlideAdvance};
use crate::preferences::{PreferencesStore, Theme};

pub const HELP: &str = "\
Commands:
  status                 show onboarding state and progress
  start                  record the onboarding start time
  next | prev            move one slide
  goto <index>           jump to a slide
  mark <slide-id>        mark a slide completed
  personal k=v ...       update personal info draft
  goals k=v ...          update goals draft
  prefs k=v ...          update preferences draft
  complete               validate and finish onboarding
  reset                  reset onboarding and clear its stored keys
  theme light|dark|system
  units on|off           metric units
  help | quit";

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Start,
    Next,
    Previous,
    Goto(usize),
    Mark(String),
    PersonalInfo(Map<String, Value>),
    Goals(Map<String, Value>),
    Preferences(Map<String, Value>),
    Complete,
    Reset,
    Theme(Theme),
    Units(bool),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let head = parts.next().ok_or("empty command")?;
        let rest: Vec<&str> = parts.collect();

        let single = |name: &str| single_arg(&rest, name);

        match head {
            "status" => Ok(Self::Status),
            "start" => Ok(Self::Start),
            "next" => Ok(Self::Next),
            "prev" | "previous" => Ok(Self::Previous),
            "goto" => single("goto")?
                .parse()
                .map(Self::Goto)
                .map_err(|_| "slide index must be a non-negative number".to_string()),
            "mark" => single("mark").map(|id| Self::Mark(id.to_string())),
            "personal" => parse_fields(&rest).map(Self::PersonalInfo),
            "goals" => parse_fields(&rest).map(Self::Goals),
            "prefs" => parse_fields(&rest).map(Self::Preferences),
            "complete" => Ok(Self::Complete),
            "reset" => Ok(Self::Reset),
            "theme" => single("theme")?.parse().map(Self::Theme),
            "units" => match single("units")? {
                "on" | "metric" => Ok(Self::Units(true)),
                "off" | "imperial" => Ok(Self::Units(false)),
                other => Err(format!("units expects on|off, got {other}")),
            },
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

fn single_arg<'a>(rest: &[&'a str], name: &str) -> Result<&'a str, String> {
    match rest {
        [arg] => Ok(*arg),
        _ => Err(format!("usage: {name} <value>")),
    }
}

/// `k=v` pairs; values that parse as JSON keep their type, anything else is
/// a string.
fn parse_fields(pairs: &[&str]) -> Result<Map<String, Value>, String> {
    if pairs.is_empty() {
        return Err("expected one or more key=value pairs".to_string());
    }
    let mut map = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {pair}"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

fn describe_merge(outcome: &MergeOutcome) -> String {
    let mut lines = Vec::new();
    if !outcome.accepted.is_empty() {
        lines.push(format!("accepted: {}", outcome.accepted.join(", ")));
    }
    for (field, message) in &outcome.rejected {
        lines.push(format!("rejected {field}: {message}"));
    }
    lines.join("\n")
}

/// Run one command and render the result.
pub async fn execute(
    command: Command,
    onboarding: &OnboardingManager,
    preferences: &PreferencesStore,
) -> String {
    match command {
        Command::Status => {
            let status = onboarding.status().await;
            let prefs = preferences.state().await;
            format!(
                "step {} ({}) of {}, {:.0}% complete, onboarded: {}\ntheme: {}, metric units: {}, hydrated: {}",
                status.progress.current,
                status.current_step,
                status.progress.total,
                status.progress.percentage,
                status.is_onboarded,
                prefs.theme,
                prefs.metric_units,
                prefs.has_hydrated,
            )
        }
        Command::Start => {
            if onboarding.start().await {
                "onboarding started".to_string()
            } else {
                "onboarding already completed".to_string()
            }
        }
        Command::Next => match onboarding.next_slide().await {
            SlideAdvance::Moved(index) => format!("now on slide {index}"),
            SlideAdvance::AtEnd => "already on the last slide, try `complete`".to_string(),
            SlideAdvance::Completed => "onboarding already completed, `reset` to start over".to_string(),
        },
        Command::Previous => {
            if onboarding.previous_slide().await {
                let index = onboarding.progress().await.current;
                format!("now on slide {index}")
            } else {
                "already on the first slide".to_string()
            }
        }
        Command::Goto(index) => render(goto(onboarding, index).await),
        Command::Mark(slide_id) => {
            if onboarding.mark_slide_completed(&slide_id).await {
                let progress = onboarding.progress().await;
                format!("{slide_id} completed ({:.0}%)", progress.percentage)
            } else {
                format!("no slide named {slide_id}")
            }
        }
        Command::PersonalInfo(fields) => {
            describe_merge(&onboarding.update_personal_info(&fields).await)
        }
        Command::Goals(fields) => describe_merge(&onboarding.update_goals(&fields).await),
        Command::Preferences(fields) => {
            describe_merge(&onboarding.update_preferences(&fields).await)
        }
        Command::Complete => render(complete(onboarding).await),
        Command::Reset => {
            let report = onboarding.reset_onboarding().await;
            if report.failed.is_empty() {
                "onboarding reset".to_string()
            } else {
                format!("onboarding reset, could not clear: {}", report.failed.join(", "))
            }
        }
        Command::Theme(theme) => {
            preferences.set_theme(theme).await;
            format!("theme set to {theme}")
        }
        Command::Units(metric) => {
            preferences.set_metric_units(metric).await;
            format!("metric units {}", if metric { "on" } else { "off" })
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

async fn goto(onboarding: &OnboardingManager, index: usize) -> error::Result<String> {
    onboarding.set_current_slide_index(index).await?;
    Ok(format!("now on slide {index}"))
}

async fn complete(onboarding: &OnboardingManager) -> error::Result<String> {
    let record = onboarding.complete_onboarding().await?;
    Ok(format!("onboarding complete, welcome {}", record.personal_info.name))
}

fn render(result: error::Result<String>) -> String {
    result.unwrap_or_else(|e| e.to_string())
}

/// Read commands from stdin until `quit` or EOF.
pub async fn run_repl(onboarding: Arc<OnboardingManager>, preferences: Arc<PreferencesStore>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    eprint!("> ");
                    continue;
                }
                match Command::parse(line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        let output = execute(command, &onboarding, &preferences).await;
                        println!("{output}");
                    }
                    Err(e) => eprintln!("{e}"),
                }
                eprint!("> ");
            }
            Ok(None) => break, // EOF
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_navigation() {
        assert_eq!(Command::parse("next").unwrap(), Command::Next);
        assert_eq!(Command::parse("  prev ").unwrap(), Command::Previous);
        assert_eq!(Command::parse("goto 3").unwrap(), Command::Goto(3));
        assert!(Command::parse("goto -1").is_err());
        assert!(Command::parse("goto").is_err());
        assert_eq!(
            Command::parse("mark welcome").unwrap(),
            Command::Mark("welcome".into())
        );
    }

    #[test]
    fn parses_typed_fields() {
        let cmd = Command::parse("personal name=Sam age=31 heightCm=172.5").unwrap();
        let Command::PersonalInfo(fields) = cmd else {
            panic!("expected PersonalInfo");
        };
        assert_eq!(fields["name"], json!("Sam"));
        assert_eq!(fields["age"], json!(31));
        assert_eq!(fields["heightCm"], json!(172.5));

        let Command::Preferences(fields) =
            Command::parse(r#"prefs metricUnits=false dietaryRestrictions=["vegan"]"#).unwrap()
        else {
            panic!("expected Preferences");
        };
        assert_eq!(fields["metricUnits"], json!(false));
        assert_eq!(fields["dietaryRestrictions"], json!(["vegan"]));

        assert!(Command::parse("goals").is_err());
        assert!(Command::parse("goals dailyWaterGoal").is_err());
    }

    #[test]
    fn parses_preferences() {
        assert_eq!(Command::parse("theme dark").unwrap(), Command::Theme(Theme::Dark));
        assert!(Command::parse("theme sepia").is_err());
        assert_eq!(Command::parse("units off").unwrap(), Command::Units(false));
        assert!(Command::parse("units maybe").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[tokio::test]
    async fn execute_reports_typed_errors() {
        use crate::auth::AuthStore;
        use crate::store::{MemoryStore, StoreContext};

        let stores = StoreContext::new(
            Arc::new(MemoryStore::new("secure")),
            Arc::new(MemoryStore::new("general")),
        );
        let auth = Arc::new(AuthStore::new(Arc::clone(&stores.secure)));
        let onboarding = OnboardingManager::new(stores.clone(), auth);
        let preferences = PreferencesStore::new(Arc::clone(&stores.general));

        let out = execute(Command::Goto(9), &onboarding, &preferences).await;
        assert_eq!(out, "Navigation error: Slide index 9 out of range (0..5)");

        let out = execute(Command::Goto(2), &onboarding, &preferences).await;
        assert_eq!(out, "now on slide 2");

        let out = execute(Command::Complete, &onboarding, &preferences).await;
        assert!(out.starts_with("Validation error: "), "{out}");
    }
}
