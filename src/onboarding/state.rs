//! Onboarding state machine: step/slide progression and per-step drafts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldErrors, NavigationError};
use crate::validation::{Schema, goals_schema, personal_info_schema, preferences_schema};

/// The fixed onboarding sequence.
///
/// Progresses linearly: Welcome → PersonalInfo → Goals → Preferences → Complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnboardingStep {
    Welcome,
    PersonalInfo,
    Goals,
    Preferences,
    Complete,
}

impl OnboardingStep {
    /// Every step, in order.
    pub const ALL: [OnboardingStep; 5] = [
        Self::Welcome,
        Self::PersonalInfo,
        Self::Goals,
        Self::Preferences,
        Self::Complete,
    ];

    /// Slide identifier used by the UI and in persisted progress.
    pub fn slide_id(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::PersonalInfo => "personal-info",
            Self::Goals => "goals",
            Self::Preferences => "preferences",
            Self::Complete => "complete",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slide_id())
    }
}

/// Completion flag for one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideProgress {
    pub slide_id: String,
    pub completed: bool,
}

/// Which draft accumulator a partial update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    PersonalInfo,
    Goals,
    Preferences,
}

impl Section {
    pub fn schema(&self) -> &'static Schema {
        match self {
            Self::PersonalInfo => personal_info_schema(),
            Self::Goals => goals_schema(),
            Self::Preferences => preferences_schema(),
        }
    }
}

/// Outcome of `next_slide`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "index", rename_all = "snake_case")]
pub enum SlideAdvance {
    /// Moved to the given index.
    Moved(usize),
    /// Already on the last slide; nothing changed.
    AtEnd,
    /// Onboarding is completed; navigation is frozen until reset.
    Completed,
}

/// Fields accepted and rejected by a partial merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub accepted: Vec<String>,
    pub rejected: FieldErrors,
}

/// Derived progress metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
}

/// Navigation position, persisted to the secure store on every move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedProgress {
    pub current_step_index: usize,
    pub slides_progress: Vec<SlideProgress>,
}

/// In-progress drafts, persisted to the secure store on every update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingDraft {
    #[serde(default)]
    pub personal_info: Map<String, Value>,
    #[serde(default)]
    pub goals: Map<String, Value>,
    #[serde(default)]
    pub preferences: Map<String, Value>,
}

/// Full onboarding state.
///
/// Invariant: `current_step_index < slides_progress.len()` and the slide ids
/// follow `OnboardingStep::ALL`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    current_step_index: usize,
    slides_progress: Vec<SlideProgress>,
    personal_info: Map<String, Value>,
    goals: Map<String, Value>,
    preferences: Map<String, Value>,
    is_onboarding_completed: bool,
    error: Option<String>,
}

impl Default for OnboardingState {
    fn default() -> Self {
        Self {
            current_step_index: 0,
            slides_progress: OnboardingStep::ALL
                .iter()
                .map(|step| SlideProgress {
                    slide_id: step.slide_id().to_string(),
                    completed: false,
                })
                .collect(),
            personal_info: Map::new(),
            goals: Map::new(),
            preferences: Map::new(),
            is_onboarding_completed: false,
            error: None,
        }
    }
}

impl OnboardingState {
    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn current_step(&self) -> OnboardingStep {
        OnboardingStep::ALL[self.current_step_index]
    }

    pub fn slides_progress(&self) -> &[SlideProgress] {
        &self.slides_progress
    }

    pub fn personal_info(&self) -> &Map<String, Value> {
        &self.personal_info
    }

    pub fn goals(&self) -> &Map<String, Value> {
        &self.goals
    }

    pub fn preferences(&self) -> &Map<String, Value> {
        &self.preferences
    }

    pub fn is_onboarding_completed(&self) -> bool {
        self.is_onboarding_completed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.slides_progress.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides_progress.is_empty()
    }

    /// Move forward one slide. Does not mark the current slide completed.
    pub fn next_slide(&mut self) -> SlideAdvance {
        if self.current_step_index + 1 < self.len() {
            self.current_step_index += 1;
            self.error = None;
            SlideAdvance::Moved(self.current_step_index)
        } else {
            SlideAdvance::AtEnd
        }
    }

    /// Move back one slide. Returns false at index 0.
    pub fn previous_slide(&mut self) -> bool {
        if self.current_step_index > 0 {
            self.current_step_index -= 1;
            self.error = None;
            true
        } else {
            false
        }
    }

    /// Jump to `index`. Out-of-range indices leave the state untouched.
    pub fn set_current_slide_index(&mut self, index: usize) -> Result<(), NavigationError> {
        if index >= self.len() {
            return Err(NavigationError::OutOfRange {
                index,
                len: self.len(),
            });
        }
        self.current_step_index = index;
        self.error = None;
        Ok(())
    }

    /// Mark the slide with `slide_id` completed. Unknown ids are ignored and
    /// return false.
    pub fn mark_slide_completed(&mut self, slide_id: &str) -> bool {
        match self.slides_progress.iter_mut().find(|s| s.slide_id == slide_id) {
            Some(slide) => {
                slide.completed = true;
                self.error = None;
                true
            }
            None => false,
        }
    }

    pub fn progress(&self) -> Progress {
        let total = self.len();
        let completed = self.slides_progress.iter().filter(|s| s.completed).count();
        let percentage = if total == 0 {
            0.0
        } else {
            100.0 * completed as f64 / total as f64
        };
        Progress {
            current: self.current_step_index,
            total,
            percentage,
        }
    }

    /// Shallow-merge `partial` into the section's draft, one field at a time.
    /// Fields failing their rule are skipped and reported in the outcome.
    pub fn merge(&mut self, section: Section, partial: &Map<String, Value>) -> MergeOutcome {
        let schema = section.schema();
        let mut outcome = MergeOutcome::default();
        let target = match section {
            Section::PersonalInfo => &mut self.personal_info,
            Section::Goals => &mut self.goals,
            Section::Preferences => &mut self.preferences,
        };

        for (field, value) in partial {
            match schema.validate_field(field, value) {
                Ok(()) if value.is_null() => {
                    target.remove(field);
                    outcome.accepted.push(field.clone());
                }
                Ok(()) => {
                    target.insert(field.clone(), value.clone());
                    outcome.accepted.push(field.clone());
                }
                Err(message) => {
                    outcome.rejected.insert(field.clone(), message);
                }
            }
        }

        if !outcome.accepted.is_empty() {
            self.error = None;
        }
        outcome
    }

    pub(crate) fn mark_completed(&mut self) {
        self.is_onboarding_completed = true;
        self.error = None;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Whether the structural invariant holds.
    pub fn is_consistent(&self) -> bool {
        self.slides_progress.len() == OnboardingStep::ALL.len()
            && self
                .slides_progress
                .iter()
                .zip(OnboardingStep::ALL)
                .all(|(slide, step)| slide.slide_id == step.slide_id())
            && self.current_step_index < self.slides_progress.len()
    }

    /// Accept a deserialized snapshot only if it is consistent.
    pub fn from_snapshot(snapshot: OnboardingState) -> Option<Self> {
        snapshot.is_consistent().then_some(snapshot)
    }

    pub fn persisted_progress(&self) -> PersistedProgress {
        PersistedProgress {
            current_step_index: self.current_step_index,
            slides_progress: self.slides_progress.clone(),
        }
    }

    /// Restore navigation from a persisted record. Inconsistent records are
    /// rejected and leave the state untouched.
    pub fn apply_progress(&mut self, progress: PersistedProgress) -> bool {
        let candidate = Self {
            current_step_index: progress.current_step_index,
            slides_progress: progress.slides_progress,
            ..self.clone()
        };
        if candidate.is_consistent() {
            *self = candidate;
            true
        } else {
            false
        }
    }

    pub fn draft(&self) -> OnboardingDraft {
        OnboardingDraft {
            personal_info: self.personal_info.clone(),
            goals: self.goals.clone(),
            preferences: self.preferences.clone(),
        }
    }

    /// Restore drafts, re-checking every field.
    pub fn apply_draft(&mut self, draft: &OnboardingDraft) {
        self.merge(Section::PersonalInfo, &draft.personal_info);
        self.merge(Section::Goals, &draft.goals);
        self.merge(Section::Preferences, &draft.preferences);
    }
}

/// Whether onboarding should be skipped: either independently persisted
/// completion flag is enough.
pub fn effective_onboarded(onboarding_completed: bool, auth_onboarded: bool) -> bool {
    onboarding_completed || auth_onboarded
}
