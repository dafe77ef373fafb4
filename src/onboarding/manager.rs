//! OnboardingManager: coordinates onboarding state, validation, and
//! write-through to the secure and general stores.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::auth::AuthStore;
use crate::error::{NavigationError, StoreError, ValidationError};
use crate::store::keys;
use crate::store::{KeyValueStore, StoreContext, read_or_none, write_logged};
use crate::validation::{CompleteOnboarding, validate_complete};

use super::state::{
    MergeOutcome, OnboardingDraft, OnboardingState, OnboardingStep, PersistedProgress, Progress,
    Section, SlideAdvance, effective_onboarded,
};

/// Section name of the onboarding snapshot inside the general root aggregate.
pub const ROOT_SECTION: &str = "onboarding";

/// Rejection message for draft fields sent after completion.
const COMPLETED_MESSAGE: &str = "onboarding already completed";

/// Onboarding status returned to the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    #[serde(flatten)]
    pub state: OnboardingState,
    pub current_step: OnboardingStep,
    pub progress: Progress,
    pub is_onboarded: bool,
}

/// Keys handled by a reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
}

/// Owns the onboarding state and is the sole writer of onboarding keys.
pub struct OnboardingManager {
    stores: StoreContext,
    auth: Arc<AuthStore>,
    state: Arc<RwLock<OnboardingState>>,
}

impl OnboardingManager {
    /// A manager starting from defaults, without reading the stores.
    pub fn new(stores: StoreContext, auth: Arc<AuthStore>) -> Self {
        Self {
            stores,
            auth,
            state: Arc::new(RwLock::new(OnboardingState::default())),
        }
    }

    /// Reconstruct state from the stores.
    ///
    /// The general root snapshot wins when present and consistent. Otherwise
    /// progress and drafts come from the secure store. A secure completion
    /// marker always forces the completed flag. Every failure resolves to
    /// defaults.
    pub async fn rehydrate(stores: StoreContext, auth: Arc<AuthStore>) -> Self {
        let manager = Self::new(stores, auth);
        let mut state = match manager.read_root_snapshot().await {
            Some(snapshot) => snapshot,
            None => manager.read_secure_state().await,
        };

        let marker =
            read_or_none(manager.stores.secure.as_ref(), keys::secure::ONBOARDING_COMPLETED).await;
        if marker.as_deref() == Some("true") && !state.is_onboarding_completed() {
            state.mark_completed();
        }

        let auth_onboarded = manager.auth.is_onboarded().await;
        if auth_onboarded != state.is_onboarding_completed() {
            tracing::debug!(
                onboarding_completed = state.is_onboarding_completed(),
                auth_onboarded,
                "Completion flags disagree, either one skips onboarding"
            );
        }

        tracing::info!(
            step = %state.current_step(),
            completed = state.is_onboarding_completed(),
            "Onboarding state rehydrated"
        );
        *manager.state.write().await = state;
        manager
    }

    /// Progress and drafts from the secure store, over defaults.
    async fn read_secure_state(&self) -> OnboardingState {
        let mut state = OnboardingState::default();
        if let Some(progress) = self
            .read_secure_json::<PersistedProgress>(keys::secure::ONBOARDING_PROGRESS)
            .await
        {
            if !state.apply_progress(progress) {
                tracing::warn!("Persisted onboarding progress is inconsistent, ignoring");
            }
        }
        if let Some(draft) = self
            .read_secure_json::<OnboardingDraft>(keys::secure::ONBOARDING)
            .await
        {
            state.apply_draft(&draft);
        }
        state
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> OnboardingState {
        self.state.read().await.clone()
    }

    pub async fn status(&self) -> OnboardingStatus {
        let state = self.snapshot().await;
        let is_onboarded = effective_onboarded(
            state.is_onboarding_completed(),
            self.auth.is_onboarded().await,
        );
        OnboardingStatus {
            current_step: state.current_step(),
            progress: state.progress(),
            is_onboarded,
            state,
        }
    }

    pub async fn progress(&self) -> Progress {
        self.state.read().await.progress()
    }

    /// Effective "is onboarded": either completion flag.
    pub async fn is_onboarded(&self) -> bool {
        let completed = self.state.read().await.is_onboarding_completed();
        effective_onboarded(completed, self.auth.is_onboarded().await)
    }

    /// Record the start time the first time the flow is entered. Returns false
    /// when onboarding is already done.
    pub async fn start(&self) -> bool {
        if self.is_onboarded().await {
            tracing::debug!("Onboarding already completed, not starting");
            return false;
        }
        let secure = self.stores.secure.as_ref();
        if read_or_none(secure, keys::secure::ONBOARDING_START_TIME).await.is_none() {
            let now = Utc::now().to_rfc3339();
            write_logged(secure, keys::secure::ONBOARDING_START_TIME, &now).await;
            tracing::info!(started_at = %now, "Onboarding started");
        }
        true
    }

    /// Advance one slide. At the last slide nothing changes and `AtEnd` is
    /// returned; the caller decides whether to complete. A completed flow is
    /// frozen until reset.
    pub async fn next_slide(&self) -> SlideAdvance {
        let (advance, progress) = {
            let mut state = self.state.write().await;
            if state.is_onboarding_completed() {
                tracing::debug!("Onboarding completed, ignoring next_slide");
                return SlideAdvance::Completed;
            }
            let advance = state.next_slide();
            (advance, state.persisted_progress())
        };
        if let SlideAdvance::Moved(index) = advance {
            tracing::debug!(index, "Advanced slide");
            self.persist_progress(&progress).await;
        }
        advance
    }

    pub async fn previous_slide(&self) -> bool {
        let (moved, progress) = {
            let mut state = self.state.write().await;
            if state.is_onboarding_completed() {
                tracing::debug!("Onboarding completed, ignoring previous_slide");
                return false;
            }
            (state.previous_slide(), state.persisted_progress())
        };
        if moved {
            self.persist_progress(&progress).await;
        }
        moved
    }

    pub async fn set_current_slide_index(&self, index: usize) -> Result<(), NavigationError> {
        let progress = {
            let mut state = self.state.write().await;
            if state.is_onboarding_completed() {
                return Err(NavigationError::Completed);
            }
            state.set_current_slide_index(index)?;
            state.persisted_progress()
        };
        self.persist_progress(&progress).await;
        Ok(())
    }

    /// Mark a slide completed. Unknown ids, and any id once onboarding is
    /// completed, are ignored.
    pub async fn mark_slide_completed(&self, slide_id: &str) -> bool {
        let (found, progress) = {
            let mut state = self.state.write().await;
            if state.is_onboarding_completed() {
                tracing::debug!(slide_id, "Onboarding completed, ignoring slide completion");
                return false;
            }
            (state.mark_slide_completed(slide_id), state.persisted_progress())
        };
        if found {
            self.persist_progress(&progress).await;
        } else {
            tracing::debug!(slide_id, "Ignoring completion for unknown slide");
        }
        found
    }

    pub async fn update_personal_info(&self, partial: &Map<String, Value>) -> MergeOutcome {
        self.update(Section::PersonalInfo, partial).await
    }

    pub async fn update_goals(&self, partial: &Map<String, Value>) -> MergeOutcome {
        self.update(Section::Goals, partial).await
    }

    pub async fn update_preferences(&self, partial: &Map<String, Value>) -> MergeOutcome {
        self.update(Section::Preferences, partial).await
    }

    async fn update(&self, section: Section, partial: &Map<String, Value>) -> MergeOutcome {
        let (outcome, draft) = {
            let mut state = self.state.write().await;
            if state.is_onboarding_completed() {
                tracing::debug!(section = ?section, "Onboarding completed, rejecting draft update");
                return MergeOutcome {
                    accepted: Vec::new(),
                    rejected: partial
                        .keys()
                        .map(|field| (field.clone(), COMPLETED_MESSAGE.to_string()))
                        .collect(),
                };
            }
            let outcome = state.merge(section, partial);
            (outcome, state.draft())
        };
        if !outcome.rejected.is_empty() {
            tracing::debug!(
                section = ?section,
                rejected = ?outcome.rejected.keys().collect::<Vec<_>>(),
                "Skipped invalid draft fields"
            );
        }
        if !outcome.accepted.is_empty() {
            self.persist_json(keys::secure::ONBOARDING, &draft).await;
        }
        outcome
    }

    /// Validate the accumulated drafts and, on success, persist completion.
    ///
    /// Writes, in order: the secure completion flag, the secure completion
    /// time, the general root snapshot, then the auth record. On failure the
    /// error summary is stored in state and nothing is written. Calling again
    /// after success re-validates and re-writes with a fresh timestamp.
    pub async fn complete_onboarding(&self) -> Result<CompleteOnboarding, ValidationError> {
        let (record, snapshot) = {
            let mut state = self.state.write().await;
            match validate_complete(state.personal_info(), state.goals(), state.preferences()) {
                Ok(record) => {
                    state.mark_completed();
                    (record, state.clone())
                }
                Err(e) => {
                    tracing::warn!(errors = e.field_errors.len(), "Onboarding validation failed: {}", e);
                    state.set_error(e.summary.clone());
                    return Err(e);
                }
            }
        };

        let secure = self.stores.secure.as_ref();
        let completed_at = Utc::now().to_rfc3339();
        write_logged(secure, keys::secure::ONBOARDING_COMPLETED, "true").await;
        write_logged(secure, keys::secure::ONBOARDING_COMPLETION_TIME, &completed_at).await;
        self.write_root_snapshot(&snapshot).await;
        self.auth.set_onboarded(true).await;

        tracing::info!(%completed_at, "Onboarding completed");
        Ok(record)
    }

    /// Reset memory to defaults, then delete every onboarding key from both
    /// stores. Per-key failures are logged and reported, never fatal.
    pub async fn reset_onboarding(&self) -> ResetReport {
        *self.state.write().await = OnboardingState::default();
        self.auth.forget_onboarded().await;

        let deletes = keys::secure::ONBOARDING_KEYS.into_iter().map(|key| {
            let secure = Arc::clone(&self.stores.secure);
            async move { (key, secure.remove_item(key).await) }
        });
        let results = join_all(deletes).await;

        let mut report = ResetReport::default();
        for (key, result) in results {
            match result {
                Ok(()) => report.removed.push(key.to_string()),
                Err(e) => {
                    tracing::warn!(key, "Failed to delete onboarding key: {}", e);
                    report.failed.push(key.to_string());
                }
            }
        }

        match self.clear_root_snapshot().await {
            Ok(true) => report.removed.push(keys::general::ROOT.to_string()),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(key = keys::general::ROOT, "Failed to clear onboarding snapshot: {}", e);
                report.failed.push(keys::general::ROOT.to_string());
            }
        }

        tracing::info!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Onboarding reset"
        );
        report
    }

    // ── Persistence helpers ─────────────────────────────────────────

    async fn persist_progress(&self, progress: &PersistedProgress) {
        self.persist_json(keys::secure::ONBOARDING_PROGRESS, progress).await;
    }

    async fn persist_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => {
                write_logged(self.stores.secure.as_ref(), key, &json).await;
            }
            Err(e) => tracing::warn!(key, "Failed to serialize onboarding data: {}", e),
        }
    }

    async fn read_secure_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = read_or_none(self.stores.secure.as_ref(), key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "Malformed persisted onboarding data: {}", e);
                None
            }
        }
    }

    /// The root aggregate as an object; missing or malformed reads as empty.
    async fn read_root(&self) -> Map<String, Value> {
        let Some(raw) = read_or_none(self.stores.general.as_ref(), keys::general::ROOT).await else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!("Root state snapshot is not a JSON object, replacing it");
                Map::new()
            }
        }
    }

    async fn read_root_snapshot(&self) -> Option<OnboardingState> {
        let mut root = self.read_root().await;
        let section = root.remove(ROOT_SECTION)?;
        match serde_json::from_value::<OnboardingState>(section) {
            Ok(snapshot) => {
                let restored = OnboardingState::from_snapshot(snapshot);
                if restored.is_none() {
                    tracing::warn!("Root onboarding snapshot is inconsistent, ignoring");
                }
                restored
            }
            Err(e) => {
                tracing::warn!("Malformed root onboarding snapshot: {}", e);
                None
            }
        }
    }

    async fn write_root_snapshot(&self, snapshot: &OnboardingState) {
        let section = match serde_json::to_value(snapshot) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to serialize onboarding snapshot: {}", e);
                return;
            }
        };
        let mut root = self.read_root().await;
        root.insert(ROOT_SECTION.to_string(), section);
        let json = Value::Object(root).to_string();
        write_logged(self.stores.general.as_ref(), keys::general::ROOT, &json).await;
    }

    /// Drop the onboarding section from the root aggregate, deleting the key
    /// when nothing else remains. Returns whether the key was touched.
    async fn clear_root_snapshot(&self) -> Result<bool, StoreError> {
        let general = self.stores.general.as_ref();
        let Some(raw) = general.get_item(keys::general::ROOT).await? else {
            return Ok(false);
        };
        let mut root = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                general.remove_item(keys::general::ROOT).await?;
                return Ok(true);
            }
        };
        if root.remove(ROOT_SECTION).is_none() {
            return Ok(false);
        }
        if root.is_empty() {
            general.remove_item(keys::general::ROOT).await?;
        } else {
            general
                .set_item(keys::general::ROOT, &Value::Object(root).to_string())
                .await?;
        }
        Ok(true)
    }
}
