//! PreferencesStore: write-through theme/unit preferences.

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use super::model::{PersistedEnvelope, PreferencesSnapshot, PreferencesState, Theme};
use crate::store::keys;
use crate::store::{KeyValueStore, read_or_none, write_logged};

/// Envelope version written by this build.
pub const PREFERENCES_VERSION: u32 = 0;

struct Inner {
    snapshot: PreferencesSnapshot,
    /// Fields set by a caller; hydration leaves these alone.
    theme_touched: bool,
    units_touched: bool,
    /// Writes are held back until the persisted snapshot has been merged in.
    hydrated: bool,
}

/// Holds the theme/unit preferences and persists every change to the
/// general store under `preferences-storage`.
pub struct PreferencesStore {
    general: Arc<dyn KeyValueStore>,
    inner: RwLock<Inner>,
    hydrated: watch::Sender<bool>,
}

impl PreferencesStore {
    /// Create the store and start its single hydration read.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(general: Arc<dyn KeyValueStore>) -> Arc<Self> {
        let (hydrated, _rx) = watch::channel(false);
        let store = Arc::new(Self {
            general,
            inner: RwLock::new(Inner {
                snapshot: PreferencesSnapshot::default(),
                theme_touched: false,
                units_touched: false,
                hydrated: false,
            }),
            hydrated,
        });

        let task_store = Arc::clone(&store);
        tokio::spawn(async move {
            task_store.hydrate().await;
        });

        store
    }

    async fn hydrate(&self) {
        let persisted = read_or_none(self.general.as_ref(), keys::general::PREFERENCES)
            .await
            .and_then(|raw| parse_snapshot(&raw));

        {
            let mut inner = self.inner.write().await;
            match persisted {
                Some(snapshot) => {
                    if !inner.theme_touched {
                        inner.snapshot.theme = snapshot.theme;
                    }
                    if !inner.units_touched {
                        inner.snapshot.metric_units = snapshot.metric_units;
                    }
                    info!(
                        theme = %inner.snapshot.theme,
                        metric_units = inner.snapshot.metric_units,
                        "Preferences rehydrated"
                    );
                }
                None => debug!("No persisted preferences, using defaults"),
            }
            inner.hydrated = true;

            // Changes made while the read was in flight are written once,
            // merged, before any later setter can write.
            if inner.theme_touched || inner.units_touched {
                debug!("Persisting preferences changed before hydration");
                self.persist(inner.snapshot).await;
            }
        }

        self.hydrated.send_replace(true);
    }

    /// Whether the hydration read has finished.
    pub fn has_hydrated(&self) -> bool {
        *self.hydrated.borrow()
    }

    /// Wait until hydration has finished.
    pub async fn wait_hydrated(&self) {
        let mut rx = self.hydrated.subscribe();
        // The sender lives as long as `self`, so this only returns once true.
        let _ = rx.wait_for(|done| *done).await;
    }

    pub async fn state(&self) -> PreferencesState {
        let inner = self.inner.read().await;
        PreferencesState {
            theme: inner.snapshot.theme,
            metric_units: inner.snapshot.metric_units,
            has_hydrated: self.has_hydrated(),
        }
    }

    pub async fn theme(&self) -> Theme {
        self.inner.read().await.snapshot.theme
    }

    pub async fn metric_units(&self) -> bool {
        self.inner.read().await.snapshot.metric_units
    }

    pub async fn set_theme(&self, theme: Theme) {
        self.update(Some(theme), None).await;
    }

    pub async fn set_metric_units(&self, metric_units: bool) {
        self.update(None, Some(metric_units)).await;
    }

    /// Apply any given fields together and write them through once. Before
    /// hydration the write is deferred to the hydration merge.
    pub async fn update(&self, theme: Option<Theme>, metric_units: Option<bool>) {
        if theme.is_none() && metric_units.is_none() {
            return;
        }
        // Held across the write so snapshots land in the order they were made
        let mut inner = self.inner.write().await;
        if let Some(theme) = theme {
            inner.snapshot.theme = theme;
            inner.theme_touched = true;
        }
        if let Some(metric_units) = metric_units {
            inner.snapshot.metric_units = metric_units;
            inner.units_touched = true;
        }
        debug!(theme = ?theme, metric_units = ?metric_units, "Preferences updated");
        if inner.hydrated {
            self.persist(inner.snapshot).await;
        }
    }

    /// Restore defaults and write them through.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.snapshot = PreferencesSnapshot::default();
        inner.theme_touched = true;
        inner.units_touched = true;
        info!("Preferences reset to defaults");
        if inner.hydrated {
            self.persist(inner.snapshot).await;
        }
    }

    async fn persist(&self, snapshot: PreferencesSnapshot) {
        let envelope = PersistedEnvelope {
            state: snapshot,
            version: PREFERENCES_VERSION,
        };
        let value = match serde_json::to_string(&envelope) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to serialize preferences: {}", e);
                return;
            }
        };
        write_logged(self.general.as_ref(), keys::general::PREFERENCES, &value).await;
    }
}

/// Accept the versioned envelope or a bare snapshot. Anything else, or a
/// newer envelope version, resolves to `None`.
fn parse_snapshot(raw: &str) -> Option<PreferencesSnapshot> {
    if let Ok(envelope) = serde_json::from_str::<PersistedEnvelope<PreferencesSnapshot>>(raw) {
        if envelope.version > PREFERENCES_VERSION {
            warn!(version = envelope.version, "Persisted preferences from a newer version, ignoring");
            return None;
        }
        return Some(envelope.state);
    }
    match serde_json::from_str::<PreferencesSnapshot>(raw) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("Malformed persisted preferences, using defaults: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::test_support::RecordingStore;

    const DARK_IMPERIAL: &str = r#"{"state":{"theme":"dark","metricUnits":false},"version":0}"#;

    #[tokio::test]
    async fn defaults_until_hydrated_then_persisted_values() {
        let general = Arc::new(RecordingStore::gated("general"));
        general.seed(keys::general::PREFERENCES, DARK_IMPERIAL).await;

        let prefs = PreferencesStore::new(general.clone());
        tokio::task::yield_now().await;

        let before = prefs.state().await;
        assert!(!before.has_hydrated);
        assert_eq!(before.theme, Theme::System);
        assert!(before.metric_units);

        general.release_reads();
        prefs.wait_hydrated().await;

        let after = prefs.state().await;
        assert!(after.has_hydrated);
        assert_eq!(after.theme, Theme::Dark);
        assert!(!after.metric_units);
        assert_eq!(general.writes(), 0, "Hydration must not write");
    }

    #[tokio::test]
    async fn bare_snapshot_is_accepted() {
        let general = Arc::new(MemoryStore::new("general"));
        general
            .set_item(keys::general::PREFERENCES, r#"{"theme":"light","metricUnits":false}"#)
            .await
            .unwrap();

        let prefs = PreferencesStore::new(general);
        prefs.wait_hydrated().await;
        assert_eq!(prefs.theme().await, Theme::Light);
        assert!(!prefs.metric_units().await);
    }

    #[tokio::test]
    async fn miss_and_error_resolve_to_defaults() {
        let general = Arc::new(MemoryStore::new("general"));
        let prefs = PreferencesStore::new(general);
        prefs.wait_hydrated().await;
        assert_eq!(prefs.theme().await, Theme::System);

        let failing = Arc::new(RecordingStore::new("general"));
        failing.seed(keys::general::PREFERENCES, DARK_IMPERIAL).await;
        failing.fail_key(keys::general::PREFERENCES);
        let prefs = PreferencesStore::new(failing);
        prefs.wait_hydrated().await;
        let state = prefs.state().await;
        assert!(state.has_hydrated);
        assert_eq!(state.theme, Theme::System);
        assert!(state.metric_units);
    }

    #[tokio::test]
    async fn malformed_snapshot_resolves_to_defaults() {
        let general = Arc::new(MemoryStore::new("general"));
        general
            .set_item(keys::general::PREFERENCES, r#"{"state":{"theme":"sepia"}}"#)
            .await
            .unwrap();
        let prefs = PreferencesStore::new(general);
        prefs.wait_hydrated().await;
        assert_eq!(prefs.theme().await, Theme::System);
        assert!(prefs.metric_units().await);
    }

    #[tokio::test]
    async fn setters_write_through_without_hydration_flag() {
        let general = Arc::new(MemoryStore::new("general"));
        let prefs = PreferencesStore::new(general.clone());
        prefs.wait_hydrated().await;

        prefs.set_theme(Theme::Dark).await;
        prefs.set_metric_units(false).await;

        let raw = general
            .get_item(keys::general::PREFERENCES)
            .await
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["state"]["theme"], "dark");
        assert_eq!(json["state"]["metricUnits"], false);
        assert!(json["state"].get("_hasHydrated").is_none());
        assert_eq!(json["version"], 0);
    }

    #[tokio::test]
    async fn setter_before_hydration_keeps_other_persisted_field() {
        let general = Arc::new(RecordingStore::gated("general"));
        general.seed(keys::general::PREFERENCES, DARK_IMPERIAL).await;

        let prefs = PreferencesStore::new(general.clone());
        prefs.set_theme(Theme::Light).await;
        assert_eq!(general.writes(), 0, "No write before the persisted snapshot is known");

        general.release_reads();
        prefs.wait_hydrated().await;

        assert_eq!(prefs.theme().await, Theme::Light);
        assert!(!prefs.metric_units().await);

        let raw = general.raw(keys::general::PREFERENCES).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["state"]["theme"], "light");
        assert_eq!(json["state"]["metricUnits"], false);
        assert_eq!(general.writes(), 1);
    }

    #[tokio::test]
    async fn update_with_both_fields_writes_once() {
        let general = Arc::new(RecordingStore::new("general"));
        let prefs = PreferencesStore::new(general.clone());
        prefs.wait_hydrated().await;

        prefs.update(Some(Theme::Dark), Some(false)).await;
        assert_eq!(general.writes(), 1);
        let raw = general.raw(keys::general::PREFERENCES).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["state"]["theme"], "dark");
        assert_eq!(json["state"]["metricUnits"], false);

        prefs.update(None, None).await;
        assert_eq!(general.writes(), 1);
    }

    #[tokio::test]
    async fn reset_writes_defaults_through() {
        let general = Arc::new(MemoryStore::new("general"));
        general
            .set_item(keys::general::PREFERENCES, DARK_IMPERIAL)
            .await
            .unwrap();
        let prefs = PreferencesStore::new(general.clone());
        prefs.wait_hydrated().await;
        assert_eq!(prefs.theme().await, Theme::Dark);

        prefs.reset().await;
        assert_eq!(prefs.theme().await, Theme::System);

        // A fresh store over the same backend sees the defaults
        let reopened = PreferencesStore::new(general);
        reopened.wait_hydrated().await;
        let state = reopened.state().await;
        assert_eq!(state.theme, Theme::System);
        assert!(state.metric_units);
    }

    #[tokio::test]
    async fn write_failure_keeps_memory_value() {
        let general = Arc::new(RecordingStore::new("general"));
        general.fail_key(keys::general::PREFERENCES);
        let prefs = PreferencesStore::new(general.clone());
        prefs.wait_hydrated().await;

        prefs.set_theme(Theme::Dark).await;
        assert_eq!(prefs.theme().await, Theme::Dark);
        assert_eq!(general.writes(), 1);
    }
}
