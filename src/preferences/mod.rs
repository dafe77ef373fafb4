//! Preferences store: theme and unit preferences with their own
//! persist/rehydrate lifecycle.

pub mod model;
pub mod routes;
pub mod store;

pub use model::{PersistedEnvelope, PreferencesSnapshot, PreferencesState, Theme};
pub use routes::{PreferencesRouteState, preferences_routes};
pub use store::PreferencesStore;
