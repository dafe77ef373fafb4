//! Persisted key names.

/// Secure-store keys.
pub mod secure {
    pub const AUTH: &str = "auth";
    pub const ONBOARDING: &str = "onboarding";
    pub const ONBOARDING_COMPLETED: &str = "onboarding_completed";
    pub const ONBOARDING_PROGRESS: &str = "onboarding_progress";
    pub const ONBOARDING_START_TIME: &str = "onboarding_start_time";
    pub const ONBOARDING_COMPLETION_TIME: &str = "onboarding_completion_time";

    /// Every onboarding-related secure key, in reset order.
    pub const ONBOARDING_KEYS: [&str; 6] = [
        AUTH,
        ONBOARDING,
        ONBOARDING_COMPLETED,
        ONBOARDING_PROGRESS,
        ONBOARDING_START_TIME,
        ONBOARDING_COMPLETION_TIME,
    ];
}

/// General-store keys.
pub mod general {
    /// Aggregate app-state snapshot.
    pub const ROOT: &str = "persist:root";
    /// Preferences snapshot.
    pub const PREFERENCES: &str = "preferences-storage";
}
