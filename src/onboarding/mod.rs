//! Onboarding: the fixed slide sequence, per-step drafts, and completion.
//!
//! `OnboardingState` holds the pure transitions; `OnboardingManager` wraps it
//! with write-through persistence to the secure and general stores and the
//! completion handshake with the auth record.

pub mod manager;
pub mod routes;
pub mod state;

pub use manager::{OnboardingManager, OnboardingStatus, ROOT_SECTION, ResetReport};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{
    MergeOutcome, OnboardingDraft, OnboardingState, OnboardingStep, PersistedProgress, Progress,
    Section, SlideAdvance, SlideProgress, effective_onboarded,
};
