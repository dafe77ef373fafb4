//! Wellness core: onboarding progression, preference persistence, and the
//! secure/general store synchronization behind them.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod preferences;
pub mod store;
pub mod validation;
