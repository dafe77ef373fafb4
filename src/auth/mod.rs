//! Auth state: the signed-in session and its onboarded flag, persisted to
//! the secure store under `auth`.

pub mod routes;
pub mod store;

pub use routes::{AuthRouteState, SignInRequest, auth_routes};
pub use store::{AuthSession, AuthStatus, AuthStore};
