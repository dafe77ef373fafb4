//! AuthStore: session plus the independently persisted `isOnboarded` flag.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::keys;
use crate::store::{KeyValueStore, read_or_none, write_logged};

/// A signed-in user.
#[derive(Debug)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: SecretString,
}

/// On-disk form. The token is only ever written to the secure store.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    user_id: Uuid,
    email: String,
    access_token: String,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PersistedAuth {
    #[serde(default)]
    session: Option<PersistedSession>,
    #[serde(default)]
    is_onboarded: bool,
}

#[derive(Debug, Default)]
struct AuthState {
    session: Option<AuthSession>,
    is_onboarded: bool,
}

/// Public view of the auth state (no token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_onboarded: bool,
}

pub struct AuthStore {
    secure: Arc<dyn KeyValueStore>,
    state: RwLock<AuthState>,
}

impl AuthStore {
    /// Empty, signed-out state.
    pub fn new(secure: Arc<dyn KeyValueStore>) -> Self {
        Self {
            secure,
            state: RwLock::new(AuthState::default()),
        }
    }

    /// Build from whatever the secure store holds. Missing or malformed data
    /// yields the signed-out state.
    pub async fn rehydrate(secure: Arc<dyn KeyValueStore>) -> Self {
        let store = Self::new(secure);
        let Some(raw) = read_or_none(store.secure.as_ref(), keys::secure::AUTH).await else {
            debug!("No persisted auth state");
            return store;
        };

        match serde_json::from_str::<PersistedAuth>(&raw) {
            Ok(persisted) => {
                let mut state = store.state.write().await;
                state.is_onboarded = persisted.is_onboarded;
                state.session = persisted.session.map(|s| AuthSession {
                    user_id: s.user_id,
                    email: s.email,
                    access_token: SecretString::from(s.access_token),
                });
                info!(
                    authenticated = state.session.is_some(),
                    is_onboarded = state.is_onboarded,
                    "Auth state rehydrated"
                );
            }
            Err(e) => warn!("Malformed persisted auth state, starting signed out: {}", e),
        }
        store
    }

    pub async fn sign_in(&self, user_id: Uuid, email: impl Into<String>, access_token: SecretString) {
        {
            let mut state = self.state.write().await;
            state.session = Some(AuthSession {
                user_id,
                email: email.into(),
                access_token,
            });
        }
        info!(%user_id, "Signed in");
        self.persist().await;
    }

    /// Clear the session and the onboarded flag, and delete the persisted record.
    pub async fn sign_out(&self) {
        {
            let mut state = self.state.write().await;
            state.session = None;
            state.is_onboarded = false;
        }
        if let Err(e) = self.secure.remove_item(keys::secure::AUTH).await {
            warn!("Failed to delete persisted auth state: {}", e);
        }
        info!("Signed out");
    }

    /// Set the onboarded flag and write it through.
    pub async fn set_onboarded(&self, is_onboarded: bool) {
        self.state.write().await.is_onboarded = is_onboarded;
        self.persist().await;
    }

    /// Clear the onboarded flag in memory only. Used when the persisted
    /// record is about to be deleted anyway.
    pub async fn forget_onboarded(&self) {
        self.state.write().await.is_onboarded = false;
    }

    pub async fn is_onboarded(&self) -> bool {
        self.state.read().await.is_onboarded
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.session.is_some()
    }

    /// The signed-in user, if any.
    pub async fn user_id(&self) -> Option<Uuid> {
        self.state.read().await.session.as_ref().map(|s| s.user_id)
    }

    pub async fn status(&self) -> AuthStatus {
        let state = self.state.read().await;
        AuthStatus {
            authenticated: state.session.is_some(),
            user_id: state.session.as_ref().map(|s| s.user_id),
            email: state.session.as_ref().map(|s| s.email.clone()),
            is_onboarded: state.is_onboarded,
        }
    }

    async fn persist(&self) {
        let value = {
            let state = self.state.read().await;
            let persisted = PersistedAuth {
                session: state.session.as_ref().map(|s| PersistedSession {
                    user_id: s.user_id,
                    email: s.email.clone(),
                    access_token: s.access_token.expose_secret().to_string(),
                }),
                is_onboarded: state.is_onboarded,
            };
            match serde_json::to_string(&persisted) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Failed to serialize auth state: {}", e);
                    return;
                }
            }
        };
        write_logged(self.secure.as_ref(), keys::secure::AUTH, &value).await;
    }
}
