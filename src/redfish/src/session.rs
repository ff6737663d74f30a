// SPDX-License-Identifier: Apache-2.0

//! Redfish `SessionService` token table: opaque bearer tokens issued by
//! `POST /redfish/v1/SessionService/Sessions`, presented back via `X-Auth-Token`.
//!
//! Distinct from the IPMI session table in the `ipmi` crate: these are HTTP-layer login tokens
//! with a 30-minute idle timeout (§5), not RAKP-authenticated, encrypted protocol sessions.

use std::collections::HashMap;

use tokio::sync::RwLock;
use utils::time::{self, Clock};

/// How long an idle Redfish session token remains valid.
pub const SESSION_IDLE_TIMEOUT_SECS: u64 = 30 * 60;

/// A single logged-in session.
#[derive(Debug, Clone)]
pub struct RedfishSession {
    /// The id segment used in `/redfish/v1/SessionService/Sessions/{id}`.
    pub id: String,
    /// The username that authenticated.
    pub user_name: String,
    /// Last time this token was presented on a request.
    pub last_activity: Clock,
}

/// The table of currently live session tokens for one VM's Redfish server.
#[derive(Debug, Default)]
pub struct SessionTable {
    by_token: RwLock<HashMap<String, RedfishSession>>,
}

impl SessionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token for `user_name`, returning the token and the session id.
    pub async fn create(&self, user_name: &str) -> (String, String) {
        let token = utils::ids::random_hex_id(16);
        let id = utils::ids::random_hex_id(8);
        let session = RedfishSession {
            id: id.clone(),
            user_name: user_name.to_string(),
            last_activity: time::now(),
        };
        self.by_token.write().await.insert(token.clone(), session);
        (token, id)
    }

    /// Validates `token`, refreshing its last-activity timestamp on success. Returns `None` if
    /// the token is unknown or has been idle past [`SESSION_IDLE_TIMEOUT_SECS`].
    pub async fn touch(&self, token: &str) -> Option<RedfishSession> {
        let mut sessions = self.by_token.write().await;
        let session = sessions.get_mut(token)?;
        if time::idle_for_at_least(session.last_activity, SESSION_IDLE_TIMEOUT_SECS) {
            sessions.remove(token);
            return None;
        }
        session.last_activity = time::now();
        Some(session.clone())
    }

    /// Removes a session by its id segment (used by `DELETE Sessions/{id}`). Returns true if a
    /// session with that id existed.
    pub async fn remove_by_id(&self, id: &str) -> bool {
        let mut sessions = self.by_token.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.id != id);
        sessions.len() != before
    }

    /// Lists every live session, for the `Sessions` collection.
    pub async fn list(&self) -> Vec<RedfishSession> {
        self.by_token.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_token_validates() {
        let table = SessionTable::new();
        let (token, _id) = table.create("admin").await;
        assert!(table.touch(&token).await.is_some());
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let table = SessionTable::new();
        assert!(table.touch("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn removing_by_id_drops_the_session() {
        let table = SessionTable::new();
        let (token, id) = table.create("admin").await;
        assert!(table.remove_by_id(&id).await);
        assert!(table.touch(&token).await.is_none());
    }
}
