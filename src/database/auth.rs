use std::collections::HashMap;

use base64::prelude::*;
use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha512};
use tokio::sync::Mutex;

use crate::database::repository::Repository;
use crate::error::{Error, Result};
use crate::model::User;
use crate::model::login_object::LoginObject;
use crate::model::session::{Session, SessionInfo};

/// A session only remembers who logged in. The account's current name and
/// role are read back from the user store whenever the session is used.
#[derive(Debug, Clone)]
struct SessionRecord {
    user_id: i32,
    user_name: String,
    expiration: DateTime<Utc>,
}

/// Live login sessions. Only the SHA-512 of each token is kept.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Vec<u8>, SessionRecord>>,
    ttl: TimeDelta,
}

impl SessionStore {
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Checks the credentials against `users` and opens a new session,
    /// closing any the user already had.
    pub async fn login<R: Repository<User>>(&self, users: &R, login: LoginObject) -> Result<Session> {
        let user = users
            .list()
            .await?
            .into_iter()
            .find(|u| u.user_name == login.user_name && u.pass == login.pass)
            .ok_or(Error::InvalidCredentials)?;

        let mut session_id = [0u8; 16];
        rand::fill(&mut session_id);
        let session_hash = Sha512::digest(session_id).to_vec();

        let mut sessions = self.sessions.lock().await;

        // Clear previous sessions
        sessions.retain(|_, record| record.user_id != user.id);

        sessions.insert(
            session_hash,
            SessionRecord {
                user_id: user.id,
                user_name: user.user_name.clone(),
                expiration: Utc::now() + self.ttl,
            },
        );

        tracing::info!("Logged in user {}", user.id);
        Ok(Session::new(session_id))
    }

    /// Resolves a client token to its session facts.
    ///
    /// Unknown, malformed and expired tokens are anonymous, and so is a token
    /// whose account has since been deleted or renamed. The role is always the
    /// account's current one.
    pub async fn resolve<R: Repository<User>>(&self, users: &R, token: &str) -> Result<SessionInfo> {
        let Some(session_hash) = hash_token(token) else {
            return Ok(SessionInfo::anonymous());
        };

        let record = {
            let mut sessions = self.sessions.lock().await;
            let Some(record) = sessions.get(&session_hash).cloned() else {
                return Ok(SessionInfo::anonymous());
            };
            if Utc::now() > record.expiration {
                sessions.remove(&session_hash);
                return Ok(SessionInfo::anonymous());
            }
            record
        };

        match users.find_by_id(record.user_id).await? {
            // A freed id can be handed to a new account, so the name must match too
            Some(user) if user.user_name == record.user_name => {
                Ok(SessionInfo::new(user.user_name, user.role))
            }
            _ => {
                tracing::info!("Closing session of removed user {}", record.user_id);
                self.sessions.lock().await.remove(&session_hash);
                Ok(SessionInfo::anonymous())
            }
        }
    }

    pub async fn logout(&self, token: &str) -> bool {
        let Some(session_hash) = hash_token(token) else {
            return false;
        };
        self.sessions.lock().await.remove(&session_hash).is_some()
    }
}

fn hash_token(token: &str) -> Option<Vec<u8>> {
    let session_id = BASE64_STANDARD.decode(token.trim()).ok()?;
    Some(Sha512::digest(session_id).to_vec())
}
