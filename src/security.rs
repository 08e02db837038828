//! The session gate. Every workflow operation declares the role it needs and
//! is checked against the caller's session before any repository is touched.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::database::Store;
use crate::database::auth::SessionStore;
use crate::model::User;
use crate::error::{Error, Result};
use crate::model::session::SessionInfo;
use crate::model::user::is_admin_role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    View,
    New,
    Create,
    Edit,
    Save,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRole {
    /// Any logged-in user.
    Session,
    Admin,
}

impl Operation {
    pub const fn required_role(self) -> RequiredRole {
        match self {
            Operation::List | Operation::View => RequiredRole::Session,
            Operation::New
            | Operation::Create
            | Operation::Edit
            | Operation::Save
            | Operation::Delete => RequiredRole::Admin,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::View => "view",
            Operation::New => "open a new form",
            Operation::Create => "create",
            Operation::Edit => "edit",
            Operation::Save => "save",
            Operation::Delete => "delete",
        }
    }
}

/// Who passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Member(String),
    Admin(String),
}

impl Access {
    pub fn identity(&self) -> &str {
        match self {
            Access::Member(identity) | Access::Admin(identity) => identity,
        }
    }
}

/// Decides whether `session` may perform `operation`.
///
/// A session without an identity is anonymous whatever role it carries, so
/// it is always sent to log in.
pub fn authorize(session: &SessionInfo, operation: Operation) -> Result<Access> {
    let Some(identity) = session.identity.as_deref().filter(|i| !i.trim().is_empty()) else {
        return Err(Error::Unauthenticated);
    };

    let is_admin = session.role.as_deref().is_some_and(is_admin_role);

    match (operation.required_role(), is_admin) {
        (_, true) => Ok(Access::Admin(identity.to_owned())),
        (RequiredRole::Session, false) => Ok(Access::Member(identity.to_owned())),
        (RequiredRole::Admin, false) => {
            tracing::warn!("Denied {} to {}", operation.name(), identity);
            Err(Error::Forbidden {
                identity: identity.to_owned(),
                operation: operation.name(),
            })
        }
    }
}

/// What the session middleware needs: the live sessions and the accounts
/// they belong to.
#[derive(Debug, Clone)]
pub struct SessionGate {
    pub sessions: Arc<SessionStore>,
    pub users: Store<User>,
}

/// Resolves the `Authorization` token into a [`SessionInfo`] request extension.
///
/// Requests without a valid token are not rejected here; they carry an
/// anonymous session and the gate turns them away per operation.
pub async fn handle_session(
    State(gate): State<SessionGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(&AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).to_owned());

    let session = match token {
        Some(token) => match gate.sessions.resolve(&gate.users, &token).await {
            Ok(session) => session,
            Err(e) => return e.into_response(),
        },
        None => SessionInfo::anonymous(),
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}
