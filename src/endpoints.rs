//! HTTP surface. Login and logout live here; the per-entity routes are built
//! by [`entity::routes`] for classes, courses and users alike.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, header::{AUTHORIZATION, CONTENT_TYPE}},
    middleware::from_fn_with_state,
    response::{IntoResponse, Redirect, Response},
    routing::post,
};
use chrono::TimeDelta;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;
use crate::database::{self, Store, auth::SessionStore, repository::Repository};
use crate::error::{Error, Result};
use crate::model::{Class, Course, User, login_object::LoginObject, user::ADMIN_ROLE};
use crate::security;
use crate::workflow::Workflow;

pub mod entity;

pub const LOGIN_PATH: &str = "/api/login";

const OK_JSON: &str = r#"{ "message": "OK" }"#;

#[derive(Clone)]
pub struct AppState {
    pub classes: Arc<Workflow<Class>>,
    pub courses: Arc<Workflow<Course>>,
    pub users: Arc<Workflow<User>>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Opens every store named by `config`, connecting to PostgreSQL only when
    /// some entity lives there.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = if config.storage.uses_postgres() {
            Some(database::init_database(&config.postgres).await?)
        } else {
            None
        };

        let data_dir = &config.storage.data_dir;
        let class_store = Store::<Class>::open(config.storage.class, data_dir, pool.as_ref())?;
        let course_store = Store::<Course>::open(config.storage.course, data_dir, pool.as_ref())?;
        let user_store = Store::<User>::open(config.storage.user, data_dir, pool.as_ref())?;

        let state = Self {
            classes: Arc::new(Workflow::new(class_store.clone(), config.pagination)),
            courses: Arc::new(
                Workflow::new(course_store, config.pagination).with_class_directory(class_store),
            ),
            users: Arc::new(Workflow::new(user_store, config.pagination)),
            sessions: Arc::new(SessionStore::new(TimeDelta::seconds(
                config.session.ttl_seconds,
            ))),
        };

        if let Some(bootstrap) = &config.bootstrap {
            let users = state.users.store();
            if users.list().await?.is_empty() {
                let admin = users
                    .add(User::new(
                        bootstrap.admin_user.clone(),
                        bootstrap.admin_pass.clone(),
                        ADMIN_ROLE,
                    ))
                    .await?;
                tracing::info!("Created initial admin account '{}'", admin.user_name);
            }
        }

        Ok(state)
    }
}

pub fn router(state: AppState) -> Router {
    // Allow GET, POST, PUT, DELETE and OPTIONS from any origin
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(AllowOrigin::any());

    Router::new()
        .merge(entity::routes("/api/classes", state.classes.clone()))
        .merge(entity::routes("/api/courses", state.courses.clone()))
        .merge(entity::routes("/api/users", state.users.clone()))
        .route(LOGIN_PATH, post(login))
        .route("/api/logout", post(logout))
        .layer(from_fn_with_state(
            security::SessionGate {
                sessions: state.sessions.clone(),
                users: state.users.store().clone(),
            },
            security::handle_session,
        ))
        .layer(cors)
        .with_state(state)
}

/// Logs a user in with their `UserName` and `Pass`.
///
/// Returns a session token for the `Authorization` header of later requests.
pub async fn login(State(state): State<AppState>, Json(login): Json<LoginObject>) -> Response {
    match state.sessions.login(state.users.store(), login).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = headers.get(&AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        state.sessions.logout(token).await;
    }
    (StatusCode::OK, OK_JSON).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Unauthenticated => Redirect::to(LOGIN_PATH).into_response(),
            Error::Forbidden { .. } => (StatusCode::FORBIDDEN, "Not Authorized.").into_response(),
            Error::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Incorrect password or account does not exist.")
                    .into_response()
            }
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "Not Found.").into_response(),
            e => {
                tracing::error!("{e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error.").into_response()
            }
        }
    }
}
