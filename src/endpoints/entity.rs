use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde_json::json;

use crate::database::postgres::Relational;
use crate::error::Result;
use crate::model::Entity;
use crate::model::session::SessionInfo;
use crate::security::{Operation, authorize};
use crate::workflow::{Form, ListQuery, Outcome, Workflow};

struct EntityRoutes<T> {
    workflow: Arc<Workflow<T>>,
    list_path: &'static str,
}

impl<T> Clone for EntityRoutes<T> {
    fn clone(&self) -> Self {
        Self {
            workflow: self.workflow.clone(),
            list_path: self.list_path,
        }
    }
}

/// `GET|POST|PUT {prefix}`, `GET {prefix}/new`, `GET|DELETE {prefix}/{id}`
/// and `GET {prefix}/{id}/view`.
pub fn routes<T, S>(prefix: &'static str, workflow: Arc<Workflow<T>>) -> Router<S>
where
    T: Relational,
    S: Clone + Send + Sync + 'static,
{
    let state = EntityRoutes {
        workflow,
        list_path: prefix,
    };

    Router::new()
        .route(prefix, get(list::<T>).post(create::<T>).put(save::<T>))
        .route(&format!("{prefix}/new"), get(new_form::<T>))
        .route(&format!("{prefix}/{{id}}"), get(edit::<T>).delete(delete::<T>))
        .route(&format!("{prefix}/{{id}}/view"), get(view::<T>))
        .with_state(state)
}

async fn list<T: Relational>(
    State(routes): State<EntityRoutes<T>>,
    Extension(session): Extension<SessionInfo>,
    Query(params): Query<ListQuery>,
) -> Response {
    respond(routes.workflow.list(&session, params).await, routes.list_path)
}

async fn view<T: Relational>(
    State(routes): State<EntityRoutes<T>>,
    Extension(session): Extension<SessionInfo>,
    Path(id): Path<i32>,
) -> Response {
    respond(routes.workflow.view(&session, id).await, routes.list_path)
}

async fn new_form<T: Relational>(
    State(routes): State<EntityRoutes<T>>,
    Extension(session): Extension<SessionInfo>,
) -> Response {
    respond(routes.workflow.new_form(&session), routes.list_path)
}

async fn create<T: Relational>(
    State(routes): State<EntityRoutes<T>>,
    Extension(session): Extension<SessionInfo>,
    body: Bytes,
) -> Response {
    let payload = match read_payload(&session, Operation::Create, &body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    respond(routes.workflow.create(&session, payload).await, routes.list_path)
}

async fn edit<T: Relational>(
    State(routes): State<EntityRoutes<T>>,
    Extension(session): Extension<SessionInfo>,
    Path(id): Path<i32>,
) -> Response {
    respond(routes.workflow.edit(&session, id).await, routes.list_path)
}

async fn save<T: Relational>(
    State(routes): State<EntityRoutes<T>>,
    Extension(session): Extension<SessionInfo>,
    body: Bytes,
) -> Response {
    let payload = match read_payload(&session, Operation::Save, &body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    respond(routes.workflow.save(&session, payload).await, routes.list_path)
}

async fn delete<T: Relational>(
    State(routes): State<EntityRoutes<T>>,
    Extension(session): Extension<SessionInfo>,
    Path(id): Path<i32>,
) -> Response {
    respond(routes.workflow.delete(&session, id).await, routes.list_path)
}

/// The gate runs before the body is looked at, so callers who may not write
/// are turned away the same way whatever they sent.
fn read_payload<T: Entity>(
    session: &SessionInfo,
    operation: Operation,
    body: &[u8],
) -> std::result::Result<T, Response> {
    authorize(session, operation).map_err(IntoResponse::into_response)?;
    serde_json::from_slice(body).map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("Malformed {} payload: {e}", T::RESOURCE)).into_response()
    })
}

/// Successful writes redirect back to the list; forms with errors come back
/// as 422 so the client can re-render them.
fn respond<T: Relational>(outcome: Result<Outcome<T>>, list_path: &str) -> Response {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => return e.into_response(),
    };

    match outcome {
        Outcome::List(mut page) => {
            page.items = page.items.into_iter().map(Entity::redacted).collect();
            Json(page).into_response()
        }
        Outcome::Form(form) => Json(redact_form(form)).into_response(),
        Outcome::Invalid(form) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(redact_form(form))).into_response()
        }
        Outcome::Detail(entity) => Json(entity.redacted()).into_response(),
        Outcome::Created(_) | Outcome::Updated(_) | Outcome::Deleted { .. } => {
            Redirect::to(list_path).into_response()
        }
        Outcome::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "view": "NotFound", "id": id })),
        )
            .into_response(),
    }
}

fn redact_form<T: Entity>(form: Form<T>) -> Form<T> {
    Form {
        entity: form.entity.redacted(),
        ..form
    }
}
