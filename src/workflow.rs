//! Per-entity list/create/edit/save/delete flow.
//!
//! Validation problems and missing targets come back as [`Outcome`]s the
//! caller renders. Authorization and storage failures are returned as errors.

use serde::{Deserialize, Serialize};

use crate::database::Store;
use crate::database::postgres::Relational;
use crate::database::repository::Repository;
use crate::error::{Error, Result};
use crate::model::session::SessionInfo;
use crate::model::{Class, Entity, ValidationErrors};
use crate::paginate::{PageLimits, paginate};
use crate::search;
use crate::security::{Operation, authorize};

/// Optional list parameters, as a client sends them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub query: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    /// Matches before paging.
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FormKind {
    New,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form<T> {
    pub kind: FormKind,
    pub entity: T,
    pub errors: ValidationErrors,
}

impl<T> Form<T> {
    fn blank(kind: FormKind, entity: T) -> Self {
        Self {
            kind,
            entity,
            errors: ValidationErrors::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    List(ListPage<T>),
    /// A form to fill in: empty for `New`, populated for `Edit`.
    Form(Form<T>),
    /// The submitted form again, with its field errors. Nothing was stored.
    Invalid(Form<T>),
    Detail(T),
    Created(T),
    Updated(T),
    /// `existed` is false when the id was already gone.
    Deleted { id: i32, existed: bool },
    NotFound(i32),
}

impl<T> Outcome<T> {
    /// Whether the caller should go back to the list.
    pub fn redirects_to_list(&self) -> bool {
        matches!(
            self,
            Outcome::Created(_) | Outcome::Updated(_) | Outcome::Deleted { .. }
        )
    }
}

pub struct Workflow<T> {
    store: Store<T>,
    limits: PageLimits,
    classes: Option<Store<Class>>,
}

impl<T: Relational> Workflow<T> {
    pub fn new(store: Store<T>, limits: PageLimits) -> Self {
        Self {
            store,
            limits,
            classes: None,
        }
    }

    /// Checks class references against `classes` on create and save.
    pub fn with_class_directory(mut self, classes: Store<Class>) -> Self {
        self.classes = Some(classes);
        self
    }

    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    pub async fn list(&self, session: &SessionInfo, params: ListQuery) -> Result<Outcome<T>> {
        authorize(session, Operation::List)?;

        let all = self.store.list().await?;
        let matches = search::filter_default(all, params.query.as_deref());
        let request = self.limits.normalize(params.page, params.page_size);

        Ok(Outcome::List(ListPage {
            items: paginate(&matches, request.page, request.page_size).to_vec(),
            total_count: matches.len(),
            page: request.page,
            page_size: request.page_size,
            query: params.query,
        }))
    }

    pub async fn view(&self, session: &SessionInfo, id: i32) -> Result<Outcome<T>> {
        authorize(session, Operation::View)?;

        Ok(match self.store.find_by_id(id).await? {
            Some(entity) => Outcome::Detail(entity),
            None => Outcome::NotFound(id),
        })
    }

    pub fn new_form(&self, session: &SessionInfo) -> Result<Outcome<T>> {
        authorize(session, Operation::New)?;
        Ok(Outcome::Form(Form::blank(FormKind::New, T::default())))
    }

    pub async fn create(&self, session: &SessionInfo, payload: T) -> Result<Outcome<T>> {
        let access = authorize(session, Operation::Create)?;

        let errors = self.check(&payload).await?;
        if !errors.is_empty() {
            return Ok(Outcome::Invalid(Form {
                kind: FormKind::New,
                entity: payload,
                errors,
            }));
        }

        match self.store.add(payload.clone()).await {
            Ok(created) => {
                tracing::info!(
                    "{} created {} {}",
                    access.identity(),
                    T::RESOURCE,
                    created.id()
                );
                Ok(Outcome::Created(created))
            }
            Err(Error::Conflict { id, .. }) => {
                let mut errors = ValidationErrors::new();
                errors.add("Id", format!("An entry with Id {id} already exists"));
                Ok(Outcome::Invalid(Form {
                    kind: FormKind::New,
                    entity: payload,
                    errors,
                }))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn edit(&self, session: &SessionInfo, id: i32) -> Result<Outcome<T>> {
        authorize(session, Operation::Edit)?;

        Ok(match self.store.find_by_id(id).await? {
            Some(entity) => Outcome::Form(Form::blank(FormKind::Edit, entity)),
            None => Outcome::NotFound(id),
        })
    }

    pub async fn save(&self, session: &SessionInfo, payload: T) -> Result<Outcome<T>> {
        let access = authorize(session, Operation::Save)?;

        let errors = self.check(&payload).await?;
        if !errors.is_empty() {
            return Ok(Outcome::Invalid(Form {
                kind: FormKind::Edit,
                entity: payload,
                errors,
            }));
        }

        let id = payload.id();
        match self.store.update(payload).await {
            Ok(updated) => {
                tracing::info!("{} updated {} {}", access.identity(), T::RESOURCE, id);
                Ok(Outcome::Updated(updated))
            }
            Err(e) if e.is_not_found() => Ok(Outcome::NotFound(id)),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, session: &SessionInfo, id: i32) -> Result<Outcome<T>> {
        let access = authorize(session, Operation::Delete)?;

        let existed = self.store.remove(id).await?;
        if existed {
            tracing::info!("{} deleted {} {}", access.identity(), T::RESOURCE, id);
        }
        Ok(Outcome::Deleted { id, existed })
    }

    /// Field rules plus the checks that need the stored collections: unique
    /// natural keys and existing class references.
    async fn check(&self, entity: &T) -> Result<ValidationErrors> {
        let mut errors = entity.validate();

        if let Some((field, value)) = entity.natural_key() {
            let value = value.trim();
            if !value.is_empty() && !errors.contains(field) {
                let taken = self.store.list().await?.iter().any(|other| {
                    other.id() != entity.id()
                        && other
                            .natural_key()
                            .is_some_and(|(_, v)| same_key(v, value))
                });
                if taken {
                    errors.add(field, format!("'{value}' is already in use"));
                }
            }
        }

        if let (Some(name), Some(classes)) = (entity.class_reference(), &self.classes) {
            let name = name.trim();
            if !name.is_empty() {
                let exists = classes
                    .list()
                    .await?
                    .iter()
                    .any(|class| same_key(&class.class_name, name));
                if !exists {
                    errors.add("Class", format!("Class '{name}' does not exist"));
                }
            }
        }

        Ok(errors)
    }
}

/// Natural keys and references to them compare the same way.
fn same_key(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
