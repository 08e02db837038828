use std::env::var;
use std::path::Path;

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

use crate::config::{Backend, PostgresConfig};
use crate::error::{Error, Result};
use crate::model::{Class, Course, User};

pub mod auth;
pub mod file_store;
pub mod lock;
pub mod postgres;
pub mod repository;

use postgres::{PgRepository, Relational};
use repository::{FileRepository, Repository};

/// The backend chosen for one entity type.
#[derive(Debug, Clone)]
pub enum Store<T> {
    File(FileRepository<T>),
    Postgres(PgRepository<T>),
}

impl<T: Relational> Store<T> {
    /// Builds the store `backend` names. `pool` must be present when it is Postgres.
    pub fn open(backend: Backend, data_dir: &Path, pool: Option<&Pool<Postgres>>) -> Result<Self> {
        match backend {
            Backend::File => Ok(Store::File(FileRepository::new(data_dir))),
            Backend::Postgres => {
                let Some(pool) = pool else {
                    return Err(Error::Config(format!(
                        "{} is stored in postgres but no connection was configured",
                        T::RESOURCE
                    )));
                };
                Ok(Store::Postgres(PgRepository::new(pool.clone())))
            }
        }
    }
}

impl<T: Relational> Repository<T> for Store<T> {
    async fn list(&self) -> Result<Vec<T>> {
        match self {
            Store::File(r) => r.list().await,
            Store::Postgres(r) => r.list().await,
        }
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<T>> {
        match self {
            Store::File(r) => r.find_by_id(id).await,
            Store::Postgres(r) => r.find_by_id(id).await,
        }
    }

    async fn add(&self, entity: T) -> Result<T> {
        match self {
            Store::File(r) => r.add(entity).await,
            Store::Postgres(r) => r.add(entity).await,
        }
    }

    async fn update(&self, entity: T) -> Result<T> {
        match self {
            Store::File(r) => r.update(entity).await,
            Store::Postgres(r) => r.update(entity).await,
        }
    }

    async fn remove(&self, id: i32) -> Result<bool> {
        match self {
            Store::File(r) => r.remove(id).await,
            Store::Postgres(r) => r.remove(id).await,
        }
    }
}

/// Connects to PostgreSQL and creates the schema and tables if needed.
///
/// Credentials come from `PSQL_NAME` and `PSQL_PASS`.
pub async fn init_database(config: &PostgresConfig) -> Result<Pool<Postgres>> {
    let Ok(name) = var("PSQL_NAME") else {
        return Err(Error::Config("PSQL_NAME environment variable not present".into()));
    };
    let Ok(pass) = var("PSQL_PASS") else {
        return Err(Error::Config("PSQL_PASS environment variable not present".into()));
    };

    let schema = &config.schema;
    if schema.is_empty() || !schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Config(format!("invalid schema name '{schema}'")));
    }

    // Every pooled connection has to resolve the tables in our schema
    let search_path = format!("SET search_path TO {schema};");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .after_connect(move |conn, _meta| {
            let search_path = search_path.clone();
            Box::pin(async move {
                sqlx::query(&search_path).execute(conn).await?;
                Ok(())
            })
        })
        .connect(&format!(
            "postgres://{}:{}@{}/{}",
            name, pass, config.host, config.database
        ))
        .await?;

    let mut transaction = pool.begin().await?;

    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema};"))
        .execute(&mut *transaction)
        .await?;
    sqlx::query(&format!("SET LOCAL search_path TO {schema};"))
        .execute(&mut *transaction)
        .await?;

    for sql in [
        Class::create_table_sql(),
        Course::create_table_sql(),
        User::create_table_sql(),
    ] {
        sqlx::query(&sql).execute(&mut *transaction).await?;
    }

    transaction.commit().await?;
    tracing::info!("Database schema '{schema}' ready");

    Ok(pool)
}
