//! Relational backend. Each entity maps to one table with an identity `id`
//! column and one text column per attribute.

use std::marker::PhantomData;

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres, Row};

use crate::database::repository::Repository;
use crate::error::{Error, Result};
use crate::model::{Class, Course, Entity, User};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Table mapping for entities that may live in PostgreSQL.
pub trait Relational: Entity + for<'r> FromRow<'r, PgRow> + Unpin {
    const TABLE: &'static str;

    /// Non-`id` columns, in the order [`Relational::bind_columns`] binds them.
    const COLUMNS: &'static [&'static str];

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;

    fn create_table_sql() -> String {
        let columns = Self::COLUMNS
            .iter()
            .map(|c| format!("{c} TEXT NOT NULL DEFAULT ''"))
            .collect::<Vec<String>>()
            .join(",\n            ");
        format!(
            "CREATE TABLE IF NOT EXISTS {}(
            id INTEGER PRIMARY KEY GENERATED BY DEFAULT AS IDENTITY,
            {columns}
        );",
            Self::TABLE
        )
    }
}

impl Relational for Class {
    const TABLE: &'static str = "classes";
    const COLUMNS: &'static [&'static str] = &["class_name", "major", "lecturer"];

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.class_name.as_str())
            .bind(self.major.as_str())
            .bind(self.lecturer.as_str())
    }
}

impl Relational for Course {
    const TABLE: &'static str = "courses";
    const COLUMNS: &'static [&'static str] = &["name", "class_name", "major", "lecturer", "status"];

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.name.as_str())
            .bind(self.class.as_str())
            .bind(self.major.as_str())
            .bind(self.lecturer.as_str())
            .bind(self.status.as_str())
    }
}

impl Relational for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["user_name", "pass", "confirm_pass", "role"];

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.user_name.as_str())
            .bind(self.pass.as_str())
            .bind(self.confirm_pass.as_str())
            .bind(self.role.as_str())
    }
}

/// `$first, $first+1, ...` for `count` parameters.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|n| format!("${n}"))
        .collect::<Vec<String>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct PgRepository<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Relational> PgRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    fn select_sql() -> String {
        format!("SELECT id, {} FROM {}", T::COLUMNS.join(", "), T::TABLE)
    }

    fn insert_sql(with_id: bool) -> String {
        let n = T::COLUMNS.len();
        if with_id {
            format!(
                "INSERT INTO {} (id, {}) VALUES ($1, {}) RETURNING id;",
                T::TABLE,
                T::COLUMNS.join(", "),
                placeholders(2, n)
            )
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING id;",
                T::TABLE,
                T::COLUMNS.join(", "),
                placeholders(1, n)
            )
        }
    }

    fn update_sql() -> String {
        let assignments = T::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{c} = ${}", i + 1))
            .collect::<Vec<String>>()
            .join(", ");
        format!(
            "UPDATE {} SET {assignments} WHERE id = ${};",
            T::TABLE,
            T::COLUMNS.len() + 1
        )
    }
}

impl<T: Relational> Repository<T> for PgRepository<T> {
    async fn list(&self) -> Result<Vec<T>> {
        let sql = format!("{} ORDER BY id;", Self::select_sql());
        Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<T>> {
        let sql = format!("{} WHERE id = $1;", Self::select_sql());
        Ok(sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn add(&self, mut entity: T) -> Result<T> {
        let with_id = entity.has_id();
        let sql = Self::insert_sql(with_id);

        let mut transaction = self.pool.begin().await?;

        if with_id {
            let exists = sqlx::query(&format!("SELECT 1 FROM {} WHERE id = $1;", T::TABLE))
                .bind(entity.id())
                .fetch_optional(&mut *transaction)
                .await?;
            if exists.is_some() {
                return Err(Error::Conflict {
                    resource: T::RESOURCE,
                    id: entity.id(),
                });
            }
        }

        let query = if with_id {
            sqlx::query(&sql).bind(entity.id())
        } else {
            sqlx::query(&sql)
        };
        let row = entity.bind_columns(query).fetch_one(&mut *transaction).await?;
        let id: i32 = row.get("id");

        if with_id {
            // Keep the identity sequence ahead of explicitly chosen ids
            sqlx::query(&format!(
                "SELECT setval(pg_get_serial_sequence('{0}', 'id'), (SELECT MAX(id) FROM {0}));",
                T::TABLE
            ))
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;

        entity.set_id(id);
        tracing::info!("Inserted {} {}", T::RESOURCE, id);
        Ok(entity)
    }

    async fn update(&self, entity: T) -> Result<T> {
        let sql = Self::update_sql();
        let result = entity
            .bind_columns(sqlx::query(&sql))
            .bind(entity.id())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound {
                resource: T::RESOURCE,
                id: entity.id(),
            });
        }
        Ok(entity)
    }

    async fn remove(&self, id: i32) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1;", T::TABLE))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_statements_number_their_parameters() {
        assert_eq!(
            PgRepository::<Class>::insert_sql(false),
            "INSERT INTO classes (class_name, major, lecturer) VALUES ($1, $2, $3) RETURNING id;"
        );
        assert_eq!(
            PgRepository::<Class>::insert_sql(true),
            "INSERT INTO classes (id, class_name, major, lecturer) VALUES ($1, $2, $3, $4) RETURNING id;"
        );
    }

    #[test]
    fn update_binds_id_last() {
        assert_eq!(
            PgRepository::<User>::update_sql(),
            "UPDATE users SET user_name = $1, pass = $2, confirm_pass = $3, role = $4 WHERE id = $5;"
        );
    }

    #[test]
    fn course_table_stores_class_by_name() {
        let sql = Course::create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS courses("));
        assert!(sql.contains("class_name TEXT NOT NULL DEFAULT ''"));
        assert!(!sql.contains("REFERENCES"));
    }
}
