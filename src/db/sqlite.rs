use crate::db::models::GitTagAnnotation;
use crate::db::schema;
use crate::error::TagnoteError;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

/// SQLite keeps a hard cap on bound parameters per statement.
const GET_MANY_CHUNK: usize = 500;

/// Open a pool for `database_url`, creating the database file if missing.
///
/// The pool belongs to the caller; [`AnnotationStore`] only borrows a clone.
pub async fn connect(database_url: &str) -> Result<SqlitePool, TagnoteError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    Ok(pool)
}

/// Annotation persistence keyed by git tag object id.
#[derive(Clone)]
pub struct AnnotationStore {
    pool: SqlitePool,
}

impl AnnotationStore {
    /// Apply pending migrations on `pool` and return a ready store.
    pub async fn create(pool: SqlitePool) -> Result<Self, TagnoteError> {
        schema::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Insert or update the annotation for `git_tag_object_id`.
    ///
    /// A single `INSERT ... ON CONFLICT DO UPDATE`, so concurrent first writes
    /// for the same key leave exactly one row. `created_at` is only written on
    /// insert; every later write refreshes `updated_at`, clamped so it never
    /// sorts before `created_at` even when a racing writer sampled the clock
    /// earlier. Timestamps are fixed-width RFC3339 so `MAX` compares them
    /// chronologically.
    pub async fn store(&self, git_tag_object_id: &str, value: &str) -> Result<(), TagnoteError> {
        if git_tag_object_id.is_empty() {
            return Err(TagnoteError::EmptyObjectId);
        }
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        sqlx::query(
            r#"
            INSERT INTO git_tag_annotations ("gitTagObjectId", value, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT("gitTagObjectId") DO UPDATE SET
                value = excluded.value,
                updated_at = MAX(excluded.created_at, git_tag_annotations.created_at)
            "#,
        )
        .bind(git_tag_object_id)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch the annotation for `git_tag_object_id`; `None` when never stored.
    pub async fn get(
        &self,
        git_tag_object_id: &str,
    ) -> Result<Option<GitTagAnnotation>, TagnoteError> {
        let row = sqlx::query_as::<_, GitTagAnnotation>(
            r#"SELECT "gitTagObjectId", value, created_at, updated_at
               FROM git_tag_annotations WHERE "gitTagObjectId" = ?"#,
        )
        .bind(git_tag_object_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Fetch annotations for all `ids` at once. Unknown ids are left out of the map.
    pub async fn get_many(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, GitTagAnnotation>, TagnoteError> {
        let mut found = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(GET_MANY_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new(
                r#"SELECT "gitTagObjectId", value, created_at, updated_at
                   FROM git_tag_annotations WHERE "gitTagObjectId" IN ("#,
            );
            let mut in_list = qb.separated(", ");
            for id in chunk {
                in_list.push_bind(id.as_str());
            }
            in_list.push_unseparated(")");

            let rows = qb
                .build_query_as::<GitTagAnnotation>()
                .fetch_all(&self.pool)
                .await?;
            found.extend(
                rows.into_iter()
                    .map(|row| (row.git_tag_object_id.clone(), row)),
            );
        }

        Ok(found)
    }
}
