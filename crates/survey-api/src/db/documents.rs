//! Document persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `documents` table.
//! Bodies are stored as JSONB in the same camelCase shape the API serves.
//! Batch writes run in a single SQL transaction.

use sqlx::PgPool;
use survey_core::{Survey, SurveyResponse};

use crate::state::{Collection, Document};

fn to_body<T: Document>(record: &T) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(record).map_err(|e| {
        sqlx::Error::Protocol(format!(
            "failed to serialize {} document: {e}",
            T::COLLECTION
        ))
    })
}

/// Upsert for survey bodies that keeps the stored respondent counter.
///
/// The counter is owned by [`record_response`]; an authoring update must
/// never write back a count it read earlier.
const UPSERT_SURVEY_SQL: &str = "INSERT INTO documents (collection, id, body)
     VALUES ($1, $2, $3)
     ON CONFLICT (collection, id) DO UPDATE SET
         body = jsonb_set(
             EXCLUDED.body,
             '{responses}',
             COALESCE(documents.body->'responses', EXCLUDED.body->'responses')
         ),
         updated_at = now()";

/// Insert or replace one document.
pub async fn upsert<T: Document>(pool: &PgPool, record: &T) -> Result<(), sqlx::Error> {
    let body = to_body(record)?;
    sqlx::query(
        "INSERT INTO documents (collection, id, body)
         VALUES ($1, $2, $3)
         ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body, updated_at = now()",
    )
    .bind(T::COLLECTION.as_str())
    .bind(record.doc_id())
    .bind(&body)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert or replace several documents of one collection as one batch.
pub async fn upsert_many<T: Document>(pool: &PgPool, records: &[T]) -> Result<(), sqlx::Error> {
    if records.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for record in records {
        let body = to_body(record)?;
        sqlx::query(
            "INSERT INTO documents (collection, id, body)
             VALUES ($1, $2, $3)
             ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body, updated_at = now()",
        )
        .bind(T::COLLECTION.as_str())
        .bind(record.doc_id())
        .bind(&body)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(())
}

/// Insert or replace a survey without touching its stored respondent
/// counter. A new survey is written as given.
pub async fn upsert_survey(pool: &PgPool, survey: &Survey) -> Result<(), sqlx::Error> {
    let body = to_body(survey)?;
    sqlx::query(UPSERT_SURVEY_SQL)
        .bind(Collection::Surveys.as_str())
        .bind(survey.doc_id())
        .bind(&body)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete documents across collections as one batch. Returns the number
/// of rows removed.
pub async fn delete_many(
    pool: &PgPool,
    targets: &[(Collection, String)],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut removed = 0;
    for (collection, id) in targets {
        removed += sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;

    Ok(removed)
}

/// Load every document of `T`'s collection, in insertion order.
pub async fn load_all<T: Document>(pool: &PgPool) -> Result<Vec<T>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, body FROM documents WHERE collection = $1 ORDER BY seq",
    )
    .bind(T::COLLECTION.as_str())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(DocumentRow::into_record).collect()
}

/// Store a response and increment its survey's respondent counter in one
/// SQL transaction.
///
/// The survey row is locked with `SELECT ... FOR UPDATE` first, so
/// concurrent submissions never lose an increment and a response is never
/// stored for a survey deleted in the meantime. Returns the new count, or
/// `None` (nothing written) if the survey document does not exist.
pub async fn record_response(
    pool: &PgPool,
    response: &SurveyResponse,
) -> Result<Option<u64>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT id, body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
    )
    .bind(Collection::Surveys.as_str())
    .bind(&response.survey_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        tx.rollback().await?;
        return Ok(None);
    };
    let mut survey: Survey = row.into_record()?;
    survey.responses = survey.responses.saturating_add(1);

    sqlx::query(
        "INSERT INTO documents (collection, id, body)
         VALUES ($1, $2, $3)
         ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body, updated_at = now()",
    )
    .bind(Collection::Responses.as_str())
    .bind(response.doc_id())
    .bind(to_body(response)?)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE documents SET body = $1, updated_at = now() WHERE collection = $2 AND id = $3",
    )
    .bind(to_body(&survey)?)
    .bind(Collection::Surveys.as_str())
    .bind(&response.survey_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Some(survey.responses))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    body: serde_json::Value,
}

impl DocumentRow {
    fn into_record<T: Document>(self) -> Result<T, sqlx::Error> {
        serde_json::from_value(self.body).map_err(|e| {
            sqlx::Error::Protocol(format!(
                "corrupt {} document {}: {e}",
                T::COLLECTION,
                self.id
            ))
        })
    }
}
