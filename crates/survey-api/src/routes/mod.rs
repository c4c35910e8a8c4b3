//! # API Route Modules
//!
//! - `users` — user overview, per-user transactions, user CRUD (admin).
//! - `packages` — subscription package catalog with KPIs (admin).
//! - `templates` — reusable question sets (researcher).
//! - `surveys` — survey authoring and the analysis dashboard (researcher).
//! - `public` — respondent-facing survey view and response submission
//!   (unauthenticated).

pub mod packages;
pub mod public;
pub mod surveys;
pub mod templates;
pub mod users;

use serde::{Deserialize, Serialize};
use survey_core::Survey;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::{AppState, Collection, Document};

/// Confirmation body for operations with nothing else to return.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Write a document through to the database, if one is configured.
///
/// A failure is surfaced to the client: the in-memory record would be lost
/// on restart.
pub(crate) async fn persist<T: Document>(state: &AppState, record: &T) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::documents::upsert(pool, record).await {
            tracing::error!(
                collection = %T::COLLECTION,
                id = record.doc_id(),
                error = %e,
                "failed to persist document to database"
            );
            return Err(AppError::Internal(format!(
                "{} recorded in-memory but database persist failed",
                T::COLLECTION
            )));
        }
    }
    Ok(())
}

/// Write a survey through to the database without overwriting the stored
/// respondent counter, which only response submission may change.
pub(crate) async fn persist_survey(state: &AppState, survey: &Survey) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::documents::upsert_survey(pool, survey).await {
            tracing::error!(
                survey_id = %survey.id,
                error = %e,
                "failed to persist survey to database"
            );
            return Err(AppError::Internal(
                "survey recorded in-memory but database persist failed".to_string(),
            ));
        }
    }
    Ok(())
}

/// Write several documents of one collection through as one batch.
pub(crate) async fn persist_many<T: Document>(
    state: &AppState,
    records: &[T],
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::documents::upsert_many(pool, records).await {
            tracing::error!(
                collection = %T::COLLECTION,
                count = records.len(),
                error = %e,
                "failed to persist document batch to database"
            );
            return Err(AppError::Internal(format!(
                "{} batch recorded in-memory but database persist failed",
                T::COLLECTION
            )));
        }
    }
    Ok(())
}

/// Delete documents from the database as one batch, if one is configured.
pub(crate) async fn unpersist(
    state: &AppState,
    targets: &[(Collection, String)],
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::documents::delete_many(pool, targets).await {
            tracing::error!(
                count = targets.len(),
                error = %e,
                "failed to delete documents from database"
            );
            return Err(AppError::Internal(
                "documents removed in-memory but database delete failed".to_string(),
            ));
        }
    }
    Ok(())
}

/// Generate a document id for a new record.
pub(crate) fn new_doc_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
