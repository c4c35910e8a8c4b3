//! # Respondent API
//!
//! Unauthenticated endpoints used by the survey-taking page. Only `Active`
//! surveys can be viewed or answered.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use survey_core::{PublicSurvey, Survey, SurveyResponse};
use utoipa::ToSchema;

use super::new_doc_id;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// A respondent's submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitResponseRequest {
    /// Answers keyed by question id.
    #[schema(value_type = Object)]
    pub answers: BTreeMap<String, serde_json::Value>,
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponseAck {
    pub id: String,
    pub message: String,
}

/// Build the public router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/surveys/public/:id", get(get_public_survey))
        .route("/api/surveys/:id/responses", post(submit_response))
}

fn open_survey(state: &AppState, id: &str) -> Result<Survey, AppError> {
    let survey = state
        .surveys
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("survey {id} not found")))?;
    if !survey.status.is_open() {
        return Err(AppError::Forbidden(format!(
            "survey {id} is {} and not accepting responses",
            survey.status
        )));
    }
    Ok(survey)
}

/// GET /api/surveys/public/:id — The respondent view of an active survey.
#[utoipa::path(
    get,
    path = "/api/surveys/public/{id}",
    params(("id" = String, Path, description = "Survey ID")),
    responses(
        (status = 200, description = "Survey questions", body = PublicSurvey),
        (status = 403, description = "Survey not active", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "public"
)]
pub(crate) async fn get_public_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PublicSurvey>, AppError> {
    let survey = open_survey(&state, &id)?;
    Ok(Json(survey.public_view()))
}

/// Append `response` and increment its survey's counter in memory.
///
/// If the survey disappeared since it was checked, the response is taken
/// back out so no orphan is left behind.
fn record_in_memory(state: &AppState, response: &SurveyResponse) -> Result<u64, AppError> {
    state.responses.insert(response.id.clone(), response.clone());
    match state.surveys.update(&response.survey_id, |survey| {
        survey.responses = survey.responses.saturating_add(1)
    }) {
        Some(survey) => Ok(survey.responses),
        None => {
            state.responses.remove(&response.id);
            tracing::warn!(
                survey_id = %response.survey_id,
                response_id = %response.id,
                "survey removed during submission"
            );
            Err(AppError::NotFound(format!(
                "survey {} not found",
                response.survey_id
            )))
        }
    }
}

/// Undo [`record_in_memory`] after the database refused the submission.
fn rollback_in_memory(state: &AppState, response: &SurveyResponse) {
    state.responses.remove(&response.id);
    state.surveys.update(&response.survey_id, |survey| {
        survey.responses = survey.responses.saturating_sub(1)
    });
}

/// POST /api/surveys/:id/responses — Submit answers to an active survey.
///
/// The response is appended and the survey's respondent counter
/// incremented together; in the database both happen in one transaction
/// holding the survey row lock. On failure nothing stays recorded.
#[utoipa::path(
    post,
    path = "/api/surveys/{id}/responses",
    params(("id" = String, Path, description = "Survey ID")),
    request_body = SubmitResponseRequest,
    responses(
        (status = 201, description = "Response recorded", body = SubmitResponseAck),
        (status = 400, description = "Missing or malformed answers", body = crate::error::ErrorBody),
        (status = 403, description = "Survey not active", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "public"
)]
pub(crate) async fn submit_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SubmitResponseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponseAck>), AppError> {
    let req = extract_json(body)?;
    open_survey(&state, &id)?;

    let response = SurveyResponse {
        id: new_doc_id(),
        survey_id: id.clone(),
        answers: req.answers,
        submitted_at: Utc::now(),
    };
    let count = record_in_memory(&state, &response)?;

    if let Some(pool) = &state.db_pool {
        match crate::db::documents::record_response(pool, &response).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                rollback_in_memory(&state, &response);
                return Err(AppError::NotFound(format!("survey {id} not found")));
            }
            Err(e) => {
                rollback_in_memory(&state, &response);
                tracing::error!(survey_id = %id, error = %e, "failed to persist response");
                return Err(AppError::Internal(
                    "response could not be recorded".to_string(),
                ));
            }
        }
    }

    tracing::info!(survey_id = %id, response_id = %response.id, respondents = count, "response submitted");
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponseAck {
            id: response.id,
            message: "response recorded".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::SurveyStatus;

    fn survey(status: SurveyStatus) -> Survey {
        let now = Utc::now();
        Survey {
            id: "s1".into(),
            title: "Coffee".into(),
            start_date: now.date_naive(),
            end_date: now.date_naive(),
            variable: "coffee".into(),
            target: 10,
            questions: vec![],
            template_id: String::new(),
            status,
            created_by: "ana".into(),
            creation_date: now,
            responses: 0,
            updated_at: now,
        }
    }

    #[test]
    fn open_survey_checks_status() {
        let state = AppState::new();
        state.surveys.insert("s1", survey(SurveyStatus::Draft));
        assert!(matches!(open_survey(&state, "s1"), Err(AppError::Forbidden(_))));
        assert!(matches!(open_survey(&state, "nope"), Err(AppError::NotFound(_))));

        state.surveys.insert("s1", survey(SurveyStatus::Active));
        assert!(open_survey(&state, "s1").is_ok());
    }

    fn response_for(survey_id: &str) -> SurveyResponse {
        SurveyResponse {
            id: "r-1".into(),
            survey_id: survey_id.into(),
            answers: BTreeMap::new(),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn submission_to_vanished_survey_leaves_no_response() {
        let state = AppState::new();
        let err = record_in_memory(&state, &response_for("gone")).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(state.responses.is_empty());
    }

    #[test]
    fn rollback_undoes_response_and_counter() {
        let state = AppState::new();
        state.surveys.insert("s1", survey(SurveyStatus::Active));
        let response = response_for("s1");

        assert_eq!(record_in_memory(&state, &response).unwrap(), 1);
        assert_eq!(state.responses.len(), 1);

        rollback_in_memory(&state, &response);
        assert!(state.responses.is_empty());
        assert_eq!(state.surveys.get("s1").unwrap().responses, 0);
    }

    #[test]
    fn submission_requires_answer_object() {
        let missing: Result<SubmitResponseRequest, _> = serde_json::from_value(serde_json::json!({}));
        assert!(missing.is_err());
        let not_object: Result<SubmitResponseRequest, _> =
            serde_json::from_value(serde_json::json!({"answers": [1, 2]}));
        assert!(not_object.is_err());
    }
}
