//! # Survey API
//!
//! Researcher-facing survey authoring and the analysis dashboard.
//!
//! The analysis endpoint is a thin request layer over
//! [`survey_core::compute_analysis`]: it resolves the survey, loads all of
//! its responses, and serializes whatever the engine returns.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use survey_core::survey::{assign_missing_ids, instantiate_template};
use survey_core::{
    compute_analysis, AnalysisOutcome, Question, Survey, SurveyAnalysis, SurveyError,
    SurveyStatus,
};
use utoipa::ToSchema;

use super::{new_doc_id, persist_survey, unpersist, MessageResponse};
use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_text, Validate};
use crate::state::{AppState, Collection};

/// Recorded as the author when the request names none.
const UNKNOWN_AUTHOR: &str = "Unknown";

/// Request to create or replace a survey.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRequest {
    #[serde(default)]
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub variable: String,
    /// Target respondent count; 0 for none.
    #[serde(default)]
    pub target: u64,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// When set on create, the template's questions replace `questions`.
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub status: SurveyStatus,
    #[serde(default)]
    pub created_by: String,
}

impl Validate for SurveyRequest {
    fn validate(&self) -> Result<(), String> {
        require_text(&self.title, "title")?;
        require_text(&self.variable, "variable")?;
        if self.end_date < self.start_date {
            return Err("endDate must not be before startDate".to_string());
        }
        Ok(())
    }
}

impl SurveyRequest {
    fn author(&self) -> String {
        if self.created_by.trim().is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            self.created_by.clone()
        }
    }
}

/// Build the surveys router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/surveys", get(list_surveys).post(create_survey))
        .route("/api/surveys/:id", put(update_survey).delete(delete_survey))
        .route("/api/surveys/:id/analysis", get(survey_analysis))
}

/// GET /api/surveys — List surveys.
#[utoipa::path(
    get,
    path = "/api/surveys",
    responses((status = 200, description = "All surveys", body = Vec<Survey>)),
    tag = "surveys"
)]
pub(crate) async fn list_surveys(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<Survey>>, AppError> {
    require_role(&caller, Role::Researcher)?;
    Ok(Json(state.surveys.list()))
}

/// POST /api/surveys — Create a survey, optionally from a template.
#[utoipa::path(
    post,
    path = "/api/surveys",
    request_body = SurveyRequest,
    responses(
        (status = 201, description = "Survey created", body = Survey),
        (status = 404, description = "Template not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "surveys"
)]
pub(crate) async fn create_survey(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<SurveyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Survey>), AppError> {
    require_role(&caller, Role::Researcher)?;
    let req = extract_validated_json(body)?;
    let created_by = req.author();

    let questions = if req.template_id.trim().is_empty() {
        let mut questions = req.questions;
        assign_missing_ids(&mut questions);
        questions
    } else {
        let template = state.templates.get(&req.template_id).ok_or_else(|| {
            AppError::NotFound(format!("template {} not found", req.template_id))
        })?;
        instantiate_template(&template, &req.variable)
    };

    let now = Utc::now();
    let survey = Survey {
        id: new_doc_id(),
        title: req.title,
        start_date: req.start_date,
        end_date: req.end_date,
        variable: req.variable,
        target: req.target,
        questions,
        template_id: req.template_id,
        status: req.status,
        created_by,
        creation_date: now,
        responses: 0,
        updated_at: now,
    };
    survey.validate()?;

    state.surveys.insert(survey.id.clone(), survey.clone());
    persist_survey(&state, &survey).await?;

    tracing::info!(
        survey_id = %survey.id,
        questions = survey.questions.len(),
        template = %survey.template_id,
        "survey created"
    );
    Ok((StatusCode::CREATED, Json(survey)))
}

/// PUT /api/surveys/:id — Replace a survey's authoring fields.
///
/// The respondent counter and creation date are kept.
#[utoipa::path(
    put,
    path = "/api/surveys/{id}",
    params(("id" = String, Path, description = "Survey ID")),
    request_body = SurveyRequest,
    responses(
        (status = 200, description = "Survey updated", body = Survey),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "surveys"
)]
pub(crate) async fn update_survey(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<SurveyRequest>, JsonRejection>,
) -> Result<Json<Survey>, AppError> {
    require_role(&caller, Role::Researcher)?;
    let req = extract_validated_json(body)?;
    let created_by = req.author();
    let mut questions = req.questions;
    assign_missing_ids(&mut questions);

    let survey = state
        .surveys
        .try_update(&id, |current| {
            let candidate = Survey {
                id: current.id.clone(),
                title: req.title,
                start_date: req.start_date,
                end_date: req.end_date,
                variable: req.variable,
                target: req.target,
                questions,
                template_id: req.template_id,
                status: req.status,
                created_by,
                creation_date: current.creation_date,
                responses: current.responses,
                updated_at: Utc::now(),
            };
            candidate.validate()?;
            *current = candidate.clone();
            Ok::<_, SurveyError>(candidate)
        })
        .ok_or_else(|| AppError::NotFound(format!("survey {id} not found")))??;
    persist_survey(&state, &survey).await?;

    tracing::info!(survey_id = %id, status = %survey.status, "survey updated");
    Ok(Json(survey))
}

/// DELETE /api/surveys/:id — Delete a survey and its responses.
#[utoipa::path(
    delete,
    path = "/api/surveys/{id}",
    params(("id" = String, Path, description = "Survey ID")),
    responses(
        (status = 200, description = "Survey deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "surveys"
)]
pub(crate) async fn delete_survey(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    require_role(&caller, Role::Researcher)?;
    state
        .surveys
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("survey {id} not found")))?;
    let removed = state.responses.remove_where(|r| r.survey_id == id);

    let mut targets = vec![(Collection::Surveys, id.clone())];
    targets.extend(
        removed
            .into_iter()
            .map(|(response_id, _)| (Collection::Responses, response_id)),
    );
    unpersist(&state, &targets).await?;

    tracing::info!(survey_id = %id, responses = targets.len() - 1, "survey deleted");
    Ok(Json(MessageResponse::new(format!("survey {id} deleted"))))
}

/// GET /api/surveys/:id/analysis — Aggregated responses for the dashboard.
///
/// Always 200 for a known survey: with no responses the body is the
/// `{"message": ..., "analysis": null}` sentinel.
#[utoipa::path(
    get,
    path = "/api/surveys/{id}/analysis",
    params(("id" = String, Path, description = "Survey ID")),
    responses(
        (status = 200, description = "Analysis, or the no-responses sentinel", body = SurveyAnalysis),
        (status = 404, description = "Survey not found", body = crate::error::ErrorBody),
    ),
    tag = "surveys"
)]
pub(crate) async fn survey_analysis(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    require_role(&caller, Role::Researcher)?;

    let survey = state
        .surveys
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("survey {id} not found")))?;
    let responses = state.responses.query(|r| r.survey_id == id);

    let outcome = compute_analysis(&survey, &responses);
    match outcome.analysis() {
        Some(analysis) => tracing::debug!(
            survey_id = %id,
            respondents = analysis.stats.total_respondents,
            unmatched_answers = analysis.diagnostics.unmatched_answers,
            excluded_scale_answers = analysis.diagnostics.excluded_scale_answers,
            "survey analysed"
        ),
        None => tracing::debug!(survey_id = %id, "survey has no responses"),
    }

    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> SurveyRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn survey_request_defaults() {
        let req = request(json!({
            "title": "Coffee",
            "startDate": "2025-01-01",
            "endDate": "2025-01-31",
            "variable": "coffee"
        }));
        assert!(req.validate().is_ok());
        assert_eq!(req.target, 0);
        assert_eq!(req.status, SurveyStatus::Draft);
        assert_eq!(req.author(), UNKNOWN_AUTHOR);
        assert!(req.questions.is_empty());
    }

    #[test]
    fn survey_request_rejects_reversed_dates() {
        let req = request(json!({
            "title": "Coffee",
            "startDate": "2025-02-01",
            "endDate": "2025-01-31",
            "variable": "coffee"
        }));
        assert!(req.validate().unwrap_err().contains("endDate"));
    }

    #[test]
    fn negative_target_is_a_parse_error() {
        let parsed: Result<SurveyRequest, _> = serde_json::from_value(json!({
            "title": "Coffee",
            "startDate": "2025-01-01",
            "endDate": "2025-01-31",
            "variable": "coffee",
            "target": -5
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn survey_request_requires_variable() {
        let req = request(json!({
            "title": "Coffee",
            "startDate": "2025-01-01",
            "endDate": "2025-01-31"
        }));
        assert_eq!(req.validate(), Err("variable is required".to_string()));
    }
}
