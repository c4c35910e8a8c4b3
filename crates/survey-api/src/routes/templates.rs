//! # Template API
//!
//! Reusable question sets. Template question ids may be blank: they are
//! filled in when a survey is created from the template.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use survey_core::question::validate_schema;
use survey_core::{Question, Template};
use utoipa::ToSchema;

use super::{new_doc_id, persist, unpersist, MessageResponse};
use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_text, Validate};
use crate::state::{AppState, Collection};

/// Request to create or replace a template.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TemplateRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
}

impl Validate for TemplateRequest {
    fn validate(&self) -> Result<(), String> {
        require_text(&self.title, "title")?;
        validate_schema(&self.questions).map_err(|e| e.to_string())
    }
}

/// Build the templates router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/templates", get(list_templates).post(create_template))
        .route(
            "/api/templates/:id",
            put(update_template).delete(delete_template),
        )
}

/// GET /api/templates — List templates.
#[utoipa::path(
    get,
    path = "/api/templates",
    responses((status = 200, description = "All templates", body = Vec<Template>)),
    tag = "templates"
)]
pub(crate) async fn list_templates(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<Template>>, AppError> {
    require_role(&caller, Role::Researcher)?;
    Ok(Json(state.templates.list()))
}

/// POST /api/templates — Create a template.
#[utoipa::path(
    post,
    path = "/api/templates",
    request_body = TemplateRequest,
    responses(
        (status = 201, description = "Template created", body = Template),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "templates"
)]
pub(crate) async fn create_template(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<TemplateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Template>), AppError> {
    require_role(&caller, Role::Researcher)?;
    let req = extract_validated_json(body)?;

    let template = Template {
        id: new_doc_id(),
        title: req.title,
        description: req.description,
        questions: req.questions,
        created_at: Utc::now(),
        updated_at: None,
    };
    template.validate()?;

    state.templates.insert(template.id.clone(), template.clone());
    persist(&state, &template).await?;

    tracing::info!(
        template_id = %template.id,
        questions = template.questions.len(),
        "template created"
    );
    Ok((StatusCode::CREATED, Json(template)))
}

/// PUT /api/templates/:id — Replace a template.
#[utoipa::path(
    put,
    path = "/api/templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    request_body = TemplateRequest,
    responses(
        (status = 200, description = "Template updated", body = Template),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "templates"
)]
pub(crate) async fn update_template(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<TemplateRequest>, JsonRejection>,
) -> Result<Json<Template>, AppError> {
    require_role(&caller, Role::Researcher)?;
    let req = extract_validated_json(body)?;

    let template = state
        .templates
        .update(&id, |template| {
            template.title = req.title;
            template.description = req.description;
            template.questions = req.questions;
            template.updated_at = Some(Utc::now());
        })
        .ok_or_else(|| AppError::NotFound(format!("template {id} not found")))?;
    persist(&state, &template).await?;

    Ok(Json(template))
}

/// DELETE /api/templates/:id — Delete a template.
///
/// Surveys already created from it keep their copied questions.
#[utoipa::path(
    delete,
    path = "/api/templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "templates"
)]
pub(crate) async fn delete_template(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    require_role(&caller, Role::Researcher)?;
    state
        .templates
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("template {id} not found")))?;
    unpersist(&state, &[(Collection::Templates, id.clone())]).await?;

    Ok(Json(MessageResponse::new(format!("template {id} deleted"))))
}
