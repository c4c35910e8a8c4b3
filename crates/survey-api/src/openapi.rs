//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Survey Admin API",
        version = "0.1.0",
        description = "Admin backend for the survey platform: users, packages, templates, surveys, response submission and the response analysis dashboard.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Users
        crate::routes::users::user_summary,
        crate::routes::users::user_transactions,
        crate::routes::users::create_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,
        // Packages
        crate::routes::packages::list_packages,
        crate::routes::packages::create_package,
        crate::routes::packages::update_package,
        crate::routes::packages::delete_package,
        // Templates
        crate::routes::templates::list_templates,
        crate::routes::templates::create_template,
        crate::routes::templates::update_template,
        crate::routes::templates::delete_template,
        // Surveys
        crate::routes::surveys::list_surveys,
        crate::routes::surveys::create_survey,
        crate::routes::surveys::update_survey,
        crate::routes::surveys::delete_survey,
        crate::routes::surveys::survey_analysis,
        // Public
        crate::routes::public::get_public_survey,
        crate::routes::public::submit_response,
    ),
    components(schemas(
        // Domain records
        survey_core::User,
        survey_core::UserSummary,
        survey_core::Transaction,
        survey_core::TransactionStatus,
        survey_core::Package,
        survey_core::PackageKpi,
        survey_core::Template,
        survey_core::Survey,
        survey_core::SurveyStatus,
        survey_core::PublicSurvey,
        survey_core::SurveyResponse,
        survey_core::Question,
        survey_core::QuestionType,
        survey_core::QuestionOptions,
        // Analysis payload
        survey_core::SurveyAnalysis,
        survey_core::analysis::NoAnalysis,
        survey_core::analysis::SurveyStats,
        survey_core::analysis::QuestionView,
        survey_core::analysis::AnalysisSection,
        survey_core::analysis::RawRecord,
        survey_core::analysis::QuestionRef,
        survey_core::analysis::ChartSeries,
        survey_core::analysis::ChartKind,
        survey_core::analysis::DescriptiveStats,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Request / response DTOs
        crate::routes::MessageResponse,
        crate::routes::users::CreateUserRequest,
        crate::routes::users::UpdateUserRequest,
        crate::routes::packages::PackageRequest,
        crate::routes::packages::PackageListResponse,
        crate::routes::templates::TemplateRequest,
        crate::routes::surveys::SurveyRequest,
        crate::routes::public::SubmitResponseRequest,
        crate::routes::public::SubmitResponseAck,
    )),
    tags(
        (name = "users", description = "User overview and user management"),
        (name = "packages", description = "Subscription package catalog"),
        (name = "templates", description = "Reusable question sets"),
        (name = "surveys", description = "Survey authoring and analysis"),
        (name = "public", description = "Respondent-facing endpoints"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_route_group() {
        let spec = ApiDoc::openapi();
        let paths: Vec<&String> = spec.paths.paths.keys().collect();
        for expected in [
            "/api/summary",
            "/api/packages",
            "/api/templates",
            "/api/surveys/{id}/analysis",
            "/api/surveys/{id}/responses",
            "/api/surveys/public/{id}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing path {expected}"
            );
        }
    }

    #[test]
    fn advertised_license_matches_package() {
        let spec = ApiDoc::openapi();
        let license = spec.info.license.expect("license set");
        assert_eq!(license.name, env!("CARGO_PKG_LICENSE"));
    }
}
