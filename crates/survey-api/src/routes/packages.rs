//! # Package Catalog API
//!
//! Admin-only CRUD over subscription packages. The list endpoint also
//! returns the catalog KPIs computed over paid packages.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use survey_core::{Package, PackageKpi};
use utoipa::ToSchema;

use super::{new_doc_id, persist, unpersist, MessageResponse};
use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_text, Validate};
use crate::state::{AppState, Collection};

/// Request to create or replace a package.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PackageRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub description: String,
    pub features: Vec<String>,
}

impl Validate for PackageRequest {
    fn validate(&self) -> Result<(), String> {
        require_text(&self.name, "name")?;
        if self.price == 0 {
            return Err("price must be greater than zero".to_string());
        }
        require_text(&self.description, "description")
    }
}

/// Package list with catalog KPIs.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PackageListResponse {
    pub packages: Vec<Package>,
    pub kpi: PackageKpi,
}

/// Build the packages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/packages", get(list_packages).post(create_package))
        .route("/api/packages/:id", put(update_package).delete(delete_package))
}

/// GET /api/packages — List packages with KPIs.
#[utoipa::path(
    get,
    path = "/api/packages",
    responses(
        (status = 200, description = "Packages and KPIs", body = PackageListResponse),
    ),
    tag = "packages"
)]
pub(crate) async fn list_packages(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<PackageListResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let packages = state.packages.list();
    let kpi = PackageKpi::compute(&packages);
    Ok(Json(PackageListResponse { packages, kpi }))
}

/// POST /api/packages — Create a package.
#[utoipa::path(
    post,
    path = "/api/packages",
    request_body = PackageRequest,
    responses(
        (status = 201, description = "Package created", body = Package),
        (status = 422, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "packages"
)]
pub(crate) async fn create_package(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<PackageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Package>), AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let package = Package {
        id: new_doc_id(),
        name: req.name,
        price: req.price,
        description: req.description,
        features: req.features,
        subscriber_count: 0,
        created_at: Utc::now(),
        updated_at: None,
    };
    package.validate()?;

    state.packages.insert(package.id.clone(), package.clone());
    persist(&state, &package).await?;

    tracing::info!(package_id = %package.id, name = %package.name, "package created");
    Ok((StatusCode::CREATED, Json(package)))
}

/// PUT /api/packages/:id — Replace a package's details.
///
/// The subscriber count is kept.
#[utoipa::path(
    put,
    path = "/api/packages/{id}",
    params(("id" = String, Path, description = "Package ID")),
    request_body = PackageRequest,
    responses(
        (status = 200, description = "Package updated", body = Package),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "packages"
)]
pub(crate) async fn update_package(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<PackageRequest>, JsonRejection>,
) -> Result<Json<Package>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let package = state
        .packages
        .update(&id, |package| {
            package.name = req.name;
            package.price = req.price;
            package.description = req.description;
            package.features = req.features;
            package.updated_at = Some(Utc::now());
        })
        .ok_or_else(|| AppError::NotFound(format!("package {id} not found")))?;
    persist(&state, &package).await?;

    Ok(Json(package))
}

/// DELETE /api/packages/:id — Delete a package.
#[utoipa::path(
    delete,
    path = "/api/packages/{id}",
    params(("id" = String, Path, description = "Package ID")),
    responses(
        (status = 200, description = "Package deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "packages"
)]
pub(crate) async fn delete_package(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    state
        .packages
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("package {id} not found")))?;
    unpersist(&state, &[(Collection::Packages, id.clone())]).await?;

    Ok(Json(MessageResponse::new(format!("package {id} deleted"))))
}
