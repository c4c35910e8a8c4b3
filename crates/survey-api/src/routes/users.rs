//! # Users & Transactions API
//!
//! Admin-only user overview, transaction history and user CRUD. Users are
//! keyed by email; transactions are written by the billing side and only
//! renamed or deleted here, together with their user.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use survey_core::user::{summarize, transactions_for};
use survey_core::{Transaction, User, UserSummary};
use utoipa::ToSchema;

use super::{persist, persist_many, unpersist, MessageResponse};
use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_text, Validate};
use crate::state::{AppState, Collection};

/// Request to create a user.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub agency: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notification_pref: bool,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), String> {
        require_text(&self.full_name, "fullName")?;
        require_text(&self.email, "email")?;
        require_text(&self.level, "level")
    }
}

/// Request to update a user's profile. Absent optional fields keep their
/// current value.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub level: String,
    pub agency: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub notification_pref: Option<bool>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), String> {
        require_text(&self.full_name, "fullName")?;
        require_text(&self.level, "level")
    }
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/summary", get(user_summary))
        .route("/api/transactions/:email", get(user_transactions))
        .route("/api/users", post(create_user))
        .route("/api/users/:email", put(update_user).delete(delete_user))
}

/// GET /api/summary — Users with their succeeded-transaction totals.
#[utoipa::path(
    get,
    path = "/api/summary",
    responses(
        (status = 200, description = "User overview, biggest spenders first", body = Vec<UserSummary>),
    ),
    tag = "users"
)]
pub(crate) async fn user_summary(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let users = state.users.list();
    let transactions = state.transactions.list();
    Ok(Json(summarize(&users, &transactions)))
}

/// GET /api/transactions/:email — A user's transactions, newest first.
#[utoipa::path(
    get,
    path = "/api/transactions/{email}",
    params(("email" = String, Path, description = "Customer email")),
    responses(
        (status = 200, description = "Transactions, empty for unknown users", body = Vec<Transaction>),
    ),
    tag = "users"
)]
pub(crate) async fn user_transactions(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(email): Path<String>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let all = state.transactions.list();
    let own: Vec<Transaction> = transactions_for(&email, &all).into_iter().cloned().collect();
    Ok(Json(own))
}

/// POST /api/users — Create a user.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Missing fields", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let user = User {
        full_name: req.full_name,
        email: req.email.trim().to_string(),
        level: req.level,
        agency: req.agency,
        industry: req.industry,
        phone: req.phone,
        notification_pref: req.notification_pref,
        created_at: Utc::now(),
    };
    user.validate()?;

    if !state.users.insert_new(user.email.clone(), user.clone()) {
        return Err(AppError::Conflict(format!(
            "user {} already exists",
            user.email
        )));
    }
    persist(&state, &user).await?;

    tracing::info!(email = %user.email, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/users/:email — Update a user's profile.
///
/// The new name is copied onto every one of the user's transactions in
/// the same batch.
#[utoipa::path(
    put,
    path = "/api/users/{email}",
    params(("email" = String, Path, description = "User email")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn update_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(email): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;

    let user = state
        .users
        .update(&email, |user| {
            user.full_name = req.full_name.clone();
            user.level = req.level.clone();
            if let Some(agency) = &req.agency {
                user.agency = agency.clone();
            }
            if let Some(industry) = &req.industry {
                user.industry = industry.clone();
            }
            if let Some(phone) = &req.phone {
                user.phone = phone.clone();
            }
            if let Some(pref) = req.notification_pref {
                user.notification_pref = pref;
            }
        })
        .ok_or_else(|| AppError::NotFound(format!("user {email} not found")))?;

    let renamed = state.transactions.update_where(
        |t| t.customer_email == email,
        |t| t.customer_name = user.full_name.clone(),
    );

    persist(&state, &user).await?;
    persist_many(&state, &renamed).await?;

    tracing::info!(email = %email, transactions = renamed.len(), "user updated");
    Ok(Json(user))
}

/// DELETE /api/users/:email — Delete a user and all their transactions.
#[utoipa::path(
    delete,
    path = "/api/users/{email}",
    params(("email" = String, Path, description = "User email")),
    responses(
        (status = 200, description = "User and transactions deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn delete_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(email): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    require_role(&caller, Role::Admin)?;

    state
        .users
        .remove(&email)
        .ok_or_else(|| AppError::NotFound(format!("user {email} not found")))?;
    let removed = state
        .transactions
        .remove_where(|t| t.customer_email == email);

    let mut targets = vec![(Collection::Users, email.clone())];
    targets.extend(
        removed
            .iter()
            .map(|(id, _)| (Collection::Transactions, id.clone())),
    );
    unpersist(&state, &targets).await?;

    tracing::info!(email = %email, transactions = removed.len(), "user deleted");
    Ok(Json(MessageResponse::new(format!(
        "user {email} and {} transactions deleted",
        removed.len()
    ))))
}
