//! Contacts collaborator boundary: create and list the active contacts the
//! dispatch pipeline consumes. Update/delete live outside the core.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::contact::{Contact, NewContact};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub contact: Contact,
}

/// `POST /api/contacts` — create a validated contact.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(request): Json<NewContact>,
) -> Result<(StatusCode, Json<ContactResponse>), ApiError> {
    if request.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("User ID is required".into()));
    }
    let priority = request.validate()?;

    let now = Utc::now().naive_utc();
    let contact = Contact {
        id: Uuid::new_v4(),
        user_id: request.user_id,
        name: request.name.trim().to_string(),
        phone: request.phone,
        email: request.email.map(|e| e.to_lowercase()),
        relationship: request.relationship,
        priority,
        is_active: true,
        notes: request.notes,
        created_at: now,
        updated_at: now,
    };

    let conn = crate::db::lock(&ctx.db)?;
    repository::insert_contact(&conn, &contact)?;
    Ok((StatusCode::CREATED, Json(ContactResponse { contact })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactListResponse {
    pub contacts: Vec<Contact>,
    pub count: usize,
}

/// `GET /api/contacts?userId=` — active contacts, highest priority first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ContactListResponse>, ApiError> {
    let Some(user_id) = query.user_id.filter(|u| !u.trim().is_empty()) else {
        return Err(ApiError::BadRequest("User ID is required".into()));
    };

    let conn = crate::db::lock(&ctx.db)?;
    let contacts = repository::list_active_for_user(&conn, &user_id)?;
    Ok(Json(ContactListResponse {
        count: contacts.len(),
        contacts,
    }))
}
