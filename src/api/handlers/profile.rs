use std::sync::Arc;

use axum::{extract::Extension, http::HeaderMap, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::{authenticate, error_reply, error_response, ErrorReply, ErrorResponse};
use crate::core::{Gateway, ProfileChanges};
use crate::store::ProfileRecord;

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    display_name: Option<String>,
    #[serde(rename = "photoURL")]
    photo_url: Option<String>,
    rut: Option<String>,
    birthdate: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    email: String,
    verified: bool,
    display_name: Option<String>,
    #[serde(rename = "photoURL")]
    photo_url: Option<String>,
    rut: Option<String>,
    birthdate: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRecord> for ProfileResponse {
    fn from(record: ProfileRecord) -> Self {
        Self {
            email: record.email,
            verified: record.verified,
            display_name: record.display_name,
            photo_url: record.photo_url,
            rut: record.rut,
            birthdate: record.birthdate,
            created_at: record.created_at,
        }
    }
}

#[utoipa::path(
    patch,
    path = "/profile",
    request_body = UpdateProfileRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 401, description = "Missing or invalid session token", body = ErrorResponse),
        (status = 404, description = "No profile record", body = ErrorResponse),
    ),
    tag = "profile"
)]
// axum handler for profile updates
#[instrument(skip_all)]
pub async fn update_profile(
    gateway: Extension<Arc<Gateway>>,
    headers: HeaderMap,
    payload: Option<Json<UpdateProfileRequest>>,
) -> Result<Json<ProfileResponse>, ErrorReply> {
    let claims = authenticate(&gateway, &headers).await?;

    let Some(Json(request)) = payload else {
        return Err(error_reply(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    let record = gateway
        .profile
        .update(
            &claims.uid,
            ProfileChanges {
                display_name: request.display_name,
                photo_url: request.photo_url,
                rut: request.rut,
                birthdate: request.birthdate,
            },
        )
        .await
        .map_err(|err| error_response(&err))?;

    Ok(Json(record.into()))
}
