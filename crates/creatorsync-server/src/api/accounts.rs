use axum::{
    extract::{Path, State},
    Extension, Json,
};
use creatorsync_core::SocialAccount;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_sync_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct Disconnected {
    account_id: i64,
}

pub(super) async fn list_owner_accounts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(owner_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<SocialAccount>>>, ApiError> {
    let owner_id = Uuid::parse_str(owner_id.trim()).map_err(|_| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            "owner_id must be a UUID",
        )
    })?;

    let accounts = state
        .service
        .get_connected_accounts(owner_id)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(accounts, req_id.0)))
}

pub(super) async fn disconnect_account(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(account_id): Path<String>,
) -> Result<Json<ApiResponse<Disconnected>>, ApiError> {
    let account_id: i64 = account_id.trim().parse().map_err(|_| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            "account_id must be an integer",
        )
    })?;

    state
        .service
        .disconnect(account_id)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(Disconnected { account_id }, req_id.0)))
}
