//! Update ledger handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use tracing::info;
use validator::Validate;

use core_kernel::{FileIncomingId, UpdateId};
use domain_update::{UpdateQuery, UpdateState};

use crate::auth::{permissions, require_role, Claims};
use crate::dto::updates::*;
use crate::{error::ApiError, AppState};

/// Fails with 503 while no handler is registered
fn require_handlers(state: &AppState) -> Result<(), ApiError> {
    if state.engine.registry().is_empty() {
        return Err(ApiError::ServiceUnavailable(
            "no object-type handlers are registered".to_string(),
        ));
    }
    Ok(())
}

fn parse_update_id(raw: &str) -> Result<UpdateId, ApiError> {
    raw.parse::<UpdateId>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Lists updates in replay order
pub async fn list_updates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListUpdatesQuery>,
) -> Result<Json<Vec<UpdateResponse>>, ApiError> {
    require_role(&claims, permissions::UPDATE_READ)?;

    let mut query = UpdateQuery::default().paginate(
        params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        params.offset.unwrap_or(0),
    );
    if let Some(ref raw) = params.state {
        let state: UpdateState = raw
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("unknown state '{}'", raw)))?;
        query.state = Some(state);
    }
    if let Some(ref raw) = params.file_incoming_id {
        let file_id = raw
            .parse::<FileIncomingId>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        query.file_incoming_id = Some(file_id);
    }
    query.object_type = params.object_type;

    let updates = state.ledger.search(&query).await?;
    Ok(Json(updates.into_iter().map(UpdateResponse::from).collect()))
}

/// Gets one update with its display name
pub async fn get_update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<UpdateResponse>, ApiError> {
    require_role(&claims, permissions::UPDATE_READ)?;

    let update = state.ledger.get(parse_update_id(&id)?).await?;
    let name = state.ledger.display_name_of(&update).await?;
    Ok(Json(UpdateResponse::from(update).with_name(name)))
}

/// Executes the given updates in sequence order
pub async fn execute_updates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    require_role(&claims, permissions::UPDATE_EXECUTE)?;
    request.validate()?;
    require_handlers(&state)?;

    let ids = request
        .ids
        .iter()
        .map(|raw| parse_update_id(raw))
        .collect::<Result<Vec<_>, _>>()?;

    info!(user = %claims.sub, count = ids.len(), "Replay requested");
    let summary = state.engine.execute(&ids).await?;
    Ok(Json(summary.into()))
}

/// Executes every update that is not executed yet
pub async fn execute_all_updates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    require_role(&claims, permissions::UPDATE_EXECUTE)?;
    require_handlers(&state)?;

    info!(user = %claims.sub, "Full replay requested");
    let summary = state.engine.execute_all().await?;
    Ok(Json(summary.into()))
}

/// Deleting updates is refused
pub async fn delete_update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<()>, ApiError> {
    require_role(&claims, permissions::UPDATE_EXECUTE)?;

    let id = parse_update_id(&id)?;
    state.ledger.delete(&[id]).await?;
    Ok(Json(()))
}
