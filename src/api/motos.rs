use super::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Moto, MotoInput};
use crate::pagination::{PagedResult, PaginationQuery};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::info;

const RESOURCE: &str = "motos";

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<PagedResult<Moto>>, ApiError> {
    let Query(query) = query?;
    let page = query.resolve(&state.pagination);

    let (items, total) = state.with_db(|db| {
        Ok((db.list_motos(page.skip(), page.limit())?, db.count_motos()?))
    })?;

    Ok(Json(PagedResult::new(items, page, total, RESOURCE)))
}

pub async fn get(
    _user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Moto>, ApiError> {
    let Path(id) = id?;
    state
        .with_db(|db| db.get_moto(id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("moto {}", id)))
}

pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<MotoInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let input = input.validated()?;

    let moto = state.with_db(|db| db.insert_moto(&input))?;
    info!("{} registered moto {} ({})", user.username, moto.id, moto.plate);

    let location = format!("/api/v1/{}/{}", RESOURCE, moto.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(moto)).into_response())
}

pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MotoInput>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let input = input.validated()?;

    if !state.with_db(|db| db.update_moto(id, &input))? {
        return Err(ApiError::NotFound(format!("moto {}", id)));
    }

    info!("{} updated moto {}", user.username, id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;

    if !state.with_db(|db| db.delete_moto(id))? {
        return Err(ApiError::NotFound(format!("moto {}", id)));
    }

    info!("{} removed moto {}", user.username, id);
    Ok(StatusCode::NO_CONTENT)
}
