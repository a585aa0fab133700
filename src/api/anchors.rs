use super::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Anchor, AnchorInput};
use crate::pagination::{PagedResult, PaginationQuery};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::info;

const RESOURCE: &str = "anchors";

// Anchor positions are not public, so every route takes a token

pub async fn list(
    _user: AuthUser,
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<PagedResult<Anchor>>, ApiError> {
    let Query(query) = query?;
    let page = query.resolve(&state.pagination);

    let (items, total) = state.with_db(|db| {
        Ok((db.list_anchors(page.skip(), page.limit())?, db.count_anchors()?))
    })?;

    Ok(Json(PagedResult::new(items, page, total, RESOURCE)))
}

pub async fn get(
    _user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Anchor>, ApiError> {
    let Path(id) = id?;
    state
        .with_db(|db| db.get_anchor(id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("anchor {}", id)))
}

pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<AnchorInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let input = input.validated()?;

    let anchor = state.with_db(|db| db.insert_anchor(&input))?;
    info!(
        "{} installed anchor {} '{}' at ({:.5}, {:.5})",
        user.username, anchor.id, anchor.name, anchor.latitude, anchor.longitude
    );

    let location = format!("/api/v1/{}/{}", RESOURCE, anchor.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(anchor)).into_response())
}

pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AnchorInput>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let input = input.validated()?;

    if !state.with_db(|db| db.update_anchor(id, &input))? {
        return Err(ApiError::NotFound(format!("anchor {}", id)));
    }

    info!("{} updated anchor {}", user.username, id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;

    if !state.with_db(|db| db.delete_anchor(id))? {
        return Err(ApiError::NotFound(format!("anchor {}", id)));
    }

    info!("{} removed anchor {}", user.username, id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{send, test_app, token};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_anchor_lifecycle() {
        let app = test_app();
        let token = token(&app).await;

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/v1/anchors",
            Some(&token),
            Some(json!({ "nome": "Anchor A-01", "latitude": -23.53, "longitude": -46.70, "rangeMeters": 12.5 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["rangeMeters"], 12.5);
        assert_eq!(created["status"], "ativo");
        let uri = format!("/api/v1/anchors/{}", created["id"]);

        let (status, _) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "name": "Anchor A-01", "latitude": -23.53, "longitude": -46.70, "status": "inativo" })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, fetched) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(fetched["status"], "inativo");
        assert_eq!(fetched["rangeMeters"], 30.0);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, list) = send(&app, Method::GET, "/api/v1/anchors", Some(&token), None).await;
        assert_eq!(list["totalItems"], 0);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_position() {
        let app = test_app();
        let token = token(&app).await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/anchors",
            Some(&token),
            Some(json!({ "name": "Anchor X", "latitude": -123.0, "longitude": 0.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
