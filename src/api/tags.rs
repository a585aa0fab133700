use super::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Tag, TagInput};
use crate::pagination::{PagedResult, PaginationQuery};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::info;

const RESOURCE: &str = "tags";

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<PagedResult<Tag>>, ApiError> {
    let Query(query) = query?;
    let page = query.resolve(&state.pagination);

    let (items, total) =
        state.with_db(|db| Ok((db.list_tags(page.skip(), page.limit())?, db.count_tags()?)))?;

    Ok(Json(PagedResult::new(items, page, total, RESOURCE)))
}

pub async fn get(
    _user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Tag>, ApiError> {
    let Path(id) = id?;
    state
        .with_db(|db| db.get_tag(id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("tag {}", id)))
}

pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<TagInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let input = input.validated()?;

    let tag = state.with_db(|db| db.insert_tag(&input))?;
    info!("{} registered tag {} ({} / {})", user.username, tag.id, tag.code, tag.mac);

    let location = format!("/api/v1/{}/{}", RESOURCE, tag.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(tag)).into_response())
}

pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TagInput>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    let input = input.validated()?;

    if !state.with_db(|db| db.update_tag(id, &input))? {
        return Err(ApiError::NotFound(format!("tag {}", id)));
    }

    info!("{} updated tag {}", user.username, id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;

    if !state.with_db(|db| db.delete_tag(id))? {
        return Err(ApiError::NotFound(format!("tag {}", id)));
    }

    info!("{} removed tag {}", user.username, id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{send, test_app, token};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_tag_lifecycle() {
        let app = test_app();
        let token = token(&app).await;

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/v1/tags",
            Some(&token),
            Some(json!({
                "codigo": "TAG-0001", "mac": "aa-bb-cc-dd-ee-01",
                "rssiCalibrado": -59, "bateriaPercent": 87, "status": "ativo"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["code"], "TAG-0001");
        assert_eq!(created["mac"], "AA:BB:CC:DD:EE:01");
        assert_eq!(created["batteryPercent"], 87);
        let uri = format!("/api/v1/tags/{}", created["id"]);

        let (status, list) = send(&app, Method::GET, "/api/v1/tags", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["items"][0], created);

        let (status, _) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({
                "code": "TAG-0001", "mac": "AA:BB:CC:DD:EE:01",
                "calibratedRssi": -61, "batteryPercent": 40
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, fetched) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(fetched["calibratedRssi"], -61);
        assert_eq!(fetched["batteryPercent"], 40);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_rejects_bad_mac() {
        let app = test_app();
        let token = token(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/tags",
            Some(&token),
            Some(json!({ "code": "TAG-9", "mac": "zz:zz", "calibratedRssi": -60 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().starts_with("mac:"));
    }

    #[tokio::test]
    async fn test_update_missing_tag() {
        let app = test_app();
        let token = token(&app).await;

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/v1/tags/42",
            Some(&token),
            Some(json!({ "code": "TAG-42", "mac": "AA:BB:CC:DD:EE:42", "calibratedRssi": -60 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
