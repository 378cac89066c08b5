//! HTTP handler functions for the unit map API.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::Value;
use unit_map_database::queries;
use unit_map_server_models::{
    ApiHealth, ApiUnit, BulkUpsertRequest, BulkUpsertResponse, CreateResponse, DeleteResponse,
    UpdateResponse,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/units`
///
/// Returns all units ascending by id.
pub async fn list_units(state: web::Data<AppState>) -> HttpResponse {
    match queries::list_units(state.db.as_ref()).await {
        Ok(rows) => {
            let units: Vec<ApiUnit> = rows.into_iter().map(ApiUnit::from).collect();
            HttpResponse::Ok().json(units)
        }
        Err(e) => {
            log::error!("Failed to list units: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to list units"
            }))
        }
    }
}

/// `POST /api/units`
///
/// Creates one unit from a JSON object of field values.
pub async fn create_unit(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> HttpResponse {
    if !authorized(&req, state.admin_token.as_deref()) {
        return unauthorized();
    }
    let Some(fields) = body.as_object() else {
        return bad_request("Request body must be a JSON object");
    };

    match queries::insert_unit(state.db.as_ref(), fields).await {
        Ok(id) => HttpResponse::Created().json(CreateResponse { id }),
        Err(e) => {
            log::error!("Failed to create unit: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to create unit"
            }))
        }
    }
}

/// `PUT /api/units/{id}`
///
/// Patches the supplied fields of one unit. Unknown fields are ignored;
/// a patch that matches no row reports zero updates.
pub async fn update_unit(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> HttpResponse {
    if !authorized(&req, state.admin_token.as_deref()) {
        return unauthorized();
    }
    let Some(patch) = body.as_object() else {
        return bad_request("Request body must be a JSON object");
    };

    match queries::update_unit(state.db.as_ref(), path.into_inner(), patch).await {
        Ok(updated) => HttpResponse::Ok().json(UpdateResponse { updated }),
        Err(e) => {
            log::error!("Failed to update unit: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to update unit"
            }))
        }
    }
}

/// `DELETE /api/units/{id}`
pub async fn delete_unit(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> HttpResponse {
    if !authorized(&req, state.admin_token.as_deref()) {
        return unauthorized();
    }

    match queries::delete_unit(state.db.as_ref(), path.into_inner()).await {
        Ok(deleted) => HttpResponse::Ok().json(DeleteResponse { deleted }),
        Err(e) => {
            log::error!("Failed to delete unit: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to delete unit"
            }))
        }
    }
}

/// `POST /api/units/bulk`
///
/// Applies a batch of edits keyed by id: insert-if-absent, else patch.
/// Entries without a usable id are skipped, not fatal.
pub async fn bulk_upsert(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<BulkUpsertRequest>,
) -> HttpResponse {
    if !authorized(&req, state.admin_token.as_deref()) {
        return unauthorized();
    }

    match queries::bulk_upsert(state.db.as_ref(), &body.edits).await {
        Ok(updated) => HttpResponse::Ok().json(BulkUpsertResponse { ok: true, updated }),
        Err(e) => {
            log::error!("Failed to apply bulk upsert: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to apply bulk upsert"
            }))
        }
    }
}

/// Whether the request may hit a write endpoint. With no token
/// configured, writes are open; otherwise the `Authorization` header
/// must carry exactly `Bearer <token>`.
fn authorized(req: &HttpRequest, token: Option<&str>) -> bool {
    let Some(token) = token else {
        return true;
    };
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| presented.trim() == token)
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "error": "Missing or invalid admin token"
    }))
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}
