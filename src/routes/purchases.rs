use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::purchases::{CheckoutRequest, PurchaseList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Purchase, PurchaseRecord},
    response::{ApiResponse, AppJson},
    routes::params::Pagination,
    services::{checkout_service, purchase_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchases).post(checkout))
        .route("/sales", get(list_sales))
        .route("/{id}", get(get_purchase))
}

#[utoipa::path(
    post,
    path = "/api/purchases",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Purchase completed", body = ApiResponse<Purchase>),
        (status = 403, description = "Own listing"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product not available for purchase"),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Purchase>>)> {
    let resp = checkout_service::checkout(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/purchases",
    params(Pagination),
    responses(
        (status = 200, description = "Caller's purchases, newest first", body = ApiResponse<PurchaseList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PurchaseList>>> {
    let resp = purchase_service::list_purchases(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/purchases/sales",
    params(Pagination),
    responses(
        (status = 200, description = "Sales of the caller's listings, newest first", body = ApiResponse<PurchaseList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PurchaseList>>> {
    let resp = purchase_service::list_sales(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/purchases/{id}",
    params(
        ("id" = Uuid, Path, description = "Purchase ID")
    ),
    responses(
        (status = 200, description = "Ledger entry visible to its buyer or seller", body = ApiResponse<PurchaseRecord>),
        (status = 404, description = "Purchase not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchases"
)]
pub async fn get_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseRecord>>> {
    let resp = purchase_service::get_purchase(&state, &user, id).await?;
    Ok(Json(resp))
}
