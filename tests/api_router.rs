mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{bearer_for, list_product, new_user, rupees, setup_state};
use ecofinds_api::routes::create_app;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn cart_requires_a_bearer_token() -> anyhow::Result<()> {
    let app = create_app(setup_state().await?);

    let response = app
        .oneshot(Request::get("/api/cart").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await?;
    assert_eq!(body["data"]["kind"], "unauthorized");
    Ok(())
}

#[tokio::test]
async fn add_then_view_over_http() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;
    let app = create_app(state);
    let auth = bearer_for(&buyer)?;

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/cart")
                .header(header::AUTHORIZATION, &auth)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "product_id": lamp.id, "quantity": 2 }).to_string(),
                ))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::get("/api/cart")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(body["data"]["items"][0]["quantity"], 2);
    assert_eq!(body["data"]["totals"]["total"], "1229.00");
    assert_eq!(body["data"]["totals"]["currency_symbol"], "₹");
    Ok(())
}

#[tokio::test]
async fn malformed_and_conflicting_requests_use_the_error_envelope() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;
    let app = create_app(state);

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/cart")
                .header(header::AUTHORIZATION, bearer_for(&new_user())?)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"product_id":"not-a-uuid"}"#))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await?["data"]["kind"], "invalid_input");

    let response = app
        .clone()
        .oneshot(
            Request::post("/api/purchases")
                .header(header::AUTHORIZATION, bearer_for(&seller)?)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "product_id": lamp.id }).to_string()))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await?["data"]["kind"], "forbidden");

    let buyer = bearer_for(&new_user())?;
    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/purchases")
                    .header(header::AUTHORIZATION, &buyer)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "product_id": lamp.id }).to_string()))?,
            )
            .await?;
        assert_eq!(response.status(), expected);
    }
    Ok(())
}

#[tokio::test]
async fn unknown_routes_return_json_404() -> anyhow::Result<()> {
    let app = create_app(setup_state().await?);

    let response = app
        .oneshot(Request::get("/api/nowhere").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await?["data"]["path"], "/api/nowhere");
    Ok(())
}
