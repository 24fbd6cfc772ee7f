#![allow(dead_code)]

use ecofinds_api::{
    db::{create_orm_conn, run_migrations},
    dto::products::{CreateProductRequest, UpdateProductRequest},
    entity::products::{Category, ProductStatus},
    middleware::auth::{AuthUser, Claims},
    models::Product,
    pricing::PricingPolicy,
    services::product_service,
    state::AppState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use rust_decimal::Decimal;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret";

/// Fresh in-memory database with the schema applied. A single pooled
/// connection keeps every test on the same database.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let orm = create_orm_conn("sqlite::memory:", 1).await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(orm, PricingPolicy::default(), TEST_SECRET))
}

pub fn new_user() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
    }
}

pub fn rupees(value: i64) -> Decimal {
    Decimal::new(value * 100, 2)
}

pub async fn list_product(
    state: &AppState,
    seller: &AuthUser,
    title: &str,
    price: Decimal,
) -> anyhow::Result<Product> {
    let resp = product_service::create_product(
        state,
        seller,
        CreateProductRequest {
            title: title.to_string(),
            description: format!("{title} in good condition, pickup only."),
            category: Category::Electronics,
            price,
            images: vec![],
        },
    )
    .await?;
    resp.data
        .ok_or_else(|| anyhow::anyhow!("create_product returned no data"))
}

pub async fn set_status(
    state: &AppState,
    seller: &AuthUser,
    product_id: Uuid,
    status: ProductStatus,
) -> anyhow::Result<()> {
    product_service::update_product(
        state,
        seller,
        product_id,
        UpdateProductRequest {
            status: Some(status),
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

pub fn bearer_for(user: &AuthUser) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )?;
    Ok(format!("Bearer {token}"))
}
