mod common;

use common::{list_product, new_user, rupees, set_status, setup_state};
use ecofinds_api::{
    dto::{
        cart::{AddToCartRequest, MAX_QUANTITY, UpdateCartItemRequest},
        products::UpdateProductRequest,
    },
    entity::{cart_items::Entity as CartItems, products::ProductStatus},
    error::AppError,
    models::CartView,
    response::ApiResponse,
    services::{cart_service, product_service},
};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

fn view(resp: ApiResponse<CartView>) -> CartView {
    resp.data.expect("cart view")
}

fn add(product_id: Uuid, quantity: i32) -> AddToCartRequest {
    AddToCartRequest {
        product_id,
        quantity,
    }
}

#[tokio::test]
async fn first_view_creates_an_empty_cart() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let buyer = new_user();

    let first = view(cart_service::view_cart(&state, &buyer).await?);
    let second = view(cart_service::view_cart(&state, &buyer).await?);

    assert!(first.items.is_empty());
    assert_eq!(first.cart_id, second.cart_id);
    assert_eq!(first.totals.subtotal.to_string(), "0.00");
    assert_eq!(first.totals.shipping.to_string(), "0.00");
    assert_eq!(first.totals.total.to_string(), "0.00");
    Ok(())
}

#[tokio::test]
async fn repeated_add_merges_into_one_line() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;

    cart_service::add_item(&state, &buyer, add(lamp.id, 1)).await?;
    let cart = view(cart_service::add_item(&state, &buyer, add(lamp.id, 2)).await?);

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.quantity_of(lamp.id), Some(3));
    assert_eq!(CartItems::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn set_quantity_replaces_rather_than_adds() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;

    cart_service::add_item(&state, &buyer, add(lamp.id, 2)).await?;
    let cart = view(
        cart_service::set_quantity(
            &state,
            &buyer,
            UpdateCartItemRequest {
                product_id: lamp.id,
                quantity: 5,
            },
        )
        .await?,
    );

    assert_eq!(cart.quantity_of(lamp.id), Some(5));
    Ok(())
}

#[tokio::test]
async fn totals_apply_shipping_and_tax() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;

    let cart = view(cart_service::add_item(&state, &buyer, add(lamp.id, 2)).await?);

    assert_eq!(cart.totals.subtotal.to_string(), "1000.00");
    assert_eq!(cart.totals.shipping.to_string(), "49.00");
    assert_eq!(cart.totals.tax.to_string(), "180.00");
    assert_eq!(cart.totals.total.to_string(), "1229.00");
    assert_eq!(cart.totals.currency, "INR");
    assert_eq!(cart.items[0].line_total, Decimal::new(100_000, 2));
    Ok(())
}

#[tokio::test]
async fn totals_follow_live_price_edits() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;
    cart_service::add_item(&state, &buyer, add(lamp.id, 1)).await?;

    product_service::update_product(
        &state,
        &seller,
        lamp.id,
        UpdateProductRequest {
            price: Some(rupees(300)),
            ..Default::default()
        },
    )
    .await?;

    let cart = view(cart_service::view_cart(&state, &buyer).await?);
    assert_eq!(cart.totals.subtotal.to_string(), "300.00");
    assert_eq!(cart.totals.total.to_string(), "403.00");
    Ok(())
}

#[tokio::test]
async fn clear_is_idempotent() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;
    cart_service::add_item(&state, &buyer, add(lamp.id, 1)).await?;

    let once = view(cart_service::clear(&state, &buyer).await?);
    let twice = view(cart_service::clear(&state, &buyer).await?);

    assert!(once.items.is_empty());
    assert!(twice.items.is_empty());
    assert_eq!(twice.totals.total.to_string(), "0.00");

    // Clearing a cart that never existed succeeds too.
    let stranger = new_user();
    assert!(view(cart_service::clear(&state, &stranger).await?).items.is_empty());
    Ok(())
}

#[tokio::test]
async fn own_listing_cannot_be_added_whatever_its_status() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;

    let err = cart_service::add_item(&state, &seller, add(lamp.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    set_status(&state, &seller, lamp.id, ProductStatus::Reserved).await?;
    let err = cart_service::add_item(&state, &seller, add(lamp.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn add_rejects_bad_quantity_missing_and_unavailable_listings() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;

    let err = cart_service::add_item(&state, &buyer, add(lamp.id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = cart_service::add_item(&state, &buyer, add(Uuid::new_v4(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    set_status(&state, &seller, lamp.id, ProductStatus::Reserved).await?;
    let err = cart_service::add_item(&state, &buyer, add(lamp.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    assert_eq!(CartItems::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn set_quantity_and_remove_need_an_existing_line() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;

    let err = cart_service::set_quantity(
        &state,
        &buyer,
        UpdateCartItemRequest {
            product_id: lamp.id,
            quantity: 2,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = cart_service::remove_item(&state, &buyer, lamp.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Cart exists now, the line still does not.
    cart_service::view_cart(&state, &buyer).await?;
    let err = cart_service::remove_item(&state, &buyer, lamp.id)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Product not found in cart");
    Ok(())
}

#[tokio::test]
async fn remove_drops_only_that_line() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;
    let kettle = list_product(&state, &seller, "Steel kettle", rupees(200)).await?;
    cart_service::add_item(&state, &buyer, add(lamp.id, 1)).await?;
    cart_service::add_item(&state, &buyer, add(kettle.id, 1)).await?;

    let cart = view(cart_service::remove_item(&state, &buyer, lamp.id).await?);

    assert_eq!(cart.quantity_of(lamp.id), None);
    assert_eq!(cart.quantity_of(kettle.id), Some(1));
    Ok(())
}

#[tokio::test]
async fn unavailable_lines_are_pruned_from_storage() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;
    let kettle = list_product(&state, &seller, "Steel kettle", rupees(200)).await?;
    cart_service::add_item(&state, &buyer, add(lamp.id, 1)).await?;
    cart_service::add_item(&state, &buyer, add(kettle.id, 1)).await?;

    set_status(&state, &seller, lamp.id, ProductStatus::Reserved).await?;
    product_service::delete_product(&state, &seller, kettle.id).await?;

    let cart = view(cart_service::view_cart(&state, &buyer).await?);
    assert!(cart.items.is_empty());
    assert_eq!(cart.totals.total.to_string(), "0.00");
    assert_eq!(CartItems::find().count(&state.orm).await?, 0);

    // Relisting does not bring the pruned line back.
    set_status(&state, &seller, lamp.id, ProductStatus::Available).await?;
    let cart = view(cart_service::view_cart(&state, &buyer).await?);
    assert!(cart.items.is_empty());
    Ok(())
}

// Single-connection pool: the adds are serialized by the pool, not raced.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_accumulate() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp_id = list_product(&state, &seller, "Brass desk lamp", rupees(500))
        .await?
        .id;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            cart_service::add_item(&state, &buyer, add(lamp_id, 1)).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let cart = view(cart_service::view_cart(&state, &buyer).await?);
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.quantity_of(lamp_id), Some(6));
    Ok(())
}

#[tokio::test]
async fn merged_quantity_is_capped() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let seller = new_user();
    let buyer = new_user();
    let lamp = list_product(&state, &seller, "Brass desk lamp", rupees(500)).await?;

    cart_service::add_item(&state, &buyer, add(lamp.id, MAX_QUANTITY)).await?;
    let err = cart_service::add_item(&state, &buyer, add(lamp.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = cart_service::add_item(&state, &buyer, add(lamp.id, i32::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let cart = view(cart_service::view_cart(&state, &buyer).await?);
    assert_eq!(cart.quantity_of(lamp.id), Some(MAX_QUANTITY));
    Ok(())
}
