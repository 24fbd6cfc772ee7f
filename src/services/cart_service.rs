use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::OnConflict;
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, UpdateCartItemRequest, ensure_valid_quantity},
    entity::{
        cart_items::{ActiveModel as CartItemActive, Column as ItemCol, Entity as CartItems},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel, ProductStatus},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartLine, CartView, Product},
    pricing::{PricedLine, PricingPolicy, compute_totals},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Returns the user's cart, creating an empty one on first access.
pub async fn get_or_create_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartModel> {
    if let Some(cart) = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?
    {
        return Ok(cart);
    }

    let now = Utc::now();
    // Two first requests can race here; the unique user_id makes the loser a no-op.
    Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    })
    .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;

    Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart missing after insert")))
}

/// Cart row locked for the rest of the transaction, created if absent.
async fn lock_cart<C: ConnectionTrait>(txn: &C, user_id: Uuid) -> AppResult<CartModel> {
    let cart = get_or_create_cart(txn, user_id).await?;
    Carts::find_by_id(cart.id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart {} disappeared", cart.id)))
}

/// Cart row locked for the rest of the transaction; `NotFound` if the user never had one.
async fn lock_existing_cart<C: ConnectionTrait>(txn: &C, user_id: Uuid) -> AppResult<CartModel> {
    Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("Cart not found"))
}

async fn touch<C: ConnectionTrait>(txn: &C, cart: CartModel) -> AppResult<()> {
    let mut active: CartActive = cart.into();
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await?;
    Ok(())
}

async fn find_line<C: ConnectionTrait>(
    txn: &C,
    cart_id: Uuid,
    product_id: Uuid,
) -> AppResult<crate::entity::cart_items::Model> {
    CartItems::find()
        .filter(ItemCol::CartId.eq(cart_id))
        .filter(ItemCol::ProductId.eq(product_id))
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found in cart"))
}

/// Loads the cart with live prices. Lines whose listing is gone or no longer
/// available are deleted from storage, not just hidden.
pub async fn load_view(
    db: &DatabaseConnection,
    pricing: &PricingPolicy,
    user_id: Uuid,
) -> AppResult<CartView> {
    let txn = db.begin().await?;
    let cart = lock_cart(&txn, user_id).await?;

    let items = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .order_by_asc(ItemCol::AddedAt)
        .order_by_asc(ItemCol::Id)
        .all(&txn)
        .await?;

    let products = fetch_products(&txn, items.iter().map(|item| item.product_id)).await?;

    let (live, stale): (Vec<_>, Vec<_>) = items.into_iter().partition(|item| {
        products
            .get(&item.product_id)
            .is_some_and(|product| product.status == ProductStatus::Available)
    });

    if !stale.is_empty() {
        let stale_ids: Vec<Uuid> = stale.iter().map(|item| item.id).collect();
        CartItems::delete_many()
            .filter(ItemCol::Id.is_in(stale_ids))
            .exec(&txn)
            .await?;
        tracing::debug!(
            cart_id = %cart.id,
            pruned = stale.len(),
            "pruned unavailable cart lines"
        );
    }
    txn.commit().await?;

    let lines: Vec<CartLine> = live
        .into_iter()
        .filter_map(|item| {
            let product = products.get(&item.product_id)?.clone();
            Some(CartLine::new(item, Product::from(product)))
        })
        .collect();

    let priced: Vec<PricedLine> = lines
        .iter()
        .map(|line| PricedLine::resolved(line.product.price, line.quantity))
        .collect();

    Ok(CartView {
        cart_id: cart.id,
        user_id,
        totals: compute_totals(&priced, pricing),
        items: lines,
        updated_at: cart.updated_at.with_timezone(&Utc),
    })
}

/// Batch lookup of listings by id; missing ids are simply absent from the map.
pub async fn fetch_products<C, I>(conn: &C, ids: I) -> AppResult<HashMap<Uuid, ProductModel>>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = Uuid>,
{
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect())
}

pub async fn view_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let view = load_view(&state.orm, &state.pricing, user.user_id).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_valid_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    if product.seller_id == user.user_id {
        return Err(AppError::forbidden(
            "You cannot add your own product to cart",
        ));
    }
    if product.status != ProductStatus::Available {
        return Err(AppError::invalid_state("Product is not available"));
    }

    let cart = lock_cart(&txn, user.user_id).await?;

    let existing = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .filter(ItemCol::ProductId.eq(product.id))
        .one(&txn)
        .await?;

    match existing {
        Some(item) => {
            let quantity = item.quantity.saturating_add(payload.quantity);
            ensure_valid_quantity(quantity)?;
            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            active.update(&txn).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(payload.quantity),
                added_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
        }
    }

    touch(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    view_cart(state, user).await
}

pub async fn set_quantity(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_valid_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    let cart = lock_existing_cart(&txn, user.user_id).await?;
    let item = find_line(&txn, cart.id, payload.product_id).await?;

    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    active.update(&txn).await?;

    touch(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "cart_set_quantity",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    view_cart(state, user).await
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let cart = lock_existing_cart(&txn, user.user_id).await?;
    let item = find_line(&txn, cart.id, product_id).await?;

    CartItems::delete_by_id(item.id).exec(&txn).await?;

    touch(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    let view = load_view(&state.orm, &state.pricing, user.user_id).await?;
    Ok(ApiResponse::success("Removed from cart", view, Some(Meta::empty())))
}

pub async fn clear(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let cart = lock_cart(&txn, user.user_id).await?;

    let removed = CartItems::delete_many()
        .filter(ItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?
        .rows_affected;

    touch(&txn, cart).await?;
    txn.commit().await?;

    if removed > 0 {
        audit::record(
            &state.orm,
            user.user_id,
            "cart_clear",
            "cart_items",
            serde_json::json!({ "removed": removed }),
        )
        .await;
    }

    let view = load_view(&state.orm, &state.pricing, user.user_id).await?;
    Ok(ApiResponse::success("Cart cleared", view, Some(Meta::empty())))
}
