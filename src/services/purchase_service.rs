use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::purchases::PurchaseList,
    entity::purchases::{Column as PurchaseCol, Entity as Purchases, Model as PurchaseModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, ProductSnapshot, Purchase, PurchaseRecord},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::cart_service::fetch_products,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Buyer,
    Seller,
}

impl Side {
    fn column(self) -> PurchaseCol {
        match self {
            Side::Buyer => PurchaseCol::BuyerId,
            Side::Seller => PurchaseCol::SellerId,
        }
    }
}

/// Purchases the caller made, newest first.
pub async fn list_purchases(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<PurchaseList>> {
    list_ledger(state, user, Side::Buyer, pagination).await
}

/// Purchases of the caller's listings, newest first.
pub async fn list_sales(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<PurchaseList>> {
    list_ledger(state, user, Side::Seller, pagination).await
}

pub async fn get_purchase(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<PurchaseRecord>> {
    let purchase = Purchases::find_by_id(id)
        .filter(
            Condition::any()
                .add(PurchaseCol::BuyerId.eq(user.user_id))
                .add(PurchaseCol::SellerId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Purchase not found"))?;

    let record = enrich(&state.orm, vec![purchase])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("enrichment dropped a purchase")))?;

    Ok(ApiResponse::success("OK", record, Some(Meta::empty())))
}

async fn list_ledger(
    state: &AppState,
    user: &AuthUser,
    side: Side,
    pagination: Pagination,
) -> AppResult<ApiResponse<PurchaseList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Purchases::find()
        .filter(side.column().eq(user.user_id))
        .order_by_desc(PurchaseCol::PurchasedAt)
        .order_by_desc(PurchaseCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let entries = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = enrich(&state.orm, entries).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", PurchaseList { items }, Some(meta)))
}

/// Joins ledger entries with their listings in one batched lookup. A listing
/// deleted since the sale is replaced by a placeholder carrying the ledger price.
pub async fn enrich<C: ConnectionTrait>(
    conn: &C,
    entries: Vec<PurchaseModel>,
) -> AppResult<Vec<PurchaseRecord>> {
    let products = fetch_products(conn, entries.iter().map(|entry| entry.product_id)).await?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let purchase = Purchase::from(entry);
            let product = match products.get(&purchase.product_id) {
                Some(model) => ProductSnapshot::from(Product::from(model.clone())),
                None => ProductSnapshot::placeholder(purchase.price),
            };
            PurchaseRecord { purchase, product }
        })
        .collect())
}
