use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{
        cart_items::Model as CartItemModel,
        products::{Category, Model as ProductModel, ProductStatus},
        purchases::{Model as PurchaseModel, PurchaseStatus},
    },
    pricing::{CartTotals, from_minor_units},
};

pub const PLACEHOLDER_TITLE: &str = "Product No Longer Available";
pub const PLACEHOLDER_DESCRIPTION: &str = "This product is no longer available";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: Decimal,
    pub images: Vec<String>,
    pub seller_id: Uuid,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductModel> for Product {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            images: images_from_json(&model.images),
            title: model.title,
            description: model.description,
            category: model.category,
            price: from_minor_units(model.price),
            seller_id: model.seller_id,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

pub(crate) fn images_from_json(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Cart line joined with the live listing it points at.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartLine {
    pub product: Product,
    pub quantity: i32,
    pub line_total: Decimal,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn new(item: CartItemModel, product: Product) -> Self {
        Self {
            line_total: product.price * Decimal::from(item.quantity),
            product,
            quantity: item.quantity,
            added_at: item.added_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartView {
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
    pub totals: CartTotals,
    pub updated_at: DateTime<Utc>,
}

impl CartView {
    pub fn quantity_of(&self, product_id: Uuid) -> Option<i32> {
        self.items
            .iter()
            .find(|line| line.product.id == product_id)
            .map(|line| line.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Purchase {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub price: Decimal,
    pub purchased_at: DateTime<Utc>,
    pub status: PurchaseStatus,
}

impl From<PurchaseModel> for Purchase {
    fn from(model: PurchaseModel) -> Self {
        Self {
            id: model.id,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            product_id: model.product_id,
            price: from_minor_units(model.price),
            purchased_at: model.purchased_at.with_timezone(&Utc),
            status: model.status,
        }
    }
}

/// Listing state as shown in purchase history. `Unavailable` marks a listing
/// that has since been deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ListingState {
    Available,
    Reserved,
    Sold,
    Unavailable,
}

impl From<ProductStatus> for ListingState {
    fn from(status: ProductStatus) -> Self {
        match status {
            ProductStatus::Available => ListingState::Available,
            ProductStatus::Reserved => ListingState::Reserved,
            ProductStatus::Sold => ListingState::Sold,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductSnapshot {
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: Decimal,
    pub images: Vec<String>,
    pub status: ListingState,
    pub created_at: Option<DateTime<Utc>>,
}

impl ProductSnapshot {
    /// Stand-in for a listing that was deleted after it was bought.
    pub fn placeholder(ledger_price: Decimal) -> Self {
        Self {
            id: None,
            title: PLACEHOLDER_TITLE.to_string(),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
            category: Category::Other,
            price: ledger_price,
            images: Vec::new(),
            status: ListingState::Unavailable,
            created_at: None,
        }
    }
}

impl From<Product> for ProductSnapshot {
    fn from(product: Product) -> Self {
        Self {
            id: Some(product.id),
            title: product.title,
            description: product.description,
            category: product.category,
            price: product.price,
            images: product.images,
            status: product.status.into(),
            created_at: Some(product.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseRecord {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub product: ProductSnapshot,
}
