//! Single-unit checkout.
//!
//! An attempt moves `Requested -> Validated -> Committed`, or ends `Rejected`.
//! Validation and commit share one transaction: the listing row is read under
//! an exclusive lock, and the `available -> sold` flip is a compare-and-swap, so
//! of any number of concurrent attempts on one listing exactly one commits.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::purchases::CheckoutRequest,
    entity::{
        cart_items::{Column as ItemCol, Entity as CartItems},
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel, ProductStatus,
        },
        purchases::{ActiveModel as PurchaseActive, Model as PurchaseModel, PurchaseStatus},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Purchase,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Requested,
    Validated,
    Committed,
    Rejected,
}

impl CheckoutStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStage::Requested => "requested",
            CheckoutStage::Validated => "validated",
            CheckoutStage::Committed => "committed",
            CheckoutStage::Rejected => "rejected",
        }
    }
}

/// A buyer's request for one listing, not yet checked against the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutAttempt {
    pub buyer_id: Uuid,
    pub product_id: Uuid,
}

/// An attempt that passed validation. Seller and price are the values read
/// inside the checkout transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedCheckout {
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub price: i64,
}

impl CheckoutAttempt {
    pub fn new(buyer_id: Uuid, product_id: Uuid) -> Self {
        Self {
            buyer_id,
            product_id,
        }
    }

    /// Self-purchase is rejected before availability is considered.
    pub fn validate(self, product: Option<&ProductModel>) -> AppResult<ValidatedCheckout> {
        let product = product.ok_or_else(|| AppError::not_found("Product not found"))?;

        if product.seller_id == self.buyer_id {
            return Err(AppError::forbidden("You cannot purchase your own product"));
        }
        if product.status != ProductStatus::Available {
            return Err(AppError::invalid_state(
                "Product is not available for purchase",
            ));
        }

        Ok(ValidatedCheckout {
            buyer_id: self.buyer_id,
            seller_id: product.seller_id,
            product_id: product.id,
            price: product.price,
        })
    }
}

impl ValidatedCheckout {
    /// Applies every effect of the purchase on `txn`. The caller commits; any
    /// error leaves the transaction to roll back as a whole.
    pub async fn commit<C: ConnectionTrait>(self, txn: &C) -> AppResult<PurchaseModel> {
        let now = Utc::now();

        let flipped = Products::update_many()
            .set(ProductActive {
                status: Set(ProductStatus::Sold),
                updated_at: Set(now.into()),
                ..Default::default()
            })
            .filter(ProdCol::Id.eq(self.product_id))
            .filter(ProdCol::Status.eq(ProductStatus::Available))
            .exec(txn)
            .await?;
        if flipped.rows_affected != 1 {
            return Err(AppError::invalid_state(
                "Product is not available for purchase",
            ));
        }

        let purchase = PurchaseActive {
            id: Set(Uuid::new_v4()),
            buyer_id: Set(self.buyer_id),
            seller_id: Set(self.seller_id),
            product_id: Set(self.product_id),
            price: Set(self.price),
            purchased_at: Set(now.into()),
            status: Set(PurchaseStatus::Completed),
        }
        .insert(txn)
        .await?;

        // A sold listing leaves every cart, the buyer's included.
        let evicted = CartItems::delete_many()
            .filter(ItemCol::ProductId.eq(self.product_id))
            .exec(txn)
            .await?
            .rows_affected;
        tracing::debug!(product_id = %self.product_id, evicted, "cart lines evicted");

        Ok(purchase)
    }
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<Purchase>> {
    let attempt = CheckoutAttempt::new(user.user_id, payload.product_id);
    tracing::debug!(
        buyer_id = %attempt.buyer_id,
        product_id = %attempt.product_id,
        stage = CheckoutStage::Requested.as_str(),
        "checkout"
    );

    let purchase = match run(state, attempt).await {
        Ok(purchase) => purchase,
        Err(err) => {
            tracing::info!(
                buyer_id = %attempt.buyer_id,
                product_id = %attempt.product_id,
                stage = CheckoutStage::Rejected.as_str(),
                reason = %err,
                "checkout"
            );
            return Err(err);
        }
    };

    tracing::info!(
        purchase_id = %purchase.id,
        buyer_id = %purchase.buyer_id,
        seller_id = %purchase.seller_id,
        product_id = %purchase.product_id,
        stage = CheckoutStage::Committed.as_str(),
        "checkout"
    );

    audit::record(
        &state.orm,
        user.user_id,
        "checkout",
        "purchases",
        serde_json::json!({ "purchase_id": purchase.id, "product_id": purchase.product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Purchase completed",
        Purchase::from(purchase),
        Some(Meta::empty()),
    ))
}

async fn run(state: &AppState, attempt: CheckoutAttempt) -> AppResult<PurchaseModel> {
    let txn = state.orm.begin().await?;

    let outcome = async {
        let product = Products::find_by_id(attempt.product_id)
            .lock_exclusive()
            .one(&txn)
            .await?;

        let validated = attempt.validate(product.as_ref())?;
        tracing::debug!(
            product_id = %validated.product_id,
            stage = CheckoutStage::Validated.as_str(),
            "checkout"
        );

        validated.commit(&txn).await
    }
    .await;

    match outcome {
        Ok(purchase) => {
            txn.commit().await?;
            Ok(purchase)
        }
        Err(err) => {
            // The rejection is what the caller needs; a failed rollback is only logged.
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "checkout rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::entity::products::Category;

    fn listing(seller_id: Uuid, status: ProductStatus) -> ProductModel {
        let now = Utc::now().into();
        ProductModel {
            id: Uuid::new_v4(),
            title: "Road bike".into(),
            description: "Aluminium frame, 54cm".into(),
            category: Category::Sports,
            price: 1_250_000,
            images: serde_json::json!([]),
            seller_id,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_listing_is_not_found() {
        let attempt = CheckoutAttempt::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(matches!(attempt.validate(None), Err(AppError::NotFound(_))));
    }

    #[test]
    fn validated_checkout_captures_seller_and_price() {
        let seller = Uuid::new_v4();
        let buyer = Uuid::new_v4();
        let product = listing(seller, ProductStatus::Available);

        let validated = CheckoutAttempt::new(buyer, product.id)
            .validate(Some(&product))
            .unwrap();
        assert_eq!(validated.seller_id, seller);
        assert_eq!(validated.buyer_id, buyer);
        assert_eq!(validated.price, 1_250_000);
    }

    #[test]
    fn own_listing_is_forbidden_whatever_its_status() {
        let seller = Uuid::new_v4();
        for status in [
            ProductStatus::Available,
            ProductStatus::Reserved,
            ProductStatus::Sold,
        ] {
            let product = listing(seller, status);
            let result = CheckoutAttempt::new(seller, product.id).validate(Some(&product));
            assert!(matches!(result, Err(AppError::Forbidden(_))), "{status:?}");
        }
    }

    #[test]
    fn reserved_and_sold_listings_are_invalid_state() {
        for status in [ProductStatus::Reserved, ProductStatus::Sold] {
            let product = listing(Uuid::new_v4(), status);
            let result = CheckoutAttempt::new(Uuid::new_v4(), product.id).validate(Some(&product));
            assert!(matches!(result, Err(AppError::InvalidState(_))), "{status:?}");
        }
    }
}
