use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Upper bound for a single cart line.
pub const MAX_QUANTITY: i32 = 10_000;

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateCartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

pub fn ensure_valid_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::invalid_input(
            "Quantity must be a positive integer",
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::invalid_input(format!(
            "Quantity must not exceed {MAX_QUANTITY}"
        )));
    }
    Ok(())
}
