use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::products::{Category, ProductStatus},
    error::{AppError, AppResult},
    models::Product,
};

const TITLE_LEN: (usize, usize) = (3, 100);
const DESCRIPTION_LEN: (usize, usize) = (10, 1000);
const MAX_IMAGES: usize = 5;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> AppResult<()> {
        check_len("title", &self.title, TITLE_LEN)?;
        check_len("description", &self.description, DESCRIPTION_LEN)?;
        check_images(&self.images)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            check_len("title", title, TITLE_LEN)?;
        }
        if let Some(description) = &self.description {
            check_len("description", description, DESCRIPTION_LEN)?;
        }
        if let Some(images) = &self.images {
            check_images(images)?;
        }
        if self.status == Some(ProductStatus::Sold) {
            return Err(AppError::invalid_input(
                "status can only become sold through checkout",
            ));
        }
        Ok(())
    }
}

fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> AppResult<()> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::invalid_input(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn check_images(images: &[String]) -> AppResult<()> {
    if images.len() > MAX_IMAGES {
        return Err(AppError::invalid_input(format!(
            "Maximum {MAX_IMAGES} images allowed"
        )));
    }
    if images.iter().any(|url| url.trim().is_empty()) {
        return Err(AppError::invalid_input("image references must not be empty"));
    }
    Ok(())
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
