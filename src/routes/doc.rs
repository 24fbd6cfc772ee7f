use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, UpdateCartItemRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        purchases::{CheckoutRequest, PurchaseList},
    },
    entity::{
        products::{Category, ProductStatus},
        purchases::PurchaseStatus,
    },
    error::{ErrorData, ErrorKind},
    models::{CartLine, CartView, ListingState, Product, ProductSnapshot, Purchase, PurchaseRecord},
    pricing::CartTotals,
    response::{ApiResponse, Meta},
    routes::{cart, health, params, products, purchases},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        products::list_products,
        products::list_my_listings,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::view_cart,
        cart::add_to_cart,
        cart::update_quantity,
        cart::clear_cart,
        cart::remove_from_cart,
        purchases::checkout,
        purchases::list_purchases,
        purchases::list_sales,
        purchases::get_purchase
    ),
    components(
        schemas(
            Product,
            Category,
            ProductStatus,
            PurchaseStatus,
            ListingState,
            CartLine,
            CartView,
            CartTotals,
            Purchase,
            PurchaseRecord,
            ProductSnapshot,
            CreateProductRequest,
            UpdateProductRequest,
            AddToCartRequest,
            UpdateCartItemRequest,
            CheckoutRequest,
            ProductList,
            PurchaseList,
            ErrorData,
            ErrorKind,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<Purchase>,
            ApiResponse<PurchaseList>,
            ApiResponse<ErrorData>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Products", description = "Listing endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Purchases", description = "Checkout and purchase history endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
