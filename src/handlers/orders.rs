use axum::{extract::State, response::Json};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{product, sale};
use crate::errors::{ContextualError, ErrorResponse, ServiceError};
use crate::handlers::common::lax_i32;
use crate::services::PlaceOrderRequest;
use crate::AppState;

/// Success message of `POST /add-order`
pub const ORDER_ADDED: &str = "order added";

const ADD_ORDER_CONTEXT: &str = "ERROR IN ADD ORDER";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub subcategory: Option<String>,
    /// List price, 0 when the catalog has none
    pub price: f64,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.prod_id,
            name: model.prod_name,
            description: model.prod_desc,
            subcategory: model.prod_subcategory,
            price: model
                .prod_list_price
                .and_then(|price| price.to_f64())
                .unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleResponse {
    pub prod_id: i32,
    pub cust_id: i32,
    /// Calendar date, `YYYY-MM-DD`
    #[schema(example = "2024-03-31")]
    pub time_id: String,
    pub quantity: i32,
    pub amount: f64,
}

impl From<sale::Model> for SaleResponse {
    fn from(model: sale::Model) -> Self {
        Self {
            prod_id: model.prod_id,
            cust_id: model.cust_id,
            time_id: model.time_id.format("%Y-%m-%d").to_string(),
            quantity: model.quantity_sold,
            amount: model.amount_sold.to_f64().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddOrderRequest {
    #[serde(deserialize_with = "lax_i32")]
    pub product_id: i32,
    #[serde(deserialize_with = "lax_i32")]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddOrderResponse {
    #[schema(example = "order added")]
    pub status: String,
}

/// List all products sorted by name
#[utoipa::path(
    get,
    path = "/products",
    tag = "orders",
    responses(
        (status = 200, description = "Products sorted by name", body = Vec<ProductResponse>),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, ServiceError> {
    let products = state.orders.list_products().await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// List the most recent sales
#[utoipa::path(
    get,
    path = "/sales",
    tag = "orders",
    responses(
        (status = 200, description = "Up to 50 sales, newest first", body = Vec<SaleResponse>),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn list_sales(
    State(state): State<AppState>,
) -> Result<Json<Vec<SaleResponse>>, ServiceError> {
    let sales = state.orders.recent_sales().await?;
    Ok(Json(sales.into_iter().map(SaleResponse::from).collect()))
}

/// Place an order for a product
#[utoipa::path(
    post,
    path = "/add-order",
    tag = "orders",
    request_body = AddOrderRequest,
    responses(
        (status = 200, description = "Order and sale recorded", body = AddOrderResponse),
        (status = 404, description = "Unknown product", body = ErrorResponse),
        (status = 422, description = "Malformed body"),
        (status = 500, description = "Store failure, nothing written", body = ErrorResponse)
    )
)]
pub async fn add_order(
    State(state): State<AppState>,
    Json(payload): Json<AddOrderRequest>,
) -> Result<Json<AddOrderResponse>, ContextualError> {
    let request = PlaceOrderRequest {
        product_id: payload.product_id,
        quantity: payload.quantity,
    };

    state
        .orders
        .place_order(request)
        .await
        .map_err(|e| e.in_context(ADD_ORDER_CONTEXT))?;

    Ok(Json(AddOrderResponse {
        status: ORDER_ADDED.to_string(),
    }))
}
