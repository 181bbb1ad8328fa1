use axum::response::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sales Order API",
        description = "Product catalog, recent sales feed and order placement over a sales-history store"
    ),
    tags(
        (name = "orders", description = "Catalog, sales and order placement"),
        (name = "health", description = "Liveness and readiness probes")
    ),
    paths(
        crate::handlers::health::ping,
        crate::handlers::health::readiness_check,
        crate::handlers::orders::list_products,
        crate::handlers::orders::list_sales,
        crate::handlers::orders::add_order,
    ),
    components(
        schemas(
            crate::handlers::health::PingResponse,
            crate::handlers::orders::ProductResponse,
            crate::handlers::orders::SaleResponse,
            crate::handlers::orders::AddOrderRequest,
            crate::handlers::orders::AddOrderResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
