use axum::extract::State;
use stockroom_api::{ApiResponse, ApiResult, Pagination, Paginated};

use super::{JsonBody, ProductId, QueryParams, read_message};
use crate::models::{
    CreateProductRequest, Product, ProductListParams, ProductQuery, UpdateProductRequest,
};
use crate::server::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ProductListParams>,
) -> ApiResult<Paginated<Product>> {
    let query = ProductQuery::from(params);
    let (page, status) = state.products.list(&query).await?;
    let message = read_message(
        status.is_hit(),
        "Products fetched from cache",
        "Products fetched successfully",
    );
    let pagination = Pagination::new(query.page.page, query.page.limit, page.total);
    Ok(ApiResponse::paginated(message, page.items, pagination).with_cache_status(status))
}

pub async fn get_product(
    State(state): State<AppState>,
    ProductId(id): ProductId,
) -> ApiResult<ApiResponse<Product>> {
    let (product, status) = state.products.get(&id).await?;
    let message = read_message(
        status.is_hit(),
        "Product details fetched from cache",
        "Product details fetched successfully",
    );
    Ok(ApiResponse::ok(message, product).with_cache_status(status))
}

pub async fn create_product(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateProductRequest>,
) -> ApiResult<ApiResponse<Product>> {
    request.validate()?;
    let product = state.products.create(request).await?;
    Ok(ApiResponse::created("Product created successfully", product))
}

pub async fn update_product(
    State(state): State<AppState>,
    ProductId(id): ProductId,
    JsonBody(request): JsonBody<UpdateProductRequest>,
) -> ApiResult<ApiResponse<Product>> {
    request.validate()?;
    let product = state.products.update(&id, &request).await?;
    Ok(ApiResponse::ok("Product updated successfully", product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    ProductId(id): ProductId,
) -> ApiResult<ApiResponse<()>> {
    state.products.delete(&id).await?;
    Ok(ApiResponse::message_only("Product successfully deleted"))
}
