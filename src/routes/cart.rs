use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::cart::{CartView, SetCartItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::CartItem,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart))
        .route("/items", post(set_cart_item))
        .route("/items/{product_id}", delete(remove_cart_item))
}

#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Cart lines of the current user", body = ApiResponse<CartView>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(cart_service::view_cart(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = SetCartItemRequest,
    responses(
        (status = 200, description = "Add or update cart line", body = ApiResponse<CartItem>),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Insufficient stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn set_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SetCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    Ok(Json(cart_service::add_to_cart(&state, &user, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "OK", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(cart_service::remove_item(&state, &user, product_id).await?))
}
