use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{
    dto::cart::{CartView, SetCartItemRequest},
    entity::cart_items::Model as CartItemModel,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    repository::{CartRepo, UnitOfWork},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Set one cart line to `quantity`, checked against a locked stock read.
pub async fn set_item_quantity(
    db: &DatabaseConnection,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartItemModel> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let uow = UnitOfWork::begin(db).await?;
    let product = uow
        .products()
        .lock(product_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("product not found".to_string()))?;
    if product.stock < quantity {
        return Err(AppError::InsufficientStock {
            product_id,
            available: product.stock,
            requested: quantity,
        });
    }

    let cart = uow.carts().get_or_create_for_user(user_id).await?;
    let item = uow.carts().upsert_item(cart.id, product_id, quantity).await?;
    uow.commit().await?;

    tracing::debug!(cart_id = %cart.id, %product_id, quantity, "cart line set");
    Ok(item)
}

pub async fn view_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let repo = CartRepo::new(&state.orm);
    let view = match repo.find_by_user(user.user_id).await? {
        Some(cart) => CartView {
            cart_id: Some(cart.id),
            items: repo.items(cart.id).await?.into_iter().map(Into::into).collect(),
        },
        None => CartView {
            cart_id: None,
            items: Vec::new(),
        },
    };
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: SetCartItemRequest,
) -> AppResult<ApiResponse<crate::models::CartItem>> {
    let item =
        set_item_quantity(&state.orm, user.user_id, payload.product_id, payload.quantity).await?;
    Ok(ApiResponse::success("OK", item.into(), None))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let repo = CartRepo::new(&state.orm);
    let cart = repo
        .find_by_user(user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if repo.remove_item(cart.id, product_id).await? == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
