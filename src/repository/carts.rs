use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
    },
    error::{AppError, AppResult},
};

pub struct CartRepo<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> CartRepo<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<CartModel>> {
        let cart = Carts::find()
            .filter(CartCol::UserId.eq(user_id))
            .one(self.conn)
            .await?;
        Ok(cart)
    }

    /// Carts are created lazily; concurrent first writes for the same user collapse
    /// onto the unique `user_id`.
    pub async fn get_or_create_for_user(&self, user_id: Uuid) -> AppResult<CartModel> {
        if let Some(cart) = self.find_by_user(user_id).await? {
            return Ok(cart);
        }

        Carts::insert(CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(Some(user_id)),
            created_at: NotSet,
            updated_at: NotSet,
        })
        .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
        .exec_without_returning(self.conn)
        .await?;

        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart for user {user_id} vanished")))
    }

    /// Current line items of a cart, ordered by product id.
    pub async fn items(&self, cart_id: Uuid) -> AppResult<Vec<CartItemModel>> {
        let items = CartItems::find()
            .filter(CartItemCol::CartId.eq(cart_id))
            .order_by_asc(CartItemCol::ProductId)
            .all(self.conn)
            .await?;
        Ok(items)
    }

    /// Insert or overwrite the quantity of one product line. Callers must have
    /// validated `quantity` against a locked stock read.
    pub async fn upsert_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartItemModel> {
        let item = CartItems::insert(CartItemActive {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            created_at: NotSet,
        })
        .on_conflict(
            OnConflict::columns([CartItemCol::CartId, CartItemCol::ProductId])
                .update_column(CartItemCol::Quantity)
                .to_owned(),
        )
        .exec_with_returning(self.conn)
        .await?;

        self.touch(cart_id).await?;
        Ok(item)
    }

    pub async fn remove_item(&self, cart_id: Uuid, product_id: Uuid) -> AppResult<u64> {
        let result = CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart_id))
            .filter(CartItemCol::ProductId.eq(product_id))
            .exec(self.conn)
            .await?;
        if result.rows_affected > 0 {
            self.touch(cart_id).await?;
        }
        Ok(result.rows_affected)
    }

    /// Delete every line of the cart. The cart row itself stays.
    pub async fn clear(&self, cart_id: Uuid) -> AppResult<u64> {
        let result = CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart_id))
            .exec(self.conn)
            .await?;
        self.touch(cart_id).await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_anonymous_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = Carts::delete_many()
            .filter(CartCol::UserId.is_null())
            .filter(CartCol::UpdatedAt.lt(cutoff))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn touch(&self, cart_id: Uuid) -> AppResult<()> {
        Carts::update_many()
            .col_expr(CartCol::UpdatedAt, Expr::current_timestamp().into())
            .filter(CartCol::Id.eq(cart_id))
            .exec(self.conn)
            .await?;
        Ok(())
    }
}
