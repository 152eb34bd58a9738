use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::{
    entity::products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
};

/// Stock ledger. `stock` must never go negative, so every decrement has to follow a
/// [`ProductRepo::lock`] of the same row inside the same transaction.
pub struct ProductRepo<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ProductRepo<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find(&self, id: Uuid) -> AppResult<Option<ProductModel>> {
        Ok(Products::find_by_id(id).one(self.conn).await?)
    }

    /// `SELECT ... FOR UPDATE`: the row stays locked until the transaction ends.
    pub async fn lock(&self, id: Uuid) -> AppResult<Option<ProductModel>> {
        let product = Products::find_by_id(id)
            .lock(LockType::Update)
            .one(self.conn)
            .await?;
        Ok(product)
    }

    /// Atomically add `delta` (negative to decrement) to the product's stock.
    pub async fn adjust_stock(&self, id: Uuid, delta: i32) -> AppResult<()> {
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(delta))
            .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
            .filter(ProdCol::Id.eq(id))
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            tracing::error!(product_id = %id, delta, "stock update hit no row");
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
