use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::AppResult,
    models::{OrderStatus, PaymentStatus},
    routes::params::SortOrder,
};

/// Everything needed to insert a fresh order row.
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Uuid,
    pub payment_method: String,
    pub payment_intent_id: String,
    pub shipping_address: serde_json::Value,
    pub billing_address: serde_json::Value,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping_cost: i64,
    pub discount: i64,
    pub total: i64,
}

pub struct NewOrderItem {
    pub order_id: i64,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    pub product_image: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
}

pub struct OrderRepo<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> OrderRepo<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Insert with `pending_payment` / `pending`.
    pub async fn insert(&self, new: NewOrder) -> AppResult<OrderModel> {
        let order = OrderActive {
            id: NotSet,
            order_number: Set(new.order_number),
            user_id: Set(new.user_id),
            status: Set(OrderStatus::PendingPayment.as_str().into()),
            payment_status: Set(PaymentStatus::Pending.as_str().into()),
            payment_method: Set(new.payment_method),
            payment_intent_id: Set(Some(new.payment_intent_id)),
            shipping_address: Set(new.shipping_address),
            billing_address: Set(new.billing_address),
            subtotal: Set(new.subtotal),
            tax: Set(new.tax),
            shipping_cost: Set(new.shipping_cost),
            discount: Set(new.discount),
            total: Set(new.total),
            tracking_number: Set(None),
            estimated_delivery_date: Set(None),
            paid_at: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(self.conn)
        .await?;
        Ok(order)
    }

    pub async fn insert_item(&self, item: NewOrderItem) -> AppResult<OrderItemModel> {
        let total_price = item.unit_price * i64::from(item.quantity);
        let item = OrderItemActive {
            id: NotSet,
            order_id: Set(item.order_id),
            product_id: Set(item.product_id),
            product_name: Set(item.product_name),
            product_sku: Set(item.product_sku),
            product_image: Set(item.product_image),
            unit_price: Set(item.unit_price),
            quantity: Set(item.quantity),
            total_price: Set(total_price),
            created_at: NotSet,
        }
        .insert(self.conn)
        .await?;
        Ok(item)
    }

    pub async fn find_for_user(&self, user_id: Uuid, id: i64) -> AppResult<Option<OrderModel>> {
        let order = Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::UserId.eq(user_id))
                    .add(OrderCol::Id.eq(id)),
            )
            .one(self.conn)
            .await?;
        Ok(order)
    }

    pub async fn lock(&self, id: i64) -> AppResult<Option<OrderModel>> {
        let order = Orders::find_by_id(id)
            .lock(LockType::Update)
            .one(self.conn)
            .await?;
        Ok(order)
    }

    pub async fn lock_by_payment_intent(&self, payment_intent_id: &str) -> AppResult<Option<OrderModel>> {
        let order = Orders::find()
            .filter(OrderCol::PaymentIntentId.eq(payment_intent_id))
            .lock(LockType::Update)
            .one(self.conn)
            .await?;
        Ok(order)
    }

    pub async fn items(&self, order_id: i64) -> AppResult<Vec<OrderItemModel>> {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::Id)
            .all(self.conn)
            .await?;
        Ok(items)
    }

    /// Persist a whole-object change built from a previously read row.
    pub async fn save(&self, order: OrderActive) -> AppResult<OrderModel> {
        Ok(order.update(self.conn).await?)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<OrderStatus>,
        sort_order: SortOrder,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<OrderModel>, u64)> {
        let mut condition = Condition::all().add(OrderCol::UserId.eq(user_id));
        if let Some(status) = status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }

        let mut finder = Orders::find().filter(condition);
        finder = match sort_order {
            SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
            SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
        };

        let total = finder.clone().count(self.conn).await?;
        let orders = finder.limit(limit).offset(offset).all(self.conn).await?;
        Ok((orders, total))
    }

    /// Ids of orders still awaiting payment that were created before `cutoff`.
    pub async fn pending_payment_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<i64>> {
        let ids = Orders::find()
            .select_only()
            .column(OrderCol::Id)
            .filter(OrderCol::Status.eq(OrderStatus::PendingPayment.as_str()))
            .filter(OrderCol::CreatedAt.lt(cutoff))
            .order_by_asc(OrderCol::Id)
            .into_tuple::<i64>()
            .all(self.conn)
            .await?;
        Ok(ids)
    }
}
