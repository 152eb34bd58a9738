use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{
        CreateOrderRequest, CreateOrderResponse, OrderList, OrderStatusReceipt, OrderWithItems,
        UpdateOrderStatusRequest,
    },
    entity::{
        order_items::Model as OrderItemModel,
        orders::{ActiveModel as OrderActive, Model as OrderModel},
        products::Model as ProductModel,
    },
    error::{AppError, AppResult},
    events::{OrderCreatedEvent, OrderEventItem, enqueue_task},
    middleware::auth::AuthUser,
    models::{AddressSnapshot, OrderStatus, PaymentStatus},
    payments::{PaymentGateway, PaymentIntent, PaymentIntentRequest},
    repository::{CartRepo, NewOrder, NewOrderItem, OrderRepo, UnitOfWork, UserRepo},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Monetary breakdown of an order, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub tax: i64,
    pub shipping_cost: i64,
    pub discount: i64,
    pub total: i64,
}

impl OrderTotals {
    // TODO: tax and shipping are zero until a rate provider is wired in.
    pub fn from_subtotal(subtotal: i64) -> Self {
        let (tax, shipping_cost, discount) = (0, 0, 0);
        Self {
            subtotal,
            tax,
            shipping_cost,
            discount,
            total: subtotal + tax + shipping_cost - discount,
        }
    }
}

/// Result of a committed order creation.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    pub payment_intent: PaymentIntent,
}

/// Turn the cart into a pending order and a payment intent, atomically.
///
/// Products are locked in id order and their stock is checked under the lock; the
/// payment intent is created while the locks are held, before the order row exists.
/// Any error drops the unit of work, rolling back stock, order and cart changes.
pub async fn place_order(
    db: &DatabaseConnection,
    payments: &dyn PaymentGateway,
    currency: &str,
    user_id: Uuid,
    cart_id: Uuid,
    request: &CreateOrderRequest,
) -> AppResult<PlacedOrder> {
    let payment_method = request.payment_method.trim();
    if payment_method.is_empty() {
        return Err(AppError::BadRequest("payment_method is required".into()));
    }

    let uow = UnitOfWork::begin(db).await?;

    let lines = uow.carts().items(cart_id).await?;
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let mut requested: BTreeMap<Uuid, i32> = BTreeMap::new();
    for line in &lines {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        *requested.entry(line.product_id).or_default() += line.quantity;
    }

    let mut locked: HashMap<Uuid, ProductModel> = HashMap::with_capacity(requested.len());
    let mut subtotal: i64 = 0;
    for (&product_id, &quantity) in &requested {
        let product = uow
            .products()
            .lock(product_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if product.stock < quantity {
            return Err(AppError::InsufficientStock {
                product_id,
                available: product.stock,
                requested: quantity,
            });
        }
        subtotal += product.price * i64::from(quantity);
        locked.insert(product_id, product);
    }

    let totals = OrderTotals::from_subtotal(subtotal);

    let shipping = uow
        .addresses()
        .find_for_user(user_id, request.shipping_address_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("shipping address not found".into()))?;
    let billing = match request.billing_address_id {
        Some(id) if id != shipping.id => uow
            .addresses()
            .find_for_user(user_id, id)
            .await?
            .ok_or_else(|| AppError::BadRequest("billing address not found".into()))?,
        _ => shipping.clone(),
    };

    let order_number = build_order_number(Uuid::new_v4());
    let payment_intent = payments
        .create_payment_intent(PaymentIntentRequest {
            amount: totals.total,
            currency,
            order_number: &order_number,
        })
        .await
        .map_err(|err| AppError::PaymentGateway(err.to_string()))?;

    let order = uow
        .orders()
        .insert(NewOrder {
            order_number,
            user_id,
            payment_method: payment_method.to_string(),
            payment_intent_id: payment_intent.id.clone(),
            shipping_address: snapshot(shipping)?,
            billing_address: snapshot(billing)?,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping_cost: totals.shipping_cost,
            discount: totals.discount,
            total: totals.total,
        })
        .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let product = locked.get(&line.product_id).ok_or(AppError::NotFound)?;
        let item = uow
            .orders()
            .insert_item(NewOrderItem {
                order_id: order.id,
                product_id: product.id,
                product_name: product.name.clone(),
                product_sku: product.sku.clone(),
                product_image: product.image_url.clone(),
                unit_price: product.price,
                quantity: line.quantity,
            })
            .await?;
        uow.products()
            .adjust_stock(line.product_id, -line.quantity)
            .await?;
        items.push(item);
    }

    uow.carts().clear(cart_id).await?;
    uow.commit().await?;

    tracing::info!(
        order_id = order.id,
        order_number = %order.order_number,
        payment_intent_id = %payment_intent.id,
        total = order.total,
        "order placed"
    );

    Ok(PlacedOrder {
        order,
        items,
        payment_intent,
    })
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<CreateOrderResponse>> {
    let cart = CartRepo::new(&state.orm)
        .find_by_user(user.user_id)
        .await?
        .ok_or(AppError::EmptyCart)?;

    let placed = place_order(
        &state.orm,
        state.payments.as_ref(),
        &state.config.payments.currency,
        user.user_id,
        cart.id,
        &payload,
    )
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderCreated,
        placed.order.id,
        serde_json::json!({
            "order_number": placed.order.order_number,
            "total": placed.order.total,
            "payment_intent_id": placed.payment_intent.id,
        }),
    )
    .await;

    dispatch_order_created(state, &placed).await;

    Ok(ApiResponse::success(
        "Order created",
        CreateOrderResponse {
            order_id: placed.order.id,
            order_number: placed.order.order_number,
            client_secret: placed.payment_intent.client_secret,
        },
        Some(Meta::empty()),
    ))
}

/// Hand the committed order to the fulfillment pipeline. The order already exists,
/// so a failure here is logged rather than returned.
async fn dispatch_order_created(state: &AppState, placed: &PlacedOrder) {
    let order = &placed.order;
    let user_email = match UserRepo::new(&state.orm).find(order.user_id).await {
        Ok(Some(user)) => user.email,
        Ok(None) => {
            tracing::error!(order_id = order.id, user_id = %order.user_id, "order owner missing, fulfillment not scheduled");
            return;
        }
        Err(err) => {
            tracing::error!(order_id = order.id, error = %err, "failed to load order owner, fulfillment not scheduled");
            return;
        }
    };

    let event = order_created_event(order, &placed.items, user_email);
    if let Err(err) = enqueue_task(state.tasks.as_ref(), &event).await {
        tracing::error!(order_id = order.id, error = %err, "failed to enqueue order-created task");
    }
}

pub fn order_created_event(
    order: &OrderModel,
    items: &[OrderItemModel],
    user_email: String,
) -> OrderCreatedEvent {
    OrderCreatedEvent {
        order_id: order.id,
        user_id: order.user_id,
        order_number: order.order_number.clone(),
        user_email,
        total_amount: order.total,
        order_date: order.created_at.with_timezone(&Utc),
        items: items
            .iter()
            .map(|item| OrderEventItem {
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect(),
    }
}

/// Apply a status change reported by a fulfillment stage.
///
/// Only the next legal step is accepted. Re-sending the current status is a no-op,
/// which keeps duplicate task deliveries harmless.
pub async fn apply_status_update(
    db: &DatabaseConnection,
    order_id: i64,
    update: UpdateOrderStatusRequest,
) -> AppResult<OrderModel> {
    let uow = UnitOfWork::begin(db).await?;
    let order = uow.orders().lock(order_id).await?.ok_or(AppError::NotFound)?;
    let current = parse_status(&order.status)?;

    if current == update.status {
        tracing::debug!(order_id, status = %current, "status already applied");
        return Ok(order);
    }
    if !current.can_transition_to(update.status) {
        tracing::warn!(order_id, from = %current, to = %update.status, "rejected status transition");
        return Err(AppError::InvalidTransition {
            from: current,
            to: update.status,
        });
    }

    let now = Utc::now();
    let mut active: OrderActive = order.into();
    active.status = Set(update.status.as_str().into());
    if let Some(payment_status) = update.payment_status {
        active.payment_status = Set(payment_status.as_str().into());
        if payment_status == PaymentStatus::Paid {
            active.paid_at = Set(Some(now.into()));
        }
    }
    if let Some(tracking_number) = update.tracking_number {
        active.tracking_number = Set(Some(tracking_number));
    }
    if let Some(eta) = update.estimated_delivery_date {
        active.estimated_delivery_date = Set(Some(eta.into()));
    }
    active.updated_at = Set(now.into());

    let order = uow.orders().save(active).await?;
    uow.commit().await?;

    tracing::info!(order_id, from = %current, to = %update.status, "order status updated");
    Ok(order)
}

pub fn status_receipt(order: &OrderModel) -> AppResult<OrderStatusReceipt> {
    Ok(OrderStatusReceipt {
        order_id: order.id,
        status: parse_status(&order.status)?,
        tracking_number: order.tracking_number.clone(),
        estimated_delivery_date: order
            .estimated_delivery_date
            .map(|eta| eta.with_timezone(&Utc)),
    })
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let window = query.page();
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let (orders, total) = OrderRepo::new(&state.orm)
        .list_for_user(
            user.user_id,
            query.status,
            sort_order,
            window.per_page as u64,
            window.offset as u64,
        )
        .await?;

    let meta = Meta::new(window.page, window.per_page, total as i64);
    Ok(ApiResponse::success(
        "Ok",
        OrderList {
            items: orders.into_iter().map(Into::into).collect(),
        },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let repo = OrderRepo::new(&state.orm);
    let order = repo
        .find_for_user(user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = repo.items(order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        },
        Some(Meta::empty()),
    ))
}

pub(crate) fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    raw.parse()
        .map_err(|err| AppError::Internal(anyhow::Error::new(err)))
}

fn snapshot(address: crate::entity::addresses::Model) -> AppResult<serde_json::Value> {
    serde_json::to_value(AddressSnapshot::from(address))
        .map_err(|err| AppError::Internal(err.into()))
}

fn build_order_number(seed: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = seed.simple().to_string().to_uppercase();
    format!("ORD-{}-{}", date, &suffix[..8])
}
