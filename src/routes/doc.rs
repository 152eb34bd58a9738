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
        cart::{CartView, SetCartItemRequest},
        orders::{
            CreateOrderRequest, CreateOrderResponse, OrderList, OrderStatusReceipt, OrderWithItems,
            UpdateOrderStatusRequest,
        },
    },
    models::{CartItem, Order, OrderItem, OrderStatus, PaymentStatus},
    response::{Ack, ApiResponse, Meta},
    routes::{cart, health, internal, orders, params, webhooks},
};

/// Shopper routes take a user JWT; the internal callback takes the worker's
/// shared token, sent the same way.
struct AuthSchemes;

impl Modify for AuthSchemes {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let bearer = |format: &str| {
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format(format)
                    .build(),
            )
        };
        components.add_security_scheme("bearer_auth", bearer("JWT"));
        components.add_security_scheme("internal_token", bearer("opaque"));
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::view_cart,
        cart::set_cart_item,
        cart::remove_cart_item,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        webhooks::payment_webhook,
        internal::update_order_status
    ),
    components(
        schemas(
            Order,
            OrderItem,
            OrderStatus,
            PaymentStatus,
            CartItem,
            CartView,
            SetCartItemRequest,
            CreateOrderRequest,
            CreateOrderResponse,
            UpdateOrderStatusRequest,
            OrderStatusReceipt,
            OrderList,
            OrderWithItems,
            params::OrderListQuery,
            Ack,
            Meta,
            ApiResponse<CreateOrderResponse>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CartView>
        )
    ),
    modifiers(&AuthSchemes),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Webhooks", description = "Payment gateway callbacks"),
        (name = "Internal", description = "Fulfillment worker callbacks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
