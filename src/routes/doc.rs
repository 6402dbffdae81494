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
        auth::{LoginRequest, LoginResponse},
        contact::{ContactMessageList, ContactRequest},
        currency::ConversionResult,
        orders::{CreateOrderRequest, OrderLineRequest, OrderList},
        payments::{
            CheckoutItem, CheckoutSessionResponse, CreateCheckoutSessionRequest,
            PaymentRecordList, WebhookAck, WebhookOutcome,
        },
        products::{ProductList, StockAdjustRequest},
    },
    error::ErrorData,
    middleware::auth::AuthUser,
    models::{
        Branch, ContactMessage, NewProduct, Order, OrderItem, OrderStatus, PaymentItemSnapshot,
        PaymentRecord, PaymentStatus, Product, Role, Seller,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, branches, contact, currency, health, orders, params, payments, products,
        sellers,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::root,
        health::health_check,
        auth::login,
        auth::me,
        products::list_products,
        products::get_product,
        products::create_product,
        products::adjust_stock,
        branches::list_branches,
        branches::get_branch,
        branches::list_branch_sellers,
        sellers::get_seller,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        contact::send_message,
        contact::sent_messages,
        currency::convert,
        payments::create_checkout_session,
        payments::payment_success,
        payments::payment_cancel,
        payments::webhook,
        payments::list_records,
        admin::list_all_orders,
        admin::list_low_stock
    ),
    components(
        schemas(
            Role,
            AuthUser,
            LoginRequest,
            LoginResponse,
            Product,
            NewProduct,
            StockAdjustRequest,
            ProductList,
            Order,
            OrderItem,
            OrderStatus,
            OrderLineRequest,
            CreateOrderRequest,
            OrderList,
            Branch,
            Seller,
            ContactRequest,
            ContactMessage,
            ContactMessageList,
            ConversionResult,
            CheckoutItem,
            CreateCheckoutSessionRequest,
            CheckoutSessionResponse,
            PaymentStatus,
            PaymentItemSnapshot,
            PaymentRecord,
            PaymentRecordList,
            WebhookOutcome,
            WebhookAck,
            ErrorData,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<ErrorData>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Directory", description = "Branch and seller endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Contact", description = "Client to seller messages"),
        (name = "Currency", description = "Currency conversion"),
        (name = "Payments", description = "Hosted checkout and provider webhooks"),
        (name = "Admin", description = "Back office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
