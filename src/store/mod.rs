//! Repository interfaces and their in-memory backing.
//!
//! Services only see the traits, so a persistent implementation can be
//! swapped in without touching the order or payment flows.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    NewProduct, Order, OrderItem, OrderStatus, PaymentItemSnapshot, PaymentRecord,
    PaymentStatus, Product,
};

pub mod directory;
pub mod memory;
pub mod users;

pub use directory::{ContactInbox, Directory};
pub use memory::{InMemoryOrders, InMemoryPayments, InMemoryProducts};
pub use users::UserDirectory;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("A product with code '{0}' already exists")]
    DuplicateCode(String),

    #[error("Insufficient stock for product '{name}'. Available stock: {available}")]
    InsufficientStock {
        product_id: i64,
        name: String,
        available: i32,
    },

    #[error("Stock counter overflow for product {0}")]
    StockOverflow(i64),

    #[error("A payment record for session '{0}' already exists")]
    DuplicateSession(String),

    #[error("Order {0} already has a checkout session awaiting payment")]
    PendingCheckout(i64),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: i64,
    pub quantity: i32,
}

impl From<&OrderItem> for StockLine {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub promo: Option<bool>,
    pub new: Option<bool>,
    pub max_stock: Option<i32>,
}

pub trait ProductRepository: Send + Sync {
    fn find_by_id(&self, id: i64) -> StoreResult<Product>;

    /// Insertion order.
    fn list(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    fn create(&self, data: NewProduct) -> StoreResult<Product>;

    /// Adds `delta` to the stock of one product. Fails without touching the
    /// product when the result would be negative.
    fn adjust_stock(&self, id: i64, delta: i32) -> StoreResult<Product>;

    /// Decrements every line or none. Lines naming the same product are
    /// checked against their combined quantity.
    fn reserve(&self, lines: &[StockLine]) -> StoreResult<()>;

    /// Puts previously reserved quantities back.
    fn release(&self, lines: &[StockLine]) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
}

#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub user_id: Option<String>,
    pub status: Option<OrderStatus>,
}

pub trait OrderRepository: Send + Sync {
    fn insert(&self, order: NewOrder) -> StoreResult<Order>;

    fn find_by_id(&self, id: i64) -> StoreResult<Order>;

    /// Newest first.
    fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;

    /// Moves a pending order to `status`. Returns `None` when the order had
    /// already left `pending`.
    fn transition(&self, id: i64, status: OrderStatus) -> StoreResult<Option<Order>>;
}

#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub client_username: String,
    pub stripe_session_id: String,
    pub amount_total: Decimal,
    pub currency: String,
    pub items_snapshot: Vec<PaymentItemSnapshot>,
    pub order_id: Option<i64>,
}

/// Final state reported by the provider for a checkout session.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub amount_total: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SettleOutcome {
    UnknownSession,
    AlreadySettled(PaymentRecord),
    Settled(PaymentRecord),
}

pub trait PaymentRepository: Send + Sync {
    /// Fails with `PendingCheckout` when the linked order already has a
    /// pending record.
    fn insert(&self, record: NewPaymentRecord) -> StoreResult<PaymentRecord>;

    fn find_by_session(&self, session_id: &str) -> StoreResult<Option<PaymentRecord>>;

    fn pending_for_order(&self, order_id: i64) -> StoreResult<Option<PaymentRecord>>;

    /// Ordered by id.
    fn list(&self) -> StoreResult<Vec<PaymentRecord>>;

    /// Applies `settlement` to the pending record for `session_id`. A record
    /// that already left `pending` is returned untouched.
    fn settle(&self, session_id: &str, settlement: Settlement) -> StoreResult<SettleOutcome>;
}
