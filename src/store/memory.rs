use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::models::{NewProduct, Order, OrderStatus, PaymentRecord, PaymentStatus, Product};

use super::{
    NewOrder, NewPaymentRecord, OrderFilter, OrderRepository, PaymentRepository, ProductFilter,
    ProductRepository, SettleOutcome, Settlement, StockLine, StoreError, StoreResult,
};

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::Poisoned)
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::Poisoned)
}

/// Product catalog keyed by id. Ids are handed out in increasing order, so
/// map order is insertion order.
#[derive(Debug)]
pub struct InMemoryProducts {
    products: RwLock<BTreeMap<i64, Product>>,
    next_id: AtomicI64,
}

impl Default for InMemoryProducts {
    fn default() -> Self {
        Self {
            products: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryProducts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductRepository for InMemoryProducts {
    fn find_by_id(&self, id: i64) -> StoreResult<Product> {
        read(&self.products)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "Product",
                id,
            })
    }

    fn list(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let products = read(&self.products)?;
        Ok(products
            .values()
            .filter(|p| filter.promo.is_none_or(|promo| p.is_promo == promo))
            .filter(|p| filter.new.is_none_or(|new| p.is_new == new))
            .filter(|p| filter.max_stock.is_none_or(|max| p.stock <= max))
            .cloned()
            .collect())
    }

    fn create(&self, data: NewProduct) -> StoreResult<Product> {
        let mut products = write(&self.products)?;
        if products.values().any(|p| p.code == data.code) {
            return Err(StoreError::DuplicateCode(data.code));
        }

        // Taken under the write lock, after the code check.
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let product = Product {
            id,
            name: data.name,
            description: data.description,
            price: data.price,
            model: data.model,
            brand: data.brand,
            code: data.code,
            stock: data.stock,
            is_promo: data.is_promo,
            is_new: data.is_new,
        };
        products.insert(id, product.clone());
        Ok(product)
    }

    fn adjust_stock(&self, id: i64, delta: i32) -> StoreResult<Product> {
        let mut products = write(&self.products)?;
        let product = products.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "Product",
            id,
        })?;

        let new_stock = product
            .stock
            .checked_add(delta)
            .ok_or(StoreError::StockOverflow(id))?;
        if new_stock < 0 {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                name: product.name.clone(),
                available: product.stock,
            });
        }
        product.stock = new_stock;
        Ok(product.clone())
    }

    fn reserve(&self, lines: &[StockLine]) -> StoreResult<()> {
        let mut products = write(&self.products)?;

        // Check the whole batch against a scratch copy of the counters first.
        let mut remaining: HashMap<i64, i32> = HashMap::new();
        for line in lines {
            let product = products.get(&line.product_id).ok_or(StoreError::NotFound {
                entity: "Product",
                id: line.product_id,
            })?;
            let available = *remaining.entry(line.product_id).or_insert(product.stock);
            if available < line.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: product.id,
                    name: product.name.clone(),
                    available,
                });
            }
            remaining.insert(line.product_id, available - line.quantity);
        }

        for (id, stock) in remaining {
            if let Some(product) = products.get_mut(&id) {
                product.stock = stock;
            }
        }
        Ok(())
    }

    fn release(&self, lines: &[StockLine]) -> StoreResult<()> {
        let mut products = write(&self.products)?;

        let mut restored: HashMap<i64, i32> = HashMap::new();
        for line in lines {
            let product = products.get(&line.product_id).ok_or(StoreError::NotFound {
                entity: "Product",
                id: line.product_id,
            })?;
            let current = *restored.entry(line.product_id).or_insert(product.stock);
            let next = current
                .checked_add(line.quantity)
                .ok_or(StoreError::StockOverflow(line.product_id))?;
            restored.insert(line.product_id, next);
        }

        for (id, stock) in restored {
            if let Some(product) = products.get_mut(&id) {
                product.stock = stock;
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct InMemoryOrders {
    orders: RwLock<BTreeMap<i64, Order>>,
    next_id: AtomicI64,
}

impl Default for InMemoryOrders {
    fn default() -> Self {
        Self {
            orders: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRepository for InMemoryOrders {
    fn insert(&self, order: NewOrder) -> StoreResult<Order> {
        let mut orders = write(&self.orders)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let order = Order {
            id,
            user_id: order.user_id,
            items: order.items,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            order_date: now,
            updated_at: now,
        };
        orders.insert(id, order.clone());
        Ok(order)
    }

    fn find_by_id(&self, id: i64) -> StoreResult<Order> {
        read(&self.orders)?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "Order", id })
    }

    fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let orders = read(&self.orders)?;
        Ok(orders
            .values()
            .rev()
            .filter(|o| filter.user_id.as_ref().is_none_or(|user| &o.user_id == user))
            .filter(|o| filter.status.is_none_or(|status| o.status == status))
            .cloned()
            .collect())
    }

    fn transition(&self, id: i64, status: OrderStatus) -> StoreResult<Option<Order>> {
        let mut orders = write(&self.orders)?;
        let order = orders
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "Order", id })?;
        if order.status != OrderStatus::Pending {
            return Ok(None);
        }
        order.status = status;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}

/// Payment records keyed by the provider's checkout session id.
#[derive(Debug)]
pub struct InMemoryPayments {
    records: RwLock<HashMap<String, PaymentRecord>>,
    next_id: AtomicI64,
}

impl Default for InMemoryPayments {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryPayments {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_pending_for(record: &PaymentRecord, order_id: i64) -> bool {
    record.order_id == Some(order_id) && record.status == PaymentStatus::Pending
}

impl PaymentRepository for InMemoryPayments {
    fn insert(&self, record: NewPaymentRecord) -> StoreResult<PaymentRecord> {
        let mut records = write(&self.records)?;
        if records.contains_key(&record.stripe_session_id) {
            return Err(StoreError::DuplicateSession(record.stripe_session_id));
        }
        if let Some(order_id) = record.order_id {
            if records.values().any(|r| is_pending_for(r, order_id)) {
                return Err(StoreError::PendingCheckout(order_id));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let record = PaymentRecord {
            id,
            client_username: record.client_username,
            stripe_session_id: record.stripe_session_id,
            stripe_payment_intent_id: None,
            amount_total: record.amount_total,
            currency: record.currency,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
            items_snapshot: record.items_snapshot,
            order_id: record.order_id,
        };
        records.insert(record.stripe_session_id.clone(), record.clone());
        Ok(record)
    }

    fn find_by_session(&self, session_id: &str) -> StoreResult<Option<PaymentRecord>> {
        Ok(read(&self.records)?.get(session_id).cloned())
    }

    fn pending_for_order(&self, order_id: i64) -> StoreResult<Option<PaymentRecord>> {
        Ok(read(&self.records)?
            .values()
            .find(|r| is_pending_for(r, order_id))
            .cloned())
    }

    fn list(&self) -> StoreResult<Vec<PaymentRecord>> {
        let mut records: Vec<PaymentRecord> = read(&self.records)?.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn settle(&self, session_id: &str, settlement: Settlement) -> StoreResult<SettleOutcome> {
        let mut records = write(&self.records)?;
        let Some(record) = records.get_mut(session_id) else {
            return Ok(SettleOutcome::UnknownSession);
        };
        if record.status != PaymentStatus::Pending {
            return Ok(SettleOutcome::AlreadySettled(record.clone()));
        }

        record.status = settlement.status;
        if settlement.payment_intent_id.is_some() {
            record.stripe_payment_intent_id = settlement.payment_intent_id;
        }
        if let Some(amount) = settlement.amount_total {
            record.amount_total = amount;
        }
        if let Some(currency) = settlement.currency {
            record.currency = currency.to_uppercase();
        }
        record.updated_at = Utc::now();
        Ok(SettleOutcome::Settled(record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn product(code: &str, stock: i32) -> NewProduct {
        NewProduct {
            name: format!("Product {code}"),
            description: None,
            price: dec!(1000),
            model: None,
            brand: None,
            code: code.to_string(),
            stock,
            is_promo: false,
            is_new: false,
        }
    }

    #[test]
    fn reserve_is_all_or_nothing() {
        let store = InMemoryProducts::new();
        let a = store.create(product("A", 10)).unwrap();
        let b = store.create(product("B", 1)).unwrap();

        let err = store
            .reserve(&[
                StockLine { product_id: a.id, quantity: 3 },
                StockLine { product_id: b.id, quantity: 2 },
            ])
            .unwrap_err();

        assert!(matches!(err, StoreError::InsufficientStock { available: 1, .. }));
        assert_eq!(store.find_by_id(a.id).unwrap().stock, 10);
        assert_eq!(store.find_by_id(b.id).unwrap().stock, 1);
    }

    #[test]
    fn reserve_counts_repeated_lines_together() {
        let store = InMemoryProducts::new();
        let a = store.create(product("A", 5)).unwrap();

        let line = StockLine { product_id: a.id, quantity: 3 };
        assert!(store.reserve(&[line, line]).is_err());
        assert_eq!(store.find_by_id(a.id).unwrap().stock, 5);
    }

    #[test]
    fn duplicate_code_does_not_consume_an_id() {
        let store = InMemoryProducts::new();
        store.create(product("A", 1)).unwrap();
        assert_eq!(
            store.create(product("A", 1)).unwrap_err(),
            StoreError::DuplicateCode("A".into())
        );
        assert_eq!(store.create(product("B", 1)).unwrap().id, 2);
    }

    #[test]
    fn adjust_stock_rejects_negative_result() {
        let store = InMemoryProducts::new();
        let a = store.create(product("A", 2)).unwrap();
        assert!(store.adjust_stock(a.id, -3).is_err());
        assert_eq!(store.adjust_stock(a.id, -2).unwrap().stock, 0);
    }

    #[test]
    fn settle_only_moves_pending_records() {
        let store = InMemoryPayments::new();
        store
            .insert(NewPaymentRecord {
                client_username: "client".into(),
                stripe_session_id: "cs_1".into(),
                amount_total: dec!(10),
                currency: "usd".into(),
                items_snapshot: vec![],
                order_id: None,
            })
            .unwrap();

        let paid = Settlement {
            status: PaymentStatus::Paid,
            payment_intent_id: Some("pi_1".into()),
            amount_total: None,
            currency: Some("usd".into()),
        };
        assert!(matches!(
            store.settle("cs_1", paid.clone()).unwrap(),
            SettleOutcome::Settled(_)
        ));
        assert!(matches!(
            store.settle("cs_1", paid).unwrap(),
            SettleOutcome::AlreadySettled(_)
        ));
        assert!(matches!(
            store
                .settle(
                    "cs_missing",
                    Settlement {
                        status: PaymentStatus::Failed,
                        payment_intent_id: None,
                        amount_total: None,
                        currency: None,
                    }
                )
                .unwrap(),
            SettleOutcome::UnknownSession
        ));
    }

    #[test]
    fn one_pending_record_per_order() {
        let store = InMemoryPayments::new();
        let record = |session: &str| NewPaymentRecord {
            client_username: "client".into(),
            stripe_session_id: session.into(),
            amount_total: dec!(10),
            currency: "usd".into(),
            items_snapshot: vec![],
            order_id: Some(7),
        };

        store.insert(record("cs_1")).unwrap();
        assert_eq!(
            store.insert(record("cs_2")).unwrap_err(),
            StoreError::PendingCheckout(7)
        );
        assert_eq!(store.pending_for_order(7).unwrap().unwrap().stripe_session_id, "cs_1");
        assert!(store.pending_for_order(8).unwrap().is_none());
    }
}
