use std::sync::Arc;

use crate::{
    error::AppError,
    services::{
        auth_service::TokenService, currency_service::CurrencyConverter,
        payment_service::PaymentGateway,
    },
    store::{
        ContactInbox, Directory, InMemoryOrders, InMemoryPayments, InMemoryProducts,
        OrderRepository, PaymentRepository, ProductRepository, UserDirectory,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub users: Arc<UserDirectory>,
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub directory: Arc<Directory>,
    pub contact: Arc<ContactInbox>,
    /// `None` when the provider credentials are not configured.
    pub payment_gateway: Option<Arc<PaymentGateway>>,
    /// `None` when the rate provider is not configured.
    pub currency: Option<Arc<CurrencyConverter>>,
}

impl AppState {
    /// State with empty in-memory stores and both optional subsystems disabled.
    pub fn new(tokens: TokenService, users: UserDirectory) -> Self {
        Self {
            tokens,
            users: Arc::new(users),
            products: Arc::new(InMemoryProducts::new()),
            orders: Arc::new(InMemoryOrders::new()),
            payments: Arc::new(InMemoryPayments::new()),
            directory: Arc::new(Directory::default()),
            contact: Arc::new(ContactInbox::new()),
            payment_gateway: None,
            currency: None,
        }
    }

    pub fn with_directory(mut self, directory: Directory) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    pub fn with_payment_gateway(mut self, gateway: PaymentGateway) -> Self {
        self.payment_gateway = Some(Arc::new(gateway));
        self
    }

    pub fn with_currency(mut self, converter: CurrencyConverter) -> Self {
        self.currency = Some(Arc::new(converter));
        self
    }

    pub fn payment_gateway(&self) -> Result<&PaymentGateway, AppError> {
        self.payment_gateway.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable(
                "Payment service unavailable due to missing configuration".into(),
            )
        })
    }

    pub fn currency_converter(&self) -> Result<&CurrencyConverter, AppError> {
        self.currency.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable(
                "Currency conversion service unavailable due to missing configuration".into(),
            )
        })
    }
}
