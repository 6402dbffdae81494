pub mod auth_service;
pub mod contact_service;
pub mod currency_service;
pub mod directory_service;
pub mod order_service;
pub mod payment_provider;
pub mod payment_service;
pub mod product_service;
pub mod stripe;
