pub mod auth;
pub mod contact;
pub mod currency;
pub mod orders;
pub mod payments;
pub mod products;
