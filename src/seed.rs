//! Demo data loaded at startup when `SEED_DEMO_DATA` is enabled.

use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    models::{Branch, NewProduct, Role, Seller, User},
    services::auth_service::hash_password,
    store::{Directory, ProductRepository, StoreResult, UserDirectory},
};

/// `(username, role, password)` for every demo account.
pub const DEMO_ACCOUNTS: &[(&str, Role, &str)] = &[
    ("javier_thompson", Role::Mantenedor, "aONF4d6aNBIxRjlgjBRRzrS"),
    ("ignacio_tapia", Role::Client, "f7rWChmQS1JYfThT"),
    ("stripe_sa", Role::ServiceAccount, "dzkQqDL9XZH33YDzhmsf"),
    ("admin_ferremas", Role::Admin, "Qm4vTz8rLw2pXk6n"),
];

pub fn demo_users() -> AppResult<UserDirectory> {
    let mut users = UserDirectory::new();
    for (username, role, password) in DEMO_ACCOUNTS {
        users.insert(User {
            username: (*username).to_string(),
            role: *role,
            password_hash: hash_password(password)?,
        });
    }
    Ok(users)
}

#[allow(clippy::too_many_arguments)]
fn product(
    name: &str,
    description: &str,
    price: i64,
    stock: i32,
    brand: &str,
    code: &str,
    model: &str,
    is_promo: bool,
    is_new: bool,
) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: Some(description.to_string()),
        price: Decimal::from(price),
        model: Some(model.to_string()),
        brand: Some(brand.to_string()),
        code: code.to_string(),
        stock,
        is_promo,
        is_new,
    }
}

pub fn demo_products() -> Vec<NewProduct> {
    vec![
        product(
            "Martillo",
            "Martillo de carpintero con mango de madera.",
            7500,
            120,
            "MarcaX",
            "MTR001",
            "MC-100",
            false,
            true,
        ),
        product(
            "Taladro Eléctrico",
            "Potente taladro percutor de 800W.",
            45200,
            45,
            "PowerDrill",
            "TAL045",
            "TP-800",
            true,
            false,
        ),
        product(
            "Lijadora",
            "Lijadora orbital para acabados finos.",
            22000,
            60,
            "LijaPro",
            "LIJ020",
            "LO-500",
            true,
            true,
        ),
        product(
            "Destornillador",
            "Set de destornilladores de precisión.",
            3200,
            200,
            "DestroMax",
            "DST100",
            "SET-DM",
            false,
            false,
        ),
    ]
}

/// Inserts the demo products in order. On an empty store they get ids 1 to 4.
pub fn seed_catalog(products: &dyn ProductRepository) -> StoreResult<()> {
    for data in demo_products() {
        products.create(data)?;
    }
    Ok(())
}

pub fn demo_directory() -> Directory {
    let branch = |id, name: &str, address: &str, phone: &str| Branch {
        id,
        name: name.to_string(),
        address: address.to_string(),
        city: "Santiago".to_string(),
        phone: Some(phone.to_string()),
    };
    let seller = |id, name: &str, branch_id, email: &str, phone: &str| Seller {
        id,
        name: name.to_string(),
        branch_id,
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
    };

    Directory::new(
        vec![
            branch(1, "Sucursal Centro", "Av. Principal 123", "221234567"),
            branch(2, "Sucursal Norte", "Calle Norte 456", "229876543"),
        ],
        vec![
            seller(1, "Carlos Pérez", 1, "carlos@ferremas.cl", "9123-4567"),
            seller(2, "María López", 1, "maria@ferremas.cl", "9234-5678"),
            seller(3, "Ana Ruiz", 2, "ana@ferremas.cl", "9345-6789"),
        ],
    )
}
