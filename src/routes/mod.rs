mod auth;
mod health_check;
mod products;

pub use auth::{login, refresh_token, register};
pub use health_check::health_check;
pub use products::{create_product, delete_product, get_product, list_products, update_product};
