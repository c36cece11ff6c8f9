use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{TokenCodec, TokenIssuer, TokenRefresher};
use crate::configuration::JwtSettings;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_product, delete_product, get_product, health_check, list_products, login, refresh_token,
    register, update_product,
};
use crate::store::Stores;

pub fn run(listener: TcpListener, stores: Stores, jwt_config: JwtSettings) -> Result<Server, std::io::Error> {
    let codec = TokenCodec::new(&jwt_config)
        .map(Arc::new)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let issuer = TokenIssuer::new(
        codec.clone(),
        stores.refresh_tokens.clone(),
        jwt_config.refresh_token_expiry_months,
    );
    let refresher = TokenRefresher::new(
        codec.clone(),
        stores.refresh_tokens.clone(),
        stores.credentials.clone(),
        issuer.clone(),
    );

    let issuer = web::Data::new(issuer);
    let refresher = web::Data::new(refresher);
    let credentials = web::Data::from(stores.credentials);
    let products = web::Data::from(stores.products);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                tracing::debug!(error = %err, "Rejected JSON payload");
                AppError::Validation(ValidationError::InvalidPayload).into()
            }))
            .app_data(issuer.clone())
            .app_data(refresher.clone())
            .app_data(credentials.clone())
            .app_data(products.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh-token", web::post().to(refresh_token))

            // Protected routes (require a live access token)
            .service(
                web::scope("/api/product")
                    .wrap(JwtMiddleware::new(codec.clone()))
                    .route("/products", web::get().to(list_products))
                    .route("/CreateProduct", web::post().to(create_product))
                    .route("/createproduct", web::post().to(create_product))
                    .route("/{id}", web::get().to(get_product))
                    .route("/{id}", web::put().to(update_product))
                    .route("/{id}", web::delete().to(delete_product)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
