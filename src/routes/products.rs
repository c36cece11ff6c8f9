/// Product Routes
///
/// CRUD over the product store. Mounted behind `JwtMiddleware`.

use actix_web::{web, HttpResponse};

use crate::auth::Claims;
use crate::error::{AppError, ValidationError};
use crate::store::{ProductRequest, ProductStore};
use crate::validators::is_valid_product;

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Product with Id {} not found", id))
}

/// GET /api/product/products
pub async fn list_products(products: web::Data<dyn ProductStore>) -> Result<HttpResponse, AppError> {
    let all = products.list().await?;
    Ok(HttpResponse::Ok().json(all))
}

/// GET /api/product/{id}
pub async fn get_product(
    path: web::Path<i32>,
    products: web::Data<dyn ProductStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let product = products.get(id).await?.ok_or_else(|| not_found(id))?;

    Ok(HttpResponse::Ok().json(product))
}

/// POST /api/product/CreateProduct (also mounted lowercase)
pub async fn create_product(
    form: web::Json<ProductRequest>,
    claims: web::ReqData<Claims>,
    products: web::Data<dyn ProductStore>,
) -> Result<HttpResponse, AppError> {
    is_valid_product(&form.name, form.price.as_deref())?;

    let created = products.create(&form).await?;
    tracing::info!(product_id = created.id, user_id = %claims.sub, "Product created");

    Ok(HttpResponse::Created().json(created))
}

/// PUT /api/product/{id}
///
/// # Errors
/// - 400: body carries a different id, or invalid fields
/// - 404: no such product
pub async fn update_product(
    path: web::Path<i32>,
    form: web::Json<ProductRequest>,
    products: web::Data<dyn ProductStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    if form.id.map_or(false, |body_id| body_id != id) {
        return Err(ValidationError::Mismatch("Product Id".to_string()).into());
    }
    is_valid_product(&form.name, form.price.as_deref())?;

    let updated = products.update(id, &form).await?.ok_or_else(|| not_found(id))?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/product/{id}
pub async fn delete_product(
    path: web::Path<i32>,
    claims: web::ReqData<Claims>,
    products: web::Data<dyn ProductStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    if !products.delete(id).await? {
        return Err(not_found(id));
    }
    tracing::info!(product_id = id, user_id = %claims.sub, "Product deleted");

    Ok(HttpResponse::Ok().json(format!("Product with Id= {} deleted", id)))
}
