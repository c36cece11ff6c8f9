/// JWT Authentication Middleware
///
/// Validates the bearer access token on protected routes and injects its
/// claims into request extensions. Unlike the refresh path, expired tokens
/// are rejected here.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::error::AppError;

pub struct JwtMiddleware {
    codec: Arc<TokenCodec>,
}

impl JwtMiddleware {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            codec: self.codec.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    codec: Arc<TokenCodec>,
}

/// Token part of an `Authorization: Bearer <token>` header
fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match bearer_token(&req) {
            Some(token) => token,
            None => {
                let err = AppError::Unauthorized("Missing or invalid authorization header".to_string());
                return Box::pin(async move { Err(err.into()) });
            }
        };

        match self.codec.authenticate(&token) {
            Ok(claims) => {
                tracing::debug!(user_id = %claims.sub, jti = %claims.jti, "JWT validated successfully");
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                let err = AppError::Unauthorized(format!("Invalid or expired token: {}", e));
                Box::pin(async move { Err(err.into()) })
            }
        }
    }
}
