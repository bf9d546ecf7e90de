//! Access control list middleware for the farm market server.
//! This middleware can be placed on any route or service.
//!
//! It reads the caller's identity from the request headers and checks the caller's role against the roles allowed on
//! the route. A request without a valid identity is rejected with 401 Unauthorized, and a caller whose role is not
//! on the list gets 403 Forbidden. Otherwise the request is allowed to continue.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use farm_market_engine::db_types::Role;
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;

use crate::{errors::ServerError, identity::identity_from_headers};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let identity = identity_from_headers(req.headers())?;
            if allowed_roles.contains(&identity.role) {
                service.call(req).await
            } else {
                debug!("💻️ {identity} tried to access {}, which is restricted to {allowed_roles:?}", req.path());
                Err(ServerError::InsufficientPermissions(format!("{} users cannot access this route", identity.role))
                    .into())
            }
        })
    }
}
