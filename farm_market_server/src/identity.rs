//! The caller's identity.
//!
//! Authentication happens upstream of this server. The authenticating gateway forwards the user id and role in the
//! `fm-user-id` and `fm-user-role` headers, and every engine call receives them as an explicit [`Identity`].
use std::ops::Deref;

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use farm_market_engine::db_types::{Identity, Role, UserId};
use futures::future::{ready, Ready};
use log::*;

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "fm-user-id";
pub const USER_ROLE_HEADER: &str = "fm-user-role";

/// Extracts the caller's [`Identity`] from the request headers. A missing or malformed identity is rejected with
/// `401 Unauthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Identity);

impl Deref for Caller {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identity_from_headers(req.headers()).map(Caller))
    }
}

pub fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, ServerError> {
    let user_id = header_value(headers, USER_ID_HEADER)?
        .parse::<UserId>()
        .map_err(|e| ServerError::Unauthenticated(format!("Invalid {USER_ID_HEADER} header. {e}")))?;
    let role = header_value(headers, USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|e| ServerError::Unauthenticated(format!("Invalid {USER_ROLE_HEADER} header. {e}")))?;
    trace!("💻️ Request made by {role} user {user_id}");
    Ok(Identity::new(user_id, role))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ServerError> {
    let value = headers.get(name).ok_or_else(|| {
        debug!("💻️ Request is missing the {name} header");
        ServerError::Unauthenticated(format!("The {name} header is required"))
    })?;
    value.to_str().map_err(|e| ServerError::Unauthenticated(format!("Invalid {name} header. {e}")))
}
