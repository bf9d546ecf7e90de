use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use farm_market_engine::{checkout_objects::StockConflictLine, CartError, CheckoutError, OrderHistoryError};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    Unauthenticated(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("{} cart line(s) cannot be fulfilled", .0.len())]
    StockConflict(Vec<StockConflictLine>),
    #[error("The order could not be placed. Please try again. {0}")]
    CommitFailure(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::StockConflict(_) => StatusCode::CONFLICT,
            Self::CommitFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::StockConflict(lines) => json!({ "error": self.to_string(), "conflicts": lines }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<CartError> for ServerError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::DatabaseError(s) => {
                error!("💻️ Cart database error: {s}");
                Self::BackendError(s)
            },
            CartError::Forbidden(s) => Self::InsufficientPermissions(s),
            CartError::ListingNotFound(_) | CartError::LineNotFound(_) => Self::NoRecordFound(e.to_string()),
            CartError::InvalidQuantity(_) => Self::ValidationError(e.to_string()),
            CartError::ListingNotActive(..) | CartError::InsufficientStock { .. } => Self::Conflict(e.to_string()),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Forbidden(s) => Self::InsufficientPermissions(s),
            CheckoutError::EmptyCart => Self::Conflict(e.to_string()),
            CheckoutError::ValidationError(v) => Self::ValidationError(v.to_string()),
            CheckoutError::StockConflict(lines) => Self::StockConflict(lines),
            CheckoutError::CommitFailure(s) => {
                error!("💻️ Checkout could not be committed: {s}");
                Self::CommitFailure(s)
            },
        }
    }
}

impl From<OrderHistoryError> for ServerError {
    fn from(e: OrderHistoryError) -> Self {
        match e {
            OrderHistoryError::DatabaseError(s) => {
                error!("💻️ Order history database error: {s}");
                Self::BackendError(s)
            },
            OrderHistoryError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderHistoryError::Forbidden(s) => Self::InsufficientPermissions(s),
            OrderHistoryError::InvalidStatusTransition { .. } => Self::Conflict(e.to_string()),
        }
    }
}
