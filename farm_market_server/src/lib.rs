//! # Farm market server
//! This crate hosts the HTTP front end of the farm market. It is responsible for:
//! Extracting the caller's identity from the headers set by the authenticating gateway.
//! Passing cart, checkout and order history requests on to the engine APIs.
//! Mapping engine errors onto HTTP status codes with a JSON body.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/cart`, `/api/cart/count` and `/api/cart/items[/{line_id}]`: the caller's cart.
//! * `/api/checkout`: turns the caller's cart into an order.
//! * `/api/orders`, `/api/orders/{id}` and `/api/orders/{id}/status`: order history and admin status changes.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod server;
