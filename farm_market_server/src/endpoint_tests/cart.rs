use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use farm_market_engine::{
    db_types::{CartLineId, CartSnapshot, CartState, ListingId, Role, UserId},
    CartApi,
    CartError,
};
use fm_common::Quantity;
use mockall::predicate::eq;

use super::{
    helpers::{as_user, cart_line, json, line_view, listing, send_request},
    mocks::MockMarketBackend,
};
use crate::{
    routes::{AddCartItemRoute, CartCountRoute, RemoveCartItemRoute, UpdateCartItemRoute, ViewCartRoute},
    server::json_error,
};

fn configure(backend: MockMarketBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::Data::new(CartApi::new(backend)))
            .service(ViewCartRoute::<MockMarketBackend>::new())
            .service(CartCountRoute::<MockMarketBackend>::new())
            .service(AddCartItemRoute::<MockMarketBackend>::new())
            .service(UpdateCartItemRoute::<MockMarketBackend>::new())
            .service(RemoveCartItemRoute::<MockMarketBackend>::new());
    }
}

#[actix_web::test]
async fn view_cart_without_identity() {
    let _ = env_logger::try_init().ok();
    let backend = MockMarketBackend::new();
    let (status, body) = send_request(TestRequest::get().uri("/cart"), configure(backend)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Authentication Error. The fm-user-id header is required");
}

#[actix_web::test]
async fn view_cart_derives_total_from_live_prices() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_cart_snapshot().with(eq(UserId(1))).times(1).returning(|buyer| {
        let tomatoes = listing(1, "Tomatoes", "4.50", "20");
        let eggs = listing(2, "Eggs", "0.2334", "60");
        Ok(CartSnapshot {
            buyer_id: buyer,
            state: CartState::Active,
            lines: vec![line_view(10, &tomatoes, "2"), line_view(11, &eggs, "12")],
        })
    });
    let req = as_user(TestRequest::get().uri("/cart"), 1, Role::Buyer);
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let cart = json(&body);
    assert_eq!(cart["state"], "Active");
    assert_eq!(cart["lines"].as_array().unwrap().len(), 2);
    assert_eq!(cart["lines"][1]["quantity"], "12");
    assert_eq!(cart["total"], "11.80");
}

#[actix_web::test]
async fn view_cart_as_farmer() {
    let _ = env_logger::try_init().ok();
    let backend = MockMarketBackend::new();
    let req = as_user(TestRequest::get().uri("/cart"), 100, Role::Farmer);
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json(&body)["error"].as_str().unwrap().contains("Only buyers have a shopping cart"));
}

#[actix_web::test]
async fn cart_count_is_zero_for_farmers() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_line_count().never();
    let req = as_user(TestRequest::get().uri("/cart/count"), 100, Role::Farmer);
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"count":0}"#);
}

#[actix_web::test]
async fn cart_count_for_buyer() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_line_count().with(eq(UserId(1))).returning(|_| Ok(3));
    let req = as_user(TestRequest::get().uri("/cart/count"), 1, Role::Buyer);
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"count":3}"#);
}

#[actix_web::test]
async fn add_item_to_cart() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend
        .expect_add_or_merge()
        .with(eq(UserId(1)), eq(ListingId(5)), eq(Quantity::from_raw(1_500)))
        .times(1)
        .returning(|_, listing_id, quantity| Ok(cart_line(10, listing_id.value(), &quantity.to_string())));
    let req = as_user(TestRequest::post().uri("/cart/items"), 1, Role::Buyer)
        .set_json(serde_json::json!({ "listing_id": 5, "quantity": "1.5" }));
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::CREATED);
    let line = json(&body);
    assert_eq!(line["id"], 10);
    assert_eq!(line["quantity"], "1.5");
}

#[actix_web::test]
async fn add_non_positive_quantity() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_add_or_merge().never();
    let req = as_user(TestRequest::post().uri("/cart/items"), 1, Role::Buyer)
        .set_json(serde_json::json!({ "listing_id": 5, "quantity": 0 }));
    let (status, _) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn add_more_than_is_available() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_add_or_merge().returning(|_, listing_id, requested| {
        Err(CartError::InsufficientStock { listing_id, requested, available: Quantity::from_units(2) })
    });
    let req = as_user(TestRequest::post().uri("/cart/items"), 1, Role::Buyer)
        .set_json(serde_json::json!({ "listing_id": 5, "quantity": 3 }));
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json(&body)["error"].as_str().unwrap().contains("only 2 is available"));
}

#[actix_web::test]
async fn add_item_with_malformed_body() {
    let _ = env_logger::try_init().ok();
    let backend = MockMarketBackend::new();
    let req = as_user(TestRequest::post().uri("/cart/items"), 1, Role::Buyer)
        .insert_header(("content-type", "application/json"))
        .set_payload(r#"{"listing_id": "five"}"#);
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Could not read request body"));
}

#[actix_web::test]
async fn set_quantity_to_zero_removes_line() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend
        .expect_set_quantity()
        .with(eq(UserId(1)), eq(CartLineId(10)), eq(Quantity::ZERO))
        .times(1)
        .returning(|_, _, _| Ok(None));
    let req = as_user(TestRequest::put().uri("/cart/items/10"), 1, Role::Buyer)
        .set_json(serde_json::json!({ "quantity": 0 }));
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Cart line #10 removed"}"#);
}

#[actix_web::test]
async fn set_quantity_on_someone_elses_line() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend
        .expect_set_quantity()
        .returning(|_, line_id, _| Err(CartError::Forbidden(format!("Cart line {line_id} is in someone else's cart"))));
    let req = as_user(TestRequest::put().uri("/cart/items/10"), 2, Role::Buyer)
        .set_json(serde_json::json!({ "quantity": 1 }));
    let (status, _) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn remove_missing_line() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend
        .expect_remove_line()
        .with(eq(UserId(1)), eq(CartLineId(99)))
        .returning(|_, line_id| Err(CartError::LineNotFound(line_id)));
    let req = as_user(TestRequest::delete().uri("/cart/items/99"), 1, Role::Buyer);
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "The data was not found. Cart line #99 does not exist");
}
