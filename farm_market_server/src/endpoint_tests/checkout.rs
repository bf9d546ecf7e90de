use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use farm_market_engine::{
    db_types::{CartSnapshot, CartState, ListingId, PaymentPolicy, Role, UserId},
    events::EventProducers,
    CheckoutApi,
    CheckoutError,
};
use fm_common::Quantity;
use mockall::predicate::eq;
use serde_json::{json as json_body, Value};

use super::{
    helpers::{as_user, json, line_view, listing, order, send_request},
    mocks::MockMarketBackend,
};
use crate::{routes::CheckoutRoute, server::json_error};

fn configure(backend: MockMarketBackend, policy: PaymentPolicy) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = CheckoutApi::new(backend, EventProducers::default()).with_payment_policy(policy);
        cfg.app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::Data::new(api))
            .service(CheckoutRoute::<MockMarketBackend>::new());
    }
}

fn checkout_form() -> Value {
    json_body!({
        "recipient_name": "Alice Reyes",
        "recipient_phone": "0917 555 0101",
        "shipping_address": "12 Mango St, Davao",
        "payment_method": "cod"
    })
}

/// Alice's cart holds 1.5 kg of tomatoes at 10.005 and 3 eggs at 2.223.
fn expect_alices_cart(backend: &mut MockMarketBackend, eggs_available: &'static str) {
    backend.expect_cart_snapshot().with(eq(UserId(1))).times(1).returning(move |buyer| {
        let tomatoes = listing(1, "Tomatoes", "10.005", "20");
        let eggs = listing(2, "Eggs", "2.223", eggs_available);
        Ok(CartSnapshot {
            buyer_id: buyer,
            state: CartState::Active,
            lines: vec![line_view(10, &tomatoes, "1.5"), line_view(11, &eggs, "3")],
        })
    });
    backend.expect_fetch_listing().returning(move |id| match id.value() {
        1 => Ok(Some(listing(1, "Tomatoes", "10.005", "20"))),
        2 => Ok(Some(listing(2, "Eggs", "2.223", eggs_available))),
        _ => Ok(None),
    });
}

#[actix_web::test]
async fn checkout_without_identity() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_cart_snapshot().never();
    let req = TestRequest::post().uri("/checkout").set_json(checkout_form());
    let (status, _) = send_request(req, configure(backend, PaymentPolicy::Simulated)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn checkout_places_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    expect_alices_cart(&mut backend, "10");
    backend.expect_reserve().times(2).returning(|_, _| Ok(()));
    backend.expect_release().never();
    backend
        .expect_commit_order()
        .withf(|new_order| new_order.total_price.to_string() == "21.68" && new_order.cart_line_ids().len() == 2)
        .times(1)
        .returning(|new_order| {
            Ok(order(7, new_order.buyer_id.value(), &new_order.total_price.to_string(), new_order.status))
        });
    let req = as_user(TestRequest::post().uri("/checkout"), 1, Role::Buyer).set_json(checkout_form());
    let (status, body) = send_request(req, configure(backend, PaymentPolicy::Simulated)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, r#"{"order_id":7,"status":"Completed","total_price":"21.68"}"#);
}

#[actix_web::test]
async fn deferred_payments_place_pending_orders() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    expect_alices_cart(&mut backend, "10");
    backend.expect_reserve().returning(|_, _| Ok(()));
    backend.expect_commit_order().returning(|new_order| {
        Ok(order(8, new_order.buyer_id.value(), &new_order.total_price.to_string(), new_order.status))
    });
    let req = as_user(TestRequest::post().uri("/checkout"), 1, Role::Buyer).set_json(checkout_form());
    let (status, body) = send_request(req, configure(backend, PaymentPolicy::Deferred)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json(&body)["status"], "Pending");
}

#[actix_web::test]
async fn checkout_reports_every_missing_field() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_cart_snapshot().never();
    let form = json_body!({ "recipient_name": "Alice Reyes", "recipient_phone": "  ", "payment_method": "cod" });
    let req = as_user(TestRequest::post().uri("/checkout"), 1, Role::Buyer).set_json(form);
    let (status, body) = send_request(req, configure(backend, PaymentPolicy::Simulated)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json(&body)["error"],
        "Invalid request. Recipient phone number is required. Shipping address is required."
    );
}

#[actix_web::test]
async fn checkout_an_empty_cart() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_cart_snapshot().returning(|buyer| Ok(CartSnapshot::empty(buyer, CartState::Absent)));
    backend.expect_reserve().never();
    let req = as_user(TestRequest::post().uri("/checkout"), 1, Role::Buyer).set_json(checkout_form());
    let (status, body) = send_request(req, configure(backend, PaymentPolicy::Simulated)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json(&body)["error"].as_str().unwrap().ends_with("The cart is empty"));
}

#[actix_web::test]
async fn checkout_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_cart_snapshot().never();
    let req = as_user(TestRequest::post().uri("/checkout"), 9, Role::Admin).set_json(checkout_form());
    let (status, _) = send_request(req, configure(backend, PaymentPolicy::Simulated)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn stock_conflicts_are_listed() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    expect_alices_cart(&mut backend, "2");
    backend.expect_reserve().never();
    backend.expect_commit_order().never();
    let req = as_user(TestRequest::post().uri("/checkout"), 1, Role::Buyer).set_json(checkout_form());
    let (status, body) = send_request(req, configure(backend, PaymentPolicy::Simulated)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let body = json(&body);
    assert_eq!(body["error"], "1 cart line(s) cannot be fulfilled");
    let conflicts = body["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["listing_id"], 2);
    assert_eq!(conflicts[0]["product_name"], "Eggs");
    assert_eq!(conflicts[0]["requested"], "3");
    assert_eq!(conflicts[0]["available"], "2");
    assert_eq!(conflicts[0]["reason"], "insufficient_stock");
}

#[actix_web::test]
async fn failed_commit_releases_reservations() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    expect_alices_cart(&mut backend, "10");
    backend.expect_reserve().times(2).returning(|_, _| Ok(()));
    backend
        .expect_commit_order()
        .times(1)
        .returning(|_| Err(CheckoutError::CommitFailure("database is locked".to_string())));
    backend
        .expect_release()
        .with(eq(ListingId(1)), eq(Quantity::from_raw(1_500)))
        .times(1)
        .returning(|_, _| Ok(()));
    backend.expect_release().with(eq(ListingId(2)), eq(Quantity::from_units(3))).times(1).returning(|_, _| Ok(()));
    let req = as_user(TestRequest::post().uri("/checkout"), 1, Role::Buyer).set_json(checkout_form());
    let (status, body) = send_request(req, configure(backend, PaymentPolicy::Simulated)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["error"], "The order could not be placed. Please try again. database is locked");
}
