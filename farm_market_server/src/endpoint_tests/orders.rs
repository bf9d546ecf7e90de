use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use farm_market_engine::{
    db_types::{ListingId, OrderId, OrderLine, OrderStatusType, Role, UserId},
    events::EventProducers,
    OrderHistoryApi,
};
use mockall::predicate::eq;
use serde_json::json as json_body;

use super::{
    helpers::{as_user, json, order, send_request},
    mocks::MockMarketBackend,
};
use crate::{
    routes::{MyOrdersRoute, OrderByIdRoute, UpdateOrderStatusRoute},
    server::json_error,
};

fn configure(backend: MockMarketBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::Data::new(OrderHistoryApi::new(backend, EventProducers::default())))
            .service(MyOrdersRoute::<MockMarketBackend>::new())
            .service(OrderByIdRoute::<MockMarketBackend>::new())
            .service(UpdateOrderStatusRoute::<MockMarketBackend>::new());
    }
}

fn order_line(order_id: OrderId) -> OrderLine {
    OrderLine {
        id: 1,
        order_id,
        listing_id: Some(ListingId(1)),
        product_name: "Tomatoes".to_string(),
        product_unit: "kg".to_string(),
        quantity: "1.5".parse().unwrap(),
        price_per_unit: "10.005".parse().unwrap(),
    }
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_orders_for_buyer().with(eq(UserId(1))).times(1).returning(|buyer| {
        Ok(vec![
            order(4, buyer.value(), "8.00", OrderStatusType::Pending),
            order(2, buyer.value(), "21.68", OrderStatusType::Completed),
        ])
    });
    let req = as_user(TestRequest::get().uri("/orders"), 1, Role::Buyer);
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let orders = json(&body);
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["id"], 4);
    assert_eq!(orders[1]["total_price"], "21.68");
}

#[actix_web::test]
async fn fetch_my_orders_no_headers() {
    let _ = env_logger::try_init().ok();
    let backend = MockMarketBackend::new();
    let (status, body) = send_request(TestRequest::get().uri("/orders"), configure(backend)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Authentication Error. The fm-user-id header is required");
}

#[actix_web::test]
async fn fetch_my_orders_as_farmer() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_orders_for_buyer().never();
    let req = as_user(TestRequest::get().uri("/orders"), 100, Role::Farmer);
    let (status, _) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn fetch_own_order_with_lines() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend
        .expect_fetch_order()
        .with(eq(OrderId(3)))
        .returning(|id| Ok(Some(order(id.value(), 1, "15.01", OrderStatusType::Completed))));
    backend.expect_fetch_order_lines().with(eq(OrderId(3))).returning(|id| Ok(vec![order_line(id)]));
    let req = as_user(TestRequest::get().uri("/orders/3"), 1, Role::Buyer);
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let order = json(&body);
    assert_eq!(order["id"], 3);
    assert_eq!(order["buyer_id"], 1);
    assert_eq!(order["lines"][0]["product_name"], "Tomatoes");
    assert_eq!(order["lines"][0]["price_per_unit"], "10.005");
}

#[actix_web::test]
async fn try_fetch_another_buyers_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.value(), 1, "15.01", OrderStatusType::Completed))));
    backend.expect_fetch_order_lines().never();
    let req = as_user(TestRequest::get().uri("/orders/3"), 2, Role::Buyer);
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["error"], "Insufficient Permissions. Order #3 does not belong to Buyer user #2");
}

#[actix_web::test]
async fn fetch_another_buyers_order_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.value(), 1, "15.01", OrderStatusType::Completed))));
    backend.expect_fetch_order_lines().returning(|id| Ok(vec![order_line(id)]));
    let req = as_user(TestRequest::get().uri("/orders/3"), 9, Role::Admin);
    let (status, _) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(None));
    let req = as_user(TestRequest::get().uri("/orders/404"), 1, Role::Buyer);
    let (status, _) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn update_status_as_buyer() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_order().never();
    backend.expect_update_order_status().never();
    let req = as_user(TestRequest::put().uri("/orders/3/status"), 1, Role::Buyer)
        .set_json(json_body!({ "status": "Cancelled" }));
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["error"], "Insufficient Permissions. Buyer users cannot access this route");
}

#[actix_web::test]
async fn update_status_without_identity() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_update_order_status().never();
    let req = TestRequest::put().uri("/orders/3/status").set_json(json_body!({ "status": "Cancelled" }));
    let (status, _) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn update_status_as_admin() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.value(), 1, "8.00", OrderStatusType::Pending))));
    backend
        .expect_update_order_status()
        .with(eq(OrderId(3)), eq(OrderStatusType::Pending), eq(OrderStatusType::Processing))
        .times(1)
        .returning(|id, _, to| Ok(Some(order(id.value(), 1, "8.00", to))));
    let req = as_user(TestRequest::put().uri("/orders/3/status"), 9, Role::Admin)
        .set_json(json_body!({ "status": "Processing" }));
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "Processing");
}

#[actix_web::test]
async fn completed_orders_cannot_be_cancelled() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockMarketBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.value(), 1, "8.00", OrderStatusType::Completed))));
    backend.expect_update_order_status().never();
    let req = as_user(TestRequest::put().uri("/orders/3/status"), 9, Role::Admin)
        .set_json(json_body!({ "status": "Cancelled" }));
    let (status, body) = send_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        json(&body)["error"],
        "The request conflicts with the current state. An order cannot move from Completed to Cancelled"
    );
}
