use std::time::Duration;

use actix_web::{
    dev::Server,
    error::JsonPayloadError,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use farm_market_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CartApi,
    CheckoutApi,
    OrderHistoryApi,
    SqliteDatabase,
};
use futures::FutureExt;
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        AddCartItemRoute,
        CartCountRoute,
        CheckoutRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        RemoveCartItemRoute,
        UpdateCartItemRoute,
        UpdateOrderStatusRoute,
        ViewCartRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_options(&config.database_url, config.max_connections, config.busy_timeout)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    } else {
        info!("🚀️ FM_RUN_MIGRATIONS is off. Assuming the database schema is up to date.");
    }
    let handlers = EventHandlers::new(128, order_log_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    info!("🚀️ New orders will be placed with {} payments", config.payment_policy);
    let payment_policy = config.payment_policy;
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(db.clone());
        let checkout_api = CheckoutApi::new(db.clone(), producers.clone()).with_payment_policy(payment_policy);
        let history_api = OrderHistoryApi::new(db.clone(), producers.clone());
        let api_scope = web::scope("/api")
            .service(ViewCartRoute::<SqliteDatabase>::new())
            .service(CartCountRoute::<SqliteDatabase>::new())
            .service(AddCartItemRoute::<SqliteDatabase>::new())
            .service(UpdateCartItemRoute::<SqliteDatabase>::new())
            .service(RemoveCartItemRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("fm::access_log"))
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(history_api))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Malformed JSON bodies get the same `{"error": ...}` shape as every other failure.
pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Could not read JSON body. {err}");
    ServerError::InvalidRequestBody(err.to_string()).into()
}

/// The server's own subscribers to order events. They only write to the log.
fn order_log_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_placed(|ev| {
            async move {
                info!(
                    "📬️ Order {} placed: {} line(s), total {}, status {}",
                    ev.order.id,
                    ev.lines.len(),
                    ev.order.total_price,
                    ev.order.status
                );
            }
            .boxed()
        })
        .on_order_status_changed(|ev| {
            async move {
                info!("📬️ Order {} moved from {} to {}", ev.order.id, ev.old_status, ev.new_status());
            }
            .boxed()
        });
    hooks
}
