//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use farm_market_engine::{
    cart_objects::{AddToCartRequest, CartCount, UpdateCartLineRequest},
    checkout_objects::CheckoutRequest,
    db_types::{CartLineId, OrderId, Role},
    order_objects::{OrderPlaced, UpdateOrderStatusRequest},
    CartApi,
    CartManagement,
    CheckoutApi,
    CheckoutDatabase,
    OrderHistoryApi,
    OrderManagement,
};
use log::*;

use crate::{data_objects::JsonResponse, errors::ServerError, identity::Caller};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(view_cart => Get "/cart" impl CartManagement);
/// The caller's cart with its lines joined to the live listings, and the derived total.
pub async fn view_cart<B: CartManagement>(
    caller: Caller,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET cart for {}", *caller);
    let cart = api.view_cart(&caller).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(cart_count => Get "/cart/count" impl CartManagement);
/// The number of lines in the caller's cart, for the cart badge. Always zero for farmers and admins.
pub async fn cart_count<B: CartManagement>(
    caller: Caller,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let count = api.cart_line_count(&caller).await?;
    Ok(HttpResponse::Ok().json(CartCount { count }))
}

route!(add_cart_item => Post "/cart/items" impl CartManagement);
pub async fn add_cart_item<B: CartManagement>(
    caller: Caller,
    api: web::Data<CartApi<B>>,
    body: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, ServerError> {
    let AddToCartRequest { listing_id, quantity } = body.into_inner();
    debug!("💻️ {} is adding {quantity} of listing {listing_id} to the cart", *caller);
    let line = api.add_or_merge(&caller, listing_id, quantity).await?;
    Ok(HttpResponse::Created().json(line))
}

route!(update_cart_item => Put "/cart/items/{line_id}" impl CartManagement);
/// Replaces the quantity of a cart line. A quantity of zero or less removes the line.
pub async fn update_cart_item<B: CartManagement>(
    caller: Caller,
    api: web::Data<CartApi<B>>,
    path: web::Path<i64>,
    body: web::Json<UpdateCartLineRequest>,
) -> Result<HttpResponse, ServerError> {
    let line_id = CartLineId(path.into_inner());
    match api.set_quantity(&caller, line_id, body.quantity).await? {
        Some(line) => Ok(HttpResponse::Ok().json(line)),
        None => Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Cart line {line_id} removed")))),
    }
}

route!(remove_cart_item => Delete "/cart/items/{line_id}" impl CartManagement);
pub async fn remove_cart_item<B: CartManagement>(
    caller: Caller,
    api: web::Data<CartApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let line_id = CartLineId(path.into_inner());
    api.remove(&caller, line_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Cart line {line_id} removed"))))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl CheckoutDatabase);
/// Places an order for everything in the caller's cart.
///
/// If the client disconnects mid-request, the engine still runs the attempt until it either commits or releases every
/// reservation it made.
pub async fn checkout<B: CheckoutDatabase>(
    caller: Caller,
    api: web::Data<CheckoutApi<B>>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, ServerError> {
    let identity = caller.0;
    let request = body.into_inner();
    debug!("💻️ Checkout requested by {identity}");
    let order = api.checkout(&identity, request).await?;
    Ok(HttpResponse::Created().json(OrderPlaced::from(&order)))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement);
/// The caller's orders, newest first.
pub async fn my_orders<B: OrderManagement>(
    caller: Caller,
    api: web::Data<OrderHistoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.orders_for_buyer(&caller).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement);
/// A single order and its line snapshots. Buyers can only see their own orders; admins can see any order.
pub async fn order_by_id<B: OrderManagement>(
    caller: Caller,
    api: web::Data<OrderHistoryApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    trace!("💻️ GET order {order_id} for {}", *caller);
    let order = api.order_by_id(&caller, order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Put "/orders/{order_id}/status" impl OrderManagement where requires [Role::Admin]);
pub async fn update_order_status<B: OrderManagement>(
    caller: Caller,
    api: web::Data<OrderHistoryApi<B>>,
    path: web::Path<i64>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    info!("💻️ {} is moving order {order_id} to {}", *caller, body.status);
    let order = api.update_status(&caller, order_id, body.status).await?;
    Ok(HttpResponse::Ok().json(order))
}
