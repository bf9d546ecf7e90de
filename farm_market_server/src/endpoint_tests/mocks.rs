use farm_market_engine::{
    db_types::{
        CartLine,
        CartLineId,
        CartSnapshot,
        CartState,
        Listing,
        ListingId,
        NewOrder,
        Order,
        OrderId,
        OrderLine,
        OrderStatusType,
        UserId,
    },
    CartError,
    CartManagement,
    CheckoutError,
    InventoryLedger,
    LedgerError,
    OrderHistoryError,
    OrderManagement,
};
use fm_common::Quantity;
use mockall::mock;

mock! {
    pub MarketBackend {}
    impl CartManagement for MarketBackend {
        async fn add_or_merge(&self, buyer: UserId, listing_id: ListingId, quantity: Quantity) -> Result<CartLine, CartError>;
        async fn set_quantity(&self, buyer: UserId, line_id: CartLineId, quantity: Quantity) -> Result<Option<CartLine>, CartError>;
        async fn remove_line(&self, buyer: UserId, line_id: CartLineId) -> Result<(), CartError>;
        async fn cart_snapshot(&self, buyer: UserId) -> Result<CartSnapshot, CartError>;
        async fn cart_state(&self, buyer: UserId) -> Result<CartState, CartError>;
        async fn line_count(&self, buyer: UserId) -> Result<i64, CartError>;
    }
    impl InventoryLedger for MarketBackend {
        async fn fetch_listing(&self, listing_id: ListingId) -> Result<Option<Listing>, LedgerError>;
        async fn reserve(&self, listing_id: ListingId, quantity: Quantity) -> Result<(), LedgerError>;
        async fn release(&self, listing_id: ListingId, quantity: Quantity) -> Result<(), LedgerError>;
    }
    impl OrderManagement for MarketBackend {
        async fn commit_order(&self, order: NewOrder) -> Result<Order, CheckoutError>;
        async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderHistoryError>;
        async fn fetch_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, OrderHistoryError>;
        async fn fetch_orders_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>, OrderHistoryError>;
        async fn update_order_status(&self, order_id: OrderId, from: OrderStatusType, to: OrderStatusType) -> Result<Option<Order>, OrderHistoryError>;
    }
}
