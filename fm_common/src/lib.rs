mod fixed_point;
mod money;
mod quantity;

pub mod helpers;
pub mod op;

pub use fixed_point::FixedPointParseError;
pub use money::{Money, CURRENCY_DECIMALS, MONEY_DECIMALS};
pub use quantity::{Quantity, QUANTITY_DECIMALS};
