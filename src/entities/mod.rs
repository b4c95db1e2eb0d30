//! SeaORM entities for the gift center schema.
//!
//! One module per table. Monetary columns are `rust_decimal::Decimal`,
//! primary keys are application-generated UUIDs.

pub mod customer_address;
pub mod inventory;
pub mod online_order;
pub mod payment;
pub mod product;
pub mod stock_movement;
pub mod transaction;
pub mod transaction_item;
pub mod user;
