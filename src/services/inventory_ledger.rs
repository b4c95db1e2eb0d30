//! Inventory mutation and its audit trail.
//!
//! All stock changes go through this module so that every decrement (or
//! restock) pairs with exactly one append-only `stock_movements` row whose
//! previous/new values match what was actually written.
//!
//! The decrement is an atomic conditional update
//! (`current_stock = current_stock - q ... WHERE current_stock >= q`,
//! checked via affected-row count) rather than a row lock, so two sales
//! racing for the last units can never both oversell, no matter what a
//! stale validation read said. A zero-row update during the write phase is
//! reported as `InsufficientStock`: someone else bought the last unit,
//! which is a legitimate business outcome rather than a system failure.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{inventory, stock_movement};
use crate::errors::ServiceError;

pub const MOVEMENT_SALE: &str = "sale";
pub const MOVEMENT_RESTOCK: &str = "restock";

/// Before/after stock levels of one applied mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub previous_stock: i32,
    pub new_stock: i32,
}

/// Loads the inventory row for a product, if any.
pub async fn find_inventory<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<Option<inventory::Model>, ServiceError> {
    Ok(inventory::Entity::find()
        .filter(inventory::Column::ProductId.eq(product_id))
        .one(conn)
        .await?)
}

/// Atomically decrements stock for one sale line and appends the matching
/// "sale" movement row linked to the in-flight transaction.
///
/// Called inside the sale's database transaction; if a later line fails,
/// the rollback also undoes this decrement and its movement row.
pub async fn reserve_and_decrement<C: ConnectionTrait>(
    conn: &C,
    transaction_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    notes: Option<String>,
) -> Result<StockChange, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::InvalidInput(format!(
            "Quantity must be positive for product {}",
            product_id
        )));
    }

    if find_inventory(conn, product_id).await?.is_none() {
        return Err(ServiceError::ProductNotFound(format!(
            "{} has no inventory record",
            product_id
        )));
    }

    let now = Utc::now();
    let result = inventory::Entity::update_many()
        .col_expr(
            inventory::Column::CurrentStock,
            Expr::col(inventory::Column::CurrentStock).sub(quantity),
        )
        .col_expr(inventory::Column::LastUpdated, Expr::value(now))
        .filter(inventory::Column::ProductId.eq(product_id))
        .filter(inventory::Column::CurrentStock.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        // Not enough stock, or a concurrent sale consumed it first. The
        // update itself is the guard; there is no separate precheck here.
        return Err(ServiceError::InsufficientStock(format!(
            "product {}: {} requested",
            product_id, quantity
        )));
    }

    // Re-read so the audit row reflects what was actually written.
    let updated = find_inventory(conn, product_id)
        .await?
        .ok_or_else(|| ServiceError::InternalError(format!("Inventory row vanished for product {}", product_id)))?;
    let change = StockChange {
        previous_stock: updated.current_stock + quantity,
        new_stock: updated.current_stock,
    };

    stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        transaction_id: Set(Some(transaction_id)),
        movement_type: Set(MOVEMENT_SALE.to_string()),
        quantity_change: Set(-quantity),
        previous_stock: Set(change.previous_stock),
        new_stock: Set(change.new_stock),
        movement_date: Set(now),
        notes: Set(notes),
    }
    .insert(conn)
    .await?;

    debug!(
        product_id = %product_id,
        previous_stock = change.previous_stock,
        new_stock = change.new_stock,
        "Stock decremented"
    );
    Ok(change)
}

/// Increments stock (receiving/restocking) and appends a "restock"
/// movement row. Not linked to a sale transaction.
pub async fn increase_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
    notes: Option<String>,
) -> Result<StockChange, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::InvalidInput(format!(
            "Quantity must be positive for product {}",
            product_id
        )));
    }

    let row = find_inventory(conn, product_id)
        .await?
        .ok_or_else(|| {
            ServiceError::ProductNotFound(format!("{} has no inventory record", product_id))
        })?;

    let now = Utc::now();
    inventory::Entity::update_many()
        .col_expr(
            inventory::Column::CurrentStock,
            Expr::col(inventory::Column::CurrentStock).add(quantity),
        )
        .col_expr(inventory::Column::LastUpdated, Expr::value(now))
        .filter(inventory::Column::Id.eq(row.id))
        .exec(conn)
        .await?;

    let updated = find_inventory(conn, product_id)
        .await?
        .ok_or_else(|| ServiceError::InternalError(format!("Inventory row vanished for product {}", product_id)))?;
    let change = StockChange {
        previous_stock: updated.current_stock - quantity,
        new_stock: updated.current_stock,
    };

    stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        transaction_id: Set(None),
        movement_type: Set(MOVEMENT_RESTOCK.to_string()),
        quantity_change: Set(quantity),
        previous_stock: Set(change.previous_stock),
        new_stock: Set(change.new_stock),
        movement_date: Set(now),
        notes: Set(notes),
    }
    .insert(conn)
    .await?;

    Ok(change)
}

/// Inventory rows at or below their minimum stock level.
pub async fn low_stock<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<inventory::Model>, ServiceError> {
    Ok(inventory::Entity::find()
        .filter(
            Expr::col(inventory::Column::CurrentStock)
                .lte(Expr::col(inventory::Column::MinStockLevel)),
        )
        .all(conn)
        .await?)
}
