//! Point-of-sale entry point.
//!
//! Cashiers key in prices and per-line discounts at the counter, so unlike
//! online checkout the request carries its own unit prices. Customers are
//! optional; an anonymous sale is recorded against no customer and rendered
//! as "Walk-in Customer" on the receipt.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{payment, product, transaction, transaction_item, user};
use crate::errors::ServiceError;
use crate::services::pricing::SaleLine;
use crate::services::sale::{SaleOrchestrator, SaleRequest, SaleSource};

pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

const LIST_LIMIT: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PosTransactionRequest {
    /// None records a walk-in sale.
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Sale must contain at least one item"))]
    pub items: Vec<PosItemRequest>,
    /// Whole-sale discount applied after tax.
    pub discount_amount: Option<Decimal>,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosReceiptItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosTransactionResponse {
    pub transaction_id: Uuid,
    pub bill_number: String,
    pub transaction_date: DateTime<Utc>,
    pub customer_name: String,
    pub items: Vec<PosReceiptItem>,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub net_amount: Decimal,
    pub payment_method: String,
    pub status: String,
    pub cashier_name: String,
}

/// Search over POS transactions; fields combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PosTransactionQuery {
    /// Substring match on the bill number.
    pub bill_number: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosTransactionSummary {
    pub transaction_id: Uuid,
    pub bill_number: String,
    pub transaction_date: DateTime<Utc>,
    pub net_amount: Decimal,
    pub status: String,
}

#[derive(Clone)]
pub struct CashierService {
    db: Arc<DatabaseConnection>,
    orchestrator: SaleOrchestrator,
}

impl CashierService {
    pub fn new(db: Arc<DatabaseConnection>, orchestrator: SaleOrchestrator) -> Self {
        Self { db, orchestrator }
    }

    /// Processes a counter sale keyed in by the named cashier.
    #[instrument(skip(self, request), fields(cashier = %cashier_username))]
    pub async fn process_transaction(
        &self,
        cashier_username: &str,
        request: PosTransactionRequest,
    ) -> Result<PosTransactionResponse, ServiceError> {
        request.validate()?;

        let cashier = user::Entity::find()
            .filter(user::Column::Username.eq(cashier_username))
            .filter(user::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cashier {}", cashier_username)))?;

        let customer = match request.customer_id {
            Some(id) => Some(
                user::Entity::find_by_id(id)
                    .filter(user::Column::IsActive.eq(true))
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| ServiceError::CustomerNotFound(id.to_string()))?,
            ),
            None => None,
        };

        let lines: Vec<SaleLine> = request
            .items
            .iter()
            .map(|item| SaleLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                discount_amount: item.discount_amount.unwrap_or(Decimal::ZERO),
            })
            .collect();

        let completed = self
            .orchestrator
            .process_sale(SaleRequest {
                source: SaleSource::PosSale,
                customer: customer.clone(),
                staff: cashier.clone(),
                lines,
                overall_discount: request.discount_amount.unwrap_or(Decimal::ZERO),
                payment_method: request.payment_method,
                notes: request.notes,
                shipping: None,
            })
            .await?;

        let product_names = self.product_names(&completed.items).await?;
        Ok(build_receipt(
            &completed.transaction,
            &completed.items,
            &completed.payment.payment_method,
            &product_names,
            customer.as_ref().map(|c| c.full_name.clone()),
            cashier.full_name,
        ))
    }

    /// Re-renders the receipt for a committed POS sale.
    #[instrument(skip(self))]
    pub async fn get_transaction_receipt(
        &self,
        transaction_id: Uuid,
    ) -> Result<PosTransactionResponse, ServiceError> {
        let tx = transaction::Entity::find_by_id(transaction_id)
            .filter(transaction::Column::Source.eq(SaleSource::PosSale.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("POS transaction {}", transaction_id))
            })?;

        let items = transaction_item::Entity::find()
            .filter(transaction_item::Column::TransactionId.eq(tx.id))
            .order_by_asc(transaction_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let payment_method = payment::Entity::find()
            .filter(payment::Column::TransactionId.eq(tx.id))
            .one(&*self.db)
            .await?
            .map(|p| p.payment_method)
            .unwrap_or_default();

        let customer_name = match tx.customer_id {
            Some(id) => user::Entity::find_by_id(id)
                .one(&*self.db)
                .await?
                .map(|u| u.full_name),
            None => None,
        };
        let cashier_name = user::Entity::find_by_id(tx.user_id)
            .one(&*self.db)
            .await?
            .map(|u| u.full_name)
            .unwrap_or_default();

        let product_names = self.product_names(&items).await?;
        Ok(build_receipt(
            &tx,
            &items,
            &payment_method,
            &product_names,
            customer_name,
            cashier_name,
        ))
    }

    /// Lists POS transactions, newest first, capped at 100 rows.
    #[instrument(skip(self))]
    pub async fn list_pos_transactions(
        &self,
        query: PosTransactionQuery,
    ) -> Result<Vec<PosTransactionSummary>, ServiceError> {
        let mut select = transaction::Entity::find()
            .filter(transaction::Column::Source.eq(SaleSource::PosSale.as_str()));
        if let Some(bill) = &query.bill_number {
            select = select.filter(transaction::Column::BillNumber.contains(bill));
        }
        if let Some(from) = query.from_date {
            select = select.filter(transaction::Column::TransactionDate.gte(from));
        }
        if let Some(to) = query.to_date {
            select = select.filter(transaction::Column::TransactionDate.lte(to));
        }

        let rows = select
            .order_by_desc(transaction::Column::TransactionDate)
            .limit(LIST_LIMIT)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|tx| PosTransactionSummary {
                transaction_id: tx.id,
                bill_number: tx.bill_number,
                transaction_date: tx.transaction_date,
                net_amount: tx.net_amount,
                status: tx.status,
            })
            .collect())
    }

    async fn product_names(
        &self,
        items: &[transaction_item::Model],
    ) -> Result<HashMap<Uuid, String>, ServiceError> {
        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products = product::Entity::find()
            .filter(product::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?;
        Ok(products
            .into_iter()
            .map(|p| (p.id, p.product_name))
            .collect())
    }
}

fn build_receipt(
    tx: &transaction::Model,
    items: &[transaction_item::Model],
    payment_method: &str,
    product_names: &HashMap<Uuid, String>,
    customer_name: Option<String>,
    cashier_name: String,
) -> PosTransactionResponse {
    PosTransactionResponse {
        transaction_id: tx.id,
        bill_number: tx.bill_number.clone(),
        transaction_date: tx.transaction_date,
        customer_name: customer_name.unwrap_or_else(|| WALK_IN_CUSTOMER.to_string()),
        items: items
            .iter()
            .map(|item| PosReceiptItem {
                product_id: item.product_id,
                product_name: product_names
                    .get(&item.product_id)
                    .cloned()
                    .unwrap_or_default(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                discount_amount: item.discount_amount,
                line_total: item.line_total,
            })
            .collect(),
        total_amount: tx.total_amount,
        tax_amount: tx.tax_amount,
        discount_amount: tx.discount_amount,
        net_amount: tx.net_amount,
        payment_method: payment_method.to_string(),
        status: tx.status.clone(),
        cashier_name,
    }
}
