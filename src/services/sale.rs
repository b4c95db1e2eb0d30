//! Shared sale orchestration.
//!
//! Online checkout and POS sales both commit through this module. One call
//! walks a strictly linear path: validate (no writes) → price → open one
//! database transaction → header → per-line item + stock decrement +
//! movement → recompute totals from the persisted items → payment →
//! optional shipping address + online order → commit. Any failure inside
//! the write phase rolls the whole transaction back; a sale either fully
//! commits or leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::entities::{
    customer_address, online_order, payment, product, transaction, transaction_item, user,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::identifiers;
use crate::services::inventory_ledger::{self, StockChange};
use crate::services::pricing::{self, SaleLine};
use crate::services::tax_rate::TaxRateService;

pub const TRANSACTION_TYPE_SALE: &str = "sale";
pub const STATUS_COMPLETED: &str = "completed";
pub const PAYMENT_STATUS_SUCCESS: &str = "success";
pub const ORDER_STATUS_PENDING: &str = "pending";

/// Where a sale originated; stored on the transaction header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleSource {
    PosSale,
    OnlineSale,
}

impl SaleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleSource::PosSale => "pos_sale",
            SaleSource::OnlineSale => "online_sale",
        }
    }
}

/// Shipping details for the online-checkout path. Presence of this value
/// makes the orchestrator persist a customer address and an online order
/// inside the same transaction.
#[derive(Debug, Clone)]
pub struct ShippingDetails {
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub shipping_method: Option<String>,
}

/// One sale attempt, inputs already resolved to entities by the caller.
#[derive(Debug, Clone)]
pub struct SaleRequest {
    pub source: SaleSource,
    /// None for walk-in POS customers.
    pub customer: Option<user::Model>,
    /// Who processed the sale; the customer themself for online checkout.
    pub staff: user::Model,
    pub lines: Vec<SaleLine>,
    pub overall_discount: Decimal,
    pub payment_method: String,
    /// Free-form note recorded on the stock movements of this sale.
    pub notes: Option<String>,
    /// Some for the checkout path, None for POS.
    pub shipping: Option<ShippingDetails>,
}

/// Everything persisted for one committed sale.
#[derive(Debug, Clone)]
pub struct CompletedSale {
    pub transaction: transaction::Model,
    pub items: Vec<transaction_item::Model>,
    pub payment: payment::Model,
    pub shipping_address: Option<customer_address::Model>,
    pub online_order: Option<online_order::Model>,
}

struct ValidatedLine {
    product: product::Model,
    min_stock_level: i32,
}

struct WrittenSale {
    sale: CompletedSale,
    stock_changes: Vec<(Uuid, StockChange)>,
}

/// The single write path for sales.
#[derive(Clone)]
pub struct SaleOrchestrator {
    db: Arc<DatabaseConnection>,
    tax_rates: TaxRateService,
    event_sender: EventSender,
}

impl SaleOrchestrator {
    pub fn new(
        db: Arc<DatabaseConnection>,
        tax_rates: TaxRateService,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            tax_rates,
            event_sender,
        }
    }

    /// Processes one sale attempt end to end.
    ///
    /// Validation failures surface typed before any write. Once the write
    /// phase begins, any error rolls back the whole transaction and is
    /// wrapped as `TransactionFailed` — except an atomic-decrement miss,
    /// which stays `InsufficientStock` because it is a legitimate business
    /// outcome (a concurrent sale took the stock).
    #[instrument(skip(self, request), fields(source = request.source.as_str()))]
    pub async fn process_sale(&self, request: SaleRequest) -> Result<CompletedSale, ServiceError> {
        // VALIDATING: resolve every product and precheck stock. No writes.
        let validated = self.validate_lines(&request).await?;

        // PRICING: the rate is read exactly once per sale and reused for
        // the recompute step below.
        let tax_rate = self.tax_rates.get_tax_rate().await;
        let priced = pricing::price_sale(&request.lines, tax_rate, request.overall_discount)?;

        // Write phase: one ACID transaction for header, lines, stock,
        // payment and (for checkout) the order graph.
        let txn = self.db.begin().await?;
        let written = match self
            .write_sale(&txn, &request, &validated, &priced, tax_rate)
            .await
        {
            Ok(written) => written,
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, "Rollback failed after sale error");
                }
                error!(error = %err, "Sale write phase failed; rolled back");
                return Err(match err {
                    stock @ ServiceError::InsufficientStock(_) => stock,
                    other => ServiceError::TransactionFailed(other.to_string()),
                });
            }
        };
        txn.commit()
            .await
            .map_err(|e| ServiceError::TransactionFailed(format!("commit failed: {}", e)))?;

        self.publish_events(&request, &validated, &written).await;

        info!(
            transaction_id = %written.sale.transaction.id,
            bill_number = %written.sale.transaction.bill_number,
            net_amount = %written.sale.transaction.net_amount,
            "Sale committed"
        );
        Ok(written.sale)
    }

    async fn validate_lines(
        &self,
        request: &SaleRequest,
    ) -> Result<Vec<ValidatedLine>, ServiceError> {
        if request.shipping.is_some() && request.customer.is_none() {
            return Err(ServiceError::InvalidInput(
                "Online checkout requires a customer account".to_string(),
            ));
        }

        let mut validated = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = product::Entity::find_by_id(line.product_id)
                .one(&*self.db)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| ServiceError::ProductNotFound(line.product_id.to_string()))?;

            let inventory = inventory_ledger::find_inventory(&*self.db, product.id)
                .await?
                .ok_or_else(|| {
                    ServiceError::ProductNotFound(format!(
                        "{} has no inventory record",
                        product.product_name
                    ))
                })?;
            if inventory.current_stock < line.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "{}: {} on hand, {} requested",
                    product.product_name, inventory.current_stock, line.quantity
                )));
            }

            validated.push(ValidatedLine {
                product,
                min_stock_level: inventory.min_stock_level,
            });
        }
        Ok(validated)
    }

    async fn write_sale(
        &self,
        txn: &DatabaseTransaction,
        request: &SaleRequest,
        validated: &[ValidatedLine],
        priced: &pricing::PricedSale,
        tax_rate: Decimal,
    ) -> Result<WrittenSale, ServiceError> {
        let now = Utc::now();

        // PERSISTING_HEADER
        let bill_number = identifiers::generate_bill_number(txn, request.staff.id, now).await?;
        let header = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(request.customer.as_ref().map(|c| c.id)),
            user_id: Set(request.staff.id),
            bill_number: Set(bill_number),
            transaction_date: Set(now),
            total_amount: Set(priced.subtotal),
            tax_amount: Set(priced.tax),
            discount_amount: Set(priced.discount),
            net_amount: Set(priced.net),
            transaction_type: Set(TRANSACTION_TYPE_SALE.to_string()),
            status: Set(STATUS_COMPLETED.to_string()),
            source: Set(request.source.as_str().to_string()),
        }
        .insert(txn)
        .await?;

        // PERSISTING_LINES: item row, atomic decrement, movement row, in
        // request order.
        let mut stock_changes = Vec::with_capacity(request.lines.len());
        for (line, valid) in request.lines.iter().zip(validated) {
            transaction_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_id: Set(header.id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                discount_amount: Set(line.discount_amount),
                tax_amount: Set(Decimal::ZERO),
                line_total: Set(pricing::line_total(line)?),
                return_quantity: Set(0),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;

            let note = request.notes.clone().unwrap_or_else(|| match request.source {
                SaleSource::PosSale => format!("POS sale - {}", valid.product.product_name),
                SaleSource::OnlineSale => format!("Online order - {}", valid.product.product_name),
            });
            let change = inventory_ledger::reserve_and_decrement(
                txn,
                header.id,
                line.product_id,
                line.quantity,
                Some(note),
            )
            .await?;
            stock_changes.push((line.product_id, change));
        }

        // Recompute totals from the persisted items so the header can
        // never drift from what was actually written.
        let items = transaction_item::Entity::find()
            .filter(transaction_item::Column::TransactionId.eq(header.id))
            .order_by_asc(transaction_item::Column::CreatedAt)
            .all(txn)
            .await?;
        let recomputed_total: Decimal = items.iter().map(|i| i.line_total).sum();
        let recomputed_tax = pricing::round2(recomputed_total * tax_rate);
        let recomputed_net =
            pricing::round2(recomputed_total + recomputed_tax - priced.discount);

        let mut header_update: transaction::ActiveModel = header.into();
        header_update.total_amount = Set(recomputed_total);
        header_update.tax_amount = Set(recomputed_tax);
        header_update.net_amount = Set(recomputed_net);
        let header = header_update.update(txn).await?;

        // PERSISTING_PAYMENT
        let reference_number =
            identifiers::generate_payment_reference(txn, &request.payment_method).await?;
        let payment_row = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_id: Set(header.id),
            payment_method: Set(request.payment_method.clone()),
            amount_paid: Set(header.net_amount),
            payment_date: Set(now),
            status: Set(PAYMENT_STATUS_SUCCESS.to_string()),
            reference_number: Set(reference_number),
        }
        .insert(txn)
        .await?;

        // PERSISTING_ONLINE_ORDER (checkout path only)
        let (shipping_address, order) = match (&request.shipping, &request.customer) {
            (Some(shipping), Some(customer)) => {
                let address = customer_address::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(customer.id),
                    address_line1: Set(shipping.address_line1.clone()),
                    address_line2: Set(shipping.address_line2.clone()),
                    city: Set(shipping.city.clone()),
                    postal_code: Set(shipping.postal_code.clone()),
                    created_at: Set(now),
                }
                .insert(txn)
                .await?;

                let order = online_order::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(customer.id),
                    transaction_id: Set(header.id),
                    shipping_address_id: Set(address.id),
                    order_status: Set(ORDER_STATUS_PENDING.to_string()),
                    shipping_method: Set(shipping.shipping_method.clone()),
                    tracking_number: Set(None),
                    placed_at: Set(now),
                }
                .insert(txn)
                .await?;
                (Some(address), Some(order))
            }
            _ => (None, None),
        };

        Ok(WrittenSale {
            sale: CompletedSale {
                transaction: header,
                items,
                payment: payment_row,
                shipping_address,
                online_order: order,
            },
            stock_changes,
        })
    }

    async fn publish_events(
        &self,
        request: &SaleRequest,
        validated: &[ValidatedLine],
        written: &WrittenSale,
    ) {
        let tx = &written.sale.transaction;
        self.event_sender
            .send(Event::SaleCompleted {
                transaction_id: tx.id,
                bill_number: tx.bill_number.clone(),
                source: request.source.as_str().to_string(),
                net_amount: tx.net_amount,
            })
            .await;

        if let Some(order) = &written.sale.online_order {
            self.event_sender
                .send(Event::OrderPlaced {
                    order_id: order.id,
                    transaction_id: tx.id,
                    customer_id: order.customer_id,
                    placed_at: order.placed_at,
                })
                .await;
        }

        let min_levels: HashMap<Uuid, i32> = validated
            .iter()
            .map(|v| (v.product.id, v.min_stock_level))
            .collect();
        for (product_id, change) in &written.stock_changes {
            if let Some(min) = min_levels.get(product_id) {
                if change.new_stock <= *min {
                    self.event_sender
                        .send(Event::StockBelowMinimum {
                            product_id: *product_id,
                            current_stock: change.new_stock,
                            min_stock_level: *min,
                        })
                        .await;
                }
            }
        }
    }
}
