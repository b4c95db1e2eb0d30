//! Online checkout entry point.
//!
//! Resolves the customer account, prices cart lines from the catalog (the
//! storefront never supplies its own prices) and hands off to the shared
//! sale orchestrator, which also persists the shipping address and the
//! "pending" online order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{product, user};
use crate::errors::ServiceError;
use crate::services::pricing::SaleLine;
use crate::services::sale::{SaleOrchestrator, SaleRequest, SaleSource, ShippingDetails};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ShippingAddressInput {
    #[validate(length(min = 1, message = "Address line is required"))]
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Postal code is required"))]
    pub postal_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Cart must contain at least one item"))]
    pub items: Vec<CheckoutItem>,
    #[validate]
    pub shipping_address: ShippingAddressInput,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    pub shipping_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub transaction_id: Uuid,
    pub bill_number: String,
    pub reference_number: String,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub net_amount: Decimal,
    pub order_status: String,
    pub placed_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    orchestrator: SaleOrchestrator,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>, orchestrator: SaleOrchestrator) -> Self {
        Self { db, orchestrator }
    }

    /// Processes an online checkout for the named customer account.
    #[instrument(skip(self, request), fields(username = %username))]
    pub async fn process_checkout(
        &self,
        username: &str,
        request: CheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        request.validate()?;

        let customer = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .filter(user::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::CustomerNotFound(username.to_string()))?;

        let lines = self.price_from_catalog(&request.items).await?;

        let completed = self
            .orchestrator
            .process_sale(SaleRequest {
                source: SaleSource::OnlineSale,
                customer: Some(customer.clone()),
                staff: customer,
                lines,
                overall_discount: Decimal::ZERO,
                payment_method: request.payment_method,
                notes: None,
                shipping: Some(ShippingDetails {
                    address_line1: request.shipping_address.address_line1,
                    address_line2: request.shipping_address.address_line2,
                    city: request.shipping_address.city,
                    postal_code: request.shipping_address.postal_code,
                    shipping_method: request.shipping_method,
                }),
            })
            .await?;

        let order = completed
            .online_order
            .ok_or_else(|| ServiceError::InternalError("Checkout produced no order".to_string()))?;
        Ok(CheckoutResponse {
            order_id: order.id,
            transaction_id: completed.transaction.id,
            bill_number: completed.transaction.bill_number,
            reference_number: completed.payment.reference_number,
            total_amount: completed.transaction.total_amount,
            tax_amount: completed.transaction.tax_amount,
            net_amount: completed.transaction.net_amount,
            order_status: order.order_status,
            placed_at: order.placed_at,
        })
    }

    /// Unit prices always come from the catalog, not the request.
    async fn price_from_catalog(
        &self,
        items: &[CheckoutItem],
    ) -> Result<Vec<SaleLine>, ServiceError> {
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = product::Entity::find_by_id(item.product_id)
                .one(&*self.db)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| ServiceError::ProductNotFound(item.product_id.to_string()))?;
            lines.push(SaleLine {
                product_id: product.id,
                quantity: item.quantity,
                unit_price: product.unit_price,
                discount_amount: Decimal::ZERO,
            });
        }
        Ok(lines)
    }
}
