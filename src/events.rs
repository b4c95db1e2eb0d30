use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the sale path. Events are sent only after the
/// owning database transaction has committed, so consumers never observe a
/// sale that later rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A sale committed (either source).
    SaleCompleted {
        transaction_id: Uuid,
        bill_number: String,
        source: String,
        net_amount: Decimal,
    },
    /// An online order was placed alongside its sale.
    OrderPlaced {
        order_id: Uuid,
        transaction_id: Uuid,
        customer_id: Uuid,
        placed_at: DateTime<Utc>,
    },
    /// A sale left a product at or below its minimum stock level.
    StockBelowMinimum {
        product_id: Uuid,
        current_stock: i32,
        min_stock_level: i32,
    },
    /// The configured tax rate changed.
    TaxRateUpdated { old_rate: Decimal, new_rate: Decimal },
}

/// Cloneable handle for publishing events to the processing loop.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging instead of failing if the receiver is gone.
    /// Event delivery is best-effort by design; the sale has already
    /// committed by the time anything is published.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!(error = %e, "Event receiver dropped; event discarded");
        }
    }
}

/// Consumes and logs events until all senders are dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::SaleCompleted {
                transaction_id,
                bill_number,
                source,
                net_amount,
            } => {
                info!(
                    transaction_id = %transaction_id,
                    bill_number = %bill_number,
                    source = %source,
                    net_amount = %net_amount,
                    "Sale completed"
                );
            }
            Event::OrderPlaced {
                order_id,
                transaction_id,
                ..
            } => {
                info!(order_id = %order_id, transaction_id = %transaction_id, "Online order placed");
            }
            Event::StockBelowMinimum {
                product_id,
                current_stock,
                min_stock_level,
            } => {
                warn!(
                    product_id = %product_id,
                    current_stock = %current_stock,
                    min_stock_level = %min_stock_level,
                    "Product at or below minimum stock level"
                );
            }
            Event::TaxRateUpdated { old_rate, new_rate } => {
                info!(old_rate = %old_rate, new_rate = %new_rate, "Tax rate updated");
            }
        }
    }
}
