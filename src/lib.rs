//! Gift Center API Library
//!
//! This crate provides the sale and inventory core for the gift-shop
//! backend: shared transaction orchestration for online checkout and
//! point-of-sale, an audited inventory ledger, pricing, and business
//! identifier generation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod services;

use std::path::PathBuf;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;

use services::cashier::CashierService;
use services::checkout::CheckoutService;
use services::sale::SaleOrchestrator;
use services::tax_rate::TaxRateService;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub tax_rate_service: TaxRateService,
    pub checkout_service: CheckoutService,
    pub cashier_service: CashierService,
}

impl AppState {
    /// Wires up the service graph over an established connection. The
    /// returned receiver feeds [`events::process_events`].
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
    ) -> (Self, mpsc::Receiver<events::Event>) {
        let (tx, rx) = mpsc::channel(100);
        let event_sender = events::EventSender::new(tx);

        let tax_rate_service = TaxRateService::new(
            config.default_tax_rate,
            config.tax_config_path.as_ref().map(PathBuf::from),
            event_sender.clone(),
        );
        let orchestrator = SaleOrchestrator::new(
            db.clone(),
            tax_rate_service.clone(),
            event_sender.clone(),
        );
        let checkout_service = CheckoutService::new(db.clone(), orchestrator.clone());
        let cashier_service = CashierService::new(db.clone(), orchestrator);

        (
            Self {
                db,
                config,
                event_sender,
                tax_rate_service,
                checkout_service,
                cashier_service,
            },
            rx,
        )
    }
}
