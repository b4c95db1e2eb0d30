use std::sync::Arc;

use chrono::Utc;
use giftcenter_api::{
    config::AppConfig,
    db,
    entities::{inventory, product, transaction, user},
    events, AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

/// Helper harness backed by a throwaway file-based SQLite database.
///
/// The pool is capped at one connection so SQLite never reports a busy
/// database; concurrent callers queue on the pool instead.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir");
        let db_path = db_dir.path().join("giftcenter_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (state, rx) = AppState::new(Arc::new(pool), cfg);
        let event_task = tokio::spawn(events::process_events(rx));

        Self {
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    pub async fn seed_user(&self, username: &str, role: &str) -> user::Model {
        self.seed_user_with_status(username, role, true).await
    }

    pub async fn seed_user_with_status(
        &self,
        username: &str,
        role: &str,
        is_active: bool,
    ) -> user::Model {
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            full_name: Set(format!("{} Test", username)),
            email: Set(Some(format!("{}@example.com", username))),
            phone: Set(None),
            role: Set(role.to_string()),
            is_active: Set(is_active),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed user")
    }

    pub async fn seed_product(&self, code: &str, unit_price: Decimal) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_name: Set(format!("Gift {}", code)),
            product_code: Set(code.to_string()),
            unit_price: Set(unit_price),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_inventory(
        &self,
        product_id: Uuid,
        current_stock: i32,
        min_stock_level: i32,
    ) -> inventory::Model {
        inventory::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            current_stock: Set(current_stock),
            min_stock_level: Set(min_stock_level),
            max_stock_level: Set(Some(1000)),
            last_updated: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed inventory")
    }

    /// Seeds a committed sale header occupying the given bill number.
    pub async fn seed_transaction(&self, user_id: Uuid, bill_number: &str) -> transaction::Model {
        transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(None),
            user_id: Set(user_id),
            bill_number: Set(bill_number.to_string()),
            transaction_date: Set(Utc::now()),
            total_amount: Set(Decimal::ZERO),
            tax_amount: Set(Decimal::ZERO),
            discount_amount: Set(Decimal::ZERO),
            net_amount: Set(Decimal::ZERO),
            transaction_type: Set("sale".to_string()),
            status: Set("completed".to_string()),
            source: Set("pos_sale".to_string()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed transaction")
    }

    /// Seeds a product plus its inventory row in one call.
    pub async fn seed_stocked_product(
        &self,
        code: &str,
        unit_price: Decimal,
        current_stock: i32,
    ) -> product::Model {
        let product = self.seed_product(code, unit_price).await;
        self.seed_inventory(product.id, current_stock, 2).await;
        product
    }
}
