mod common;

use assert_matches::assert_matches;
use giftcenter_api::entities::{inventory, payment, stock_movement, transaction, transaction_item};
use giftcenter_api::errors::ServiceError;
use chrono::Utc;
use giftcenter_api::services::cashier::{
    PosItemRequest, PosTransactionQuery, PosTransactionRequest, WALK_IN_CUSTOMER,
};
use giftcenter_api::services::identifiers;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use common::TestApp;

fn pos_request(product_id: Uuid, quantity: i32) -> PosTransactionRequest {
    PosTransactionRequest {
        customer_id: None,
        items: vec![PosItemRequest {
            product_id,
            quantity,
            unit_price: dec!(100.00),
            discount_amount: None,
        }],
        discount_amount: None,
        payment_method: "Cash".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn pos_sale_commits_totals_stock_and_movement() {
    let app = TestApp::new().await;
    app.state.tax_rate_service.update_tax_rate(dec!(0.08)).await;

    let cashier = app.seed_user("jane.cashier", "cashier").await;
    let product = app.seed_stocked_product("MUG-001", dec!(100.00), 10).await;

    let receipt = app
        .state
        .cashier_service
        .process_transaction(&cashier.username, pos_request(product.id, 3))
        .await
        .expect("sale should commit");

    assert_eq!(receipt.total_amount, dec!(300.00));
    assert_eq!(receipt.tax_amount, dec!(24.00));
    assert_eq!(receipt.net_amount, dec!(324.00));
    assert_eq!(receipt.customer_name, WALK_IN_CUSTOMER);
    assert_eq!(receipt.cashier_name, cashier.full_name);
    assert!(receipt.bill_number.starts_with("DVP"));
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].line_total, dec!(300.00));
    assert_eq!(receipt.items[0].product_name, product.product_name);

    let stock = inventory::Entity::find()
        .filter(inventory::Column::ProductId.eq(product.id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stock.current_stock, 7);

    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(product.id))
        .all(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, "sale");
    assert_eq!(movements[0].quantity_change, -3);
    assert_eq!(movements[0].previous_stock, 10);
    assert_eq!(movements[0].new_stock, 7);
    assert_eq!(movements[0].transaction_id, Some(receipt.transaction_id));

    let paid = payment::Entity::find()
        .filter(payment::Column::TransactionId.eq(receipt.transaction_id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(paid.amount_paid, dec!(324.00));
    assert!(paid.reference_number.starts_with("REF-CASH"));
}

#[tokio::test]
async fn insufficient_stock_leaves_no_rows_behind() {
    let app = TestApp::new().await;
    let cashier = app.seed_user("sam.cashier", "cashier").await;
    let product = app.seed_stocked_product("VASE-001", dec!(100.00), 10).await;

    let err = app
        .state
        .cashier_service
        .process_transaction(&cashier.username, pos_request(product.id, 15))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert!(err.is_rejection());

    let transactions = transaction::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(transactions.is_empty());
    let items = transaction_item::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(items.is_empty());
    let movements = stock_movement::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(movements.is_empty());

    let stock = inventory::Entity::find()
        .filter(inventory::Column::ProductId.eq(product.id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stock.current_stock, 10);
}

#[tokio::test]
async fn write_phase_stock_miss_stays_typed_and_rolls_back() {
    let app = TestApp::new().await;
    let cashier = app.seed_user("ivy.cashier", "cashier").await;
    let product = app.seed_stocked_product("PLATE-001", dec!(10.00), 10).await;

    // Each line passes the validation precheck against stock 10, but the
    // second conditional decrement finds only 4 left inside the write
    // phase. That miss must surface as InsufficientStock, not as a wrapped
    // transaction failure, and must undo the first line's decrement.
    let request = PosTransactionRequest {
        customer_id: None,
        items: vec![
            PosItemRequest {
                product_id: product.id,
                quantity: 6,
                unit_price: dec!(10.00),
                discount_amount: None,
            },
            PosItemRequest {
                product_id: product.id,
                quantity: 6,
                unit_price: dec!(10.00),
                discount_amount: None,
            },
        ],
        discount_amount: None,
        payment_method: "Cash".to_string(),
        notes: None,
    };
    let result = app
        .state
        .cashier_service
        .process_transaction(&cashier.username, request)
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));

    let stock = inventory::Entity::find()
        .filter(inventory::Column::ProductId.eq(product.id))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stock.current_stock, 10);

    let transactions = transaction::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(transactions.is_empty());
    let movements = stock_movement::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(movements.is_empty());
}

#[tokio::test]
async fn receipt_read_back_matches_committed_sale() {
    let app = TestApp::new().await;
    app.state.tax_rate_service.update_tax_rate(dec!(0.08)).await;

    let cashier = app.seed_user("rita.cashier", "cashier").await;
    let customer = app.seed_user("bob.customer", "customer").await;
    let product = app.seed_stocked_product("CARD-001", dec!(100.00), 10).await;

    let mut request = pos_request(product.id, 2);
    request.customer_id = Some(customer.id);
    let committed = app
        .state
        .cashier_service
        .process_transaction(&cashier.username, request)
        .await
        .unwrap();

    let reread = app
        .state
        .cashier_service
        .get_transaction_receipt(committed.transaction_id)
        .await
        .unwrap();

    assert_eq!(reread.bill_number, committed.bill_number);
    assert_eq!(reread.customer_name, customer.full_name);
    assert_eq!(reread.net_amount, committed.net_amount);
    assert_eq!(reread.payment_method, committed.payment_method);
    assert_eq!(reread.items.len(), committed.items.len());
}

#[tokio::test]
async fn receipt_lookup_rejects_unknown_transaction() {
    let app = TestApp::new().await;
    let result = app
        .state
        .cashier_service
        .get_transaction_receipt(Uuid::new_v4())
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn consecutive_sales_get_distinct_identifiers() {
    let app = TestApp::new().await;
    let cashier = app.seed_user("ann.cashier", "cashier").await;
    let product = app.seed_stocked_product("PEN-001", dec!(100.00), 10).await;

    let first = app
        .state
        .cashier_service
        .process_transaction(&cashier.username, pos_request(product.id, 1))
        .await
        .unwrap();
    let second = app
        .state
        .cashier_service
        .process_transaction(&cashier.username, pos_request(product.id, 1))
        .await
        .unwrap();

    assert_ne!(first.bill_number, second.bill_number);

    let payments = payment::Entity::find().all(&*app.state.db).await.unwrap();
    assert_eq!(payments.len(), 2);
    assert_ne!(payments[0].reference_number, payments[1].reference_number);
}

#[tokio::test]
async fn bill_number_collision_walks_the_fallback_chain() {
    let app = TestApp::new().await;
    let cashier = app.seed_user("tia.cashier", "cashier").await;

    let now = Utc::now();
    let staff_ref = cashier.id.simple().to_string()[..6].to_uppercase();
    let base = format!(
        "DVP{}{}{}",
        now.format("%y%m%d"),
        staff_ref,
        now.format("%H%M%S")
    );
    let with_millis = format!("{}{}", base, now.format("%3f"));

    // Occupy both the base candidate and the millisecond candidate so the
    // generator is forced onto the random-suffix fallback.
    app.seed_transaction(cashier.id, &base).await;
    app.seed_transaction(cashier.id, &with_millis).await;

    let bill = identifiers::generate_bill_number(&*app.state.db, cashier.id, now)
        .await
        .unwrap();
    assert_ne!(bill, base);
    assert_ne!(bill, with_millis);
    assert!(bill.starts_with(&with_millis));
    assert_eq!(bill.len(), with_millis.len() + 2);

    let taken = transaction::Entity::find()
        .filter(transaction::Column::BillNumber.eq(bill.as_str()))
        .one(&*app.state.db)
        .await
        .unwrap();
    assert!(taken.is_none());
}

#[tokio::test]
async fn bill_number_without_collision_uses_the_base_form() {
    let app = TestApp::new().await;
    let cashier = app.seed_user("uma.cashier", "cashier").await;

    let now = Utc::now();
    let staff_ref = cashier.id.simple().to_string()[..6].to_uppercase();
    let expected = format!(
        "DVP{}{}{}",
        now.format("%y%m%d"),
        staff_ref,
        now.format("%H%M%S")
    );

    let bill = identifiers::generate_bill_number(&*app.state.db, cashier.id, now)
        .await
        .unwrap();
    assert_eq!(bill, expected);
}

#[tokio::test]
async fn unknown_customer_is_rejected_before_any_write() {
    let app = TestApp::new().await;
    let cashier = app.seed_user("leo.cashier", "cashier").await;
    let product = app.seed_stocked_product("BOX-001", dec!(100.00), 10).await;

    let mut request = pos_request(product.id, 1);
    request.customer_id = Some(Uuid::new_v4());
    let err = app
        .state
        .cashier_service
        .process_transaction(&cashier.username, request)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::CustomerNotFound(_));
    assert!(err.is_rejection());

    let transactions = transaction::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(transactions.is_empty());
}

#[tokio::test]
async fn header_totals_reconcile_with_persisted_items() {
    let app = TestApp::new().await;
    app.state.tax_rate_service.update_tax_rate(dec!(0.10)).await;

    let cashier = app.seed_user("max.cashier", "cashier").await;
    let mug = app.seed_stocked_product("MUG-020", dec!(10.00), 10).await;
    let card = app.seed_stocked_product("CARD-020", dec!(4.50), 10).await;

    let request = PosTransactionRequest {
        customer_id: None,
        items: vec![
            PosItemRequest {
                product_id: mug.id,
                quantity: 2,
                unit_price: dec!(10.00),
                discount_amount: Some(dec!(5.00)),
            },
            PosItemRequest {
                product_id: card.id,
                quantity: 3,
                unit_price: dec!(4.50),
                discount_amount: None,
            },
        ],
        discount_amount: Some(dec!(2.00)),
        payment_method: "Credit Card".to_string(),
        notes: None,
    };
    let receipt = app
        .state
        .cashier_service
        .process_transaction(&cashier.username, request)
        .await
        .unwrap();

    // (2*10 - 5) + 3*4.50 = 28.50; tax 2.85; net 28.50 + 2.85 - 2.00
    assert_eq!(receipt.total_amount, dec!(28.50));
    assert_eq!(receipt.tax_amount, dec!(2.85));
    assert_eq!(receipt.discount_amount, dec!(2.00));
    assert_eq!(receipt.net_amount, dec!(29.35));

    let items = transaction_item::Entity::find()
        .filter(transaction_item::Column::TransactionId.eq(receipt.transaction_id))
        .all(&*app.state.db)
        .await
        .unwrap();
    let item_sum: rust_decimal::Decimal = items.iter().map(|i| i.line_total).sum();
    assert_eq!(item_sum, receipt.total_amount);

    let header = transaction::Entity::find_by_id(receipt.transaction_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.total_amount, item_sum);
    assert_eq!(header.net_amount, dec!(29.35));
}

#[tokio::test]
async fn listing_filters_by_bill_substring() {
    let app = TestApp::new().await;
    let cashier = app.seed_user("kim.cashier", "cashier").await;
    let product = app.seed_stocked_product("TOY-001", dec!(100.00), 10).await;

    let committed = app
        .state
        .cashier_service
        .process_transaction(&cashier.username, pos_request(product.id, 1))
        .await
        .unwrap();

    let all = app
        .state
        .cashier_service
        .list_pos_transactions(PosTransactionQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].bill_number, committed.bill_number);

    let matched = app
        .state
        .cashier_service
        .list_pos_transactions(PosTransactionQuery {
            bill_number: Some("DVP".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(matched.len(), 1);

    let unmatched = app
        .state
        .cashier_service
        .list_pos_transactions(PosTransactionQuery {
            bill_number: Some("ZZZ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(unmatched.is_empty());
}
