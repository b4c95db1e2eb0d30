use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_catalog_tables::{Products, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Sale header. The unique constraint on bill_number is the
        // authoritative uniqueness guard; the generator's lookup is only an
        // optimization.
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::CustomerId).uuid().null())
                    .col(ColumnDef::new(Transactions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Transactions::BillNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::TransactionDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::TotalAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Transactions::TaxAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Transactions::DiscountAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Transactions::NetAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Transactions::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Status).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::Source)
                            .string()
                            .not_null()
                            .default("pos_sale"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_customer")
                            .from(Transactions::Table, Transactions::CustomerId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_user")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_source_date")
                    .table(Transactions::Table)
                    .col(Transactions::Source)
                    .col(Transactions::TransactionDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::TransactionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::UnitPrice)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::DiscountAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::TaxAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::LineTotal)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::ReturnQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_items_transaction")
                            .from(TransactionItems::Table, TransactionItems::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_items_product")
                            .from(TransactionItems::Table, TransactionItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transaction_items_transaction")
                    .table(TransactionItems::Table)
                    .col(TransactionItems::TransactionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Payments::TransactionId).uuid().not_null())
                    .col(ColumnDef::new(Payments::PaymentMethod).string().not_null())
                    .col(
                        ColumnDef::new(Payments::AmountPaid)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payments::PaymentDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Status).string().not_null())
                    .col(
                        ColumnDef::new(Payments::ReferenceNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_transaction")
                            .from(Payments::Table, Payments::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Append-only audit trail reconciling inventory changes to sales.
        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                    .col(ColumnDef::new(StockMovements::TransactionId).uuid().null())
                    .col(
                        ColumnDef::new(StockMovements::MovementType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::QuantityChange)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::PreviousStock)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::NewStock)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::MovementDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::Notes).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_product")
                            .from(StockMovements::Table, StockMovements::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_transaction")
                            .from(StockMovements::Table, StockMovements::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_product")
                    .table(StockMovements::Table)
                    .col(StockMovements::ProductId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TransactionItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Transactions {
    Table,
    Id,
    CustomerId,
    UserId,
    BillNumber,
    TransactionDate,
    TotalAmount,
    TaxAmount,
    DiscountAmount,
    NetAmount,
    TransactionType,
    Status,
    Source,
}

#[derive(DeriveIden)]
pub enum TransactionItems {
    Table,
    Id,
    TransactionId,
    ProductId,
    Quantity,
    UnitPrice,
    DiscountAmount,
    TaxAmount,
    LineTotal,
    ReturnQuantity,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Payments {
    Table,
    Id,
    TransactionId,
    PaymentMethod,
    AmountPaid,
    PaymentDate,
    Status,
    ReferenceNumber,
}

#[derive(DeriveIden)]
pub enum StockMovements {
    Table,
    Id,
    ProductId,
    TransactionId,
    MovementType,
    QuantityChange,
    PreviousStock,
    NewStock,
    MovementDate,
    Notes,
}
