use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_catalog_tables::Users;
use super::m20250301_000002_create_sale_ledger_tables::Transactions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CustomerAddresses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerAddresses::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CustomerAddresses::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(CustomerAddresses::AddressLine1)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerAddresses::AddressLine2)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(CustomerAddresses::City).string().not_null())
                    .col(
                        ColumnDef::new(CustomerAddresses::PostalCode)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerAddresses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_addresses_user")
                            .from(CustomerAddresses::Table, CustomerAddresses::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One online order per transaction; POS sales have no row here.
        manager
            .create_table(
                Table::create()
                    .table(OnlineOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OnlineOrders::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OnlineOrders::CustomerId).uuid().not_null())
                    .col(
                        ColumnDef::new(OnlineOrders::TransactionId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OnlineOrders::ShippingAddressId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OnlineOrders::OrderStatus)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(OnlineOrders::ShippingMethod)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(OnlineOrders::TrackingNumber)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(OnlineOrders::PlacedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_online_orders_customer")
                            .from(OnlineOrders::Table, OnlineOrders::CustomerId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_online_orders_transaction")
                            .from(OnlineOrders::Table, OnlineOrders::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_online_orders_shipping_address")
                            .from(OnlineOrders::Table, OnlineOrders::ShippingAddressId)
                            .to(CustomerAddresses::Table, CustomerAddresses::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OnlineOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CustomerAddresses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum CustomerAddresses {
    Table,
    Id,
    UserId,
    AddressLine1,
    AddressLine2,
    City,
    PostalCode,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum OnlineOrders {
    Table,
    Id,
    CustomerId,
    TransactionId,
    ShippingAddressId,
    OrderStatus,
    ShippingMethod,
    TrackingNumber,
    PlacedAt,
}
