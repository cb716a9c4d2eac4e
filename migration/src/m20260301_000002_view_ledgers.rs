//! View ledger tables
//!
//! `shop_views` and `product_views` share one schema. The entity id is not a
//! foreign key: deleting a shop or product never retracts view history.
//! `ip_address` is 64 wide; the resolver maps longer header values to `unknown`.
//!
//! Indexes follow the dedup lookups:
//! - (entity, ip_address, viewed_at): address tier and anonymous tier
//! - (entity, user_id, viewed_at): authenticated tier
//! - (entity, viewed_at): stats and recency

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShopViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShopViews::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShopViews::ShopId).big_integer().not_null())
                    .col(ColumnDef::new(ShopViews::UserId).big_integer().null())
                    .col(
                        ColumnDef::new(ShopViews::IpAddress)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShopViews::UserAgent).text().not_null())
                    .col(
                        ColumnDef::new(ShopViews::ViewedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shop_views_ip")
                    .table(ShopViews::Table)
                    .col(ShopViews::ShopId)
                    .col(ShopViews::IpAddress)
                    .col(ShopViews::ViewedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shop_views_user")
                    .table(ShopViews::Table)
                    .col(ShopViews::ShopId)
                    .col(ShopViews::UserId)
                    .col(ShopViews::ViewedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shop_views_time")
                    .table(ShopViews::Table)
                    .col(ShopViews::ShopId)
                    .col(ShopViews::ViewedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductViews::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductViews::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductViews::UserId).big_integer().null())
                    .col(
                        ColumnDef::new(ProductViews::IpAddress)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductViews::UserAgent).text().not_null())
                    .col(
                        ColumnDef::new(ProductViews::ViewedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_product_views_ip")
                    .table(ProductViews::Table)
                    .col(ProductViews::ProductId)
                    .col(ProductViews::IpAddress)
                    .col(ProductViews::ViewedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_product_views_user")
                    .table(ProductViews::Table)
                    .col(ProductViews::ProductId)
                    .col(ProductViews::UserId)
                    .col(ProductViews::ViewedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_product_views_time")
                    .table(ProductViews::Table)
                    .col(ProductViews::ProductId)
                    .col(ProductViews::ViewedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in [
            "idx_product_views_time",
            "idx_product_views_user",
            "idx_product_views_ip",
            "idx_shop_views_time",
            "idx_shop_views_user",
            "idx_shop_views_ip",
        ] {
            manager
                .drop_index(Index::drop().name(index).to_owned())
                .await?;
        }

        manager
            .drop_table(Table::drop().table(ProductViews::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ShopViews::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ShopViews {
    #[sea_orm(iden = "shop_views")]
    Table,
    Id,
    ShopId,
    UserId,
    IpAddress,
    UserAgent,
    ViewedAt,
}

#[derive(DeriveIden)]
enum ProductViews {
    #[sea_orm(iden = "product_views")]
    Table,
    Id,
    ProductId,
    UserId,
    IpAddress,
    UserAgent,
    ViewedAt,
}
