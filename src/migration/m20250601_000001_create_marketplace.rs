use sea_orm_migration::sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entity::{AuditLogs, CartItems, Carts, Products, Purchases, cart_items};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        create_table(manager, &schema, Products).await?;
        create_table(manager, &schema, Carts).await?;
        create_table(manager, &schema, CartItems).await?;
        create_table(manager, &schema, Purchases).await?;
        create_table(manager, &schema, AuditLogs).await?;

        for mut index in schema
            .create_index_from_entity(Products)
            .into_iter()
            .chain(schema.create_index_from_entity(Purchases))
        {
            manager.create_index(index.if_not_exists().to_owned()).await?;
        }

        // One line per product per cart; re-adding merges quantities.
        manager
            .create_index(
                Index::create()
                    .name("idx-cart_items-cart_id-product_id")
                    .table(CartItems)
                    .col(cart_items::Column::CartId)
                    .col(cart_items::Column::ProductId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Checkout evicts a sold product from every cart by product id.
        manager
            .create_index(
                Index::create()
                    .name("idx-cart_items-product_id")
                    .table(CartItems)
                    .col(cart_items::Column::ProductId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(AuditLogs).if_exists().to_owned(),
            Table::drop().table(Purchases).if_exists().to_owned(),
            Table::drop().table(CartItems).if_exists().to_owned(),
            Table::drop().table(Carts).if_exists().to_owned(),
            Table::drop().table(Products).if_exists().to_owned(),
        ] {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}

async fn create_table<E: EntityTrait>(
    manager: &SchemaManager<'_>,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr> {
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}
