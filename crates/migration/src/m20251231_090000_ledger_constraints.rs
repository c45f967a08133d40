//! Storage-level guards for ledger invariants.
//!
//! - at most one default account per `(shop_id, category)` (partial unique
//!   index, so clearing and setting a default must happen in one transaction)
//! - idempotency keys are unique per shop/caller for transactions and per
//!   account/caller for balance adjustments

use sea_orm_migration::{prelude::*, sea_orm::ConnectionTrait};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Transactions {
    Table,
    ShopId,
    CreatedBy,
    IdempotencyKey,
}

#[derive(Iden)]
enum BalanceHistory {
    Table,
    AccountId,
    CreatedBy,
    IdempotencyKey,
}

const DEFAULT_ACCOUNT_INDEX: &str = "uidx-accounts-shop_id-category-default";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // sea-query has no portable partial index builder.
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"{DEFAULT_ACCOUNT_INDEX}\" \
                 ON accounts (shop_id, category) WHERE is_default"
            ))
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-transactions-shop_id-created_by-idempotency_key")
                    .table(Transactions::Table)
                    .col(Transactions::ShopId)
                    .col(Transactions::CreatedBy)
                    .col(Transactions::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-balance_history-account_id-created_by-idempotency_key")
                    .table(BalanceHistory::Table)
                    .col(BalanceHistory::AccountId)
                    .col(BalanceHistory::CreatedBy)
                    .col(BalanceHistory::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("uidx-balance_history-account_id-created_by-idempotency_key")
                    .table(BalanceHistory::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("uidx-transactions-shop_id-created_by-idempotency_key")
                    .table(Transactions::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&format!("DROP INDEX IF EXISTS \"{DEFAULT_ACCOUNT_INDEX}\""))
            .await?;

        Ok(())
    }
}
