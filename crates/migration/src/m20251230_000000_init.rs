//! Initial schema migration.
//!
//! Creates the complete ledger schema:
//!
//! - `users`: callers resolved by the auth layer (role + assigned shop)
//! - `shops`: tenants, owned by an admin user
//! - `accounts`: cash, bank, customer and expense-category accounts
//! - `transactions`: double-entry movements between two accounts
//! - `balance_history`: audit trail of out-of-band balance adjustments
//!
//! Every row below `shops` carries a `shop_id` so tenancy can be enforced
//! with a single filter.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    Role,
    ShopId,
}

#[derive(Iden)]
enum Shops {
    Table,
    Id,
    Name,
    NameLocal,
    Code,
    OwnerId,
    Timezone,
    Active,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    ShopId,
    Category,
    Name,
    NameLocal,
    OpeningBalance,
    CurrentBalance,
    IsDefault,
    Active,
    Version,
    CreatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    ShopId,
    Kind,
    AmountMinor,
    AmountPaidMinor,
    DebitAccountId,
    CreditAccountId,
    Description,
    CreatedAt,
    CreatedBy,
    IdempotencyKey,
    ReversedAt,
    ReversedBy,
    ReversalOf,
}

#[derive(Iden)]
enum BalanceHistory {
    Table,
    Id,
    AccountId,
    ShopId,
    PreviousBalance,
    NewBalance,
    ChangeAmount,
    ChangeReason,
    CreatedAt,
    CreatedBy,
    IdempotencyKey,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("staff"),
                    )
                    .col(ColumnDef::new(Users::ShopId).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Shops
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Shops::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Shops::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Shops::Name).string().not_null())
                    .col(ColumnDef::new(Shops::NameLocal).string())
                    .col(ColumnDef::new(Shops::Code).string().not_null())
                    .col(ColumnDef::new(Shops::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(Shops::Timezone)
                            .string()
                            .not_null()
                            .default("UTC"),
                    )
                    .col(
                        ColumnDef::new(Shops::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Shops::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-shops-owner_id")
                            .from(Shops::Table, Shops::OwnerId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-shops-code-unique")
                    .table(Shops::Table)
                    .col(Shops::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::ShopId).string().not_null())
                    .col(ColumnDef::new(Accounts::Category).string().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::NameLocal).string())
                    .col(
                        ColumnDef::new(Accounts::OpeningBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::CurrentBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Accounts::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-shop_id")
                            .from(Accounts::Table, Accounts::ShopId)
                            .to(Shops::Table, Shops::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-shop_id-category")
                    .table(Accounts::Table)
                    .col(Accounts::ShopId)
                    .col(Accounts::Category)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::ShopId).string().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::AmountPaidMinor).big_integer())
                    .col(
                        ColumnDef::new(Transactions::DebitAccountId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreditAccountId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Transactions::IdempotencyKey).string())
                    .col(ColumnDef::new(Transactions::ReversedAt).timestamp())
                    .col(ColumnDef::new(Transactions::ReversedBy).string())
                    .col(ColumnDef::new(Transactions::ReversalOf).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-shop_id")
                            .from(Transactions::Table, Transactions::ShopId)
                            .to(Shops::Table, Shops::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-debit_account_id")
                            .from(Transactions::Table, Transactions::DebitAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-credit_account_id")
                            .from(Transactions::Table, Transactions::CreditAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-shop_id-created_at")
                    .table(Transactions::Table)
                    .col(Transactions::ShopId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Balance history
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BalanceHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BalanceHistory::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BalanceHistory::AccountId).string().not_null())
                    .col(ColumnDef::new(BalanceHistory::ShopId).string().not_null())
                    .col(
                        ColumnDef::new(BalanceHistory::PreviousBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceHistory::NewBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceHistory::ChangeAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceHistory::ChangeReason)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceHistory::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BalanceHistory::CreatedBy).string().not_null())
                    .col(ColumnDef::new(BalanceHistory::IdempotencyKey).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balance_history-account_id")
                            .from(BalanceHistory::Table, BalanceHistory::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balance_history-shop_id")
                            .from(BalanceHistory::Table, BalanceHistory::ShopId)
                            .to(Shops::Table, Shops::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-balance_history-account_id-created_at")
                    .table(BalanceHistory::Table)
                    .col(BalanceHistory::AccountId)
                    .col(BalanceHistory::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BalanceHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Shops::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
