#![allow(dead_code)]

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{AccountCategory, Caller, Engine, NewAccountCmd, NewShopCmd};
use migration::MigratorTrait;

/// A migrated in-memory database with one shop owned by `alice` and one
/// default account per category. Cash opens at 1000.00.
pub struct Fixture {
    pub engine: Engine,
    pub db: DatabaseConnection,
    pub owner: Caller,
    pub shop_id: Uuid,
    pub cash: Uuid,
    pub bank: Uuid,
    pub customer: Uuid,
    pub expense: Uuid,
}

pub const CASH_OPENING: i64 = 100_000;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    engine_at("sqlite::memory:").await
}

pub async fn engine_at(url: &str) -> (Engine, DatabaseConnection) {
    let db = Database::connect(url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub async fn insert_user(db: &DatabaseConnection, username: &str, role: &str, shop_id: Option<Uuid>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password, role, shop_id) VALUES (?, ?, ?, ?)",
        vec![
            username.into(),
            "password".into(),
            role.into(),
            shop_id.map(|id| id.to_string()).into(),
        ],
    ))
    .await
    .unwrap();
}

pub async fn account(
    engine: &Engine,
    caller: &Caller,
    shop_id: Uuid,
    category: AccountCategory,
    name: &str,
    opening_balance: i64,
) -> Uuid {
    engine
        .create_account(
            caller,
            NewAccountCmd::new(shop_id, category, name).opening_balance(opening_balance),
        )
        .await
        .unwrap()
        .id
}

pub async fn shop_with_accounts(
    engine: &Engine,
    owner: &Caller,
    name: &str,
    code: &str,
) -> (Uuid, [Uuid; 4]) {
    let shop_id = engine
        .create_shop(owner, NewShopCmd::new(name, code))
        .await
        .unwrap()
        .id;
    let cash = account(engine, owner, shop_id, AccountCategory::Cash, "Drawer", CASH_OPENING).await;
    let bank = account(engine, owner, shop_id, AccountCategory::Bank, "Bank", 0).await;
    let customer = account(engine, owner, shop_id, AccountCategory::Customer, "Walk-in", 0).await;
    let expense = account(engine, owner, shop_id, AccountCategory::ExpenseCategory, "Rent", 0).await;
    (shop_id, [cash, bank, customer, expense])
}

pub async fn fixture() -> Fixture {
    fixture_at("sqlite::memory:").await
}

/// Same as [`fixture`] on the database at `url`.
pub async fn fixture_at(url: &str) -> Fixture {
    let (engine, db) = engine_at(url).await;
    insert_user(&db, "alice", "admin", None).await;
    let owner = Caller::admin("alice");
    let (shop_id, [cash, bank, customer, expense]) =
        shop_with_accounts(&engine, &owner, "Main street", "MAIN").await;
    Fixture {
        engine,
        db,
        owner,
        shop_id,
        cash,
        bank,
        customer,
        expense,
    }
}

/// A second shop owned by `bob`.
pub async fn foreign_shop(fx: &Fixture) -> (Caller, Uuid, [Uuid; 4]) {
    insert_user(&fx.db, "bob", "admin", None).await;
    let bob = Caller::admin("bob");
    let (shop_id, accounts) = shop_with_accounts(&fx.engine, &bob, "Harbour", "HARB").await;
    (bob, shop_id, accounts)
}

pub async fn balance(fx: &Fixture, account_id: Uuid) -> i64 {
    fx.engine
        .account(&fx.owner, account_id)
        .await
        .unwrap()
        .current_balance
}

pub async fn assert_no_drift(fx: &Fixture, caller: &Caller, shop_id: Uuid) {
    let audits = fx.engine.audit_balances(caller, shop_id).await.unwrap();
    for audit in audits {
        assert_eq!(audit.drift, 0, "drift on {}", audit.name);
    }
}
