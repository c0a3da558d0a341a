//! DB コネクション管理の統合テスト
//!
//! テーブルへのアクセスは不要で、セッションの読み取り専用設定のみ確認する。
//!
//! 実行方法:
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p tenderwatch-infra --test db_test -- --ignored
//! ```

use tenderwatch_infra::db;

/// テスト用の DATABASE_URL
fn database_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set")
}

#[tokio::test]
#[ignore = "PostgreSQL が必要"]
async fn test_接続は読み取り専用セッションになる() {
    let sut = db::create_pool(&database_url()).await.unwrap();

    let row: (String,) = sqlx::query_as("SHOW default_transaction_read_only")
        .fetch_one(&sut)
        .await
        .unwrap();

    assert_eq!(row.0, "on");
}

#[tokio::test]
#[ignore = "PostgreSQL が必要"]
async fn test_書き込みは拒否される() {
    let sut = db::create_pool(&database_url()).await.unwrap();

    let result = sqlx::query("CREATE TEMP TABLE probe (id int)")
        .execute(&sut)
        .await;

    assert!(result.is_err());
}
