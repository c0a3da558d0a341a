//! # RecipientRepository
//!
//! リマインダーの所有者（ユーザー / 顧客）を通知の受信者として解決するリポジトリ。
//!
//! ## 設計方針
//!
//! - **所有者種別ごとのテーブル**: ユーザーは `users`、顧客は `customers` から取得する
//! - **宛先の検証はしない**: メールアドレス未登録の受信者もそのまま返し、
//!   送信可否は [`Recipient::address`] で呼び出し側が判断する

use async_trait::async_trait;
use sqlx::PgPool;
use tenderwatch_domain::{
    recipient::{Recipient, RecipientKind},
    reminder::ReminderOwner,
};

use crate::error::InfraError;

/// 受信者リポジトリトレイト
#[async_trait]
pub trait RecipientRepository: Send + Sync {
    /// 所有者から受信者を検索
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(recipient))`: 見つかった場合
    /// - `Ok(None)`: 削除済みなどで見つからない場合
    /// - `Err(_)`: データベースエラー
    async fn find_by_owner(&self, owner: ReminderOwner) -> Result<Option<Recipient>, InfraError>;
}

#[derive(Debug, sqlx::FromRow)]
struct RecipientRow {
    name:  Option<String>,
    email: Option<String>,
}

/// PostgreSQL 実装の RecipientRepository
#[derive(Debug, Clone)]
pub struct PostgresRecipientRepository {
    pool: PgPool,
}

impl PostgresRecipientRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientRepository for PostgresRecipientRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(?owner))]
    async fn find_by_owner(&self, owner: ReminderOwner) -> Result<Option<Recipient>, InfraError> {
        let (kind, sql, id) = match owner {
            ReminderOwner::User(id) => (
                RecipientKind::User,
                "SELECT name, email FROM users WHERE id = $1",
                id.as_i64(),
            ),
            ReminderOwner::Customer(id) => (
                RecipientKind::Customer,
                "SELECT name, email FROM customers WHERE id = $1",
                id.as_i64(),
            ),
        };

        let row = sqlx::query_as::<_, RecipientRow>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Recipient {
            kind,
            name: row.name,
            email: row.email,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresRecipientRepository>();
    }
}
