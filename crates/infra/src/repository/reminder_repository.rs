//! # ReminderRepository
//!
//! 照合の候補となるリマインダーを取得するリポジトリ。
//!
//! ## 設計方針
//!
//! - **候補の絞り込みのみ**: SQL 側の条件は照合述語と同じ規則で候補を減らすためのもので、
//!   最終判定は呼び出し側で [`MatchTrigger`](tenderwatch_domain::matching::MatchTrigger)
//!   が行う
//! - **NULL は一致しない**: `category_id = NULL` は SQL 上 NULL（偽扱い）になるため、
//!   未指定同士が一致とみなされることはない

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tenderwatch_domain::{
    catalog::{CategoryId, RegionId, SubcategoryId},
    recipient::{CustomerId, UserId},
    reminder::{Reminder, ReminderId, ReminderType},
    sweep::SweepWindow,
    tender::{Tender, TenderId},
};

use crate::error::InfraError;

/// リマインダーリポジトリトレイト
#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// 新規入札案件の照合候補を取得する
    ///
    /// 期日が `now` より後で、案件 ID・カテゴリ・サブカテゴリ・地域のいずれかが
    /// 案件と一致するリマインダーを返す。
    async fn find_creation_candidates(
        &self,
        tender: &Tender,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, InfraError>;

    /// 期日スイープの照合候補を取得する
    ///
    /// 期日種別で、入札案件を参照し、期日が対象期間内にあるリマインダーを返す。
    async fn find_sweep_candidates(&self, window: &SweepWindow)
    -> Result<Vec<Reminder>, InfraError>;
}

/// DB の reminders テーブルの行を表す中間構造体
///
/// `TryFrom` で `Reminder` への変換ロジックを一箇所に集約する。
#[derive(Debug, sqlx::FromRow)]
struct ReminderRow {
    id:             i64,
    user_id:        Option<i64>,
    customer_id:    Option<i64>,
    tender_id:      Option<i64>,
    category_id:    Option<i64>,
    subcategory_id: Option<i64>,
    region_id:      Option<i64>,
    due_date:       DateTime<Utc>,
    reminder_type:  String,
    message:        Option<String>,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = InfraError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        let reminder_type = row.reminder_type.parse::<ReminderType>().map_err(|e| {
            InfraError::invalid_data(
                "Reminder",
                row.id,
                format!("未知の通知種別 {:?}: {e}", row.reminder_type),
            )
        })?;

        Ok(Reminder {
            id: ReminderId::new(row.id),
            user_id: row.user_id.map(UserId::new),
            customer_id: row.customer_id.map(CustomerId::new),
            tender_id: row.tender_id.map(TenderId::new),
            category_id: row.category_id.map(CategoryId::new),
            subcategory_id: row.subcategory_id.map(SubcategoryId::new),
            region_id: row.region_id.map(RegionId::new),
            due_date: row.due_date,
            reminder_type,
            message: row.message,
        })
    }
}

/// PostgreSQL 実装の ReminderRepository
#[derive(Debug, Clone)]
pub struct PostgresReminderRepository {
    pool: PgPool,
}

impl PostgresReminderRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderRepository for PostgresReminderRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(tender_id = %tender.id))]
    async fn find_creation_candidates(
        &self,
        tender: &Tender,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, InfraError> {
        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"
            SELECT
                id, user_id, customer_id, tender_id, category_id, subcategory_id,
                region_id, due_date, type AS reminder_type, message
            FROM reminders
            WHERE due_date > $1
              AND (
                   tender_id = $2
                OR category_id = $3
                OR subcategory_id = $4
                OR region_id = $5
              )
            ORDER BY id
            "#,
        )
        .bind(now)
        .bind(tender.id.as_i64())
        .bind(tender.category_id.map(|id| id.as_i64()))
        .bind(tender.subcategory_id.map(|id| id.as_i64()))
        .bind(tender.region_id.map(|id| id.as_i64()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reminder::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_sweep_candidates(
        &self,
        window: &SweepWindow,
    ) -> Result<Vec<Reminder>, InfraError> {
        let due_date_type: &'static str = ReminderType::DueDate.into();

        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"
            SELECT
                id, user_id, customer_id, tender_id, category_id, subcategory_id,
                region_id, due_date, type AS reminder_type, message
            FROM reminders
            WHERE type = $1
              AND tender_id IS NOT NULL
              AND due_date BETWEEN $2 AND $3
            ORDER BY due_date, id
            "#,
        )
        .bind(due_date_type)
        .bind(window.start())
        .bind(window.end())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reminder::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(reminder_type: &str) -> ReminderRow {
        ReminderRow {
            id:             12,
            user_id:        None,
            customer_id:    Some(4),
            tender_id:      Some(1),
            category_id:    None,
            subcategory_id: None,
            region_id:      Some(7),
            due_date:       Utc.with_ymd_and_hms(2025, 8, 3, 9, 0, 0).unwrap(),
            reminder_type:  reminder_type.to_string(),
            message:        Some("現地説明会あり".to_string()),
        }
    }

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresReminderRepository>();
    }

    #[test]
    fn test_行からリマインダーに変換できる() {
        let reminder = Reminder::try_from(row("due_date")).unwrap();

        assert_eq!(reminder.id, ReminderId::new(12));
        assert_eq!(reminder.customer_id, Some(CustomerId::new(4)));
        assert_eq!(reminder.tender_id, Some(TenderId::new(1)));
        assert_eq!(reminder.region_id, Some(RegionId::new(7)));
        assert_eq!(reminder.reminder_type, ReminderType::DueDate);
        assert_eq!(reminder.message.as_deref(), Some("現地説明会あり"));
    }

    #[test]
    fn test_未知の通知種別は不正データエラーになる() {
        let err = Reminder::try_from(row("weekly")).unwrap_err();

        assert!(err.to_string().contains("Reminder(id=12)"));
    }
}
