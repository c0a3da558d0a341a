//! # TenderRepository
//!
//! 期日スイープで通知内容に載せる入札案件を取得するリポジトリ。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tenderwatch_domain::{
    catalog::{CategoryId, RegionId, SubcategoryId},
    tender::{Tender, TenderId},
};

use crate::error::InfraError;

/// 入札案件リポジトリトレイト
#[async_trait]
pub trait TenderRepository: Send + Sync {
    /// ID で入札案件を検索
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(tender))`: 見つかった場合
    /// - `Ok(None)`: 削除済みなどで見つからない場合
    /// - `Err(_)`: データベースエラー
    async fn find_by_id(&self, id: TenderId) -> Result<Option<Tender>, InfraError>;
}

#[derive(Debug, sqlx::FromRow)]
struct TenderRow {
    id:               i64,
    title:            String,
    description:      Option<String>,
    category_id:      Option<i64>,
    subcategory_id:   Option<i64>,
    region_id:        Option<i64>,
    deadline:         Option<DateTime<Utc>>,
    reference_number: Option<String>,
}

impl From<TenderRow> for Tender {
    fn from(row: TenderRow) -> Self {
        Tender {
            id:               TenderId::new(row.id),
            title:            row.title,
            description:      row.description,
            category_id:      row.category_id.map(CategoryId::new),
            subcategory_id:   row.subcategory_id.map(SubcategoryId::new),
            region_id:        row.region_id.map(RegionId::new),
            deadline:         row.deadline,
            reference_number: row.reference_number,
        }
    }
}

/// PostgreSQL 実装の TenderRepository
#[derive(Debug, Clone)]
pub struct PostgresTenderRepository {
    pool: PgPool,
}

impl PostgresTenderRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenderRepository for PostgresTenderRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(tender_id = %id))]
    async fn find_by_id(&self, id: TenderId) -> Result<Option<Tender>, InfraError> {
        let row = sqlx::query_as::<_, TenderRow>(
            r#"
            SELECT
                id, title, description, category_id, subcategory_id, region_id,
                deadline, reference_number
            FROM tenders
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tender::from))
    }
}
