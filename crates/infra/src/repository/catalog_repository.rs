//! # CatalogRepository
//!
//! 通知メッセージに表示するカテゴリ・サブカテゴリ・地域の名称を取得するリポジトリ。
//! 参照切れは `Ok(None)` で返し、メッセージ側で "Not specified" と表示する。

use async_trait::async_trait;
use sqlx::PgPool;
use tenderwatch_domain::catalog::{
    Category,
    CategoryId,
    Region,
    RegionId,
    Subcategory,
    SubcategoryId,
};

use crate::error::InfraError;

/// カタログリポジトリトレイト
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// ID でカテゴリを検索
    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, InfraError>;

    /// ID でサブカテゴリを検索
    async fn find_subcategory(&self, id: SubcategoryId)
    -> Result<Option<Subcategory>, InfraError>;

    /// ID で地域を検索
    async fn find_region(&self, id: RegionId) -> Result<Option<Region>, InfraError>;
}

/// 名称のみを持つマスタ行
#[derive(Debug, sqlx::FromRow)]
struct NamedRow {
    id:   i64,
    name: String,
}

/// PostgreSQL 実装の CatalogRepository
#[derive(Debug, Clone)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_named(&self, sql: &'static str, id: i64) -> Result<Option<NamedRow>, InfraError> {
        let row = sqlx::query_as::<_, NamedRow>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(category_id = %id))]
    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, InfraError> {
        let row = self
            .find_named("SELECT id, name FROM categories WHERE id = $1", id.as_i64())
            .await?;

        Ok(row.map(|row| Category {
            id:   CategoryId::new(row.id),
            name: row.name,
        }))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(subcategory_id = %id))]
    async fn find_subcategory(
        &self,
        id: SubcategoryId,
    ) -> Result<Option<Subcategory>, InfraError> {
        let row = self
            .find_named("SELECT id, name FROM subcategories WHERE id = $1", id.as_i64())
            .await?;

        Ok(row.map(|row| Subcategory {
            id:   SubcategoryId::new(row.id),
            name: row.name,
        }))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(region_id = %id))]
    async fn find_region(&self, id: RegionId) -> Result<Option<Region>, InfraError> {
        let row = self
            .find_named("SELECT id, name FROM regions WHERE id = $1", id.as_i64())
            .await?;

        Ok(row.map(|row| Region {
            id:   RegionId::new(row.id),
            name: row.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresCatalogRepository>();
    }
}
