//! # 入札案件
//!
//! 周辺アプリケーションが作成する入札案件の読み取り専用スナップショット。
//! 新規作成イベントで照合トリガーになり、期日スイープでは通知内容の参照先になる。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    DomainError,
    catalog::{CategoryId, RegionId, SubcategoryId},
};

define_id! {
    /// 入札案件 ID
    pub struct TenderId;
}

/// 入札案件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tender {
    pub id:               TenderId,
    pub title:            String,
    pub description:      Option<String>,
    pub category_id:      Option<CategoryId>,
    pub subcategory_id:   Option<SubcategoryId>,
    pub region_id:        Option<RegionId>,
    pub deadline:         Option<DateTime<Utc>>,
    pub reference_number: Option<String>,
}

impl Tender {
    /// 分類なしの入札案件を作成する
    pub fn new(id: TenderId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            category_id: None,
            subcategory_id: None,
            region_id: None,
            deadline: None,
            reference_number: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_subcategory(mut self, subcategory_id: SubcategoryId) -> Self {
        self.subcategory_id = Some(subcategory_id);
        self
    }

    pub fn with_region(mut self, region_id: RegionId) -> Self {
        self.region_id = Some(region_id);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_reference_number(mut self, reference_number: impl Into<String>) -> Self {
        self.reference_number = Some(reference_number.into());
        self
    }

    /// 外部から受け取った入札案件の最低限の整合性を検証する
    ///
    /// 件名が空の案件は通知の件名を組み立てられないため拒否する。
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty() {
            return Err(DomainError::Validation(format!(
                "入札案件の件名は必須です: tender_id={}",
                self.id
            )));
        }
        Ok(())
    }
}
