//! # カタログ
//!
//! 入札案件とリマインダーが参照する分類マスタ（カテゴリ、サブカテゴリ、地域）。
//! 通知メッセージには名称のみを表示する。

use serde::{Deserialize, Serialize};

define_id! {
    /// カテゴリ ID
    pub struct CategoryId;
}

define_id! {
    /// サブカテゴリ ID
    pub struct SubcategoryId;
}

define_id! {
    /// 地域 ID
    pub struct RegionId;
}

/// カテゴリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id:   CategoryId,
    pub name: String,
}

/// サブカテゴリ
///
/// 親カテゴリへの参照は通知では使用しないため保持しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id:   SubcategoryId,
    pub name: String,
}

/// 地域
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id:   RegionId,
    pub name: String,
}
