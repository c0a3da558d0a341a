//! # リマインダー
//!
//! 受信者が登録した「条件に合う入札案件が出たら知らせてほしい」「この案件の期日が
//! 近づいたら知らせてほしい」という常設の依頼。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 |
//! |---|------------|
//! | [`Reminder`] | リマインダー（照合用スナップショット） |
//! | [`ReminderType`] | 通知種別（新着案件 / 期日） |
//! | [`ReminderOwner`] | 所有者（通知の受信者） |
//!
//! ## 設計方針
//!
//! - **フィルタは独立した Option**: `tender_id` / `category_id` / `subcategory_id` /
//!   `region_id` はそれぞれ未指定を許し、照合は [`crate::matching`] で行う
//! - **所有者はユーザー優先**: データ上は `user_id` と `customer_id` の両方が入り得るため、
//!   [`Reminder::owners`] はユーザーを先に、顧客を後に返す
//! - **読み取り専用**: 作成・更新・削除は周辺アプリケーションが行う

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{CategoryId, RegionId, SubcategoryId},
    recipient::{CustomerId, UserId},
    tender::TenderId,
};

define_id! {
    /// リマインダー ID
    pub struct ReminderId;
}

/// 通知種別
///
/// `reminders.type` カラムに snake_case で格納される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    /// 新着案件: 条件に合う案件が作成されたら通知する
    NewTender,
    /// 期日: 参照する案件の期日が近づいたら通知する
    DueDate,
}

/// リマインダーの所有者
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOwner {
    User(UserId),
    Customer(CustomerId),
}

/// リマインダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id:             ReminderId,
    pub user_id:        Option<UserId>,
    pub customer_id:    Option<CustomerId>,
    pub tender_id:      Option<TenderId>,
    pub category_id:    Option<CategoryId>,
    pub subcategory_id: Option<SubcategoryId>,
    pub region_id:      Option<RegionId>,
    pub due_date:       DateTime<Utc>,
    pub reminder_type:  ReminderType,
    pub message:        Option<String>,
}

impl Reminder {
    /// フィルタ・所有者なしのリマインダーを作成する
    pub fn new(id: ReminderId, due_date: DateTime<Utc>, reminder_type: ReminderType) -> Self {
        Self {
            id,
            user_id: None,
            customer_id: None,
            tender_id: None,
            category_id: None,
            subcategory_id: None,
            region_id: None,
            due_date,
            reminder_type,
            message: None,
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_tender(mut self, tender_id: TenderId) -> Self {
        self.tender_id = Some(tender_id);
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

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// 通知の受信者候補を優先順に返す
    ///
    /// ユーザーを先に、顧客を後に並べる。宛先解決はこの順で試し、
    /// 最初に解決できた所有者を受信者とする。
    pub fn owners(&self) -> impl Iterator<Item = ReminderOwner> {
        self.user_id
            .map(ReminderOwner::User)
            .into_iter()
            .chain(self.customer_id.map(ReminderOwner::Customer))
    }
}
