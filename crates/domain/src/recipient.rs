//! # 受信者
//!
//! リマインダーの所有者（システムユーザーまたは顧客）を通知の宛先として表現する。
//! リマインダーごとに遅延解決される。

use serde::{Deserialize, Serialize};

define_id! {
    /// システムユーザー ID
    pub struct UserId;
}

define_id! {
    /// 顧客 ID
    pub struct CustomerId;
}

/// 受信者名が空のときに表示する名前
pub const FALLBACK_RECIPIENT_NAME: &str = "User";

/// 受信者の種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum RecipientKind {
    User,
    Customer,
}

/// 通知の受信者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub kind:  RecipientKind,
    pub name:  Option<String>,
    pub email: Option<String>,
}

impl Recipient {
    /// 送信可能なメールアドレス
    ///
    /// 未登録または空白のみの場合は `None`。
    pub fn address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// 表示名（空の場合は [`FALLBACK_RECIPIENT_NAME`]）
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_RECIPIENT_NAME)
    }
}
