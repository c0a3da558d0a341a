//! # TenderWatch ドメイン層
//!
//! リマインダー照合と通知配信エンジンの中核となるドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **読み取り専用スナップショット**: リマインダー、入札案件、カタログ、受信者は
//!   周辺アプリケーションが所有する。このクレートはそれらの読み取り専用の写しを扱う
//! - **純粋関数による照合**: [`matching::MatchTrigger`] がトリガーとリマインダーの
//!   照合判定を I/O なしで行う
//! - **インフラ非依存**: データストアやメール送信の詳細には一切依存しない
//!
//! ## 依存関係の方向
//!
//! ```text
//! reminder-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`reminder`] - リマインダーと所有者
//! - [`tender`] - 入札案件
//! - [`catalog`] - カテゴリ / サブカテゴリ / 地域
//! - [`recipient`] - 通知の受信者（ユーザー / 顧客）
//! - [`matching`] - トリガーとリマインダーの照合述語
//! - [`sweep`] - 期日スイープの対象期間
//! - [`notification`] - メールメッセージと配信エラー
//! - [`clock`] - 時刻プロバイダ
//!
//! ## 使用例
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tenderwatch_domain::{
//!     catalog::CategoryId,
//!     matching::MatchTrigger,
//!     reminder::{Reminder, ReminderId, ReminderType},
//!     tender::{Tender, TenderId},
//! };
//!
//! let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
//! let tender = Tender::new(TenderId::new(1), "道路補修工事").with_category(CategoryId::new(5));
//! let reminder = Reminder::new(
//!     ReminderId::new(10),
//!     now + chrono::TimeDelta::days(7),
//!     ReminderType::NewTender,
//! )
//! .with_category(CategoryId::new(5));
//!
//! let trigger = MatchTrigger::TenderCreated { tender: &tender, now };
//! assert!(trigger.matches(&reminder));
//! ```

#[macro_use]
mod macros;

pub mod catalog;
pub mod clock;
pub mod error;
pub mod matching;
pub mod notification;
pub mod recipient;
pub mod reminder;
pub mod sweep;
pub mod tender;

pub use error::DomainError;
