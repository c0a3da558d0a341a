//! # ユースケース層
//!
//! Reminder Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリと配信チャネルを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラはトリガーを受け付けるだけで、処理はユースケースに集約
//!
//! ## モジュール構成
//!
//! - `matcher`: トリガーに一致するリマインダーの照合と参照解決
//! - `message_builder`: 通知メールの生成
//! - `dispatcher`: レート制限と再試行付きの配信
//! - `scheduler`: 期日スイープの日次起動と実行状態
//! - `notification_service`: 上記を統合したトリガーの入口

pub mod dispatcher;
pub mod matcher;
pub mod message_builder;
pub mod notification_service;
pub mod scheduler;

pub use dispatcher::{BatchReport, DispatchSettings, Dispatcher};
pub use matcher::ReminderMatcher;
pub use message_builder::MessageBuilder;
pub use notification_service::NotificationService;
pub use scheduler::{SweepOutcome, SweepSettings, spawn_daily_trigger};
