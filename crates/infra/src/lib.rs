//! # TenderWatch インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートはリポジトリトレイトと配信チャネルトレイト、およびその具体的な実装を
//! 提供する。外部システムの詳細をカプセル化し、照合・配信のユースケースを
//! インフラの変更から保護する。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への読み取り専用接続プール管理
//! - **リポジトリ実装**: リマインダー・入札案件・カタログ・受信者の参照
//! - **配信チャネル**: SMTP / Noop によるメール送信
//!
//! ## 依存関係
//!
//! ```text
//! reminder-service → infra → domain
//!          ↘
//!            shared
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - 配信チャネル
//! - [`repository`] - リポジトリ実装
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use tenderwatch_infra::{db, repository::PostgresReminderRepository};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/tenders").await?;
//!     let reminders = PostgresReminderRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod repository;

pub use error::{InfraError, InfraErrorKind};
pub use notification::NotificationSender;
