//! # リポジトリ実装
//!
//! 照合と宛先解決に必要なデータストアへの読み取り専用問い合わせを提供する。
//!
//! ## 設計方針
//!
//! - **読み取り専用**: 書き込み操作は定義しない
//! - **参照切れは `Ok(None)`**: 削除済みエンティティの参照は呼び出し側でスキップ判定する
//! - **停止は `Err`**: 接続不能などのエラーは [`InfraError`](crate::InfraError) で返し、
//!   呼び出し側はトリガー 1 回分の実行を中止する
//! - **実行時クエリ**: `query_as` + `FromRow` 行構造体を `TryFrom` でドメイン型に変換する。
//!   スキーマは周辺アプリケーションが所有するため、ビルド時のスキーマ検証には依存しない

pub mod catalog_repository;
pub mod recipient_repository;
pub mod reminder_repository;
pub mod tender_repository;

pub use catalog_repository::{CatalogRepository, PostgresCatalogRepository};
pub use recipient_repository::{PostgresRecipientRepository, RecipientRepository};
pub use reminder_repository::{PostgresReminderRepository, ReminderRepository};
pub use tender_repository::{PostgresTenderRepository, TenderRepository};
