//! # Reminder Service ライブラリ
//!
//! 入札案件リマインダーの照合と通知配信を行う。
//! 結合テスト用にルーターとユースケースを公開する。

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
