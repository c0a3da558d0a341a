//! # TenderWatch 共有ユーティリティ
//!
//! ワークスペース全体で使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - 外部クレートへの依存は最小限に抑え、トレーシング初期化は
//!   `observability` feature の背後に置く

pub mod event_log;
pub mod health;
pub mod observability;

pub use health::HealthResponse;
