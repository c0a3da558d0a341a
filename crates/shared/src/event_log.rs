//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! `jq` で調査しやすいよう、ログフィールドの命名規約とヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## エラーコンテキスト
//!
//! `tracing::warn!` / `tracing::error!` に `error.category` + `error.kind` フィールドを
//! 直接追加する。定数は [`error`] モジュールで提供。
//!
//! ## 相関フィールド
//!
//! 配信関連のイベントには以下を付ける:
//!
//! - `notification.trigger`: バッチを起動したトリガー（`tender_created` / `due_date_sweep`）
//! - `notification.reminder_id`: リマインダー ID
//! - `notification.recipient`: 宛先メールアドレス
//! - `notification.attempt`: 試行回数（1 始まり）

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: エンティティ種別（[`event::entity_type`] の定数を使用）
/// - `event.entity_id`: エンティティ ID
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const NOTIFICATION: &str = "notification";
        pub const REMINDER: &str = "reminder";
        pub const SCHEDULER: &str = "scheduler";
    }

    /// イベントアクション
    pub mod action {
        // 配信
        pub const NOTIFICATION_DELIVERED: &str = "notification.delivered";
        pub const NOTIFICATION_FAILED: &str = "notification.failed";
        pub const NOTIFICATION_BATCH_COMPLETED: &str = "notification.batch_completed";

        // 照合
        pub const REMINDERS_MATCHED: &str = "reminder.matched";

        // スケジューラ
        pub const SWEEP_COMPLETED: &str = "sweep.completed";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const REMINDER: &str = "reminder";
        pub const TENDER: &str = "tender";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（DB）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス呼び出し（メールトランスポート）
        pub const EXTERNAL_SERVICE: &str = "external_service";
        /// 入力データ（参照切れ、テンプレート）
        pub const DATA: &str = "data";
    }

    /// エラー種別
    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const DELIVERY_TRANSIENT: &str = "delivery_transient";
        pub const DELIVERY_PERMANENT: &str = "delivery_permanent";
        pub const LOOKUP_MISS: &str = "lookup_miss";
        pub const TEMPLATE: &str = "template";
        pub const INTERNAL: &str = "internal";
    }
}
