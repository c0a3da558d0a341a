//! # 通知送信
//!
//! メール通知の配信チャネルを担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **1 呼び出し 1 配信試行**: 再試行はディスパッチャの責務で、実装側では行わない
//! - **失敗の分類**: トランスポートの失敗を一時的 / 恒久的に分類して返す
//! - **環境変数切替**: `NOTIFICATION_BACKEND` で SMTP / Noop をランタイム選択

mod noop;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
pub use smtp::{SmtpNotificationSender, SmtpSettings, SmtpSetupError, SmtpTlsMode};
use tenderwatch_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};

/// メール送信トレイト
///
/// 配信チャネルの中核。外部のメールトランスポートを
/// 「送信 → 成功（識別子） | 失敗（理由）」の一様な契約で包む。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを 1 回だけ送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<DeliveryReceipt, NotificationError>;
}
