//! Noop 通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! 開発環境や通知無効化時に使用する。

use async_trait::async_trait;
use tenderwatch_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};
use uuid::Uuid;

use super::NotificationSender;

/// Noop 通知送信（ログ出力のみ）
///
/// 受領識別子は `noop-<UUID v7>` 形式で毎回新しく採番する。
#[derive(Debug, Clone, Default)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        let receipt = DeliveryReceipt::new(format!("noop-{}", Uuid::now_v7()));

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            receipt = %receipt,
            "Noop: メール送信をスキップ"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> EmailMessage {
        EmailMessage {
            to:        "buyer@example.com".to_string(),
            subject:   "[TenderWatch] New tender: 道路補修工事".to_string(),
            text_body: "本文".to_string(),
            html_body: None,
        }
    }

    #[tokio::test]
    async fn test_send_emailはnoop接頭辞の受領識別子を返す() {
        let sender = NoopNotificationSender;

        let receipt = sender.send_email(&email()).await.unwrap();

        assert!(receipt.transport_id.starts_with("noop-"));
    }

    #[tokio::test]
    async fn test_受領識別子は送信ごとに異なる() {
        let sender = NoopNotificationSender;

        let first = sender.send_email(&email()).await.unwrap();
        let second = sender.send_email(&email()).await.unwrap();

        assert_ne!(first, second);
    }
}
