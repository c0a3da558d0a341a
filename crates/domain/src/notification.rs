//! # 通知
//!
//! メール通知に関するドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **失敗の分類**: 配信失敗は再試行で回復し得る [`NotificationError::Transient`] と
//!   回復しない [`NotificationError::Permanent`] に分ける。再試行の判断は
//!   ディスパッチャが [`NotificationError::is_retryable`] で行う
//! - **メッセージの生成と送信の分離**: [`EmailMessage`] はメッセージビルダーの出力で、
//!   配信チャネルはそれを送るだけ

use derive_more::{Constructor, Display};
use thiserror::Error;

/// 通知エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// 一時的な配信失敗（ネットワーク、タイムアウト、認証、一時的な拒否）
    #[error("一時的な配信失敗: {0}")]
    Transient(String),

    /// 恒久的な配信失敗（不正な宛先、恒久的な拒否）
    #[error("恒久的な配信失敗: {0}")]
    Permanent(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

impl NotificationError {
    /// 再試行で成功し得る失敗か
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// メールメッセージ
///
/// メッセージビルダーの出力。配信チャネルに渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// プレーンテキスト本文
    pub text_body: String,
    /// HTML 本文（任意）
    pub html_body: Option<String>,
}

/// 配信成功時にトランスポートが割り当てた識別子
#[derive(Debug, Clone, PartialEq, Eq, Display, Constructor)]
#[display("{transport_id}")]
pub struct DeliveryReceipt {
    pub transport_id: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(NotificationError::Transient("timeout".to_string()), true)]
    #[case(NotificationError::Permanent("550 no such user".to_string()), false)]
    #[case(NotificationError::TemplateFailed("missing".to_string()), false)]
    fn test_is_retryableは一時的な失敗のみ真(
        #[case] error: NotificationError,
        #[case] expected: bool,
    ) {
        assert_eq!(error.is_retryable(), expected);
    }

    #[test]
    fn test_receiptはトランスポート識別子を表示する() {
        let receipt = DeliveryReceipt::new("250 2.0.0 queued as 4F2A".to_string());

        assert_eq!(receipt.to_string(), "250 2.0.0 queued as 4F2A");
    }
}
