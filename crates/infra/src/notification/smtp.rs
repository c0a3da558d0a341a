//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//!
//! ## 失敗の分類
//!
//! | 失敗 | 分類 |
//! |------|------|
//! | 宛先アドレスの形式不正 | 恒久的 |
//! | 5xx 応答（認証失敗 530/534/535 を除く） | 恒久的 |
//! | 4xx 応答、認証失敗、接続失敗、タイムアウト、TLS エラー | 一時的 |

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    address::AddressError,
    message::{Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{
        self,
        authentication::Credentials,
        client::{Tls, TlsParameters, TlsVersion},
        response::Response,
    },
};
use tenderwatch_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};
use thiserror::Error;

use super::NotificationSender;

/// SMTP コマンド 1 回あたりのタイムアウト
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// 認証失敗を表す応答コード
///
/// 5xx だが資格情報の更新で回復し得るため、一時的な失敗として扱う。
const AUTHENTICATION_FAILURE_CODES: [&str; 3] = ["530", "534", "535"];

/// TLS 接続方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SmtpTlsMode {
    /// 平文で接続後 STARTTLS で昇格する（昇格できなければ失敗）
    Starttls,
    /// 接続直後から TLS（implicit TLS）
    Tls,
}

/// SMTP 接続設定
#[derive(Clone)]
pub struct SmtpSettings {
    pub host:         String,
    pub port:         u16,
    /// ユーザー名とパスワード。認証なしの場合は `None`
    pub credentials:  Option<(String, String)>,
    pub tls:          SmtpTlsMode,
    pub from_address: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("credentials", &self.credentials.as_ref().map(|_| "[REDACTED]"))
            .field("tls", &self.tls)
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// SMTP 送信の初期化エラー
#[derive(Debug, Error)]
pub enum SmtpSetupError {
    #[error("送信元アドレスが不正です: {0}")]
    InvalidFromAddress(#[from] AddressError),

    #[error("TLS 設定の構築に失敗しました: {0}")]
    Tls(#[from] smtp::Error),
}

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// TLS 1.2 以上を必須とし、証明書検証は常に有効。
pub struct SmtpNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from:      Mailbox,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// 送信元アドレスと TLS パラメータはここで検証し、起動時に失敗させる。
    pub fn new(settings: SmtpSettings) -> Result<Self, SmtpSetupError> {
        let from = settings.from_address.parse::<Mailbox>()?;

        let tls_parameters = TlsParameters::builder(settings.host.clone())
            .set_min_tls_version(TlsVersion::Tlsv12)
            .build()?;

        let tls = match settings.tls {
            SmtpTlsMode::Starttls => Tls::Required(tls_parameters),
            SmtpTlsMode::Tls => Tls::Wrapper(tls_parameters),
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port)
            .tls(tls)
            .timeout(Some(SMTP_TIMEOUT));

        if let Some((username, password)) = settings.credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &EmailMessage) -> Result<Message, NotificationError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::Permanent(format!("宛先アドレス不正: {e}")))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject);

        let text_part = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(email.text_body.clone());

        let message = match &email.html_body {
            Some(html_body) => builder.multipart(
                MultiPart::alternative().singlepart(text_part).singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html_body.clone()),
                ),
            ),
            None => builder.singlepart(text_part),
        };

        message.map_err(|e| NotificationError::Permanent(format!("メッセージ構築失敗: {e}")))
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(classify_smtp_error)?;

        Ok(receipt_from_response(&response))
    }
}

/// lettre の SMTP エラーを一時的 / 恒久的に分類する
fn classify_smtp_error(error: smtp::Error) -> NotificationError {
    let is_authentication_failure = error.status().is_some_and(|code| {
        AUTHENTICATION_FAILURE_CODES.contains(&code.to_string().as_str())
    });

    if error.is_permanent() && !is_authentication_failure {
        NotificationError::Permanent(format!("SMTP 恒久エラー: {error}"))
    } else {
        NotificationError::Transient(format!("SMTP 送信失敗: {error}"))
    }
}

/// サーバーの最終応答文を受領識別子にする
fn receipt_from_response(response: &Response) -> DeliveryReceipt {
    let text = response
        .message()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        DeliveryReceipt::new(response.code().to_string())
    } else {
        DeliveryReceipt::new(text)
    }
}
