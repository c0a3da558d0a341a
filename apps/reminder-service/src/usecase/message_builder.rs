//! # メッセージビルダー
//!
//! tera テンプレートエンジンで、照合済みリマインダーから受信者ごとの通知メールを
//! HTML / plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **純粋関数**: 入力（照合結果、トリガー、評価時刻）だけから決定的に生成し、I/O を行わない
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **件名パターン**:
//!   - 新着案件: `[TenderWatch] New tender: {title}`
//!   - 期日: `[TenderWatch] Reminder: {title} is due {phrase}`
//! - **フォールバック**: 受信者名が空なら "User"、カタログの参照切れは "Not specified"

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tenderwatch_domain::{
    matching::TriggerKind,
    notification::{EmailMessage, NotificationError},
};
use tera::{Context, Tera};

use super::matcher::MatchedReminder;

/// カタログ・案件属性が未指定のときの表示
const NOT_SPECIFIED: &str = "Not specified";

/// 期日の表示形式（例: "August 4, 2025"）
const DUE_DATE_FORMAT: &str = "%B %-d, %Y";

/// 期日までの日数（切り上げ、過ぎていれば 0）
pub fn days_until_due(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining_ms = (due_date - now).num_milliseconds();
    if remaining_ms <= 0 {
        return 0;
    }
    let day_ms = TimeDelta::days(1).num_milliseconds();
    (remaining_ms + day_ms - 1) / day_ms
}

/// 期日までの日数の表現（"today" / "tomorrow" / "in N days"）
pub fn due_phrase(days: i64) -> String {
    match days {
        ..=0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {n} days"),
    }
}

/// メッセージビルダー
///
/// tera テンプレートエンジンをラップし、[`MatchedReminder`] から
/// [`EmailMessage`] を生成する。
pub struct MessageBuilder {
    engine:   Tera,
    timezone: Tz,
}

impl MessageBuilder {
    /// 新しいビルダーを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    /// 期日の日付は `timezone` で表示する。
    pub fn new(timezone: Tz) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "new_tender.html",
                    include_str!("../../templates/notifications/new_tender.html"),
                ),
                (
                    "new_tender.txt",
                    include_str!("../../templates/notifications/new_tender.txt"),
                ),
                (
                    "due_date.html",
                    include_str!("../../templates/notifications/due_date.html"),
                ),
                (
                    "due_date.txt",
                    include_str!("../../templates/notifications/due_date.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine, timezone })
    }

    /// 照合済みリマインダーから通知メールを生成する
    ///
    /// 受信者に宛先がない場合は恒久的な失敗を返す。
    pub fn build(
        &self,
        matched: &MatchedReminder,
        trigger: TriggerKind,
        now: DateTime<Utc>,
    ) -> Result<EmailMessage, NotificationError> {
        let to = matched
            .recipient
            .address()
            .ok_or_else(|| {
                NotificationError::Permanent(format!(
                    "リマインダー {} の宛先がありません",
                    matched.reminder.id
                ))
            })?
            .to_string();

        let (template_name, subject, context) = self.build_template_params(matched, trigger, now);

        let html_body = self
            .engine
            .render(&format!("{template_name}.html"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render(&format!("{template_name}.txt"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(EmailMessage {
            to,
            subject,
            text_body,
            html_body: Some(html_body),
        })
    }

    /// テンプレート名、件名、コンテキストを構築する
    fn build_template_params(
        &self,
        matched: &MatchedReminder,
        trigger: TriggerKind,
        now: DateTime<Utc>,
    ) -> (&'static str, String, Context) {
        let reminder = &matched.reminder;
        let entities = &matched.entities;
        let tender = &entities.tender;

        let days = days_until_due(reminder.due_date, now);
        let phrase = due_phrase(days);
        let due_date = reminder
            .due_date
            .with_timezone(&self.timezone)
            .format(DUE_DATE_FORMAT)
            .to_string();

        let mut context = Context::new();
        context.insert("recipient_name", matched.recipient.display_name());
        context.insert("tender_title", &tender.title);
        context.insert(
            "tender_description",
            tender.description.as_deref().unwrap_or(NOT_SPECIFIED),
        );
        context.insert(
            "reference_number",
            tender.reference_number.as_deref().unwrap_or(NOT_SPECIFIED),
        );
        context.insert(
            "category_name",
            entities
                .category
                .as_ref()
                .map_or(NOT_SPECIFIED, |c| c.name.as_str()),
        );
        context.insert(
            "subcategory_name",
            entities
                .subcategory
                .as_ref()
                .map_or(NOT_SPECIFIED, |s| s.name.as_str()),
        );
        context.insert(
            "region_name",
            entities
                .region
                .as_ref()
                .map_or(NOT_SPECIFIED, |r| r.name.as_str()),
        );
        context.insert("due_date", &due_date);
        context.insert("due_phrase", &phrase);
        context.insert("days_until_due", &days);
        context.insert(
            "message",
            &reminder
                .message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty()),
        );

        match trigger {
            TriggerKind::TenderCreated => (
                "new_tender",
                format!("[TenderWatch] New tender: {}", tender.title),
                context,
            ),
            TriggerKind::DueDateSweep => (
                "due_date",
                format!("[TenderWatch] Reminder: {} is due {phrase}", tender.title),
                context,
            ),
        }
    }
}
