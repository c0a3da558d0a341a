//! # 通知サービス
//!
//! 照合 → メッセージ生成 → 配信を統合する、2 つのトリガーの入口。
//!
//! ## 設計方針
//!
//! - **照合の失敗は全体中止**: データストアのエラーを受けたらそのトリガーの実行を中止し、
//!   何も配信しない（部分的な照合結果は使わない）
//! - **生成の失敗は個別スキップ**: テンプレートのレンダリングに失敗したリマインダーだけを
//!   飛ばし、バッチの残りは配信する
//! - **記憶を持たない**: 通知済みの印は付けないため、スイープのたびに同じリマインダーが
//!   再通知され得る
//! - **依存性注入**: リポジトリと配信チャネルは trait で抽象化し、時刻は [`Clock`] から得る

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenderwatch_domain::{
    clock::Clock,
    matching::TriggerKind,
    sweep::SweepWindow,
    tender::Tender,
};
use tenderwatch_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};

use super::{
    dispatcher::{BatchReport, Dispatcher, OutgoingNotification},
    matcher::{MatchedReminder, ReminderMatcher},
    message_builder::MessageBuilder,
    scheduler::{SweepOutcome, SweepPermit, SweepSettings, SweepState},
};
use crate::error::ServiceError;

/// 通知サービス
pub struct NotificationService {
    matcher:     ReminderMatcher,
    builder:     MessageBuilder,
    dispatcher:  Arc<Dispatcher>,
    clock:       Arc<dyn Clock>,
    sweep_state: Arc<SweepState>,
    sweep:       SweepSettings,
}

impl NotificationService {
    pub fn new(
        matcher: ReminderMatcher,
        builder: MessageBuilder,
        dispatcher: Arc<Dispatcher>,
        clock: Arc<dyn Clock>,
        sweep: SweepSettings,
    ) -> Self {
        Self {
            matcher,
            builder,
            dispatcher,
            clock,
            sweep_state: Arc::new(SweepState::new()),
            sweep,
        }
    }

    /// 入札案件の新規作成を受けて、一致したリマインダーに通知する
    #[tracing::instrument(skip_all, fields(tender_id = %tender.id))]
    pub async fn on_tender_created(&self, tender: Tender) -> Result<BatchReport, ServiceError> {
        let trigger = TriggerKind::TenderCreated;
        let now = self.clock.now();

        let matched = self
            .matcher
            .match_tender_created(&tender, now)
            .await
            .map_err(|e| abort(trigger, e))?;

        let batch = self.build_batch(&matched, trigger, now);
        Ok(self.dispatcher.dispatch(trigger, batch).await)
    }

    pub fn is_sweep_running(&self) -> bool {
        self.sweep_state.is_running()
    }

    /// スイープの実行許可を取る（実行中なら `None`）
    pub fn begin_sweep(&self) -> Option<SweepPermit> {
        self.sweep_state.try_begin()
    }

    /// 実行中でなければ期日スイープを実行する
    pub async fn run_sweep(&self) -> Result<SweepOutcome, ServiceError> {
        let Some(permit) = self.begin_sweep() else {
            return Ok(SweepOutcome::Skipped);
        };
        self.sweep(permit).await.map(SweepOutcome::Completed)
    }

    /// 実行許可を持って期日スイープを実行する
    ///
    /// 許可は完了時（失敗時を含む）に破棄され、状態は idle に戻る。
    #[tracing::instrument(skip_all)]
    pub async fn sweep(&self, permit: SweepPermit) -> Result<BatchReport, ServiceError> {
        let _permit = permit;
        let trigger = TriggerKind::DueDateSweep;
        let now = self.clock.now();
        let window = SweepWindow::starting_at(now, self.sweep.horizon_days, self.sweep.timezone);

        let matched = self
            .matcher
            .match_sweep(&window)
            .await
            .map_err(|e| abort(trigger, e))?;

        let batch = self.build_batch(&matched, trigger, now);
        let report = self.dispatcher.dispatch(trigger, batch).await;

        log_business_event!(
            event.category = event::category::SCHEDULER,
            event.action = event::action::SWEEP_COMPLETED,
            event.result = report.event_result(),
            sweep.window_start = %window.start(),
            sweep.window_end = %window.end(),
            batch.submitted = report.submitted,
            batch.delivered = report.delivered,
            batch.failed = report.failed,
            "期日スイープ完了"
        );

        Ok(report)
    }

    /// 照合結果からメッセージを生成する（生成に失敗したものはスキップ）
    fn build_batch(
        &self,
        matched: &[MatchedReminder],
        trigger: TriggerKind,
        now: DateTime<Utc>,
    ) -> Vec<OutgoingNotification> {
        matched
            .iter()
            .filter_map(|m| match self.builder.build(m, trigger, now) {
                Ok(email) => Some(OutgoingNotification {
                    reminder_id: m.reminder.id,
                    email,
                }),
                Err(e) => {
                    tracing::error!(
                        error.category = log_error::category::DATA,
                        error.kind = log_error::kind::TEMPLATE,
                        reminder_id = %m.reminder.id,
                        error = %e,
                        "通知メッセージの生成に失敗したためスキップ"
                    );
                    None
                }
            })
            .collect()
    }
}

/// 照合中のデータストアエラーでトリガーの実行を中止する
fn abort(trigger: TriggerKind, error: tenderwatch_infra::InfraError) -> ServiceError {
    let trigger_str: &'static str = trigger.into();
    tracing::error!(
        error.category = log_error::category::INFRASTRUCTURE,
        error.kind = log_error::kind::DATABASE,
        notification.trigger = trigger_str,
        store.unavailable = error.is_unavailable(),
        error = %error,
        span_trace = %error.span_trace(),
        "データストアエラーのためトリガーの実行を中止"
    );
    ServiceError::Database(error)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeDelta, TimeZone};
    use pretty_assertions::assert_eq;
    use tenderwatch_domain::{
        catalog::CategoryId,
        clock::FixedClock,
        notification::NotificationError,
        recipient::{Recipient, RecipientKind, UserId},
        reminder::{Reminder, ReminderId, ReminderOwner, ReminderType},
        tender::TenderId,
    };
    use tenderwatch_infra::mock::{
        MockCatalogRepository,
        MockNotificationSender,
        MockRecipientRepository,
        MockReminderRepository,
        MockTenderRepository,
    };

    use super::*;
    use crate::usecase::{dispatcher::DispatchSettings, scheduler::spawn_daily_trigger};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap()
    }

    struct Fixture {
        reminders: MockReminderRepository,
        tenders:   MockTenderRepository,
        sender:    MockNotificationSender,
        service:   NotificationService,
    }

    fn fixture() -> Fixture {
        let reminders = MockReminderRepository::new();
        let tenders = MockTenderRepository::new();
        let recipients = MockRecipientRepository::new();
        recipients.add_recipient(
            ReminderOwner::User(UserId::new(1)),
            Recipient {
                kind:  RecipientKind::User,
                name:  Some("Wanjiku".to_string()),
                email: Some("wanjiku@example.com".to_string()),
            },
        );
        let sender = MockNotificationSender::new();

        let matcher = ReminderMatcher::new(
            Arc::new(reminders.clone()),
            Arc::new(tenders.clone()),
            Arc::new(MockCatalogRepository::new()),
            Arc::new(recipients),
        );
        let sweep = utc_sweep_settings();
        let service = NotificationService::new(
            matcher,
            MessageBuilder::new(sweep.timezone).unwrap(),
            Arc::new(Dispatcher::new(
                Arc::new(sender.clone()),
                DispatchSettings::default(),
            )),
            Arc::new(FixedClock::new(now())),
            sweep,
        );

        Fixture {
            reminders,
            tenders,
            sender,
            service,
        }
    }

    /// UTC の 08:00 に起動する設定
    fn utc_sweep_settings() -> SweepSettings {
        SweepSettings {
            timezone: chrono_tz::UTC,
            ..SweepSettings::default()
        }
    }

    fn sweep_reminder(id: i64, due: DateTime<Utc>) -> Reminder {
        Reminder::new(ReminderId::new(id), due, ReminderType::DueDate)
            .with_user(UserId::new(1))
            .with_tender(TenderId::new(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_入札案件作成で一致したリマインダーに配信する() {
        let f = fixture();
        f.reminders.add_reminder(
            Reminder::new(
                ReminderId::new(1),
                now() + TimeDelta::days(10),
                ReminderType::NewTender,
            )
            .with_user(UserId::new(1))
            .with_category(CategoryId::new(5)),
        );
        let tender = Tender::new(TenderId::new(1), "Borehole Drilling").with_category(CategoryId::new(5));

        let report = f.service.on_tender_created(tender).await.unwrap();

        assert_eq!(report.delivered, 1);
        let sent = f.sender.sent();
        assert_eq!(sent[0].email.subject, "[TenderWatch] New tender: Borehole Drilling");
    }

    #[tokio::test(start_paused = true)]
    async fn test_期日スイープで期間内のリマインダーに配信する() {
        let f = fixture();
        f.tenders
            .add_tender(Tender::new(TenderId::new(1), "Road Rehabilitation"));
        f.reminders
            .add_reminder(sweep_reminder(1, now() + TimeDelta::days(1)));
        f.reminders
            .add_reminder(sweep_reminder(2, now() + TimeDelta::days(5)));

        let outcome = f.service.run_sweep().await.unwrap();

        let SweepOutcome::Completed(report) = outcome else {
            panic!("スイープが実行されること: {outcome:?}");
        };
        assert_eq!(report.submitted, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(
            f.sender.sent()[0].email.subject,
            "[TenderWatch] Reminder: Road Rehabilitation is due tomorrow"
        );
        assert!(!f.service.is_sweep_running());
    }

    #[tokio::test]
    async fn test_スイープ実行中のトリガーはスキップされる() {
        let f = fixture();
        let _permit = f.service.begin_sweep().unwrap();

        let outcome = f.service.run_sweep().await.unwrap();

        assert_eq!(outcome, SweepOutcome::Skipped);
        assert!(f.sender.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_スイープが失敗してもidleに戻る() {
        let f = fixture();
        f.tenders
            .add_tender(Tender::new(TenderId::new(1), "Road Rehabilitation"));
        f.reminders
            .add_reminder(sweep_reminder(1, now() + TimeDelta::days(1)));
        f.reminders.set_unavailable(true);

        let result = f.service.run_sweep().await;

        assert!(matches!(result, Err(ServiceError::Database(_))));
        assert!(!f.service.is_sweep_running());

        f.reminders.set_unavailable(false);
        let outcome = f.service.run_sweep().await.unwrap();
        assert!(matches!(outcome, SweepOutcome::Completed(r) if r.delivered == 1));
    }

    #[tokio::test]
    async fn test_照合中のデータストア停止で何も配信しない() {
        let f = fixture();
        f.reminders.add_reminder(
            Reminder::new(
                ReminderId::new(1),
                now() + TimeDelta::days(10),
                ReminderType::NewTender,
            )
            .with_user(UserId::new(1))
            .with_category(CategoryId::new(5)),
        );
        f.reminders.set_unavailable(true);
        let tender = Tender::new(TenderId::new(1), "Borehole Drilling").with_category(CategoryId::new(5));

        let result = f.service.on_tender_created(tender).await;

        tokio_test::assert_err!(result);
        assert!(f.sender.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_配信の最終失敗はスイープ結果に反映される() {
        let f = fixture();
        f.tenders
            .add_tender(Tender::new(TenderId::new(1), "Road Rehabilitation"));
        f.reminders
            .add_reminder(sweep_reminder(1, now() + TimeDelta::days(1)));
        f.sender.fail_always(
            "wanjiku@example.com",
            NotificationError::Permanent("550 no such user".to_string()),
        );

        let outcome = f.service.run_sweep().await.unwrap();

        let SweepOutcome::Completed(report) = outcome else {
            panic!("スイープが実行されること: {outcome:?}");
        };
        assert_eq!(report.failed, 1);
        assert_eq!(report.event_result(), event::result::FAILURE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_日次トリガーは起動時刻に一度だけスイープを実行する() {
        let f = fixture();
        f.tenders
            .add_tender(Tender::new(TenderId::new(1), "Road Rehabilitation"));
        f.reminders
            .add_reminder(sweep_reminder(1, now() + TimeDelta::days(1)));
        let service = Arc::new(f.service);

        let handle = spawn_daily_trigger(
            Arc::clone(&service),
            Arc::new(FixedClock::new(now())),
            utc_sweep_settings(),
        );
        tokio::task::yield_now().await;

        // 08:00 の 1 分前までは何も送らない
        tokio::time::advance(Duration::from_secs(8 * 60 * 60 - 60)).await;
        tokio::task::yield_now().await;
        assert!(f.sender.sent().is_empty());

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        for _ in 0..500 {
            if !f.sender.sent().is_empty() && !service.is_sweep_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let sent = f.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].email.subject,
            "[TenderWatch] Reminder: Road Rehabilitation is due tomorrow"
        );
        assert!(!service.is_sweep_running());

        handle.abort();
    }
}
