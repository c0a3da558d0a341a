//! # レート制限付きディスパッチャ
//!
//! 生成済みの通知メッセージを配信チャネルへ送る。
//!
//! ## 構造
//!
//! ```text
//! dispatch(trigger, batch)
//!     │  Job（メッセージ + 返信用 oneshot）
//!     ▼
//! ┌─────────┐    ┌──────────┐    ┌───────────┐
//! │ キュー  │───▶│ ワーカー │───▶│ 送信間隔  │───▶ NotificationSender
//! │ (mpsc)  │    │  × N     │    │ ゲート    │
//! └─────────┘    └──────────┘    └───────────┘
//! ```
//!
//! - **同時送信数の上限**: 固定数 N のワーカーがキューから取り出すため、
//!   同時に送信中のメッセージは最大 N 件
//! - **送信間隔**: 全ワーカーで共有する「次に送信を開始してよい時刻」を
//!   試行のたびにロック下で更新し、送信開始どうしの間隔を M 以上に保つ
//! - **再試行**: 一時的な失敗のみ、固定間隔 D で最大 R 回まで試行する。
//!   1 メッセージの試行は逐次的で、再試行もゲートを通る
//! - **失敗の隔離**: 1 メッセージの最終失敗はバッチ内の他メッセージに影響しない
//!
//! 1 インスタンスを入札案件トリガーとスイープの両方で共有する。

use std::{sync::Arc, time::Duration};

use itertools::Itertools;
use serde::Serialize;
use tenderwatch_domain::{
    matching::TriggerKind,
    notification::{EmailMessage, NotificationError},
    reminder::ReminderId,
};
use tenderwatch_infra::notification::NotificationSender;
use tenderwatch_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    time::Instant,
};

/// ディスパッチャの設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// 同時送信数の上限（N）
    pub max_concurrency: usize,
    /// 送信開始どうしの最小間隔（M）
    pub min_interval:    Duration,
    /// 1 メッセージあたりの最大試行回数（R）
    pub max_attempts:    u32,
    /// 再試行までの待ち時間（D）
    pub retry_delay:     Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            min_interval:    Duration::from_millis(1000),
            max_attempts:    3,
            retry_delay:     Duration::from_millis(5000),
        }
    }
}

/// 配信待ちの通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingNotification {
    pub reminder_id: ReminderId,
    pub email:       EmailMessage,
}

/// 1 メッセージの最終結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryOutcome {
    Delivered,
    Failed,
}

/// バッチの配信結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub trigger:   TriggerKind,
    pub submitted: usize,
    pub delivered: usize,
    pub failed:    usize,
}

impl BatchReport {
    /// 配信対象のない空のバッチ
    pub fn empty(trigger: TriggerKind) -> Self {
        Self {
            trigger,
            submitted: 0,
            delivered: 0,
            failed: 0,
        }
    }

    /// ログの `event.result`（1 件でも最終失敗があれば失敗）
    pub fn event_result(&self) -> &'static str {
        if self.failed == 0 {
            event::result::SUCCESS
        } else {
            event::result::FAILURE
        }
    }
}

struct Job {
    trigger:      TriggerKind,
    notification: OutgoingNotification,
    reply:        oneshot::Sender<DeliveryOutcome>,
}

/// 送信間隔ゲート
///
/// 「次に送信を開始してよい時刻」を保持する。枠の確保はロック下で行い、
/// 待機はロックを解放してから行う。
struct PacingGate {
    next_slot: Mutex<Instant>,
    interval:  Duration,
}

impl PacingGate {
    fn new(interval: Duration) -> Self {
        Self {
            next_slot: Mutex::new(Instant::now()),
            interval,
        }
    }

    /// 自分の送信枠まで待つ
    async fn wait_turn(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let slot = (*next_slot).max(Instant::now());
            *next_slot = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// ワーカー間で共有する送信コンテキスト
struct Worker {
    sender:   Arc<dyn NotificationSender>,
    gate:     PacingGate,
    settings: DispatchSettings,
}

impl Worker {
    /// 1 メッセージを最終結果が出るまで送信する
    async fn deliver(
        &self,
        trigger: TriggerKind,
        notification: &OutgoingNotification,
    ) -> DeliveryOutcome {
        let trigger_str: &'static str = trigger.into();
        let reminder_id = notification.reminder_id;
        let recipient = notification.email.to.as_str();
        let max_attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            self.gate.wait_turn().await;

            match self.sender.send_email(&notification.email).await {
                Ok(receipt) => {
                    log_business_event!(
                        event.category = event::category::NOTIFICATION,
                        event.action = event::action::NOTIFICATION_DELIVERED,
                        event.entity_type = event::entity_type::REMINDER,
                        event.entity_id = %reminder_id,
                        event.result = event::result::SUCCESS,
                        notification.trigger = trigger_str,
                        notification.reminder_id = %reminder_id,
                        notification.recipient = recipient,
                        notification.attempt = attempt,
                        notification.receipt = %receipt,
                        "通知メール配信成功"
                    );
                    return DeliveryOutcome::Delivered;
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(
                        error.category = log_error::category::EXTERNAL_SERVICE,
                        error.kind = log_error::kind::DELIVERY_TRANSIENT,
                        notification.trigger = trigger_str,
                        notification.reminder_id = %reminder_id,
                        notification.recipient = recipient,
                        notification.attempt = attempt,
                        error = %e,
                        "通知メール配信の一時的な失敗、再試行します"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(e) => {
                    let kind = match &e {
                        NotificationError::Transient(_) => log_error::kind::DELIVERY_TRANSIENT,
                        NotificationError::Permanent(_) => log_error::kind::DELIVERY_PERMANENT,
                        NotificationError::TemplateFailed(_) => log_error::kind::TEMPLATE,
                    };
                    tracing::error!(
                        error.category = log_error::category::EXTERNAL_SERVICE,
                        error.kind = kind,
                        notification.trigger = trigger_str,
                        notification.reminder_id = %reminder_id,
                        notification.recipient = recipient,
                        notification.attempt = attempt,
                        error = %e,
                        "通知メール配信に失敗"
                    );
                    log_business_event!(
                        event.category = event::category::NOTIFICATION,
                        event.action = event::action::NOTIFICATION_FAILED,
                        event.entity_type = event::entity_type::REMINDER,
                        event.entity_id = %reminder_id,
                        event.result = event::result::FAILURE,
                        notification.trigger = trigger_str,
                        notification.reminder_id = %reminder_id,
                        notification.recipient = recipient,
                        notification.attempt = attempt,
                        "通知メール配信の最終失敗"
                    );
                    return DeliveryOutcome::Failed;
                }
            }
        }

        DeliveryOutcome::Failed
    }
}

/// レート制限付きディスパッチャ
///
/// 生成時に固定数のワーカータスクを起動する。全ての `Dispatcher` の参照が
/// 破棄されるとキューが閉じ、ワーカーは終了する。
pub struct Dispatcher {
    queue: mpsc::Sender<Job>,
}

impl Dispatcher {
    /// キューの容量（ワーカー数に対する倍率）
    const QUEUE_CAPACITY_PER_WORKER: usize = 16;

    /// ディスパッチャを作成し、ワーカーを起動する
    ///
    /// tokio ランタイム上で呼び出すこと。
    pub fn new(sender: Arc<dyn NotificationSender>, settings: DispatchSettings) -> Self {
        let workers = settings.max_concurrency.max(1);
        let (queue, receiver) = mpsc::channel::<Job>(workers * Self::QUEUE_CAPACITY_PER_WORKER);
        let receiver = Arc::new(Mutex::new(receiver));
        let worker = Arc::new(Worker {
            sender,
            gate: PacingGate::new(settings.min_interval),
            settings,
        });

        for _ in 0..workers {
            let receiver = Arc::clone(&receiver);
            let worker = Arc::clone(&worker);
            tokio::spawn(async move {
                loop {
                    let job = receiver.lock().await.recv().await;
                    let Some(job) = job else {
                        break;
                    };
                    let outcome = worker.deliver(job.trigger, &job.notification).await;
                    // 呼び出し側が待機をやめていても配信自体は完了している
                    let _ = job.reply.send(outcome);
                }
            });
        }

        Self { queue }
    }

    /// バッチを配信し、全メッセージが最終結果に達するまで待つ
    pub async fn dispatch(
        &self,
        trigger: TriggerKind,
        batch: Vec<OutgoingNotification>,
    ) -> BatchReport {
        let trigger_str: &'static str = trigger.into();
        let submitted = batch.len();
        let mut pending = Vec::with_capacity(submitted);

        for notification in batch {
            let reminder_id = notification.reminder_id;
            let (reply, outcome) = oneshot::channel();
            let job = Job {
                trigger,
                notification,
                reply,
            };
            if self.queue.send(job).await.is_err() {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::INTERNAL,
                    notification.trigger = trigger_str,
                    notification.reminder_id = %reminder_id,
                    "配信キューが閉じています"
                );
            }
            pending.push((reminder_id, outcome));
        }

        let mut delivered = 0;
        let mut failed_reminders = Vec::new();
        for (reminder_id, outcome) in pending {
            match outcome.await {
                Ok(DeliveryOutcome::Delivered) => delivered += 1,
                Ok(DeliveryOutcome::Failed) | Err(_) => failed_reminders.push(reminder_id),
            }
        }

        let report = BatchReport {
            trigger,
            submitted,
            delivered,
            failed: failed_reminders.len(),
        };

        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_BATCH_COMPLETED,
            event.result = report.event_result(),
            notification.trigger = trigger_str,
            batch.submitted = report.submitted,
            batch.delivered = report.delivered,
            batch.failed = report.failed,
            batch.failed_reminders = %failed_reminders.iter().join(","),
            "通知バッチの配信完了"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tenderwatch_infra::mock::MockNotificationSender;

    use super::*;

    fn notification(id: i64, to: &str) -> OutgoingNotification {
        OutgoingNotification {
            reminder_id: ReminderId::new(id),
            email:       EmailMessage {
                to:        to.to_string(),
                subject:   format!("[TenderWatch] Reminder #{id}"),
                text_body: "本文".to_string(),
                html_body: None,
            },
        }
    }

    fn settings(min_interval_ms: u64) -> DispatchSettings {
        DispatchSettings {
            min_interval: Duration::from_millis(min_interval_ms),
            ..DispatchSettings::default()
        }
    }

    fn transient() -> NotificationError {
        NotificationError::Transient("421 try again later".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_同時送信数は上限を超えない() {
        let sender = MockNotificationSender::new().with_hold(Duration::from_secs(30));
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), settings(1000));
        let batch = (1..=25)
            .map(|i| notification(i, &format!("buyer{i}@example.com")))
            .collect();

        let report = dispatcher.dispatch(TriggerKind::DueDateSweep, batch).await;

        assert_eq!(report.delivered, 25);
        assert_eq!(sender.max_in_flight(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_送信開始どうしは最小間隔以上あく() {
        let sender = MockNotificationSender::new();
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), settings(1000));
        let batch = (1..=12)
            .map(|i| notification(i, &format!("buyer{i}@example.com")))
            .collect();

        dispatcher.dispatch(TriggerKind::TenderCreated, batch).await;

        let mut starts = sender
            .sent()
            .into_iter()
            .map(|s| s.started_at)
            .collect::<Vec<_>>();
        starts.sort();
        assert_eq!(starts.len(), 12);
        for pair in starts.windows(2) {
            assert!(
                pair[1] - pair[0] >= Duration::from_millis(1000),
                "送信開始の間隔が短すぎる: {:?}",
                pair[1] - pair[0]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_一時的な失敗は再試行して3回目で配信される() {
        let sender = MockNotificationSender::new();
        sender.script("buyer@example.com", [Err(transient()), Err(transient()), Ok(())]);
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), settings(1000));

        let report = dispatcher
            .dispatch(TriggerKind::DueDateSweep, vec![notification(1, "buyer@example.com")])
            .await;

        assert_eq!(sender.call_count("buyer@example.com"), 3);
        assert_eq!(
            report,
            BatchReport {
                trigger:   TriggerKind::DueDateSweep,
                submitted: 1,
                delivered: 1,
                failed:    0,
            }
        );

        let starts = sender
            .sent()
            .into_iter()
            .map(|s| s.started_at)
            .collect::<Vec<_>>();
        assert!(starts[1] - starts[0] >= Duration::from_millis(5000));
        assert!(starts[2] - starts[1] >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_一時的な失敗が続けば最大試行回数で打ち切る() {
        let sender = MockNotificationSender::new();
        sender.fail_always("buyer@example.com", transient());
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), settings(1000));

        let report = dispatcher
            .dispatch(TriggerKind::DueDateSweep, vec![notification(1, "buyer@example.com")])
            .await;

        assert_eq!(sender.call_count("buyer@example.com"), 3);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_恒久的な失敗は再試行しない() {
        let sender = MockNotificationSender::new();
        sender.fail_always(
            "nobody@example.com",
            NotificationError::Permanent("550 no such user".to_string()),
        );
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), settings(1000));

        let report = dispatcher
            .dispatch(TriggerKind::TenderCreated, vec![notification(1, "nobody@example.com")])
            .await;

        assert_eq!(sender.call_count("nobody@example.com"), 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_1件の最終失敗は他のメッセージの配信を妨げない() {
        let sender = MockNotificationSender::new();
        sender.fail_always(
            "nobody@example.com",
            NotificationError::Permanent("550 no such user".to_string()),
        );
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), settings(1000));
        let batch = vec![
            notification(1, "alice@example.com"),
            notification(2, "nobody@example.com"),
            notification(3, "carol@example.com"),
        ];

        let report = dispatcher.dispatch(TriggerKind::TenderCreated, batch).await;

        assert_eq!(
            report,
            BatchReport {
                trigger:   TriggerKind::TenderCreated,
                submitted: 3,
                delivered: 2,
                failed:    1,
            }
        );
        assert_eq!(sender.call_count("alice@example.com"), 1);
        assert_eq!(sender.call_count("carol@example.com"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_2つのトリガーからの同時投入でも送信間隔を共有する() {
        let sender = MockNotificationSender::new();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(sender.clone()), settings(1000)));

        let sweep = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                let batch = (1..=3)
                    .map(|i| notification(i, &format!("sweep{i}@example.com")))
                    .collect();
                dispatcher.dispatch(TriggerKind::DueDateSweep, batch).await
            })
        };
        let created = dispatcher
            .dispatch(
                TriggerKind::TenderCreated,
                (4..=6)
                    .map(|i| notification(i, &format!("new{i}@example.com")))
                    .collect(),
            )
            .await;
        let sweep = sweep.await.unwrap();

        assert_eq!(sweep.delivered + created.delivered, 6);
        let mut starts = sender
            .sent()
            .into_iter()
            .map(|s| s.started_at)
            .collect::<Vec<_>>();
        starts.sort();
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1000));
        }
    }

    #[tokio::test]
    async fn test_空のバッチは送信せずに完了する() {
        let sender = MockNotificationSender::new();
        let dispatcher = Dispatcher::new(Arc::new(sender.clone()), settings(0));

        let report = dispatcher.dispatch(TriggerKind::DueDateSweep, Vec::new()).await;

        assert_eq!(report, BatchReport::empty(TriggerKind::DueDateSweep));
        assert!(sender.sent().is_empty());
    }

    #[test]
    fn test_最終失敗を含むバッチの結果は失敗として記録する() {
        let report = BatchReport {
            trigger:   TriggerKind::DueDateSweep,
            submitted: 3,
            delivered: 2,
            failed:    1,
        };

        assert_eq!(report.event_result(), event::result::FAILURE);
        assert_eq!(
            BatchReport::empty(TriggerKind::DueDateSweep).event_result(),
            event::result::SUCCESS
        );
    }
}
