//! # スケジューラ
//!
//! 期日スイープを日次で起動する。
//!
//! ## 状態遷移
//!
//! ```text
//!            try_begin 成功
//!   ┌──────┐ ─────────────▶ ┌───────────────┐
//!   │ idle │                │ running-sweep │ ── try_begin ──▶ Skipped
//!   └──────┘ ◀───────────── └───────────────┘
//!            SweepPermit の破棄（成功・失敗・パニックを問わない）
//! ```
//!
//! 入札案件作成トリガーはこの状態機械とは独立に動き、ディスパッチャだけを共有する。
//!
//! 日次トリガーは [`next_fire_after`] で次の起動時刻を求めて待つだけの単純なループで、
//! 特定のスケジューラライブラリには依存しない。

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use tenderwatch_domain::{clock::Clock, sweep::DEFAULT_HORIZON_DAYS};
use tenderwatch_shared::event_log::error as log_error;
use tokio::task::JoinHandle;

use super::{dispatcher::BatchReport, notification_service::NotificationService};

/// 期日スイープの設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSettings {
    /// 日次トリガーの現地時刻
    pub time_of_day:  NaiveTime,
    /// 日付境界と現地時刻を判定するタイムゾーン
    pub timezone:     Tz,
    /// 先読み日数
    pub horizon_days: u32,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            time_of_day:  NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            timezone:     chrono_tz::Africa::Nairobi,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

/// スイープの実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// 実行して完了した
    Completed(BatchReport),
    /// 別のスイープが実行中のため何もしなかった
    Skipped,
}

/// スイープの実行状態（idle / running-sweep）
#[derive(Debug, Default)]
pub struct SweepState {
    running: AtomicBool,
}

impl SweepState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// idle なら running-sweep に遷移し、実行許可を返す
    ///
    /// 既に実行中なら `None`。
    pub fn try_begin(self: &Arc<Self>) -> Option<SweepPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepPermit {
                state: Arc::clone(self),
            })
    }
}

/// スイープの実行許可
///
/// 破棄されると状態を idle に戻す。
#[derive(Debug)]
pub struct SweepPermit {
    state: Arc<SweepState>,
}

impl Drop for SweepPermit {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}

/// `now` より後で、`timezone` の現地時刻が `time_of_day` になる最初の時刻
///
/// 夏時間の切り替えで現地時刻が存在しない日は翌日に回す。
pub fn next_fire_after(now: DateTime<Utc>, time_of_day: NaiveTime, timezone: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&timezone).date_naive();

    today
        .iter_days()
        .take(3)
        .filter_map(|date| {
            timezone
                .from_local_datetime(&date.and_time(time_of_day))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .find(|candidate| *candidate > now)
        .unwrap_or(now + TimeDelta::days(1))
}

/// 日次スイープのタイマータスクを起動する
pub fn spawn_daily_trigger(
    service: Arc<NotificationService>,
    clock: Arc<dyn Clock>,
    settings: SweepSettings,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = clock.now();
            let next = next_fire_after(now, settings.time_of_day, settings.timezone);
            tracing::info!(next_fire_at = %next, "次回の期日スイープを予約");

            tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

            match service.run_sweep().await {
                Ok(SweepOutcome::Completed(_)) => {}
                Ok(SweepOutcome::Skipped) => {
                    tracing::info!("期日スイープが実行中のため日次トリガーをスキップ");
                }
                Err(e) => {
                    tracing::error!(
                        error.category = log_error::category::INFRASTRUCTURE,
                        error.kind = log_error::kind::DATABASE,
                        error = %e,
                        "日次の期日スイープに失敗"
                    );
                }
            }
        }
    })
}
