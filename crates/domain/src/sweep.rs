//! # 期日スイープの対象期間
//!
//! 基準時刻の日の始まりから、`horizon_days` 日後の日の終わり（23:59:59.999）までを
//! 両端含みで表す。日付の境界は指定タイムゾーンで判定するため、同日中の時刻のずれで
//! 当日期日のリマインダーが漏れることはない。

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// 既定の先読み日数
pub const DEFAULT_HORIZON_DAYS: u32 = 3;

/// 期日スイープの対象期間（両端含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepWindow {
    start: DateTime<Utc>,
    end:   DateTime<Utc>,
}

impl SweepWindow {
    /// 基準時刻と先読み日数から対象期間を求める
    pub fn starting_at(reference: DateTime<Utc>, horizon_days: u32, tz: Tz) -> Self {
        let today = reference.with_timezone(&tz).date_naive();
        let last_day = today
            .checked_add_days(Days::new(u64::from(horizon_days)))
            .unwrap_or(NaiveDate::MAX);

        let end = match last_day.succ_opt() {
            Some(next_day) => start_of_day(next_day, tz) - TimeDelta::milliseconds(1),
            None => DateTime::<Utc>::MAX_UTC,
        };

        Self {
            start: start_of_day(today, tz),
            end,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// タイムゾーン上の日付の始まりを UTC で返す
///
/// 夏時間の切り替えで 0 時が存在しない日は、その日に最初に存在する現地時刻を使う。
fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..MINUTES_PER_DAY)
        .map(|minutes| midnight + TimeDelta::minutes(minutes))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map_or_else(|| midnight.and_utc(), |local| local.with_timezone(&Utc))
}

const MINUTES_PER_DAY: i64 = 24 * 60;
