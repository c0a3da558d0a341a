//! # リマインダー照合
//!
//! トリガー（新規入札案件 / 期日スイープ）とリマインダーの照合述語。
//!
//! データストアへの問い合わせは候補を絞り込むだけで、最終的な判定は必ずこの
//! 述語で行う。I/O を持たない純粋関数なので、照合規則を単体でテストできる。
//!
//! ## 照合規則
//!
//! - **新規入札案件**: リマインダーの期日が評価時刻より後で、かつ指定済みフィルタの
//!   いずれか 1 つが案件の対応する値と一致する（OR）。フィルタが全て未指定の
//!   リマインダーは一致しない
//! - **期日スイープ**: 期日種別で、入札案件を参照しており、期日が対象期間内にある

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    reminder::{Reminder, ReminderType},
    sweep::SweepWindow,
    tender::Tender,
};

/// 照合を起動したトリガーの種別
///
/// バッチのログ相関データとして出力する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    TenderCreated,
    DueDateSweep,
}

/// 照合トリガー
#[derive(Debug, Clone, Copy)]
pub enum MatchTrigger<'a> {
    /// 入札案件の新規作成
    TenderCreated {
        tender: &'a Tender,
        now:    DateTime<Utc>,
    },
    /// 日次の期日スイープ
    DueDateSweep(&'a SweepWindow),
}

impl MatchTrigger<'_> {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::TenderCreated { .. } => TriggerKind::TenderCreated,
            Self::DueDateSweep(_) => TriggerKind::DueDateSweep,
        }
    }

    /// リマインダーがこのトリガーで満たされるか
    pub fn matches(&self, reminder: &Reminder) -> bool {
        match self {
            Self::TenderCreated { tender, now } => {
                reminder.due_date > *now && shares_any_filter(reminder, tender)
            }
            Self::DueDateSweep(window) => {
                reminder.reminder_type == ReminderType::DueDate
                    && reminder.tender_id.is_some()
                    && window.contains(reminder.due_date)
            }
        }
    }
}

fn shares_any_filter(reminder: &Reminder, tender: &Tender) -> bool {
    reminder.tender_id == Some(tender.id)
        || both_equal(reminder.category_id, tender.category_id)
        || both_equal(reminder.subcategory_id, tender.subcategory_id)
        || both_equal(reminder.region_id, tender.region_id)
}

/// 両方が指定済みで一致する場合のみ真（未指定同士は一致とみなさない）
fn both_equal<T: PartialEq>(left: Option<T>, right: Option<T>) -> bool {
    matches!((left, right), (Some(l), Some(r)) if l == r)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{
        catalog::{CategoryId, RegionId, SubcategoryId},
        reminder::ReminderId,
        tender::TenderId,
    };

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 8, 0, 0).unwrap()
    }

    #[fixture]
    fn now() -> DateTime<Utc> {
        fixed_now()
    }

    #[fixture]
    fn tender() -> Tender {
        Tender::new(TenderId::new(1), "給水設備更新")
            .with_category(CategoryId::new(5))
            .with_subcategory(SubcategoryId::new(50))
    }

    fn future_reminder(id: i64, now: DateTime<Utc>) -> Reminder {
        Reminder::new(
            ReminderId::new(id),
            now + TimeDelta::days(10),
            ReminderType::NewTender,
        )
    }

    #[rstest]
    fn test_新規案件シナリオでカテゴリ一致と案件一致のみを選ぶ(
        now: DateTime<Utc>,
        tender: Tender,
    ) {
        let a = future_reminder(1, now).with_category(CategoryId::new(5));
        let b = future_reminder(2, now).with_category(CategoryId::new(9));
        let c = future_reminder(3, now).with_tender(TenderId::new(1));
        let trigger = MatchTrigger::TenderCreated {
            tender: &tender,
            now,
        };

        let matched: Vec<ReminderId> = [a, b, c]
            .iter()
            .filter(|r| trigger.matches(r))
            .map(|r| r.id)
            .collect();

        assert_eq!(matched, vec![ReminderId::new(1), ReminderId::new(3)]);
    }

    #[rstest]
    #[case::案件(future_reminder(1, fixed_now()).with_tender(TenderId::new(1)))]
    #[case::カテゴリ(future_reminder(1, fixed_now()).with_category(CategoryId::new(5)))]
    #[case::サブカテゴリ(future_reminder(1, fixed_now()).with_subcategory(SubcategoryId::new(50)))]
    #[case::不一致を含んでも1つ一致すればよい(
        future_reminder(1, fixed_now())
            .with_category(CategoryId::new(9))
            .with_subcategory(SubcategoryId::new(50))
    )]
    fn test_指定フィルタのいずれかが一致すれば選ぶ(
        #[case] reminder: Reminder,
        now: DateTime<Utc>,
        tender: Tender,
    ) {
        let trigger = MatchTrigger::TenderCreated {
            tender: &tender,
            now,
        };

        assert!(trigger.matches(&reminder));
    }

    #[rstest]
    #[case::全て未指定(future_reminder(1, fixed_now()))]
    #[case::全て不一致(
        future_reminder(1, fixed_now())
            .with_tender(TenderId::new(2))
            .with_category(CategoryId::new(9))
            .with_subcategory(SubcategoryId::new(99))
            .with_region(RegionId::new(4))
    )]
    fn test_一致するフィルタがなければ選ばない(
        #[case] reminder: Reminder,
        now: DateTime<Utc>,
        tender: Tender,
    ) {
        let trigger = MatchTrigger::TenderCreated {
            tender: &tender,
            now,
        };

        assert!(!trigger.matches(&reminder));
    }

    #[rstest]
    fn test_案件の地域が未指定ならリマインダーの地域では一致しない(
        now: DateTime<Utc>,
        tender: Tender,
    ) {
        let reminder = future_reminder(1, now).with_region(RegionId::new(4));
        let trigger = MatchTrigger::TenderCreated {
            tender: &tender,
            now,
        };

        assert!(!trigger.matches(&reminder));
    }

    #[rstest]
    #[case::期日が過去(TimeDelta::days(-1))]
    #[case::期日が評価時刻ちょうど(TimeDelta::zero())]
    fn test_期限切れのリマインダーは新規案件で選ばない(
        #[case] offset: TimeDelta,
        now: DateTime<Utc>,
        tender: Tender,
    ) {
        let reminder = Reminder::new(ReminderId::new(1), now + offset, ReminderType::NewTender)
            .with_category(CategoryId::new(5));
        let trigger = MatchTrigger::TenderCreated {
            tender: &tender,
            now,
        };

        assert!(!trigger.matches(&reminder));
    }

    fn window() -> SweepWindow {
        SweepWindow::starting_at(
            Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
            3,
            chrono_tz::UTC,
        )
    }

    fn sweep_reminder(due: &str) -> Reminder {
        let due = DateTime::parse_from_rfc3339(due).unwrap().with_timezone(&Utc);
        Reminder::new(ReminderId::new(1), due, ReminderType::DueDate).with_tender(TenderId::new(1))
    }

    #[rstest]
    #[case("2025-08-04T23:59:59.999Z", true)]
    #[case("2025-08-05T00:00:00.000Z", false)]
    #[case("2025-08-01T00:00:00.000Z", true)]
    #[case("2025-07-31T23:59:59.999Z", false)]
    fn test_スイープは対象期間内の期日のみ選ぶ(#[case] due: &str, #[case] expected: bool) {
        let window = window();

        assert_eq!(
            MatchTrigger::DueDateSweep(&window).matches(&sweep_reminder(due)),
            expected
        );
    }

    #[test]
    fn test_スイープは入札案件を参照しないリマインダーを選ばない() {
        let window = window();
        let mut reminder = sweep_reminder("2025-08-02T10:00:00Z");
        reminder.tender_id = None;

        assert!(!MatchTrigger::DueDateSweep(&window).matches(&reminder));
    }

    #[test]
    fn test_スイープは新着案件種別のリマインダーを選ばない() {
        let window = window();
        let mut reminder = sweep_reminder("2025-08-02T10:00:00Z");
        reminder.reminder_type = ReminderType::NewTender;

        assert!(!MatchTrigger::DueDateSweep(&window).matches(&reminder));
    }

    #[rstest]
    fn test_kindはトリガー種別を返す(now: DateTime<Utc>, tender: Tender) {
        let window = window();

        assert_eq!(
            MatchTrigger::TenderCreated {
                tender: &tender,
                now,
            }
            .kind()
            .to_string(),
            "tender_created"
        );
        assert_eq!(
            MatchTrigger::DueDateSweep(&window).kind(),
            TriggerKind::DueDateSweep
        );
    }
}
