//! # リマインダーマッチャー
//!
//! トリガーに対して満たされたリマインダーを求め、メッセージ生成に必要な受信者と
//! 参照エンティティを解決する。
//!
//! ## 処理の流れ
//!
//! 1. データストアで候補を絞り込む
//! 2. 候補ごとに照合述語 [`MatchTrigger::matches`] を再適用する
//! 3. 受信者（ユーザー優先、顧客にフォールバック）を解決する
//! 4. 入札案件とカテゴリ / サブカテゴリ / 地域を解決する
//!
//! 宛先を解決できないリマインダーと、入札案件が解決できないスイープ対象は
//! 警告を出してスキップする。カタログの参照切れは許容し、未指定として扱う。
//! データストアのエラーはその時点でトリガー 1 回分の実行全体を中止する。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenderwatch_domain::{
    DomainError,
    catalog::{Category, Region, Subcategory},
    matching::MatchTrigger,
    recipient::Recipient,
    reminder::Reminder,
    sweep::SweepWindow,
    tender::Tender,
};
use tenderwatch_infra::{
    InfraError,
    repository::{CatalogRepository, RecipientRepository, ReminderRepository, TenderRepository},
};
use tenderwatch_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};

/// メッセージ生成に使う解決済みエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntities {
    pub tender:      Tender,
    pub category:    Option<Category>,
    pub subcategory: Option<Subcategory>,
    pub region:      Option<Region>,
}

/// トリガーに一致し、宛先まで解決できたリマインダー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedReminder {
    pub reminder:  Reminder,
    pub recipient: Recipient,
    pub entities:  ResolvedEntities,
}

/// リマインダーマッチャー
pub struct ReminderMatcher {
    reminders:  Arc<dyn ReminderRepository>,
    tenders:    Arc<dyn TenderRepository>,
    catalog:    Arc<dyn CatalogRepository>,
    recipients: Arc<dyn RecipientRepository>,
}

impl ReminderMatcher {
    pub fn new(
        reminders: Arc<dyn ReminderRepository>,
        tenders: Arc<dyn TenderRepository>,
        catalog: Arc<dyn CatalogRepository>,
        recipients: Arc<dyn RecipientRepository>,
    ) -> Self {
        Self {
            reminders,
            tenders,
            catalog,
            recipients,
        }
    }

    /// 新規作成された入札案件に一致するリマインダーを求める
    #[tracing::instrument(skip_all, fields(tender_id = %tender.id))]
    pub async fn match_tender_created(
        &self,
        tender: &Tender,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchedReminder>, InfraError> {
        let trigger = MatchTrigger::TenderCreated { tender, now };
        let candidates = self.reminders.find_creation_candidates(tender, now).await?;

        let mut matched = Vec::new();
        for reminder in candidates.into_iter().filter(|r| trigger.matches(r)) {
            let Some(recipient) = self.resolve_recipient(&reminder).await? else {
                continue;
            };
            let entities = self.resolve_entities(&reminder, tender.clone()).await?;
            matched.push(MatchedReminder {
                reminder,
                recipient,
                entities,
            });
        }

        log_matched(&trigger, matched.len());
        Ok(matched)
    }

    /// 期日スイープの対象期間に一致するリマインダーを求める
    #[tracing::instrument(skip_all, fields(window.start = %window.start(), window.end = %window.end()))]
    pub async fn match_sweep(
        &self,
        window: &SweepWindow,
    ) -> Result<Vec<MatchedReminder>, InfraError> {
        let trigger = MatchTrigger::DueDateSweep(window);
        let candidates = self.reminders.find_sweep_candidates(window).await?;

        let mut matched = Vec::new();
        for reminder in candidates.into_iter().filter(|r| trigger.matches(r)) {
            let Some(tender) = self.resolve_tender(&reminder).await? else {
                continue;
            };
            let Some(recipient) = self.resolve_recipient(&reminder).await? else {
                continue;
            };
            let entities = self.resolve_entities(&reminder, tender).await?;
            matched.push(MatchedReminder {
                reminder,
                recipient,
                entities,
            });
        }

        log_matched(&trigger, matched.len());
        Ok(matched)
    }

    /// 所有者を優先順に試し、宛先を持つ最初の受信者を返す
    async fn resolve_recipient(&self, reminder: &Reminder) -> Result<Option<Recipient>, InfraError> {
        for owner in reminder.owners() {
            let recipient = self.recipients.find_by_owner(owner).await?;
            if let Some(recipient) = recipient.filter(|r| r.address().is_some()) {
                tracing::debug!(
                    reminder_id = %reminder.id,
                    recipient_kind = %recipient.kind,
                    "宛先を解決"
                );
                return Ok(Some(recipient));
            }
        }

        tracing::warn!(
            error.category = log_error::category::DATA,
            error.kind = log_error::kind::LOOKUP_MISS,
            reminder_id = %reminder.id,
            "宛先を解決できないためリマインダーをスキップ"
        );
        Ok(None)
    }

    async fn resolve_tender(&self, reminder: &Reminder) -> Result<Option<Tender>, InfraError> {
        let tender = match reminder.tender_id {
            Some(tender_id) => self.tenders.find_by_id(tender_id).await?,
            None => None,
        };

        if tender.is_none() {
            let reason = DomainError::NotFound {
                entity_type: "Tender",
                id:          reminder
                    .tender_id
                    .map_or_else(|| "-".to_string(), |id| id.to_string()),
            };
            tracing::warn!(
                error.category = log_error::category::DATA,
                error.kind = log_error::kind::LOOKUP_MISS,
                reminder_id = %reminder.id,
                error = %reason,
                "入札案件を解決できないためリマインダーをスキップ"
            );
        }
        Ok(tender)
    }

    /// 案件の属性を優先し、未指定ならリマインダーのフィルタでカタログを引く
    async fn resolve_entities(
        &self,
        reminder: &Reminder,
        tender: Tender,
    ) -> Result<ResolvedEntities, InfraError> {
        let category = match tender.category_id.or(reminder.category_id) {
            Some(id) => self.catalog.find_category(id).await?,
            None => None,
        };
        let subcategory = match tender.subcategory_id.or(reminder.subcategory_id) {
            Some(id) => self.catalog.find_subcategory(id).await?,
            None => None,
        };
        let region = match tender.region_id.or(reminder.region_id) {
            Some(id) => self.catalog.find_region(id).await?,
            None => None,
        };

        Ok(ResolvedEntities {
            tender,
            category,
            subcategory,
            region,
        })
    }
}

fn log_matched(trigger: &MatchTrigger<'_>, count: usize) {
    let trigger_str: &'static str = trigger.kind().into();
    match trigger {
        MatchTrigger::TenderCreated { tender, .. } => log_business_event!(
            event.category = event::category::REMINDER,
            event.action = event::action::REMINDERS_MATCHED,
            event.entity_type = event::entity_type::TENDER,
            event.entity_id = %tender.id,
            event.result = event::result::SUCCESS,
            notification.trigger = trigger_str,
            matched = count,
            "リマインダー照合完了"
        ),
        MatchTrigger::DueDateSweep(_) => log_business_event!(
            event.category = event::category::REMINDER,
            event.action = event::action::REMINDERS_MATCHED,
            event.result = event::result::SUCCESS,
            notification.trigger = trigger_str,
            matched = count,
            "リマインダー照合完了"
        ),
    }
}
