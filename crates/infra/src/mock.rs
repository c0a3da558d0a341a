//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリモックリポジトリとモック配信チャネル。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! tenderwatch-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! リポジトリのモックは [`set_unavailable`](MockReminderRepository::set_unavailable) で
//! データストア停止（プール取得タイムアウト）を再現できる。

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tenderwatch_domain::{
    catalog::{Category, CategoryId, Region, RegionId, Subcategory, SubcategoryId},
    notification::{DeliveryReceipt, EmailMessage, NotificationError},
    recipient::Recipient,
    reminder::{Reminder, ReminderOwner},
    sweep::SweepWindow,
    tender::{Tender, TenderId},
};
use tokio::time::Instant;

use crate::{
    error::InfraError,
    notification::NotificationSender,
    repository::{CatalogRepository, RecipientRepository, ReminderRepository, TenderRepository},
};

/// データストア停止スイッチ
#[derive(Clone, Default)]
struct Availability(Arc<AtomicBool>);

impl Availability {
    fn set_unavailable(&self, unavailable: bool) {
        self.0.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), InfraError> {
        if self.0.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        Ok(())
    }
}

// ===== MockReminderRepository =====

/// テスト用のモック ReminderRepository
///
/// SQL 側の絞り込みは行わず、登録済みの全リマインダーを候補として返す。
/// 照合述語が候補ごとに再適用されることをユースケース側で検証できる。
#[derive(Clone, Default)]
pub struct MockReminderRepository {
    reminders:    Arc<Mutex<Vec<Reminder>>>,
    availability: Availability,
}

impl MockReminderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reminder(&self, reminder: Reminder) {
        self.reminders.lock().unwrap().push(reminder);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.availability.set_unavailable(unavailable);
    }
}

#[async_trait]
impl ReminderRepository for MockReminderRepository {
    async fn find_creation_candidates(
        &self,
        _tender: &Tender,
        _now: DateTime<Utc>,
    ) -> Result<Vec<Reminder>, InfraError> {
        self.availability.check()?;
        Ok(self.reminders.lock().unwrap().clone())
    }

    async fn find_sweep_candidates(
        &self,
        _window: &SweepWindow,
    ) -> Result<Vec<Reminder>, InfraError> {
        self.availability.check()?;
        Ok(self.reminders.lock().unwrap().clone())
    }
}

// ===== MockTenderRepository =====

#[derive(Clone, Default)]
pub struct MockTenderRepository {
    tenders:      Arc<Mutex<Vec<Tender>>>,
    availability: Availability,
}

impl MockTenderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tender(&self, tender: Tender) {
        self.tenders.lock().unwrap().push(tender);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.availability.set_unavailable(unavailable);
    }
}

#[async_trait]
impl TenderRepository for MockTenderRepository {
    async fn find_by_id(&self, id: TenderId) -> Result<Option<Tender>, InfraError> {
        self.availability.check()?;
        Ok(self
            .tenders
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }
}

// ===== MockCatalogRepository =====

#[derive(Clone, Default)]
pub struct MockCatalogRepository {
    categories:    Arc<Mutex<Vec<Category>>>,
    subcategories: Arc<Mutex<Vec<Subcategory>>>,
    regions:       Arc<Mutex<Vec<Region>>>,
    availability:  Availability,
}

impl MockCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, category: Category) {
        self.categories.lock().unwrap().push(category);
    }

    pub fn add_subcategory(&self, subcategory: Subcategory) {
        self.subcategories.lock().unwrap().push(subcategory);
    }

    pub fn add_region(&self, region: Region) {
        self.regions.lock().unwrap().push(region);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.availability.set_unavailable(unavailable);
    }
}

#[async_trait]
impl CatalogRepository for MockCatalogRepository {
    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, InfraError> {
        self.availability.check()?;
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_subcategory(
        &self,
        id: SubcategoryId,
    ) -> Result<Option<Subcategory>, InfraError> {
        self.availability.check()?;
        Ok(self
            .subcategories
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn find_region(&self, id: RegionId) -> Result<Option<Region>, InfraError> {
        self.availability.check()?;
        Ok(self
            .regions
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }
}

// ===== MockRecipientRepository =====

#[derive(Clone, Default)]
pub struct MockRecipientRepository {
    recipients:   Arc<Mutex<Vec<(ReminderOwner, Recipient)>>>,
    availability: Availability,
}

impl MockRecipientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_recipient(&self, owner: ReminderOwner, recipient: Recipient) {
        self.recipients.lock().unwrap().push((owner, recipient));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.availability.set_unavailable(unavailable);
    }
}

#[async_trait]
impl RecipientRepository for MockRecipientRepository {
    async fn find_by_owner(&self, owner: ReminderOwner) -> Result<Option<Recipient>, InfraError> {
        self.availability.check()?;
        Ok(self
            .recipients
            .lock()
            .unwrap()
            .iter()
            .find(|(o, _)| *o == owner)
            .map(|(_, r)| r.clone()))
    }
}

// ===== MockNotificationSender =====

/// モック配信チャネルへの送信記録
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub email:      EmailMessage,
    /// 送信開始時刻（tokio の時計。`start_paused` のテストでは仮想時刻）
    pub started_at: Instant,
}

/// テスト用のモック NotificationSender
///
/// - 宛先ごとに結果を台本として積める（台本が尽きたら成功）
/// - 送信開始時刻と、同時に送信中だった件数の最大値を記録する
/// - `with_hold` で 1 送信あたりの所要時間を模擬できる
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    scripts:       Arc<Mutex<HashMap<String, VecDeque<Result<(), NotificationError>>>>>,
    always:        Arc<Mutex<HashMap<String, NotificationError>>>,
    sent:          Arc<Mutex<Vec<SentEmail>>>,
    in_flight:     Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    hold:          Duration,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1 送信あたりの所要時間を設定する
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// 宛先への送信結果を順に積む
    pub fn script(
        &self,
        to: impl Into<String>,
        outcomes: impl IntoIterator<Item = Result<(), NotificationError>>,
    ) {
        self.scripts
            .lock()
            .unwrap()
            .entry(to.into())
            .or_default()
            .extend(outcomes);
    }

    /// 宛先への送信を常に失敗させる
    pub fn fail_always(&self, to: impl Into<String>, error: NotificationError) {
        self.always.lock().unwrap().insert(to.into(), error);
    }

    /// 送信記録（呼び出し順）
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// 宛先への送信呼び出し回数
    pub fn call_count(&self, to: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.email.to == to)
            .count()
    }

    /// 同時に送信中だった件数の最大値
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, to: &str) -> Result<(), NotificationError> {
        if let Some(error) = self.always.lock().unwrap().get(to) {
            return Err(error.clone());
        }
        self.scripts
            .lock()
            .unwrap()
            .get_mut(to)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        let sequence = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentEmail {
                email:      email.clone(),
                started_at: Instant::now(),
            });
            sent.len()
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.next_outcome(&email.to)
            .map(|()| DeliveryReceipt::new(format!("mock-{sequence}")))
    }
}
