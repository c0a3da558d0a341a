//! # Reminder Service サーバー
//!
//! 入札案件リマインダーを照合し、メールで通知するサービス。
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境
//! cargo run -p tenderwatch-reminder-service
//!
//! # 本番環境
//! REMINDER_PORT=3100 NOTIFICATION_BACKEND=smtp cargo run -p tenderwatch-reminder-service --release
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `REMINDER_HOST` | No | バインドアドレス（既定 `0.0.0.0`） |
//! | `REMINDER_PORT` | No | ポート番号（既定 `3100`） |
//! | `NOTIFICATION_BACKEND` | No | `smtp` または `noop`（既定 `noop`） |
//! | `SWEEP_TIME` / `SWEEP_TIMEZONE` | No | 日次スイープの現地時刻とタイムゾーン |
//! | `RUST_LOG` | No | ログレベル |
//! | `LOG_FORMAT` | No | `json` または `pretty` |
//!
//! その他の項目は [`ReminderConfig`] を参照。

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use tenderwatch_domain::clock::{Clock, SystemClock};
use tenderwatch_infra::{
    NotificationSender,
    db,
    notification::{NoopNotificationSender, SmtpNotificationSender},
    repository::{
        PostgresCatalogRepository,
        PostgresRecipientRepository,
        PostgresReminderRepository,
        PostgresTenderRepository,
    },
};
use tenderwatch_reminder_service::{
    config::{NotificationBackend, ReminderConfig},
    handler::{ReminderState, router},
    usecase::{Dispatcher, MessageBuilder, NotificationService, ReminderMatcher, spawn_daily_trigger},
};
use tenderwatch_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("reminder-service"));

    let config = ReminderConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Reminder Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    let sender: Arc<dyn NotificationSender> = match config.notification {
        NotificationBackend::Smtp(settings) => {
            tracing::info!(
                "SMTP 通知送信を使用します: {}:{}",
                settings.host,
                settings.port
            );
            Arc::new(SmtpNotificationSender::new(settings).context("SMTP 送信の初期化に失敗しました")?)
        }
        NotificationBackend::Noop => {
            tracing::info!("Noop 通知送信を使用します（メール送信なし）");
            Arc::new(NoopNotificationSender)
        }
    };

    let matcher = ReminderMatcher::new(
        Arc::new(PostgresReminderRepository::new(pool.clone())),
        Arc::new(PostgresTenderRepository::new(pool.clone())),
        Arc::new(PostgresCatalogRepository::new(pool.clone())),
        Arc::new(PostgresRecipientRepository::new(pool)),
    );
    let builder =
        MessageBuilder::new(config.sweep.timezone).context("テンプレートの読み込みに失敗しました")?;
    let dispatcher = Arc::new(Dispatcher::new(sender, config.dispatch));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let service = Arc::new(NotificationService::new(
        matcher,
        builder,
        dispatcher,
        Arc::clone(&clock),
        config.sweep,
    ));

    let _daily = spawn_daily_trigger(Arc::clone(&service), clock, config.sweep);

    let app = router(Arc::new(ReminderState { service }));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("不正なアドレスです")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Reminder Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
